use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// A lifecycle action that can be granted to a role on a function selector.
///
/// Signing actions authorize the identity that signs a meta-transaction;
/// executing actions authorize the relayer that submits it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    TimeDelayRequest,
    TimeDelayApprove,
    TimeDelayCancel,
    SignMetaRequestAndApprove,
    SignMetaApprove,
    SignMetaCancel,
    ExecuteMetaRequestAndApprove,
    ExecuteMetaApprove,
    ExecuteMetaCancel,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::TimeDelayRequest,
        Action::TimeDelayApprove,
        Action::TimeDelayCancel,
        Action::SignMetaRequestAndApprove,
        Action::SignMetaApprove,
        Action::SignMetaCancel,
        Action::ExecuteMetaRequestAndApprove,
        Action::ExecuteMetaApprove,
        Action::ExecuteMetaCancel,
    ];

    /// Stable ordinal used in canonical encodings. Never reorder.
    pub fn ordinal(&self) -> u8 {
        match self {
            Action::TimeDelayRequest => 0,
            Action::TimeDelayApprove => 1,
            Action::TimeDelayCancel => 2,
            Action::SignMetaRequestAndApprove => 3,
            Action::SignMetaApprove => 4,
            Action::SignMetaCancel => 5,
            Action::ExecuteMetaRequestAndApprove => 6,
            Action::ExecuteMetaApprove => 7,
            Action::ExecuteMetaCancel => 8,
        }
    }

    /// Actions that may open a workflow path.
    pub fn starts_workflow(&self) -> bool {
        matches!(
            self,
            Action::TimeDelayRequest | Action::SignMetaRequestAndApprove
        )
    }

    /// Actions that move a record into a terminal state.
    pub fn is_terminal(&self) -> bool {
        match self {
            Action::TimeDelayApprove
            | Action::TimeDelayCancel
            | Action::ExecuteMetaRequestAndApprove
            | Action::ExecuteMetaApprove
            | Action::ExecuteMetaCancel => true,
            Action::TimeDelayRequest
            | Action::SignMetaRequestAndApprove
            | Action::SignMetaApprove
            | Action::SignMetaCancel => false,
        }
    }

    pub fn is_meta_sign(&self) -> bool {
        matches!(
            self,
            Action::SignMetaRequestAndApprove | Action::SignMetaApprove | Action::SignMetaCancel
        )
    }

    /// The relayer-side action paired with a signing action.
    pub fn execute_counterpart(&self) -> Option<Action> {
        match self {
            Action::SignMetaRequestAndApprove => Some(Action::ExecuteMetaRequestAndApprove),
            Action::SignMetaApprove => Some(Action::ExecuteMetaApprove),
            Action::SignMetaCancel => Some(Action::ExecuteMetaCancel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TimeDelayRequest => "TIME_DELAY_REQUEST",
            Action::TimeDelayApprove => "TIME_DELAY_APPROVE",
            Action::TimeDelayCancel => "TIME_DELAY_CANCEL",
            Action::SignMetaRequestAndApprove => "SIGN_META_REQUEST_AND_APPROVE",
            Action::SignMetaApprove => "SIGN_META_APPROVE",
            Action::SignMetaCancel => "SIGN_META_CANCEL",
            Action::ExecuteMetaRequestAndApprove => "EXECUTE_META_REQUEST_AND_APPROVE",
            Action::ExecuteMetaApprove => "EXECUTE_META_APPROVE",
            Action::ExecuteMetaCancel => "EXECUTE_META_CANCEL",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| TypesError::UnknownAction(s.to_string()))
    }
}
