use std::collections::BTreeMap;

use bastion_types::{Action, OperationTypeId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};

/// A legal sequence of lifecycle actions from creation to a terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPath {
    pub name: String,
    pub actions: Vec<Action>,
}

impl WorkflowPath {
    pub fn new(name: impl Into<String>, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            name: name.into(),
            actions: actions.into_iter().collect(),
        }
    }

    /// The paths every engine-driven operation type supports.
    pub fn standard_set() -> Vec<WorkflowPath> {
        vec![
            WorkflowPath::new(
                "time-delay approve",
                [Action::TimeDelayRequest, Action::TimeDelayApprove],
            ),
            WorkflowPath::new(
                "time-delay cancel",
                [Action::TimeDelayRequest, Action::TimeDelayCancel],
            ),
            WorkflowPath::new(
                "meta-tx approve",
                [
                    Action::TimeDelayRequest,
                    Action::SignMetaApprove,
                    Action::ExecuteMetaApprove,
                ],
            ),
            WorkflowPath::new(
                "meta-tx cancel",
                [
                    Action::TimeDelayRequest,
                    Action::SignMetaCancel,
                    Action::ExecuteMetaCancel,
                ],
            ),
            WorkflowPath::new(
                "meta-tx request and approve",
                [
                    Action::SignMetaRequestAndApprove,
                    Action::ExecuteMetaRequestAndApprove,
                ],
            ),
        ]
    }

    pub fn starts_with(&self, sequence: &[Action]) -> bool {
        self.actions.starts_with(sequence)
    }

    fn validate(&self) -> Result<(), String> {
        let (first, last) = match (self.actions.first(), self.actions.last()) {
            (Some(first), Some(last)) if self.actions.len() >= 2 => (first, last),
            _ => return Err(format!("path '{}' needs at least two actions", self.name)),
        };
        if !first.starts_workflow() {
            return Err(format!("path '{}' must start with a request action", self.name));
        }
        if !last.is_terminal() {
            return Err(format!("path '{}' must end with a terminal action", self.name));
        }
        let inner = &self.actions[1..self.actions.len() - 1];
        if inner.iter().any(|a| a.is_terminal() || a.starts_workflow()) {
            return Err(format!(
                "path '{}' has a request or terminal action in the middle",
                self.name
            ));
        }
        Ok(())
    }
}

/// A registered operation type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTypeEntry {
    pub id: OperationTypeId,
    pub name: String,
    pub paths: Vec<WorkflowPath>,
}

/// Registry of operation types and their declared workflows.
#[derive(Debug, Default)]
pub struct OperationCatalog {
    entries: BTreeMap<OperationTypeId, OperationTypeEntry>,
}

impl OperationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: OperationTypeId,
        name: &str,
        paths: Vec<WorkflowPath>,
    ) -> EngineResult<OperationTypeId> {
        if name.is_empty() {
            return Err(EngineError::InvalidWorkflow("empty operation name".into()));
        }
        if paths.is_empty() {
            return Err(EngineError::InvalidWorkflow(format!(
                "{name}: at least one path is required"
            )));
        }
        for path in &paths {
            path.validate().map_err(EngineError::InvalidWorkflow)?;
        }

        let entry = OperationTypeEntry {
            id,
            name: name.to_string(),
            paths,
        };
        if let Some(existing) = self.entries.get(&id) {
            if *existing == entry {
                return Ok(id);
            }
            return Err(EngineError::OperationTypeAlreadyExists(name.to_string()));
        }

        info!(operation_type = %id, name, paths = entry.paths.len(), "Operation type registered");
        self.entries.insert(id, entry);
        Ok(id)
    }

    /// Register under the identifier derived from `name`.
    pub fn register_named(
        &mut self,
        name: &str,
        paths: Vec<WorkflowPath>,
    ) -> EngineResult<OperationTypeId> {
        self.register(OperationTypeId::from_name(name), name, paths)
    }

    pub fn lookup(&self, id: OperationTypeId) -> EngineResult<&OperationTypeEntry> {
        self.entries
            .get(&id)
            .ok_or(EngineError::UnknownOperationType(id))
    }

    pub fn contains(&self, id: OperationTypeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// True iff some declared path of `id` begins with `sequence`.
    pub fn permits(&self, id: OperationTypeId, sequence: &[Action]) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| e.paths.iter().any(|p| p.starts_with(sequence)))
    }

    pub fn entries(&self) -> impl Iterator<Item = &OperationTypeEntry> {
        self.entries.values()
    }
}
