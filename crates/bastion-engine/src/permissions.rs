use std::collections::{BTreeMap, BTreeSet};

use bastion_types::{Action, Identity, OperationTypeId, RoleHash, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

/// A named set of identities that permissions are granted to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub hash: RoleHash,
    pub name: String,
    pub max_members: usize,
    /// Protected roles cannot be redefined and members only rotate through
    /// [`PermissionRegistry::replace_member`].
    pub protected: bool,
    pub members: BTreeSet<Identity>,
}

impl Role {
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_members
    }
}

/// Describes one parameter of a declared function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: String,
}

/// A function that can receive permission grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub selector: Selector,
    pub signature: String,
    pub operation_type: OperationTypeId,
    pub supported_actions: BTreeSet<Action>,
    pub params: Vec<ParamDescriptor>,
}

impl FunctionSchema {
    /// Declare a function by signature; the selector is derived from it.
    pub fn new(
        signature: impl Into<String>,
        operation_type: OperationTypeId,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        let signature = signature.into();
        Self {
            selector: Selector::from_signature(&signature),
            signature,
            operation_type,
            supported_actions: actions.into_iter().collect(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            kind: kind.into(),
        });
        self
    }

    pub fn supports(&self, action: Action) -> bool {
        self.supported_actions.contains(&action)
    }
}

/// Role definitions, function schemas and the
/// `role -> selector -> actions` grant table.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    roles: BTreeMap<RoleHash, Role>,
    functions: BTreeMap<Selector, FunctionSchema>,
    permissions: BTreeMap<RoleHash, BTreeMap<Selector, BTreeSet<Action>>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a role.
    ///
    /// Redefining an unprotected role with the same limits is a no-op.
    pub fn define_role(
        &mut self,
        name: &str,
        max_members: usize,
        protected: bool,
    ) -> EngineResult<RoleHash> {
        if name.is_empty() {
            return Err(EngineError::InvalidRoleDefinition("empty role name".into()));
        }
        if max_members == 0 {
            return Err(EngineError::InvalidRoleDefinition(format!(
                "{name}: max_members must be at least 1"
            )));
        }

        let hash = RoleHash::from_name(name);
        if let Some(existing) = self.roles.get(&hash) {
            if existing.protected {
                return Err(EngineError::RoleAlreadyExists(name.to_string()));
            }
            if existing.max_members != max_members || existing.protected != protected {
                return Err(EngineError::InvalidRoleDefinition(format!(
                    "{name}: already defined with different limits"
                )));
            }
            return Ok(hash);
        }

        self.roles.insert(
            hash,
            Role {
                hash,
                name: name.to_string(),
                max_members,
                protected,
                members: BTreeSet::new(),
            },
        );
        info!(role = %hash, name, max_members, protected, "Role defined");
        Ok(hash)
    }

    /// Declare a function schema. Identical redeclaration is a no-op.
    ///
    /// The caller is responsible for checking the owning operation type
    /// exists.
    pub fn register_function(&mut self, schema: FunctionSchema) -> EngineResult<Selector> {
        let selector = schema.selector;
        if let Some(existing) = self.functions.get(&selector) {
            if *existing == schema {
                return Ok(selector);
            }
            return Err(EngineError::FunctionAlreadyExists(selector));
        }
        info!(
            selector = %selector,
            signature = %schema.signature,
            operation_type = %schema.operation_type,
            "Function declared"
        );
        self.functions.insert(selector, schema);
        Ok(selector)
    }

    pub fn grant(
        &mut self,
        role: RoleHash,
        selector: Selector,
        actions: &[Action],
    ) -> EngineResult<()> {
        self.validate_grant(role, selector, actions)?;
        let granted = self
            .permissions
            .entry(role)
            .or_default()
            .entry(selector)
            .or_default();
        granted.extend(actions.iter().copied());
        info!(role = %role, selector = %selector, actions = ?actions, "Permission granted");
        Ok(())
    }

    /// Revoke actions. Takes effect for the very next [`check`](Self::check).
    pub fn revoke(
        &mut self,
        role: RoleHash,
        selector: Selector,
        actions: &[Action],
    ) -> EngineResult<()> {
        if !self.roles.contains_key(&role) {
            return Err(EngineError::UnknownRole(role));
        }
        if !self.functions.contains_key(&selector) {
            return Err(EngineError::UnknownFunction(selector));
        }
        if let Some(by_selector) = self.permissions.get_mut(&role) {
            if let Some(granted) = by_selector.get_mut(&selector) {
                for action in actions {
                    granted.remove(action);
                }
                if granted.is_empty() {
                    by_selector.remove(&selector);
                }
            }
            if by_selector.is_empty() {
                self.permissions.remove(&role);
            }
        }
        warn!(role = %role, selector = %selector, actions = ?actions, "Permission revoked");
        Ok(())
    }

    /// True iff `identity` belongs to a role granted `action` on `selector`.
    pub fn check(&self, identity: &Identity, selector: Selector, action: Action) -> bool {
        let allowed = self.permissions.iter().any(|(role, by_selector)| {
            by_selector
                .get(&selector)
                .is_some_and(|granted| granted.contains(&action))
                && self
                    .roles
                    .get(role)
                    .is_some_and(|r| r.members.contains(identity))
        });
        debug!(
            identity = %identity,
            selector = %selector,
            action = %action,
            allowed,
            "Permission check"
        );
        allowed
    }

    pub fn add_member(&mut self, role: RoleHash, identity: Identity) -> EngineResult<()> {
        let entry = self.role_mut(role)?;
        if entry.members.contains(&identity) {
            return Err(EngineError::AlreadyMember { role, identity });
        }
        if entry.is_full() {
            return Err(EngineError::RoleFull {
                role,
                max_members: entry.max_members,
            });
        }
        entry.members.insert(identity);
        info!(role = %role, identity = %identity, "Member added");
        Ok(())
    }

    pub fn remove_member(&mut self, role: RoleHash, identity: Identity) -> EngineResult<()> {
        let entry = self.role_mut(role)?;
        if entry.protected {
            return Err(EngineError::ProtectedRole(role));
        }
        if !entry.members.remove(&identity) {
            return Err(EngineError::NotMember { role, identity });
        }
        warn!(role = %role, identity = %identity, "Member removed");
        Ok(())
    }

    /// Swap one member for another. The only way to rotate a protected role.
    pub fn replace_member(
        &mut self,
        role: RoleHash,
        old: Identity,
        new: Identity,
    ) -> EngineResult<()> {
        let entry = self.role_mut(role)?;
        if !entry.members.contains(&old) {
            return Err(EngineError::NotMember {
                role,
                identity: old,
            });
        }
        if old != new && entry.members.contains(&new) {
            return Err(EngineError::AlreadyMember { role, identity: new });
        }
        entry.members.remove(&old);
        entry.members.insert(new);
        info!(role = %role, old = %old, new = %new, "Member replaced");
        Ok(())
    }

    pub fn role(&self, role: RoleHash) -> EngineResult<&Role> {
        self.roles.get(&role).ok_or(EngineError::UnknownRole(role))
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Roles that currently include `identity`.
    pub fn roles_of(&self, identity: &Identity) -> Vec<RoleHash> {
        self.roles
            .values()
            .filter(|r| r.members.contains(identity))
            .map(|r| r.hash)
            .collect()
    }

    pub fn function(&self, selector: Selector) -> EngineResult<&FunctionSchema> {
        self.functions
            .get(&selector)
            .ok_or(EngineError::UnknownFunction(selector))
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionSchema> {
        self.functions.values()
    }

    /// Grants held by `role`, keyed by selector.
    pub fn permissions_of(&self, role: RoleHash) -> BTreeMap<Selector, BTreeSet<Action>> {
        self.permissions.get(&role).cloned().unwrap_or_default()
    }

    fn role_mut(&mut self, role: RoleHash) -> EngineResult<&mut Role> {
        self.roles
            .get_mut(&role)
            .ok_or(EngineError::UnknownRole(role))
    }

    fn validate_grant(
        &self,
        role: RoleHash,
        selector: Selector,
        actions: &[Action],
    ) -> EngineResult<()> {
        if !self.roles.contains_key(&role) {
            return Err(EngineError::UnknownRole(role));
        }
        let schema = self.function(selector)?;
        if let Some(action) = actions.iter().find(|a| !schema.supports(**a)) {
            return Err(EngineError::UnsupportedAction {
                selector,
                action: *action,
            });
        }
        Ok(())
    }
}
