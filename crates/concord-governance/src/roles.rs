//! Role registry.
//!
//! Privileged identities, independent of stake. Roles have no hierarchy;
//! each gated operation checks exactly the role it needs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use concord_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Privileged role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Recognised proposal author
    Proposer,
    /// May execute queued proposals once their timelock expires
    Executor,
    /// May cancel approved or queued proposals
    Guardian,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Proposer, Role::Executor, Role::Guardian];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Proposer => "PROPOSER_ROLE",
            Role::Executor => "EXECUTOR_ROLE",
            Role::Guardian => "GUARDIAN_ROLE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role assignments administered by a single admin identity.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    admin: Address,
    members: HashMap<Role, BTreeSet<Address>>,
}

impl RoleRegistry {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            members: HashMap::new(),
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    fn ensure_admin(&self, caller: &Address) -> GovernanceResult<()> {
        if *caller != self.admin {
            tracing::warn!(caller = %caller, "Role change rejected: caller is not admin");
            return Err(GovernanceError::Unauthorized(
                "Only the role admin can change roles".to_string(),
            ));
        }
        Ok(())
    }

    /// Grant `role` to `member`. Returns whether anything changed.
    pub fn grant(&mut self, caller: Address, role: Role, member: Address) -> GovernanceResult<bool> {
        self.ensure_admin(&caller)?;
        let added = self.members.entry(role).or_default().insert(member);
        if added {
            tracing::info!(role = %role, member = %member, "Role granted");
        }
        Ok(added)
    }

    /// Revoke `role` from `member`. Returns whether anything changed.
    pub fn revoke(&mut self, caller: Address, role: Role, member: Address) -> GovernanceResult<bool> {
        self.ensure_admin(&caller)?;
        let removed = self
            .members
            .get_mut(&role)
            .map(|set| set.remove(&member))
            .unwrap_or(false);
        if removed {
            tracing::info!(role = %role, member = %member, "Role revoked");
        }
        Ok(removed)
    }

    pub fn has(&self, role: Role, member: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(member))
            .unwrap_or(false)
    }

    /// Holders of `role`, sorted.
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check that `caller` holds `role`.
    pub fn require(&self, role: Role, caller: &Address) -> GovernanceResult<()> {
        if !self.has(role, caller) {
            tracing::warn!(role = %role, caller = %caller, "Caller lacks required role");
            return Err(GovernanceError::Unauthorized(format!("{} required", role)));
        }
        Ok(())
    }
}
