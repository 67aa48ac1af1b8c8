use std::collections::HashSet;

use async_trait::async_trait;

/// Capability level for the approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Requester,
    Approver,
}

/// A resolved principal. Resolved once per session, then carried by value —
/// components never re-derive capability from raw identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable principal identifier, typically the account email.
    pub principal: String,
    pub role: Role,
}

impl Identity {
    pub fn is_approver(&self) -> bool {
        self.role == Role::Approver
    }
}

/// Resolves a principal to an [`Identity`]. Backed by whatever directory the
/// deployment uses; the core only ever sees the resolved role.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, principal: &str) -> Identity;
}

/// A fixed approver list. Everyone not on the list is a requester.
pub struct StaticRoster {
    approvers: HashSet<String>,
}

impl StaticRoster {
    pub fn new(approvers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            approvers: approvers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticRoster {
    async fn resolve(&self, principal: &str) -> Identity {
        let role = if self.approvers.contains(principal) {
            Role::Approver
        } else {
            Role::Requester
        };
        Identity { principal: principal.to_string(), role }
    }
}
