//! Authorization: does the authenticated identity hold a role the operation
//! requires?
//!
//! Requirements are declared per operation id when routes are registered and
//! never looked up by reflection at request time.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::services::auth::claims::Identity;

pub mod roles {
    pub const ADMIN: &str = "ADMIN";
    pub const CUSTOMER: &str = "CUSTOMER";
}

/// Roles accepted by one operation (OR semantics).
pub type RoleSet = BTreeSet<String>;

/// Static operation id -> required roles map.
#[derive(Debug, Clone, Default)]
pub struct RoleRequirements {
    by_operation: HashMap<String, RoleSet>,
}

impl RoleRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require<I, R>(mut self, operation: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.by_operation
            .entry(operation.into())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn get(&self, operation: &str) -> Option<&RoleSet> {
        self.by_operation.get(operation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("identity not found")]
    IdentityMissing,
    #[error("access denied: requires one of [{}], but role is {actual}", .required.join(", "))]
    RoleMismatch { required: Vec<String>, actual: String },
}

impl AccessDenied {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdentityMissing => "identity_missing",
            Self::RoleMismatch { .. } => "role_mismatch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    requirements: Arc<RoleRequirements>,
}

impl AuthorizationGuard {
    pub fn new(requirements: Arc<RoleRequirements>) -> Self {
        Self { requirements }
    }

    /// Allow or deny `operation` for `identity`.
    ///
    /// No requirement (or an empty one) means authentication alone suffices.
    pub fn authorize(&self, operation: &str, identity: Option<&Identity>) -> Result<(), AccessDenied> {
        let required = match self.requirements.get(operation) {
            Some(required) if !required.is_empty() => required,
            _ => return Ok(()),
        };

        let identity = identity.ok_or(AccessDenied::IdentityMissing)?;

        if required.contains(&identity.role) {
            Ok(())
        } else {
            Err(AccessDenied::RoleMismatch {
                required: required.iter().cloned().collect(),
                actual: identity.role.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::roles::{ADMIN, CUSTOMER};
    use super::*;

    fn identity(role: &str) -> Identity {
        Identity {
            id: "u1".into(),
            email: "a@b.com".into(),
            role: role.into(),
        }
    }

    fn guard() -> AuthorizationGuard {
        let requirements = RoleRequirements::new()
            .require("products.create", [ADMIN])
            .require("orders.list", [ADMIN, CUSTOMER])
            .require("users.profile", Vec::<String>::new());
        AuthorizationGuard::new(Arc::new(requirements))
    }

    #[test]
    fn undeclared_or_empty_requirement_allows_any_identity() {
        let guard = guard();
        assert_eq!(guard.authorize("cart.get", Some(&identity("ANYONE"))), Ok(()));
        assert_eq!(guard.authorize("users.profile", Some(&identity("ANYONE"))), Ok(()));
    }

    #[test]
    fn matching_role_allows() {
        let guard = guard();
        assert_eq!(guard.authorize("products.create", Some(&identity(ADMIN))), Ok(()));
        assert_eq!(guard.authorize("orders.list", Some(&identity(CUSTOMER))), Ok(()));
        assert_eq!(guard.authorize("orders.list", Some(&identity(ADMIN))), Ok(()));
    }

    #[test]
    fn missing_identity_is_denied_loudly() {
        let err = guard().authorize("products.create", None).unwrap_err();
        assert_eq!(err, AccessDenied::IdentityMissing);
        assert_eq!(err.to_string(), "identity not found");
    }

    #[test]
    fn wrong_role_enumerates_required_and_actual() {
        let err = guard()
            .authorize("products.create", Some(&identity(CUSTOMER)))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ADMIN"), "{message}");
        assert!(message.contains("CUSTOMER"), "{message}");
        assert_eq!(err.kind(), "role_mismatch");
    }

    #[test]
    fn denial_lists_every_required_role() {
        let requirements = RoleRequirements::new().require("reports.view", ["ADMIN", "AUDITOR"]);
        let guard = AuthorizationGuard::new(Arc::new(requirements));

        let err = guard
            .authorize("reports.view", Some(&identity(CUSTOMER)))
            .unwrap_err();
        assert_eq!(
            err,
            AccessDenied::RoleMismatch {
                required: vec!["ADMIN".into(), "AUDITOR".into()],
                actual: CUSTOMER.into(),
            }
        );
    }
}
