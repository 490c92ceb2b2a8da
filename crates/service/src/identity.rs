//! The requesting user as seen by the settings layer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use models::user_role::ROLE_ADMIN;

/// An authenticated user and the roles it holds. Anonymous requests are
/// represented as `Option::<&Requester>::None` at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: i32,
    pub roles: BTreeSet<String>,
}

impl Requester {
    pub fn new<I, S>(id: i32, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { id, roles: roles.into_iter().map(Into::into).collect() }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}
