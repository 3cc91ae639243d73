//! `User`: created on first authenticated submission, never deleted by the core.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub user_id: UserId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Authorization rule shared by status/cancel/artifacts: the acting
    /// principal must own the job or hold role admin.
    pub fn may_act_on(&self, job_owner: &UserId) -> bool {
        self.is_admin() || &self.user_id == job_owner
    }
}
