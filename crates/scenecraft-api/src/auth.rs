//! Bearer-token authentication.
//!
//! Token signature verification is an external middleware's job (spec §6
//! treats authentication as already solved upstream); the core only needs
//! the `user_id` the token names. The extractor below trusts the bearer
//! token's value as that `user_id` and looks up or creates the
//! corresponding `User` row to learn its role for authorization checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use scenecraft_models::{Role, User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal for the current request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn user_id(&self) -> &UserId {
        &self.0.user_id
    }

    pub fn may_act_on(&self, owner: &UserId) -> bool {
        self.0.may_act_on(owner)
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::permission("missing Authorization header"))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| ApiError::permission("invalid Authorization header format"))?;

        let user_id = UserId::from(token.trim());
        if user_id.as_str().is_empty() {
            return Err(ApiError::permission("empty bearer token"));
        }

        let role = if state.config.admin_user_ids.iter().any(|id| id == user_id.as_str()) { Role::Admin } else { Role::User };

        let user = state.user_repo.create_user_if_absent(&user_id, role, Utc::now()).await?;
        Ok(AuthUser(user))
    }
}
