//! User repository.

use chrono::{DateTime, Utc};
use scenecraft_models::{Role, User, UserId};
use sqlx::PgPool;
use sqlx::Row;

use crate::error::DbResult;

#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user_if_absent(&self, user_id: &UserId, role: Role, now: DateTime<Utc>) -> DbResult<User> {
        let role_str = role_to_str(role);
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, role, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, role, created_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(role_str)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_user(row))
    }

    pub async fn get_user(&self, user_id: &UserId) -> DbResult<Option<User>> {
        let row = sqlx::query("SELECT user_id, role, created_at FROM users WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_user))
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Admin => "admin",
    }
}

fn row_to_user(row: sqlx::postgres::PgRow) -> User {
    let role_str: String = row.get("role");
    let role = if role_str == "admin" { Role::Admin } else { Role::User };
    User {
        user_id: UserId::from(row.get::<String, _>("user_id")),
        role,
        created_at: row.get("created_at"),
    }
}
