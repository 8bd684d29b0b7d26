use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{require_text, ServiceError, ServiceResult};
use crate::auth::password::{hash_password, verify_password};
use crate::database::models::User;
use crate::database::DatabaseError;
use crate::domain::Currency;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub home_currency: Option<String>,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, input: RegisterUser) -> ServiceResult<User> {
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        let username = match input.username.as_deref() {
            Some(name) => require_text("username", name, 100)?,
            None => email.split('@').next().unwrap_or_default().to_string(),
        };
        let home_currency = match input.home_currency.as_deref() {
            Some(code) => Currency::normalize(code)?,
            None => Currency::ZAR,
        };
        let password_hash = hash_password(&input.password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, username, password_hash, home_currency)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&username)
        .bind(&password_hash)
        .bind(home_currency.code())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_unique_violation(e, "Email is already registered"))?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// `None` when the email is unknown, the account is not active, or the
    /// password does not match.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Option<User>> {
        let email = normalize_email(email)?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user.filter(|u| u.is_active() && verify_password(password, &u.password_hash)))
    }

    pub async fn get(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn home_currency(&self, user_id: Uuid) -> ServiceResult<Currency> {
        let code: Option<String> = sqlx::query_scalar("SELECT home_currency FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        match code {
            Some(code) => Ok(Currency::from_code(&code)?),
            None => Ok(Currency::ZAR),
        }
    }

    pub async fn active_user_ids(&self) -> ServiceResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT id FROM users WHERE status = 'active' ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

fn normalize_email(raw: &str) -> ServiceResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map_or(false, |(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ServiceError::validation("email", "a valid email is required"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(normalize_email("ada").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ada@localhost").is_err());
    }
}
