use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{require_text, ServiceResult};
use crate::auth::api_key;
use crate::database::models::ApiKey;

/// Returned once on creation; the plain key is never stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    #[serde(flatten)]
    pub api_key: ApiKey,
    pub key: String,
}

/// Identity resolved from a valid key.
#[derive(Debug, Clone)]
pub struct ApiKeyOwner {
    pub key_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
}

pub struct ApiKeyService {
    pool: PgPool,
}

impl ApiKeyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        scopes: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> ServiceResult<CreatedApiKey> {
        let name = require_text("name", name, 100)?;
        let generated = api_key::generate();

        let api_key = sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (id, user_id, name, key_prefix, key_hash, scopes, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&name)
        .bind(&generated.prefix)
        .bind(&generated.hash)
        .bind(scopes.unwrap_or("read,write"))
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        info!("Created API key {} for user {}", api_key.key_prefix, user_id);
        Ok(CreatedApiKey {
            api_key,
            key: generated.key,
        })
    }

    pub async fn list(&self, user_id: Uuid) -> ServiceResult<Vec<ApiKey>> {
        let keys = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    /// `false` when the key does not exist for this user.
    pub async fn revoke(&self, user_id: Uuid, key_id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_revoked = TRUE WHERE id = $1 AND user_id = $2")
            .bind(key_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            info!("Revoked API key {}", key_id);
        }
        Ok(result.rows_affected() > 0)
    }

    /// Resolve a presented key. `None` for malformed, unknown, revoked or
    /// expired keys. Stamps `last_used_at` on success.
    pub async fn validate(&self, presented: &str) -> ServiceResult<Option<ApiKeyOwner>> {
        if !api_key::is_well_formed(presented) {
            return Ok(None);
        }
        let Some(prefix) = api_key::extract_prefix(presented) else {
            return Ok(None);
        };

        let candidates = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_prefix = $1")
            .bind(&prefix)
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        let Some(key) = candidates
            .into_iter()
            .find(|k| api_key::verify(presented, &k.key_hash))
        else {
            debug!("No API key matches prefix {}", prefix);
            return Ok(None);
        };

        if !key.is_usable(now) {
            warn!("Rejected revoked or expired API key {}", key.key_prefix);
            return Ok(None);
        }

        let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = $1 AND status = 'active'")
            .bind(key.user_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(email) = email else {
            return Ok(None);
        };

        sqlx::query("UPDATE api_keys SET last_used_at = $1 WHERE id = $2")
            .bind(now)
            .bind(key.id)
            .execute(&self.pool)
            .await?;

        Ok(Some(ApiKeyOwner {
            key_id: key.id,
            user_id: key.user_id,
            email,
        }))
    }
}
