use serde_json::json;

use crate::cli::{utils, OutputFormat};
use crate::config::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();
    let url = DatabaseManager::connection_url(config)?;
    let pool = DatabaseManager::connect_lazy(config)?;

    DatabaseManager::migrate(&pool).await?;
    utils::output_success(
        &output_format,
        "Migrations applied",
        Some(json!({ "database": DatabaseManager::redact(&url) })),
    )
}
