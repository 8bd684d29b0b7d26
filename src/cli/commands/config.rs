use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::{utils, OutputFormat};
use crate::config::{config, AppConfig};
use crate::database::DatabaseManager;

const REDACTED: &str = "********";

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the configuration resolved from the environment, secrets redacted")]
    Show,
}

pub fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let shown = redacted(config())?;
            match output_format {
                OutputFormat::Json => utils::output_success(&output_format, "Configuration", Some(json!({ "config": shown }))),
                OutputFormat::Text => {
                    println!("{}", serde_json::to_string_pretty(&shown)?);
                    Ok(())
                }
            }
        }
    }
}

fn redacted(config: &AppConfig) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(config)?;
    value["security"]["jwt_secret"] = json!(REDACTED);
    if let Some(url) = config.database.url.as_deref() {
        value["database"]["url"] = json!(DatabaseManager::redact(url));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_hidden() {
        let mut config = AppConfig::from_env();
        config.security.jwt_secret = "super-secret".to_string();
        config.database.url = Some("postgres://lifeos:pw@db:5432/lifeos".to_string());

        let shown = redacted(&config).unwrap();
        assert_eq!(shown["security"]["jwt_secret"], REDACTED);
        assert!(!shown.to_string().contains("super-secret"));
        assert!(!shown.to_string().contains(":pw@"));
    }
}
