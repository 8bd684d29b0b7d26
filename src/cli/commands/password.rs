use serde_json::json;

use crate::auth::password::hash_password;
use crate::cli::{utils, OutputFormat};

pub fn handle(password: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let hash = hash_password(password)?;

    match output_format {
        OutputFormat::Json => utils::output_success(&output_format, "Password hashed", Some(json!({ "hash": hash }))),
        OutputFormat::Text => {
            println!("{}", hash);
            Ok(())
        }
    }
}
