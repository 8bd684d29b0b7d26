use clap::Subcommand;
use serde_json::json;
use std::time::Instant;

use crate::app::AppState;
use crate::cli::{utils, OutputFormat};
use crate::config::config;
use crate::jobs::JobKind;

#[derive(Subcommand)]
pub enum JobCommands {
    #[command(about = "Run one job immediately, outside its schedule")]
    Run {
        #[arg(value_enum, help = "Job to run")]
        job: JobKind,
    },
}

pub async fn handle(cmd: JobCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        JobCommands::Run { job } => {
            let state = AppState::from_config(config())?;
            let started = Instant::now();
            let summary = job.run_once(&state).await?;

            utils::output_success(
                &output_format,
                &format!("Job {} finished in {:?}", job.name(), started.elapsed()),
                Some(json!({ "job": job.name(), "summary": summary })),
            )
        }
    }
}
