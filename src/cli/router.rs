//! Command routing and execution

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::*;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, app: &AppConfig) -> Result<()> {
    match command {
        Commands::Run {
            theme,
            count,
            length,
            formality,
            image,
            output_dir,
        } => {
            let params = RunParams {
                theme,
                count,
                length,
                formality,
                image,
                output_dir,
            };
            run_pipeline(params, app).await
        }
        Commands::History => run_history_command(app),
        Commands::Feedback { theme, message } => run_feedback_command(&theme, &message, app),
    }
}
