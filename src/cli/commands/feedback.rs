//! Feedback command

use crate::app::AppConfig;
use crate::error::Error;
use crate::history::FeedbackLog;
use anyhow::Result;

/// Append a comment to the feedback log
pub fn run_feedback_command(theme: &str, message: &str, app: &AppConfig) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::Validation("Feedback message must not be empty".to_string()).into());
    }

    let log = FeedbackLog::in_dir(&app.resolved_data_dir());
    log.append(theme, message)?;
    println!("Thanks for the feedback! Saved to {}", log.path().display());

    Ok(())
}
