//! Recent history command

use crate::app::AppConfig;
use crate::history::HistoryStore;
use anyhow::Result;

/// Print the latest posts, newest first
pub fn run_history_command(app: &AppConfig) -> Result<()> {
    let store = HistoryStore::with_root(app.resolved_data_dir())?;
    let history = store.load()?;

    if history.is_empty() {
        println!("No posts generated yet.");
        return Ok(());
    }

    println!("Recent posts:");
    for (i, entry) in history.recent().iter().enumerate() {
        println!(
            "  {}. {} → {} ({})",
            i + 1,
            entry.theme,
            entry.subtopic,
            entry.recorded_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
