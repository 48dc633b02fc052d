//! Command implementation modules

pub mod feedback;
pub mod history;
pub mod run;

pub use feedback::run_feedback_command;
pub use history::run_history_command;
pub use run::{drive_session, run_pipeline, RunParams};
