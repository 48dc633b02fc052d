//! Content pipeline
//!
//! Theme in, post material out: subtopic discovery and selection run
//! automatically once a theme is set; caption and image prompt are
//! produced on request.

pub mod controller;
pub mod state;
pub mod steps;
pub mod types;

pub use controller::{validate_event, PipelineController};
pub use state::{PipelineEvent, PipelineStage, PipelineState};
pub use steps::PipelineSteps;
pub use types::{CaptionLength, CaptionResult, Formality, Selection, Theme};
