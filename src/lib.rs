//! # Postcraft
//!
//! Turns a theme into Instagram post material: a handful of subtopics, the
//! most relevant one, a caption and an image-generation prompt.
//!
//! ## Usage
//!
//! ```bash
//! postcraft run --theme "sustentabilidade" --count 5 --length short --image
//! ```
//!
//! ## Modules
//!
//! - `app` - Process-level settings, logging and fatal error reporting
//! - `cli` - Argument parsing and subcommands
//! - `config` - Pipeline configuration (TOML file plus environment)
//! - `export` - JSON documents for captions and image prompts
//! - `generation` - Backend client, response cache, retry policy and worker pool
//! - `history` - Recent posts and the feedback log
//! - `pipeline` - Steps, per-session state and the event controller
//! - `testing` - Scripted backend and fixtures for tests
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod history;
pub mod pipeline;

pub mod testing;

pub use error::{Error, Result};
