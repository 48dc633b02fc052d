//! CLI argument structures

use crate::pipeline::types::{CaptionLength, Formality, DEFAULT_SUBTOPICS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Turn a theme into ready-to-post Instagram material
#[derive(Parser)]
#[command(name = "postcraft")]
#[command(about = "postcraft - Generate Instagram captions and image prompts from a theme", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a pipeline configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for history and feedback files
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline for a theme
    #[command(name = "run")]
    Run {
        /// Theme to write about
        #[arg(short = 't', long)]
        theme: String,

        /// Number of subtopics to discover (3-10)
        #[arg(short = 'n', long, default_value_t = DEFAULT_SUBTOPICS)]
        count: usize,

        /// Caption length: short, medium or long
        #[arg(long, default_value = "medium")]
        length: CaptionLength,

        /// Caption formality: low, medium or high
        #[arg(long, default_value = "medium")]
        formality: Formality,

        /// Also generate an image prompt
        #[arg(long)]
        image: bool,

        /// Write caption.json and image_prompt.json into this directory
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Show the most recent posts
    #[command(name = "history")]
    History,

    /// Leave feedback about a generated post
    #[command(name = "feedback")]
    Feedback {
        /// Theme the feedback refers to
        #[arg(short = 't', long)]
        theme: String,

        /// Your comments
        #[arg(short = 'm', long)]
        message: String,
    },
}
