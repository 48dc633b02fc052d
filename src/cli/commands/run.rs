//! Pipeline run command

use crate::app::AppConfig;
use crate::config::PipelineConfig;
use crate::export;
use crate::generation::GeminiClient;
use crate::history::HistoryStore;
use crate::pipeline::{
    CaptionLength, Formality, PipelineController, PipelineEvent, PipelineState, PipelineSteps,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Options for a single pipeline run
#[derive(Debug, Clone)]
pub struct RunParams {
    pub theme: String,
    pub count: usize,
    pub length: CaptionLength,
    pub formality: Formality,
    pub image: bool,
    pub output_dir: Option<PathBuf>,
}

/// Run the pipeline end to end against the configured backend
pub async fn run_pipeline(params: RunParams, app: &AppConfig) -> Result<()> {
    let config = PipelineConfig::load(app.config_path.as_deref())
        .context("Failed to load pipeline configuration")?;
    let client = Arc::new(GeminiClient::from_config(&config.backend)?);
    let steps = Arc::new(PipelineSteps::from_config(client, &config)?);
    let controller = PipelineController::new(steps);

    let state = drive_session(&controller, &params).await?;
    print_state(&state);

    let store = HistoryStore::with_root(app.resolved_data_dir())?;
    if store.record_state(&state)? {
        info!("Recorded post in history");
    }

    if let Some(dir) = &params.output_dir {
        for path in export::write_artifacts(dir, &state)? {
            println!("💾 Saved {}", path.display());
        }
    }

    Ok(())
}

/// Feed one session the events of a full run
pub async fn drive_session(
    controller: &PipelineController,
    params: &RunParams,
) -> Result<PipelineState> {
    let mut state = PipelineState::new();

    controller
        .advance(
            &mut state,
            PipelineEvent::SetTheme {
                theme: params.theme.clone(),
                count: params.count,
            },
        )
        .await
        .context("Failed to discover and select a subtopic")?;

    controller
        .advance(
            &mut state,
            PipelineEvent::GenerateCaption {
                length: params.length,
                formality: params.formality,
            },
        )
        .await
        .context("Failed to generate the caption")?;

    if params.image {
        controller
            .advance(&mut state, PipelineEvent::GenerateImagePrompt)
            .await
            .context("Failed to generate the image prompt")?;
    }

    Ok(state)
}

fn print_state(state: &PipelineState) {
    if let Some(theme) = state.theme() {
        println!("🎯 Theme: {theme}");
    }

    if let Some(subtopics) = state.subtopics() {
        println!("\n📋 Subtopics:");
        for (i, subtopic) in subtopics.iter().enumerate() {
            println!("  {}. {}", i + 1, subtopic);
        }
    }

    if let Some(selection) = state.selection() {
        println!("\n✅ Chosen: {}", selection.choice);
        println!("   Why: {}", selection.reason);
    }

    if let Some(caption) = state.caption() {
        println!("\n📝 Caption:\n{}", caption.caption);
        if let Some(hashtags) = &caption.hashtags {
            println!("{}", hashtags.join(" "));
        }
        if let Some(cta) = &caption.cta {
            println!("👉 {cta}");
        }
    }

    if let Some(prompt) = state.image_prompt() {
        println!("\n🎨 Image prompt:\n{prompt}");
    }
}
