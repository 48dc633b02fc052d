//! Event-driven sequencing of the pipeline steps
//!
//! The controller owns no session data. Each call takes the caller's
//! [`PipelineState`], checks the event against it, runs whatever steps
//! the event implies and writes the results back.

use super::state::{PipelineEvent, PipelineStage, PipelineState};
use super::steps::PipelineSteps;
use super::types::{validate_count, Theme};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Check that `event` may be applied to `state` (pure)
pub fn validate_event(state: &PipelineState, event: &PipelineEvent) -> Result<()> {
    let missing = match event {
        PipelineEvent::SetTheme { .. } | PipelineEvent::Reset => None,
        PipelineEvent::Resume if state.theme().is_none() => Some("a theme"),
        PipelineEvent::Resume => None,
        PipelineEvent::GenerateCaption { .. } | PipelineEvent::GenerateImagePrompt
            if state.selection().is_none() =>
        {
            Some("a selected subtopic")
        }
        PipelineEvent::GenerateCaption { .. } | PipelineEvent::GenerateImagePrompt => None,
    };

    match missing {
        None => Ok(()),
        Some(requirement) => Err(Error::InvalidTransition(format!(
            "Cannot apply {} at stage '{}' without {}",
            event_name(event),
            state.stage(),
            requirement
        ))),
    }
}

fn event_name(event: &PipelineEvent) -> &'static str {
    match event {
        PipelineEvent::SetTheme { .. } => "set_theme",
        PipelineEvent::Resume => "resume",
        PipelineEvent::GenerateCaption { .. } => "generate_caption",
        PipelineEvent::GenerateImagePrompt => "generate_image_prompt",
        PipelineEvent::Reset => "reset",
    }
}

/// Drives sessions through the pipeline
#[derive(Clone)]
pub struct PipelineController {
    steps: Arc<PipelineSteps>,
}

impl PipelineController {
    pub fn new(steps: Arc<PipelineSteps>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &PipelineSteps {
        &self.steps
    }

    /// Apply one event to a session and return the resulting stage.
    ///
    /// On failure every result produced before the event is kept, results
    /// completed during the event are kept too, and the error message is
    /// recorded in [`PipelineState::last_error`].
    pub async fn advance(
        &self,
        state: &mut PipelineState,
        event: PipelineEvent,
    ) -> Result<PipelineStage> {
        let name = event_name(&event);
        match self.apply(state, event).await {
            Ok(stage) => {
                state.clear_error();
                debug!(event = name, stage = %stage, "Event applied");
                Ok(stage)
            }
            Err(err) => {
                warn!(event = name, stage = %state.stage(), error = %err, "Event failed");
                state.record_error(err.to_string());
                Err(err)
            }
        }
    }

    async fn apply(&self, state: &mut PipelineState, event: PipelineEvent) -> Result<PipelineStage> {
        validate_event(state, &event)?;

        match event {
            PipelineEvent::SetTheme { theme, count } => {
                let theme = Theme::parse(&theme)?;
                let count = validate_count(count)?;
                if !state.is_current(&theme, count) {
                    info!(theme = %theme, count, "Starting pipeline for new theme");
                    state.start(theme, count);
                }
                self.complete_automatic_steps(state).await
            }
            PipelineEvent::Resume => self.complete_automatic_steps(state).await,
            PipelineEvent::GenerateCaption { length, formality } => {
                let subtopic = chosen_subtopic(state)?;
                let caption = self
                    .steps
                    .generate_caption(&subtopic, length, formality)
                    .await?;
                state.set_caption(caption);
                Ok(state.stage())
            }
            PipelineEvent::GenerateImagePrompt => {
                let subtopic = chosen_subtopic(state)?;
                let prompt = self.steps.generate_image_prompt(&subtopic).await?;
                state.set_image_prompt(prompt);
                Ok(state.stage())
            }
            PipelineEvent::Reset => {
                state.reset();
                Ok(state.stage())
            }
        }
    }

    /// Run discovery and selection for whichever of them is still missing
    async fn complete_automatic_steps(&self, state: &mut PipelineState) -> Result<PipelineStage> {
        let theme = state
            .theme()
            .cloned()
            .ok_or_else(|| Error::InvalidTransition("No theme has been set".to_string()))?;

        // An empty list means discovery degraded; run it again
        if state.subtopics().map_or(true, <[String]>::is_empty) {
            let subtopics = self.steps.discover_subtopics(&theme, state.count()).await?;
            state.set_subtopics(subtopics);
        }

        if state.selection().is_none() {
            let subtopics = state.subtopics().unwrap_or_default().to_vec();
            if subtopics.is_empty() {
                return Err(Error::Backend(format!(
                    "Backend returned no usable subtopics for '{theme}'"
                )));
            }
            let selection = self.steps.select_subtopic(&theme, &subtopics).await?;
            info!(choice = %selection.choice, "Subtopic selected");
            state.set_selection(selection);
        }

        Ok(state.stage())
    }
}

fn chosen_subtopic(state: &PipelineState) -> Result<String> {
    state
        .selection()
        .map(|selection| selection.choice.clone())
        .ok_or_else(|| Error::InvalidTransition("No subtopic has been selected".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{CaptionLength, Formality};

    #[test]
    fn test_validate_event_on_fresh_state() {
        let state = PipelineState::new();

        assert!(validate_event(
            &state,
            &PipelineEvent::SetTheme {
                theme: "x".to_string(),
                count: 5
            }
        )
        .is_ok());
        assert!(validate_event(&state, &PipelineEvent::Reset).is_ok());

        for event in [
            PipelineEvent::Resume,
            PipelineEvent::GenerateImagePrompt,
            PipelineEvent::GenerateCaption {
                length: CaptionLength::Short,
                formality: Formality::High,
            },
        ] {
            assert!(matches!(
                validate_event(&state, &event),
                Err(Error::InvalidTransition(_))
            ));
        }
    }

    #[test]
    fn test_invalid_transition_message_names_stage() {
        let err = validate_event(&PipelineState::new(), &PipelineEvent::GenerateImagePrompt)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition: Cannot apply generate_image_prompt at stage 'idle' without a selected subtopic"
        );
    }
}
