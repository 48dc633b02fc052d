//! Per-session pipeline state and the events that drive it

use super::types::{CaptionLength, CaptionResult, Formality, Selection, Theme, DEFAULT_SUBTOPICS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a session has progressed.
///
/// Derived from which results are present, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    ThemeSet,
    SubtopicsReady,
    SelectionReady,
    CaptionReady,
    ImagePromptReady,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::ThemeSet => "theme set",
            PipelineStage::SubtopicsReady => "subtopics ready",
            PipelineStage::SelectionReady => "selection ready",
            PipelineStage::CaptionReady => "caption ready",
            PipelineStage::ImagePromptReady => "image prompt ready",
        };
        f.write_str(label)
    }
}

/// User interaction fed to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Submit a theme; triggers discovery and selection
    SetTheme {
        theme: String,
        #[serde(default = "default_count")]
        count: usize,
    },
    /// Finish any automatic step a previous failure left undone
    Resume,
    GenerateCaption {
        #[serde(default)]
        length: CaptionLength,
        #[serde(default)]
        formality: Formality,
    },
    GenerateImagePrompt,
    /// Start over with an empty session
    Reset,
}

fn default_count() -> usize {
    DEFAULT_SUBTOPICS
}

/// Everything one session has produced so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    theme: Option<Theme>,
    count: usize,
    subtopics: Option<Vec<String>>,
    selection: Option<Selection>,
    caption: Option<CaptionResult>,
    image_prompt: Option<String>,
    last_error: Option<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> PipelineStage {
        if self.theme.is_none() {
            PipelineStage::Idle
        } else if self.image_prompt.is_some() {
            PipelineStage::ImagePromptReady
        } else if self.caption.is_some() {
            PipelineStage::CaptionReady
        } else if self.selection.is_some() {
            PipelineStage::SelectionReady
        } else if self.subtopics.is_some() {
            PipelineStage::SubtopicsReady
        } else {
            PipelineStage::ThemeSet
        }
    }

    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    /// Requested number of subtopics for the current theme
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn subtopics(&self) -> Option<&[String]> {
        self.subtopics.as_deref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn caption(&self) -> Option<&CaptionResult> {
        self.caption.as_ref()
    }

    pub fn image_prompt(&self) -> Option<&str> {
        self.image_prompt.as_deref()
    }

    /// Message of the most recent failed event, cleared on the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn is_current(&self, theme: &Theme, count: usize) -> bool {
        self.theme.as_ref() == Some(theme) && self.count == count
    }

    /// Install a new theme, dropping every result derived from the old one
    pub(crate) fn start(&mut self, theme: Theme, count: usize) {
        *self = Self {
            theme: Some(theme),
            count,
            ..Self::default()
        };
    }

    pub(crate) fn set_subtopics(&mut self, subtopics: Vec<String>) {
        self.subtopics = Some(subtopics);
        self.selection = None;
        self.caption = None;
        self.image_prompt = None;
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
        self.caption = None;
        self.image_prompt = None;
    }

    pub(crate) fn set_caption(&mut self, caption: CaptionResult) {
        self.caption = Some(caption);
    }

    pub(crate) fn set_image_prompt(&mut self, prompt: String) {
        self.image_prompt = Some(prompt);
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme() -> Theme {
        Theme::parse("sustentabilidade").unwrap()
    }

    #[test]
    fn test_stage_follows_present_results() {
        let mut state = PipelineState::new();
        assert_eq!(state.stage(), PipelineStage::Idle);

        state.start(theme(), 5);
        assert_eq!(state.stage(), PipelineStage::ThemeSet);

        state.set_subtopics(vec!["A".to_string()]);
        assert_eq!(state.stage(), PipelineStage::SubtopicsReady);

        state.set_selection(Selection {
            choice: "A".to_string(),
            reason: "r".to_string(),
        });
        assert_eq!(state.stage(), PipelineStage::SelectionReady);

        state.set_image_prompt("prompt".to_string());
        assert_eq!(state.stage(), PipelineStage::ImagePromptReady);
    }

    #[test]
    fn test_start_clears_downstream_results() {
        let mut state = PipelineState::new();
        state.start(theme(), 5);
        state.set_subtopics(vec!["A".to_string()]);
        state.set_caption(CaptionResult::plain("hello"));
        state.record_error("boom".to_string());

        state.start(Theme::parse("culinária").unwrap(), 3);
        assert_eq!(state.theme().map(Theme::as_str), Some("culinária"));
        assert_eq!(state.count(), 3);
        assert!(state.subtopics().is_none());
        assert!(state.caption().is_none());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_new_selection_drops_outputs_of_previous_one() {
        let mut state = PipelineState::new();
        state.start(theme(), 5);
        state.set_subtopics(vec!["A".to_string(), "B".to_string()]);
        state.set_caption(CaptionResult::plain("about A"));
        state.set_selection(Selection {
            choice: "B".to_string(),
            reason: "r".to_string(),
        });
        assert!(state.caption().is_none());
    }

    #[test]
    fn test_events_deserialize_from_tagged_json() {
        let event: PipelineEvent =
            serde_json::from_str(r#"{"action": "set_theme", "theme": "café"}"#).unwrap();
        assert_eq!(
            event,
            PipelineEvent::SetTheme {
                theme: "café".to_string(),
                count: DEFAULT_SUBTOPICS,
            }
        );

        let event: PipelineEvent =
            serde_json::from_str(r#"{"action": "generate_caption", "length": "short"}"#).unwrap();
        assert_eq!(
            event,
            PipelineEvent::GenerateCaption {
                length: CaptionLength::Short,
                formality: Formality::Medium,
            }
        );
    }
}
