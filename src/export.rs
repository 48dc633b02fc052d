//! JSON documents for finished post material

use crate::error::Result;
use crate::pipeline::{CaptionResult, PipelineState};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CAPTION_FILE: &str = "caption.json";
pub const IMAGE_PROMPT_FILE: &str = "image_prompt.json";

#[derive(Serialize)]
struct ImagePromptDocument<'a> {
    prompt: &'a str,
}

/// Pretty JSON of the caption, including any extra fields the backend sent
pub fn caption_document(caption: &CaptionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(caption)?)
}

pub fn image_prompt_document(prompt: &str) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ImagePromptDocument { prompt })?)
}

/// Write whichever documents `state` can produce into `dir`.
///
/// Returns the paths written; a caption with empty text is skipped.
pub fn write_artifacts(dir: &Path, state: &PipelineState) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let caption = state.caption().filter(|c| !c.caption.is_empty());
    if caption.is_none() && state.image_prompt().is_none() {
        return Ok(written);
    }
    fs::create_dir_all(dir)?;

    if let Some(caption) = caption {
        let path = dir.join(CAPTION_FILE);
        fs::write(&path, caption_document(caption)?)?;
        written.push(path);
    }

    if let Some(prompt) = state.image_prompt() {
        let path = dir.join(IMAGE_PROMPT_FILE);
        fs::write(&path, image_prompt_document(prompt)?)?;
        written.push(path);
    }

    info!(files = written.len(), dir = %dir.display(), "Exported artifacts");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Theme;
    use tempfile::TempDir;

    #[test]
    fn test_caption_document_keeps_unicode_and_extra_fields() {
        let mut caption = CaptionResult::plain("Bora reciclar! ♻️");
        caption
            .extra
            .insert("mood".to_string(), serde_json::json!("animado"));

        let doc = caption_document(&caption).unwrap();
        assert!(doc.contains("\"caption\": \"Bora reciclar! ♻️\""));
        assert!(doc.contains("\"mood\": \"animado\""));
        assert!(!doc.contains("hashtags"));
    }

    #[test]
    fn test_image_prompt_document_shape() {
        let doc = image_prompt_document("sunset over solar panels").unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value, serde_json::json!({"prompt": "sunset over solar panels"}));
    }

    #[test]
    fn test_nothing_written_without_results() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");

        let written = write_artifacts(&out, &PipelineState::new()).unwrap();
        assert!(written.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_writes_present_documents() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = PipelineState::new();
        state.start(Theme::parse("café").unwrap(), 3);
        state.set_image_prompt("latte art close-up".to_string());

        let written = write_artifacts(temp_dir.path(), &state).unwrap();
        assert_eq!(written, vec![temp_dir.path().join(IMAGE_PROMPT_FILE)]);

        state.set_caption(CaptionResult::plain("Um café?"));
        let written = write_artifacts(temp_dir.path(), &state).unwrap();
        assert_eq!(written.len(), 2);
        let caption = fs::read_to_string(temp_dir.path().join(CAPTION_FILE)).unwrap();
        assert!(caption.contains("Um café?"));
    }
}
