//! Response parsing with structured decoding and text fallbacks
//!
//! Parsers never fail: a response that does not have the expected shape
//! degrades to a documented fallback instead of surfacing an error.

use crate::pipeline::types::{CaptionResult, Selection};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:\d+[.)][ \t]*|[-•*][ \t]+)(.+)$").expect("Invalid regex pattern")
});

static CHOICE_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:choice|escolha)\b[\s*_]*:[\s*_]*(.+)").expect("Invalid regex pattern")
});

static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*\n?(.*?)```").expect("Invalid regex pattern")
});

/// Lines shorter than this are ignored by the line fallback
const MIN_FALLBACK_LINE_CHARS: usize = 5;

/// Extract at most `count` subtopics from a backend response.
///
/// Enumerated or bulleted lines win; if there are none, every line longer
/// than five characters is taken verbatim (trimmed).
pub fn parse_subtopics(text: &str, count: usize) -> Vec<String> {
    let listed: Vec<String> = LIST_ITEM_REGEX
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| clean_list_item(m.as_str()))
        .filter(|item| !item.is_empty())
        .collect();

    let items = if listed.is_empty() {
        debug!("No list markers found, falling back to plain lines");
        text.lines()
            .map(str::trim)
            .filter(|line| line.chars().count() > MIN_FALLBACK_LINE_CHARS)
            .map(str::to_string)
            .collect()
    } else {
        listed
    };

    items.into_iter().take(count).collect()
}

/// Decode the selection, falling back to a `Choice:` marker, then to the
/// first subtopic. The choice is always one of `subtopics`.
///
/// `subtopics` must be non-empty.
pub fn parse_selection(raw: &str, subtopics: &[String]) -> Selection {
    #[derive(Deserialize)]
    struct StructuredSelection {
        choice: String,
        reason: String,
    }

    let Some(first) = subtopics.first() else {
        return Selection {
            choice: String::new(),
            reason: raw.to_string(),
        };
    };

    if let Some(decoded) = decode_structured::<StructuredSelection>(raw) {
        return Selection {
            choice: clamp_choice(&decoded.choice, subtopics),
            reason: decoded.reason,
        };
    }

    let choice = match CHOICE_MARKER_REGEX.captures(raw).and_then(|cap| cap.get(1)) {
        Some(marker) => clamp_choice(marker.as_str(), subtopics),
        None => {
            debug!("Selection response has no structure or marker, using first subtopic");
            first.clone()
        }
    };

    Selection {
        choice,
        reason: raw.to_string(),
    }
}

/// Decode a structured caption, or wrap the raw text as the caption
pub fn parse_caption(raw: &str) -> CaptionResult {
    decode_structured(raw).unwrap_or_else(|| {
        debug!("Caption response is not structured, keeping raw text");
        CaptionResult::plain(raw)
    })
}

/// Decode a fenced or bare JSON body, then the outermost `{...}` span
/// when the object is surrounded by prose
fn decode_structured<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if let Ok(decoded) = serde_json::from_str(extract_json(raw)) {
        return Some(decoded);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Body of the first fenced code block, or the trimmed input
pub fn extract_json(raw: &str) -> &str {
    CODE_FENCE_REGEX
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map_or(raw.trim(), |m| m.as_str().trim())
}

/// Map a free-text choice onto the matching input subtopic
fn clamp_choice(candidate: &str, subtopics: &[String]) -> String {
    let wanted = normalize(candidate);

    if let Some(found) = subtopics.iter().find(|s| normalize(s) == wanted) {
        return found.clone();
    }

    // "2" or "2. Topic" style answers refer to the list position
    if let Some(index) = leading_index(candidate) {
        if let Some(found) = index.checked_sub(1).and_then(|i| subtopics.get(i)) {
            return found.clone();
        }
    }

    if let Some(found) = subtopics
        .iter()
        .find(|s| !wanted.is_empty() && normalize(s).contains(&wanted))
    {
        return found.clone();
    }

    // Answers like "Topic B - because ..." carry the subtopic plus prose
    if let Some(found) = subtopics
        .iter()
        .map(|s| (s, normalize(s)))
        .filter(|(_, n)| !n.is_empty() && wanted.contains(n.as_str()))
        .max_by_key(|(_, n)| n.chars().count())
        .map(|(s, _)| s)
    {
        return found.clone();
    }

    warn!(
        choice = candidate.trim(),
        "Selected subtopic is not among the candidates, using the first one"
    );
    subtopics[0].clone()
}

fn leading_index(candidate: &str) -> Option<usize> {
    let digits: String = candidate
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn clean_list_item(item: &str) -> String {
    item.trim().trim_matches('*').trim().to_string()
}

fn normalize(text: &str) -> String {
    let text = text.trim();
    let text = LIST_ITEM_REGEX
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map_or(text, |m| m.as_str());
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '*' | '_' | '`' | '.'))
        .to_lowercase()
}
