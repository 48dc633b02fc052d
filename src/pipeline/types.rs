//! Values flowing between pipeline steps

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_SUBTOPICS: usize = 3;
pub const MAX_SUBTOPICS: usize = 10;
pub const DEFAULT_SUBTOPICS: usize = 5;

/// User-supplied topic that seeds a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(String);

impl Theme {
    /// Trim and validate a theme; blank input is rejected
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("Theme must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a requested subtopic count against the supported range
pub fn validate_count(count: usize) -> Result<usize> {
    if (MIN_SUBTOPICS..=MAX_SUBTOPICS).contains(&count) {
        Ok(count)
    } else {
        Err(Error::Validation(format!(
            "Subtopic count must be between {MIN_SUBTOPICS} and {MAX_SUBTOPICS}, got {count}"
        )))
    }
}

/// The chosen subtopic and the backend's justification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub choice: String,
    pub reason: String,
}

/// Generated caption, with whatever structure the backend provided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionResult {
    #[serde(alias = "legenda", alias = "text")]
    pub caption: String,

    #[serde(
        default,
        deserialize_with = "hashtags_from_list_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub hashtags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,

    /// Any further fields the backend returned
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CaptionResult {
    /// Unstructured caption: the raw text only
    pub fn plain(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            hashtags: None,
            cta: None,
            extra: serde_json::Map::new(),
        }
    }
}

fn hashtags_from_list_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hashtags {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Hashtags>::deserialize(deserializer)? {
        Some(Hashtags::List(tags)) => Some(tags),
        Some(Hashtags::Text(text)) => Some(text.split_whitespace().map(str::to_string).collect()),
        None => None,
    })
}

/// Requested caption length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl CaptionLength {
    /// Wording used inside the caption prompt
    pub fn describe(self) -> &'static str {
        match self {
            CaptionLength::Short => "short (one or two sentences)",
            CaptionLength::Medium => "medium (a short paragraph)",
            CaptionLength::Long => "long (two or three paragraphs)",
        }
    }
}

impl fmt::Display for CaptionLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptionLength::Short => "short",
            CaptionLength::Medium => "medium",
            CaptionLength::Long => "long",
        })
    }
}

impl FromStr for CaptionLength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "short" | "curta" => Ok(CaptionLength::Short),
            "medium" | "média" | "media" => Ok(CaptionLength::Medium),
            "long" | "longa" => Ok(CaptionLength::Long),
            other => Err(Error::Validation(format!(
                "Unknown caption length '{other}' (expected short, medium or long)"
            ))),
        }
    }
}

/// Requested caption formality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Low,
    #[default]
    Medium,
    High,
}

impl Formality {
    /// Wording used inside the caption prompt
    pub fn describe(self) -> &'static str {
        match self {
            Formality::Low => "low, casual and playful",
            Formality::Medium => "medium, friendly but polished",
            Formality::High => "high, professional",
        }
    }
}

impl fmt::Display for Formality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Formality::Low => "low",
            Formality::Medium => "medium",
            Formality::High => "high",
        })
    }
}

impl FromStr for Formality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "baixa" => Ok(Formality::Low),
            "medium" | "média" | "media" => Ok(Formality::Medium),
            "high" | "alta" => Ok(Formality::High),
            other => Err(Error::Validation(format!(
                "Unknown formality '{other}' (expected low, medium or high)"
            ))),
        }
    }
}
