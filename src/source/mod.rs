//! Source abstraction for Sitat.
//!
//! A source is anything that can be flattened into ordered [`SourceUnit`]s: a YouTube
//! transcript or a folder of Markdown/text documents. Both kinds produce the same unit
//! shape so the mapper, chunker and retriever never need to know which one they hold.

mod document;
mod youtube;

pub use document::DocumentSource;
pub use youtube::{extract_video_id, parse_json3, watch_url, YoutubeSource};

use crate::error::{Result, SitatError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of source a collection was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Transcript,
    Document,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Transcript => write!(f, "transcript"),
            SourceKind::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transcript" => Ok(SourceKind::Transcript),
            "document" => Ok(SourceKind::Document),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

/// A human-meaningful pointer into the original source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourcePosition {
    /// Offset into a video, in seconds.
    Timestamp { seconds: f64 },
    /// 1-based line within a named document.
    Line { document: String, line: u32 },
}

impl SourcePosition {
    pub fn timestamp(seconds: f64) -> Self {
        SourcePosition::Timestamp { seconds }
    }

    pub fn line(document: impl Into<String>, line: u32) -> Self {
        SourcePosition::Line {
            document: document.into(),
            line,
        }
    }

    /// Scalar offset along this position's axis (seconds or line number).
    pub fn offset(&self) -> f64 {
        match self {
            SourcePosition::Timestamp { seconds } => *seconds,
            SourcePosition::Line { line, .. } => *line as f64,
        }
    }

    /// Document name for line positions.
    pub fn document(&self) -> Option<&str> {
        match self {
            SourcePosition::Timestamp { .. } => None,
            SourcePosition::Line { document, .. } => Some(document),
        }
    }

    /// Whether two positions can be compared by offset.
    ///
    /// Timestamps share one axis; lines only compare within the same document.
    pub fn same_axis(&self, other: &SourcePosition) -> bool {
        match (self, other) {
            (SourcePosition::Timestamp { .. }, SourcePosition::Timestamp { .. }) => true,
            (SourcePosition::Line { document: a, .. }, SourcePosition::Line { document: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }

    /// Short label for display, e.g. `01:15` or `notes.md:12`.
    pub fn label(&self) -> String {
        match self {
            SourcePosition::Timestamp { seconds } => format_timestamp(*seconds),
            SourcePosition::Line { document, line } => format!("{}:{}", document, line),
        }
    }
}

/// One atomic piece of raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Raw text of this unit.
    pub text: String,
    /// Where this unit starts in the original source.
    pub position: SourcePosition,
    /// Segment duration, for transcript units.
    pub duration_seconds: Option<f64>,
}

impl SourceUnit {
    /// A transcript segment.
    pub fn transcript(text: impl Into<String>, start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            text: text.into(),
            position: SourcePosition::timestamp(start_seconds),
            duration_seconds: Some(duration_seconds),
        }
    }

    /// A document paragraph starting at `line` (1-based).
    pub fn paragraph(text: impl Into<String>, document: impl Into<String>, line: u32) -> Self {
        Self {
            text: text.into(),
            position: SourcePosition::line(document, line),
            duration_seconds: None,
        }
    }
}

/// A fetched source ready for flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedSource {
    /// Collection identifier.
    pub source_id: String,
    /// Human-readable title.
    pub title: String,
    /// Kind of source.
    pub kind: SourceKind,
    /// Canonical URL or path the source was read from.
    pub origin: String,
    /// Ordered units.
    pub units: Vec<SourceUnit>,
}

/// Trait for source providers.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// The kind of source this fetcher produces.
    fn kind(&self) -> SourceKind;

    /// Check if this fetcher can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    /// Derive the default source id for an input.
    fn source_id(&self, input: &str) -> Option<String>;

    /// Fetch the ordered units for an input.
    async fn fetch(&self, input: &str) -> Result<FetchedSource>;
}

/// Detect the appropriate fetcher for the given input.
///
/// Existing paths win over YouTube IDs, since an 11-character folder name is also a
/// syntactically valid bare video ID.
pub fn detect_fetcher(input: &str, transcript_language: &str) -> Option<Box<dyn SourceFetcher>> {
    let documents = DocumentSource::new();
    if std::path::Path::new(input).exists() && documents.can_handle(input) {
        return Some(Box::new(documents));
    }

    let youtube = YoutubeSource::new().with_language(transcript_language);
    if youtube.can_handle(input) {
        return Some(Box::new(youtube));
    }

    None
}

/// Format seconds as MM:SS, or HH:MM:SS from one hour on.
///
/// Fractions are truncated so a citation never points past the cited moment.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` into seconds.
///
/// Each part must be a finite, non-negative number.
pub fn parse_timestamp(input: &str) -> Result<f64> {
    let invalid = || {
        SitatError::InvalidInput(format!(
            "Invalid timestamp '{}'. Use SS, MM:SS or HH:MM:SS.",
            input
        ))
    };

    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let mut total = 0.0;
    for part in &parts {
        let value: f64 = part.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        total = total * 60.0 + value;
    }
    if !total.is_finite() {
        return Err(invalid());
    }
    Ok(total)
}

/// Lowercase an arbitrary name into an id-safe slug.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            slug.push('_');
            last_underscore = true;
        }
    }
    slug.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.0), "01:15");
        assert_eq!(format_timestamp(3599.9), "59:59");
        assert_eq!(format_timestamp(3600.0), "01:00:00");
        assert_eq!(format_timestamp(3661.0), "01:01:01");
    }

    #[test]
    fn test_format_timestamp_truncates() {
        assert_eq!(format_timestamp(74.999), "01:14");
        assert_eq!(format_timestamp(-3.0), "00:00");
        assert_eq!(format_timestamp(f64::NAN), "00:00");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("42").unwrap(), 42.0);
        assert_eq!(parse_timestamp("01:15").unwrap(), 75.0);
        assert_eq!(parse_timestamp("1:01:01").unwrap(), 3661.0);
        assert!(parse_timestamp("a:b").is_err());
        assert!(parse_timestamp("1:2:3:4").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_parse_timestamp_rejects_non_finite() {
        for input in ["inf", "NaN", "-inf", "1:inf", "infinity:00", "-5", "1e308:00"] {
            let err = parse_timestamp(input).unwrap_err();
            assert!(matches!(err, SitatError::InvalidInput(_)), "{}", input);
        }
    }

    #[test]
    fn test_position_axis() {
        let a = SourcePosition::line("a.md", 3);
        let b = SourcePosition::line("b.md", 3);
        let t = SourcePosition::timestamp(3.0);

        assert!(a.same_axis(&SourcePosition::line("a.md", 10)));
        assert!(!a.same_axis(&b));
        assert!(!a.same_axis(&t));
        assert!(t.same_axis(&SourcePosition::timestamp(0.0)));
        assert_eq!(a.label(), "a.md:3");
        assert_eq!(t.label(), "00:03");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Notes (2024)"), "my_notes_2024");
        assert_eq!(slugify("__x__"), "x");
    }
}
