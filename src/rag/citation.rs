//! Mapping inline `[n]` markers in an answer back to the passages behind them.

use super::Passage;
use crate::source::{extract_video_id, format_timestamp, SourceKind, SourcePosition};
use crate::vector_store::SourceInfo;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Characters of chunk text kept in a citation snippet.
const SNIPPET_CHARS: usize = 150;

/// Where a citation points in the original source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    /// `MM:SS` / `HH:MM:SS` for videos, `document:line` for documents.
    pub label: String,
    /// Deep link into the video, when one can be built.
    pub link: Option<String>,
}

/// One cited passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Marker number as it appears in the answer.
    pub marker: usize,
    pub chunk_id: String,
    pub source_position: SourcePosition,
    pub source_reference: SourceReference,
    /// Start of the chunk text.
    pub snippet: String,
}

/// A generated answer with its citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedAnswer {
    /// Model output, unchanged.
    pub answer_text: String,
    /// Citations in order of first appearance.
    pub citations: Vec<Citation>,
}

impl CitedAnswer {
    /// An answer that cites nothing.
    pub fn uncited(answer_text: impl Into<String>) -> Self {
        Self {
            answer_text: answer_text.into(),
            citations: Vec::new(),
        }
    }
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\s*(\d+(?:\s*,\s*\d+)*)\s*\]").expect("Invalid regex"))
}

/// Marker numbers in order of first appearance, without duplicates.
///
/// Accepts `[n]` and grouped forms such as `[1, 3]`.
pub fn extract_markers(answer: &str) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for caps in marker_regex().captures_iter(answer) {
        for number in caps[1].split(',') {
            if let Ok(n) = number.trim().parse::<usize>() {
                if seen.insert(n) {
                    markers.push(n);
                }
            }
        }
    }

    markers
}

/// Whole seconds for a deep link. Fractions are truncated and negatives clamp to 0.
fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    }
}

/// YouTube link that starts playback at `seconds`.
pub fn deep_link(video_id: &str, seconds: f64) -> Option<String> {
    let mut url = Url::parse("https://www.youtube.com/watch").ok()?;
    url.query_pairs_mut()
        .append_pair("v", video_id)
        .append_pair("t", &format!("{}s", whole_seconds(seconds)));
    Some(url.into())
}

/// Build the reference for a position within `source`.
pub fn source_reference(source: &SourceInfo, position: &SourcePosition) -> SourceReference {
    match position {
        SourcePosition::Timestamp { seconds } => {
            let link = match source.kind {
                SourceKind::Transcript => extract_video_id(&source.origin)
                    .or_else(|| extract_video_id(&source.source_id))
                    .and_then(|id| deep_link(&id, *seconds)),
                SourceKind::Document => None,
            };
            SourceReference {
                label: format_timestamp(*seconds),
                link,
            }
        }
        SourcePosition::Line { .. } => SourceReference {
            label: position.label(),
            link: None,
        },
    }
}

fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

/// Resolve the markers in `answer` against the passages it was prompted with.
///
/// Markers without a matching passage (including `[0]`) are dropped; the answer text
/// itself is never modified.
pub fn cite(answer: &str, passages: &[Passage], source: &SourceInfo) -> CitedAnswer {
    let citations = extract_markers(answer)
        .into_iter()
        .filter_map(|marker| passages.iter().find(|p| p.marker == marker))
        .map(|passage| Citation {
            marker: passage.marker,
            chunk_id: passage.chunk.id.clone(),
            source_position: passage.chunk.source_position.clone(),
            source_reference: source_reference(source, &passage.chunk.source_position),
            snippet: snippet(&passage.chunk.text),
        })
        .collect();

    CitedAnswer {
        answer_text: answer.to_string(),
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn video() -> SourceInfo {
        SourceInfo {
            source_id: "dQw4w9WgXcQ".to_string(),
            title: "Talk".to_string(),
            kind: SourceKind::Transcript,
            origin: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        }
    }

    fn passage(marker: usize, position: SourcePosition, text: &str) -> Passage {
        Passage {
            marker,
            chunk: Chunk {
                id: Chunk::make_id("dQw4w9WgXcQ", marker - 1),
                source_id: "dQw4w9WgXcQ".to_string(),
                text: text.to_string(),
                char_start: 0,
                char_end: text.chars().count(),
                source_position: position,
                chunk_index: marker - 1,
            },
        }
    }

    #[test]
    fn test_extract_markers() {
        assert_eq!(extract_markers("A [2]. B [1, 3]. C [2][ 4 ]."), vec![2, 1, 3, 4]);
        assert_eq!(extract_markers("no markers [x] [] [1-2]"), Vec::<usize>::new());
        assert_eq!(extract_markers("[0] and [99999999999999999999999]"), vec![0]);
    }

    #[test]
    fn test_deep_link() {
        assert_eq!(
            deep_link("dQw4w9WgXcQ", 75.9).unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=75s"
        );
        assert_eq!(
            deep_link("dQw4w9WgXcQ", -1.0).unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=0s"
        );
    }

    #[test]
    fn test_cite_maps_markers_one_to_one() {
        let passages = vec![
            passage(1, SourcePosition::timestamp(0.0), "Intro."),
            passage(2, SourcePosition::timestamp(75.0), "The key idea."),
            passage(3, SourcePosition::timestamp(3661.5), "Later on."),
        ];
        let answer = "The idea [2] comes back later [3, 2]. Not real: [0] [7].";

        let cited = cite(answer, &passages, &video());

        assert_eq!(cited.answer_text, answer);
        let markers: Vec<usize> = cited.citations.iter().map(|c| c.marker).collect();
        assert_eq!(markers, vec![2, 3]);
        assert_eq!(cited.citations[0].chunk_id, "dQw4w9WgXcQ_chunk_0001");
        assert_eq!(cited.citations[0].source_reference.label, "01:15");
        assert_eq!(
            cited.citations[1].source_reference.link.as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=3661s")
        );
        assert_eq!(cited.citations[1].source_reference.label, "01:01:01");
    }

    #[test]
    fn test_document_reference() {
        let docs = SourceInfo {
            source_id: "docs_notes".to_string(),
            title: "notes".to_string(),
            kind: SourceKind::Document,
            origin: "/home/me/notes".to_string(),
        };
        let reference = source_reference(&docs, &SourcePosition::line("guide.md", 12));
        assert_eq!(reference.label, "guide.md:12");
        assert!(reference.link.is_none());
    }

    #[test]
    fn test_snippet_truncates_long_text() {
        let long = "word ".repeat(100);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert!(s.chars().count() <= SNIPPET_CHARS + 3);
        assert_eq!(snippet("short"), "short");
    }
}
