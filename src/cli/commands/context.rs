//! Context command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::source_reference;
use crate::source::{parse_timestamp, SourceKind, SourcePosition};
use anyhow::{anyhow, Result};

/// Parse a position argument for a source of the given kind.
///
/// Transcripts take `SS`, `MM:SS` or `HH:MM:SS`. Documents take `<document>:<line>`.
pub fn parse_position(input: &str, kind: SourceKind) -> Result<SourcePosition> {
    match kind {
        SourceKind::Transcript => Ok(SourcePosition::timestamp(parse_timestamp(input)?)),
        SourceKind::Document => {
            let (document, line) = input
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("Invalid position '{}'. Use <document>:<line>.", input))?;
            let line: u32 = line
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid line number in '{}'", input))?;
            if document.is_empty() {
                return Err(anyhow!("Missing document name in '{}'", input));
            }
            Ok(SourcePosition::line(document, line))
        }
    }
}

/// Run the context command.
pub async fn run_context(
    source: &str,
    position: &str,
    window: Option<f64>,
    settings: Settings,
) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let info = match orchestrator.source(source).await {
        Ok(indexed) => indexed.info(),
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let position = parse_position(position, info.kind)?;
    let chunks = orchestrator.context(source, &position, window).await?;

    if chunks.is_empty() {
        Output::info(&format!("Nothing indexed near {}.", position.label()));
        return Ok(());
    }

    Output::header(&format!("Context around {} in {}", position.label(), info.title));
    for chunk in &chunks {
        let reference = source_reference(&info, &chunk.source_position);
        Output::chunk(&reference.label, None, &chunk.text, reference.link.as_deref());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_position() {
        let pos = parse_position("01:15", SourceKind::Transcript).unwrap();
        assert_eq!(pos, SourcePosition::timestamp(75.0));
        assert!(parse_position("abc", SourceKind::Transcript).is_err());
        assert!(parse_position("inf", SourceKind::Transcript).is_err());
    }

    #[test]
    fn test_parse_document_position() {
        let pos = parse_position("guides/setup.md:42", SourceKind::Document).unwrap();
        assert_eq!(pos, SourcePosition::line("guides/setup.md", 42));
        assert!(parse_position("42", SourceKind::Document).is_err());
        assert!(parse_position(":42", SourceKind::Document).is_err());
        assert!(parse_position("notes.md:x", SourceKind::Document).is_err());
    }
}
