//! YouTube transcript source.
//!
//! Transcripts are fetched as json3 subtitle tracks through yt-dlp.

use super::{FetchedSource, SourceFetcher, SourceKind, SourceUnit};
use crate::error::{Result, SitatError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, instrument, warn};

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract a video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    // Try group 1 (URL format) then group 2 (bare ID)
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// YouTube transcript source.
pub struct YoutubeSource {
    language: String,
}

impl YoutubeSource {
    pub fn new() -> Self {
        Self {
            language: "en".to_string(),
        }
    }

    /// Set the preferred subtitle language.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Run yt-dlp to write the subtitle track into `dir`, returning the video title.
    async fn download_subtitles(&self, video_id: &str, dir: &Path) -> Result<String> {
        let url = watch_url(video_id);
        let template = dir.join(format!("{}.%(ext)s", video_id));

        let output = tokio::process::Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--no-simulate")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(&self.language)
            .arg("--sub-format").arg("json3")
            .arg("--print").arg("title")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--output").arg(template.to_string_lossy().as_ref())
            .arg(&url)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SitatError::ToolNotFound("yt-dlp".to_string())
                } else {
                    SitatError::SourceFetch(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SitatError::SourceFetch(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let title = stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or(video_id)
            .to_string();

        Ok(title)
    }

    /// Locate the json3 track yt-dlp wrote for a video.
    fn find_subtitle_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                name.starts_with(video_id) && name.ends_with(".json3")
            })
            .collect();
        candidates.sort();

        if candidates.len() > 1 {
            warn!("Multiple subtitle tracks found, using {:?}", candidates[0]);
        }

        candidates.into_iter().next().ok_or_else(|| {
            SitatError::SourceFetch(format!("No transcript available for video {}", video_id))
        })
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for YoutubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Transcript
    }

    fn can_handle(&self, input: &str) -> bool {
        extract_video_id(input).is_some()
    }

    fn source_id(&self, input: &str) -> Option<String> {
        extract_video_id(input)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, input: &str) -> Result<FetchedSource> {
        let video_id = extract_video_id(input).ok_or_else(|| {
            SitatError::SourceFetch(format!("Not a valid YouTube link or video ID: {}", input))
        })?;

        let dir = tempfile::tempdir()?;
        info!("Fetching transcript for {}", video_id);
        let title = self.download_subtitles(&video_id, dir.path()).await?;

        let path = Self::find_subtitle_file(dir.path(), &video_id)?;
        let raw = std::fs::read_to_string(&path)?;
        let units = parse_json3(&raw)?;
        debug!("Parsed {} transcript segments", units.len());

        Ok(FetchedSource {
            source_id: video_id.clone(),
            title,
            kind: SourceKind::Transcript,
            origin: watch_url(&video_id),
            units,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Json3Track {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 subtitle track into transcript units.
///
/// Events without any text (line breaks, styling-only events) are skipped.
pub fn parse_json3(raw: &str) -> Result<Vec<SourceUnit>> {
    let track: Json3Track = serde_json::from_str(raw)
        .map_err(|e| SitatError::SourceFetch(format!("Invalid json3 transcript: {}", e)))?;

    let units = track
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            Some(SourceUnit::transcript(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
            ))
        })
        .collect();

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourcePosition;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=jyLXcy5SGd8"),
            Some("jyLXcy5SGd8".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=jyLXcy5SGd8"),
            Some("jyLXcy5SGd8".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/jyLXcy5SGd8"),
            Some("jyLXcy5SGd8".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/embed/jyLXcy5SGd8"),
            Some("jyLXcy5SGd8".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/jyLXcy5SGd8"),
            Some("jyLXcy5SGd8".to_string())
        );
        assert_eq!(extract_video_id("jyLXcy5SGd8"), Some("jyLXcy5SGd8".to_string()));

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id("./notes/guide.md"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_parse_json3() {
        let raw = r#"{
            "events": [
                {"tStartMs": 0, "dDurationMs": 1000, "segs": [{"utf8": "hello"}]},
                {"tStartMs": 900, "dDurationMs": 10, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 1000, "dDurationMs": 1500, "segs": [{"utf8": "big "}, {"utf8": " world"}]},
                {"tStartMs": 2500, "dDurationMs": 500}
            ]
        }"#;

        let units = parse_json3(raw).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "hello");
        assert_eq!(units[1].text, "big world");
        assert_eq!(units[1].position, SourcePosition::timestamp(1.0));
        assert_eq!(units[1].duration_seconds, Some(1.5));
    }

    #[test]
    fn test_parse_json3_invalid() {
        let err = parse_json3("not json").unwrap_err();
        assert!(matches!(err, SitatError::SourceFetch(_)));
    }

    #[test]
    fn test_can_handle() {
        let source = YoutubeSource::new();
        assert!(source.can_handle("jyLXcy5SGd8"));
        assert!(source.can_handle("https://www.youtube.com/watch?v=jyLXcy5SGd8"));
        assert!(!source.can_handle("/path/to/notes"));
    }
}
