//! Markdown/text document source.
//!
//! Reads a single file or every supported file under a folder. Each paragraph (a run of
//! non-blank lines) becomes one unit positioned at its first line.

use super::{slugify, FetchedSource, SourceFetcher, SourceKind, SourceUnit};
use crate::error::{Result, SitatError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Supported document file extensions.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Local document source.
pub struct DocumentSource;

impl DocumentSource {
    pub fn new() -> Self {
        Self
    }

    /// Check if path is a supported document file.
    fn is_document_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Collect supported files under `root`, sorted by path.
    fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                SitatError::SourceFetch(format!("Failed to read {}: {}", root.display(), e))
            })?;
            if entry.file_type().is_file() && Self::is_document_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Label used in citations: path relative to the root, with `/` separators.
    fn document_label(root: &Path, path: &Path) -> String {
        let relative = if root.is_file() {
            path.file_name().map(PathBuf::from).unwrap_or_else(|| path.to_path_buf())
        } else {
            path.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
        };

        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Default collection id for a file or folder.
    pub fn default_source_id(path: &Path) -> String {
        let name = if path.is_file() {
            path.file_stem()
        } else {
            path.file_name()
        };

        let slug = name
            .map(|n| slugify(&n.to_string_lossy()))
            .unwrap_or_default();

        if slug.is_empty() {
            "docs".to_string()
        } else {
            format!("docs_{}", slug)
        }
    }
}

impl Default for DocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into paragraph units, each tagged with its first (1-based) line.
pub fn split_paragraphs(text: &str, document: &str) -> Vec<SourceUnit> {
    let mut units = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start_line = 0u32;

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                units.push(SourceUnit::paragraph(current.join("\n"), document, start_line));
                current.clear();
            }
            continue;
        }

        if current.is_empty() {
            start_line = index as u32 + 1;
        }
        current.push(line.trim_end());
    }

    if !current.is_empty() {
        units.push(SourceUnit::paragraph(current.join("\n"), document, start_line));
    }

    units
}

#[async_trait]
impl SourceFetcher for DocumentSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Document
    }

    fn can_handle(&self, input: &str) -> bool {
        let path = Path::new(input);
        path.is_dir() || Self::is_document_file(path)
    }

    fn source_id(&self, input: &str) -> Option<String> {
        let path = Path::new(input);
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Some(Self::default_source_id(&canonical))
    }

    #[instrument(skip(self))]
    async fn fetch(&self, input: &str) -> Result<FetchedSource> {
        let root = Path::new(input);
        if !root.exists() {
            return Err(SitatError::SourceFetch(format!("Path not found: {}", input)));
        }

        let root = root.canonicalize()?;
        let files = Self::collect_files(&root)?;
        if files.is_empty() {
            return Err(SitatError::SourceFetch(format!(
                "No .md or .txt files found in {}",
                input
            )));
        }

        info!("Loading {} documents from {:?}", files.len(), root);

        let mut units = Vec::new();
        for file in &files {
            let bytes = std::fs::read(file)?;
            let text = String::from_utf8_lossy(&bytes);
            let label = Self::document_label(&root, file);
            let paragraphs = split_paragraphs(&text, &label);
            debug!("{}: {} paragraphs", label, paragraphs.len());
            units.extend(paragraphs);
        }

        let title = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string());

        Ok(FetchedSource {
            source_id: Self::default_source_id(&root),
            title,
            kind: SourceKind::Document,
            origin: root.to_string_lossy().into_owned(),
            units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourcePosition;

    #[test]
    fn test_is_document_file() {
        assert!(DocumentSource::is_document_file(Path::new("notes.md")));
        assert!(DocumentSource::is_document_file(Path::new("NOTES.TXT")));
        assert!(DocumentSource::is_document_file(Path::new("a/b/c.markdown")));
        assert!(!DocumentSource::is_document_file(Path::new("paper.pdf")));
        assert!(!DocumentSource::is_document_file(Path::new("README")));
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "# Title\n\nFirst line\nsecond line\n\n\n  \nLast paragraph\n";
        let units = split_paragraphs(text, "guide.md");

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].text, "# Title");
        assert_eq!(units[0].position, SourcePosition::line("guide.md", 1));
        assert_eq!(units[1].text, "First line\nsecond line");
        assert_eq!(units[1].position, SourcePosition::line("guide.md", 3));
        assert_eq!(units[2].position, SourcePosition::line("guide.md", 8));
    }

    #[test]
    fn test_split_paragraphs_empty() {
        assert!(split_paragraphs("", "x.md").is_empty());
        assert!(split_paragraphs("\n  \n\n", "x.md").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Field Notes");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("b.md"), "Beta paragraph.").unwrap();
        std::fs::write(root.join("a.txt"), "Alpha one.\n\nAlpha two.").unwrap();
        std::fs::write(root.join("sub").join("c.MD"), "Gamma.").unwrap();
        std::fs::write(root.join("ignored.pdf"), "nope").unwrap();

        let source = DocumentSource::new();
        let fetched = source.fetch(root.to_str().unwrap()).await.unwrap();

        assert_eq!(fetched.source_id, "docs_field_notes");
        assert_eq!(fetched.kind, SourceKind::Document);
        let docs: Vec<_> = fetched
            .units
            .iter()
            .map(|u| u.position.document().unwrap().to_string())
            .collect();
        assert_eq!(docs, vec!["a.txt", "a.txt", "b.md", "sub/c.MD"]);
        assert_eq!(fetched.units[1].position, SourcePosition::line("a.txt", 3));
    }

    #[tokio::test]
    async fn test_fetch_missing_path() {
        let source = DocumentSource::new();
        let err = source.fetch("/definitely/not/here").await.unwrap_err();
        assert!(matches!(err, SitatError::SourceFetch(_)));
    }

    #[test]
    fn test_default_source_id_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Release Notes.md");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(DocumentSource::default_source_id(&file), "docs_release_notes");
    }
}
