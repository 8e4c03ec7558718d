//! Source File Ingestion
//!
//! Turns uploaded training files into plain text for the generation prompt.
//! Binary document formats sit behind the `TextExtractor` boundary; the
//! built-in `PlainTextExtractor` covers text, markdown and JSON.
//!
//! Extraction fans out with bounded concurrency. A file that fails to extract
//! contributes an empty text and a warning; it never fails the batch.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::ingest::MAX_FILE_SIZE;
use crate::types::{PathwayError, Result};

// =============================================================================
// Extractor Boundary
// =============================================================================

/// Converts raw file bytes of a given MIME type into text
pub trait TextExtractor: Send + Sync {
    /// Fails with `UnsupportedFormat` or `ExtractionFailed`
    fn extract(&self, name: &str, bytes: &[u8], mime: &str) -> Result<String>;

    fn supports(&self, mime: &str) -> bool;
}

/// UTF-8 text, markdown and JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, name: &str, bytes: &[u8], mime: &str) -> Result<String> {
        if !self.supports(mime) {
            return Err(PathwayError::UnsupportedFormat(mime.to_string()));
        }

        if bytes.len() > MAX_FILE_SIZE {
            return Err(PathwayError::ExtractionFailed {
                source_name: name.to_string(),
                reason: format!("file exceeds {} bytes", MAX_FILE_SIZE),
            });
        }

        if bytes.contains(&0) {
            return Err(PathwayError::ExtractionFailed {
                source_name: name.to_string(),
                reason: "binary content".to_string(),
            });
        }

        let text = String::from_utf8_lossy(bytes);
        Ok(text.trim_start_matches('\u{feff}').trim().to_string())
    }

    fn supports(&self, mime: &str) -> bool {
        mime.starts_with("text/") || matches!(mime, "application/json" | "application/x-ndjson")
    }
}

/// MIME type guessed from the file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "vtt" => "text/vtt",
        "srt" => "text/plain",
        "json" => "application/json",
        "jsonl" | "ndjson" => "application/x-ndjson",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Source Files
// =============================================================================

/// An uploaded file awaiting extraction
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    pub async fn read_all(paths: &[PathBuf]) -> Result<Vec<Self>> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(Self::read(path).await?);
        }
        Ok(files)
    }
}

/// Extracted text of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMaterial {
    pub name: String,
    pub text: String,
}

impl SourceMaterial {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Prompt block: file name header plus text cut to `max_chars`
    pub fn render(&self, max_chars: usize) -> String {
        let total = self.text.chars().count();
        if total <= max_chars {
            return format!("## {}\n\n{}", self.name, self.text);
        }

        let kept: String = self.text.chars().take(max_chars).collect();
        format!(
            "## {}\n\n{}\n[truncated: {} of {} characters shown]",
            self.name, kept, max_chars, total
        )
    }
}

// =============================================================================
// Fan-out
// =============================================================================

/// Extract every file with at most `max_concurrency` blocking tasks in flight.
///
/// Results come back in input order. Failures yield an empty text.
pub async fn extract_all(
    extractor: Arc<dyn TextExtractor>,
    files: Vec<SourceFile>,
    max_concurrency: usize,
) -> Vec<SourceMaterial> {
    let mut results: Vec<(usize, SourceMaterial)> = futures::stream::iter(files.into_iter().enumerate())
        .map(|(idx, file)| {
            let extractor = Arc::clone(&extractor);
            async move {
                let name = file.name.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    extractor.extract(&file.name, &file.bytes, &file.mime)
                })
                .await;

                let text = match joined {
                    Ok(Ok(text)) => {
                        debug!(file = %name, chars = text.len(), "Extracted source file");
                        text
                    }
                    Ok(Err(e)) => {
                        warn!(file = %name, error = %e, "Extraction failed, using empty text");
                        String::new()
                    }
                    Err(e) => {
                        warn!(file = %name, error = %e, "Extraction task panicked, using empty text");
                        String::new()
                    }
                };

                (idx, SourceMaterial::new(name, text))
            }
        })
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, material)| material).collect()
}

/// Read `paths` from disk and extract them with the plain-text extractor
pub async fn load_all(paths: &[PathBuf], max_concurrency: usize) -> Result<Vec<SourceMaterial>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let files = SourceFile::read_all(paths).await?;
    Ok(extract_all(Arc::new(PlainTextExtractor), files, max_concurrency).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("notes.MD")), "text/markdown");
        assert_eq!(mime_for_path(Path::new("data.json")), "application/json");
        assert!(mime_for_path(Path::new("deck.pptx")).contains("presentation"));
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_plain_text_extractor() {
        let extractor = PlainTextExtractor;
        let text = extractor
            .extract("a.txt", "\u{feff}  hello\n".as_bytes(), "text/plain")
            .unwrap();
        assert_eq!(text, "hello");

        assert!(matches!(
            extractor.extract("a.pdf", b"%PDF", "application/pdf"),
            Err(PathwayError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            extractor.extract("a.txt", b"ab\0cd", "text/plain"),
            Err(PathwayError::ExtractionFailed { .. })
        ));
    }

    #[test]
    fn test_render_truncates() {
        let material = SourceMaterial::new("sop.md", "abcdef");
        assert_eq!(material.render(10), "## sop.md\n\nabcdef");

        let rendered = material.render(3);
        assert!(rendered.contains("abc\n[truncated: 3 of 6 characters shown]"));
    }

    /// Sleeps longer for earlier files so completion order is reversed
    struct SlowExtractor;

    impl TextExtractor for SlowExtractor {
        fn extract(&self, name: &str, bytes: &[u8], _mime: &str) -> Result<String> {
            let delay = 40u64.saturating_sub(bytes.len() as u64 * 10);
            std::thread::sleep(Duration::from_millis(delay));
            if name == "bad.bin" {
                return Err(PathwayError::UnsupportedFormat("application/octet-stream".into()));
            }
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }

        fn supports(&self, _mime: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_extract_all_preserves_order_and_substitutes_failures() {
        let files = vec![
            SourceFile::new("one.txt", "text/plain", b"a".to_vec()),
            SourceFile::new("bad.bin", "application/octet-stream", b"bb".to_vec()),
            SourceFile::new("three.txt", "text/plain", b"ccc".to_vec()),
        ];

        let results = extract_all(Arc::new(SlowExtractor), files, 3).await;

        let names: Vec<&str> = results.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "bad.bin", "three.txt"]);
        assert_eq!(results[0].text, "a");
        assert_eq!(results[1].text, "");
        assert_eq!(results[2].text, "ccc");
    }

    #[tokio::test]
    async fn test_source_file_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.md");
        std::fs::write(&path, "# Guide").unwrap();

        let file = SourceFile::read(&path).await.unwrap();
        assert_eq!(file.name, "guide.md");
        assert_eq!(file.mime, "text/markdown");

        let materials = extract_all(Arc::new(PlainTextExtractor), vec![file], 2).await;
        assert_eq!(materials[0].text, "# Guide");
    }
}
