//! On-image text extraction
//!
//! Extraction is delegated to an external OCR program that reads image bytes
//! on stdin and prints the recognized text. When the program is not installed
//! the harvester keeps running without extracted text.

use crate::sink::{SinkError, SinkResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Recognizes text in an image
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns false when extraction cannot run at all
    fn is_available(&self) -> bool;

    async fn extract(&self, image: &[u8]) -> SinkResult<String>;
}

/// Extractor used when OCR is disabled or its program is missing
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExtractor;

#[async_trait]
impl TextExtractor for DisabledExtractor {
    fn is_available(&self) -> bool {
        false
    }

    async fn extract(&self, _image: &[u8]) -> SinkResult<String> {
        Err(SinkError::OcrUnavailable)
    }
}

/// Runs an OCR program, piping the image through stdin
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExtractor {
    /// Locates `command` on the `PATH`; returns `None` when it is not installed
    pub fn detect(command: &str, args: &[String]) -> Option<Self> {
        match which::which(command) {
            Ok(program) => Some(Self {
                program,
                args: args.to_vec(),
            }),
            Err(e) => {
                warn!("OCR program '{}' not available: {}", command, e);
                None
            }
        }
    }
}

#[async_trait]
impl TextExtractor for CommandExtractor {
    fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, image: &[u8]) -> SinkResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(SinkError::Ocr(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Path of the text file holding an image's extracted text
pub fn text_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Extracts text for every image in a note directory that has none yet
///
/// Failures are logged per image. Returns the number of text files written.
pub async fn extract_note_dir(extractor: &dyn TextExtractor, dir: &Path) -> SinkResult<usize> {
    if !extractor.is_available() {
        return Ok(0);
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();

    let mut written = 0;
    for image in images {
        let target = text_path(&image);
        if target.exists() {
            continue;
        }

        let bytes = tokio::fs::read(&image).await?;
        match extractor.extract(&bytes).await {
            Ok(text) => {
                tokio::fs::write(&target, text).await?;
                debug!("Extracted text for {}", image.display());
                written += 1;
            }
            Err(e) => warn!("Text extraction failed for {}: {}", image.display(), e),
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UpperExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextExtractor for UpperExtractor {
        fn is_available(&self) -> bool {
            true
        }

        async fn extract(&self, image: &[u8]) -> SinkResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(image).to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_extracts_only_missing_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image_0.jpg"), b"first").unwrap();
        std::fs::write(dir.path().join("image_1.jpg"), b"second").unwrap();
        std::fs::write(dir.path().join("image_1.txt"), "kept").unwrap();
        std::fs::write(dir.path().join("detail.txt"), "not an image").unwrap();

        let extractor = UpperExtractor {
            calls: AtomicUsize::new(0),
        };
        let written = extract_note_dir(&extractor, dir.path()).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("image_0.txt")).unwrap(),
            "FIRST"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("image_1.txt")).unwrap(),
            "kept"
        );
    }

    #[tokio::test]
    async fn test_disabled_extractor_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image_0.jpg"), b"first").unwrap();

        let written = extract_note_dir(&DisabledExtractor, dir.path()).await.unwrap();

        assert_eq!(written, 0);
        assert!(!dir.path().join("image_0.txt").exists());
    }

    #[test]
    fn test_detect_missing_program() {
        assert!(CommandExtractor::detect("definitely-not-an-ocr-binary-4821", &[]).is_none());
    }
}
