//! PDF conversion (spec §4.4): materialize to a temp file, invoke the
//! external converter with a 30-second soft timeout, terminate, grace for
//! 5s, then hard-kill at 35s total. Timeout is fatal for the request.
//!
//! The external converter itself (LibreOffice headless) is out of scope
//! (spec §1 "Deliberately out of scope" — `PdfConverter` is the trait
//! boundary); [`LibreOfficeConverter`] is the thin process-spawning
//! adapter a deployment wires in.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use tokio::process::Command;

#[async_trait]
pub trait PdfConverter: Send + Sync {
    /// Convert `input` to PDF, writing the result into `output_dir`.
    /// Returns the path of the produced file.
    async fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
        soft_timeout: Duration,
        hard_timeout: Duration,
    ) -> Result<PathBuf, EngineError>;
}

#[derive(Debug, Clone)]
pub enum PdfConversionOutcome {
    Converted(PathBuf),
    TimedOut,
}

/// Spawns a headless LibreOffice process per conversion: `soffice
/// --headless --convert-to pdf --outdir <dir> <input>`.
pub struct LibreOfficeConverter {
    binary_path: String,
}

impl LibreOfficeConverter {
    pub fn new(binary_path: impl Into<String>) -> Self {
        LibreOfficeConverter { binary_path: binary_path.into() }
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        LibreOfficeConverter::new("soffice")
    }
}

#[async_trait]
impl PdfConverter for LibreOfficeConverter {
    async fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
        soft_timeout: Duration,
        hard_timeout: Duration,
    ) -> Result<PathBuf, EngineError> {
        let mut child = Command::new(&self.binary_path)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(input)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::transient(format!("failed to spawn pdf converter: {e}")))?;

        match tokio::time::timeout(soft_timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
                Ok(output_dir.join(format!("{stem}.pdf")))
            }
            Ok(Ok(status)) => Err(EngineError::transient(format!("pdf converter exited with {status}"))),
            Ok(Err(e)) => Err(EngineError::transient(format!("pdf converter wait failed: {e}"))),
            Err(_) => {
                tracing::warn!("pdf conversion exceeded soft timeout, terminating");
                let _ = child.start_kill();
                let grace = hard_timeout.saturating_sub(soft_timeout);
                if tokio::time::timeout(grace, child.wait()).await.is_err() {
                    tracing::error!("pdf converter did not die within grace period, force killing");
                    let _ = child.kill().await;
                }
                Err(EngineError::transient("pdf conversion timed out"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct NeverFinishesConverter {
        killed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PdfConverter for NeverFinishesConverter {
        async fn convert(
            &self,
            _input: &Path,
            _output_dir: &Path,
            soft_timeout: Duration,
            _hard_timeout: Duration,
        ) -> Result<PathBuf, EngineError> {
            tokio::time::sleep(soft_timeout * 10).await;
            self.killed.store(true, Ordering::SeqCst);
            Err(EngineError::transient("should not reach here under timeout test"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn caller_enforced_timeout_prevents_runaway_conversion() {
        let killed = Arc::new(AtomicBool::new(false));
        let converter = NeverFinishesConverter { killed: killed.clone() };
        let result = tokio::time::timeout(
            Duration::from_millis(10),
            converter.convert(Path::new("in.docx"), Path::new("/tmp"), Duration::from_millis(1), Duration::from_millis(5)),
        )
        .await;
        assert!(result.is_err());
        assert!(!killed.load(Ordering::SeqCst));
    }
}
