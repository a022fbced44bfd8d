use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use digest_domain::{OcrEngine, RasterImage};
use digest_error::DigestError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::DEFAULT_TOOL_TIMEOUT;

/// Page segmentation mode 6: a single uniform block of text.
const PAGE_SEG_MODE: &str = "6";

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    bin: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, png: &[u8]) -> Result<String, DigestError> {
        let mut child = Command::new(&self.bin)
            .args(["stdin", "stdout", "--psm", PAGE_SEG_MODE])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DigestError::ocr(format!("spawn {}: {e}", self.bin)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(png)
                .await
                .map_err(|e| DigestError::ocr(format!("write image to {}: {e}", self.bin)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DigestError::ocr(format!("wait {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DigestError::ocr(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &RasterImage) -> Result<String, DigestError> {
        if image.is_empty() {
            return Err(DigestError::ocr("empty image"));
        }
        let text = tokio::time::timeout(self.timeout, self.run(&image.png))
            .await
            .map_err(|_| {
                DigestError::ocr(format!("{} timed out after {:?}", self.bin, self.timeout))
            })??;
        debug!(chars = text.len(), "OCR complete");
        Ok(text)
    }
}
