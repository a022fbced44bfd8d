use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use digest_domain::{HtmlRenderer, RasterImage};
use digest_error::DigestError;
use tokio::process::Command;
use tracing::debug;

use crate::DEFAULT_TOOL_TIMEOUT;

const WINDOW_SIZE: &str = "800,2000";

/// Renders HTML to PNG with a headless Chrome/Chromium binary.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    bin: String,
    timeout: Duration,
}

impl ChromeRenderer {
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
}

fn screenshot_args(page: &Path, screenshot: &Path) -> Vec<String> {
    vec![
        "--headless".into(),
        "--disable-gpu".into(),
        "--no-sandbox".into(),
        "--hide-scrollbars".into(),
        format!("--window-size={WINDOW_SIZE}"),
        format!("--screenshot={}", screenshot.display()),
        format!("file://{}", page.display()),
    ]
}

#[async_trait]
impl HtmlRenderer for ChromeRenderer {
    async fn render(&self, html: &str) -> Result<RasterImage, DigestError> {
        let dir = tempfile::tempdir().map_err(|e| DigestError::render(format!("tempdir: {e}")))?;
        let page = dir.path().join("message.html");
        let screenshot = dir.path().join("message.png");

        tokio::fs::write(&page, html)
            .await
            .map_err(|e| DigestError::render(format!("write {}: {e}", page.display())))?;

        let run = Command::new(&self.bin)
            .args(screenshot_args(&page, &screenshot))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                DigestError::render(format!("{} timed out after {:?}", self.bin, self.timeout))
            })?
            .map_err(|e| DigestError::render(format!("spawn {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DigestError::render(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                stderr.trim()
            )));
        }

        let png = tokio::fs::read(&screenshot)
            .await
            .map_err(|e| DigestError::render(format!("read screenshot: {e}")))?;
        if png.is_empty() {
            return Err(DigestError::render("screenshot is empty"));
        }
        debug!(bytes = png.len(), "rendered HTML");
        Ok(RasterImage::new(png))
    }
}
