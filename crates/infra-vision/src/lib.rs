mod chrome;
mod tesseract;

pub use chrome::ChromeRenderer;
pub use tesseract::TesseractOcr;

use std::time::Duration;

/// Upper bound on any single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);
