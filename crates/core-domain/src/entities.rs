use serde::Serialize;
use std::fmt;

pub const NO_SUBJECT: &str = "(No Subject)";
pub const UNREADABLE_SUBJECT: &str = "(Unreadable Subject)";
pub const UNKNOWN_SENDER: &str = "(Unknown Sender)";
pub const NO_CONTENT: &str = "(No meaningful content found)";

/// Mailbox login. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub address: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    /// Lowercased part after the last `@`.
    pub fn domain(&self) -> String {
        self.address
            .rsplit('@')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A message exactly as the server returned it.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: u32,
    pub bytes: Vec<u8>,
}

impl RawMessage {
    pub fn new(id: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            bytes: bytes.into(),
        }
    }
}

/// Structured fields recovered from a [`RawMessage`]. Both bodies are always
/// present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    pub subject: String,
    pub sender: String,
    pub plain_body: String,
    pub html_body: String,
}

impl DecodedMessage {
    pub fn has_html(&self) -> bool {
        !self.html_body.trim().is_empty()
    }
}

/// Text chosen for summarization, or the terminal "nothing usable" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Text(String),
    Exhausted,
}

impl ExtractionResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(t) => t,
            Self::Exhausted => NO_CONTENT,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSummary {
    pub subject: String,
    #[serde(rename = "from")]
    pub sender: String,
    pub summary: String,
    pub priority: Priority,
}

/// Encoded raster image (PNG) handed from the renderer to OCR.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub png: Vec<u8>,
}

impl RasterImage {
    pub fn new(png: impl Into<Vec<u8>>) -> Self {
        Self { png: png.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterImage({} bytes)", self.png.len())
    }
}
