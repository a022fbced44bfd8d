//! Raw RFC822 bytes to [`DecodedMessage`].
//!
//! Decoding never fails. Header problems resolve to sentinel strings, body
//! problems to empty strings, and undecodable byte sequences are dropped.

use std::sync::LazyLock;

use digest_domain::{
    DecodedMessage, RawMessage, NO_SUBJECT, UNKNOWN_SENDER, UNREADABLE_SUBJECT,
};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use regex::Regex;
use tracing::{debug, warn};

use crate::html::html_to_text;

/// An RFC 2047 encoded word that survived header decoding.
static ENCODED_WORD_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"=\?[^?\s]+\?[bBqQ]\?[^?\s]*\?=").ok());

pub fn decode(raw: &RawMessage) -> DecodedMessage {
    let parsed = match mailparse::parse_mail(&raw.bytes) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(id = raw.id, %e, "unparseable message, keeping raw text");
            return DecodedMessage {
                subject: UNREADABLE_SUBJECT.to_string(),
                sender: UNKNOWN_SENDER.to_string(),
                plain_body: drop_replacement_chars(&String::from_utf8_lossy(&raw.bytes)),
                html_body: String::new(),
            };
        }
    };

    let subject = decode_subject(&parsed);
    let sender = decode_sender(&parsed);

    let (plain_body, html_body) = if parsed.ctype.mimetype.starts_with("multipart/") {
        let mut bodies = Bodies::default();
        walk_parts(&parsed, &mut bodies);
        (
            bodies.plain.unwrap_or_default(),
            bodies.html.unwrap_or_default(),
        )
    } else {
        single_part_bodies(&parsed)
    };

    debug!(
        id = raw.id,
        plain_len = plain_body.len(),
        html_len = html_body.len(),
        "decoded message"
    );

    DecodedMessage {
        subject,
        sender,
        plain_body,
        html_body,
    }
}

fn decode_subject(parsed: &ParsedMail<'_>) -> String {
    let headers = parsed.get_headers();
    let Some(header) = headers.get_first_header("Subject") else {
        return NO_SUBJECT.to_string();
    };
    let value = header.get_value();
    if is_undecoded(&value) {
        debug!(raw = %value, "subject could not be decoded");
        return UNREADABLE_SUBJECT.to_string();
    }
    let value = value.trim();
    if value.is_empty() {
        NO_SUBJECT.to_string()
    } else {
        value.to_string()
    }
}

fn decode_sender(parsed: &ParsedMail<'_>) -> String {
    parsed
        .get_headers()
        .get_first_value("From")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string())
}

/// A subject that genuinely contains encoded-word syntax as literal text is
/// also reported as unreadable.
fn is_undecoded(value: &str) -> bool {
    value.contains('\u{FFFD}')
        || ENCODED_WORD_RE
            .as_ref()
            .map(|re| re.is_match(value))
            .unwrap_or(false)
}

#[derive(Default)]
struct Bodies {
    plain: Option<String>,
    html: Option<String>,
}

/// First `text/plain` and first `text/html` win; attachment subtrees are
/// skipped whatever their content type.
fn walk_parts(part: &ParsedMail<'_>, bodies: &mut Bodies) {
    if is_attachment(part) {
        return;
    }
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            walk_parts(sub, bodies);
        }
        return;
    }

    let slot = match part.ctype.mimetype.to_ascii_lowercase().as_str() {
        "text/plain" => &mut bodies.plain,
        "text/html" => &mut bodies.html,
        _ => return,
    };
    if slot.is_none() {
        *slot = decode_part(part);
    }
}

fn single_part_bodies(parsed: &ParsedMail<'_>) -> (String, String) {
    let content = decode_part(parsed).unwrap_or_default();
    if parsed.ctype.mimetype.to_ascii_lowercase().contains("html") {
        (html_to_text(&content), content)
    } else {
        (content, String::new())
    }
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
}

/// Transfer-decodes the payload and converts it with the declared charset,
/// UTF-8 when none is declared.
fn decode_part(part: &ParsedMail<'_>) -> Option<String> {
    let text = if part.ctype.params.contains_key("charset") {
        part.get_body()
            .map_err(|e| debug!(%e, mimetype = %part.ctype.mimetype, "part body undecodable"))
            .ok()?
    } else {
        let raw = part
            .get_body_raw()
            .map_err(|e| debug!(%e, mimetype = %part.ctype.mimetype, "part body undecodable"))
            .ok()?;
        String::from_utf8_lossy(&raw).into_owned()
    };
    Some(drop_replacement_chars(&text))
}

fn drop_replacement_chars(text: &str) -> String {
    text.chars().filter(|c| *c != '\u{FFFD}').collect()
}
