//! Minimal MIME object.
//!
//! Holds the top-level headers written by [`Headers::prepare`] plus the body
//! parts produced by enclosures, and renders them as an RFC 5322 /
//! `multipart/mixed` message string suitable for the SMTP DATA command.
//!
//! [`Headers::prepare`]: crate::headers::Headers::prepare

use std::fmt;

use base64::Engine;

use crate::headers::HeaderTarget;
use crate::helpers::{encode_header_value, UnicodeDict};

/// Headers whose values are address lists, already encoded by the builders.
const ADDRESS_HEADERS: &[&str] = &[
    "From",
    "Sender",
    "To",
    "Cc",
    "Reply-To",
    "Resent-From",
    "Resent-Sender",
    "Resent-To",
    "Resent-Cc",
];

/// Content-Transfer-Encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    QuotedPrintable,
    Base64,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

// ─── MimePart ───────────────────────────────────────────────────────

/// One body part: its own headers and an already transfer-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    pub headers: UnicodeDict,
    pub body: String,
}

impl MimePart {
    pub fn new(content_type: &str, encoding: TransferEncoding, data: &[u8]) -> Self {
        let mut headers = UnicodeDict::new();
        headers.insert_str("Content-Type", content_type);
        headers.insert_str("Content-Transfer-Encoding", encoding.to_string());
        Self {
            headers,
            body: encode_body(data, encoding),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    /// Part headers are structured and already encoded by their enclosure.
    fn render(&self, out: &mut String) {
        for (name, value) in self.headers.iter() {
            write_header(out, name, value);
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        if !self.body.ends_with("\r\n") {
            out.push_str("\r\n");
        }
    }
}

// ─── MimeMessage ────────────────────────────────────────────────────

/// A `multipart/mixed` message under construction.
#[derive(Debug, Clone)]
pub struct MimeMessage {
    headers: Vec<(String, String)>,
    parts: Vec<MimePart>,
    boundary: String,
}

impl MimeMessage {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            parts: Vec::new(),
            boundary: format!("----=_Part_{}", uuid::Uuid::new_v4().simple()),
        }
    }

    pub fn attach(&mut self, part: MimePart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render the full message with CRLF line endings.
    pub fn render(&self) -> String {
        let body_size: usize = self.parts.iter().map(|p| p.body.len() + 256).sum();
        let mut out = String::with_capacity(body_size + 1024);

        for (name, value) in &self.headers {
            if ADDRESS_HEADERS.contains(&name.as_str()) {
                write_header(&mut out, name, value);
            } else {
                write_header(&mut out, name, &encode_header_value(value));
            }
        }
        if self.header("MIME-Version").is_none() {
            write_header(&mut out, "MIME-Version", "1.0");
        }
        write_header(
            &mut out,
            "Content-Type",
            &format!("multipart/mixed; boundary=\"{}\"", self.boundary),
        );
        out.push_str("\r\n");
        out.push_str("This is a multi-part message in MIME format.\r\n");

        for part in &self.parts {
            out.push_str(&format!("\r\n--{}\r\n", self.boundary));
            part.render(&mut out);
        }
        out.push_str(&format!("\r\n--{}--\r\n", self.boundary));
        out
    }
}

impl Default for MimeMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderTarget for MimeMessage {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

impl fmt::Display for MimeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn write_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

/// Encode body data with the specified transfer encoding.
pub fn encode_body(data: &[u8], encoding: TransferEncoding) -> String {
    match encoding {
        TransferEncoding::QuotedPrintable => quoted_printable::encode_to_str(data),
        TransferEncoding::Base64 => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(data);
            // Wrap at 76 chars
            b64.as_bytes()
                .chunks(76)
                .map(|c| std::str::from_utf8(c).unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\r\n")
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
