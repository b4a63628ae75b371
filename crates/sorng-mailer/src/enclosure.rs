//! Message body parts.
//!
//! Each enclosure renders itself into a [`MimePart`]; extra headers set on an
//! enclosure are applied last and win over the defaults.

use std::path::{Path, PathBuf};

use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::helpers::{encode_header_value, guess, UnicodeDict};
use crate::mime::{MimePart, TransferEncoding};
use crate::types::*;

const DEFAULT_CHARSET: &str = "utf-8";
const FALLBACK_MIMETYPE: &str = "application/octet-stream";

/// RFC 2231 `attr-char`s left as-is in an extended parameter value.
const PARAM_VALUE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Something that can be attached to an [`Envelope`](crate::envelope::Envelope).
pub trait Enclosure {
    fn mime(&self) -> MailerResult<MimePart>;
}

fn finish(mut part: MimePart, extra: &UnicodeDict) -> MimePart {
    for (name, value) in extra.iter() {
        part.headers.insert_str(name, value);
    }
    part
}

macro_rules! with_header {
    ($ty:ty) => {
        impl $ty {
            /// Add an extra header to this part; byte values are UTF-8 decoded.
            pub fn with_header(
                mut self,
                name: impl Into<String>,
                value: impl AsRef<[u8]>,
            ) -> MailerResult<Self> {
                self.headers.insert(name, value)?;
                Ok(self)
            }
        }
    };
}

// ─── Text ───────────────────────────────────────────────────────────

/// Encode `content` in `charset`, returning the canonical charset label.
///
/// Supported: UTF-8, US-ASCII and ISO-8859-1 (with their common aliases).
fn encode_text(content: &str, charset: &str) -> MailerResult<(&'static str, Vec<u8>)> {
    let label = charset.trim().to_ascii_lowercase().replace('_', "-");
    match label.as_str() {
        "utf-8" | "utf8" => Ok(("utf-8", content.as_bytes().to_vec())),
        "us-ascii" | "ascii" => {
            if !content.is_ascii() {
                return Err(MailerError::encoding("content is not representable in us-ascii"));
            }
            Ok(("us-ascii", content.as_bytes().to_vec()))
        }
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => content
            .chars()
            .map(|c| u8::try_from(u32::from(c)).ok())
            .collect::<Option<Vec<u8>>>()
            .map(|bytes| ("iso-8859-1", bytes))
            .ok_or_else(|| MailerError::encoding("content is not representable in iso-8859-1")),
        _ => Err(MailerError::encoding(format!("unsupported charset {:?}", charset))),
    }
}

fn text_part(subtype: &str, content: &str, charset: &str) -> MailerResult<MimePart> {
    let (charset, data) = encode_text(content, charset)?;
    Ok(MimePart::new(
        &format!("text/{}; charset=\"{}\"", subtype, charset),
        TransferEncoding::QuotedPrintable,
        &data,
    ))
}

/// A `text/plain` part.
#[derive(Debug, Clone)]
pub struct PlainText {
    pub content: String,
    pub charset: String,
    pub headers: UnicodeDict,
}

impl PlainText {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            charset: DEFAULT_CHARSET.into(),
            headers: UnicodeDict::new(),
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }
}

impl Enclosure for PlainText {
    fn mime(&self) -> MailerResult<MimePart> {
        let part = text_part("plain", &self.content, &self.charset)?;
        Ok(finish(part, &self.headers))
    }
}

/// A `text/html` part.
#[derive(Debug, Clone)]
pub struct Html {
    pub content: String,
    pub charset: String,
    pub headers: UnicodeDict,
}

impl Html {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            charset: DEFAULT_CHARSET.into(),
            headers: UnicodeDict::new(),
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }
}

impl Enclosure for Html {
    fn mime(&self) -> MailerResult<MimePart> {
        let part = text_part("html", &self.content, &self.charset)?;
        Ok(finish(part, &self.headers))
    }
}

// ─── Binary ─────────────────────────────────────────────────────────

/// Arbitrary bytes with an explicit mimetype, base64 encoded.
#[derive(Debug, Clone)]
pub struct Binary {
    pub data: Vec<u8>,
    pub mimetype: String,
    pub headers: UnicodeDict,
}

impl Binary {
    pub fn new(data: impl Into<Vec<u8>>, mimetype: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mimetype: mimetype.into(),
            headers: UnicodeDict::new(),
        }
    }
}

impl Enclosure for Binary {
    fn mime(&self) -> MailerResult<MimePart> {
        let part = MimePart::new(&self.mimetype, TransferEncoding::Base64, &self.data);
        Ok(finish(part, &self.headers))
    }
}

// ─── Attachment ─────────────────────────────────────────────────────

/// A file read from disk when the message is rendered.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub path: PathBuf,
    pub headers: UnicodeDict,
}

impl Attachment {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            headers: UnicodeDict::new(),
        }
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Enclosure for Attachment {
    fn mime(&self) -> MailerResult<MimePart> {
        let data = std::fs::read(&self.path).map_err(|e| {
            MailerError::io(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let filename = self.filename();
        let (mimetype, _) = guess(&filename, Some(FALLBACK_MIMETYPE));
        let mimetype = mimetype.unwrap_or_else(|| FALLBACK_MIMETYPE.to_string());
        debug!("Attaching {} ({}, {} bytes)", filename, mimetype, data.len());

        let mut part = MimePart::new(
            &format!("{}; name=\"{}\"", mimetype, quoted_param(&filename)),
            TransferEncoding::Base64,
            &data,
        );
        part.headers.insert_str(
            "Content-Disposition",
            format!("attachment; {}", filename_param(&filename)),
        );
        Ok(finish(part, &self.headers))
    }
}

/// Quoted-string body of a parameter; non-ASCII text becomes encoded words.
fn quoted_param(value: &str) -> String {
    if value.is_ascii() {
        value.replace('\\', "\\\\").replace('"', "\\\"")
    } else {
        encode_header_value(value)
    }
}

/// `filename="..."`, or the RFC 2231 `filename*=utf-8''...` form for
/// non-ASCII names.
fn filename_param(filename: &str) -> String {
    if filename.is_ascii() {
        format!("filename=\"{}\"", quoted_param(filename))
    } else {
        format!(
            "filename*=utf-8''{}",
            utf8_percent_encode(filename, PARAM_VALUE_SET)
        )
    }
}

with_header!(PlainText);
with_header!(Html);
with_header!(Binary);
with_header!(Attachment);

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use base64::Engine;

    use super::*;

    #[test]
    fn plain_text_part() {
        let part = PlainText::new("Hello, world!").mime().unwrap();
        assert_eq!(part.content_type(), Some("text/plain; charset=\"utf-8\""));
        assert_eq!(
            part.headers.get("Content-Transfer-Encoding"),
            Some("quoted-printable")
        );
        assert_eq!(part.body, "Hello, world!");
    }

    #[test]
    fn html_part() {
        let part = Html::new("<h1>Hello</h1>").mime().unwrap();
        assert_eq!(part.content_type(), Some("text/html; charset=\"utf-8\""));
        assert!(part.body.contains("<h1>Hello</h1>"));
    }

    #[test]
    fn text_charset_is_configurable() {
        let part = PlainText::new("café").with_charset("latin1").mime().unwrap();
        assert_eq!(part.content_type(), Some("text/plain; charset=\"iso-8859-1\""));
        assert_eq!(part.body, "caf=E9");

        let part = Html::new("<p>hi</p>").with_charset("US-ASCII").mime().unwrap();
        assert_eq!(part.content_type(), Some("text/html; charset=\"us-ascii\""));

        let part = Html::new("<p>é</p>").with_charset("utf8").mime().unwrap();
        assert_eq!(part.content_type(), Some("text/html; charset=\"utf-8\""));
        assert!(part.body.contains("=C3=A9"));
    }

    #[test]
    fn text_charset_rejects_unrepresentable_content() {
        let err = PlainText::new("Привет").with_charset("us-ascii").mime().unwrap_err();
        assert_eq!(err.kind, MailerErrorKind::Encoding);
        let err = Html::new("€").with_charset("iso-8859-1").mime().unwrap_err();
        assert_eq!(err.kind, MailerErrorKind::Encoding);
        let err = PlainText::new("x").with_charset("klingon").mime().unwrap_err();
        assert_eq!(err.kind, MailerErrorKind::Encoding);
    }

    #[test]
    fn extra_headers_override_defaults() {
        let part = Html::new("<p/>")
            .with_header("Content-ID", "<logo>")
            .unwrap()
            .with_header("Content-Type", b"text/html; charset=\"us-ascii\"".as_slice())
            .unwrap()
            .mime()
            .unwrap();
        assert_eq!(part.headers.get("Content-ID"), Some("<logo>"));
        assert_eq!(part.content_type(), Some("text/html; charset=\"us-ascii\""));
    }

    #[test]
    fn binary_part_is_base64() {
        let part = Binary::new(b"\x89PNG".to_vec(), "image/png").mime().unwrap();
        assert_eq!(part.content_type(), Some("image/png"));
        assert_eq!(part.headers.get("Content-Transfer-Encoding"), Some("base64"));
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(part.body.as_bytes())
            .unwrap();
        assert_eq!(decoded, b"\x89PNG");
    }

    #[test]
    fn attachment_from_file() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"PDF").unwrap();

        let att = Attachment::from_path(file.path());
        let part = att.mime().unwrap();
        let filename = att.filename();
        assert!(filename.ends_with(".pdf"));
        assert_eq!(
            part.content_type(),
            Some(format!("application/pdf; name=\"{}\"", filename).as_str())
        );
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some(format!("attachment; filename=\"{}\"", filename).as_str())
        );
        assert_eq!(part.body, "UERG");
    }

    #[test]
    fn attachment_non_ascii_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("résumé.pdf");
        std::fs::write(&path, b"PDF").unwrap();

        let part = Attachment::from_path(&path).mime().unwrap();
        assert_eq!(
            part.content_type(),
            Some("application/pdf; name=\"=?UTF-8?B?csOpc3Vtw6kucGRm?=\"")
        );
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some("attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf")
        );
    }

    #[test]
    fn attachment_unknown_extension_falls_back() {
        let mut file = tempfile::Builder::new().suffix(".zzq").tempfile().unwrap();
        file.write_all(b"?").unwrap();
        let part = Attachment::from_path(file.path()).mime().unwrap();
        assert!(part
            .content_type()
            .unwrap()
            .starts_with("application/octet-stream; name="));
    }

    #[test]
    fn attachment_missing_file() {
        let err = Attachment::from_path("/nonexistent/report.pdf")
            .mime()
            .unwrap_err();
        assert_eq!(err.kind, MailerErrorKind::IoError);
        assert!(err.message.contains("report.pdf"));
    }
}
