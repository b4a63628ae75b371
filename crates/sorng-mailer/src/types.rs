//! Data types, error handling and configuration for the mailer crate.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Error ──────────────────────────────────────────────────────────

/// Kinds of mailer errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MailerErrorKind {
    /// A header lookup or removal named a header that is not present.
    HeaderNotFound,
    /// IDNA or UTF-8 encoding of a value failed.
    Encoding,
    /// I/O error (reading attachments, socket read/write).
    IoError,
    /// STARTTLS negotiation failed.
    TlsError,
    /// Authentication failed.
    AuthFailure,
    /// Server returned an error reply (4xx / 5xx).
    ServerReply,
    /// The envelope is not deliverable as built.
    MessageError,
    /// Configuration error.
    ConfigError,
}

impl fmt::Display for MailerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Top-level error type for the mailer crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailerError {
    pub kind: MailerErrorKind,
    pub message: String,
    /// The SMTP reply code (e.g. 550) if available.
    pub code: Option<u16>,
}

impl MailerError {
    pub fn new(kind: MailerErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn header_not_found(name: &str) -> Self {
        Self::new(MailerErrorKind::HeaderNotFound, name)
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::Encoding, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::IoError, msg)
    }

    pub fn tls(msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::TlsError, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::AuthFailure, msg)
    }

    pub fn server(code: u16, msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::ServerReply, msg).with_code(code)
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::MessageError, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(MailerErrorKind::ConfigError, msg)
    }
}

impl fmt::Display for MailerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[MAIL {}] {}: {}", code, self.kind, self.message)
        } else {
            write!(f, "[MAIL] {}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for MailerError {}

pub type MailerResult<T> = Result<T, MailerError>;

// ─── Configuration ──────────────────────────────────────────────────

/// Where and how a [`Postman`](crate::postman::Postman) delivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostmanConfig {
    /// Hostname or IP of the SMTP server.
    pub host: String,
    /// Port (25 / 465 / 587 / 2525).
    pub port: u16,
    /// Issue STARTTLS even when the server does not advertise it.
    pub force_tls: bool,
    /// Login credentials; no AUTH is attempted when absent.
    pub credentials: Option<Credentials>,
    /// Free-form options handed to the transport on connect.
    pub options: HashMap<String, String>,
    /// Right-hand side of generated Message-IDs.
    pub message_id_domain: String,
}

impl Default for PostmanConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            force_tls: false,
            credentials: None,
            options: HashMap::new(),
            message_id_domain: "localhost".into(),
        }
    }
}

impl PostmanConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> MailerResult<()> {
        if self.host.trim().is_empty() {
            return Err(MailerError::config("host is empty"));
        }
        if self.port == 0 {
            return Err(MailerError::config("port must be non-zero"));
        }
        Ok(())
    }
}

/// Credentials for SMTP authentication.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// ─── Address ────────────────────────────────────────────────────────

/// One address specification handed to a compound header builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Address {
    /// Bare `user@domain` or already formatted `Name <user@domain>`.
    Formatted(String),
    /// Display name plus address, rendered as `Name <address>`.
    Named { name: String, address: String },
}

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self::Formatted(value.into())
    }

    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Decode a UTF-8 byte string into a formatted address.
    pub fn from_bytes(raw: &[u8]) -> MailerResult<Self> {
        std::str::from_utf8(raw)
            .map(Self::new)
            .map_err(|e| MailerError::encoding(format!("address is not UTF-8: {}", e)))
    }

    /// Split into display name and address.
    ///
    /// Formatted input is parsed as `Name <address>`, `"Name" <address>` or a
    /// bare address; surrounding quotes around the name are dropped.
    pub fn parts(&self) -> (Option<&str>, &str) {
        match self {
            Self::Named { name, address } => {
                let name = name.trim();
                ((!name.is_empty()).then_some(name), address.trim())
            }
            Self::Formatted(raw) => {
                let raw = raw.trim();
                if let (Some(lt), Some(gt)) = (raw.rfind('<'), raw.rfind('>')) {
                    if lt < gt {
                        let name = raw[..lt].trim().trim_matches('"').trim();
                        let address = raw[lt + 1..gt].trim();
                        return ((!name.is_empty()).then_some(name), address);
                    }
                }
                (None, raw)
            }
        }
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::Formatted(value)
    }
}

impl From<(&str, &str)> for Address {
    fn from((name, address): (&str, &str)) -> Self {
        Self::with_name(name, address)
    }
}

impl From<(String, String)> for Address {
    fn from((name, address): (String, String)) -> Self {
        Self::Named { name, address }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Formatted(raw) => write!(f, "{}", raw),
            Self::Named { name, address } => write!(f, "{} <{}>", name, address),
        }
    }
}

// ─── Send Result ────────────────────────────────────────────────────

/// Outcome of a single delivery through a [`Session`](crate::postman::Session).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendmailResponse {
    /// Reply code of the post-delivery NOOP.
    pub status_code: u16,
    pub reason: String,
    /// Recipients the server refused, keyed by address.
    pub rejected: BTreeMap<String, (u16, String)>,
}

impl SendmailResponse {
    /// Delivered to every recipient and the session is still healthy.
    pub fn ok(&self) -> bool {
        self.status_code == 250 && self.rejected.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
