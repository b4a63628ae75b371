//! **sorng-mailer** — mail composition and delivery helpers.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Error handling, configuration, address input, send result |
//! | [`helpers`] | Address/value normalisation (IDNA, RFC 2047, `UnicodeDict`, type sniffing) |
//! | [`headers`] | Ordered headers with Resent-* precedence and header builders |
//! | [`mime`] | Minimal MIME object and renderer |
//! | [`enclosure`] | Text, HTML, binary and file attachment parts |
//! | [`envelope`] | Headers + enclosures of one message |
//! | [`middleware`] | STARTTLS and AUTH connection middleware |
//! | [`postman`] | Transport-agnostic delivery |
//! | [`api`] | Convenience builder and pre-wired postman |

pub mod types;
pub mod helpers;
pub mod headers;
pub mod mime;
pub mod enclosure;
pub mod envelope;
pub mod middleware;
pub mod postman;
pub mod api;

pub use types::{Address, Credentials, MailerError, MailerErrorKind, MailerResult, PostmanConfig, SendmailResponse};
