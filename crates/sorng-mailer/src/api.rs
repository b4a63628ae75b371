//! Convenience entry points for the common case.

use std::path::PathBuf;

use crate::enclosure::{Attachment, Enclosure, Html, PlainText};
use crate::envelope::Envelope;
use crate::headers::{self, DateSource, Header, Headers, MessageIdSource, SystemClock, UuidMessageIds};
use crate::middleware::{Auth, Tls};
use crate::postman::{Postman, Transport};
use crate::types::*;

/// Build a typical envelope: From, To, Cc, Bcc, Subject, Date and
/// Message-ID headers, an optional text and HTML body and file attachments.
pub struct EmailBuilder {
    sender: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    charset: Option<String>,
    attachments: Vec<PathBuf>,
    extra: Vec<Header>,
    ids: Box<dyn MessageIdSource>,
    clock: Box<dyn DateSource>,
}

impl EmailBuilder {
    pub fn new() -> Self {
        Self {
            sender: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: None,
            text: None,
            html: None,
            charset: None,
            attachments: Vec::new(),
            extra: Vec::new(),
            ids: Box::new(UuidMessageIds::default()),
            clock: Box::new(SystemClock),
        }
    }

    /// A builder whose Message-IDs use the configured domain.
    pub fn from_config(config: &PostmanConfig) -> Self {
        Self::new().message_ids(UuidMessageIds::new(config.message_id_domain.clone()))
    }

    pub fn sender(mut self, addr: impl Into<Address>) -> Self {
        self.sender = Some(addr.into());
        self
    }

    pub fn to(mut self, addr: impl Into<Address>) -> Self {
        self.to.push(addr.into());
        self
    }

    pub fn cc(mut self, addr: impl Into<Address>) -> Self {
        self.cc.push(addr.into());
        self
    }

    pub fn bcc(mut self, addr: impl Into<Address>) -> Self {
        self.bcc.push(addr.into());
        self
    }

    pub fn subject(mut self, s: impl Into<String>) -> Self {
        self.subject = Some(s.into());
        self
    }

    /// HTML body.
    pub fn content(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    /// Charset of the text and HTML bodies; UTF-8 unless set.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push(Header::new(name, value));
        self
    }

    pub fn message_ids(mut self, source: impl MessageIdSource + 'static) -> Self {
        self.ids = Box::new(source);
        self
    }

    pub fn clock(mut self, source: impl DateSource + 'static) -> Self {
        self.clock = Box::new(source);
        self
    }

    pub fn build(self) -> MailerResult<Envelope> {
        let mut head = Headers::default();
        if let Some(sender) = self.sender {
            head.push(headers::sender([sender])?);
        }
        if !self.to.is_empty() {
            head.push(headers::to(self.to)?);
        }
        if !self.cc.is_empty() {
            head.push(headers::cc(self.cc)?);
        }
        if !self.bcc.is_empty() {
            head.push(headers::bcc(self.bcc)?);
        }
        if let Some(subject) = self.subject {
            head.push(headers::subject(subject));
        }
        head.push(headers::date_with(self.clock.as_ref(), None::<&str>));
        head.push(headers::message_id_with(self.ids.as_ref(), None::<&str>));
        head.update(self.extra);

        let mut enclosures: Vec<Box<dyn Enclosure>> = Vec::new();
        if let Some(text) = self.text {
            let mut part = PlainText::new(text);
            if let Some(charset) = &self.charset {
                part = part.with_charset(charset.as_str());
            }
            enclosures.push(Box::new(part));
        }
        if let Some(html) = self.html {
            let mut part = Html::new(html);
            if let Some(charset) = &self.charset {
                part = part.with_charset(charset.as_str());
            }
            enclosures.push(Box::new(part));
        }
        for path in self.attachments {
            enclosures.push(Box::new(Attachment::from_path(path)));
        }
        Ok(Envelope::new(head, enclosures))
    }
}

impl Default for EmailBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Postman`] wired from configuration: STARTTLS first (forced when
/// `force_tls` is set), then AUTH when credentials are present.
pub fn postman<T: Transport>(transport: T, config: PostmanConfig) -> MailerResult<Postman<T>> {
    config.validate()?;
    let force = config.force_tls;
    let credentials = config.credentials.clone();

    let mut postman = Postman::new(transport, config);
    postman.use_middleware(Tls::new(force));
    if let Some(creds) = credentials {
        postman.use_middleware(Auth::from(creds));
    }
    Ok(postman)
}

// ─── Tests ──────────────────────────────────────────────────────────
