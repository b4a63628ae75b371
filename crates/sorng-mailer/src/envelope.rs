//! Envelope: the headers plus the enclosures of one message.

use log::debug;

use crate::enclosure::Enclosure;
use crate::headers::Headers;
use crate::helpers::addr_spec;
use crate::mime::MimeMessage;
use crate::types::*;

/// A message ready to be rendered and handed to a [`Postman`](crate::postman::Postman).
pub struct Envelope {
    pub headers: Headers,
    pub enclosures: Vec<Box<dyn Enclosure>>,
    mail_from: Option<String>,
}

impl Envelope {
    pub fn new(headers: Headers, enclosures: Vec<Box<dyn Enclosure>>) -> Self {
        Self {
            headers,
            enclosures,
            mail_from: None,
        }
    }

    /// Override the SMTP envelope sender (`MAIL FROM`).
    pub fn with_mail_from(mut self, address: impl Into<String>) -> Self {
        self.mail_from = Some(address.into());
        self
    }

    pub fn sender(&self) -> Option<&str> {
        self.headers.sender()
    }

    pub fn receivers(&self) -> Vec<String> {
        self.headers.receivers()
    }

    /// The bare address used for `MAIL FROM`: the explicit override, else
    /// the header sender.
    pub fn mail_from(&self) -> Option<&str> {
        self.mail_from
            .as_deref()
            .or_else(|| self.sender())
            .map(addr_spec)
            .filter(|a| !a.is_empty())
    }

    pub fn mime(&self) -> MailerResult<MimeMessage> {
        let mut mime = MimeMessage::new();
        for enclosure in &self.enclosures {
            mime.attach(enclosure.mime()?);
        }
        self.headers.prepare(&mut mime);
        debug!(
            "Built MIME message with {} part(s) and {} header(s)",
            mime.parts().len(),
            self.headers.len()
        );
        Ok(mime)
    }

    pub fn string(&self) -> MailerResult<String> {
        Ok(self.mime()?.render())
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("headers", &self.headers)
            .field("enclosures", &self.enclosures.len())
            .field("mail_from", &self.mail_from)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enclosure::{Html, PlainText};
    use crate::headers::{self, HeaderTarget};

    fn envelope() -> Envelope {
        Envelope::new(
            Headers::new([
                headers::sender([("Me", "me@mail.com")]).unwrap(),
                headers::to(["to@mail.com"]).unwrap(),
                headers::bcc(["hidden@mail.com"]).unwrap(),
                headers::subject("Hi"),
            ]),
            vec![Box::new(PlainText::new("Hello")), Box::new(Html::new("<p>Hello</p>"))],
        )
    }

    #[test]
    fn sender_and_receivers() {
        let env = envelope();
        assert_eq!(env.sender(), Some("Me <me@mail.com>"));
        assert_eq!(env.receivers(), ["to@mail.com", "hidden@mail.com"]);
    }

    #[test]
    fn mail_from_defaults_to_sender_address() {
        assert_eq!(envelope().mail_from(), Some("me@mail.com"));
    }

    #[test]
    fn mail_from_override() {
        let env = envelope().with_mail_from("bounce@mail.com");
        assert_eq!(env.mail_from(), Some("bounce@mail.com"));
        assert_eq!(env.sender(), Some("Me <me@mail.com>"));
    }

    #[test]
    fn mail_from_missing() {
        let env = Envelope::new(Headers::new([("To", "to@mail.com")]), vec![]);
        assert_eq!(env.mail_from(), None);
    }

    #[test]
    fn mime_hides_bcc() {
        let mime = envelope().mime().unwrap();
        assert_eq!(mime.parts().len(), 2);
        assert_eq!(mime.header("To"), Some("to@mail.com"));
        assert!(mime.header("Bcc").is_none());
        let raw = envelope().string().unwrap();
        assert!(!raw.contains("hidden@mail.com"));
        assert!(raw.contains("Subject: Hi\r\n"));
        assert!(raw.contains("text/html"));
    }
}
