//! Delivery: open a session, run middleware, hand over the envelope, quit.
//!
//! The SMTP protocol itself lives behind [`Transport`] and [`Session`], so any
//! client able to EHLO, send and quit can carry messages.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};

use crate::envelope::Envelope;
use crate::middleware::{Connection, Middleware};
use crate::types::*;

/// Recipients refused by the server, keyed by address.
pub type Refused = BTreeMap<String, (u16, String)>;

/// An open SMTP session.
pub trait Session: Connection {
    fn ehlo(&mut self) -> MailerResult<()>;
    /// Transmit `message`; recipients the server refused are returned, the
    /// call fails only when nobody accepted it.
    fn sendmail(&mut self, from: &str, receivers: &[String], message: &str) -> MailerResult<Refused>;
    fn noop(&mut self) -> MailerResult<(u16, String)>;
    fn quit(&mut self) -> MailerResult<()>;
}

/// Opens sessions.
pub trait Transport {
    type Session: Session;

    fn connect(
        &self,
        host: &str,
        port: u16,
        options: &HashMap<String, String>,
    ) -> MailerResult<Self::Session>;
}

/// Sends envelopes through a transport, one session per envelope.
pub struct Postman<T: Transport> {
    transport: T,
    config: PostmanConfig,
    middlewares: Vec<Box<dyn Middleware>>,
}

impl<T: Transport> Postman<T> {
    pub fn new(transport: T, config: PostmanConfig) -> Self {
        Self {
            transport,
            config,
            middlewares: Vec::new(),
        }
    }

    pub fn config(&self) -> &PostmanConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Append a middleware; middlewares run in registration order.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    pub fn send(&self, envelope: &Envelope) -> MailerResult<SendmailResponse> {
        let from = envelope
            .mail_from()
            .ok_or_else(|| MailerError::message("envelope has no sender"))?
            .to_string();
        let receivers = envelope.receivers();
        if receivers.is_empty() {
            return Err(MailerError::message("envelope has no receivers"));
        }
        let message = envelope.string()?;

        debug!(
            "Connecting to {}:{} for {} recipient(s)",
            self.config.host,
            self.config.port,
            receivers.len()
        );
        let mut session = self
            .transport
            .connect(&self.config.host, self.config.port, &self.config.options)?;

        let result = self.deliver(&mut session, &from, &receivers, &message);
        if let Err(e) = session.quit() {
            warn!("QUIT failed: {}", e);
        }
        result
    }

    fn deliver(
        &self,
        session: &mut T::Session,
        from: &str,
        receivers: &[String],
        message: &str,
    ) -> MailerResult<SendmailResponse> {
        session.ehlo()?;
        for middleware in &self.middlewares {
            middleware.apply(session)?;
        }

        let rejected = session.sendmail(from, receivers, message)?;
        for (addr, (code, reason)) in &rejected {
            warn!("Recipient {} refused: {} {}", addr, code, reason);
        }
        if receivers.iter().all(|r| rejected.contains_key(r)) {
            let (code, reason) = rejected.values().next().cloned().unwrap_or_default();
            return Err(MailerError::server(
                code,
                format!("all {} recipient(s) refused: {}", receivers.len(), reason),
            ));
        }
        let (status_code, reason) = session.noop()?;
        info!(
            "Delivered message from {} to {}/{} recipient(s)",
            from,
            receivers.len().saturating_sub(rejected.len()),
            receivers.len()
        );
        Ok(SendmailResponse {
            status_code,
            reason,
            rejected,
        })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
