//! Ordered message headers and the builders that produce them.
//!
//! [`Headers`] keeps `(name, value)` pairs in insertion order and derives the
//! envelope sender and recipients from them. When a `Resent-Date` header is
//! present the message is treated as resent and every derivation switches to
//! the `Resent-*` family.

use std::collections::{HashMap, HashSet};

use chrono::{Local, Utc};
use log::debug;

use crate::helpers::{addr_spec, encode_mailbox, split_addresses};
use crate::types::*;

const RESENT_MARKER: &str = "Resent-Date";
const SENDERS: [&str; 2] = ["Sender", "From"];
const RESENT_SENDERS: [&str; 2] = ["Resent-Sender", "Resent-From"];
const RECEIVERS: [&str; 3] = ["To", "Cc", "Bcc"];
const RESENT_RECEIVERS: [&str; 3] = ["Resent-To", "Resent-Cc", "Resent-Bcc"];
/// Headers that drive delivery but never reach the rendered message.
const HIDDEN: [&str; 2] = ["Bcc", "Resent-Bcc"];

// ─── Header ─────────────────────────────────────────────────────────

/// A single `(name, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<(&str, &str)> for Header {
    fn from((name, value): (&str, &str)) -> Self {
        Self::new(name, value)
    }
}

impl From<(&str, String)> for Header {
    fn from((name, value): (&str, String)) -> Self {
        Self::new(name, value)
    }
}

impl From<(String, String)> for Header {
    fn from((name, value): (String, String)) -> Self {
        Self { name, value }
    }
}

impl From<Header> for (String, String) {
    fn from(h: Header) -> Self {
        (h.name, h.value)
    }
}

// ─── Target ─────────────────────────────────────────────────────────

/// Anything [`Headers::prepare`] can write into.
pub trait HeaderTarget {
    fn header(&self, name: &str) -> Option<&str>;
    fn set_header(&mut self, name: &str, value: &str);
}

impl HeaderTarget for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

// ─── Headers ────────────────────────────────────────────────────────

/// Ordered header collection.
///
/// Names are matched exactly as given. Inserting a name that is already
/// present replaces its value and keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    pub fn new<I, H>(items: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<Header>,
    {
        let mut headers = Self::default();
        headers.update(items);
        headers
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.push(Header::new(name, value));
    }

    pub fn push(&mut self, header: Header) {
        match self.entries.iter_mut().find(|h| h.name == header.name) {
            Some(slot) => slot.value = header.value,
            None => self.entries.push(header),
        }
    }

    pub fn update<I, H>(&mut self, items: I)
    where
        I: IntoIterator<Item = H>,
        H: Into<Header>,
    {
        for item in items {
            self.push(item.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|h| h.name == name)
    }

    /// Remove `name`, failing when it is not present.
    pub fn remove(&mut self, name: &str) -> MailerResult<()> {
        self.pop(name).map(drop)
    }

    /// Remove `name` and return its value, failing when it is not present.
    pub fn pop(&mut self, name: &str) -> MailerResult<String> {
        let pos = self
            .entries
            .iter()
            .position(|h| h.name == name)
            .ok_or_else(|| MailerError::header_not_found(name))?;
        Ok(self.entries.remove(pos).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this is a resent message.
    pub fn resent(&self) -> bool {
        self.contains(RESENT_MARKER)
    }

    /// The originating address: the first non-empty of `Sender`/`From`, or
    /// of `Resent-Sender`/`Resent-From` for a resent message.
    pub fn sender(&self) -> Option<&str> {
        let candidates = if self.resent() { RESENT_SENDERS } else { SENDERS };
        candidates
            .iter()
            .find_map(|name| self.get(name).filter(|v| !v.is_empty()))
    }

    /// Every recipient address across To/Cc/Bcc (or their `Resent-*`
    /// counterparts), de-duplicated in first-seen order.
    pub fn receivers(&self) -> Vec<String> {
        let fields = if self.resent() { RESENT_RECEIVERS } else { RECEIVERS };
        let mut seen = HashSet::new();
        fields
            .iter()
            .filter_map(|name| self.get(name))
            .flat_map(split_addresses)
            .map(addr_spec)
            .filter(|addr| !addr.is_empty())
            .filter(|addr| seen.insert(addr.to_string()))
            .map(str::to_owned)
            .collect()
    }

    /// Write every visible, non-empty header into `target`.
    pub fn prepare<T: HeaderTarget + ?Sized>(&self, target: &mut T) {
        for h in &self.entries {
            if HIDDEN.contains(&h.name.as_str()) || h.value.is_empty() {
                debug!("Skipping header {}", h.name);
                continue;
            }
            target.set_header(&h.name, &h.value);
        }
    }
}

impl<H: Into<Header>> FromIterator<H> for Headers {
    fn from_iter<I: IntoIterator<Item = H>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<H: Into<Header>> Extend<H> for Headers {
    fn extend<I: IntoIterator<Item = H>>(&mut self, iter: I) {
        self.update(iter);
    }
}

// ─── Generators ─────────────────────────────────────────────────────

/// Produces fresh Message-ID values.
pub trait MessageIdSource {
    fn make_msgid(&self) -> String;
}

impl<F: Fn() -> String> MessageIdSource for F {
    fn make_msgid(&self) -> String {
        self()
    }
}

/// `<uuid@domain>` message ids.
#[derive(Debug, Clone)]
pub struct UuidMessageIds {
    pub domain: String,
}

impl UuidMessageIds {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl Default for UuidMessageIds {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl MessageIdSource for UuidMessageIds {
    fn make_msgid(&self) -> String {
        format!("<{}@{}>", uuid::Uuid::new_v4().simple(), self.domain)
    }
}

/// Produces mail-formatted dates.
pub trait DateSource {
    fn format_date(&self, localtime: bool) -> String;
}

impl<F: Fn(bool) -> String> DateSource for F {
    fn format_date(&self, localtime: bool) -> String {
        self(localtime)
    }
}

/// The system clock, formatted per RFC 2822.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl DateSource for SystemClock {
    fn format_date(&self, localtime: bool) -> String {
        if localtime {
            Local::now().to_rfc2822()
        } else {
            Utc::now().format("%a, %d %b %Y %H:%M:%S -0000").to_string()
        }
    }
}

// ─── Builders ───────────────────────────────────────────────────────

fn address_header<I, A>(name: &str, addresses: I) -> MailerResult<Header>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    let value = addresses
        .into_iter()
        .map(|a| encode_mailbox(&a.into()))
        .collect::<MailerResult<Vec<_>>>()?
        .join(", ");
    Ok(Header::new(name, value))
}

/// `To` header from one or more addresses.
pub fn to<I, A>(addresses: I) -> MailerResult<Header>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    address_header("To", addresses)
}

pub fn cc<I, A>(addresses: I) -> MailerResult<Header>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    address_header("Cc", addresses)
}

pub fn bcc<I, A>(addresses: I) -> MailerResult<Header>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    address_header("Bcc", addresses)
}

/// The originating mailbox, written as `From`.
pub fn sender<I, A>(addresses: I) -> MailerResult<Header>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    address_header("From", addresses)
}

pub fn subject(text: impl Into<String>) -> Header {
    Header::new("Subject", text)
}

/// `Message-ID` header; a fresh id is generated only when none is given.
pub fn message_id<S: ToString>(idstring: Option<S>) -> Header {
    message_id_with(&UuidMessageIds::default(), idstring)
}

pub fn message_id_with<G, S>(source: &G, idstring: Option<S>) -> Header
where
    G: MessageIdSource + ?Sized,
    S: ToString,
{
    let value = match idstring {
        Some(id) => id.to_string(),
        None => source.make_msgid(),
    };
    Header::new("Message-ID", value)
}

/// `Date` header; the current local time is used only when no value is given.
pub fn date<S: ToString>(value: Option<S>) -> Header {
    date_with(&SystemClock, value)
}

pub fn date_with<D, S>(source: &D, value: Option<S>) -> Header
where
    D: DateSource + ?Sized,
    S: ToString,
{
    let value = match value {
        Some(v) => v.to_string(),
        None => source.format_date(true),
    };
    Header::new("Date", value)
}

// ─── Tests ──────────────────────────────────────────────────────────
