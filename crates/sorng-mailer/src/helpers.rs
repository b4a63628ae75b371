//! Address and header value normalisation.
//!
//! Everything a header builder needs to turn Unicode input into values that
//! can be written into a message: IDNA domains, RFC 2047 display names and a
//! text-only header map.

use base64::Engine;

use crate::types::*;

/// Characters that force a display name into a quoted string.
const NAME_SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

/// Input bytes per encoded word: 45 bytes become 60 base64 characters, which
/// with the `=?UTF-8?B?` and `?=` delimiters stays within 75.
const ENCODED_WORD_BYTES: usize = 45;

/// Suffixes that mark a compressed file, with the encoding they imply.
const COMPRESSED_SUFFIXES: &[(&str, &str)] = &[
    (".gz", "gzip"),
    (".Z", "compress"),
    (".bz2", "bzip2"),
    (".xz", "xz"),
    (".br", "br"),
];

// ── Type sniffing ───────────────────────────────────────────────────

/// Guess the mimetype and encoding of `filename` from its extension.
///
/// When the extension is unknown the mimetype is `fallback`.
pub fn guess(filename: &str, fallback: Option<&str>) -> (Option<String>, Option<String>) {
    let (stem, encoding) = COMPRESSED_SUFFIXES
        .iter()
        .find(|(suffix, _)| filename.len() > suffix.len() && filename.ends_with(suffix))
        .map(|(suffix, enc)| (&filename[..filename.len() - suffix.len()], Some(enc.to_string())))
        .unwrap_or((filename, None));

    let mimetype = mime_guess::from_path(stem)
        .first_raw()
        .map(str::to_owned)
        .or_else(|| fallback.map(str::to_owned));
    (mimetype, encoding)
}

// ── Addresses ───────────────────────────────────────────────────────

/// Join addresses into one header value; named pairs become `Name <address>`,
/// formatted strings pass through untouched.
pub fn format_addresses<I, A>(items: I) -> String
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    items
        .into_iter()
        .map(|a| a.into().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Encode a Unicode address: the domain is IDNA-encoded, the local part is
/// kept as UTF-8.
pub fn encode_address(address: &str) -> MailerResult<Vec<u8>> {
    let Some(at) = address.rfind('@') else {
        return Ok(address.as_bytes().to_vec());
    };
    let (local, domain) = (&address[..at], &address[at + 1..]);
    let domain = idna::domain_to_ascii(domain)
        .map_err(|e| MailerError::encoding(format!("cannot IDNA-encode {:?}: {}", domain, e)))?;

    let mut out = Vec::with_capacity(local.len() + 1 + domain.len());
    out.extend_from_slice(local.as_bytes());
    out.push(b'@');
    out.extend_from_slice(domain.as_bytes());
    Ok(out)
}

/// Encode one address specification into its header form.
pub fn encode_mailbox(address: &Address) -> MailerResult<String> {
    let (name, addr) = address.parts();
    let encoded = String::from_utf8(encode_address(addr)?)
        .map_err(|e| MailerError::encoding(e.to_string()))?;
    Ok(match name {
        Some(name) => format!("{} <{}>", encode_display_name(name), encoded),
        None => encoded,
    })
}

/// Split an address-list header value on the commas that separate mailboxes.
///
/// Commas inside a quoted display name or an angle-bracketed address are part
/// of that mailbox. Empty entries are dropped.
pub fn split_addresses(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let (mut start, mut quoted, mut escaped, mut angle) = (0, false, false, false);
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '<' if !quoted => angle = true,
            '>' if !quoted => angle = false,
            ',' if !quoted && !angle => {
                out.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(value[start..].trim());
    out.retain(|a| !a.is_empty());
    out
}

/// Extract the addr-spec from `Name <addr>`; bare input is returned trimmed.
pub fn addr_spec(value: &str) -> &str {
    let value = value.trim();
    match (value.rfind('<'), value.rfind('>')) {
        (Some(lt), Some(gt)) if lt < gt => value[lt + 1..gt].trim(),
        _ => value,
    }
}

fn encode_display_name(name: &str) -> String {
    if !name.is_ascii() {
        return encode_header_value(name);
    }
    if name.contains(NAME_SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

// ── Header values ───────────────────────────────────────────────────

/// RFC 2047 encode a header value if it contains non-ASCII characters.
///
/// Long values become several encoded words of at most 75 characters each,
/// separated by folding whitespace. Words never split a UTF-8 sequence.
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    utf8_chunks(value, ENCODED_WORD_BYTES)
        .into_iter()
        .map(|chunk| {
            let encoded = base64::engine::general_purpose::STANDARD.encode(chunk.as_bytes());
            format!("=?UTF-8?B?{}?=", encoded)
        })
        .collect::<Vec<_>>()
        .join("\r\n ")
}

fn utf8_chunks(value: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if i + c.len_utf8() - start > max {
            chunks.push(&value[start..i]);
            start = i;
        }
    }
    chunks.push(&value[start..]);
    chunks
}

// ── UnicodeDict ─────────────────────────────────────────────────────

/// Ordered header map whose values are always text.
///
/// Values may be handed in as `&str`, `String` or raw UTF-8 bytes; bytes are
/// decoded on the way in, so readers never see anything but `&str`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnicodeDict {
    entries: Vec<(String, String)>,
}

impl UnicodeDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> MailerResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        let mut dict = Self::new();
        dict.update(pairs)?;
        Ok(dict)
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> MailerResult<()>
    where
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        let key = key.into();
        let value = std::str::from_utf8(value.as_ref())
            .map_err(|e| MailerError::encoding(format!("value of {} is not UTF-8: {}", key, e)))?
            .to_string();
        self.insert_str(key, value);
        Ok(())
    }

    /// Set `key` from text, which needs no decoding.
    pub fn insert_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn update<I, K, V>(&mut self, pairs: I) -> MailerResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        for (k, v) in pairs {
            self.insert(k, v)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
