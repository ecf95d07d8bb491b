//! RFC 2047 encoded words for header values.
//!
//! Raw values are cut into characters of the header charset without being
//! decoded, so bytes are never re-encoded on the way out. Each encoded word
//! holds whole characters; in ISO-2022-JP every word carries its own
//! designation escape and returns to ASCII before it ends.

use std::fmt::Write as _;

use encoding_rs::{DecoderResult, Encoding};
use tracing::trace;

use crate::charset::Charset;
use crate::encoding::encode_base64;
use crate::header::{EncodedValue, HeaderValue};
use crate::iso2022jp::{ESC_ASCII, escape_at};
use crate::params::TransferEncoding;

/// Longest encoded word line, RFC 2047 section 2.
const MAX_WORD_LINE: usize = 75;

const WORD_SUFFIX: &str = "?=";

const FOLD: &str = "\r\n ";

/// Fields whose value is a comma separated address list; only display names
/// get encoded there.
const ADDRESS_FIELDS: [&str; 16] = [
    "from",
    "to",
    "cc",
    "bcc",
    "sender",
    "reply-to",
    "resent-from",
    "resent-to",
    "resent-cc",
    "resent-bcc",
    "resent-sender",
    "resent-reply-to",
    "mail-reply-to",
    "mail-followup-to",
    "return-receipt-to",
    "disposition-notification-to",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordEncoding {
    Q,
    B,
}

/// One character of a raw value, with the escape sequence that designates
/// its character set (`None` for ASCII).
#[derive(Debug, Clone, Copy)]
struct Unit<'v> {
    shift: Option<&'static [u8]>,
    bytes: &'v [u8],
}

impl Unit<'_> {
    const fn plain(bytes: &[u8]) -> Unit<'_> {
        Unit { shift: None, bytes }
    }

    fn is(&self, byte: u8) -> bool {
        self.shift.is_none() && self.bytes == [byte]
    }

    fn is_printable_ascii(&self) -> bool {
        self.shift.is_none() && !needs_encoding(self.bytes)
    }
}

/// Encodes raw header values into RFC 2047 form.
#[derive(Debug, Clone, Copy)]
pub struct HeaderEncoder<'a> {
    label: &'a str,
    charset: Charset,
    word: WordEncoding,
}

impl<'a> HeaderEncoder<'a> {
    /// Creates an encoder writing `label` into the encoded words and cutting
    /// values along the characters of `charset`. `base64` selects the "B"
    /// encoding, anything else "Q".
    #[must_use]
    pub fn new(label: &'a str, charset: Charset, encoding: TransferEncoding) -> Self {
        let word = match encoding {
            TransferEncoding::Base64 => WordEncoding::B,
            _ => WordEncoding::Q,
        };
        Self {
            label,
            charset,
            word,
        }
    }

    /// Encodes every value of a field.
    #[must_use]
    pub fn encode(&self, name: &str, value: &HeaderValue) -> EncodedValue {
        match value {
            HeaderValue::Single(raw) => EncodedValue::Single(self.encode_field(name, raw)),
            HeaderValue::Multi(raws) => {
                EncodedValue::Multi(raws.iter().map(|raw| self.encode_field(name, raw)).collect())
            }
        }
    }

    /// Encodes one value of field `name`. Printable ASCII passes through.
    #[must_use]
    pub fn encode_field(&self, name: &str, raw: &[u8]) -> String {
        if !needs_encoding(raw) {
            return ascii_string(raw);
        }

        trace!(field = name, charset = self.label, "encoding header");
        let units = units(raw, self.charset);
        // The first line also holds "Name: ".
        let prefix_len = name.len() + 2;
        if ADDRESS_FIELDS.iter().any(|field| field.eq_ignore_ascii_case(name)) {
            self.encode_addresses(&units, prefix_len)
        } else {
            self.encoded_words(&units, prefix_len)
        }
    }

    fn encode_addresses(&self, units: &[Unit<'_>], prefix_len: usize) -> String {
        split_addresses(units)
            .into_iter()
            .enumerate()
            .map(|(index, address)| {
                let line_start = if index == 0 { prefix_len } else { 0 };
                self.encode_address(address, line_start)
            })
            .collect::<Vec<_>>()
            .join(&format!(",{FOLD}"))
    }

    fn encode_address(&self, address: &[Unit<'_>], prefix_len: usize) -> String {
        if address.iter().all(Unit::is_printable_ascii) {
            return units_to_ascii(address);
        }

        match address.iter().rposition(|unit| unit.is(b'<')) {
            Some(open) => {
                let phrase = unquote(trim(&address[..open]));
                let angle = units_to_ascii(&address[open..]);
                if phrase.is_empty() {
                    angle
                } else {
                    format!("{} {angle}", self.encoded_words(phrase, prefix_len))
                }
            }
            None => self.encoded_words(address, prefix_len),
        }
    }

    /// Greedily packs characters into encoded words of at most
    /// [`MAX_WORD_LINE`] columns, folding between words.
    fn encoded_words(&self, units: &[Unit<'_>], prefix_len: usize) -> String {
        let letter = match self.word {
            WordEncoding::Q => 'Q',
            WordEncoding::B => 'B',
        };
        let prefix = format!("=?{}?{letter}?", self.label);
        let max = MAX_WORD_LINE.saturating_sub(prefix.len() + WORD_SUFFIX.len());
        let mut budget = max.saturating_sub(prefix_len);

        let mut words = Vec::new();
        let mut current = String::new();
        let mut start = 0;
        for end in 1..=units.len() {
            let candidate = self.encode_text(&render(&units[start..end]));
            if candidate.len() > budget && end - start > 1 {
                words.push(std::mem::take(&mut current));
                start = end - 1;
                budget = max;
                current = self.encode_text(&render(&units[start..end]));
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            words.push(current);
        }

        words
            .iter()
            .map(|word| format!("{prefix}{word}{WORD_SUFFIX}"))
            .collect::<Vec<_>>()
            .join(FOLD)
    }

    fn encode_text(&self, bytes: &[u8]) -> String {
        match self.word {
            WordEncoding::Q => q_encode(bytes),
            WordEncoding::B => encode_base64(bytes),
        }
    }
}

/// Anything outside printable ASCII and HTAB needs an encoded word.
fn needs_encoding(raw: &[u8]) -> bool {
    raw.iter().any(|&b| b != b'\t' && !(0x20..=0x7E).contains(&b))
}

fn ascii_string(raw: &[u8]) -> String {
    raw.iter().copied().map(char::from).collect()
}

fn units_to_ascii(units: &[Unit<'_>]) -> String {
    ascii_string(&render(units))
}

/// The "Q" encoding of RFC 2047 section 4.2, restricted to the characters
/// allowed in a phrase so one routine serves both structured and
/// unstructured fields.
fn q_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for &byte in bytes {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                out.push(char::from(byte));
            }
            b' ' => out.push('_'),
            _ => {
                let _ = write!(out, "={byte:02X}");
            }
        }
    }
    out
}

/// Rebuilds bytes for a run of characters, adding the escapes a stateful
/// charset needs and returning to ASCII at the end.
fn render(units: &[Unit<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut shift = None;
    for unit in units {
        if unit.shift != shift {
            out.extend_from_slice(unit.shift.unwrap_or(ESC_ASCII));
            shift = unit.shift;
        }
        out.extend_from_slice(unit.bytes);
    }
    if shift.is_some() {
        out.extend_from_slice(ESC_ASCII);
    }
    out
}

fn units(raw: &[u8], charset: Charset) -> Vec<Unit<'_>> {
    if charset.is_stateful() {
        return iso2022_units(raw);
    }
    match charset.stateless_encoding() {
        Some(encoding) => decoder_units(raw, encoding),
        None => raw.chunks(1).map(Unit::plain).collect(),
    }
}

fn iso2022_units(raw: &[u8]) -> Vec<Unit<'_>> {
    let mut units = Vec::with_capacity(raw.len());
    let mut shift = None;
    let mut double = false;
    let mut pos = 0;

    while pos < raw.len() {
        if let Some((escape, is_double)) = escape_at(&raw[pos..]) {
            shift = (escape != ESC_ASCII).then_some(escape);
            double = is_double;
            pos += escape.len();
            continue;
        }
        let width = if double { 2.min(raw.len() - pos) } else { 1 };
        units.push(Unit {
            shift,
            bytes: &raw[pos..pos + width],
        });
        pos += width;
    }
    units
}

/// Finds character boundaries by feeding a decoder one byte at a time.
fn decoder_units<'v>(raw: &'v [u8], encoding: &'static Encoding) -> Vec<Unit<'v>> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut scratch = String::with_capacity(16);
    let mut units = Vec::with_capacity(raw.len());
    let mut start = 0;

    for end in 1..=raw.len() {
        scratch.clear();
        let (result, _) =
            decoder.decode_to_string_without_replacement(&raw[end - 1..end], &mut scratch, end == raw.len());
        if matches!(result, DecoderResult::Malformed(..)) || !scratch.is_empty() {
            units.push(Unit::plain(&raw[start..end]));
            start = end;
        }
    }
    if start < raw.len() {
        units.push(Unit::plain(&raw[start..]));
    }
    units
}

/// Splits an address list on commas outside quoted strings, dropping empty
/// entries.
fn split_addresses<'u, 'v>(units: &'u [Unit<'v>]) -> Vec<&'u [Unit<'v>]> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, unit) in units.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if unit.is(b'\\') {
            escaped = true;
        } else if unit.is(b'"') {
            quoted = !quoted;
        } else if unit.is(b',') && !quoted {
            parts.push(trim(&units[start..index]));
            start = index + 1;
        }
    }
    parts.push(trim(&units[start..]));
    parts.retain(|part| !part.is_empty());
    parts
}

fn trim<'u, 'v>(units: &'u [Unit<'v>]) -> &'u [Unit<'v>] {
    let blank = |unit: &Unit<'_>| unit.is(b' ') || unit.is(b'\t');
    let start = units.iter().position(|u| !blank(u)).unwrap_or(units.len());
    let end = units.iter().rposition(|u| !blank(u)).map_or(start, |i| i + 1);
    &units[start..end]
}

fn unquote<'u, 'v>(units: &'u [Unit<'v>]) -> &'u [Unit<'v>] {
    match units {
        [first, inner @ .., last] if first.is(b'"') && last.is(b'"') => inner,
        _ => units,
    }
}
