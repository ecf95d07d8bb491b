//! ISO-2022-JP and its Microsoft variant.
//!
//! Both directions reuse the WHATWG tables shipped with `encoding_rs`.
//! Encoding looks a character up in Shift_JIS (CP932) and folds the
//! lead/trail pair back into a JIS row and cell; the row decides whether the
//! character is legal for the requested variant. Decoding goes through the
//! `encoding_rs` ISO-2022-JP decoder, which already understands the NEC rows
//! the Microsoft variant emits.

use std::collections::HashMap;
use std::sync::OnceLock;

use encoding_rs::{ISO_2022_JP, SHIFT_JIS};

use crate::error::TranscodeError;

/// Designates ASCII.
pub(crate) const ESC_ASCII: &[u8] = b"\x1b(B";
/// Designates JIS X 0201 Roman.
const ESC_ROMAN: &[u8] = b"\x1b(J";
/// Designates JIS X 0201 Katakana.
const ESC_KATAKANA: &[u8] = b"\x1b(I";
/// Designates JIS X 0208-1983.
const ESC_JIS0208: &[u8] = b"\x1b$B";
/// Designates JIS C 6226-1978, accepted on input only.
const ESC_JIS0208_1978: &[u8] = b"\x1b$@";

/// Which character repertoire the encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Variant {
    /// RFC 1468: ASCII, JIS X 0201 Roman, JIS X 0208.
    Standard,
    /// ISO-2022-JP-MS: adds NEC row 13, NEC-selected IBM extensions and
    /// half-width katakana.
    Microsoft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ascii,
    Roman,
    Katakana,
    Jis0208,
}

impl Mode {
    const fn escape(self) -> &'static [u8] {
        match self {
            Self::Ascii => ESC_ASCII,
            Self::Roman => ESC_ROMAN,
            Self::Katakana => ESC_KATAKANA,
            Self::Jis0208 => ESC_JIS0208,
        }
    }
}

/// Cells where JIS and CP932 disagree on the Unicode mapping:
/// `(JIS, CP932)`.
const COMPAT: [(char, char); 7] = [
    ('\u{301C}', '\u{FF5E}'), // WAVE DASH
    ('\u{2016}', '\u{2225}'), // DOUBLE VERTICAL LINE
    ('\u{2212}', '\u{FF0D}'), // MINUS SIGN
    ('\u{00A2}', '\u{FFE0}'), // CENT SIGN
    ('\u{00A3}', '\u{FFE1}'), // POUND SIGN
    ('\u{00AC}', '\u{FFE2}'), // NOT SIGN
    ('\u{2014}', '\u{2015}'), // EM DASH
];

/// Maps a JIS-standard code point onto the one CP932 uses for the same cell.
pub(crate) fn to_cp932_form(ch: char) -> char {
    COMPAT
        .iter()
        .find(|(jis, _)| *jis == ch)
        .map_or(ch, |(_, cp932)| *cp932)
}

/// Maps a CP932 code point back onto the JIS-standard one.
pub(crate) fn to_jis_form(ch: char) -> char {
    COMPAT
        .iter()
        .find(|(_, cp932)| *cp932 == ch)
        .map_or(ch, |(jis, _)| *jis)
}

/// Recognizes a designation escape at the start of `bytes`.
///
/// Returns the escape sequence and whether the designated set is
/// double-byte.
pub(crate) fn escape_at(bytes: &[u8]) -> Option<(&'static [u8], bool)> {
    [
        (ESC_ASCII, false),
        (ESC_ROMAN, false),
        (ESC_KATAKANA, false),
        (ESC_JIS0208, true),
        (ESC_JIS0208_1978, true),
    ]
    .into_iter()
    .find(|(escape, _)| bytes.starts_with(escape))
}

/// One encoded character.
enum Code {
    Single(Mode, u8),
    Double(u8, u8),
}

/// Encodes `text`, always returning to ASCII at the end.
pub(crate) fn encode(text: &str, variant: Variant, charset: &str) -> Result<Vec<u8>, TranscodeError> {
    let mut out = Vec::with_capacity(text.len() + 2 * ESC_ASCII.len());
    let mut mode = Mode::Ascii;

    for ch in text.chars() {
        let code = encode_char(ch, variant).ok_or_else(|| TranscodeError::Unmappable {
            charset: charset.to_string(),
            ch,
        })?;
        let (next, bytes) = match code {
            Code::Single(next, byte) => (next, [byte, 0]),
            Code::Double(row, cell) => (Mode::Jis0208, [row, cell]),
        };
        if next != mode {
            out.extend_from_slice(next.escape());
            mode = next;
        }
        let width = if next == Mode::Jis0208 { 2 } else { 1 };
        out.extend_from_slice(&bytes[..width]);
    }

    if mode != Mode::Ascii {
        out.extend_from_slice(ESC_ASCII);
    }
    Ok(out)
}

fn encode_char(ch: char, variant: Variant) -> Option<Code> {
    if ch.is_ascii() {
        // SO, SI and ESC would break the framing.
        return match ch {
            '\x0E' | '\x0F' | '\x1B' => None,
            _ => u8::try_from(ch).ok().map(|byte| Code::Single(Mode::Ascii, byte)),
        };
    }

    let ch = to_cp932_form(ch);
    let mut buf = [0u8; 4];
    let (bytes, _, unmappable) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
    if unmappable {
        return None;
    }

    match *bytes {
        // U+00A5 and U+203E live in JIS X 0201 Roman.
        [byte] if byte < 0x80 => Some(Code::Single(Mode::Roman, byte)),
        [byte @ 0xA1..=0xDF] => {
            (variant == Variant::Microsoft).then_some(Code::Single(Mode::Katakana, byte - 0x80))
        }
        [lead, trail] => {
            let (lead, trail) = if variant == Variant::Microsoft && (0xFA..=0xFC).contains(&lead) {
                nec_selected(ch)?
            } else {
                (lead, trail)
            };
            let (row, cell) = sjis_to_jis(lead, trail);
            let allowed = match variant {
                Variant::Standard => matches!(row, 1..=8 | 16..=84),
                Variant::Microsoft => matches!(row, 1..=8 | 13 | 16..=84 | 89..=92),
            };
            allowed.then_some(Code::Double(row + 0x20, cell + 0x20))
        }
        _ => None,
    }
}

/// Converts a Shift_JIS lead/trail pair into a 1-based JIS row and cell.
const fn sjis_to_jis(lead: u8, trail: u8) -> (u8, u8) {
    let pair = if lead >= 0xE0 { lead - 0xC1 } else { lead - 0x81 };
    if trail >= 0x9F {
        (pair * 2 + 2, trail - 0x9E)
    } else if trail >= 0x80 {
        (pair * 2 + 1, trail - 0x40)
    } else {
        (pair * 2 + 1, trail - 0x3F)
    }
}

/// CP932 encodes the IBM extension kanji at 0xFA40..0xFC4B, but the same
/// characters also sit in the NEC-selected block at 0xED40..0xEEFC, which
/// maps onto JIS rows 89-92. ISO-2022-JP-MS can only express the latter.
fn nec_selected(ch: char) -> Option<(u8, u8)> {
    static TABLE: OnceLock<HashMap<char, (u8, u8)>> = OnceLock::new();

    TABLE
        .get_or_init(|| {
            let mut table = HashMap::new();
            for lead in [0xED_u8, 0xEE] {
                for trail in (0x40_u8..=0xFC).filter(|trail| *trail != 0x7F) {
                    let pair = [lead, trail];
                    let Some(decoded) = SHIFT_JIS.decode_without_bom_handling_and_without_replacement(&pair)
                    else {
                        continue;
                    };
                    let mut chars = decoded.chars();
                    if let (Some(decoded), None) = (chars.next(), chars.next()) {
                        table.entry(decoded).or_insert((lead, trail));
                    }
                }
            }
            table
        })
        .get(&ch)
        .copied()
}

/// Decodes either variant. The standard variant yields JIS-standard code
/// points (U+301C WAVE DASH rather than U+FF5E), the Microsoft one keeps the
/// CP932 forms.
pub(crate) fn decode(bytes: &[u8], variant: Variant, charset: &str) -> Result<String, TranscodeError> {
    let text = ISO_2022_JP
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| TranscodeError::Malformed {
            charset: charset.to_string(),
        })?;

    Ok(match variant {
        Variant::Standard => text.chars().map(to_jis_form).collect(),
        Variant::Microsoft => text.into_owned(),
    })
}
