//! Charset conversion.
//!
//! Every conversion decodes the source bytes to Unicode and encodes them
//! again, strictly: malformed input and characters the target cannot
//! represent are errors, never replacement characters or numeric
//! references.

use std::borrow::Cow;

use encoding_rs::{EncoderResult, Encoding};
use tracing::debug;

use crate::charset::Charset;
use crate::error::{Result, TranscodeError};
use crate::header::HeaderValue;
use crate::iso2022jp::{self, Variant, to_cp932_form, to_jis_form};

/// Decodes `bytes` from `charset` into a string.
///
/// # Errors
///
/// Returns [`TranscodeError::Malformed`] if the bytes are not valid in
/// `charset`.
pub fn decode(bytes: &[u8], charset: Charset) -> Result<String> {
    let malformed = || TranscodeError::Malformed {
        charset: charset.name().to_string(),
    };

    let text = match charset {
        Charset::UsAscii => {
            if !bytes.is_ascii() {
                return Err(malformed().into());
            }
            bytes.iter().copied().map(char::from).collect()
        }
        Charset::Utf8 => std::str::from_utf8(bytes)
            .map_err(|_| malformed())?
            .to_string(),
        Charset::Iso2022Jp => iso2022jp::decode(bytes, Variant::Standard, charset.name())?,
        Charset::Iso2022JpMs => iso2022jp::decode(bytes, Variant::Microsoft, charset.name())?,
        Charset::Legacy(encoding) if uses_jis_forms(encoding) => encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(malformed)?
            .chars()
            .map(to_jis_form)
            .collect(),
        Charset::Utf16Be | Charset::Utf16Le | Charset::Cp932 | Charset::Legacy(_) => {
            let encoding = charset.stateless_encoding().ok_or_else(malformed)?;
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned)
                .ok_or_else(malformed)?
        }
    };
    Ok(text)
}

/// Encodes `text` into `charset`.
///
/// # Errors
///
/// Returns [`TranscodeError::Unmappable`] for the first character `charset`
/// has no code for.
pub fn encode(text: &str, charset: Charset) -> Result<Vec<u8>> {
    let unmappable = |ch| TranscodeError::Unmappable {
        charset: charset.name().to_string(),
        ch,
    };

    let bytes = match charset {
        Charset::UsAscii => {
            if let Some(ch) = text.chars().find(|ch| !ch.is_ascii()) {
                return Err(unmappable(ch).into());
            }
            text.as_bytes().to_vec()
        }
        Charset::Utf8 => text.as_bytes().to_vec(),
        Charset::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        Charset::Iso2022Jp => iso2022jp::encode(text, Variant::Standard, charset.name())?,
        Charset::Iso2022JpMs => iso2022jp::encode(text, Variant::Microsoft, charset.name())?,
        Charset::Cp932 => {
            let text: String = text.chars().map(to_cp932_form).collect();
            encode_with(encoding_rs::SHIFT_JIS, &text).map_err(unmappable)?
        }
        Charset::Legacy(encoding) if uses_jis_forms(encoding) => {
            let text: String = text.chars().map(to_cp932_form).collect();
            encode_with(encoding, &text).map_err(unmappable)?
        }
        Charset::Legacy(encoding) => encode_with(encoding, text).map_err(unmappable)?,
    };
    Ok(bytes)
}

/// Japanese charsets whose tables carry the CP932 code points for the cells
/// where JIS and CP932 disagree. Text in and out of them uses the JIS forms.
fn uses_jis_forms(encoding: &'static Encoding) -> bool {
    encoding == encoding_rs::SHIFT_JIS || encoding == encoding_rs::EUC_JP
}

fn encode_with(encoding: &'static Encoding, text: &str) -> std::result::Result<Vec<u8>, char> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut rest = text;

    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(rest, &mut out, true);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => return Ok(out),
            EncoderResult::OutputFull => out.reserve(rest.len().max(8) * 2),
            EncoderResult::Unmappable(ch) => return Err(ch),
        }
    }
}

/// Converts a byte string from one charset to another.
///
/// Identical charsets return the input unchanged.
///
/// # Errors
///
/// Returns [`crate::Error::Transcoding`] if the input is malformed or holds a
/// character `to` cannot represent.
pub fn convert_bytes(bytes: &[u8], to: Charset, from: Charset) -> Result<Vec<u8>> {
    if to == from {
        return Ok(bytes.to_vec());
    }
    decode(bytes, from)
        .and_then(|text| encode(&text, to))
        .inspect_err(|e| debug!(%from, %to, error = %e, "conversion failed"))
}

/// Converts a header value; list values convert element by element and keep
/// their order.
///
/// # Errors
///
/// Returns the first conversion error. Nothing is returned partially.
pub fn convert(value: &HeaderValue, to: Charset, from: Charset) -> Result<HeaderValue> {
    match value {
        HeaderValue::Single(bytes) => convert_bytes(bytes, to, from).map(HeaderValue::Single),
        HeaderValue::Multi(values) => values
            .iter()
            .map(|bytes| convert_bytes(bytes, to, from))
            .collect::<Result<Vec<_>>>()
            .map(HeaderValue::Multi),
    }
}

/// Converts values by charset name, with an explicit fallback for a
/// missing source charset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transcoder {
    default_source: Charset,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(Charset::Utf8)
    }
}

impl Transcoder {
    /// Creates a transcoder that reads unlabelled input as `default_source`.
    #[must_use]
    pub const fn new(default_source: Charset) -> Self {
        Self { default_source }
    }

    /// Charset used when the caller names no source charset.
    #[must_use]
    pub const fn default_source(&self) -> Charset {
        self.default_source
    }

    /// Converts `value` to `to`. A missing or blank `from` means the
    /// default source charset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedCharset`] for unknown names and
    /// [`crate::Error::Transcoding`] when conversion fails.
    pub fn convert(&self, value: &HeaderValue, to: &str, from: Option<&str>) -> Result<HeaderValue> {
        let to = Charset::from_label(to)?;
        let from = match from.filter(|label| !label.trim().is_empty()) {
            Some(label) => Charset::from_label(label)?,
            None => self.default_source,
        };
        convert(value, to, from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_utf8_to_iso2022jp() {
        let out = convert_bytes("テストメールです".as_bytes(), Charset::Iso2022Jp, Charset::Utf8)
            .unwrap();
        assert_eq!(out, b"\x1b$B%F%9%H%a!<%k$G$9\x1b(B".to_vec());
    }

    #[test]
    fn test_iso2022jp_round_trip() {
        let original = "件名: 日本語のテスト〜";
        let jis = convert_bytes(original.as_bytes(), Charset::Iso2022Jp, Charset::Utf8).unwrap();
        let back = convert_bytes(&jis, Charset::Utf8, Charset::Iso2022Jp).unwrap();
        assert_eq!(back, original.as_bytes());
    }

    #[test]
    fn test_unmappable_in_iso2022jp() {
        let err = convert_bytes("①".as_bytes(), Charset::Iso2022Jp, Charset::Utf8).unwrap_err();
        assert!(err.is_unmappable());
        let out = convert_bytes("①".as_bytes(), Charset::Iso2022JpMs, Charset::Utf8).unwrap();
        assert_eq!(out, b"\x1b$B-!\x1b(B".to_vec());
    }

    #[test]
    fn test_us_ascii_is_strict() {
        assert!(convert_bytes("café".as_bytes(), Charset::UsAscii, Charset::Utf8)
            .unwrap_err()
            .is_unmappable());
        assert!(matches!(
            convert_bytes(b"caf\xe9", Charset::Utf8, Charset::UsAscii),
            Err(Error::Transcoding(TranscodeError::Malformed { .. }))
        ));
        assert_eq!(
            convert_bytes(b"plain", Charset::Utf8, Charset::UsAscii).unwrap(),
            b"plain".to_vec()
        );
    }

    #[test]
    fn test_malformed_utf8() {
        let err = convert_bytes(b"\xff\xfe", Charset::Iso2022Jp, Charset::Utf8).unwrap_err();
        assert!(matches!(
            err,
            Error::Transcoding(TranscodeError::Malformed { charset }) if charset == "UTF-8"
        ));
    }

    #[test]
    fn test_cp932() {
        let out = convert_bytes("〜①".as_bytes(), Charset::Cp932, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0x81, 0x60, 0x87, 0x40]);
        let back = convert_bytes(&out, Charset::Utf8, Charset::Cp932).unwrap();
        assert_eq!(String::from_utf8(back).unwrap(), "\u{FF5E}①");
    }

    #[test]
    fn test_shift_jis_uses_jis_forms() {
        let sjis = Charset::from_label("Shift_JIS").unwrap();
        let out = convert_bytes("〜−".as_bytes(), sjis, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0x81, 0x60, 0x81, 0x7C]);
        let back = convert_bytes(&out, Charset::Utf8, sjis).unwrap();
        assert_eq!(String::from_utf8(back).unwrap(), "\u{301C}\u{2212}");

        let out = convert_bytes("\u{FF5E}".as_bytes(), sjis, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0x81, 0x60]);
    }

    #[test]
    fn test_euc_jp_uses_jis_forms() {
        let euc = Charset::from_label("EUC-JP").unwrap();
        let out = convert_bytes("〜".as_bytes(), euc, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0xA1, 0xC1]);
        let back = convert_bytes(&out, Charset::Utf8, euc).unwrap();
        assert_eq!(String::from_utf8(back).unwrap(), "\u{301C}");
    }

    #[test]
    fn test_wave_dash_from_iso2022jp_to_shift_jis() {
        let jis = b"\x1b$B!A\x1b(B";
        let sjis = Charset::from_label("Shift_JIS").unwrap();
        let out = convert_bytes(jis, sjis, Charset::Iso2022Jp).unwrap();
        assert_eq!(out, vec![0x81, 0x60]);
    }

    #[test]
    fn test_legacy_single_byte() {
        let latin1 = Charset::from_label("iso-8859-15").unwrap();
        let out = convert_bytes("€".as_bytes(), latin1, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0xA4]);
        assert!(convert_bytes("日".as_bytes(), latin1, Charset::Utf8)
            .unwrap_err()
            .is_unmappable());
    }

    #[test]
    fn test_euc_jp() {
        let euc = Charset::from_label("EUC-JP").unwrap();
        let out = convert_bytes("日本".as_bytes(), euc, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0xC6, 0xFC, 0xCB, 0xDC]);
    }

    #[test]
    fn test_utf16() {
        let out = convert_bytes("Aあ".as_bytes(), Charset::Utf16Be, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0x00, 0x41, 0x30, 0x42]);
        let out = convert_bytes("Aあ".as_bytes(), Charset::Utf16Le, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0x41, 0x00, 0x42, 0x30]);
        let back = convert_bytes(&out, Charset::Utf8, Charset::Utf16Le).unwrap();
        assert_eq!(back, "Aあ".as_bytes());
    }

    #[test]
    fn test_same_charset_is_identity() {
        let out = convert_bytes(b"\xff", Charset::Utf8, Charset::Utf8).unwrap();
        assert_eq!(out, vec![0xFF]);
    }

    #[test]
    fn test_convert_list_keeps_order() {
        let value = HeaderValue::from(vec!["あ", "b", "う"]);
        let out = convert(&value, Charset::Iso2022Jp, Charset::Utf8).unwrap();
        assert_eq!(
            out,
            HeaderValue::Multi(vec![
                b"\x1b$B$\"\x1b(B".to_vec(),
                b"b".to_vec(),
                b"\x1b$B$&\x1b(B".to_vec(),
            ])
        );
    }

    #[test]
    fn test_convert_list_fails_as_a_whole() {
        let value = HeaderValue::from(vec!["ok", "①"]);
        assert!(convert(&value, Charset::Iso2022Jp, Charset::Utf8).is_err());
    }

    #[test]
    fn test_transcoder_default_source() {
        let transcoder = Transcoder::default();
        assert_eq!(transcoder.default_source(), Charset::Utf8);

        let value = HeaderValue::from("こんにちは");
        let out = transcoder.convert(&value, "ISO-2022-JP", None).unwrap();
        assert_eq!(out, HeaderValue::from(&b"\x1b$B$3$s$K$A$O\x1b(B"[..]));
        let out = transcoder.convert(&value, "ISO-2022-JP", Some("")).unwrap();
        assert_eq!(out, HeaderValue::from(&b"\x1b$B$3$s$K$A$O\x1b(B"[..]));

        let transcoder = Transcoder::new(Charset::Iso2022Jp);
        let back = transcoder.convert(&out, "UTF-8", None).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_transcoder_unknown_names() {
        let transcoder = Transcoder::default();
        let value = HeaderValue::from("x");
        assert!(matches!(
            transcoder.convert(&value, "x-unknown", None),
            Err(Error::UnsupportedCharset(_))
        ));
        assert!(matches!(
            transcoder.convert(&value, "UTF-8", Some("x-unknown")),
            Err(Error::UnsupportedCharset(_))
        ));
    }
}
