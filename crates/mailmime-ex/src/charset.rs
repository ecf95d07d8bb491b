//! Charset names.
//!
//! `encoding_rs` follows the WHATWG Encoding Standard, which folds `US-ASCII`
//! into `windows-1252` and has no notion of the Microsoft ISO-2022-JP
//! variant. Mail needs both, so names are resolved to our own [`Charset`]
//! first and only fall through to `encoding_rs` labels for everything else.

use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// A character encoding a header value or body can be converted to or from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// Strict 7-bit `US-ASCII`.
    UsAscii,
    /// `UTF-8`.
    Utf8,
    /// `UTF-16BE`, no byte order mark.
    Utf16Be,
    /// `UTF-16LE`, no byte order mark.
    Utf16Le,
    /// `ISO-2022-JP` limited to JIS X 0201 Roman and JIS X 0208.
    Iso2022Jp,
    /// `ISO-2022-JP-MS`: ISO-2022-JP framing over the CP932 repertoire
    /// (NEC special row 13, NEC-selected IBM extensions, half-width katakana).
    Iso2022JpMs,
    /// `CP932` / `Windows-31J`, the Microsoft Shift_JIS.
    Cp932,
    /// Any other encoding known to `encoding_rs` (EUC-JP, ISO-8859-x, ...).
    Legacy(&'static Encoding),
}

impl Charset {
    /// Resolves a charset name, ignoring ASCII case and surrounding
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] if the name is unknown.
    pub fn from_label(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        let charset = match trimmed.to_ascii_lowercase().as_str() {
            "us-ascii" | "ascii" | "ansi_x3.4-1968" | "iso646-us" | "csascii" => Self::UsAscii,
            "utf-8" | "utf8" => Self::Utf8,
            "utf-16be" | "utf-16" => Self::Utf16Be,
            "utf-16le" => Self::Utf16Le,
            "iso-2022-jp" | "csiso2022jp" | "jis" => Self::Iso2022Jp,
            "iso-2022-jp-ms" => Self::Iso2022JpMs,
            "cp932" | "windows-31j" | "ms932" | "sjis-win" | "sjis-ms" => Self::Cp932,
            other => match Encoding::for_label_no_replacement(other.as_bytes()) {
                Some(encoding) if encoding == encoding_rs::UTF_8 => Self::Utf8,
                Some(encoding) if encoding == encoding_rs::UTF_16BE => Self::Utf16Be,
                Some(encoding) if encoding == encoding_rs::UTF_16LE => Self::Utf16Le,
                Some(encoding) if encoding == encoding_rs::ISO_2022_JP => Self::Iso2022Jp,
                Some(encoding) => Self::Legacy(encoding),
                None => return Err(Error::UnsupportedCharset(trimmed.to_string())),
            },
        };
        Ok(charset)
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UsAscii => "US-ASCII",
            Self::Utf8 => "UTF-8",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Iso2022Jp => "ISO-2022-JP",
            Self::Iso2022JpMs => "ISO-2022-JP-MS",
            Self::Cp932 => "CP932",
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    /// Returns `true` for the escape-sequence driven ISO-2022-JP family.
    #[must_use]
    pub const fn is_stateful(self) -> bool {
        matches!(self, Self::Iso2022Jp | Self::Iso2022JpMs)
    }

    /// Returns `true` when bytes below 0x80 always stand for ASCII, so CR
    /// and LF bytes are line breaks.
    #[must_use]
    pub const fn is_ascii_compatible(self) -> bool {
        !matches!(self, Self::Utf16Be | Self::Utf16Le)
    }

    /// The `encoding_rs` decoder able to find character boundaries for
    /// stateless multi-byte charsets.
    pub(crate) fn stateless_encoding(self) -> Option<&'static Encoding> {
        match self {
            Self::Utf8 => Some(encoding_rs::UTF_8),
            Self::Utf16Be => Some(encoding_rs::UTF_16BE),
            Self::Utf16Le => Some(encoding_rs::UTF_16LE),
            Self::Cp932 => Some(encoding_rs::SHIFT_JIS),
            Self::Legacy(encoding) => Some(encoding),
            Self::UsAscii | Self::Iso2022Jp | Self::Iso2022JpMs => None,
        }
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
