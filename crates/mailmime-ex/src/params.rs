//! Message parameters and flowed-format options.
//!
//! Parameters configure how a message is encoded: a transfer encoding and a
//! charset for each of the header block, the plain-text body and the HTML
//! body. They are addressed by their conventional names (`head_charset`,
//! `text_encoding`, ...) and validated when set.

use std::fmt;
use std::str::FromStr;

use crate::charset::Charset;
use crate::error::{Error, Result};

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[cfg_attr(feature = "serde", serde(rename = "7bit"))]
    SevenBit,
    /// 8-bit text.
    #[cfg_attr(feature = "serde", serde(rename = "8bit"))]
    EightBit,
    /// Base64 encoding.
    #[cfg_attr(feature = "serde", serde(rename = "base64"))]
    Base64,
    /// Quoted-Printable encoding.
    #[cfg_attr(feature = "serde", serde(rename = "quoted-printable"))]
    QuotedPrintable,
}

impl FromStr for TransferEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" => Ok(Self::SevenBit),
            "8bit" => Ok(Self::EightBit),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            _ => Err(Error::InvalidEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// A charset declaration such as `US-ASCII; format=flowed`.
///
/// The base name must resolve to a supported [`Charset`]; trailing
/// `key=value` parameters are kept in order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct CharsetParam {
    name: String,
    charset: Charset,
    parameters: Vec<(String, String)>,
}

impl CharsetParam {
    /// Parses a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] if the base name is empty or
    /// unknown.
    pub fn new(value: &str) -> Result<Self> {
        let mut parts = value.split(';');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(Error::UnsupportedCharset(value.to_string()));
        }
        let charset = Charset::from_label(name)?;

        let parameters = parts
            .filter_map(|param| param.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().trim_matches('"').to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Ok(Self {
            name: name.to_string(),
            charset,
            parameters,
        })
    }

    /// Parses a parameter value; a blank value means "not set".
    ///
    /// # Errors
    ///
    /// Same as [`CharsetParam::new`].
    pub fn parse(value: &str) -> Result<Option<Self>> {
        if value.trim().is_empty() {
            return Ok(None);
        }
        Self::new(value).map(Some)
    }

    /// Declares `charset` under its canonical name.
    #[must_use]
    pub fn from_charset(charset: Charset) -> Self {
        Self {
            name: charset.name().to_string(),
            charset,
            parameters: Vec::new(),
        }
    }

    /// Base charset name as written, without parameters.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved charset.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Trailing parameters in order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a trailing parameter, matching the key regardless of case.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a trailing parameter, replacing an existing one of the same key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some((_, slot)) => *slot = value,
            None => self.parameters.push((key, value)),
        }
        self
    }
}

impl FromStr for CharsetParam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CharsetParam {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<CharsetParam> for String {
    fn from(param: CharsetParam) -> Self {
        param.to_string()
    }
}

impl fmt::Display for CharsetParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.parameters {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

/// Names of the message parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// `head_encoding`
    HeadEncoding,
    /// `head_charset`
    HeadCharset,
    /// `text_encoding`
    TextEncoding,
    /// `text_charset`
    TextCharset,
    /// `html_encoding`
    HtmlEncoding,
    /// `html_charset`
    HtmlCharset,
}

impl Param {
    /// Conventional parameter name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeadEncoding => "head_encoding",
            Self::HeadCharset => "head_charset",
            Self::TextEncoding => "text_encoding",
            Self::TextCharset => "text_charset",
            Self::HtmlEncoding => "html_encoding",
            Self::HtmlCharset => "html_charset",
        }
    }
}

impl FromStr for Param {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "head_encoding" => Ok(Self::HeadEncoding),
            "head_charset" => Ok(Self::HeadCharset),
            "text_encoding" => Ok(Self::TextEncoding),
            "text_charset" => Ok(Self::TextCharset),
            "html_encoding" => Ok(Self::HtmlEncoding),
            "html_charset" => Ok(Self::HtmlCharset),
            _ => Err(Error::UnknownParam(s.to_string())),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding parameters of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    /// Encoded-word encoding for headers; `base64` selects "B", anything
    /// else "Q".
    pub head_encoding: TransferEncoding,
    /// Charset of the raw header values.
    pub head_charset: Option<CharsetParam>,
    /// Transfer encoding of the plain-text body.
    pub text_encoding: TransferEncoding,
    /// Charset of the plain-text body, serialized into `Content-Type`.
    pub text_charset: Option<CharsetParam>,
    /// Transfer encoding of an HTML body.
    pub html_encoding: TransferEncoding,
    /// Charset of an HTML body.
    pub html_charset: Option<CharsetParam>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            head_encoding: TransferEncoding::QuotedPrintable,
            head_charset: Some(CharsetParam::from_charset(Charset::Utf8)),
            text_encoding: TransferEncoding::EightBit,
            text_charset: Some(CharsetParam::from_charset(Charset::Utf8)),
            html_encoding: TransferEncoding::QuotedPrintable,
            html_charset: Some(CharsetParam::from_charset(Charset::Utf8)),
        }
    }
}

impl Params {
    /// Sets a parameter from its textual value. The value is validated
    /// before anything is changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] or [`Error::UnsupportedCharset`]
    /// if the value does not fit the parameter.
    pub fn set(&mut self, param: Param, value: &str) -> Result<()> {
        match param {
            Param::HeadEncoding => self.head_encoding = value.parse()?,
            Param::TextEncoding => self.text_encoding = value.parse()?,
            Param::HtmlEncoding => self.html_encoding = value.parse()?,
            Param::HeadCharset => self.head_charset = CharsetParam::parse(value)?,
            Param::TextCharset => self.text_charset = CharsetParam::parse(value)?,
            Param::HtmlCharset => self.html_charset = CharsetParam::parse(value)?,
        }
        Ok(())
    }

    /// Returns a parameter in its textual form.
    #[must_use]
    pub fn get(&self, param: Param) -> Option<String> {
        match param {
            Param::HeadEncoding => Some(self.head_encoding.to_string()),
            Param::TextEncoding => Some(self.text_encoding.to_string()),
            Param::HtmlEncoding => Some(self.html_encoding.to_string()),
            Param::HeadCharset => self.head_charset.as_ref().map(ToString::to_string),
            Param::TextCharset => self.text_charset.as_ref().map(ToString::to_string),
            Param::HtmlCharset => self.html_charset.as_ref().map(ToString::to_string),
        }
    }
}

/// Names of the message options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    /// `format`, RFC 3676.
    Format,
    /// `delsp`, RFC 3676.
    DelSp,
}

impl FromStr for OptionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "format" => Ok(Self::Format),
            "delsp" => Ok(Self::DelSp),
            _ => Err(Error::UnknownOption(s.to_string())),
        }
    }
}

/// RFC 3676 options taken from the `Content-Type` a message was built with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowedOptions {
    format: Option<String>,
    delsp: Option<String>,
}

impl FlowedOptions {
    /// Reads `format=flowed` and, only then, `delsp=yes` from a
    /// `Content-Type` value. Anything else leaves the options unset.
    #[must_use]
    pub fn from_content_type(value: &str) -> Self {
        let mut options = Self::default();
        if find_token(value, "format").is_some_and(|t| t.eq_ignore_ascii_case("flowed")) {
            options.format = Some("flowed".to_string());
            if find_token(value, "delsp").is_some_and(|t| t.eq_ignore_ascii_case("yes")) {
                options.delsp = Some("yes".to_string());
            }
        }
        options
    }

    /// Returns an option value.
    #[must_use]
    pub fn get(&self, name: OptionName) -> Option<&str> {
        match name {
            OptionName::Format => self.format.as_deref(),
            OptionName::DelSp => self.delsp.as_deref(),
        }
    }

    /// Sets or clears an option.
    pub fn set(&mut self, name: OptionName, value: Option<String>) {
        match name {
            OptionName::Format => self.format = value,
            OptionName::DelSp => self.delsp = value,
        }
    }

    /// The `format` option.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The `delsp` option.
    #[must_use]
    pub fn delsp(&self) -> Option<&str> {
        self.delsp.as_deref()
    }

    /// Adds `format` and, when `format` is set, `delsp` to a charset
    /// declaration.
    #[must_use]
    pub fn apply_to(&self, param: CharsetParam) -> CharsetParam {
        let Some(format) = &self.format else {
            return param;
        };
        let param = param.with_parameter("format", format.as_str());
        match &self.delsp {
            Some(delsp) => param.with_parameter("delsp", delsp.as_str()),
            None => param,
        }
    }
}

/// Finds the first `key=<word>` in `value`, ignoring case in the key, and
/// returns the word (ASCII alphanumerics and `_`).
fn find_token<'a>(value: &'a str, key: &str) -> Option<&'a str> {
    let lower = value.to_ascii_lowercase();
    let needle = format!("{}=", key.to_ascii_lowercase());

    lower.match_indices(&needle).find_map(|(index, _)| {
        let start = index + needle.len();
        let len = value[start..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        (len > 0).then(|| &value[start..start + len])
    })
}
