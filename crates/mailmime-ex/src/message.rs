//! Single-part `text/plain` MIME message with charset conversion.

use tracing::debug;

use crate::charset::Charset;
use crate::content_type::ContentType;
use crate::encoding::encode_body;
use crate::error::Result;
use crate::header::{EncodedHeaders, HeaderValue, Headers};
use crate::header_encoder::HeaderEncoder;
use crate::params::{CharsetParam, FlowedOptions, OptionName, Param, Params};
use crate::transcode;

/// Charset reported when no charset parameter is set.
const DEFAULT_CHARSET: &str = "US-ASCII";

/// Fields derived from the parameters. Values the caller supplies are kept
/// until a parameter or option changes.
const CONTENT_HEADERS: [&str; 3] = ["MIME-Version", "Content-Type", "Content-Transfer-Encoding"];

/// A MIME message with raw headers, a plain text body, its parameters and
/// the RFC 3676 options it was built with.
///
/// Raw header values are held in the header charset and the body in the
/// text charset. The charset update operations keep both in step with the
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    headers: Headers,
    params: Params,
    options: FlowedOptions,
    body: Vec<u8>,
}

impl MimeMessage {
    /// Creates a message with the default parameters.
    ///
    /// `format`/`delsp` are read from the `Content-Type` in `headers`.
    #[must_use]
    pub fn new(headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        crate::MessageBuilder::new().headers(headers).text_body(body).build()
    }

    pub(crate) fn assemble(headers: Headers, body: Vec<u8>, params: Params, options: FlowedOptions) -> Self {
        let mut message = Self {
            headers: Headers::new(),
            params,
            options,
            body,
        };
        message.install_headers(headers);
        message
    }

    /// Returns the headers with every value RFC 2047 encoded under the
    /// current `head_encoding` and `head_charset`.
    #[must_use]
    pub fn headers(&self) -> EncodedHeaders {
        let charset = self
            .params
            .head_charset
            .as_ref()
            .map_or(Charset::UsAscii, CharsetParam::charset);
        let encoder = HeaderEncoder::new(self.header_charset(), charset, self.params.head_encoding);

        self.headers
            .iter()
            .map(|(name, value)| (name, encoder.encode(name, value)))
            .collect()
    }

    /// Returns the stored header values, unencoded.
    #[must_use]
    pub const fn raw_headers(&self) -> &Headers {
        &self.headers
    }

    /// Replaces all headers and returns their encoded form.
    pub fn set_headers(&mut self, headers: Headers) -> EncodedHeaders {
        self.install_headers(headers);
        self.headers()
    }

    /// The body as stored, in the text charset.
    #[must_use]
    pub fn text_body(&self) -> &[u8] {
        &self.body
    }

    /// Replaces the body. The bytes are stored as given.
    pub fn set_text_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Returns an option value; unknown names are never set.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&str> {
        name.parse().ok().and_then(|name| self.options.get(name))
    }

    /// Sets or clears an option.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownOption`] for names other than `format` and
    /// `delsp`.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let name: OptionName = name.parse()?;
        self.options.set(name, value.map(str::to_string));
        self.refresh_content_headers();
        Ok(())
    }

    /// Sets a parameter from its textual value.
    ///
    /// Setting a charset does not convert anything; use
    /// [`MimeMessage::update_header_charset`] or
    /// [`MimeMessage::update_text_charset`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownParam`], [`crate::Error::InvalidEncoding`] or
    /// [`crate::Error::UnsupportedCharset`]; the message is unchanged.
    pub fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        let param: Param = name.parse()?;
        self.params.set(param, value)?;
        self.refresh_content_headers();
        Ok(())
    }

    /// Returns a parameter in its textual form, `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownParam`] for unknown names.
    pub fn param(&self, name: &str) -> Result<Option<String>> {
        let param: Param = name.parse()?;
        Ok(self.params.get(param))
    }

    /// The typed parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Base name of the header charset, `US-ASCII` when unset.
    #[must_use]
    pub fn header_charset(&self) -> &str {
        self.params.head_charset.as_ref().map_or(DEFAULT_CHARSET, CharsetParam::name)
    }

    /// Base name of the text charset, `US-ASCII` when unset.
    #[must_use]
    pub fn text_charset(&self) -> &str {
        self.params.text_charset.as_ref().map_or(DEFAULT_CHARSET, CharsetParam::name)
    }

    /// Converts every raw header value from the current header charset to
    /// `new_charset` and records `new_charset` as the header charset.
    ///
    /// Does nothing when the charsets are equal.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedCharset`] or [`crate::Error::Transcoding`]; the
    /// message is unchanged.
    pub fn update_header_charset(&mut self, new_charset: &str) -> Result<()> {
        let current = self.header_charset().to_string();
        self.update_header_charset_from(new_charset, &current)
    }

    /// Like [`MimeMessage::update_header_charset`], reading the stored
    /// values as `current_charset` instead of the header charset.
    ///
    /// # Errors
    ///
    /// Same as [`MimeMessage::update_header_charset`].
    pub fn update_header_charset_from(&mut self, new_charset: &str, current_charset: &str) -> Result<()> {
        if same_charset(new_charset, current_charset) {
            return Ok(());
        }
        let param = CharsetParam::new(new_charset)?;
        let from = CharsetParam::new(current_charset)?.charset();

        let mut converted = Headers::new();
        let mut changed = 0;
        for (name, value) in self.headers.iter() {
            if is_content_header(name) {
                converted.insert(name, value.clone());
                continue;
            }
            let new_value = transcode::convert(value, param.charset(), from)?;
            if new_value != *value {
                changed += 1;
            }
            converted.insert(name, new_value);
        }

        debug!(
            from = current_charset,
            to = param.name(),
            changed,
            "updated header charset"
        );
        self.params.head_charset = Some(param);
        if changed > 0 {
            self.install_headers(converted);
        }
        Ok(())
    }

    /// Converts the body from the current text charset to `new_charset`.
    ///
    /// The new charset declaration carries `format` and `delsp` from the
    /// options. Does nothing when the charsets are equal.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedCharset`] or [`crate::Error::Transcoding`]; the
    /// message is unchanged.
    pub fn update_text_charset(&mut self, new_charset: &str) -> Result<()> {
        let current = self.text_charset().to_string();
        self.update_text_charset_from(new_charset, &current)
    }

    /// Like [`MimeMessage::update_text_charset`], reading the body as
    /// `current_charset` instead of the text charset.
    ///
    /// # Errors
    ///
    /// Same as [`MimeMessage::update_text_charset`].
    pub fn update_text_charset_from(&mut self, new_charset: &str, current_charset: &str) -> Result<()> {
        if same_charset(new_charset, current_charset) {
            return Ok(());
        }
        let param = self.options.apply_to(CharsetParam::new(new_charset)?);
        let from = CharsetParam::new(current_charset)?.charset();
        let body = transcode::convert_bytes(&self.body, param.charset(), from)?;

        debug!(
            from = current_charset,
            to = %param,
            bytes = body.len(),
            "updated text charset"
        );
        self.params.text_charset = Some(param);
        self.body = body;
        self.refresh_content_headers();
        Ok(())
    }

    /// The body with the text transfer encoding applied.
    #[must_use]
    pub fn encoded_body(&self) -> Vec<u8> {
        let charset = self
            .params
            .text_charset
            .as_ref()
            .map_or(Charset::UsAscii, CharsetParam::charset);
        encode_body(&self.body, self.params.text_encoding, charset)
    }

    /// Serializes the message: encoded headers, a blank line, then the
    /// encoded body.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut out = self.headers().to_string().into_bytes();
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.encoded_body());
        out
    }

    /// Stores `headers` as given, adding the derived content headers the
    /// caller did not supply in front of them.
    fn install_headers(&mut self, headers: Headers) {
        self.headers = Headers::new();
        for (name, value) in self.content_headers() {
            if headers.get_ignore_case(name).is_none() {
                self.headers.insert(name, value);
            }
        }
        self.headers.extend(headers);
    }

    fn refresh_content_headers(&mut self) {
        for (name, value) in self.content_headers() {
            self.headers.insert_ignore_case(name, value);
        }
    }

    fn content_headers(&self) -> [(&'static str, HeaderValue); 3] {
        let content_type = ContentType::text_plain(self.params.text_charset.as_ref(), &self.options);
        let [version, kind, encoding] = CONTENT_HEADERS;
        [
            (version, HeaderValue::from("1.0")),
            (kind, HeaderValue::from(content_type.to_string())),
            (encoding, HeaderValue::from(self.params.text_encoding.to_string())),
        ]
    }
}

fn is_content_header(name: &str) -> bool {
    CONTENT_HEADERS.iter().any(|header| header.eq_ignore_ascii_case(name))
}

/// Compares base charset names, ignoring ASCII case and parameters.
fn same_charset(a: &str, b: &str) -> bool {
    let base = |s: &str| s.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    base(a) == base(b)
}

impl From<MimeMessage> for Vec<u8> {
    fn from(message: MimeMessage) -> Self {
        message.render()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::error::{Error, TranscodeError};

    fn message(subject: &str, body: &str) -> MimeMessage {
        let mut headers = Headers::new();
        headers.insert("Subject", subject);
        MimeMessage::new(headers, body)
    }

    #[test]
    fn test_defaults() {
        let msg = message("Hi", "Hello");
        assert_eq!(msg.header_charset(), "UTF-8");
        assert_eq!(msg.text_charset(), "UTF-8");
        assert_eq!(msg.param("text_encoding").unwrap().as_deref(), Some("8bit"));
        assert_eq!(msg.param("head_encoding").unwrap().as_deref(), Some("quoted-printable"));
        assert_eq!(msg.option("format"), None);
        assert_eq!(msg.text_body(), b"Hello");
    }

    #[test]
    fn test_content_headers_are_derived() {
        let msg = message("Hi", "Hello");
        let raw = msg.raw_headers();
        let names: Vec<_> = raw.names().collect();
        assert_eq!(names, ["MIME-Version", "Content-Type", "Content-Transfer-Encoding", "Subject"]);
        assert_eq!(raw.get("Content-Type").unwrap(), &"text/plain; charset=UTF-8");
        assert_eq!(raw.get("Content-Transfer-Encoding").unwrap(), &"8bit");
    }

    #[test]
    fn test_caller_content_headers_are_kept() {
        let mut headers = Headers::new();
        headers.insert("Subject", "Hi");
        headers.insert("content-type", "text/plain; charset=US-ASCII; format=flowed");
        headers.insert("Content-Transfer-Encoding", "7bit");
        let mut msg = MimeMessage::new(headers, "");

        let names: Vec<_> = msg.raw_headers().names().collect();
        assert_eq!(names, ["MIME-Version", "Subject", "content-type", "Content-Transfer-Encoding"]);
        assert_eq!(
            msg.raw_headers().get("content-type").unwrap(),
            &"text/plain; charset=US-ASCII; format=flowed"
        );
        assert_eq!(msg.raw_headers().get("Content-Transfer-Encoding").unwrap(), &"7bit");

        // Converting the headers leaves the caller's content headers alone.
        msg.update_header_charset("ISO-2022-JP").unwrap();
        assert_eq!(msg.raw_headers().get("Content-Transfer-Encoding").unwrap(), &"7bit");

        msg.set_param("text_encoding", "base64").unwrap();
        let raw = msg.raw_headers();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw.get("Content-Transfer-Encoding").unwrap(), &"base64");
        assert_eq!(
            raw.get("content-type").unwrap(),
            &"text/plain; charset=UTF-8; format=flowed"
        );
    }

    #[test]
    fn test_set_headers_keeps_caller_content_type() {
        let mut msg = MimeMessage::new(Headers::new(), "");
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain; charset=ISO-2022-JP");
        let encoded = msg.set_headers(headers);

        assert_eq!(encoded.get("Content-Type").unwrap(), &"text/plain; charset=ISO-2022-JP");
        assert_eq!(msg.raw_headers().get("Content-Transfer-Encoding").unwrap(), &"8bit");
        assert_eq!(msg.raw_headers().get("MIME-Version").unwrap(), &"1.0");
    }

    #[test]
    fn test_charset_accessors_strip_parameters() {
        let mut msg = message("Hi", "");
        msg.set_param("head_charset", "UTF-8; some=thing").unwrap();
        assert_eq!(msg.header_charset(), "UTF-8");

        msg.set_param("text_charset", "").unwrap();
        assert_eq!(msg.text_charset(), "US-ASCII");
        assert_eq!(msg.param("text_charset").unwrap(), None);
    }

    #[test]
    fn test_set_param_rejects_bad_values() {
        let mut msg = message("Hi", "");
        let before = msg.clone();

        assert!(matches!(msg.set_param("subject_charset", "UTF-8"), Err(Error::UnknownParam(_))));
        assert!(matches!(msg.set_param("text_encoding", "uuencode"), Err(Error::InvalidEncoding(_))));
        assert!(matches!(msg.set_param("text_charset", "klingon"), Err(Error::UnsupportedCharset(_))));
        assert!(matches!(msg.param("nope"), Err(Error::UnknownParam(_))));
        assert_eq!(msg, before);
    }

    #[test]
    fn test_set_param_refreshes_content_headers() {
        let mut msg = message("Hi", "");
        msg.set_param("text_encoding", "base64").unwrap();
        assert_eq!(msg.raw_headers().get("Content-Transfer-Encoding").unwrap(), &"base64");
    }

    #[test]
    fn test_set_option() {
        let mut msg = message("Hi", "");
        msg.set_option("format", Some("flowed")).unwrap();
        msg.set_option("delsp", Some("yes")).unwrap();
        assert_eq!(msg.option("format"), Some("flowed"));
        assert_eq!(
            msg.raw_headers().get("Content-Type").unwrap(),
            &"text/plain; charset=UTF-8; format=flowed; delsp=yes"
        );

        msg.set_option("format", None).unwrap();
        assert_eq!(msg.option("format"), None);
        assert!(matches!(msg.set_option("wrap", Some("72")), Err(Error::UnknownOption(_))));
        assert_eq!(msg.option("wrap"), None);
    }

    #[test]
    fn test_update_header_charset_same_is_noop() {
        let mut msg = message("テスト", "");
        let before = msg.clone();
        msg.update_header_charset("utf-8").unwrap();
        assert_eq!(msg, before);
    }

    #[test]
    fn test_update_header_charset_failure_keeps_message() {
        let mut msg = message("①", "");
        let before = msg.clone();
        let err = msg.update_header_charset("ISO-2022-JP").unwrap_err();
        assert!(err.is_unmappable());
        assert!(matches!(
            err,
            Error::Transcoding(TranscodeError::Unmappable { ch: '①', .. })
        ));
        assert_eq!(msg, before);
    }

    #[test]
    fn test_update_header_charset_unknown_keeps_message() {
        let mut msg = message("件名", "");
        let before = msg.clone();
        assert!(matches!(
            msg.update_header_charset("x-no-such-charset"),
            Err(Error::UnsupportedCharset(name)) if name == "x-no-such-charset"
        ));
        assert!(matches!(
            msg.update_header_charset_from("ISO-2022-JP", "x-no-such-charset"),
            Err(Error::UnsupportedCharset(_))
        ));
        assert_eq!(msg, before);
    }

    #[test]
    fn test_update_header_charset_ascii_only() {
        let mut msg = message("Hello", "");
        msg.update_header_charset("ISO-2022-JP").unwrap();
        assert_eq!(msg.header_charset(), "ISO-2022-JP");
        assert_eq!(msg.raw_headers().get("Subject").unwrap(), &"Hello");
    }

    #[test]
    fn test_update_header_charset_multi_value() {
        let mut headers = Headers::new();
        headers.insert("Comments", vec!["あ", "い"]);
        let mut msg = MimeMessage::new(headers, "");
        msg.update_header_charset("EUC-JP").unwrap();

        let value = msg.raw_headers().get("Comments").unwrap();
        let values: Vec<&[u8]> = value.values().collect();
        assert_eq!(values, [&[0xA4u8, 0xA2][..], &[0xA4, 0xA4]]);
    }

    #[test]
    fn test_update_header_charset_from_explicit_source() {
        let mut headers = Headers::new();
        headers.insert("Subject", vec![0x82u8, 0xA0]);
        let mut msg = MimeMessage::new(headers, "");
        msg.update_header_charset_from("UTF-8; x=y", "Shift_JIS").unwrap();
        assert_eq!(msg.raw_headers().get("Subject").unwrap(), &"あ");
        assert_eq!(msg.param("head_charset").unwrap().as_deref(), Some("UTF-8; x=y"));
    }

    #[test]
    fn test_update_text_charset_keeps_flowed() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain; charset=UTF-8; Format=Flowed; DelSp=Yes");
        let mut msg = MimeMessage::new(headers, "こんにちは");
        msg.update_text_charset("ISO-2022-JP").unwrap();

        assert_eq!(msg.text_charset(), "ISO-2022-JP");
        assert_eq!(
            msg.param("text_charset").unwrap().as_deref(),
            Some("ISO-2022-JP; format=flowed; delsp=yes")
        );
        assert_eq!(
            msg.raw_headers().get("Content-Type").unwrap(),
            &"text/plain; charset=ISO-2022-JP; format=flowed; delsp=yes"
        );
        assert_eq!(msg.text_body(), b"\x1b$B$3$s$K$A$O\x1b(B");
    }

    #[test]
    fn test_update_text_charset_failure_keeps_message() {
        let mut msg = message("Hi", "本文①");
        let before = msg.clone();
        assert!(msg.update_text_charset("ISO-2022-JP").is_err());
        assert!(matches!(
            msg.update_text_charset("x-unknown"),
            Err(Error::UnsupportedCharset(_))
        ));
        assert_eq!(msg, before);
    }

    #[test]
    fn test_encoded_headers() {
        let msg = message("Grüße", "");
        let encoded = msg.headers();
        assert_eq!(encoded.get("Subject").unwrap(), &"=?UTF-8?Q?Gr=C3=BC=C3=9Fe?=");
        assert_eq!(encoded.get("MIME-Version").unwrap(), &"1.0");
    }

    #[test]
    fn test_encoded_body_utf16_keeps_code_units() {
        let mut msg = message("Hi", "\u{0A0D}\n");
        msg.update_text_charset("UTF-16BE").unwrap();
        assert_eq!(msg.text_body(), &[0x0A, 0x0D, 0x00, 0x0A]);
        assert_eq!(msg.encoded_body(), vec![0x0A, 0x0D, 0x00, 0x0A]);

        msg.set_param("text_encoding", "quoted-printable").unwrap();
        assert_eq!(msg.encoded_body(), b"=0A=0D=00=0A".to_vec());
    }

    #[test]
    fn test_render() {
        let mut msg = message("Hi", "line one\nline two");
        msg.set_param("text_encoding", "quoted-printable").unwrap();
        let rendered = String::from_utf8(msg.render()).unwrap();
        assert_eq!(
            rendered,
            "MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=UTF-8\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\
             Subject: Hi\r\n\
             \r\n\
             line one\r\nline two"
        );
    }
}
