//! Message builder.

use crate::header::{HeaderValue, Headers};
use crate::message::MimeMessage;
use crate::params::{FlowedOptions, Params};

/// Builder for [`MimeMessage`].
///
/// Starts from the default parameters: quoted-printable headers, 8bit text,
/// quoted-printable HTML, and UTF-8 everywhere.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: Headers,
    body: Vec<u8>,
    params: Params,
}

impl MessageBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header field, replacing a field of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds all fields of `headers`.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the From field.
    #[must_use]
    pub fn from(self, from: impl Into<HeaderValue>) -> Self {
        self.header("From", from)
    }

    /// Sets the To field.
    #[must_use]
    pub fn to(self, to: impl Into<HeaderValue>) -> Self {
        self.header("To", to)
    }

    /// Sets the Subject field.
    #[must_use]
    pub fn subject(self, subject: impl Into<HeaderValue>) -> Self {
        self.header("Subject", subject)
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the default parameters.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Builds the message.
    ///
    /// `format=flowed` and `delsp=yes` are taken from the `Content-Type`
    /// field, if any. A missing or unreadable `Content-Type` leaves both
    /// unset.
    #[must_use]
    pub fn build(self) -> MimeMessage {
        let options = self
            .headers
            .get_ignore_case("Content-Type")
            .and_then(HeaderValue::first)
            .map(|value| FlowedOptions::from_content_type(&String::from_utf8_lossy(value)))
            .unwrap_or_default();

        MimeMessage::assemble(self.headers, self.body, self.params, options)
    }
}
