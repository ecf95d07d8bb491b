//! MIME content type handling.

use std::fmt;

use crate::params::{CharsetParam, FlowedOptions};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in output order (e.g., charset, format, delsp).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates the `text/plain` type of a message body.
    ///
    /// The charset declaration is written first, followed by its own
    /// parameters; `format`/`delsp` from `options` fill in whatever the
    /// declaration does not already carry. A missing declaration means
    /// `US-ASCII`.
    #[must_use]
    pub fn text_plain(charset: Option<&CharsetParam>, options: &FlowedOptions) -> Self {
        let charset = options.apply_to(charset.map_or_else(
            || CharsetParam::from_charset(crate::Charset::UsAscii),
            Clone::clone,
        ));

        let mut ct = Self::new("text", "plain").with_parameter("charset", charset.name());
        for (key, value) in charset.parameters() {
            ct = ct.with_parameter(key, value);
        }
        ct
    }

    /// Adds a parameter, replacing an existing one with the same name.
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

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns a parameter by name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}
