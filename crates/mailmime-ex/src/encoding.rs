//! MIME transfer encodings for message bodies.
//!
//! Supports Base64 and Quoted-Printable (RFC 2045); 7bit and 8bit bodies only
//! get their line endings normalized.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

use crate::charset::Charset;
use crate::params::TransferEncoding;

/// Maximum line length for encoded body lines, excluding CRLF.
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped into CRLF-terminated lines.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        // Base64 output is ASCII.
        result.extend(line.iter().copied().map(char::from));
        result.push_str("\r\n");
    }
    result
}

/// Encodes data using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input become CRLF hard breaks; long lines get `=`
/// soft breaks. Whitespace at the end of a line is always encoded.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3 / 2);

    for (index, line) in lines(data).enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        push_quoted_printable_line(&mut result, line);
    }

    result
}

/// Quoted-Printable for data whose CR and LF bytes are not line breaks,
/// such as UTF-16 text. Every CR and LF byte is escaped.
#[must_use]
pub fn encode_quoted_printable_binary(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3);
    push_quoted_printable_line(&mut result, data);
    result
}

fn push_quoted_printable_line(result: &mut String, line: &[u8]) {
    let mut line_length = 0;
    for (pos, &byte) in line.iter().enumerate() {
        let last = pos + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Check if we need soft line break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Rewrites bare CR and bare LF as CRLF.
#[must_use]
pub fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() + data.len() / 32);
    for (index, line) in lines(data).enumerate() {
        if index > 0 {
            result.extend_from_slice(b"\r\n");
        }
        result.extend_from_slice(line);
    }
    result
}

/// Applies a transfer encoding to a body held in `charset`.
///
/// Line endings are only rewritten when `charset` keeps ASCII bytes
/// meaning ASCII; UTF-16 bodies pass through untouched.
#[must_use]
pub fn encode_body(data: &[u8], encoding: TransferEncoding, charset: Charset) -> Vec<u8> {
    let text_lines = charset.is_ascii_compatible();
    match encoding {
        TransferEncoding::SevenBit | TransferEncoding::EightBit if text_lines => normalize_line_endings(data),
        TransferEncoding::SevenBit | TransferEncoding::EightBit => data.to_vec(),
        TransferEncoding::Base64 => encode_base64_lines(data).into_bytes(),
        TransferEncoding::QuotedPrintable if text_lines => encode_quoted_printable(data).into_bytes(),
        TransferEncoding::QuotedPrintable => encode_quoted_printable_binary(data).into_bytes(),
    }
}

/// Splits on CRLF, LF or CR. A trailing break yields a final empty line.
fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(data);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.iter().position(|b| matches!(b, b'\r' | b'\n')) {
            Some(pos) => {
                let skip = if current[pos..].starts_with(b"\r\n") { 2 } else { 1 };
                rest = Some(&current[pos + skip..]);
                Some(&current[..pos])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_lines() {
        let data = vec![0u8; 60];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 4);
        assert!(lines[2].is_empty());
    }

    #[test]
    fn test_quoted_printable_encode() {
        let encoded = encode_quoted_printable(b"Hello, World!");
        assert_eq!(encoded, "Hello, World!");

        let encoded = encode_quoted_printable("Héllo".as_bytes());
        assert_eq!(encoded, "H=C3=A9llo");

        let encoded = encode_quoted_printable(b"a=b");
        assert_eq!(encoded, "a=3Db");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        let encoded = encode_quoted_printable(b"one \ntwo\r\nthree");
        assert_eq!(encoded, "one=20\r\ntwo\r\nthree");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let data = vec![b'x'; 100];
        let encoded = encode_quoted_printable(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].ends_with('='));
        assert_eq!(lines[1].len(), 25);
    }

    #[test]
    fn test_quoted_printable_does_not_split_escapes() {
        let data = vec![0xE3u8; 30];
        let encoded = encode_quoted_printable(&data);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH);
            assert!(!line.trim_end_matches('=').ends_with("=E"));
        }
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings(b"a\nb\rc\r\nd"), b"a\r\nb\r\nc\r\nd".to_vec());
        assert_eq!(normalize_line_endings(b"end\n"), b"end\r\n".to_vec());
        assert_eq!(normalize_line_endings(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_body() {
        assert_eq!(
            encode_body(b"Hello \nworld!", TransferEncoding::SevenBit, Charset::UsAscii),
            b"Hello \r\nworld!".to_vec()
        );
        assert_eq!(
            encode_body(b"Hello", TransferEncoding::Base64, Charset::Utf8),
            b"SGVsbG8=\r\n".to_vec()
        );
    }

    #[test]
    fn test_encode_body_keeps_utf16_bytes() {
        // U+0A0D then "\n" in UTF-16BE.
        let body = [0x0A, 0x0D, 0x00, 0x0A];
        assert_eq!(
            encode_body(&body, TransferEncoding::EightBit, Charset::Utf16Be),
            body.to_vec()
        );
        assert_eq!(
            encode_body(&body, TransferEncoding::QuotedPrintable, Charset::Utf16Be),
            b"=0A=0D=00=0A".to_vec()
        );
        assert_eq!(
            encode_body(&body, TransferEncoding::EightBit, Charset::Utf8),
            b"\r\n\r\n\x00\r\n".to_vec()
        );
    }
}
