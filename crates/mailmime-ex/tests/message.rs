//! Integration tests for building messages and converting their charsets.

#![allow(clippy::unwrap_used)]

use mailmime_ex::transcode::{convert_bytes, decode};
use mailmime_ex::{Charset, Error, HeaderValue, Headers, MessageBuilder, MimeMessage, TranscodeError, Transcoder};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn headers(fields: &[(&str, &str)]) -> Headers {
    fields.iter().copied().collect()
}

#[test]
fn test_subject_is_folded_into_encoded_words() {
    init_tracing();
    let msg = MimeMessage::new(headers(&[("Subject", "テストメールです")]), "");

    assert_eq!(msg.raw_headers().get("Subject").unwrap(), &"テストメールです");
    assert_eq!(
        msg.headers().get("Subject").unwrap(),
        &"=?UTF-8?Q?=E3=83=86=E3=82=B9=E3=83=88=E3=83=A1=E3=83=BC=E3=83=AB?=\r\n =?UTF-8?Q?=E3=81=A7=E3=81=99?="
    );
}

#[test]
fn test_header_charset_to_iso2022jp_with_base64() {
    init_tracing();
    let mut msg = MimeMessage::new(headers(&[("Subject", "テストメールです")]), "");
    msg.set_param("head_encoding", "base64").unwrap();
    msg.update_header_charset("ISO-2022-JP").unwrap();

    assert_eq!(msg.header_charset(), "ISO-2022-JP");
    assert_eq!(
        msg.raw_headers().get("Subject").unwrap(),
        &HeaderValue::from(&b"\x1b$B%F%9%H%a!<%k$G$9\x1b(B"[..])
    );
    assert_eq!(
        msg.headers().get("Subject").unwrap(),
        &"=?ISO-2022-JP?B?GyRCJUYlOSVIJWEhPCVrJEckORsoQg==?="
    );
}

#[test]
fn test_text_charset_to_iso2022jp_with_7bit() {
    init_tracing();
    let mut msg = MimeMessage::new(Headers::new(), "こんにちは");
    msg.set_param("text_encoding", "7bit").unwrap();
    msg.update_text_charset("ISO-2022-JP").unwrap();

    assert_eq!(msg.text_body(), b"\x1b$B$3$s$K$A$O\x1b(B");
    assert_eq!(msg.encoded_body(), b"\x1b$B$3$s$K$A$O\x1b(B".to_vec());
    assert_eq!(
        msg.raw_headers().get("Content-Type").unwrap(),
        &"text/plain; charset=ISO-2022-JP"
    );
}

#[test]
fn test_set_headers_derives_content_headers() {
    let mut msg = MimeMessage::new(headers(&[("Subject", "Hi")]), "flowed text");
    msg.set_param("text_charset", "US-ASCII; format=flowed").unwrap();
    msg.set_param("text_encoding", "7bit").unwrap();
    let encoded = msg.set_headers(Headers::new());

    let raw = msg.raw_headers();
    assert_eq!(
        raw.get("Content-Type").unwrap(),
        &"text/plain; charset=US-ASCII; format=flowed"
    );
    assert_eq!(raw.get("Content-Transfer-Encoding").unwrap(), &"7bit");
    assert!(raw.get("Subject").is_none());
    assert_eq!(encoded.len(), raw.len());
}

#[test]
fn test_caller_content_headers_are_installed_verbatim() {
    let msg = MimeMessage::new(
        headers(&[
            ("Content-Type", "text/plain; charset=US-ASCII; format=flowed"),
            ("Content-Transfer-Encoding", "7bit"),
        ]),
        "flowed text",
    );

    let raw = msg.raw_headers();
    assert_eq!(
        raw.get("Content-Type").unwrap(),
        &"text/plain; charset=US-ASCII; format=flowed"
    );
    assert_eq!(raw.get("Content-Transfer-Encoding").unwrap(), &"7bit");
    assert_eq!(raw.get("MIME-Version").unwrap(), &"1.0");
    assert_eq!(msg.option("format"), Some("flowed"));
}

#[test]
fn test_wave_dash_reaches_shift_jis_and_euc_jp() {
    let mut msg = MimeMessage::new(headers(&[("Subject", "〜")]), "〜");
    msg.update_text_charset("ISO-2022-JP").unwrap();
    msg.update_text_charset_from("Shift_JIS", "ISO-2022-JP").unwrap();
    assert_eq!(msg.text_body(), &[0x81, 0x60]);

    msg.update_header_charset("EUC-JP").unwrap();
    assert_eq!(
        msg.raw_headers().get("Subject").unwrap(),
        &HeaderValue::from(&[0xA1u8, 0xC1][..])
    );
}

#[test]
fn test_nec_special_characters_need_microsoft_variant() {
    init_tracing();
    let err = convert_bytes("①".as_bytes(), Charset::Iso2022Jp, Charset::Utf8).unwrap_err();
    assert!(matches!(
        err,
        Error::Transcoding(TranscodeError::Unmappable { ch: '①', .. })
    ));

    let ms = convert_bytes("①".as_bytes(), Charset::Iso2022JpMs, Charset::Utf8).unwrap();
    assert_eq!(ms, b"\x1b$B-!\x1b(B".to_vec());

    let ms = convert_bytes("テストメ〜ル①㈱".as_bytes(), Charset::Iso2022JpMs, Charset::Utf8).unwrap();
    assert_eq!(ms, b"\x1b$B%F%9%H%a!A%k-!-j\x1b(B".to_vec());

    let ms = convert_bytes("こんにちは①髙﨑".as_bytes(), Charset::Iso2022JpMs, Charset::Utf8).unwrap();
    assert_eq!(ms, b"\x1b$B$3$s$K$A$O-!|byu\x1b(B".to_vec());
}

#[test]
fn test_microsoft_variant_declared_as_iso2022jp() {
    let mut msg = MimeMessage::new(headers(&[("Subject", "丸数字①")]), "本文①");
    assert!(msg.update_text_charset("ISO-2022-JP").unwrap_err().is_unmappable());
    assert_eq!(msg.text_charset(), "UTF-8");

    msg.update_text_charset("ISO-2022-JP-MS").unwrap();
    msg.set_param("text_charset", "ISO-2022-JP").unwrap();
    msg.update_header_charset("ISO-2022-JP-MS").unwrap();
    msg.set_param("head_charset", "ISO-2022-JP").unwrap();

    assert_eq!(
        msg.raw_headers().get("Content-Type").unwrap(),
        &"text/plain; charset=ISO-2022-JP"
    );
    assert!(msg.headers().get("Subject").unwrap().as_single().unwrap().starts_with("=?ISO-2022-JP?Q?"));
    assert_eq!(decode(msg.text_body(), Charset::Iso2022JpMs).unwrap(), "本文①");
}

#[test]
fn test_header_charset_strips_parameters() {
    let mut msg = MimeMessage::new(Headers::new(), "");
    msg.set_param("head_charset", "UTF-8; some=thing").unwrap();
    assert_eq!(msg.header_charset(), "UTF-8");

    msg.set_param("head_charset", "").unwrap();
    assert_eq!(msg.header_charset(), "US-ASCII");
}

#[test]
fn test_flowed_options_follow_content_type() {
    let msg = MimeMessage::new(
        headers(&[("Content-Type", "text/plain; charset=ISO-2022-JP; format=flowed; delsp=yes")]),
        "",
    );
    assert_eq!(msg.option("format"), Some("flowed"));
    assert_eq!(msg.option("delsp"), Some("yes"));

    let msg = MimeMessage::new(headers(&[("Content-Type", "text/plain; charset=UTF-8")]), "");
    assert_eq!(msg.option("format"), None);
    assert_eq!(msg.option("delsp"), None);
}

#[test]
fn test_flowed_options_survive_text_charset_update() {
    let mut msg = MessageBuilder::new()
        .header("Content-Type", "text/plain; charset=UTF-8; format=flowed")
        .text_body("こんにちは")
        .build();
    msg.update_text_charset("Shift_JIS").unwrap();

    assert_eq!(msg.param("text_charset").unwrap().as_deref(), Some("Shift_JIS; format=flowed"));
    assert_eq!(msg.text_body(), &[0x82, 0xB1, 0x82, 0xF1, 0x82, 0xC9, 0x82, 0xBF, 0x82, 0xCD]);
}

#[test]
fn test_header_charset_is_not_rederived_from_headers() {
    let mut msg = MimeMessage::new(headers(&[("Subject", "件名")]), "");
    msg.update_header_charset("ISO-2022-JP").unwrap();
    msg.set_headers(headers(&[("Subject", "plain")]));
    assert_eq!(msg.header_charset(), "ISO-2022-JP");
}

#[test]
fn test_address_fields_keep_addresses() {
    let msg = MessageBuilder::new()
        .from("送信者 <sender@example.com>")
        .to("recipient@example.com")
        .build();

    let encoded = msg.headers();
    assert_eq!(
        encoded.get("From").unwrap(),
        &"=?UTF-8?Q?=E9=80=81=E4=BF=A1=E8=80=85?= <sender@example.com>"
    );
    assert_eq!(encoded.get("To").unwrap(), &"recipient@example.com");
}

#[test]
fn test_render_japanese_message() {
    let mut msg = MessageBuilder::new()
        .from("sender@example.com")
        .subject("テスト")
        .text_body("本文です")
        .build();
    msg.set_param("head_encoding", "base64").unwrap();
    msg.set_param("text_encoding", "base64").unwrap();
    msg.update_header_charset("ISO-2022-JP").unwrap();
    msg.update_text_charset("ISO-2022-JP").unwrap();

    let rendered = String::from_utf8(msg.render()).unwrap();
    assert_eq!(
        rendered,
        "MIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=ISO-2022-JP\r\n\
         Content-Transfer-Encoding: base64\r\n\
         From: sender@example.com\r\n\
         Subject: =?ISO-2022-JP?B?GyRCJUYlOSVIGyhC?=\r\n\
         \r\n\
         GyRCS1xKOCRHJDkbKEI=\r\n"
    );
}

#[test]
fn test_transcoder_default_source() {
    let transcoder = Transcoder::default();
    let value = HeaderValue::from(vec!["あ", "い"]);
    let jis = transcoder.convert(&value, "ISO-2022-JP", None).unwrap();
    assert_eq!(
        jis,
        HeaderValue::Multi(vec![b"\x1b$B$\"\x1b(B".to_vec(), b"\x1b$B$$\x1b(B".to_vec()])
    );

    let err = transcoder.convert(&value, "x-no-such-charset", None).unwrap_err();
    assert!(matches!(err, Error::UnsupportedCharset(_)));
}

fn japanese_text() -> impl Strategy<Value = String> {
    "[ぁ-んァ-ヶ日本語漢字件名東京送信受a-zA-Z0-9 ]{0,40}"
}

proptest! {
    #[test]
    fn prop_iso2022jp_round_trip(text in japanese_text()) {
        let jis = convert_bytes(text.as_bytes(), Charset::Iso2022Jp, Charset::Utf8).unwrap();
        prop_assert!(jis.iter().all(u8::is_ascii));
        let back = convert_bytes(&jis, Charset::Utf8, Charset::Iso2022Jp).unwrap();
        prop_assert_eq!(back, text.into_bytes());
    }

    #[test]
    fn prop_update_header_charset_is_idempotent(subject in japanese_text()) {
        let mut msg = MimeMessage::new(headers(&[("Subject", subject.as_str())]), "");
        msg.update_header_charset("ISO-2022-JP").unwrap();
        let once = msg.clone();
        msg.update_header_charset("ISO-2022-JP").unwrap();
        prop_assert_eq!(msg, once);
    }

    #[test]
    fn prop_encoded_headers_are_ascii_lines(subject in japanese_text()) {
        let mut msg = MimeMessage::new(headers(&[("Subject", subject.as_str())]), "");
        msg.update_header_charset("ISO-2022-JP").unwrap();
        let encoded = msg.headers();
        let value = encoded.get("Subject").unwrap().as_single().unwrap();
        for (index, line) in value.split("\r\n ").enumerate() {
            let limit = if index == 0 { 75 - "Subject: ".len() } else { 75 };
            prop_assert!(line.is_ascii());
            prop_assert!(line.len() <= limit, "{line:?} is too long");
        }
    }
}
