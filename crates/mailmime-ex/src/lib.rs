//! # mailmime-ex
//!
//! Plain-text MIME message builder with charset conversion.
//!
//! ## Features
//!
//! - **Header encoding**: RFC 2047 encoded words (Q and B), folded on
//!   character boundaries of the header charset
//! - **Charset updates**: convert stored headers or body to another charset
//!   and keep the `Content-Type` declaration in step
//! - **Japanese mail**: ISO-2022-JP, ISO-2022-JP-MS and CP932, besides every
//!   encoding `encoding_rs` knows
//! - **Flowed text**: `format=flowed` and `delsp=yes` (RFC 3676) survive
//!   charset changes
//!
//! ## Quick Start
//!
//! ### Building a Message
//!
//! ```ignore
//! use mailmime_ex::MessageBuilder;
//!
//! let message = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("テストメールです")
//!     .text_body("こんにちは")
//!     .build();
//!
//! for (name, value) in message.headers().iter() {
//!     println!("{name}: {value:?}");
//! }
//! ```
//!
//! ### Converting to ISO-2022-JP
//!
//! ```ignore
//! use mailmime_ex::MimeMessage;
//!
//! let mut message = MimeMessage::new(headers, "こんにちは");
//! message.set_param("head_encoding", "base64")?;
//! message.set_param("text_encoding", "7bit")?;
//!
//! // Falls back to the Microsoft variant for NEC special characters.
//! if let Err(err) = message.update_text_charset("ISO-2022-JP") {
//!     if err.is_unmappable() {
//!         message.update_text_charset("ISO-2022-JP-MS")?;
//!         message.set_param("text_charset", "ISO-2022-JP")?;
//!     }
//! }
//!
//! let bytes = message.render();
//! ```
//!
//! ### Converting Values Directly
//!
//! ```ignore
//! use mailmime_ex::{HeaderValue, Transcoder};
//!
//! let transcoder = Transcoder::default();
//! let jis = transcoder.convert(&HeaderValue::from("件名"), "ISO-2022-JP", None)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod charset;
mod content_type;
mod error;
mod header;
mod header_encoder;
mod iso2022jp;
mod message;
mod params;

pub mod encoding;
pub mod transcode;

pub use builder::MessageBuilder;
pub use charset::Charset;
pub use content_type::ContentType;
pub use error::{Error, Result, TranscodeError};
pub use header::{EncodedHeaders, EncodedValue, FieldMap, HeaderValue, Headers};
pub use header_encoder::HeaderEncoder;
pub use message::MimeMessage;
pub use params::{CharsetParam, FlowedOptions, OptionName, Param, Params, TransferEncoding};
pub use transcode::Transcoder;
