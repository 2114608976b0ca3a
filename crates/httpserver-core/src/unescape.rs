//! Percent-decoding capability injected into requests.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Decodes an escaped argument or cookie value.
///
/// Implemented for any `Fn(&str) -> String`, so a closure can be handed to
/// [`Request::with_unescaper`](crate::Request::with_unescaper) directly.
pub trait Unescape {
    /// Decode `raw`.
    fn unescape(&self, raw: &str) -> String;
}

impl<F> Unescape for F
where
    F: Fn(&str) -> String,
{
    fn unescape(&self, raw: &str) -> String {
        self(raw)
    }
}

/// Form-style decoder: `+` becomes a space and `%XX` sequences are decoded.
///
/// Invalid UTF-8 in the decoded bytes is replaced with U+FFFD.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentDecoder;

impl Unescape for PercentDecoder {
    fn unescape(&self, raw: &str) -> String {
        let spaced = if raw.contains('+') {
            Cow::Owned(raw.replace('+', " "))
        } else {
            Cow::Borrowed(raw)
        };

        percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
    }
}
