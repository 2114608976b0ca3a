//! `Authorization` header parsing
//!
//! [`BasicCredentials`] decodes the Basic scheme; [`DigestAuth`] parses the
//! Digest scheme and computes the expected response. The lazy, error-free
//! views on a [`Request`](crate::Request) are built on top of these.

mod basic;
mod digest;

pub use basic::BasicCredentials;
pub use digest::{DigestAlgorithm, DigestAuth, DigestOutcome, DigestQop};

/// Split `"<scheme> <params>"`, trimming both parts.
fn split_scheme(header: &str) -> (&str, &str) {
    let header = header.trim();
    match header.split_once(|c: char| c.is_ascii_whitespace()) {
        Some((scheme, rest)) => (scheme, rest.trim()),
        None => (header, ""),
    }
}
