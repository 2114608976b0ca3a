//! Error types for httpserver-core
//!
//! None of these cross the consumer-facing accessors of [`Request`]: a
//! malformed `Authorization` header degrades to empty credentials or an
//! invalid digest outcome. They exist so the parsers can be used (and
//! tested) on their own and so failures can be logged with a reason.
//!
//! [`Request`]: crate::Request

use thiserror::Error;

/// Result type alias for authorization parsing
pub type Result<T, E = AuthError> = std::result::Result<T, E>;

/// Why an `Authorization` header could not be turned into credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header does not use the {0} scheme")]
    WrongScheme(&'static str),

    #[error("invalid base64 in Basic credentials: {0}")]
    InvalidBase64(String),

    #[error("Basic credentials are not valid UTF-8")]
    InvalidUtf8,

    #[error("Basic credentials have no ':' separator")]
    MissingSeparator,

    #[error("malformed Digest directives: {0}")]
    MalformedDirectives(&'static str),

    #[error("Digest header is missing the `{0}` directive")]
    MissingDirective(&'static str),

    #[error("unsupported Digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported Digest qop: {0}")]
    UnsupportedQop(String),

    #[error("invalid Digest nonce count: {0}")]
    InvalidNonceCount(String),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        var: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
