//! # httpserver core
//!
//! The request side of an embeddable HTTP server.
//!
//! A [`Request`] is filled in by the transport while a request is received
//! (method, path, version, body chunks) and read by handlers afterwards.
//! Everything the transport has buffered on its side of the [`Connection`]
//! (headers, footers, query arguments, the peer address) is only copied
//! into the request the first time it is asked for. Cookies and
//! Basic/Digest credentials are derived from the loaded headers on demand.

mod tracing_macros;

pub mod auth;
mod config;
mod connection;
mod error;
mod lazy;
mod map;
mod path;
mod request;
mod unescape;

// Public API
pub use auth::{BasicCredentials, DigestAlgorithm, DigestAuth, DigestOutcome, DigestQop};
pub use config::{RequestConfig, CONTENT_SIZE_LIMIT_ENV};
pub use connection::{Connection, MemoryConnection, NonceStatus, PeerInfo};
pub use error::{AuthError, ConfigError, Result};
pub use lazy::LoadState;
pub use map::{ArgMap, CaseInsensitive, CaseSensitive, FieldMap, HeaderMap, KeyPolicy};
pub use path::tokenize_path;
pub use request::{Request, EMPTY};
pub use unescape::{PercentDecoder, Unescape};
