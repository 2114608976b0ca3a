//! HTTP Digest authentication (RFC 2617 / RFC 7616)
//!
//! Directive parsing and response computation. Nonce bookkeeping belongs to
//! the [`Connection`](crate::Connection); the request glues both together in
//! [`Request::check_digest_auth`](crate::Request::check_digest_auth).

use super::split_scheme;
use crate::error::{AuthError, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hash algorithm named by the `algorithm` directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    /// Parse an `algorithm` directive value (case-insensitive).
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "MD5-SESS" => Ok(Self::Md5Sess),
            "SHA-256" => Ok(Self::Sha256),
            "SHA-256-SESS" => Ok(Self::Sha256Sess),
            _ => Err(AuthError::UnsupportedAlgorithm(value.to_owned())),
        }
    }

    /// `-sess` variants rehash HA1 with the nonce and client nonce.
    pub fn is_sess(self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    /// Lower-case hex digest of `input`.
    pub fn hash(self, input: &[u8]) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => format!("{:x}", Md5::digest(input)),
            Self::Sha256 | Self::Sha256Sess => format!("{:x}", Sha256::digest(input)),
        }
    }
}

/// Quality of protection named by the `qop` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestQop {
    Auth,
    AuthInt,
}

impl DigestQop {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "auth" => Ok(Self::Auth),
            "auth-int" => Ok(Self::AuthInt),
            _ => Err(AuthError::UnsupportedQop(value.to_owned())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::AuthInt => "auth-int",
        }
    }
}

/// Verdict of a Digest check.
///
/// `StaleNonce` is distinct from `Invalid` so the caller can answer with a
/// fresh challenge (`stale=true`) instead of rejecting the credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    Valid,
    Invalid,
    StaleNonce,
}

impl DigestOutcome {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    /// Whether a new nonce should be issued to the client.
    pub fn reload_nonce(self) -> bool {
        self == Self::StaleNonce
    }
}

/// Directives of an `Authorization: Digest` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestAuth {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub algorithm: DigestAlgorithm,
    pub qop: Option<DigestQop>,
    /// Raw `nc` value (8 hex digits), as hashed.
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub opaque: Option<String>,
}

impl DigestAuth {
    /// Parse a full header value such as `Digest username="Mufasa", ...`.
    pub fn parse(header: &str) -> Result<Self> {
        let mut directives = directives(header)?;
        let mut required = |name: &'static str| {
            directives
                .remove(name)
                .ok_or(AuthError::MissingDirective(name))
        };

        let username = required("username")?;
        let realm = required("realm")?;
        let nonce = required("nonce")?;
        let uri = required("uri")?;
        let response = required("response")?;

        let algorithm = match directives.remove("algorithm") {
            Some(value) => DigestAlgorithm::parse(&value)?,
            None => DigestAlgorithm::default(),
        };
        let qop = directives
            .remove("qop")
            .map(|value| DigestQop::parse(&value))
            .transpose()?;

        let nc = directives.remove("nc");
        if let Some(nc) = &nc {
            if nc.len() != 8 || u32::from_str_radix(nc, 16).is_err() {
                return Err(AuthError::InvalidNonceCount(nc.clone()));
            }
        }

        Ok(Self {
            username,
            realm,
            nonce,
            uri,
            response: response.to_ascii_lowercase(),
            algorithm,
            qop,
            nc,
            cnonce: directives.remove("cnonce"),
            opaque: directives.remove("opaque"),
        })
    }

    /// Extract only the `username` directive.
    pub fn username(header: &str) -> Result<String> {
        directives(header)?
            .remove("username")
            .ok_or(AuthError::MissingDirective("username"))
    }

    /// The `nc` directive as a number.
    pub fn nonce_count(&self) -> Option<u32> {
        self.nc
            .as_deref()
            .and_then(|nc| u32::from_str_radix(nc, 16).ok())
    }

    /// Compute the `response` value a client knowing `password` would send.
    ///
    /// `body` is only hashed for `qop=auth-int`.
    pub fn expected_response(&self, method: &str, password: &str, body: &[u8]) -> Result<String> {
        let alg = self.algorithm;

        let mut ha1 = alg.hash(format!("{}:{}:{}", self.username, self.realm, password).as_bytes());
        if alg.is_sess() {
            let cnonce = self
                .cnonce
                .as_deref()
                .ok_or(AuthError::MissingDirective("cnonce"))?;
            ha1 = alg.hash(format!("{}:{}:{}", ha1, self.nonce, cnonce).as_bytes());
        }

        let ha2 = match self.qop {
            Some(DigestQop::AuthInt) => {
                alg.hash(format!("{}:{}:{}", method, self.uri, alg.hash(body)).as_bytes())
            }
            _ => alg.hash(format!("{}:{}", method, self.uri).as_bytes()),
        };

        let response = match self.qop {
            Some(qop) => {
                let nc = self.nc.as_deref().ok_or(AuthError::MissingDirective("nc"))?;
                let cnonce = self
                    .cnonce
                    .as_deref()
                    .ok_or(AuthError::MissingDirective("cnonce"))?;
                alg.hash(
                    format!(
                        "{}:{}:{}:{}:{}:{}",
                        ha1,
                        self.nonce,
                        nc,
                        cnonce,
                        qop.as_str(),
                        ha2
                    )
                    .as_bytes(),
                )
            }
            // RFC 2069 compatibility
            None => alg.hash(format!("{}:{}:{}", ha1, self.nonce, ha2).as_bytes()),
        };

        Ok(response)
    }

    /// Compare the client's response with the expected one in constant time.
    pub fn verify(&self, method: &str, password: &str, body: &[u8]) -> Result<bool> {
        let expected = self.expected_response(method, password, body)?;
        Ok(constant_time_eq(expected.as_bytes(), self.response.as_bytes()))
    }
}

/// Parse the comma separated `key=value` / `key="quoted value"` list that
/// follows the `Digest` scheme name. Keys are lower-cased.
fn directives(header: &str) -> Result<HashMap<String, String>> {
    let (scheme, list) = split_scheme(header);
    if !scheme.eq_ignore_ascii_case("digest") {
        return Err(AuthError::WrongScheme("Digest"));
    }
    if list.is_empty() {
        return Err(AuthError::MalformedDirectives("no directives"));
    }

    let mut out = HashMap::new();
    let mut chars = list.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_') {
            key.push(c.to_ascii_lowercase());
        }
        if key.is_empty() {
            return Err(AuthError::MalformedDirectives("expected directive name"));
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next() != Some('=') {
            return Err(AuthError::MalformedDirectives("expected '='"));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => value.push(escaped),
                        None => return Err(AuthError::MalformedDirectives("dangling escape")),
                    },
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(AuthError::MalformedDirectives("unterminated quote")),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
            value.truncate(value.trim_end().len());
        }

        out.insert(key, value);
    }

    Ok(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
