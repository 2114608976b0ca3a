use super::split_scheme;
use crate::error::{AuthError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Username and password from an `Authorization: Basic` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub pass: String,
}

impl BasicCredentials {
    /// Parse a full header value such as `Basic dXNlcjpwYXNz`.
    ///
    /// The scheme name is matched case-insensitively. The decoded pair is
    /// split on the first `:`, so passwords may contain colons.
    pub fn parse(header: &str) -> Result<Self> {
        let (scheme, encoded) = split_scheme(header);
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AuthError::WrongScheme("Basic"));
        }

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| AuthError::InvalidBase64(e.to_string()))?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidUtf8)?;

        let (user, pass) = decoded
            .split_once(':')
            .ok_or(AuthError::MissingSeparator)?;

        Ok(Self {
            user: user.to_owned(),
            pass: pass.to_owned(),
        })
    }

    /// Encode back into a header value.
    pub fn to_header_value(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", self.user, self.pass)))
    }
}
