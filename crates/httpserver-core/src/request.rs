//! Request types for httpserver
//!
//! A [`Request`] is built by the transport while a request is received and
//! read by handler code afterwards. Headers, footers, cookies, arguments,
//! credentials and the peer address are only pulled from the underlying
//! [`Connection`] the first time one of their accessors runs, and never
//! again for the same request.

use crate::auth::{BasicCredentials, DigestAuth, DigestOutcome};
use crate::config::RequestConfig;
use crate::connection::{Connection, NonceStatus, PeerInfo};
use crate::error::{AuthError, Result};
use crate::lazy::LoadState;
use crate::map::{ArgMap, HeaderMap};
use crate::path::{floor_char_boundary, tokenize_path, truncate_to};
use crate::unescape::Unescape;
use bytes::BytesMut;
use cookie::Cookie;
use http::header::{AUTHORIZATION, COOKIE};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::time::Duration;

/// Returned by the `get_*` accessors when a value is absent.
///
/// It cannot be told apart from a value that is present but empty; the
/// `Option` returning accessors ([`Request::header`], [`Request::arg`], ...)
/// can.
pub const EMPTY: &str = "";

/// HTTP request wrapper
///
/// Holds one request's data and exposes it through lazily populated
/// accessors. The lifetime `'c` is the time the underlying connection (and
/// unescaper) stay valid, i.e. the duration of request processing.
///
/// Accessors that may load data take `&mut self`: a request is owned by a
/// single thread at a time and is not internally synchronized.
///
/// # Example
///
/// ```
/// use httpserver_core::{MemoryConnection, PercentDecoder, Request};
///
/// let conn = MemoryConnection::new()
///     .with_header("Cookie", "session=abc%21; theme=dark")
///     .with_query("name=J%C3%BCrgen");
///
/// let mut req = Request::with_connection(&conn).with_unescaper(&PercentDecoder);
/// req.set_method("GET");
/// req.set_path("/users/42/profile");
///
/// assert_eq!(req.get_path_piece(1), "42");
/// assert_eq!(req.get_arg("name"), "Jürgen");
/// assert_eq!(req.cookie("session"), Some("abc!"));
/// assert_eq!(req.header("x-missing"), None);
/// ```
#[derive(Clone)]
pub struct Request<'c> {
    connection: Option<&'c dyn Connection>,
    unescaper: Option<&'c dyn Unescape>,
    method: String,
    path: String,
    path_pieces: Vec<String>,
    version: String,
    querystring: LoadState<String>,
    content: BytesMut,
    content_size_limit: usize,
    headers: LoadState<HeaderMap>,
    footers: LoadState<HeaderMap>,
    cookies: LoadState<HeaderMap>,
    args: LoadState<ArgMap>,
    basic_auth: LoadState<BasicCredentials>,
    digested_user: LoadState<String>,
    requestor: LoadState<PeerInfo>,
}

impl<'c> Request<'c> {
    /// Create a request with no underlying connection.
    ///
    /// Lazy accessors then only see values set explicitly.
    pub fn new() -> Self {
        Self {
            connection: None,
            unescaper: None,
            method: String::new(),
            path: String::new(),
            path_pieces: Vec::new(),
            version: String::new(),
            querystring: LoadState::default(),
            content: BytesMut::new(),
            content_size_limit: usize::MAX,
            headers: LoadState::default(),
            footers: LoadState::default(),
            cookies: LoadState::default(),
            args: LoadState::default(),
            basic_auth: LoadState::default(),
            digested_user: LoadState::default(),
            requestor: LoadState::default(),
        }
    }

    /// Create a request reading from `connection` on demand.
    pub fn with_connection(connection: &'c dyn Connection) -> Self {
        Self {
            connection: Some(connection),
            ..Self::new()
        }
    }

    /// Decode argument and cookie values with `unescaper`.
    pub fn with_unescaper(mut self, unescaper: &'c dyn Unescape) -> Self {
        self.unescaper = Some(unescaper);
        self
    }

    /// Apply the limits of `config`.
    pub fn with_config(mut self, config: &RequestConfig) -> Self {
        self.content_size_limit = config.content_size_limit;
        self
    }

    // --- transport-facing setters ---------------------------------------

    /// Set the request method.
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    /// Set the protocol version, e.g. `HTTP/1.1`.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// Set the decoded request path and re-derive its pieces.
    ///
    /// Calling this again replaces the previous pieces.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.path_pieces = tokenize_path(&self.path);
    }

    /// Set the raw query string.
    pub fn set_querystring(&mut self, querystring: impl Into<String>) {
        *self.querystring.get_mut() = querystring.into();
    }

    /// Set the requestor address.
    pub fn set_requestor(&mut self, requestor: impl Into<String>) {
        self.requestor.get_mut().address = requestor.into();
    }

    /// Set the requestor port.
    pub fn set_requestor_port(&mut self, port: u16) {
        self.requestor.get_mut().port = port;
    }

    /// Set the bound for the body and argument values.
    ///
    /// Only applies to later writes; stored values are left as they are.
    pub fn set_content_size_limit(&mut self, limit: usize) {
        self.content_size_limit = limit;
    }

    /// Replace the body, keeping at most `content_size_limit` bytes.
    pub fn set_content(&mut self, content: impl AsRef<[u8]>) {
        self.content.clear();
        self.grow_content(content.as_ref());
    }

    /// Append a chunk to the body, keeping at most `content_size_limit`
    /// bytes in total.
    pub fn grow_content(&mut self, chunk: &[u8]) {
        let room = self.content_size_limit.saturating_sub(self.content.len());
        let take = chunk.len().min(room);

        self.content.extend_from_slice(&chunk[..take]);

        if take < chunk.len() {
            crate::trace_debug!(
                limit = self.content_size_limit,
                dropped = chunk.len() - take,
                "request body truncated"
            );
        }
    }

    /// Insert or overwrite a header.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.get_mut().insert(key, value);
    }

    /// Insert or overwrite a footer.
    pub fn set_footer(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.footers.get_mut().insert(key, value);
    }

    /// Insert or overwrite a cookie.
    pub fn set_cookie(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.cookies.get_mut().insert(key, value);
    }

    /// Insert or overwrite an argument, truncated to `content_size_limit`.
    pub fn set_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut value = value.into();
        if truncate_to(&mut value, self.content_size_limit) {
            crate::trace_debug!(limit = self.content_size_limit, "argument value truncated");
        }
        self.args.get_mut().insert(key, value);
    }

    /// Insert or overwrite an argument from the first `size` bytes of
    /// `value`, truncated to `content_size_limit`.
    pub fn set_arg_with_size(&mut self, key: impl Into<String>, value: &str, size: usize) {
        let end = floor_char_boundary(value, size.min(self.content_size_limit));
        self.args.get_mut().insert(key, &value[..end]);
    }

    /// Merge headers, overwriting existing names.
    pub fn set_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.get_mut().extend(headers);
    }

    /// Merge footers, overwriting existing names.
    pub fn set_footers<I, K, V>(&mut self, footers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.footers.get_mut().extend(footers);
    }

    /// Merge cookies, overwriting existing names.
    pub fn set_cookies<I, K, V>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies.get_mut().extend(cookies);
    }

    /// Merge arguments, overwriting existing names and truncating values.
    pub fn set_args<I, K, V>(&mut self, args: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in args {
            self.set_arg(key, value);
        }
    }

    /// Remove a header if present.
    pub fn remove_header(&mut self, key: &str) {
        self.headers.get_mut().remove(key);
    }

    /// Set the Basic auth username.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.basic_auth.get_mut().user = user.into();
    }

    /// Set the Basic auth password.
    pub fn set_pass(&mut self, pass: impl Into<String>) {
        self.basic_auth.get_mut().pass = pass.into();
    }

    /// Set the Digest auth username.
    pub fn set_digested_user(&mut self, user: impl Into<String>) {
        *self.digested_user.get_mut() = user.into();
    }

    // --- plain reads ------------------------------------------------------

    /// The request method.
    pub fn get_method(&self) -> &str {
        &self.method
    }

    /// The protocol version.
    pub fn get_version(&self) -> &str {
        &self.version
    }

    /// The decoded request path.
    pub fn get_path(&self) -> &str {
        &self.path
    }

    /// Non-empty `/`-separated segments of the path.
    pub fn get_path_pieces(&self) -> &[String] {
        &self.path_pieces
    }

    /// Path segment at `index`.
    pub fn path_piece(&self, index: usize) -> Option<&str> {
        self.path_pieces.get(index).map(String::as_str)
    }

    /// Path segment at `index`, or [`EMPTY`] when out of range.
    pub fn get_path_piece(&self, index: usize) -> &str {
        self.path_piece(index).unwrap_or(EMPTY)
    }

    /// The body received so far.
    pub fn get_content(&self) -> &[u8] {
        &self.content
    }

    /// The bound applied to the body and argument values.
    pub fn content_size_limit(&self) -> usize {
        self.content_size_limit
    }

    /// Whether the body reached the content size limit.
    ///
    /// A body exactly at the limit counts as too large: it may have been
    /// cut there.
    pub fn content_too_large(&self) -> bool {
        self.content.len() >= self.content_size_limit
    }

    // --- lazy reads -------------------------------------------------------

    /// All headers.
    pub fn get_headers(&mut self) -> &HeaderMap {
        self.load_headers()
    }

    /// A header by case-insensitive name.
    pub fn header(&mut self, key: &str) -> Option<&str> {
        self.load_headers().get(key)
    }

    /// A header by case-insensitive name, or [`EMPTY`].
    pub fn get_header(&mut self, key: &str) -> &str {
        self.header(key).unwrap_or(EMPTY)
    }

    /// All footers (chunked trailers).
    pub fn get_footers(&mut self) -> &HeaderMap {
        self.load_footers()
    }

    /// A footer by case-insensitive name.
    pub fn footer(&mut self, key: &str) -> Option<&str> {
        self.load_footers().get(key)
    }

    /// A footer by case-insensitive name, or [`EMPTY`].
    pub fn get_footer(&mut self, key: &str) -> &str {
        self.footer(key).unwrap_or(EMPTY)
    }

    /// All cookies, parsed from the `Cookie` header.
    pub fn get_cookies(&mut self) -> &HeaderMap {
        self.load_cookies()
    }

    /// A cookie by case-insensitive name.
    pub fn cookie(&mut self, key: &str) -> Option<&str> {
        self.load_cookies().get(key)
    }

    /// A cookie by case-insensitive name, or [`EMPTY`].
    pub fn get_cookie(&mut self, key: &str) -> &str {
        self.cookie(key).unwrap_or(EMPTY)
    }

    /// All arguments.
    pub fn get_args(&mut self) -> &ArgMap {
        self.load_args()
    }

    /// An argument by exact name.
    pub fn arg(&mut self, key: &str) -> Option<&str> {
        self.load_args().get(key)
    }

    /// An argument by exact name, or [`EMPTY`].
    pub fn get_arg(&mut self, key: &str) -> &str {
        self.arg(key).unwrap_or(EMPTY)
    }

    /// The raw query string.
    ///
    /// If none was set, it is rebuilt once from the connection's raw
    /// arguments as `?k1=v1&k2=v2`.
    pub fn get_querystring(&mut self) -> &str {
        let connection = self.connection;

        self.querystring.load_with(|querystring| {
            if !querystring.is_empty() {
                return;
            }
            if let Some(conn) = connection {
                for (i, (key, value)) in conn.fetch_args().into_iter().enumerate() {
                    querystring.push(if i == 0 { '?' } else { '&' });
                    querystring.push_str(&key);
                    querystring.push('=');
                    querystring.push_str(&value);
                }
            }
        })
    }

    /// Basic auth username, or [`EMPTY`].
    pub fn get_user(&mut self) -> &str {
        &self.load_basic_auth().user
    }

    /// Basic auth password, or [`EMPTY`].
    pub fn get_pass(&mut self) -> &str {
        &self.load_basic_auth().pass
    }

    /// Digest auth username, or [`EMPTY`].
    pub fn get_digested_user(&mut self) -> &str {
        self.load_digested_user()
    }

    /// The peer address, or [`EMPTY`] when unknown.
    pub fn get_requestor(&mut self) -> &str {
        &self.load_requestor().address
    }

    /// The peer port, or `0` when unknown.
    pub fn get_requestor_port(&mut self) -> u16 {
        self.load_requestor().port
    }

    // --- digest verification ----------------------------------------------

    /// Verify `Authorization: Digest` credentials against `password`.
    ///
    /// The nonce must be one the connection issued for `realm` less than
    /// `nonce_timeout` ago, with a nonce count it has not seen yet. An
    /// expired nonce yields [`DigestOutcome::StaleNonce`] so the caller can
    /// issue a new challenge; every other failure is
    /// [`DigestOutcome::Invalid`].
    ///
    /// The nonce use is only recorded once the response verified, so a
    /// forged request cannot burn a nonce count of the legitimate client.
    /// Without `qop` there is no nonce count; whether such a nonce may be
    /// reused is up to the connection ([`MemoryConnection`] allows a single
    /// use).
    ///
    /// [`MemoryConnection`]: crate::MemoryConnection
    pub fn check_digest_auth(
        &mut self,
        realm: &str,
        password: &str,
        nonce_timeout: Duration,
    ) -> DigestOutcome {
        self.load_digested_user();

        let digest = match self.authorization().and_then(|header| DigestAuth::parse(&header)) {
            Ok(digest) => digest,
            Err(err) => {
                crate::trace_debug!(error = %err, "rejecting digest credentials");
                return DigestOutcome::Invalid;
            }
        };

        if digest.realm != realm {
            crate::trace_debug!(expected = realm, got = %digest.realm, "digest realm mismatch");
            return DigestOutcome::Invalid;
        }

        if !self.path.is_empty() && !uri_matches_path(&digest.uri, &self.path) {
            crate::trace_debug!(uri = %digest.uri, path = %self.path, "digest uri mismatch");
            return DigestOutcome::Invalid;
        }

        let Some(connection) = self.connection else {
            crate::trace_debug!("no connection to validate the digest nonce");
            return DigestOutcome::Invalid;
        };

        let nonce_count = digest.nonce_count();
        match connection.check_nonce(realm, &digest.nonce, nonce_count, nonce_timeout) {
            NonceStatus::Fresh => {}
            NonceStatus::Stale => {
                crate::trace_debug!(user = %digest.username, "stale digest nonce");
                return DigestOutcome::StaleNonce;
            }
            NonceStatus::Rejected => return DigestOutcome::Invalid,
        }

        match digest.verify(&self.method, password, &self.content) {
            Ok(true) => {
                connection.record_nonce_use(realm, &digest.nonce, nonce_count);
                DigestOutcome::Valid
            }
            Ok(false) => {
                crate::trace_debug!(user = %digest.username, "digest response mismatch");
                DigestOutcome::Invalid
            }
            Err(err) => {
                crate::trace_debug!(error = %err, "cannot compute digest response");
                DigestOutcome::Invalid
            }
        }
    }

    /// [`check_digest_auth`](Self::check_digest_auth) reporting the stale
    /// nonce case through `reload_nonce`.
    pub fn check_digest_auth_flag(
        &mut self,
        realm: &str,
        password: &str,
        nonce_timeout: Duration,
        reload_nonce: &mut bool,
    ) -> bool {
        let outcome = self.check_digest_auth(realm, password, nonce_timeout);
        *reload_nonce = outcome.reload_nonce();
        outcome.is_valid()
    }

    // --- loaders ------------------------------------------------------------

    /// The `Authorization` header value.
    fn authorization(&mut self) -> Result<String> {
        self.header(AUTHORIZATION.as_str())
            .map(str::to_owned)
            .ok_or(AuthError::MissingHeader)
    }

    fn load_headers(&mut self) -> &mut HeaderMap {
        let connection = self.connection;

        self.headers.load_with(|headers| {
            if let Some(conn) = connection {
                let fetched = conn.fetch_headers();
                crate::trace_trace!(count = fetched.len(), "loaded request headers");
                headers.extend(fetched);
            }
        })
    }

    fn load_footers(&mut self) -> &mut HeaderMap {
        let connection = self.connection;

        self.footers.load_with(|footers| {
            if let Some(conn) = connection {
                let fetched = conn.fetch_footers();
                crate::trace_trace!(count = fetched.len(), "loaded request footers");
                footers.extend(fetched);
            }
        })
    }

    fn load_args(&mut self) -> &mut ArgMap {
        let connection = self.connection;
        let unescaper = self.unescaper;
        let limit = self.content_size_limit;

        self.args.load_with(|args| {
            let Some(conn) = connection else {
                return;
            };

            let fetched = conn.fetch_args();
            crate::trace_trace!(count = fetched.len(), "loaded request args");

            for (key, raw) in fetched {
                let mut value = unescape(unescaper, raw);
                if truncate_to(&mut value, limit) {
                    crate::trace_debug!(key = %key, limit, "argument value truncated");
                }
                args.insert(key, value);
            }
        })
    }

    fn load_cookies(&mut self) -> &mut HeaderMap {
        if !self.cookies.is_loaded() {
            let raw = self.load_headers().get(COOKIE.as_str()).map(str::to_owned);
            let unescaper = self.unescaper;

            self.cookies.load_with(|cookies| {
                if let Some(raw) = raw {
                    parse_cookies(&raw, unescaper, cookies);
                    crate::trace_trace!(count = cookies.len(), "parsed request cookies");
                }
            });
        }

        self.cookies.get_mut()
    }

    fn load_basic_auth(&mut self) -> &BasicCredentials {
        if !self.basic_auth.is_loaded() {
            let parsed = self
                .authorization()
                .and_then(|header| BasicCredentials::parse(&header));

            self.basic_auth.load_with(|credentials| match parsed {
                Ok(parsed) => *credentials = parsed,
                Err(err) => {
                    crate::trace_debug!(error = %err, "no basic credentials");
                }
            });
        }

        self.basic_auth.get()
    }

    fn load_digested_user(&mut self) -> &str {
        if !self.digested_user.is_loaded() {
            let parsed = self
                .authorization()
                .and_then(|header| DigestAuth::username(&header));

            self.digested_user.load_with(|user| match parsed {
                Ok(parsed) => *user = parsed,
                Err(err) => {
                    crate::trace_debug!(error = %err, "no digest username");
                }
            });
        }

        self.digested_user.get()
    }

    fn load_requestor(&mut self) -> &PeerInfo {
        let connection = self.connection;

        self.requestor.load_with(|requestor| {
            if let Some(peer) = connection.and_then(|conn| conn.fetch_peer_address()) {
                *requestor = peer;
            }
        })
    }
}

fn unescape(unescaper: Option<&dyn Unescape>, raw: String) -> String {
    match unescaper {
        Some(unescaper) => unescaper.unescape(&raw),
        None => raw,
    }
}

/// Pairs without `=` or with an empty name are skipped.
fn parse_cookies(raw: &str, unescaper: Option<&dyn Unescape>, cookies: &mut HeaderMap) {
    for cookie in Cookie::split_parse(raw).filter_map(|parsed| parsed.ok()) {
        let value = unescape(unescaper, cookie.value().to_owned());
        cookies.insert(cookie.name(), value);
    }
}

/// Compare the `uri` directive with the decoded request path, ignoring any
/// query part.
fn uri_matches_path(uri: &str, path: &str) -> bool {
    let uri_path = uri.split_once('?').map_or(uri, |(path, _)| path);
    percent_decode_str(uri_path).decode_utf8_lossy() == path
}

impl Default for Request<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("content_len", &self.content.len())
            .field("content_size_limit", &self.content_size_limit)
            .field("headers", &self.headers)
            .field("footers", &self.footers)
            .field("cookies", &self.cookies)
            .field("args", &self.args)
            .field("has_connection", &self.connection.is_some())
            .finish()
    }
}

fn dump_map<'a>(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> fmt::Result {
    let mut entries = entries.into_iter().peekable();
    if entries.peek().is_none() {
        return Ok(());
    }

    write!(f, "    {} [", label)?;
    for (key, value) in entries {
        write!(f, "{}:\"{}\" ", key, value)?;
    }
    writeln!(f, "]")
}

/// Multi-line dump of what is currently stored. Never loads anything.
impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credentials = self.basic_auth.get();
        writeln!(
            f,
            "{} Request [user:\"{}\" pass:\"{}\"] path:\"{}\"",
            self.method, credentials.user, credentials.pass, self.path
        )?;

        dump_map(f, "Headers", self.headers.get())?;
        dump_map(f, "Footers", self.footers.get())?;
        dump_map(f, "Cookies", self.cookies.get())?;
        dump_map(f, "Query Args", self.args.get())?;

        let requestor = self.requestor.get();
        writeln!(
            f,
            "    Version [ {} ] Requestor [ {}:{} ]",
            self.version, requestor.address, requestor.port
        )
    }
}
