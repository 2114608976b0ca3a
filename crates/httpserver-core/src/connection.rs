//! The transport-side connection a request reads from
//!
//! [`Connection`] is the narrow interface a transport implements so a
//! [`Request`](crate::Request) can pull header, footer and argument values,
//! the peer address and nonce state on first access. [`MemoryConnection`]
//! implements it over values that are already buffered, together with a
//! server-side nonce cache for Digest authentication.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Address and port of the requesting peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerInfo {
    /// Textual IP address, e.g. `"127.0.0.1"` or `"::1"`.
    pub address: String,
    /// Source port.
    pub port: u16,
}

impl From<SocketAddr> for PeerInfo {
    fn from(addr: SocketAddr) -> Self {
        Self {
            address: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

/// Result of a server-side nonce lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    /// Issued by this server, within its timeout, not used with this nonce
    /// count before.
    Fresh,
    /// Issued by this server but expired. The client should be challenged
    /// again with a new nonce.
    Stale,
    /// Unknown nonce, wrong realm, or a replayed nonce count.
    Rejected,
}

/// Source of per-connection data for a request.
///
/// Implementations are expected to answer from state the transport has
/// already buffered; none of these calls should block on the network.
pub trait Connection {
    /// All request header fields, in arrival order.
    fn fetch_headers(&self) -> Vec<(String, String)>;

    /// All trailer fields received after a chunked body.
    fn fetch_footers(&self) -> Vec<(String, String)>;

    /// Raw (still escaped) query arguments.
    fn fetch_args(&self) -> Vec<(String, String)>;

    /// The peer address, if the transport knows it.
    fn fetch_peer_address(&self) -> Option<PeerInfo>;

    /// Validate a Digest nonce issued for `realm` without consuming it.
    ///
    /// `nonce_count` is the client's `nc` directive when the client sent one
    /// and must be greater than any count recorded for the same nonce.
    fn check_nonce(
        &self,
        realm: &str,
        nonce: &str,
        nonce_count: Option<u32>,
        timeout: Duration,
    ) -> NonceStatus;

    /// Record a use of `nonce` whose response verified.
    ///
    /// Only called after a successful check, so unverified requests never
    /// advance the nonce count.
    fn record_nonce_use(&self, realm: &str, nonce: &str, nonce_count: Option<u32>);
}

#[derive(Debug, Clone)]
struct NonceEntry {
    realm: String,
    issued_at: Instant,
    last_count: Option<u32>,
    // used by a request without `nc`
    spent: bool,
}

/// A [`Connection`] over in-memory, already received data.
///
/// All setters take `&self` so the data can change while a request borrows
/// the connection. Every fetch is counted, which makes the request's
/// load-once behaviour observable.
///
/// Nonces accept strictly increasing nonce counts. A nonce used without a
/// count (RFC 2069 clients, no `qop`) is single-use.
///
/// # Example
///
/// ```
/// use httpserver_core::{MemoryConnection, Request};
///
/// let conn = MemoryConnection::new()
///     .with_header("Host", "example.com")
///     .with_arg("q", "rust");
///
/// let mut req = Request::with_connection(&conn);
/// assert_eq!(req.get_header("host"), "example.com");
/// assert_eq!(req.get_arg("q"), "rust");
/// assert_eq!(conn.header_fetches(), 1);
/// ```
#[derive(Default)]
pub struct MemoryConnection {
    headers: RefCell<Vec<(String, String)>>,
    footers: RefCell<Vec<(String, String)>>,
    args: RefCell<Vec<(String, String)>>,
    peer: RefCell<Option<PeerInfo>>,
    nonces: RefCell<HashMap<String, NonceEntry>>,
    header_fetches: Cell<usize>,
    footer_fetches: Cell<usize>,
    arg_fetches: Cell<usize>,
    peer_fetches: Cell<usize>,
    nonce_checks: Cell<usize>,
}

impl MemoryConnection {
    /// Create an empty connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header field.
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_header(name, value);
        self
    }

    /// Add a trailer field.
    pub fn with_footer(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_footer(name, value);
        self
    }

    /// Add a raw query argument.
    pub fn with_arg(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_arg(name, value);
        self
    }

    /// Add every `name=value` pair of a raw query string, without decoding.
    ///
    /// A leading `?` is ignored; a pair without `=` gets an empty value.
    pub fn with_query(self, query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.push_arg(name, value);
        }
        self
    }

    /// Set the peer address.
    pub fn with_peer(self, addr: SocketAddr) -> Self {
        self.set_peer(addr);
        self
    }

    /// Add a header field to the live connection.
    pub fn push_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.borrow_mut().push((name.into(), value.into()));
    }

    /// Add a trailer field to the live connection.
    pub fn push_footer(&self, name: impl Into<String>, value: impl Into<String>) {
        self.footers.borrow_mut().push((name.into(), value.into()));
    }

    /// Add a raw query argument to the live connection.
    pub fn push_arg(&self, name: impl Into<String>, value: impl Into<String>) {
        self.args.borrow_mut().push((name.into(), value.into()));
    }

    /// Replace the peer address.
    pub fn set_peer(&self, addr: SocketAddr) {
        *self.peer.borrow_mut() = Some(PeerInfo::from(addr));
    }

    /// Issue a fresh nonce for `realm` and remember it.
    pub fn issue_nonce(&self, realm: &str) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        self.insert_nonce(nonce.clone(), realm, Instant::now());
        nonce
    }

    /// Remember a nonce issued at `issued_at`.
    pub fn insert_nonce(&self, nonce: impl Into<String>, realm: &str, issued_at: Instant) {
        self.nonces.borrow_mut().insert(
            nonce.into(),
            NonceEntry {
                realm: realm.to_owned(),
                issued_at,
                last_count: None,
                spent: false,
            },
        );
    }

    /// Number of times headers were fetched.
    pub fn header_fetches(&self) -> usize {
        self.header_fetches.get()
    }

    /// Number of times footers were fetched.
    pub fn footer_fetches(&self) -> usize {
        self.footer_fetches.get()
    }

    /// Number of times arguments were fetched.
    pub fn arg_fetches(&self) -> usize {
        self.arg_fetches.get()
    }

    /// Number of times the peer address was fetched.
    pub fn peer_fetches(&self) -> usize {
        self.peer_fetches.get()
    }

    /// Number of nonce checks performed.
    pub fn nonce_checks(&self) -> usize {
        self.nonce_checks.get()
    }

    /// Sum of all fetches, nonce checks excluded.
    pub fn total_fetches(&self) -> usize {
        self.header_fetches() + self.footer_fetches() + self.arg_fetches() + self.peer_fetches()
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl Connection for MemoryConnection {
    fn fetch_headers(&self) -> Vec<(String, String)> {
        bump(&self.header_fetches);
        self.headers.borrow().clone()
    }

    fn fetch_footers(&self) -> Vec<(String, String)> {
        bump(&self.footer_fetches);
        self.footers.borrow().clone()
    }

    fn fetch_args(&self) -> Vec<(String, String)> {
        bump(&self.arg_fetches);
        self.args.borrow().clone()
    }

    fn fetch_peer_address(&self) -> Option<PeerInfo> {
        bump(&self.peer_fetches);
        self.peer.borrow().clone()
    }

    fn check_nonce(
        &self,
        realm: &str,
        nonce: &str,
        nonce_count: Option<u32>,
        timeout: Duration,
    ) -> NonceStatus {
        bump(&self.nonce_checks);

        let nonces = self.nonces.borrow();
        let Some(entry) = nonces.get(nonce) else {
            crate::trace_debug!(nonce, "unknown digest nonce");
            return NonceStatus::Rejected;
        };

        if entry.realm != realm {
            crate::trace_debug!(nonce, realm, "digest nonce issued for another realm");
            return NonceStatus::Rejected;
        }

        if entry.issued_at.elapsed() >= timeout {
            crate::trace_debug!(nonce, ?timeout, "digest nonce expired");
            return NonceStatus::Stale;
        }

        let replayed = match nonce_count {
            Some(count) => entry.last_count.is_some_and(|last| count <= last),
            None => entry.spent,
        };
        if replayed {
            crate::trace_warn!(nonce, ?nonce_count, "replayed digest nonce");
            return NonceStatus::Rejected;
        }

        NonceStatus::Fresh
    }

    fn record_nonce_use(&self, realm: &str, nonce: &str, nonce_count: Option<u32>) {
        let mut nonces = self.nonces.borrow_mut();
        let Some(entry) = nonces.get_mut(nonce).filter(|entry| entry.realm == realm) else {
            return;
        };

        match nonce_count {
            Some(count) => {
                entry.last_count = Some(entry.last_count.map_or(count, |last| last.max(count)));
            }
            None => entry.spent = true,
        }
    }
}

impl fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("headers", &self.headers.borrow().len())
            .field("footers", &self.footers.borrow().len())
            .field("args", &self.args.borrow().len())
            .field("peer", &self.peer.borrow())
            .field("nonces", &self.nonces.borrow().len())
            .finish()
    }
}
