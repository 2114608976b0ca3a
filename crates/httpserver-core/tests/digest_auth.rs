use httpserver_core::{
    DigestAlgorithm, DigestAuth, DigestOutcome, DigestQop, MemoryConnection, Request, EMPTY,
};
use std::time::{Duration, Instant};

const REALM: &str = "testrealm@host.com";
const PASSWORD: &str = "Circle Of Life";
const TIMEOUT: Duration = Duration::from_secs(300);

const MUFASA: &str = concat!(
    "Digest username=\"Mufasa\",",
    " realm=\"testrealm@host.com\",",
    " nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\",",
    " uri=\"/dir/index.html\",",
    " qop=auth,",
    " nc=00000001,",
    " cnonce=\"0a4f113b\",",
    " response=\"6629fae49393a05397450978507c4ef1\",",
    " opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""
);

fn mufasa_connection() -> MemoryConnection {
    let conn = MemoryConnection::new().with_header("Authorization", MUFASA);
    conn.insert_nonce("dcd98b7102dd2f0e8b11d0f600bfb0c093", REALM, Instant::now());
    conn
}

fn unsigned(nonce: &str, uri: &str, algorithm: DigestAlgorithm) -> DigestAuth {
    DigestAuth {
        username: "Mufasa".to_string(),
        realm: REALM.to_string(),
        nonce: nonce.to_string(),
        uri: uri.to_string(),
        response: String::new(),
        algorithm,
        qop: None,
        nc: None,
        cnonce: None,
        opaque: None,
    }
}

/// Build the header a well-behaved client would send.
fn client_header(
    nonce: &str,
    uri: &str,
    nc: u32,
    algorithm: DigestAlgorithm,
    qop: DigestQop,
    method: &str,
    body: &[u8],
) -> String {
    let mut digest = DigestAuth {
        qop: Some(qop),
        nc: Some(format!("{:08x}", nc)),
        cnonce: Some("0a4f113b".to_string()),
        ..unsigned(nonce, uri, algorithm)
    };
    digest.response = digest.expected_response(method, PASSWORD, body).unwrap();

    let algorithm = match algorithm {
        DigestAlgorithm::Md5 => "MD5",
        DigestAlgorithm::Md5Sess => "MD5-sess",
        DigestAlgorithm::Sha256 => "SHA-256",
        DigestAlgorithm::Sha256Sess => "SHA-256-sess",
    };

    format!(
        concat!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", ",
            "algorithm={}, qop={}, nc={}, cnonce=\"{}\", response=\"{}\""
        ),
        digest.username,
        digest.realm,
        digest.nonce,
        digest.uri,
        algorithm,
        qop.as_str(),
        digest.nc.as_deref().unwrap(),
        digest.cnonce.as_deref().unwrap(),
        digest.response,
    )
}

/// RFC 2069 style header: no `qop`, hence no nonce count.
fn legacy_header(nonce: &str, uri: &str) -> String {
    let digest = unsigned(nonce, uri, DigestAlgorithm::Md5);
    let response = digest.expected_response("GET", PASSWORD, b"").unwrap();

    format!(
        r#"Digest username="Mufasa", realm="{}", nonce="{}", uri="{}", response="{}""#,
        REALM, nonce, uri, response,
    )
}

fn api_header(nonce: &str, nc: u32) -> String {
    client_header(nonce, "/api", nc, DigestAlgorithm::Sha256, DigestQop::Auth, "GET", b"")
}

fn upload_header(nonce: &str, nc: u32) -> String {
    let (alg, qop) = (DigestAlgorithm::Md5Sess, DigestQop::AuthInt);
    client_header(nonce, "/upload", nc, alg, qop, "PUT", b"payload")
}

fn api_request(conn: &MemoryConnection) -> Request<'_> {
    let mut req = Request::with_connection(conn);
    req.set_method("GET");
    req.set_path("/api");
    req
}

#[test]
fn test_rfc2617_example_is_accepted() {
    let conn = mufasa_connection();
    let mut req = Request::with_connection(&conn);
    req.set_method("GET");
    req.set_path("/dir/index.html");

    assert_eq!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Valid);
    assert_eq!(req.get_digested_user(), "Mufasa");
    assert_eq!(req.get_user(), EMPTY);
}

#[test]
fn test_wrong_password_is_invalid() {
    let conn = mufasa_connection();
    let mut req = Request::with_connection(&conn);
    req.set_method("GET");

    let mut reload = true;
    assert!(!req.check_digest_auth_flag(REALM, "Hakuna Matata", TIMEOUT, &mut reload));
    assert!(!reload);
}

#[test]
fn test_wrong_realm_is_invalid() {
    let conn = mufasa_connection();
    let mut req = Request::with_connection(&conn);
    req.set_method("GET");

    assert_eq!(
        req.check_digest_auth("other@host.com", PASSWORD, TIMEOUT),
        DigestOutcome::Invalid
    );
    // no nonce was consumed
    assert_eq!(conn.nonce_checks(), 0);
}

#[test]
fn test_uri_must_match_path() {
    let conn = mufasa_connection();
    let mut req = Request::with_connection(&conn);
    req.set_method("GET");
    req.set_path("/somewhere/else");

    assert_eq!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Invalid);
}

#[test]
fn test_replayed_nonce_count_is_invalid() {
    let conn = mufasa_connection();

    let mut first = Request::with_connection(&conn);
    first.set_method("GET");
    assert!(first.check_digest_auth(REALM, PASSWORD, TIMEOUT).is_valid());

    let mut replay = Request::with_connection(&conn);
    replay.set_method("GET");
    assert_eq!(replay.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Invalid);
}

#[test]
fn test_expired_nonce_asks_for_reload() {
    let conn = MemoryConnection::new().with_header("Authorization", MUFASA);
    conn.insert_nonce(
        "dcd98b7102dd2f0e8b11d0f600bfb0c093",
        REALM,
        Instant::now() - Duration::from_secs(10),
    );

    let mut req = Request::with_connection(&conn);
    req.set_method("GET");

    let mut reload = false;
    let ok = req.check_digest_auth_flag(REALM, PASSWORD, Duration::from_secs(5), &mut reload);
    assert!(!ok);
    assert!(reload);
}

#[test]
fn test_unknown_nonce_is_invalid() {
    let conn = MemoryConnection::new().with_header("Authorization", MUFASA);
    let mut req = Request::with_connection(&conn);
    req.set_method("GET");

    assert_eq!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Invalid);
}

#[test]
fn test_missing_header_leaves_flag_false() {
    let conn = MemoryConnection::new();
    let mut req = Request::with_connection(&conn);

    let mut reload = false;
    assert!(!req.check_digest_auth_flag(REALM, PASSWORD, TIMEOUT, &mut reload));
    assert!(!reload);
    assert_eq!(req.get_digested_user(), EMPTY);
}

#[test]
fn test_without_connection_is_invalid() {
    let mut req = Request::new();
    req.set_method("GET");
    req.set_header("Authorization", MUFASA);

    assert_eq!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Invalid);
    assert_eq!(req.get_digested_user(), "Mufasa");
}

#[test]
fn test_basic_header_is_not_digest() {
    let conn = MemoryConnection::new().with_header("Authorization", "Basic dXNlcjpwYXNz");
    let mut req = Request::with_connection(&conn);

    assert_eq!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Invalid);
    assert_eq!(req.get_digested_user(), EMPTY);
}

#[test]
fn test_issued_nonce_with_increasing_counts() {
    let conn = MemoryConnection::new();
    let nonce = conn.issue_nonce(REALM);

    for nc in 1..=3 {
        // later header values replace earlier ones on load
        conn.push_header("Authorization", api_header(&nonce, nc));

        let mut req = Request::with_connection(&conn);
        req.set_method("GET");
        req.set_path("/api");

        assert!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT).is_valid(), "nc {nc}");
    }
    assert_eq!(conn.nonce_checks(), 3);
}

#[test]
fn test_auth_int_covers_body() {
    let conn = MemoryConnection::new();
    let nonce = conn.issue_nonce(REALM);
    conn.push_header("Authorization", upload_header(&nonce, 1));

    let mut tampered = Request::with_connection(&conn);
    tampered.set_method("PUT");
    tampered.set_path("/upload");
    tampered.set_content("forged");
    assert_eq!(tampered.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Invalid);

    // the rejected attempt did not consume nc=1
    let mut req = Request::with_connection(&conn);
    req.set_method("PUT");
    req.set_path("/upload");
    req.set_content("payload");
    assert_eq!(req.check_digest_auth(REALM, PASSWORD, TIMEOUT), DigestOutcome::Valid);
}

#[test]
fn test_forged_high_nonce_count_does_not_lock_out_client() {
    let conn = MemoryConnection::new();
    let nonce = conn.issue_nonce(REALM);

    let forged = api_header(&nonce, u32::MAX).replace("response=\"", "response=\"00");
    conn.push_header("Authorization", forged);
    let outcome = api_request(&conn).check_digest_auth(REALM, PASSWORD, TIMEOUT);
    assert_eq!(outcome, DigestOutcome::Invalid);

    conn.push_header("Authorization", api_header(&nonce, 1));
    let outcome = api_request(&conn).check_digest_auth(REALM, PASSWORD, TIMEOUT);
    assert_eq!(outcome, DigestOutcome::Valid);
}

#[test]
fn test_nonce_without_count_cannot_be_replayed() {
    let conn = MemoryConnection::new();
    let nonce = conn.issue_nonce(REALM);
    conn.push_header("Authorization", legacy_header(&nonce, "/api"));

    let outcome = api_request(&conn).check_digest_auth(REALM, PASSWORD, TIMEOUT);
    assert_eq!(outcome, DigestOutcome::Valid);

    for _ in 0..3 {
        let outcome = api_request(&conn).check_digest_auth(REALM, PASSWORD, TIMEOUT);
        assert_eq!(outcome, DigestOutcome::Invalid);
    }
}
