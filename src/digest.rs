//! HTTP digest authentication (RFC 2617 / RFC 7616).
//!
//! ISAPI devices answer an unauthenticated request with
//! `401` + `WWW-Authenticate: Digest realm="…", qop="auth", nonce="…"`.
//! [`parse_challenge`] reads that header and [`authorization`] builds the
//! matching `Authorization` value for the follow-up request. Newer firmware
//! may ask for `algorithm=SHA-256`.

use log::debug;
use md5::{Digest, Md5};
use rand::Rng;
use sha2::{Sha256, Sha512};

use crate::error::{InventoryError, Result};

/// Nonce count; every challenge is answered exactly once.
const NONCE_COUNT: &str = "00000001";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
    Sha512,
    Sha512Sess,
}

impl Algorithm {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "MD5"          => Some(Algorithm::Md5),
            "MD5-SESS"     => Some(Algorithm::Md5Sess),
            "SHA-256"      => Some(Algorithm::Sha256),
            "SHA-256-SESS" => Some(Algorithm::Sha256Sess),
            "SHA-512"      => Some(Algorithm::Sha512),
            "SHA-512-SESS" => Some(Algorithm::Sha512Sess),
            _              => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Algorithm::Md5        => "MD5",
            Algorithm::Md5Sess    => "MD5-sess",
            Algorithm::Sha256     => "SHA-256",
            Algorithm::Sha256Sess => "SHA-256-sess",
            Algorithm::Sha512     => "SHA-512",
            Algorithm::Sha512Sess => "SHA-512-sess",
        }
    }

    fn is_sess(self) -> bool {
        matches!(self, Algorithm::Md5Sess | Algorithm::Sha256Sess | Algorithm::Sha512Sess)
    }

    /// Lowercase hex digest of `data` with this algorithm's hash.
    fn hex(self, data: &str) -> String {
        let data = data.as_bytes();
        match self {
            Algorithm::Md5 | Algorithm::Md5Sess       => format!("{:x}", Md5::digest(data)),
            Algorithm::Sha256 | Algorithm::Sha256Sess => format!("{:x}", Sha256::digest(data)),
            Algorithm::Sha512 | Algorithm::Sha512Sess => format!("{:x}", Sha512::digest(data)),
        }
    }
}

/// Parameters of a `WWW-Authenticate: Digest` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm:     String,
    pub nonce:     String,
    /// Raw `qop` option list, e.g. `auth,auth-int`.
    pub qop:       Option<String>,
    pub opaque:    Option<String>,
    pub algorithm: Algorithm,
}

impl DigestChallenge {
    /// Whether the server accepts `qop=auth`.
    pub fn offers_auth(&self) -> bool {
        self.qop
            .as_deref()
            .map(|q| q.split(',').any(|o| o.trim().eq_ignore_ascii_case("auth")))
            .unwrap_or(false)
    }
}

/// Returns `true` if a `WWW-Authenticate` value uses the Digest scheme.
///
/// The scheme token must be followed by whitespace or end the value.
pub fn is_digest(header: &str) -> bool {
    let header = header.trim_start();
    let scheme = header
        .get(..6)
        .map(|s| s.eq_ignore_ascii_case("digest"))
        .unwrap_or(false);
    scheme
        && header[6..]
            .chars()
            .next()
            .map_or(true, |c| c == ' ' || c == '\t')
}

/// Parse a `WWW-Authenticate` header value carrying a Digest challenge.
pub fn parse_challenge(header: &str) -> Result<DigestChallenge> {
    if !is_digest(header) {
        return Err(InventoryError::Auth(format!("not a Digest challenge: {header}")));
    }
    let params = &header.trim_start()[6..];

    let mut realm     = None;
    let mut nonce     = None;
    let mut qop       = None;
    let mut opaque    = None;
    let mut algorithm = Algorithm::Md5;

    for part in split_params(params) {
        let Some((key, value)) = part.split_once('=') else { continue };
        let key   = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"').to_string();

        match key.as_str() {
            "realm"  => realm  = Some(value),
            "nonce"  => nonce  = Some(value),
            "qop"    => qop    = Some(value),
            "opaque" => opaque = Some(value),
            "algorithm" => {
                algorithm = Algorithm::parse(&value).ok_or_else(|| {
                    InventoryError::Auth(format!("unsupported digest algorithm {value}"))
                })?;
            }
            _ => debug!("ignoring digest parameter {key}"),
        }
    }

    let realm = realm
        .ok_or_else(|| InventoryError::Auth(format!("missing 'realm' in challenge: {header}")))?;
    let nonce = nonce
        .filter(|n| !n.is_empty())
        .ok_or_else(|| InventoryError::Auth(format!("missing 'nonce' in challenge: {header}")))?;

    Ok(DigestChallenge { realm, nonce, qop, opaque, algorithm })
}

/// Split challenge parameters on commas that are not inside quotes.
fn split_params(s: &str) -> Vec<&str> {
    let mut parts  = Vec::new();
    let mut start  = 0;
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Fresh client nonce: 16 lowercase hex digits.
pub fn new_cnonce() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

/// Compute the `response` hash for a request.
///
/// `cnonce` is only used for `qop=auth` and the `-sess` algorithms.
pub fn response_hash(
    challenge: &DigestChallenge,
    username:  &str,
    password:  &str,
    method:    &str,
    uri:       &str,
    cnonce:    &str,
) -> Result<String> {
    let alg = challenge.algorithm;
    let mut ha1 = alg.hex(&format!("{username}:{}:{password}", challenge.realm));
    if alg.is_sess() {
        ha1 = alg.hex(&format!("{ha1}:{}:{cnonce}", challenge.nonce));
    }
    let ha2 = alg.hex(&format!("{method}:{uri}"));

    match &challenge.qop {
        None => Ok(alg.hex(&format!("{ha1}:{}:{ha2}", challenge.nonce))),
        Some(_) if challenge.offers_auth() => Ok(alg.hex(&format!(
            "{ha1}:{}:{NONCE_COUNT}:{cnonce}:auth:{ha2}",
            challenge.nonce
        ))),
        Some(q) => Err(InventoryError::Auth(format!("unsupported qop options: {q}"))),
    }
}

/// Build the `Authorization` header value answering `challenge`.
pub fn authorization(
    challenge: &DigestChallenge,
    username:  &str,
    password:  &str,
    method:    &str,
    uri:       &str,
    cnonce:    &str,
) -> Result<String> {
    let response = response_hash(challenge, username, password, method, uri, cnonce)?;

    let mut header = format!(
        "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", \
         algorithm={}, response=\"{response}\"",
        challenge.realm,
        challenge.nonce,
        challenge.algorithm.as_str(),
    );
    if challenge.qop.is_some() {
        header.push_str(&format!(", qop=auth, nc={NONCE_COUNT}, cnonce=\"{cnonce}\""));
    } else if challenge.algorithm.is_sess() {
        header.push_str(&format!(", cnonce=\"{cnonce}\""));
    }
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    Ok(header)
}
