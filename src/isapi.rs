//! Hikvision ISAPI client: fetches a device's streaming channel list.
//!
//! Devices require HTTP digest auth. The first request goes out without
//! credentials; a `401` Digest challenge is answered by one authenticated
//! re-request. A second `401` is reported as a failure.

use std::time::Duration;

use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::config::BranchDescriptor;
use crate::digest;
use crate::error::{InventoryError, Result};

/// ISAPI resource listing every configured streaming channel.
pub const STREAMING_CHANNELS_PATH: &str = "/ISAPI/Streaming/channels";

/// Something that can produce the raw channel document for a branch.
pub trait ChannelSource {
    async fn fetch_channels(&self, branch: &BranchDescriptor) -> Result<Value>;
}

/// Live device access over HTTP.
pub struct IsapiClient {
    http: Client,
}

impl IsapiClient {
    /// Build the HTTP client shared by every branch of a run.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(InventoryError::Http)?;
        Ok(Self { http })
    }

    async fn get(&self, url: &str, authorization: Option<String>) -> Result<Response> {
        let mut req = self.http.get(url).header(ACCEPT, "application/json");
        if let Some(auth) = authorization {
            req = req.header(AUTHORIZATION, auth);
        }
        Ok(req.send().await?)
    }
}

impl ChannelSource for IsapiClient {
    async fn fetch_channels(&self, branch: &BranchDescriptor) -> Result<Value> {
        let url = format!("http://{}:{}{}", branch.ip, branch.port, STREAMING_CHANNELS_PATH);

        let mut resp = self.get(&url, None).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            let challenge = digest_challenge(&resp)?;
            debug!(
                "digest challenge from {}: realm={:?} qop={:?} algorithm={:?}",
                branch.ip, challenge.realm, challenge.qop, challenge.algorithm
            );
            let auth = digest::authorization(
                &challenge,
                &branch.username,
                &branch.password,
                "GET",
                STREAMING_CHANNELS_PATH,
                &digest::new_cnonce(),
            )?;
            resp = self.get(&url, Some(auth)).await?;
        }

        let status = resp.status();
        debug!("GET {url} → {status}");
        if !status.is_success() {
            return Err(InventoryError::Status {
                host:   branch.ip.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Pick the Digest challenge out of a `401` response.
fn digest_challenge(resp: &Response) -> Result<digest::DigestChallenge> {
    let header = resp
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| digest::is_digest(v))
        .ok_or_else(|| {
            InventoryError::Auth("401 Unauthorized without a Digest challenge".into())
        })?;
    digest::parse_challenge(header)
}
