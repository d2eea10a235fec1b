//! AT Protocol identity resolution
//!
//! Maps a handle to its DID through the public directory lookup, then maps
//! the DID to its hosting endpoint (PDS) by fetching the DID document —
//! from the global plc directory for `did:plc:*`, or from the DID-derived
//! host's `did.json` for `did:web:*`. Successful resolutions are memoized
//! by handle for the lifetime of the resolver; failures are never cached.

use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::xrpc::fetch_json;

pub(crate) const DEFAULT_APPVIEW_URL: &str = "https://public.api.bsky.app";
pub(crate) const DEFAULT_PLC_DIRECTORY_URL: &str = "https://plc.directory";

/// Service type marking the account's personal data host in a DID document
const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";

/// A resolved identity: the durable DID plus its current hosting endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub did: String,
    pub pds: String,
}

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidDocument {
    service: Option<Vec<DidService>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidService {
    r#type: String,
    service_endpoint: String,
}

/// Resolves handles to DIDs and DIDs to hosting endpoints
pub struct IdentityResolver {
    http: reqwest::Client,
    appview_url: String,
    plc_directory_url: String,
    cache: Cache<String, Identity>,
}

impl IdentityResolver {
    /// Create a resolver against the public appview and plc directory
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_APPVIEW_URL, DEFAULT_PLC_DIRECTORY_URL)
    }

    /// Create a resolver with custom directory URLs
    pub fn with_urls(appview_url: &str, plc_directory_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self::with_http(http, appview_url, plc_directory_url)
    }

    pub(crate) fn with_http(
        http: reqwest::Client,
        appview_url: &str,
        plc_directory_url: &str,
    ) -> Self {
        // No TTL: identities are cached for the resolver's lifetime. A stale
        // endpoint after an account migration is handled by retry at the
        // call site, not by cache eviction.
        let cache = Cache::builder().max_capacity(10_000).build();

        Self {
            http,
            appview_url: appview_url.trim_end_matches('/').to_string(),
            plc_directory_url: plc_directory_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    /// Resolve a handle to its DID
    pub async fn resolve_handle(&self, handle: &str) -> Result<String> {
        let url = format!(
            "{}/xrpc/com.atproto.identity.resolveHandle?handle={}",
            self.appview_url,
            urlencoding::encode(handle)
        );
        let body = match fetch_json(&self.http, &url).await {
            Ok(body) => body,
            Err(ClientError::Http(status)) => {
                return Err(ClientError::Identity(format!(
                    "could not resolve handle {handle} ({status})"
                )))
            }
            Err(e) => return Err(e),
        };
        let resolved: ResolveHandleResponse = serde_json::from_value(body)?;
        Ok(resolved.did)
    }

    /// Resolve a DID to its hosting endpoint
    pub async fn resolve_pds(&self, did: &str) -> Result<String> {
        let url = if did.starts_with("did:plc:") {
            format!("{}/{}", self.plc_directory_url, did)
        } else if did.starts_with("did:web:") {
            did_web_document_url(did)?
        } else {
            return Err(ClientError::Identity(format!(
                "unsupported DID method: {did}"
            )));
        };

        let body = match fetch_json(&self.http, &url).await {
            Ok(body) => body,
            Err(ClientError::Http(status)) => {
                return Err(ClientError::Identity(format!(
                    "could not resolve DID {did} ({status})"
                )))
            }
            Err(e) => return Err(e),
        };
        let doc: DidDocument = serde_json::from_value(body)?;

        doc.service
            .unwrap_or_default()
            .into_iter()
            .find(|s| s.r#type == PDS_SERVICE_TYPE)
            .map(|s| s.service_endpoint)
            .ok_or_else(|| ClientError::Identity("no PDS endpoint in DID document".to_string()))
    }

    /// Resolve a handle to `{did, pds}`, memoized by handle
    pub async fn resolve_identity(&self, handle: &str) -> Result<Identity> {
        if let Some(cached) = self.cache.get(handle).await {
            return Ok(cached);
        }

        let did = self.resolve_handle(handle).await?;
        let pds = self.resolve_pds(&did).await?;
        let identity = Identity { did, pds };

        debug!(handle, did = %identity.did, pds = %identity.pds, "resolved identity");
        self.cache
            .insert(handle.to_string(), identity.clone())
            .await;
        Ok(identity)
    }

    /// Look up an already-resolved identity by DID without touching the network
    pub(crate) fn cached_identity_for_did(&self, did: &str) -> Option<Identity> {
        self.cache
            .iter()
            .find(|(_, identity)| identity.did == did)
            .map(|(_, identity)| identity)
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the DID document URL for a `did:web` DID.
///
/// Colon-separated segments after the method become path segments; a port
/// belongs to the host only when percent-encoded as `%3A` in the first
/// segment (the DID-web rule — a bare `:8080` segment is a path segment,
/// not a port). Bare-domain DIDs read `/.well-known/did.json`, path-bearing
/// DIDs read `/<path…>/did.json`.
fn did_web_document_url(did: &str) -> Result<String> {
    let suffix = did
        .strip_prefix("did:web:")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ClientError::Identity(format!("unsupported DID method: {did}")))?;

    let mut segments = suffix.split(':');
    let host = segments
        .next()
        .unwrap_or_default()
        .replace("%3A", ":")
        .replace("%3a", ":");
    let path: Vec<&str> = segments.collect();

    if path.is_empty() {
        Ok(format!("https://{host}/.well-known/did.json"))
    } else {
        Ok(format!("https://{host}/{}/did.json", path.join("/")))
    }
}
