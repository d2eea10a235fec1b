//! The client struct and its construction

use std::time::Duration;

use tokio::sync::RwLock;

use crate::identity::{IdentityResolver, DEFAULT_APPVIEW_URL, DEFAULT_PLC_DIRECTORY_URL};
use crate::session::Session;
use crate::tid::TidGenerator;

/// AT Protocol client: identity resolution, one authenticated session, and
/// record CRUD against a user's hosting endpoint.
///
/// Each client instance owns its identity cache and session state, so
/// multiple clients (and therefore multiple logged-in identities) can
/// coexist in one process.
pub struct AtprotoClient {
    pub(crate) http: reqwest::Client,
    pub(crate) appview_url: String,
    pub(crate) resolver: IdentityResolver,
    pub(crate) session: RwLock<Option<Session>>,
    pub(crate) tid: TidGenerator,
}

impl AtprotoClient {
    /// Create a client against the public appview and plc directory
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_APPVIEW_URL, DEFAULT_PLC_DIRECTORY_URL)
    }

    /// Create a client with custom aggregator and directory URLs
    pub fn with_urls(appview_url: &str, plc_directory_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            resolver: IdentityResolver::with_http(http.clone(), appview_url, plc_directory_url),
            http,
            appview_url: appview_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            tid: TidGenerator::new(),
        }
    }

    /// The identity resolver backing this client
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }
}

impl Default for AtprotoClient {
    fn default() -> Self {
        Self::new()
    }
}
