//! Strict parser and formatter for AT Protocol URIs
//!
//! An AT URI has exactly three segments: `at://<did>/<collection>/<rkey>`.
//! The did names the owning repository, the collection names the record's
//! schema, and the rkey names the specific item. Anything that is not this
//! exact shape is rejected outright — a malformed URI never yields partial
//! components.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static AT_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^at://([^/]+)/([^/]+)/([^/]+)$").unwrap());

/// Error returned for input that does not match the three-segment AT URI shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUriError {
    input: String,
}

impl AtUriError {
    /// The offending input, verbatim
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for AtUriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid AT URI: {:?}", self.input)
    }
}

impl std::error::Error for AtUriError {}

/// Parsed components of an AT Protocol URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtUri {
    did: String,
    collection: String,
    rkey: String,
}

impl AtUri {
    /// Build a URI from its components, rejecting empty or slash-bearing segments
    pub fn new(did: &str, collection: &str, rkey: &str) -> Result<Self, AtUriError> {
        for segment in [did, collection, rkey] {
            if segment.is_empty() || segment.contains('/') {
                return Err(AtUriError {
                    input: format!("at://{did}/{collection}/{rkey}"),
                });
            }
        }
        Ok(Self {
            did: did.to_string(),
            collection: collection.to_string(),
            rkey: rkey.to_string(),
        })
    }

    /// Parse an AT Protocol URI like `at://did:plc:xxx/collection/rkey`
    pub fn parse(uri: &str) -> Result<Self, AtUriError> {
        let caps = AT_URI_RE.captures(uri).ok_or_else(|| AtUriError {
            input: uri.to_string(),
        })?;
        Ok(Self {
            did: caps[1].to_string(),
            collection: caps[2].to_string(),
            rkey: caps[3].to_string(),
        })
    }

    /// The repository-owning DID
    pub fn did(&self) -> &str {
        &self.did
    }

    /// The namespaced collection (record type tag)
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The record key within the collection
    pub fn rkey(&self) -> &str {
        &self.rkey
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.did, self.collection, self.rkey)
    }
}

impl std::str::FromStr for AtUri {
    type Err = AtUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
