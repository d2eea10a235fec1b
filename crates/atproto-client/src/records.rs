//! Record CRUD against a user's repository
//!
//! Writes always go to the session's hosting endpoint. Reads try the public
//! aggregator first (fast, best-effort, may lag or skip collections) and
//! fall back to the authoritative endpoint on any aggregator failure; only
//! a post-fallback failure surfaces to the caller.

use at_uri::AtUri;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::AtprotoClient;
use crate::error::{ClientError, Result};
use crate::xrpc::{fetch_json, server_message};

#[derive(Serialize)]
struct WriteRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    rkey: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a serde_json::Value>,
}

/// Reference to a written record
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub cid: Option<String>,
}

/// A record fetched by URI components
#[derive(Debug, Clone, Deserialize)]
pub struct FetchedRecord {
    pub uri: String,
    pub cid: Option<String>,
    pub value: serde_json::Value,
}

/// One entry from a collection listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListedRecord {
    pub uri: String,
    pub cid: Option<String>,
    pub value: serde_json::Value,
}

/// A page of listed records plus the cursor for the next page
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<ListedRecord>,
    pub cursor: Option<String>,
}

/// Pagination parameters for [`AtprotoClient::list_records`]
#[derive(Debug, Clone)]
pub struct ListParams {
    /// Page size; 50 is sent when unset
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    /// List newest-first when set (the rkey order is reversed)
    pub reverse: bool,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: None,
            cursor: None,
            reverse: true,
        }
    }
}

/// BlobRef returned by the hosting endpoint for an uploaded blob
#[derive(Debug, Deserialize)]
struct BlobResponse {
    blob: serde_json::Value,
}

impl AtprotoClient {
    /// Create a record in the session's repository.
    ///
    /// When `rkey` is not supplied, a sortable TID is generated so the
    /// returned URI is predictable and time-ordered.
    pub async fn create_record(
        &self,
        collection: &str,
        record: serde_json::Value,
        rkey: Option<&str>,
    ) -> Result<RecordRef> {
        let rkey = match rkey {
            Some(key) => key.to_string(),
            None => self.tid.next(),
        };
        self.write_record("com.atproto.repo.createRecord", collection, &rkey, Some(&record))
            .await
    }

    /// Upsert a record by explicit key (same key, same result)
    pub async fn put_record(
        &self,
        collection: &str,
        rkey: &str,
        record: serde_json::Value,
    ) -> Result<RecordRef> {
        self.write_record("com.atproto.repo.putRecord", collection, rkey, Some(&record))
            .await
    }

    /// Delete a record by key. Deleting an absent key is not an error.
    pub async fn delete_record(&self, collection: &str, rkey: &str) -> Result<()> {
        self.write_record("com.atproto.repo.deleteRecord", collection, rkey, None)
            .await?;
        Ok(())
    }

    async fn write_record(
        &self,
        operation: &str,
        collection: &str,
        rkey: &str,
        record: Option<&serde_json::Value>,
    ) -> Result<RecordRef> {
        if collection.is_empty() || rkey.is_empty() {
            return Err(ClientError::Validation(
                "collection and rkey are required".to_string(),
            ));
        }

        let session = self.require_session().await?;
        let url = format!("{}/xrpc/{operation}", session.pds);
        let body = WriteRecordRequest {
            repo: &session.did,
            collection,
            rkey,
            record,
        };

        let response = self.send_authorized(self.http.post(&url).json(&body)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            if let Some(message) = server_message(response).await {
                warn!(%status, %message, operation, "record write failed");
            }
            return Err(ClientError::Http(status));
        }

        // deleteRecord returns an empty body; synthesize the reference.
        if record.is_none() {
            return Ok(RecordRef {
                uri: format!("at://{}/{collection}/{rkey}", session.did),
                cid: None,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch one record from any repository, no authentication required
    pub async fn get_record(
        &self,
        did: &str,
        collection: &str,
        rkey: &str,
    ) -> Result<FetchedRecord> {
        let query = format!(
            "repo={}&collection={}&rkey={}",
            urlencoding::encode(did),
            urlencoding::encode(collection),
            urlencoding::encode(rkey)
        );
        let body = self
            .read_with_fallback(did, &format!("xrpc/com.atproto.repo.getRecord?{query}"))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// List records in one collection of any repository
    pub async fn list_records(
        &self,
        did: &str,
        collection: &str,
        params: &ListParams,
    ) -> Result<RecordPage> {
        let mut query = format!(
            "repo={}&collection={}&limit={}",
            urlencoding::encode(did),
            urlencoding::encode(collection),
            params.limit.unwrap_or(50)
        );
        if params.reverse {
            query.push_str("&reverse=true");
        }
        if let Some(ref cursor) = params.cursor {
            query.push_str(&format!("&cursor={}", urlencoding::encode(cursor)));
        }

        let body = self
            .read_with_fallback(did, &format!("xrpc/com.atproto.repo.listRecords?{query}"))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Two-tier read: aggregator first, authoritative endpoint on any
    /// aggregator failure. The aggregator's failure is never surfaced; a
    /// second failure is.
    async fn read_with_fallback(
        &self,
        did: &str,
        path_and_query: &str,
    ) -> Result<serde_json::Value> {
        match self.read_from(&self.appview_url, path_and_query).await {
            Ok(body) => Ok(body),
            Err(reason) => {
                debug!(%did, %reason, "aggregator read failed, trying authoritative endpoint");
                let pds = self.pds_for_did(did).await?;
                self.read_from(&pds, path_and_query).await
            }
        }
    }

    /// One read attempt against one origin
    async fn read_from(&self, base_url: &str, path_and_query: &str) -> Result<serde_json::Value> {
        fetch_json(&self.http, &format!("{base_url}/{path_and_query}")).await
    }

    /// The hosting endpoint for a DID: the session's own endpoint when it
    /// matches, else a cached identity, else a fresh resolution
    pub async fn pds_for_did(&self, did: &str) -> Result<String> {
        if let Some(session) = self.session.read().await.as_ref() {
            if session.did == did {
                return Ok(session.pds.clone());
            }
        }
        if let Some(identity) = self.resolver.cached_identity_for_did(did) {
            return Ok(identity.pds);
        }
        self.resolver.resolve_pds(did).await
    }

    /// Delete a parent record and the child records it references.
    ///
    /// Children are deleted first, best-effort: an individual child failure
    /// is logged and collected without aborting the rest or the parent.
    /// Returns the URIs of children that could not be deleted.
    pub async fn delete_record_with_children(
        &self,
        parent_collection: &str,
        parent_rkey: &str,
        child_uris: &[String],
    ) -> Result<Vec<String>> {
        let mut failed = Vec::new();

        for uri in child_uris {
            let outcome = match AtUri::parse(uri) {
                Ok(parsed) => self.delete_record(parsed.collection(), parsed.rkey()).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = outcome {
                warn!(%uri, error = %e, "failed to delete child record");
                failed.push(uri.clone());
            }
        }

        self.delete_record(parent_collection, parent_rkey).await?;
        Ok(failed)
    }

    /// Upload a binary blob to the session's repository, returning the
    /// BlobRef to embed in a record
    pub async fn upload_blob(&self, bytes: Vec<u8>, mime_type: &str) -> Result<serde_json::Value> {
        let session = self.require_session().await?;
        let url = format!("{}/xrpc/com.atproto.repo.uploadBlob", session.pds);

        let response = self
            .send_authorized(self.http.post(&url).header(CONTENT_TYPE, mime_type).body(bytes))
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            if let Some(message) = server_message(response).await {
                warn!(%status, %message, "blob upload failed");
            }
            return Err(ClientError::Http(status));
        }

        let data: BlobResponse = response.json().await?;
        Ok(data.blob)
    }

    /// URL for fetching a blob from a hosting endpoint
    pub fn blob_url(&self, did: &str, cid: &str, pds: &str) -> String {
        format!(
            "{}/xrpc/com.atproto.sync.getBlob?did={}&cid={}",
            pds.trim_end_matches('/'),
            urlencoding::encode(did),
            urlencoding::encode(cid)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_url_encodes_components() {
        let client = AtprotoClient::new();
        assert_eq!(
            client.blob_url("did:plc:abc123", "bafyblobcid", "https://pds.example/"),
            "https://pds.example/xrpc/com.atproto.sync.getBlob?did=did%3Aplc%3Aabc123&cid=bafyblobcid"
        );
    }

    #[test]
    fn test_list_params_default_is_newest_first() {
        let params = ListParams::default();
        assert!(params.reverse);
        assert!(params.limit.is_none());
        assert!(params.cursor.is_none());
    }
}
