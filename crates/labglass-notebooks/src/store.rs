//! Notebook save/load/list/delete flows
//!
//! A notebook is stored as one envelope record referencing many cell
//! records by URI. Saving creates the cells first, then the envelope;
//! deleting removes the cells first (best-effort), then the envelope.

use std::sync::Arc;

use at_uri::AtUri;
use chrono::Utc;
use tracing::warn;

use atproto_client::{map_concurrent, AtprotoClient, ClientError, ListParams, Result};

use crate::types::{
    Cell, CellDraft, LoadedNotebook, Notebook, NotebookPage, NotebookSummary, SavedNotebook,
};

pub const NOTEBOOK_COLLECTION: &str = "com.minomobi.labglass.notebook";
pub const CELL_COLLECTION: &str = "com.minomobi.labglass.cell";

/// Text output larger than this is dropped rather than stored in the record
const MAX_TEXT_OUTPUT_CHARS: usize = 100_000;

const CELL_FETCH_CONCURRENCY: usize = 8;

/// Notebook operations against a user's repository
pub struct NotebookStore {
    client: Arc<AtprotoClient>,
}

impl NotebookStore {
    pub fn new(client: Arc<AtprotoClient>) -> Self {
        Self { client }
    }

    /// Save a notebook to the logged-in user's repository.
    ///
    /// Creates one cell record per draft (uploading figure bytes as blobs),
    /// then the envelope referencing the cell URIs.
    pub async fn save_notebook(
        &self,
        title: &str,
        description: &str,
        cells: Vec<CellDraft>,
        tags: Vec<String>,
    ) -> Result<SavedNotebook> {
        let now = Utc::now();
        let mut cell_uris = Vec::with_capacity(cells.len());

        for (position, draft) in cells.into_iter().enumerate() {
            let name = draft
                .name
                .unwrap_or_else(|| format!("{}_{}", draft.cell_type, position));
            let mut cell = Cell {
                cell_type: draft.cell_type,
                source: draft.source,
                name,
                created_at: now,
                position: position as u32,
                text_output: draft
                    .text_output
                    .filter(|t| t.len() < MAX_TEXT_OUTPUT_CHARS),
                figure_blob: None,
            };
            if let Some((bytes, mime_type)) = draft.figure {
                cell.figure_blob = Some(self.client.upload_blob(bytes, &mime_type).await?);
            }

            let created = self
                .client
                .create_record(CELL_COLLECTION, serde_json::to_value(&cell)?, None)
                .await?;
            cell_uris.push(created.uri);
        }

        let envelope = Notebook {
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
            visibility: "public".to_string(),
            cells: cell_uris.clone(),
            tags: if tags.is_empty() { None } else { Some(tags) },
        };
        let created = self
            .client
            .create_record(NOTEBOOK_COLLECTION, serde_json::to_value(&envelope)?, None)
            .await?;

        Ok(SavedNotebook {
            uri: created.uri,
            cid: created.cid,
            cell_uris,
        })
    }

    /// Load a notebook from any user's repository.
    ///
    /// Cells are fetched concurrently; a cell that fails to load becomes a
    /// markdown placeholder instead of failing the whole notebook.
    pub async fn load_notebook(&self, handle_or_did: &str, rkey: &str) -> Result<LoadedNotebook> {
        let did = if handle_or_did.starts_with("did:") {
            handle_or_did.to_string()
        } else {
            self.client
                .resolver()
                .resolve_identity(handle_or_did)
                .await?
                .did
        };

        let fetched = self
            .client
            .get_record(&did, NOTEBOOK_COLLECTION, rkey)
            .await?;
        let notebook: Notebook = serde_json::from_value(fetched.value)?;

        let entries: Vec<(usize, String)> =
            notebook.cells.iter().cloned().enumerate().collect();
        let client = &self.client;
        let cells = map_concurrent(entries, CELL_FETCH_CONCURRENCY, |(position, uri)| {
            async move { load_cell(client, position, uri).await }
        })
        .await;

        Ok(LoadedNotebook {
            uri: fetched.uri,
            cid: fetched.cid,
            notebook,
            cells,
        })
    }

    /// List notebooks from a user's repository, newest first
    pub async fn list_notebooks(
        &self,
        handle: &str,
        limit: Option<u32>,
        cursor: Option<String>,
    ) -> Result<NotebookPage> {
        let identity = self.client.resolver().resolve_identity(handle).await?;
        let page = self
            .client
            .list_records(
                &identity.did,
                NOTEBOOK_COLLECTION,
                &ListParams {
                    limit,
                    cursor,
                    reverse: true,
                },
            )
            .await?;

        let mut notebooks = Vec::with_capacity(page.records.len());
        for record in page.records {
            let rkey = match AtUri::parse(&record.uri) {
                Ok(parsed) => parsed.rkey().to_string(),
                Err(e) => {
                    warn!(uri = %record.uri, error = %e, "skipping listing entry with bad URI");
                    continue;
                }
            };
            let notebook: Notebook = match serde_json::from_value(record.value) {
                Ok(notebook) => notebook,
                Err(e) => {
                    warn!(uri = %record.uri, error = %e, "skipping malformed notebook record");
                    continue;
                }
            };
            notebooks.push(NotebookSummary {
                uri: record.uri,
                cid: record.cid,
                rkey,
                notebook,
            });
        }

        Ok(NotebookPage {
            notebooks,
            cursor: page.cursor,
        })
    }

    /// Delete a notebook and its cells from the logged-in user's repository.
    ///
    /// Cells that fail to delete are returned, not fatal; the envelope is
    /// deleted regardless.
    pub async fn delete_notebook(&self, rkey: &str) -> Result<Vec<String>> {
        let session = self
            .client
            .session()
            .await
            .ok_or_else(|| ClientError::Auth("not logged in".to_string()))?;

        let fetched = self
            .client
            .get_record(&session.did, NOTEBOOK_COLLECTION, rkey)
            .await?;
        let notebook: Notebook = serde_json::from_value(fetched.value)?;

        self.client
            .delete_record_with_children(NOTEBOOK_COLLECTION, rkey, &notebook.cells)
            .await
    }
}

async fn load_cell(client: &AtprotoClient, position: usize, uri: String) -> Cell {
    let loaded: Result<Cell> = match AtUri::parse(&uri) {
        Ok(parsed) => match client
            .get_record(parsed.did(), parsed.collection(), parsed.rkey())
            .await
        {
            Ok(record) => serde_json::from_value(record.value).map_err(Into::into),
            Err(e) => Err(e),
        },
        Err(e) => Err(e.into()),
    };

    loaded.unwrap_or_else(|e| {
        warn!(%uri, error = %e, "failed to load cell");
        Cell {
            cell_type: "markdown".to_string(),
            source: format!("*Cell failed to load: {uri}*"),
            name: "error".to_string(),
            created_at: Utc::now(),
            position: position as u32,
            text_output: None,
            figure_blob: None,
        }
    })
}
