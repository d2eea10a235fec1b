use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One notebook cell record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub cell_type: String,
    pub source: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_output: Option<String>,
    /// BlobRef for a rendered figure, if one was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figure_blob: Option<serde_json::Value>,
}

/// The notebook envelope record, referencing its cells by URI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub visibility: String,
    #[serde(default)]
    pub cells: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Input for one cell when saving a notebook
#[derive(Debug, Clone, Default)]
pub struct CellDraft {
    pub cell_type: String,
    pub source: String,
    pub name: Option<String>,
    pub text_output: Option<String>,
    /// Rendered figure bytes plus MIME type, uploaded as a blob
    pub figure: Option<(Vec<u8>, String)>,
}

/// Result of saving a notebook
#[derive(Debug, Clone)]
pub struct SavedNotebook {
    pub uri: String,
    pub cid: Option<String>,
    pub cell_uris: Vec<String>,
}

/// A notebook loaded with its cells in display order
#[derive(Debug, Clone)]
pub struct LoadedNotebook {
    pub uri: String,
    pub cid: Option<String>,
    pub notebook: Notebook,
    pub cells: Vec<Cell>,
}

/// One entry from a notebook listing
#[derive(Debug, Clone)]
pub struct NotebookSummary {
    pub uri: String,
    pub cid: Option<String>,
    pub rkey: String,
    pub notebook: Notebook,
}

/// A page of notebook summaries
#[derive(Debug, Clone)]
pub struct NotebookPage {
    pub notebooks: Vec<NotebookSummary>,
    pub cursor: Option<String>,
}
