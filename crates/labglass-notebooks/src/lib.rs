//! LABGLASS notebook records on the AT Protocol
//!
//! Typed views over the notebook and cell collections, plus the
//! save/load/list/delete flows. The generic record client stays payload-
//! agnostic; the schema knowledge lives here.

mod store;
mod types;

pub use store::{NotebookStore, CELL_COLLECTION, NOTEBOOK_COLLECTION};
pub use types::{
    Cell, CellDraft, LoadedNotebook, Notebook, NotebookPage, NotebookSummary, SavedNotebook,
};
