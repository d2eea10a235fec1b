//! AT Protocol client
//!
//! Resolves decentralized identities (handle → DID → hosting endpoint),
//! manages one bearer-token session per client, and performs record CRUD in
//! a user's repository. Reads prefer the public aggregator and fall back to
//! the authoritative hosting endpoint; every outbound call retries on rate
//! limiting with bounded exponential backoff.

mod batch;
mod client;
mod error;
mod identity;
mod records;
mod session;
mod tid;
mod xrpc;

pub use batch::map_concurrent;
pub use client::AtprotoClient;
pub use error::{ClientError, Result};
pub use identity::{Identity, IdentityResolver};
pub use records::{FetchedRecord, ListParams, ListedRecord, RecordPage, RecordRef};
pub use session::Session;
pub use tid::TidGenerator;
pub use xrpc::fetch_json;
