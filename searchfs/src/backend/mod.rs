//! Search backend abstraction
//!
//! The filesystem never talks HTTP directly; it asks a [`SearchBackend`] to
//! run queries, describe schema blobs and read file bytes. `http` holds the
//! production client, tests plug in scripted backends.
pub mod http;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use types::{
    BlobRef, DescribeRequest, DescribeResponse, DescribeRule, DescribedBlob, DescribedPermanode,
    FileInfo, SchemaMeta, SearchQuery, SearchResult, SearchResultBlob,
};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend replied {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Runs a search and returns the matches plus their descriptions.
    async fn query(&self, query: &SearchQuery) -> Result<SearchResult, BackendError>;

    /// Fetches the schema blob behind `blob`.
    async fn fetch_schema_meta(&self, blob: &BlobRef) -> Result<SchemaMeta, BackendError>;

    /// Reads up to `size` bytes of the file `blob` starting at `offset`.
    async fn read_file(&self, blob: &BlobRef, offset: u64, size: u32)
    -> Result<Bytes, BackendError>;
}
