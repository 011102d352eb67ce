//! Content store traits and shared error type.
//!
//! The migration talks to the remote store through two narrow traits:
//!
//! - [`ContentStore`] publishes collection schemas and creates records.
//! - [`AssetUploader`] uploads binary assets and hands back their identifiers.
//!
//! The production implementation of both is [`ApiClient`](crate::api::ApiClient).
//! Both traits require `Sync` because sibling pages are inserted from rayon
//! workers sharing one store.

use crate::schema::CollectionConfig;
use crate::types::{Record, RecordRef};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store call timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("response carried no identifier: {0}")]
    MissingId(String),
}

/// Record-level operations of the remote store.
pub trait ContentStore: Sync {
    /// Publish (create or replace) the schema of `collection`.
    fn set_config(&self, collection: &str, config: &CollectionConfig) -> Result<(), StoreError>;

    /// Create one record. Returns every record the store reports as created.
    fn create(&self, collection: &str, record: &Record) -> Result<Vec<RecordRef>, StoreError>;
}

/// Binary asset uploads.
pub trait AssetUploader: Sync {
    /// Upload the file at `path` and return the asset identifier.
    fn upload(&self, path: &Path) -> Result<String, StoreError>;
}
