//! Migration orchestration: scan → infer → publish → insert.
//!
//! [`plan`] runs the two offline stages and is what the `scan` and `schema`
//! commands print. [`migrate`] adds the store stages against the configured
//! API; [`migrate_with_store`] takes any store, which is how tests run the
//! whole migration without a network.

use crate::api::ApiClient;
use crate::config::MigrateConfig;
use crate::pipeline::{InsertStats, Inserter, MigrateEvent, publish_schemas};
use crate::schema::{CollectionSchema, SchemaRegistry};
use crate::store::{AssetUploader, ContentStore, StoreError};
use crate::tree::{TreeError, TreeOptions, build_tree};
use crate::types::{PageNode, RecordRef};
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("{0}")]
    Tree(#[from] TreeError),
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Page tree with values coerced, plus the schemas inferred from it.
#[derive(Debug)]
pub struct Plan {
    pub pages: Vec<PageNode>,
    pub schemas: Vec<CollectionSchema>,
}

/// Outcome of a full migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub collections: usize,
    pub schemas_published: usize,
    pub stats: InsertStats,
    /// Records created for the top-level pages.
    pub top_level: Vec<RecordRef>,
}

/// Build the page tree under `content` and infer its schemas.
pub fn plan(
    content: &Path,
    media_root: &Path,
    config: &MigrateConfig,
) -> Result<Plan, MigrateError> {
    let options = TreeOptions::new(media_root).with_page_key(config.scan.page_key.clone());
    let mut pages = build_tree(content, &options)?;

    let registry =
        SchemaRegistry::new(&config.schema).with_page_meta(config.scan.include_page_meta);
    registry.infer(&mut pages);

    Ok(Plan {
        pages,
        schemas: registry.snapshot(),
    })
}

/// Migrate `content` into the store described by `config.api`.
pub fn migrate(
    config: &MigrateConfig,
    content: &Path,
    media_root: &Path,
    events: Option<Sender<MigrateEvent>>,
) -> Result<MigrationReport, MigrateError> {
    let client = ApiClient::new(&config.api)?;
    migrate_with_store(&client, &client, config, content, media_root, events)
}

/// Migrate using a specific store (allows testing with a mock).
pub fn migrate_with_store(
    store: &impl ContentStore,
    uploader: &impl AssetUploader,
    config: &MigrateConfig,
    content: &Path,
    media_root: &Path,
    events: Option<Sender<MigrateEvent>>,
) -> Result<MigrationReport, MigrateError> {
    let plan = plan(content, media_root, config)?;
    tracing::info!(
        pages = plan.pages.len(),
        collections = plan.schemas.len(),
        "content scanned"
    );

    let schemas_published = publish_schemas(store, &plan.schemas, events.as_ref());

    let inserter = Inserter::new(store, uploader, media_root).with_events(events);
    let top_level = inserter.insert_items(&plan.pages);
    let stats = inserter.stats();
    tracing::info!(
        created = stats.created,
        failed = stats.failed,
        skipped = stats.skipped,
        assets_failed = stats.assets_failed,
        "insertion finished"
    );

    Ok(MigrationReport {
        collections: plan.schemas.len(),
        schemas_published,
        stats,
        top_level,
    })
}
