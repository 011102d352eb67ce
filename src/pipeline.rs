//! Record insertion.
//!
//! Stage 3 of the migration. Publishes the inferred schemas, then walks the
//! page tree and creates one record per record page.
//!
//! ## Order of operations per page
//!
//! ```text
//! 1. insert children          (recursively; their refs are collected)
//! 2. upload the page's media  (failed uploads are dropped and reported)
//! 3. create the page record   (children → [{collection, _id}], images → [id],
//!                             each omitted when empty)
//! ```
//!
//! A record is only created after every one of its descendants has been
//! created, so its `children` field can reference all of them. Siblings have
//! no ordering constraint and are inserted in parallel on the rayon pool.
//!
//! ## Failure policy
//!
//! Nothing aborts the run. A failed upload removes that asset from the
//! record. A failed create is reported against its page, and every ancestor
//! of that page is skipped rather than created with a partial `children`
//! list. Siblings and unrelated subtrees carry on. Media pages are never
//! inserted.
//!
//! Re-running against the same store appends a second copy of every record.

use crate::schema::CollectionSchema;
use crate::store::{AssetUploader, ContentStore};
use crate::types::{FieldValue, PageNode, Record, RecordRef};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

/// Progress events, sent as they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrateEvent {
    SchemaPublished {
        collection: String,
        fields: usize,
    },
    SchemaFailed {
        collection: String,
        error: String,
    },
    RecordCreated {
        collection: String,
        url: String,
        ids: Vec<String>,
    },
    RecordFailed {
        collection: String,
        url: String,
        error: String,
    },
    /// Not created because a record below it failed.
    RecordSkipped {
        collection: String,
        url: String,
        reason: String,
    },
    AssetFailed {
        url: String,
        path: PathBuf,
        error: String,
    },
}

/// Counts gathered over one insertion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
    pub assets_uploaded: usize,
    pub assets_failed: usize,
}

/// Outcome of inserting one list of sibling pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inserted {
    /// Refs of the records created for the listed pages, in page order.
    pub refs: Vec<RecordRef>,
    /// False when any create in these subtrees failed or was skipped.
    pub complete: bool,
}

/// Publish every schema. Returns how many were accepted.
pub fn publish_schemas(
    store: &impl ContentStore,
    schemas: &[CollectionSchema],
    events: Option<&Sender<MigrateEvent>>,
) -> usize {
    let mut published = 0;
    for schema in schemas {
        let event = match store.set_config(&schema.name, &schema.to_config()) {
            Ok(()) => {
                published += 1;
                MigrateEvent::SchemaPublished {
                    collection: schema.name.clone(),
                    fields: schema.fields.len(),
                }
            }
            Err(e) => {
                tracing::error!(collection = %schema.name, error = %e, "schema publish failed");
                MigrateEvent::SchemaFailed {
                    collection: schema.name.clone(),
                    error: e.to_string(),
                }
            }
        };
        if let Some(tx) = events {
            tx.send(event).ok();
        }
    }
    published
}

/// Inserts page trees into a store.
pub struct Inserter<'a, S, U> {
    store: &'a S,
    uploader: &'a U,
    media_root: PathBuf,
    events: Option<Sender<MigrateEvent>>,
    created: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    assets_uploaded: AtomicUsize,
    assets_failed: AtomicUsize,
}

impl<'a, S: ContentStore, U: AssetUploader> Inserter<'a, S, U> {
    /// Media paths of pages are resolved against `media_root`.
    pub fn new(store: &'a S, uploader: &'a U, media_root: &Path) -> Self {
        Self {
            store,
            uploader,
            media_root: media_root.to_path_buf(),
            events: None,
            created: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            assets_uploaded: AtomicUsize::new(0),
            assets_failed: AtomicUsize::new(0),
        }
    }

    pub fn with_events(mut self, events: Option<Sender<MigrateEvent>>) -> Self {
        self.events = events;
        self
    }

    /// Insert top-level pages. Returns refs of the records created directly
    /// for `pages`, in page order.
    pub fn insert_items(&self, pages: &[PageNode]) -> Vec<RecordRef> {
        self.insert_siblings(pages).refs
    }

    /// Insert the children of one page. Media pages contribute no ref and
    /// never make the outcome incomplete.
    pub fn insert_children(&self, children: &[PageNode]) -> Inserted {
        self.insert_siblings(children)
    }

    pub fn stats(&self) -> InsertStats {
        InsertStats {
            created: self.created.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            assets_uploaded: self.assets_uploaded.load(Ordering::Relaxed),
            assets_failed: self.assets_failed.load(Ordering::Relaxed),
        }
    }

    fn insert_siblings(&self, pages: &[PageNode]) -> Inserted {
        pages
            .par_iter()
            .map(|page| self.insert_page(page))
            .collect::<Vec<_>>()
            .into_iter()
            .fold(
                Inserted {
                    refs: Vec::new(),
                    complete: true,
                },
                |mut acc, page| {
                    acc.refs.extend(page.refs);
                    acc.complete &= page.complete;
                    acc
                },
            )
    }

    fn insert_page(&self, page: &PageNode) -> Inserted {
        if page.is_media_page() {
            tracing::debug!(uid = %page.uid, template = %page.template, "media page not inserted");
            return Inserted {
                refs: Vec::new(),
                complete: true,
            };
        }

        let children = page
            .children
            .as_deref()
            .map(|children| self.insert_children(children))
            .unwrap_or(Inserted {
                refs: Vec::new(),
                complete: true,
            });

        let collection = page.collection();
        if !children.complete {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%collection, url = %page.url, "record skipped, a descendant failed");
            self.emit(MigrateEvent::RecordSkipped {
                collection,
                url: page.url.clone(),
                reason: "failed descendant".to_string(),
            });
            return Inserted::default();
        }

        let asset_ids = self.upload_media(page);
        let record = build_record(page, children.refs, asset_ids);

        let refs = match self.store.create(&collection, &record) {
            Ok(refs) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%collection, url = %page.url, records = refs.len(), "record created");
                self.emit(MigrateEvent::RecordCreated {
                    collection,
                    url: page.url.clone(),
                    ids: refs.iter().map(|r| r.id.clone()).collect(),
                });
                refs
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(%collection, url = %page.url, error = %e, "record create failed");
                self.emit(MigrateEvent::RecordFailed {
                    collection,
                    url: page.url.clone(),
                    error: e.to_string(),
                });
                return Inserted::default();
            }
        };
        Inserted {
            refs,
            complete: true,
        }
    }

    fn upload_media(&self, page: &PageNode) -> Vec<String> {
        page.media
            .iter()
            .filter_map(|rel| {
                let path = self.media_root.join(rel);
                match self.uploader.upload(&path) {
                    Ok(id) => {
                        self.assets_uploaded.fetch_add(1, Ordering::Relaxed);
                        Some(id)
                    }
                    Err(e) => {
                        self.assets_failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(path = %path.display(), error = %e, "asset upload failed");
                        self.emit(MigrateEvent::AssetFailed {
                            url: page.url.clone(),
                            path: rel.clone(),
                            error: e.to_string(),
                        });
                        None
                    }
                }
            })
            .collect()
    }

    fn emit(&self, event: MigrateEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}

/// The record for `page`: its attributes, plus `children` and `images` when
/// at least one child was created or one asset uploaded.
fn build_record(page: &PageNode, child_refs: Vec<RecordRef>, asset_ids: Vec<String>) -> Record {
    let mut record = page.attributes.clone();
    record.remove("children");
    record.remove("images");
    if !child_refs.is_empty() {
        record.insert("children", FieldValue::Records(child_refs));
    }
    if !asset_ids.is_empty() {
        record.insert("images", FieldValue::Assets(asset_ids));
    }
    record
}
