//! # Kirby Migrate
//!
//! Moves a flat-file content site into a remote content store. The content
//! directory is the data source: directories become pages, the `.txt` record
//! inside names the page's template, and the records' fields decide the shape
//! of the collections created in the store.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Scan     content/   →  page tree     (filesystem → structured pages)
//! 2. Infer    page tree  →  schemas       (field types per collection)
//! 3. Insert   schemas + page tree  →  store  (config, assets, records)
//! ```
//!
//! The first two stages are pure functions of the content directory, which is
//! why the `scan` and `schema` commands can show exactly what a migration would
//! send without touching the network. Only stage 3 talks to the store, and it
//! does so through the [`store::ContentStore`] and [`store::AssetUploader`]
//! traits so tests can run it against an in-memory double.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Depth-limited, name-ordered enumeration of record files and images |
//! | [`content`] | Parser for the `Key: value` / `----` record format |
//! | [`tree`] | Stage 1: builds the [`types::PageNode`] tree |
//! | [`schema`] | Stage 2: infers collection schemas and coerces values |
//! | [`pipeline`] | Stage 3: publishes schemas, uploads media, creates records |
//! | [`migrate`] | Runs the stages in order and reports the outcome |
//! | [`store`] | Store traits and [`store::StoreError`] |
//! | [`api`] | HTTP implementation of the store traits |
//! | [`config`] | TOML/JSON config loading, validation, and stock defaults |
//! | [`naming`] | `NN-name` directory convention, collection names, labels |
//! | [`types`] | Shared types: pages, attributes, field values, record refs |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Children Before Parents
//!
//! A parent record references its children by store id, and ids only exist
//! once a record is created. Insertion is therefore post-order: each page
//! waits for its whole subtree before it is created. Siblings are independent
//! and run in parallel on the rayon pool, sized by `processing.max_processes`.
//!
//! ## Partial Failure Over Abort
//!
//! A migration touches hundreds of records. One rejected record or one
//! timed-out upload is reported and skipped. A parent is never created with
//! a hole in its `children`: when a record below it fails, the parent and
//! its ancestors are skipped and reported, while every other subtree still
//! goes in. Only a failure to read the content directory stops the run, and
//! it stops it before anything is sent.
//!
//! ## Last Observation Wins
//!
//! Schemas are inferred from values, not declared. When two pages of one
//! collection disagree on a field's shape, the page observed last in tree
//! order decides, so a tree always infers to the same schemas.
//! There is no widening or merging of types: the source format has none to
//! offer, and the `schema` command shows the result before it is published.
//!
//! ## Append-Only Runs
//!
//! The store is never queried for existing records. Running a migration twice
//! creates every record twice. Point a migration at an empty database.

pub mod api;
pub mod config;
pub mod content;
pub mod migrate;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod tree;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
