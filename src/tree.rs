//! Content directory scanning.
//!
//! Stage 1 of the migration. Turns the content directory into a tree of
//! [`PageNode`]s that the schema engine and the insertion pipeline consume.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                         # Content root (not a page itself)
//! ├── 1-home/
//! │   └── home.txt                 # Page record, template "home"
//! ├── 2-projects/
//! │   ├── projects.txt
//! │   ├── 1-bridge/                # Child page
//! │   │   ├── project.txt
//! │   │   ├── 1-span.jpg           # Media (JPEG/PNG next to the record)
//! │   │   └── 1-span.jpg.txt       # Media metadata: becomes a media page
//! │   └── 2-tower/
//! │       └── project.txt
//! └── drafts/                      # No number prefix = hidden page
//!     └── article.txt
//! ```
//!
//! ## Rules
//!
//! - Every `*.txt` file one level below a directory is a page of that
//!   directory's level. A directory holding several records yields one page
//!   per record.
//! - `uid` is the directory name; `visible` and `url` follow the
//!   `<digits>-name` convention in [`naming`](crate::naming).
//! - `template` is the record's file name without `.txt`.
//! - Media paths are stored relative to the media root.
//! - `children` is omitted when a page has no child pages. Media pages never
//!   descend.
//! - Siblings are ordered by number prefix, then name.
//!
//! Any filesystem error aborts the build and is returned to the caller.

use crate::content;
use crate::naming::{self, parse_entry_name};
use crate::types::PageNode;
use crate::walk::{Entry, WalkError, Walker};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("{0}")]
    Walk(#[from] WalkError),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tree build settings.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Media paths are stored relative to this directory.
    pub media_root: PathBuf,
    /// Only pages whose parent path contains this key are kept.
    pub page_key: Option<String>,
}

impl TreeOptions {
    pub fn new(media_root: &Path) -> Self {
        Self {
            media_root: media_root.to_path_buf(),
            page_key: None,
        }
    }

    pub fn with_page_key(mut self, key: Option<String>) -> Self {
        self.page_key = key;
        self
    }
}

/// Build the page tree under `root`.
///
/// Returns the top-level pages; the root directory itself is not a page.
/// Relative roots are resolved against the working directory, so every
/// `directory` in the tree is absolute.
pub fn build_tree(root: &Path, options: &TreeOptions) -> Result<Vec<PageNode>, TreeError> {
    let absolute = |path: &Path| {
        std::path::absolute(path).map_err(|source| TreeError::Read {
            path: path.to_path_buf(),
            source,
        })
    };
    let root = absolute(root)?;
    let options = TreeOptions {
        media_root: absolute(&options.media_root)?,
        page_key: options.page_key.clone(),
    };
    let pages = build_pages(&root, &options)?;
    tracing::debug!(root = %root.display(), pages = pages.len(), "page tree built");
    Ok(pages)
}

fn build_pages(dir: &Path, options: &TreeOptions) -> Result<Vec<PageNode>, TreeError> {
    let mut pages = Vec::new();
    for entry in Walker::content_files(dir)
        .scope(options.page_key.as_deref())
        .walk()
    {
        let entry = entry?;
        // Records sitting directly in `dir` belong to the level above.
        if entry.full_parent_dir == dir {
            continue;
        }
        pages.push(build_page(&entry, options)?);
    }

    pages.sort_by(|a, b| {
        let key = |p: &PageNode| parse_entry_name(&p.uid).number.unwrap_or(u32::MAX);
        key(a)
            .cmp(&key(b))
            .then_with(|| a.uid.cmp(&b.uid))
            .then_with(|| a.template.cmp(&b.template))
    });
    Ok(pages)
}

fn build_page(entry: &Entry, options: &TreeOptions) -> Result<PageNode, TreeError> {
    let uid = entry.parent_dir.clone();
    let parsed = parse_entry_name(&uid);
    let template = entry
        .name
        .strip_suffix(".txt")
        .unwrap_or(&entry.name)
        .to_string();

    let raw = fs::read(&entry.path).map_err(|source| TreeError::Read {
        path: entry.path.clone(),
        source,
    })?;
    let attributes = content::parse(&String::from_utf8_lossy(&raw));

    let directory = entry.full_parent_dir.clone();
    let media = collect_media(&directory, options)?;

    let children = if naming::is_media_collection(&naming::collection_name(&template)) {
        None
    } else {
        Some(build_pages(&directory, options)?).filter(|c| !c.is_empty())
    };

    tracing::debug!(
        uid = %uid,
        template = %template,
        media = media.len(),
        children = children.as_ref().map_or(0, Vec::len),
        "built page"
    );

    Ok(PageNode {
        url: naming::page_url(&uid),
        visible: parsed.visible,
        uid,
        directory,
        template,
        attributes,
        media,
        children,
    })
}

fn collect_media(dir: &Path, options: &TreeOptions) -> Result<Vec<PathBuf>, TreeError> {
    Walker::images(dir)
        .walk()
        .map(|entry| {
            let path = entry?.path;
            Ok(path
                .strip_prefix(&options.media_root)
                .map(Path::to_path_buf)
                .unwrap_or(path))
        })
        .collect()
}
