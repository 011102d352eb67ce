//! Shared test utilities for the kirby-migrate test suite.
//!
//! Provides fixture setup and lookup helpers that work with built page trees.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let pages = build_tree(tmp.path(), &TreeOptions::new(tmp.path())).unwrap();
//!
//! let bridge = find_page(&pages, "3-projects/1-bridge");
//! assert_eq!(bridge.template, "project");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::tree::{TreeOptions, build_tree};
use crate::types::PageNode;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

/// Fixture tree built with the temp dir as media root.
pub fn fixture_pages(tmp: &TempDir) -> Vec<PageNode> {
    build_tree(tmp.path(), &TreeOptions::new(tmp.path())).unwrap()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Tree lookups (panic with a clear message on miss)
// =========================================================================

/// Find a record page by its uid path (`"3-projects/1-bridge"`). Media pages
/// sharing the uid are skipped. Panics if not found.
pub fn find_page<'a>(pages: &'a [PageNode], uid_path: &str) -> &'a PageNode {
    let mut level = pages;
    let mut found: Option<&PageNode> = None;
    for uid in uid_path.split('/') {
        let page = level
            .iter()
            .find(|p| p.uid == uid && !p.is_media_page())
            .unwrap_or_else(|| {
                panic!(
                    "page '{uid}' not found in '{uid_path}'. Available: {:?}",
                    page_uids(level)
                )
            });
        level = page.children.as_deref().unwrap_or(&[]);
        found = Some(page);
    }
    found.unwrap_or_else(|| panic!("empty page path"))
}

/// Uids of one level, in order.
pub fn page_uids(pages: &[PageNode]) -> Vec<&str> {
    pages.iter().map(|p| p.uid.as_str()).collect()
}

/// Every page in the tree, depth-first, parents before children.
pub fn flatten(pages: &[PageNode]) -> Vec<&PageNode> {
    let mut out = Vec::new();
    for page in pages {
        out.push(page);
        if let Some(children) = &page.children {
            out.extend(flatten(children));
        }
    }
    out
}
