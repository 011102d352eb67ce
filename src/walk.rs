//! Bounded-depth filesystem enumeration.
//!
//! Two scans drive the tree builder:
//!
//! - **Content files**: `*.txt` records under a subtree, to a depth limit,
//!   optionally scoped to parent paths containing a key.
//! - **Images**: JPEG/PNG files directly in one directory (depth 0).
//!
//! Depth counts directory levels below the root: depth 0 lists the root's own
//! files, depth 1 adds the files of its immediate subdirectories.
//!
//! [`Walker::walk`] is lazy. An unreadable root shows up as the first item
//! being an `Err`; a root with no matches yields nothing.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

const CONTENT_EXTENSION: &str = "txt";

/// What a walk keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFilter {
    /// `*.txt` content records.
    ContentFiles,
    /// Images whose content type is JPEG or PNG.
    Images,
}

impl EntryFilter {
    fn matches(self, path: &Path) -> bool {
        match self {
            EntryFilter::ContentFiles => path
                .extension()
                .is_some_and(|ext| ext == CONTENT_EXTENSION),
            EntryFilter::Images => is_media(path),
        }
    }
}

/// A matching file.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub path: PathBuf,
    /// Name of the containing directory (`020-projects`).
    pub parent_dir: String,
    /// Absolute path of the containing directory.
    pub full_parent_dir: PathBuf,
    /// File name (`project.txt`).
    pub name: String,
}

impl Entry {
    fn from_path(path: PathBuf) -> Self {
        let full_parent_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let parent_dir = full_parent_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            parent_dir,
            full_parent_dir,
            name,
        }
    }
}

/// Filesystem walk configuration.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    depth: usize,
    filter: EntryFilter,
    scope: Option<String>,
}

impl Walker {
    /// Content records in `root` and its immediate subdirectories.
    pub fn content_files(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            depth: 1,
            filter: EntryFilter::ContentFiles,
            scope: None,
        }
    }

    /// Images directly inside `root`.
    pub fn images(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            depth: 0,
            filter: EntryFilter::Images,
            scope: None,
        }
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Keep only entries whose full parent path contains `key`.
    pub fn scope(mut self, key: Option<&str>) -> Self {
        self.scope = key.filter(|k| !k.is_empty()).map(str::to_string);
        self
    }

    /// Enumerate matching files in name order.
    pub fn walk(self) -> impl Iterator<Item = Result<Entry, WalkError>> {
        let Walker {
            root,
            depth,
            filter,
            scope,
        } = self;

        WalkDir::new(&root)
            .min_depth(1)
            .max_depth(depth + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |res| {
                let entry = match res {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(WalkError::from(e))),
                };
                if !entry.file_type().is_file() || !filter.matches(entry.path()) {
                    return None;
                }
                let entry = Entry::from_path(entry.into_path());
                if let Some(key) = &scope
                    && !entry.full_parent_dir.to_string_lossy().contains(key.as_str())
                {
                    return None;
                }
                Some(Ok(entry))
            })
    }
}

/// Content type of a media file by extension. Only JPEG and PNG are known.
pub fn content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// JPEG and PNG files are media; other images are left alone.
pub fn is_media(path: &Path) -> bool {
    content_type(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(walker: Walker) -> Vec<String> {
        walker.walk().map(|e| e.unwrap().name).collect()
    }

    #[test]
    fn content_files_to_depth_one() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("site.txt"), "title: Site").unwrap();
        let about = tmp.path().join("1-about");
        fs::create_dir_all(about.join("1-team")).unwrap();
        fs::write(about.join("text.txt"), "title: About").unwrap();
        fs::write(about.join("1-team").join("team.txt"), "title: Team").unwrap();

        let found = names(Walker::content_files(tmp.path()));
        assert_eq!(found, vec!["text.txt", "site.txt"]);
    }

    #[test]
    fn depth_zero_lists_root_only() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("site.txt"), "").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("page.txt"), "").unwrap();

        let found = names(Walker::content_files(tmp.path()).depth(0));
        assert_eq!(found, vec!["site.txt"]);
    }

    #[test]
    fn entry_carries_parent_names() {
        let tmp = TempDir::new().unwrap();
        let about = tmp.path().join("1-about");
        fs::create_dir_all(&about).unwrap();
        fs::write(about.join("text.txt"), "").unwrap();

        let entry = Walker::content_files(tmp.path())
            .walk()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(entry.parent_dir, "1-about");
        assert_eq!(entry.full_parent_dir, about);
        assert_eq!(entry.path, about.join("text.txt"));
    }

    #[test]
    fn scope_filters_parent_path() {
        let tmp = TempDir::new().unwrap();
        for dir in ["1-blog", "2-projects"] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
            fs::write(tmp.path().join(dir).join("page.txt"), "").unwrap();
        }

        let found: Vec<String> = Walker::content_files(tmp.path())
            .scope(Some("projects"))
            .walk()
            .map(|e| e.unwrap().parent_dir)
            .collect();
        assert_eq!(found, vec!["2-projects"]);
    }

    #[test]
    fn empty_scope_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("a").join("page.txt"), "").unwrap();

        assert_eq!(names(Walker::content_files(tmp.path()).scope(Some(""))).len(), 1);
    }

    #[test]
    fn images_are_jpeg_and_png_only() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.png", "a.JPG", "c.gif", "d.txt", "e.webp"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("deep.jpg"), "x").unwrap();

        assert_eq!(names(Walker::images(tmp.path())), vec!["a.JPG", "b.png"]);
    }

    #[test]
    fn no_matches_is_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        assert!(Walker::images(tmp.path()).walk().next().is_none());
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut walk = Walker::content_files(&tmp.path().join("nope")).walk();
        assert!(matches!(walk.next(), Some(Err(WalkError::Walk(_)))));
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(content_type(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(content_type(Path::new("a")), None);
        assert_eq!(content_type(Path::new("a.gif")), None);
        assert_eq!(content_type(Path::new("a.txt")), None);
        assert!(!is_media(Path::new("a.gif")));
        assert!(is_media(Path::new("a.jpe")));
    }
}
