//! Shared types passed between the tree builder, the schema engine and the
//! insertion pipeline.
//!
//! A [`PageNode`] is built once from disk, has its attribute values coerced in
//! place by schema inference, and is finally consumed by the pipeline, which
//! turns it into the record submitted to the store.

use crate::naming;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

/// One attribute value.
///
/// Parsing only ever produces `Null` and `Text`. Schema inference coerces
/// `order` to `Number` and `"1"`/`"0"` to `Boolean`; the pipeline fills the
/// reference variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(i64),
    Boolean(bool),
    /// Asset identifiers returned by the media upload endpoint.
    Assets(Vec<String>),
    /// Records created for child pages.
    Records(Vec<RecordRef>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Text)
    }
}

/// Ordered attribute map.
///
/// Keys keep the position of their first insertion; re-inserting a key
/// replaces the value in place. Serializes as a JSON object in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, FieldValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldValue)> {
        self.0.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The record submitted to the store for one page.
pub type Record = Attributes;

/// Reference to a record the store has created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub collection: String,
    #[serde(rename = "_id")]
    pub id: String,
}

/// One content page: a directory holding a `<template>.txt` record.
#[derive(Debug, Clone, Serialize)]
pub struct PageNode {
    /// Directory name, prefix included (`020-projects`).
    pub uid: String,
    /// Absolute path of the page directory.
    pub directory: PathBuf,
    /// Content file name without `.txt`.
    pub template: String,
    pub visible: bool,
    pub url: String,
    pub attributes: Attributes,
    /// Sibling images, relative to the media root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<PathBuf>,
    /// `None` when the directory has no child pages; never `Some(vec![])`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<PageNode>>,
}

impl PageNode {
    pub fn collection(&self) -> String {
        naming::collection_name(&self.template)
    }

    pub fn is_media_page(&self) -> bool {
        naming::is_media_collection(&self.collection())
    }

    /// Title attribute if the page has one, otherwise the url slug.
    pub fn display_title(&self) -> String {
        self.attributes
            .get("title")
            .and_then(FieldValue::as_text)
            .map(str::to_string)
            .unwrap_or_else(|| naming::parse_entry_name(&self.uid).slug)
    }
}
