//! Collection schema inference.
//!
//! Stage 2 of the migration. Every record page is observed once; its template
//! picks the collection and each of its attribute keys becomes a field:
//!
//! | Key / raw value        | Field type     | Value coercion             |
//! |------------------------|----------------|----------------------------|
//! | `order`                | `Number`       | leading integer, else null |
//! | `images` (media found) | `Reference`    | to the media collection    |
//! | `children` (has kids)  | `ReferenceAny` |                            |
//! | exactly `"1"` / `"0"`  | `Boolean`      | `true` / `false`           |
//! | anything else          | `String`       | multiline if > 200 chars   |
//!
//! Fields accumulate per collection across pages. A key seen again is
//! re-classified from scratch and the newest result replaces the old one, so the
//! last page observed decides a field's type. Conflicting shapes are not
//! merged. [`SchemaRegistry::infer`] walks the tree in order, so the same tree
//! always yields the same schemas.
//!
//! Media pages (dotted collection names) are never observed.
//!
//! The registry takes `&self` and can be shared across threads; all writes go
//! through one mutex.

use crate::config::SchemaConfig;
use crate::naming;
use crate::types::{FieldValue, PageNode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Field types understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Identifiers in one fixed collection.
    Reference,
    /// Identifiers in any collection.
    ReferenceAny,
}

/// One inferred field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub multiline: bool,
    /// Target collection, set for `Reference` only.
    pub reference_target: Option<String>,
}

impl FieldSpec {
    fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            label: naming::titleize(name),
            field_type,
            multiline: false,
            reference_target: None,
        }
    }
}

/// Collection-level settings sent with every schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSettings {
    pub cache: bool,
    pub compose: bool,
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: u32,
    pub publish: PublishGroup,
    pub authenticate: bool,
    pub allow_extension: bool,
    pub callback: Option<String>,
    pub default_filters: BTreeMap<String, serde_json::Value>,
    pub field_limiters: BTreeMap<String, serde_json::Value>,
    pub store_search: bool,
    pub display_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishGroup {
    pub group: String,
}

impl CollectionSettings {
    fn new(collection: &str, config: &SchemaConfig) -> Self {
        Self {
            cache: true,
            compose: true,
            cache_ttl: config.cache_ttl,
            publish: PublishGroup {
                group: config.publish_group.clone(),
            },
            authenticate: true,
            allow_extension: false,
            callback: None,
            default_filters: BTreeMap::new(),
            field_limiters: BTreeMap::new(),
            store_search: false,
            display_name: naming::titleize(collection),
            count: config.page_size,
        }
    }
}

/// Inferred schema of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: BTreeMap<String, FieldSpec>,
    pub settings: CollectionSettings,
}

impl CollectionSchema {
    pub fn new(name: &str, config: &SchemaConfig) -> Self {
        Self {
            name: name.to_string(),
            fields: BTreeMap::new(),
            settings: CollectionSettings::new(name, config),
        }
    }

    /// Wire form accepted by the store's collection config endpoint.
    pub fn to_config(&self) -> CollectionConfig {
        CollectionConfig {
            fields: self
                .fields
                .iter()
                .map(|(name, spec)| (name.clone(), FieldConfig::from(spec)))
                .collect(),
            settings: self.settings.clone(),
        }
    }
}

/// Serialized collection schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionConfig {
    pub fields: BTreeMap<String, FieldConfig>,
    pub settings: CollectionSettings,
}

/// Serialized field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub publish: FieldPublish,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<ReferenceSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPublish {
    pub section: String,
    pub placement: String,
    pub multiline: bool,
    pub display: FieldDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDisplay {
    pub edit: bool,
    pub list: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSettings {
    pub collection: String,
}

impl From<&FieldSpec> for FieldConfig {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            field_type: spec.field_type,
            label: spec.label.clone(),
            required: false,
            publish: FieldPublish {
                section: "Main".into(),
                placement: "main".into(),
                multiline: spec.multiline,
                display: FieldDisplay {
                    edit: true,
                    list: true,
                },
            },
            settings: spec
                .reference_target
                .as_ref()
                .map(|collection| ReferenceSettings {
                    collection: collection.clone(),
                }),
        }
    }
}

/// Schemas of every collection seen so far, keyed by collection name.
#[derive(Debug)]
pub struct SchemaRegistry {
    config: SchemaConfig,
    include_page_meta: bool,
    collections: Mutex<BTreeMap<String, CollectionSchema>>,
}

impl SchemaRegistry {
    pub fn new(config: &SchemaConfig) -> Self {
        Self {
            config: config.clone(),
            include_page_meta: false,
            collections: Mutex::new(BTreeMap::new()),
        }
    }

    /// Add `uid` and `url` to every observed page and schema.
    pub fn with_page_meta(mut self, include: bool) -> Self {
        self.include_page_meta = include;
        self
    }

    /// Observe every page of the tree: a page before its children, siblings
    /// in page order.
    pub fn infer(&self, pages: &mut [PageNode]) {
        for page in pages.iter_mut() {
            self.observe(page);
            if let Some(children) = page.children.as_mut() {
                self.infer(children);
            }
        }
    }

    /// Fold one page into its collection's schema, coercing its `order` and
    /// boolean-looking values in place.
    pub fn observe(&self, page: &mut PageNode) {
        let collection = page.collection();
        if naming::is_media_collection(&collection) {
            tracing::debug!(uid = %page.uid, template = %page.template, "skipping media page");
            return;
        }

        if self.include_page_meta {
            for (key, value) in [("uid", page.uid.clone()), ("url", page.url.clone())] {
                if !page.attributes.contains_key(key) {
                    page.attributes.insert(key, FieldValue::Text(value));
                }
            }
        }

        let mut fields: Vec<FieldSpec> = page
            .attributes
            .iter_mut()
            .map(|(key, value)| self.classify(key, value))
            .collect();
        if !page.media.is_empty() {
            fields.push(self.images_field());
        }
        if page.children.is_some() {
            fields.push(FieldSpec::new("children", FieldType::ReferenceAny));
        }

        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let schema = collections
            .entry(collection.clone())
            .or_insert_with(|| CollectionSchema::new(&collection, &self.config));
        for field in fields {
            schema.fields.insert(field.name.clone(), field);
        }
    }

    fn classify(&self, key: &str, value: &mut FieldValue) -> FieldSpec {
        let multiline = value
            .as_text()
            .is_some_and(|s| s.chars().count() > self.config.multiline_threshold);

        let field_type = match key {
            "order" => {
                if let Some(raw) = value.as_text() {
                    let parsed = parse_leading_int(raw);
                    *value = parsed.map_or(FieldValue::Null, FieldValue::Number);
                }
                FieldType::Number
            }
            "images" => return self.images_field(),
            "children" => FieldType::ReferenceAny,
            _ => match value.as_text() {
                Some("1") => {
                    *value = FieldValue::Boolean(true);
                    FieldType::Boolean
                }
                Some("0") => {
                    *value = FieldValue::Boolean(false);
                    FieldType::Boolean
                }
                _ => FieldType::String,
            },
        };

        FieldSpec {
            multiline,
            ..FieldSpec::new(key, field_type)
        }
    }

    fn images_field(&self) -> FieldSpec {
        FieldSpec {
            reference_target: Some(self.config.media_collection.clone()),
            ..FieldSpec::new("images", FieldType::Reference)
        }
    }

    pub fn get(&self, collection: &str) -> Option<CollectionSchema> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
    }

    /// All schemas, ordered by collection name.
    pub fn snapshot(&self) -> Vec<CollectionSchema> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Integer prefix of a string: optional sign, then digits, after leading
/// whitespace. `"3"` → 3, `" 12th"` → 12, `"x"` → `None`.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}
