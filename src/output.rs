//! CLI output formatting for all migration stages.
//!
//! # Information-First Display
//!
//! Every page is shown by its positional index and title first, with its
//! collection in brackets. The record file, url, and media are indented
//! context lines underneath, so the output reads as a content inventory that
//! can still be traced back to files.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Pages
//! 001 Home [home]
//!     Source: 1-home/home.txt
//!     Fields: title, intro, order
//! 003 Projects [projects]
//!     Source: 3-projects/projects.txt
//!     --- (1-span.jpg.txt, media)
//!     001 Bridge [project]
//!         Source: 1-bridge/project.txt
//!         Images: 2
//! 004 Unfinished Thoughts [article] (hidden)
//!     Source: drafts/article.txt
//! ```
//!
//! ## Schema
//!
//! ```text
//! project (3 fields)
//!     images: Reference → mediaStore
//!     title: String
//!     text: String (multiline)
//! ```
//!
//! ## Migrate
//!
//! ```text
//! Schema project (3 fields)
//! Created article /first-post → rec-1
//! Failed  note /notes/draft: store answered 500: unavailable
//! Skipped notes /notes: failed descendant
//! Asset dropped from /bridge
//!     1-bridge/2-deck.png (store call timed out)
//!
//! Created 6 records in 5 collections (1 failed, 1 skipped, 1 asset dropped)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::migrate::MigrationReport;
use crate::pipeline::MigrateEvent;
use crate::schema::{CollectionConfig, CollectionSchema, FieldType};
use crate::types::PageNode;
use std::collections::BTreeMap;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format a page header: positional index, title, and collection.
///
/// ```text
/// 001 Home [home]
/// 004 Unfinished Thoughts [article] (hidden)
/// ```
fn entity_header(index: usize, page: &PageNode) -> String {
    let hidden = if page.visible { "" } else { " (hidden)" };
    format!(
        "{} {} [{}]{}",
        format_index(index),
        page.display_title(),
        page.collection(),
        hidden
    )
}

fn field_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "String",
        FieldType::Number => "Number",
        FieldType::Boolean => "Boolean",
        FieldType::Reference => "Reference",
        FieldType::ReferenceAny => "ReferenceAny",
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the page tree found by a scan.
///
/// Record pages are numbered per sibling level. Media pages are listed under
/// their level without a number since they are never inserted.
pub fn format_scan_output(pages: &[PageNode]) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    format_pages(pages, 0, &mut lines);
    lines
}

fn format_pages(pages: &[PageNode], depth: usize, lines: &mut Vec<String>) {
    let base = indent(depth);
    let mut position = 0;
    for page in pages {
        if page.is_media_page() {
            lines.push(format!("{}--- ({}.txt, media)", base, page.template));
            continue;
        }
        position += 1;
        lines.push(format!("{}{}", base, entity_header(position, page)));
        lines.push(format!(
            "{}    Source: {}/{}.txt",
            base, page.uid, page.template
        ));
        let keys: Vec<&str> = page.attributes.keys().collect();
        if !keys.is_empty() {
            lines.push(format!("{}    Fields: {}", base, keys.join(", ")));
        }
        if !page.media.is_empty() {
            lines.push(format!("{}    Images: {}", base, page.media.len()));
        }
        if let Some(children) = &page.children {
            format_pages(children, depth + 1, lines);
        }
    }
}

/// Print scan output to stdout.
pub fn print_scan_output(pages: &[PageNode]) {
    for line in format_scan_output(pages) {
        println!("{}", line);
    }
}

// ============================================================================
// Schema output
// ============================================================================

/// Format inferred schemas, one block per collection.
pub fn format_schema_output(schemas: &[CollectionSchema]) -> Vec<String> {
    let mut lines = Vec::new();
    for schema in schemas {
        lines.push(format!("{} ({} fields)", schema.name, schema.fields.len()));
        for field in schema.fields.values() {
            let detail = match (&field.reference_target, field.multiline) {
                (Some(target), _) => format!(" \u{2192} {}", target),
                (None, true) => " (multiline)".to_string(),
                (None, false) => String::new(),
            };
            lines.push(format!(
                "    {}: {}{}",
                field.name,
                field_type_name(field.field_type),
                detail
            ));
        }
    }
    lines
}

/// Collection configs exactly as they would be published, keyed by name.
pub fn schema_json(schemas: &[CollectionSchema]) -> Result<String, serde_json::Error> {
    let configs: BTreeMap<&str, CollectionConfig> = schemas
        .iter()
        .map(|s| (s.name.as_str(), s.to_config()))
        .collect();
    serde_json::to_string_pretty(&configs)
}

pub fn print_schema_output(schemas: &[CollectionSchema]) {
    for line in format_schema_output(schemas) {
        println!("{}", line);
    }
}

// ============================================================================
// Migrate output
// ============================================================================

/// Format a single migration progress event as display lines.
pub fn format_migrate_event(event: &MigrateEvent) -> Vec<String> {
    match event {
        MigrateEvent::SchemaPublished { collection, fields } => {
            vec![format!("Schema {} ({} fields)", collection, fields)]
        }
        MigrateEvent::SchemaFailed { collection, error } => {
            vec![format!("Schema {} failed: {}", collection, error)]
        }
        MigrateEvent::RecordCreated {
            collection,
            url,
            ids,
        } => vec![format!(
            "Created {} {} \u{2192} {}",
            collection,
            url,
            ids.join(", ")
        )],
        MigrateEvent::RecordFailed {
            collection,
            url,
            error,
        } => vec![format!("Failed  {} {}: {}", collection, url, error)],
        MigrateEvent::RecordSkipped {
            collection,
            url,
            reason,
        } => vec![format!("Skipped {} {}: {}", collection, url, reason)],
        MigrateEvent::AssetFailed { url, path, error } => vec![
            format!("Asset dropped from {}", url),
            format!("    {} ({})", path.display(), error),
        ],
    }
}

/// Format the closing summary of a migration.
pub fn format_report(report: &MigrationReport) -> Vec<String> {
    let stats = &report.stats;
    let mut notes = Vec::new();
    if stats.failed > 0 {
        notes.push(format!("{} failed", stats.failed));
    }
    if stats.skipped > 0 {
        notes.push(format!("{} skipped", stats.skipped));
    }
    if stats.assets_failed > 0 {
        let noun = if stats.assets_failed == 1 { "asset" } else { "assets" };
        notes.push(format!("{} {} dropped", stats.assets_failed, noun));
    }
    if report.schemas_published < report.collections {
        notes.push(format!(
            "{} schemas rejected",
            report.collections - report.schemas_published
        ));
    }

    let mut summary = format!(
        "Created {} records in {} collections",
        stats.created, report.collections
    );
    if !notes.is_empty() {
        summary.push_str(&format!(" ({})", notes.join(", ")));
    }
    vec![String::new(), summary]
}

pub fn print_report(report: &MigrationReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::pipeline::InsertStats;
    use crate::schema::SchemaRegistry;
    use crate::test_helpers::*;
    use std::path::PathBuf;

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_single_digit() {
        assert_eq!(format_index(1), "001");
    }

    #[test]
    fn format_index_triple_digit() {
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Scan
    // =========================================================================

    #[test]
    fn scan_output_of_fixtures() {
        let tmp = setup_fixtures();
        let pages = fixture_pages(&tmp);
        let lines = format_scan_output(&pages);

        assert_eq!(lines[0], "Pages");
        assert_eq!(lines[1], "001 Home [home]");
        assert_eq!(lines[2], "    Source: 1-home/home.txt");
        assert_eq!(lines[3], "    Fields: title, intro, order");
        assert!(lines.contains(&"    001 Bridge [project]".to_string()));
        assert!(lines.contains(&"        Images: 2".to_string()));
        assert!(lines.contains(&"    --- (1-span.jpg.txt, media)".to_string()));
        assert!(lines.contains(&"004 Unfinished Thoughts [article] (hidden)".to_string()));
    }

    #[test]
    fn scan_output_numbers_skip_media_pages() {
        let tmp = setup_fixtures();
        let pages = fixture_pages(&tmp);
        let lines = format_scan_output(&pages);

        // The media page sorts before the bridge record but takes no number.
        let media = lines
            .iter()
            .position(|l| l.contains("1-span.jpg.txt"))
            .unwrap();
        assert_eq!(lines[media + 1], "    001 Bridge [project]");
        assert!(lines.contains(&"    002 Tower [project]".to_string()));
    }

    // =========================================================================
    // Schema
    // =========================================================================

    #[test]
    fn schema_output_lists_fields() {
        let tmp = setup_fixtures();
        let mut pages = fixture_pages(&tmp);
        let reg = SchemaRegistry::new(&SchemaConfig::default());
        reg.infer(&mut pages);
        let lines = format_schema_output(&reg.snapshot());

        assert!(lines.contains(&"home (3 fields)".to_string()));
        assert!(lines.contains(&"    order: Number".to_string()));
        assert!(lines.contains(&"    images: Reference \u{2192} mediaStore".to_string()));
        assert!(lines.contains(&"    children: ReferenceAny".to_string()));
    }

    #[test]
    fn schema_json_keyed_by_collection() {
        let tmp = setup_fixtures();
        let mut pages = fixture_pages(&tmp);
        let reg = SchemaRegistry::new(&SchemaConfig::default());
        reg.infer(&mut pages);

        let json: serde_json::Value =
            serde_json::from_str(&schema_json(&reg.snapshot()).unwrap()).unwrap();
        assert_eq!(json["home"]["fields"]["order"]["type"], "Number");
        assert_eq!(json["project"]["settings"]["displayName"], "Project");
    }

    // =========================================================================
    // Migrate
    // =========================================================================

    #[test]
    fn format_created_event() {
        let event = MigrateEvent::RecordCreated {
            collection: "article".into(),
            url: "/first-post".into(),
            ids: vec!["rec-1".into()],
        };
        assert_eq!(
            format_migrate_event(&event),
            vec!["Created article /first-post \u{2192} rec-1"]
        );
    }

    #[test]
    fn format_asset_failed_event() {
        let event = MigrateEvent::AssetFailed {
            url: "/bridge".into(),
            path: PathBuf::from("1-bridge/2-deck.png"),
            error: "store call timed out".into(),
        };
        assert_eq!(
            format_migrate_event(&event),
            vec![
                "Asset dropped from /bridge",
                "    1-bridge/2-deck.png (store call timed out)"
            ]
        );
    }

    #[test]
    fn report_clean_run() {
        let report = MigrationReport {
            collections: 5,
            schemas_published: 5,
            stats: InsertStats {
                created: 8,
                ..InsertStats::default()
            },
            top_level: vec![],
        };
        assert_eq!(
            format_report(&report),
            vec!["", "Created 8 records in 5 collections"]
        );
    }

    #[test]
    fn report_with_failures() {
        let report = MigrationReport {
            collections: 5,
            schemas_published: 4,
            stats: InsertStats {
                created: 6,
                failed: 1,
                skipped: 1,
                assets_uploaded: 1,
                assets_failed: 1,
            },
            top_level: vec![],
        };
        assert_eq!(
            format_report(&report)[1],
            "Created 6 records in 5 collections (1 failed, 1 skipped, 1 asset dropped, 1 schemas rejected)"
        );
    }

    #[test]
    fn migrate_event_skipped() {
        let event = MigrateEvent::RecordSkipped {
            collection: "notes".into(),
            url: "/notes".into(),
            reason: "failed descendant".into(),
        };
        assert_eq!(
            format_migrate_event(&event),
            vec!["Skipped notes /notes: failed descendant"]
        );
    }
}
