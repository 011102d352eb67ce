//! Name conventions shared by the tree builder and the schema engine.
//!
//! ## Directory names
//!
//! Content authors order pages with a numeric prefix: `020-projects/`. A name
//! that starts with a run of digits followed by a dash is *visible* and sorted
//! by that number; anything else is hidden. The prefix never takes part in the
//! page URL:
//!
//! - `020-projects` → visible, number 20, url `/projects`
//! - `3-about-us`   → visible, number 3, url `/about-us`
//! - `drafts`       → hidden, url `/drafts`
//! - `2024`         → hidden (no dash), url `/2024`
//!
//! ## Collection names
//!
//! A page's collection is derived from its template: dashes become
//! underscores and the result is lower-camel-cased (`blog-post` → `blogPost`).
//! A template that still carries an extension (`cover.jpg`, from Kirby's
//! `cover.jpg.txt` media metadata files) yields a dotted name and marks a media
//! page.

/// Words that stay lowercase inside a title, unless they lead it.
const MINOR_WORDS: &[&str] = &[
    "and", "or", "nor", "a", "an", "the", "so", "but", "to", "of", "at", "by", "from", "into",
    "on", "onto", "off", "out", "in", "over", "with", "for",
];

/// Result of parsing a directory name like `020-projects`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Sort number from the prefix. `None` for hidden entries, or when the
    /// digit run is too long for a `u32`.
    pub number: Option<u32>,
    /// Whether the name carries the `<digits>-` prefix.
    pub visible: bool,
    /// Name with the prefix removed. For hidden entries, the full input.
    pub slug: String,
}

/// Parse a directory name following the `<digits>-name` convention.
pub fn parse_entry_name(name: &str) -> ParsedName {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && name.as_bytes().get(digits) == Some(&b'-') {
        return ParsedName {
            number: name[..digits].parse().ok(),
            visible: true,
            slug: name[digits + 1..].to_string(),
        };
    }
    ParsedName {
        number: None,
        visible: false,
        slug: name.to_string(),
    }
}

/// Public URL of a page: its slug behind a leading slash.
pub fn page_url(uid: &str) -> String {
    format!("/{}", parse_entry_name(uid).slug)
}

/// Derive the collection name for a template.
///
/// `blog-post` → `blogPost`, `default` → `default`, `cover.jpg` → `cover.jpg`.
pub fn collection_name(template: &str) -> String {
    let underscored = template.replace('-', "_");
    let mut out = String::with_capacity(underscored.len());
    for (i, part) in underscored.split('_').enumerate() {
        let part = if i == 0 {
            part.to_string()
        } else {
            part.to_lowercase()
        };
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Media pages come from templates with an extension left in them.
pub fn is_media_collection(collection: &str) -> bool {
    collection.contains('.')
}

/// Human-readable title for a field key or collection name.
///
/// `page_title` → "Page Title", `tale-of-two` → "Tale-of-Two",
/// `blogPost` → "Blogpost".
pub fn titleize(input: &str) -> String {
    let lowered = input.to_lowercase().replace('_', " ");
    let words: Vec<String> = lowered
        .split(' ')
        .enumerate()
        .map(|(i, word)| {
            word.split('-')
                .enumerate()
                .map(|(k, part)| {
                    if (i > 0 || k > 0) && MINOR_WORDS.contains(&part) {
                        part.to_string()
                    } else {
                        capitalize(part)
                    }
                })
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect();
    capitalize(&words.join(" "))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_name_is_visible() {
        let p = parse_entry_name("020-projects");
        assert_eq!(p.number, Some(20));
        assert!(p.visible);
        assert_eq!(p.slug, "projects");
    }

    #[test]
    fn single_digit_prefix() {
        let p = parse_entry_name("1-about");
        assert_eq!(p.number, Some(1));
        assert!(p.visible);
        assert_eq!(p.slug, "about");
    }

    #[test]
    fn unnumbered_name_is_hidden() {
        let p = parse_entry_name("drafts");
        assert_eq!(p.number, None);
        assert!(!p.visible);
        assert_eq!(p.slug, "drafts");
    }

    #[test]
    fn digits_without_dash_are_hidden() {
        let p = parse_entry_name("2024");
        assert!(!p.visible);
        assert_eq!(p.slug, "2024");
    }

    #[test]
    fn dash_in_middle_is_not_a_prefix() {
        let p = parse_entry_name("wip-1-notes");
        assert!(!p.visible);
        assert_eq!(p.slug, "wip-1-notes");
    }

    #[test]
    fn oversized_prefix_still_visible() {
        let p = parse_entry_name("99999999999-huge");
        assert!(p.visible);
        assert_eq!(p.number, None);
        assert_eq!(p.slug, "huge");
    }

    #[test]
    fn url_strips_prefix() {
        assert_eq!(page_url("3-about-us"), "/about-us");
        assert_eq!(page_url("drafts"), "/drafts");
    }

    #[test]
    fn collection_name_camelizes() {
        assert_eq!(collection_name("blog-post"), "blogPost");
        assert_eq!(collection_name("project_list"), "projectList");
        assert_eq!(collection_name("default"), "default");
        assert_eq!(collection_name("Home"), "home");
    }

    #[test]
    fn collection_name_lowercases_later_parts() {
        assert_eq!(collection_name("news-ITEM"), "newsItem");
    }

    #[test]
    fn collection_name_keeps_dots() {
        let name = collection_name("gallery.photo");
        assert_eq!(name, "gallery.photo");
        assert!(is_media_collection(&name));
        assert!(!is_media_collection("blogPost"));
    }

    #[test]
    fn titleize_keys() {
        assert_eq!(titleize("title"), "Title");
        assert_eq!(titleize("page_title"), "Page Title");
        assert_eq!(titleize("tale-of-two"), "Tale-of-Two");
        assert_eq!(titleize("the_end_of_days"), "The End of Days");
    }

    #[test]
    fn titleize_collection_names() {
        assert_eq!(titleize("blogPost"), "Blogpost");
    }
}
