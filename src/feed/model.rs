use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

/// Timestamps keep the offset they were published with.
pub type Timestamp = DateTime<FixedOffset>;

/// Namespace prefix → element name → elements in document order.
///
/// `BTreeMap` keeps both levels sorted, which is the order the encoders emit.
pub type Extensions = BTreeMap<String, BTreeMap<String, Vec<Extension>>>;

/// A namespaced element the base model has no field for (`itunes:image`,
/// `media:content`, ...).
///
/// Children are keyed by local name and share the parent's prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub value: String,
    pub children: BTreeMap<String, Vec<Extension>>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

/// Looks up the first `prefix:name` element.
pub fn first_extension<'a>(exts: &'a Extensions, prefix: &str, name: &str) -> Option<&'a Extension> {
    exts.get(prefix)?.get(name)?.first()
}

/// Appends an element under `prefix`, preserving declaration order within its name.
pub fn push_extension(exts: &mut Extensions, prefix: &str, ext: Extension) {
    exts.entry(prefix.to_string())
        .or_default()
        .entry(ext.name.clone())
        .or_default()
        .push(ext);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// Kept as text: upstream feeds are not consistent about the format.
    pub length: String,
    pub mime_type: String,
}

/// Channel-level view of a parsed feed, independent of the wire format.
///
/// Text fields use the empty string for "absent"; encoders treat blank and
/// missing the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub published: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    pub image: Option<Image>,
    pub author: Option<Person>,
    pub extensions: Extensions,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    pub guid: String,
    pub published: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    pub author: Option<Person>,
    pub enclosures: Vec<Enclosure>,
    pub extensions: Extensions,
}

/// Returns the first argument that is not blank after trimming, or `""`.
pub(crate) fn coalesce<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
}

/// Returns the first timestamp that is present.
pub(crate) fn first_time(candidates: &[Option<Timestamp>]) -> Option<Timestamp> {
    candidates.iter().flatten().next().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_skips_blank() {
        assert_eq!(coalesce(&["", "  ", "b", "c"]), "b");
        assert_eq!(coalesce(&["", " "]), "");
        assert_eq!(coalesce(&[]), "");
    }

    #[test]
    fn test_first_time() {
        let t = DateTime::parse_from_rfc3339("2024-01-02T03:04:05+03:00").unwrap();
        assert_eq!(first_time(&[None, Some(t)]), Some(t));
        assert_eq!(first_time(&[None, None]), None);
    }

    #[test]
    fn test_push_extension_keeps_order_within_name() {
        let mut exts = Extensions::new();
        push_extension(&mut exts, "itunes", Extension::new("category").with_attr("text", "A"));
        push_extension(&mut exts, "itunes", Extension::new("category").with_attr("text", "B"));

        let cats = &exts["itunes"]["category"];
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].attrs["text"], "A");
        assert_eq!(cats[1].attrs["text"], "B");
        assert_eq!(
            first_extension(&exts, "itunes", "category").map(|e| e.attrs["text"].as_str()),
            Some("A")
        );
        assert!(first_extension(&exts, "media", "content").is_none());
    }
}
