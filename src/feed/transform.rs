use super::model::{Extension, Feed, Image};
use crate::category::{classify, Category};
use crate::config::CategoryMeta;

/// Builds a copy of `feed` holding only the items that classify as `wanted`.
///
/// Channel fields are copied and the item list is rebuilt, so the source
/// feed is never modified. Relative item order is preserved.
pub fn filter_feed(feed: &Feed, wanted: Category) -> Feed {
    tracing::debug!(category = %wanted, total = feed.items.len(), "Filtering feed items");

    let items = feed
        .items
        .iter()
        .filter(|item| {
            let matched = classify(&item.title) == wanted;
            if matched {
                tracing::debug!(title = %item.title, category = %wanted, "Item selected");
            }
            matched
        })
        .cloned()
        .collect();

    Feed {
        title: feed.title.clone(),
        link: feed.link.clone(),
        description: feed.description.clone(),
        language: feed.language.clone(),
        published: feed.published,
        updated: feed.updated,
        image: feed.image.clone(),
        author: feed.author.clone(),
        extensions: feed.extensions.clone(),
        items,
    }
}

/// Applies a category's configured title, description and artwork.
///
/// Blank overrides leave the upstream value alone. An image override also
/// replaces `itunes:image`, which podcast clients prefer over `<image>`.
pub fn apply_overrides(feed: &mut Feed, meta: &CategoryMeta) {
    if let Some(title) = non_blank(&meta.title) {
        feed.title = title.to_string();
    }
    if let Some(description) = non_blank(&meta.description) {
        feed.description = description.to_string();
    }
    if let Some(url) = non_blank(&meta.image) {
        feed.image.get_or_insert_with(Image::default).url = url.to_string();
        feed.extensions
            .entry("itunes".to_string())
            .or_default()
            .insert(
                "image".to_string(),
                vec![Extension::new("image").with_attr("href", url)],
            );
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
