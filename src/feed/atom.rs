//! Atom output.
//!
//! The generic model is first flattened into a [`Syndication`] draft that
//! resolves every fallback (description, timestamps, ids), then handed to
//! `atom_syndication` for serialisation. Namespaced extensions are not
//! carried over.

use atom_syndication::{Content, Entry, Link, Person as AtomPerson, Text};
use chrono::Utc;
use sha2::{Digest, Sha256};

use super::model::{coalesce, first_time, Enclosure, Feed, Person, Timestamp};
use super::EncodeError;
use crate::util::{is_blank, xml_safe};

/// Feed-level data needed to build an Atom document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syndication {
    pub title: String,
    pub link: String,
    pub description: String,
    pub created: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    pub author: Option<Person>,
    pub image_url: Option<String>,
    pub items: Vec<SyndicationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyndicationItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    pub created: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    pub id: String,
    pub author: Option<Person>,
    pub enclosure: Option<Enclosure>,
}

impl Syndication {
    pub fn from_feed(feed: &Feed) -> Self {
        let items = feed
            .items
            .iter()
            .map(|item| SyndicationItem {
                title: item.title.clone(),
                link: item.link.clone(),
                description: coalesce(&[&item.description, &item.content]).to_string(),
                content: item.content.clone(),
                created: first_time(&[item.published, item.updated, feed.published]),
                updated: first_time(&[item.updated, item.published]),
                id: coalesce(&[&item.guid, &item.link]).to_string(),
                author: item.author.clone(),
                enclosure: item.enclosures.first().cloned(),
            })
            .collect();

        Self {
            title: feed.title.clone(),
            link: feed.link.clone(),
            description: coalesce(&[&feed.description, &feed.title]).to_string(),
            created: first_time(&[feed.published, feed.updated]),
            updated: first_time(&[feed.updated, feed.published]),
            author: feed.author.clone(),
            image_url: feed
                .image
                .as_ref()
                .map(|i| i.url.clone())
                .filter(|url| !is_blank(url)),
            items,
        }
    }

    /// Serialises the draft as an Atom 1.0 document.
    pub fn to_atom(&self) -> Result<Vec<u8>, EncodeError> {
        let feed_updated = first_time(&[self.updated, self.created])
            .unwrap_or_else(|| Utc::now().fixed_offset());

        let mut feed = atom_syndication::Feed::default();
        feed.set_title(safe(&self.title));
        feed.set_id(if is_blank(&self.link) {
            digest_id(&[&self.title])
        } else {
            safe(&self.link)
        });
        feed.set_updated(feed_updated);
        if !is_blank(&self.link) {
            feed.set_links(vec![alternate_link(&self.link)]);
        }
        if !is_blank(&self.description) {
            feed.set_subtitle(Some(Text::from(safe(&self.description))));
        }
        if let Some(author) = self.author.as_ref().and_then(atom_person) {
            feed.set_authors(vec![author]);
        }
        feed.set_logo(self.image_url.as_deref().map(safe));

        let entries = self
            .items
            .iter()
            .map(|item| item.to_entry(feed_updated))
            .collect::<Vec<_>>();
        feed.set_entries(entries);

        feed.write_to(Vec::new())
            .map_err(|e| EncodeError::Atom(e.to_string()))
    }
}

impl SyndicationItem {
    fn to_entry(&self, feed_updated: Timestamp) -> Entry {
        let mut entry = Entry::default();
        entry.set_title(safe(&self.title));

        let published = self.created.map(|t| t.to_rfc3339()).unwrap_or_default();
        entry.set_id(if is_blank(&self.id) {
            digest_id(&[&self.link, &self.title, &published])
        } else {
            safe(&self.id)
        });
        entry.set_updated(
            first_time(&[self.updated, self.created]).unwrap_or(feed_updated),
        );
        entry.set_published(self.created);

        if !is_blank(&self.description) {
            entry.set_summary(Some(Text::html(safe(&self.description))));
        }
        if !is_blank(&self.content) {
            let mut content = Content::default();
            content.set_value(Some(safe(&self.content)));
            content.set_content_type(Some("html".to_string()));
            entry.set_content(Some(content));
        }
        if let Some(author) = self.author.as_ref().and_then(atom_person) {
            entry.set_authors(vec![author]);
        }

        let mut links = Vec::new();
        if !is_blank(&self.link) {
            links.push(alternate_link(&self.link));
        }
        if let Some(enclosure) = self.enclosure.as_ref().filter(|e| !is_blank(&e.url)) {
            let mut link = Link::default();
            link.set_href(safe(&enclosure.url));
            link.set_rel("enclosure");
            if !is_blank(&enclosure.mime_type) {
                link.set_mime_type(Some(safe(&enclosure.mime_type)));
            }
            if !is_blank(&enclosure.length) {
                link.set_length(Some(safe(&enclosure.length)));
            }
            links.push(link);
        }
        entry.set_links(links);
        entry
    }
}

/// Converts the feed to Atom.
pub fn encode_atom(feed: &Feed) -> Result<Vec<u8>, EncodeError> {
    Syndication::from_feed(feed).to_atom()
}

fn safe(s: &str) -> String {
    xml_safe(s).into_owned()
}

fn alternate_link(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(safe(href));
    link.set_rel("alternate");
    link
}

fn atom_person(person: &Person) -> Option<AtomPerson> {
    let name = coalesce(&[&person.name, &person.email]);
    if name.is_empty() {
        return None;
    }
    let mut out = AtomPerson::default();
    out.set_name(safe(name));
    if !is_blank(&person.email) {
        out.set_email(Some(safe(&person.email)));
    }
    Some(out)
}

/// Stable id for documents that carry neither a GUID nor a link.
fn digest_id(parts: &[&str]) -> String {
    let hash = Sha256::digest(parts.join("|").as_bytes());
    format!("urn:sha256:{:x}", hash)
}
