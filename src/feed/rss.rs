use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;

use super::model::{coalesce, first_time, Extension, Extensions, Feed, Item, Timestamp};
use super::EncodeError;
use crate::util::{is_blank, xml_safe};

/// Namespaces declared on `<rss>` when the document uses their prefix.
///
/// Elements under any other prefix are still written, just without a declaration.
pub const KNOWN_NAMESPACES: [(&str, &str); 5] = [
    ("atom", "http://www.w3.org/2005/Atom"),
    ("content", "http://purl.org/rss/1.0/modules/content/"),
    ("googleplay", "http://www.google.com/schemas/play-podcasts/1.0"),
    ("itunes", "http://www.itunes.com/dtds/podcast-1.0.dtd"),
    ("media", "http://search.yahoo.com/mrss/"),
];

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Serialises `feed` as an RSS 2.0 document indented with two spaces.
///
/// Blank fields are omitted rather than written as empty tags. Extensions are
/// emitted sorted by prefix, then element name, then document order.
pub fn encode_rss(feed: &Feed) -> Result<Vec<u8>, EncodeError> {
    let mut out = RssWriter::new();

    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    let used = used_prefixes(feed);
    for (prefix, uri) in KNOWN_NAMESPACES {
        if used.contains(prefix) {
            rss.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
        }
    }
    out.event(Event::Start(rss))?;
    out.event(Event::Start(BytesStart::new("channel")))?;

    out.text_element("title", &feed.title)?;
    out.text_element("link", &feed.link)?;
    out.text_element("description", coalesce(&[&feed.description, &feed.title]))?;
    out.text_element("language", &feed.language)?;
    out.date_element("pubDate", feed.published)?;
    out.date_element("lastBuildDate", feed.updated)?;

    if let Some(image) = feed.image.as_ref().filter(|i| !is_blank(&i.url)) {
        out.event(Event::Start(BytesStart::new("image")))?;
        out.text_element("url", &image.url)?;
        out.text_element("title", coalesce(&[&image.title, &feed.title]))?;
        out.text_element("link", coalesce(&[&image.url, &feed.link]))?;
        out.event(Event::End(BytesEnd::new("image")))?;
    }

    out.extensions(&feed.extensions)?;

    for item in &feed.items {
        out.item(item)?;
    }

    out.event(Event::End(BytesEnd::new("channel")))?;
    out.event(Event::End(BytesEnd::new("rss")))?;
    Ok(out.finish())
}

/// Prefixes used by channel- or item-level extensions.
fn used_prefixes(feed: &Feed) -> BTreeSet<&str> {
    feed.extensions
        .keys()
        .chain(feed.items.iter().flat_map(|i| i.extensions.keys()))
        .map(String::as_str)
        .collect()
}

struct RssWriter {
    writer: Writer<Vec<u8>>,
}

impl RssWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), EncodeError> {
        self.writer
            .write_event(event)
            .map_err(|e| EncodeError::Xml(e.to_string()))
    }

    fn text_element(&mut self, name: &str, value: &str) -> Result<(), EncodeError> {
        if is_blank(value) {
            return Ok(());
        }
        self.event(Event::Start(BytesStart::new(name)))?;
        self.event(Event::Text(BytesText::new(&xml_safe(value))))?;
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn date_element(&mut self, name: &str, value: Option<Timestamp>) -> Result<(), EncodeError> {
        match value {
            Some(t) => self.text_element(name, &t.format(DATE_FORMAT).to_string()),
            None => Ok(()),
        }
    }

    fn item(&mut self, item: &Item) -> Result<(), EncodeError> {
        self.event(Event::Start(BytesStart::new("item")))?;

        self.text_element("title", &item.title)?;
        self.text_element("link", &item.link)?;
        self.text_element("description", coalesce(&[&item.description, &item.content]))?;
        self.date_element("pubDate", first_time(&[item.published, item.updated]))?;

        if !is_blank(&item.guid) {
            let mut guid = BytesStart::new("guid");
            let lower = item.guid.to_ascii_lowercase();
            if !lower.starts_with("http://") && !lower.starts_with("https://") {
                guid.push_attribute(("isPermaLink", "false"));
            }
            self.event(Event::Start(guid))?;
            self.event(Event::Text(BytesText::new(&xml_safe(&item.guid))))?;
            self.event(Event::End(BytesEnd::new("guid")))?;
        }

        if let Some(enclosure) = item.enclosures.first() {
            let mut el = BytesStart::new("enclosure");
            el.push_attribute(("url", xml_safe(&enclosure.url).as_ref()));
            if !is_blank(&enclosure.length) {
                el.push_attribute(("length", xml_safe(&enclosure.length).as_ref()));
            }
            if !is_blank(&enclosure.mime_type) {
                el.push_attribute(("type", xml_safe(&enclosure.mime_type).as_ref()));
            }
            self.event(Event::Empty(el))?;
        }

        self.extensions(&item.extensions)?;
        self.event(Event::End(BytesEnd::new("item")))
    }

    fn extensions(&mut self, exts: &Extensions) -> Result<(), EncodeError> {
        for (prefix, by_name) in exts {
            for ext in by_name.values().flatten() {
                self.extension(prefix, ext)?;
            }
        }
        Ok(())
    }

    fn extension(&mut self, prefix: &str, ext: &Extension) -> Result<(), EncodeError> {
        let name = if prefix.is_empty() {
            ext.name.clone()
        } else {
            format!("{prefix}:{}", ext.name)
        };

        let mut start = BytesStart::new(name.as_str());
        for (key, value) in &ext.attrs {
            start.push_attribute((key.as_str(), xml_safe(value).as_ref()));
        }

        let has_text = !is_blank(&ext.value);
        if !has_text && ext.children.is_empty() {
            return self.event(Event::Empty(start));
        }

        self.event(Event::Start(start))?;
        if has_text {
            self.event(Event::Text(BytesText::new(&xml_safe(&ext.value))))?;
        }
        for child in ext.children.values().flatten() {
            self.extension(prefix, child)?;
        }
        self.event(Event::End(BytesEnd::new(name.as_str())))
    }
}
