//! Reads RSS, RDF, Atom and JSON Feed documents into the generic [`Feed`] model.
//!
//! XML formats go through `quick-xml` so that namespaced elements survive as an
//! [`Extensions`] tree. JSON Feed has no extension concept and is handed to
//! `feed-rs`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use thiserror::Error;

use super::model::{
    coalesce, first_extension, Enclosure, Extension, Extensions, Feed, Image, Item, Person,
    Timestamp,
};

/// Maximum element nesting accepted from upstream documents.
const MAX_DEPTH: usize = 64;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Document nesting exceeds maximum of {0} levels")]
    TooDeep(usize),

    #[error("Unsupported feed format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON feed parse error: {0}")]
    Json(String),

    #[error("Empty document")]
    Empty,
}

/// Parses raw upstream bytes.
///
/// The format is picked from the document itself: a leading `{` means JSON
/// Feed, otherwise the XML root element decides between RSS 2.0, RSS 1.0 and
/// Atom.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Err(ParseError::Empty),
        Some(b'{') => from_json(bytes),
        Some(_) => {
            let root = read_tree(bytes)?;
            match root.name.as_str() {
                "rss" => from_rss(&root),
                "rdf:RDF" | "RDF" => Ok(from_rdf(&root)),
                "feed" => Ok(from_atom(&root)),
                other => Err(ParseError::UnsupportedFormat(format!("<{other}> root element"))),
            }
        }
    }
}

// ============================================================================
// Element tree
// ============================================================================

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Self, ParseError> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| ParseError::Xml(err.to_string()))?;
            let key = decode(reader, attr.key.as_ref());
            let value = unescape_lenient(&decode(reader, &attr.value)).into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name: decode(reader, e.name().as_ref()),
            attrs,
            ..Self::default()
        })
    }

    fn attr(&self, key: &str) -> &str {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> &str {
        self.child(name).map(|c| c.text.trim()).unwrap_or("")
    }

    fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }
}

fn read_tree(bytes: &[u8]) -> Result<Element, ParseError> {
    // No trim_text: text and CDATA segments are concatenated first and the
    // whole value is trimmed where it is read.
    let mut reader = Reader::from_reader(bytes);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::TooDeep(MAX_DEPTH));
                }
                stack.push(Element::open(&e, &reader)?);
            }
            Ok(Event::Empty(e)) => {
                let el = Element::open(&e, &reader)?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::End(_)) => {
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescape_lenient(&decode(&reader, &t)));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&decode(&reader, &c));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Xml(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or(ParseError::Empty)
}

/// Decodes raw bytes with the encoding declared in the XML prolog (UTF-8
/// when there is none). Undecodable input degrades to lossy UTF-8.
fn decode(reader: &Reader<&[u8]>, raw: &[u8]) -> String {
    match reader.decoder().decode(raw) {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Entities resolved on top of XML's predefined five. Feeds routinely carry
/// HTML entities in show notes without declaring them.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("nbsp", "\u{a0}"),
    ("shy", "\u{ad}"),
    ("ensp", "\u{2002}"),
    ("emsp", "\u{2003}"),
    ("thinsp", "\u{2009}"),
    ("ndash", "–"),
    ("mdash", "—"),
    ("hellip", "…"),
    ("laquo", "«"),
    ("raquo", "»"),
    ("lsquo", "‘"),
    ("rsquo", "’"),
    ("sbquo", "‚"),
    ("ldquo", "“"),
    ("rdquo", "”"),
    ("bdquo", "„"),
    ("bull", "•"),
    ("middot", "·"),
    ("copy", "©"),
    ("reg", "®"),
    ("trade", "™"),
    ("deg", "°"),
    ("times", "×"),
    ("euro", "€"),
    ("numero", "№"),
];

fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => HTML_ENTITIES
            .iter()
            .find(|(entity, _)| *entity == name)
            .map(|(_, value)| *value),
    }
}

/// Longest `&name;` reference considered when recovering from a bad entity.
const MAX_ENTITY_LEN: usize = 32;

/// Unescapes character and entity references.
///
/// Unknown entities and stray ampersands are kept as literal text instead of
/// failing the whole value, so one `&foo;` does not leave every other
/// reference in the same node undecoded.
fn unescape_lenient(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = quick_xml::escape::unescape_with(raw, resolve_entity) {
        return text;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let reference = rest
            .char_indices()
            .take(MAX_ENTITY_LEN)
            .skip(1)
            .take_while(|(_, c)| !c.is_whitespace() && *c != '&')
            .find(|(_, c)| *c == ';')
            .map(|(end, _)| &rest[..=end]);
        match reference {
            Some(reference) => {
                match quick_xml::escape::unescape_with(reference, resolve_entity) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(reference),
                }
                rest = &rest[reference.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

// ============================================================================
// Extensions
// ============================================================================

/// Collects every prefixed direct child of `parent` into an extension tree.
fn collect_extensions(parent: &Element) -> Extensions {
    let mut exts = Extensions::new();
    for child in &parent.children {
        if let Some((prefix, local)) = child.name.split_once(':') {
            exts.entry(prefix.to_string())
                .or_default()
                .entry(local.to_string())
                .or_default()
                .push(to_extension(child));
        }
    }
    exts
}

fn to_extension(el: &Element) -> Extension {
    let mut ext = Extension::new(el.local_name()).with_value(el.text.trim());
    for (key, value) in &el.attrs {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        ext.attrs.insert(key.clone(), value.clone());
    }
    for child in &el.children {
        ext.children
            .entry(child.local_name().to_string())
            .or_default()
            .push(to_extension(child));
    }
    ext
}

fn extension_text<'a>(exts: &'a Extensions, prefix: &str, name: &str) -> &'a str {
    first_extension(exts, prefix, name)
        .map(|e| e.value.as_str())
        .unwrap_or("")
}

// ============================================================================
// RSS 2.0 / RSS 1.0
// ============================================================================

fn from_rss(root: &Element) -> Result<Feed, ParseError> {
    let channel = root
        .child("channel")
        .ok_or_else(|| ParseError::UnsupportedFormat("<rss> without <channel>".to_string()))?;
    let mut feed = rss_channel(channel);
    feed.items = channel.children_named("item").map(rss_item).collect();
    Ok(feed)
}

/// RSS 1.0 keeps items and the image as siblings of the channel.
fn from_rdf(root: &Element) -> Feed {
    let mut feed = root.child("channel").map(rss_channel).unwrap_or_default();
    if feed.image.is_none() {
        feed.image = root.child("image").and_then(rss_image);
    }
    feed.items = root.children_named("item").map(rss_item).collect();
    feed
}

fn rss_channel(channel: &Element) -> Feed {
    let extensions = collect_extensions(channel);

    let image = channel.child("image").and_then(rss_image).or_else(|| {
        first_extension(&extensions, "itunes", "image")
            .and_then(|e| e.attrs.get("href"))
            .filter(|href| !href.trim().is_empty())
            .map(|href| Image {
                url: href.clone(),
                title: String::new(),
            })
    });

    let author = parse_person(coalesce(&[
        channel.child_text("managingEditor"),
        channel.child_text("webMaster"),
        extension_text(&extensions, "itunes", "author"),
        extension_text(&extensions, "dc", "creator"),
    ]));

    Feed {
        title: channel.child_text("title").to_string(),
        link: channel.child_text("link").to_string(),
        description: channel.child_text("description").to_string(),
        language: coalesce(&[
            channel.child_text("language"),
            extension_text(&extensions, "dc", "language"),
        ])
        .to_string(),
        published: parse_date(channel.child_text("pubDate"))
            .or_else(|| parse_date(extension_text(&extensions, "dc", "date"))),
        updated: parse_date(channel.child_text("lastBuildDate")),
        image,
        author,
        extensions,
        items: Vec::new(),
    }
}

fn rss_image(el: &Element) -> Option<Image> {
    let url = coalesce(&[el.child_text("url"), el.attr("rdf:resource")]);
    if url.is_empty() {
        return None;
    }
    Some(Image {
        url: url.to_string(),
        title: el.child_text("title").to_string(),
    })
}

fn rss_item(el: &Element) -> Item {
    let extensions = collect_extensions(el);

    let enclosures = el
        .children_named("enclosure")
        .filter(|e| !e.attr("url").trim().is_empty())
        .map(|e| Enclosure {
            url: e.attr("url").to_string(),
            length: e.attr("length").to_string(),
            mime_type: e.attr("type").to_string(),
        })
        .collect();

    Item {
        title: el.child_text("title").to_string(),
        link: el.child_text("link").to_string(),
        description: el.child_text("description").to_string(),
        content: extension_text(&extensions, "content", "encoded").to_string(),
        guid: el.child_text("guid").to_string(),
        published: parse_date(el.child_text("pubDate"))
            .or_else(|| parse_date(extension_text(&extensions, "dc", "date"))),
        updated: None,
        author: parse_person(coalesce(&[
            el.child_text("author"),
            extension_text(&extensions, "dc", "creator"),
            extension_text(&extensions, "itunes", "author"),
        ])),
        enclosures,
        extensions,
    }
}

// ============================================================================
// Atom 1.0
// ============================================================================

fn from_atom(root: &Element) -> Feed {
    let image_url = coalesce(&[root.child_text("logo"), root.child_text("icon")]);
    Feed {
        title: root.child_text("title").to_string(),
        link: atom_alternate_link(root).to_string(),
        description: root.child_text("subtitle").to_string(),
        language: root.attr("xml:lang").to_string(),
        published: parse_date(root.child_text("published")),
        updated: parse_date(root.child_text("updated")),
        image: (!image_url.is_empty()).then(|| Image {
            url: image_url.to_string(),
            title: String::new(),
        }),
        author: root.child("author").and_then(atom_person),
        extensions: collect_extensions(root),
        items: root.children_named("entry").map(atom_entry).collect(),
    }
}

fn atom_entry(el: &Element) -> Item {
    let enclosures = el
        .children_named("link")
        .filter(|l| l.attr("rel") == "enclosure" && !l.attr("href").trim().is_empty())
        .map(|l| Enclosure {
            url: l.attr("href").to_string(),
            length: l.attr("length").to_string(),
            mime_type: l.attr("type").to_string(),
        })
        .collect();

    Item {
        title: el.child_text("title").to_string(),
        link: atom_alternate_link(el).to_string(),
        description: el.child_text("summary").to_string(),
        content: el.child_text("content").to_string(),
        guid: el.child_text("id").to_string(),
        published: parse_date(coalesce(&[el.child_text("published"), el.child_text("issued")])),
        updated: parse_date(coalesce(&[el.child_text("updated"), el.child_text("modified")])),
        author: el.child("author").and_then(atom_person),
        enclosures,
        extensions: collect_extensions(el),
    }
}

fn atom_alternate_link(el: &Element) -> &str {
    el.children_named("link")
        .find(|l| matches!(l.attr("rel"), "" | "alternate"))
        .map(|l| l.attr("href"))
        .unwrap_or("")
}

fn atom_person(el: &Element) -> Option<Person> {
    let person = Person {
        name: el.child_text("name").to_string(),
        email: el.child_text("email").to_string(),
    };
    (!person.name.is_empty() || !person.email.is_empty()).then_some(person)
}

// ============================================================================
// JSON Feed
// ============================================================================

fn from_json(bytes: &[u8]) -> Result<Feed, ParseError> {
    let parsed = feed_rs::parser::parse(bytes).map_err(|e| ParseError::Json(e.to_string()))?;

    let items = parsed
        .entries
        .into_iter()
        .map(|entry| {
            let mut enclosures: Vec<Enclosure> = entry
                .links
                .iter()
                .filter(|l| l.rel.as_deref() == Some("enclosure"))
                .map(|l| Enclosure {
                    url: l.href.clone(),
                    length: l.length.map(|n| n.to_string()).unwrap_or_default(),
                    mime_type: l.media_type.clone().unwrap_or_default(),
                })
                .collect();
            enclosures.extend(entry.media.iter().flat_map(|m| &m.content).filter_map(|c| {
                c.url.as_ref().map(|url| Enclosure {
                    url: url.to_string(),
                    length: c.size.map(|n| n.to_string()).unwrap_or_default(),
                    mime_type: c
                        .content_type
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_default(),
                })
            }));

            Item {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                link: json_link(&entry.links),
                description: entry.summary.map(|t| t.content).unwrap_or_default(),
                content: entry.content.and_then(|c| c.body).unwrap_or_default(),
                guid: entry.id,
                published: entry.published.map(|t| t.fixed_offset()),
                updated: entry.updated.map(|t| t.fixed_offset()),
                author: entry.authors.first().map(json_person),
                enclosures,
                extensions: Extensions::new(),
            }
        })
        .collect();

    Ok(Feed {
        title: parsed.title.map(|t| t.content).unwrap_or_default(),
        link: json_link(&parsed.links),
        description: parsed.description.map(|t| t.content).unwrap_or_default(),
        language: parsed.language.unwrap_or_default(),
        published: parsed.published.map(|t| t.fixed_offset()),
        updated: parsed.updated.map(|t| t.fixed_offset()),
        image: parsed.logo.or(parsed.icon).map(|i| Image {
            url: i.uri,
            title: i.title.unwrap_or_default(),
        }),
        author: parsed.authors.first().map(json_person),
        extensions: Extensions::new(),
        items,
    })
}

fn json_link(links: &[feed_rs::model::Link]) -> String {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

fn json_person(p: &feed_rs::model::Person) -> Person {
    Person {
        name: p.name.clone(),
        email: p.email.clone().unwrap_or_default(),
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Parses the date formats seen in the wild, most specific first.
///
/// Unparsable dates are treated as absent rather than failing the feed.
fn parse_date(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|n| n.and_utc().fixed_offset())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc().fixed_offset())
        })
}

/// Splits the RSS `email (Name)` convention; bare values are a name unless
/// they look like an address.
fn parse_person(raw: &str) -> Option<Person> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some((email, rest)) = s.split_once('(') {
        if let Some(name) = rest.trim_end().strip_suffix(')') {
            return Some(Person {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
            });
        }
    }
    if s.contains('@') && !s.contains(char::is_whitespace) {
        return Some(Person {
            name: String::new(),
            email: s.to_string(),
        });
    }
    Some(Person {
        name: s.to_string(),
        email: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PODCAST_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Завтракаст</title>
    <link>https://example.com</link>
    <description>Podcast about games</description>
    <language>ru</language>
    <pubDate>Mon, 01 Jan 2024 10:00:00 +0300</pubDate>
    <lastBuildDate>Tue, 02 Jan 2024 11:00:00 +0300</lastBuildDate>
    <managingEditor>editor@example.com (Editor)</managingEditor>
    <itunes:author>Zavtracast</itunes:author>
    <itunes:category text="Leisure"><itunes:category text="Video Games"/></itunes:category>
    <itunes:image href="https://example.com/cover.jpg"/>
    <item>
      <title>СДЗ: Episode 1</title>
      <link>https://example.com/1</link>
      <description><![CDATA[<p>Notes &amp; links</p>]]></description>
      <content:encoded><![CDATA[<p>Full notes</p>]]></content:encoded>
      <guid isPermaLink="false">ep-1</guid>
      <pubDate>Mon, 01 Jan 2024 10:00:00 +0300</pubDate>
      <enclosure url="https://cdn.example.com/1.mp3" length="123" type="audio/mpeg"/>
      <enclosure url="https://cdn.example.com/1.ogg" type="audio/ogg"/>
      <itunes:duration>01:02:03</itunes:duration>
    </item>
    <item>
      <title>Завтракаст 300</title>
      <guid>https://example.com/300</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_channel() {
        let feed = parse_feed(PODCAST_RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Завтракаст");
        assert_eq!(feed.link, "https://example.com");
        assert_eq!(feed.description, "Podcast about games");
        assert_eq!(feed.language, "ru");
        assert_eq!(
            feed.published.map(|t| t.to_rfc3339()),
            Some("2024-01-01T10:00:00+03:00".to_string())
        );
        assert!(feed.updated.is_some());
        assert_eq!(
            feed.author,
            Some(Person {
                name: "Editor".to_string(),
                email: "editor@example.com".to_string()
            })
        );
        // No <image>: falls back to itunes:image.
        assert_eq!(
            feed.image.as_ref().map(|i| i.url.as_str()),
            Some("https://example.com/cover.jpg")
        );
    }

    #[test]
    fn test_parse_rss_extensions_tree() {
        let feed = parse_feed(PODCAST_RSS.as_bytes()).unwrap();
        let category = first_extension(&feed.extensions, "itunes", "category").unwrap();
        assert_eq!(category.attrs["text"], "Leisure");
        assert_eq!(category.children["category"][0].attrs["text"], "Video Games");
        assert_eq!(extension_text(&feed.extensions, "itunes", "author"), "Zavtracast");
        // Standard elements are not mistaken for extensions.
        assert!(!feed.extensions.contains_key(""));
    }

    #[test]
    fn test_parse_rss_items() {
        let feed = parse_feed(PODCAST_RSS.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.title, "СДЗ: Episode 1");
        assert_eq!(first.description, "<p>Notes &amp; links</p>");
        assert_eq!(first.content, "<p>Full notes</p>");
        assert_eq!(first.guid, "ep-1");
        assert_eq!(first.enclosures.len(), 2);
        assert_eq!(first.enclosures[0].length, "123");
        assert_eq!(first.enclosures[1].length, "");
        assert_eq!(
            extension_text(&first.extensions, "itunes", "duration"),
            "01:02:03"
        );

        let second = &feed.items[1];
        assert_eq!(second.guid, "https://example.com/300");
        assert!(second.published.is_none());
        assert!(second.enclosures.is_empty());
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en">
  <title>Blog</title>
  <subtitle>Posts</subtitle>
  <link rel="self" href="https://example.com/atom.xml"/>
  <link href="https://example.com/"/>
  <updated>2024-02-01T00:00:00Z</updated>
  <logo>https://example.com/logo.png</logo>
  <author><name>Jane</name><email>jane@example.com</email></author>
  <entry>
    <title>Фотодушнила #1</title>
    <link rel="alternate" href="https://example.com/p1"/>
    <link rel="enclosure" href="https://example.com/p1.mp3" length="42" type="audio/mpeg"/>
    <id>urn:uuid:1</id>
    <published>2024-01-31T12:00:00+01:00</published>
    <updated>2024-02-01T00:00:00Z</updated>
    <summary>Short</summary>
    <content type="html">Long</content>
  </entry>
</feed>"#;
        let feed = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(feed.title, "Blog");
        assert_eq!(feed.link, "https://example.com/");
        assert_eq!(feed.description, "Posts");
        assert_eq!(feed.language, "en");
        assert_eq!(feed.image.unwrap().url, "https://example.com/logo.png");
        assert_eq!(feed.author.unwrap().name, "Jane");

        let entry = &feed.items[0];
        assert_eq!(entry.link, "https://example.com/p1");
        assert_eq!(entry.guid, "urn:uuid:1");
        assert_eq!(entry.description, "Short");
        assert_eq!(entry.content, "Long");
        assert_eq!(entry.enclosures[0].url, "https://example.com/p1.mp3");
        assert_eq!(entry.enclosures[0].length, "42");
        assert!(entry.published.is_some());
        assert!(entry.updated.is_some());
    }

    #[test]
    fn test_parse_rdf() {
        let rdf = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.com/">
    <title>Old</title>
    <link>https://example.com/</link>
    <description>RSS 1.0</description>
  </channel>
  <item rdf:about="https://example.com/a">
    <title>A</title>
    <link>https://example.com/a</link>
    <dc:date>2024-03-01T08:00:00Z</dc:date>
  </item>
</rdf:RDF>"#;
        let feed = parse_feed(rdf.as_bytes()).unwrap();
        assert_eq!(feed.title, "Old");
        assert_eq!(feed.items.len(), 1);
        assert!(feed.items[0].published.is_some());
        assert_eq!(feed.items[0].extensions["dc"]["date"].len(), 1);
    }

    #[test]
    fn test_parse_json_feed() {
        let json = r#"{
  "version": "https://jsonfeed.org/version/1.1",
  "title": "JSON Show",
  "home_page_url": "https://example.com/",
  "items": [
    {"id": "1", "title": "СДЗ #1", "url": "https://example.com/1", "content_text": "Hi"}
  ]
}"#;
        let feed = parse_feed(json.as_bytes()).unwrap();
        assert_eq!(feed.title, "JSON Show");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "СДЗ #1");
        assert_eq!(feed.items[0].guid, "1");
    }

    #[test]
    fn test_bom_and_leading_whitespace() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"\n  <rss version=\"2.0\"><channel><title>T</title></channel></rss>");
        assert_eq!(parse_feed(&bytes).unwrap().title, "T");
    }

    #[test]
    fn test_rejects_malformed_and_unknown() {
        assert!(matches!(parse_feed(b""), Err(ParseError::Empty)));
        assert!(matches!(parse_feed(b"   "), Err(ParseError::Empty)));
        assert!(matches!(
            parse_feed(b"<html><body/></html>"),
            Err(ParseError::UnsupportedFormat(_))
        ));
        assert!(parse_feed(b"<rss><channel>").is_err());
        assert!(matches!(
            parse_feed(b"<rss version=\"2.0\"></rss>"),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_html_entities_decode_alongside_xml_escapes() {
        let doc = r#"<rss version="2.0"><channel><title>T</title>
<item><title>СДЗ&nbsp;1 &amp; 2</title><description>a &bogus; b &amp; c &#8212; d & e</description>
<itunes:image href="https://x/a.jpg?w=1&amp;h=2&nope;"/></item>
</channel></rss>"#;
        let feed = parse_feed(doc.as_bytes()).unwrap();
        let item = &feed.items[0];
        assert_eq!(item.title, "СДЗ\u{a0}1 & 2");
        assert_eq!(item.description, "a &bogus; b & c — d & e");
        assert_eq!(
            first_extension(&item.extensions, "itunes", "image").unwrap().attrs["href"],
            "https://x/a.jpg?w=1&h=2&nope;"
        );
    }

    #[test]
    fn test_unescape_lenient() {
        assert!(matches!(unescape_lenient("plain"), Cow::Borrowed("plain")));
        assert_eq!(unescape_lenient("&lt;b&gt; &laquo;x&raquo;"), "<b> «x»");
        assert_eq!(unescape_lenient("&unknown; &amp;"), "&unknown; &");
        assert_eq!(unescape_lenient("AT&T &#x41;"), "AT&T A");
        assert_eq!(unescape_lenient("trailing &"), "trailing &");
    }

    #[test]
    fn test_declared_windows_1251_encoding() {
        let mut doc = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?>\n<rss version=\"2.0\"><channel><title>".to_vec();
        // "Завтракаст" and "СДЗ: 1" in windows-1251
        doc.extend_from_slice(b"\xC7\xE0\xE2\xF2\xF0\xE0\xEA\xE0\xF1\xF2");
        doc.extend_from_slice(b"</title><item><title>\xD1\xC4\xC7: 1</title></item></channel></rss>");

        let feed = parse_feed(&doc).unwrap();
        assert_eq!(feed.title, "Завтракаст");
        assert_eq!(feed.items[0].title, "СДЗ: 1");
        assert_eq!(
            crate::category::classify(&feed.items[0].title),
            crate::category::Category::Sdz
        );
    }

    #[test]
    fn test_mixed_text_and_cdata_keep_inner_whitespace() {
        let doc = r#"<rss version="2.0"><channel><title>T</title>
<item><title>
    Ep 1
</title><description>Intro <![CDATA[<b>x</b>]]> outro </description></item>
</channel></rss>"#;
        let item = &parse_feed(doc.as_bytes()).unwrap().items[0];
        assert_eq!(item.title, "Ep 1");
        assert_eq!(item.description, "Intro <b>x</b> outro");
    }

    #[test]
    fn test_rejects_excessive_nesting() {
        let doc = format!("{}{}", "<a>".repeat(MAX_DEPTH + 1), "</a>".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse_feed(doc.as_bytes()),
            Err(ParseError::TooDeep(MAX_DEPTH))
        ));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("Mon, 01 Jan 2024 10:00:00 GMT").is_some());
        assert!(parse_date("2024-01-01T10:00:00+03:00").is_some());
        assert!(parse_date("2024-01-01T10:00:00").is_some());
        assert!(parse_date("2024-01-01").is_some());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("  ").is_none());
    }

    #[test]
    fn test_parse_person() {
        assert_eq!(
            parse_person("a@b.c (Alice)"),
            Some(Person {
                name: "Alice".into(),
                email: "a@b.c".into()
            })
        );
        assert_eq!(parse_person("a@b.c").unwrap().email, "a@b.c");
        assert_eq!(parse_person("Alice Smith").unwrap().name, "Alice Smith");
        assert_eq!(parse_person(""), None);
    }
}
