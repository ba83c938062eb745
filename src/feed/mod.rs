//! Feed model, parsing, per-category transformation and re-encoding.
//!
//! # Architecture
//!
//! - [`model`] - Format-neutral feed representation with a recursive extension tree
//! - [`parser`] - RSS / RDF / Atom via `quick-xml`, JSON Feed via `feed-rs`
//! - [`transform`] - Category filtering and metadata overrides
//! - [`rss`] - RSS 2.0 writer that re-emits namespaced extensions
//! - [`atom`] - Atom writer built on `atom_syndication`
//!
//! # Example
//!
//! ```ignore
//! let feed = parse_feed(&bytes)?;
//! let mut out = filter_feed(&feed, Category::Sdz);
//! apply_overrides(&mut out, &meta);
//! let body = encode_rss(&out)?;
//! ```

pub mod atom;
pub mod model;
pub mod parser;
pub mod rss;
pub mod transform;

use thiserror::Error;

pub use atom::encode_atom;
pub use model::{Enclosure, Extension, Extensions, Feed, Image, Item, Person, Timestamp};
pub use parser::{parse_feed, ParseError};
pub use rss::encode_rss;
pub use transform::{apply_overrides, filter_feed};

/// Errors raised while serialising an output document.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("XML write error: {0}")]
    Xml(String),

    #[error("Atom serialization error: {0}")]
    Atom(String),
}
