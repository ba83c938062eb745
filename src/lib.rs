//! Splits one upstream podcast feed into per-show feeds.
//!
//! The crate is organised as a pipeline: [`source`] obtains the upstream
//! bytes, [`feed`] parses them into a format-neutral model, [`category`]
//! decides which show every episode belongs to, and [`feed::rss`] /
//! [`feed::atom`] write the filtered result back out. [`server`] exposes the
//! pipeline over HTTP.

pub mod category;
pub mod config;
pub mod feed;
pub mod server;
pub mod source;
pub mod util;
