//! Small text helpers shared by the encoders.

mod text;

pub use text::{is_blank, xml_safe};
