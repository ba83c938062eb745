use std::borrow::Cow;

/// Returns true for characters XML 1.0 does not allow in documents.
///
/// Allowed: tab, LF, CR, U+0020..=U+D7FF, U+E000..=U+FFFD, U+10000 and above.
fn is_xml_illegal(c: char) -> bool {
    !matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Strip characters that would make an XML document ill-formed.
///
/// Upstream feeds occasionally carry stray C0 control bytes (copy-pasted
/// show notes, broken CMS exports). The escaper in the XML writer handles
/// `<`, `&` and quotes, but cannot represent these at all, so they are dropped.
///
/// Returns `Cow::Borrowed` when the input is already clean (common case).
pub fn xml_safe(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_xml_illegal) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_xml_illegal(c)).collect())
}

/// True when the string is empty or whitespace only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
