//! XML Attribute Parsing
//!
//! Parses the attribute section of a start tag (everything between the
//! element name and `>` or `/>`).

use super::entities::decode_text;
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a str,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a str, value: Cow<'a, str>) -> Self {
        Attribute { name, value }
    }

    /// Copy into an owned (name, value) pair
    pub fn into_owned(self) -> (String, String) {
        (self.name.to_string(), self.value.into_owned())
    }
}

/// Parse attributes from raw tag content
///
/// Rejects missing `=`, unquoted values, `<` inside values, missing
/// whitespace between attributes and duplicate names.
pub fn parse_attributes(input: &str) -> Result<Vec<Attribute<'_>>, &'static str> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if !attrs.is_empty() && pos == ws_start {
            return Err("Attributes must be separated by whitespace");
        }

        // Name
        if !is_name_start_char(bytes[pos]) {
            return Err("Attribute name must start with letter, underscore, or colon");
        }
        let name_start = pos;
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        // Eq ::= S? '=' S?
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err("Attribute without value");
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        // Quoted value
        let quote = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err("Attribute value must be quoted"),
        };
        pos += 1;
        let value_end = memchr(quote, &bytes[pos..])
            .map(|i| pos + i)
            .ok_or("Unterminated attribute value")?;
        let raw = &input[pos..value_end];
        if memchr(b'<', raw.as_bytes()).is_some() {
            return Err("'<' not allowed in attribute value");
        }
        let value = decode_text(raw)?;
        pos = value_end + 1;

        if attrs.iter().any(|a| a.name == name) {
            return Err("Duplicate attribute");
        }
        attrs.push(Attribute::new(name, value));
    }

    Ok(attrs)
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// ASCII subset of NameStartChar; bytes >= 0x80 are accepted as part of
/// multi-byte UTF-8 names
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}
