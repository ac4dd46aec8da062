//! XML Entity Decoding and Escaping
//!
//! Handles:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when nothing needs rewriting.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, resolving entity references
///
/// Returns Borrowed if no entities are present. Unknown named entities,
/// unterminated references and invalid character references are errors.
pub fn decode_text(input: &str) -> Result<Cow<'_, str>, &'static str> {
    // Fast path: no '&' at all
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input).map(Cow::Owned)
}

fn decode_entities(input: &str) -> Result<String, &'static str> {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp_offset) = memchr(b'&', &bytes[pos..]) {
        // '&' and ';' are ASCII, so these are char boundaries
        result.push_str(&input[pos..pos + amp_offset]);
        pos += amp_offset;

        let semi_offset = memchr(b';', &bytes[pos..]).ok_or("Unterminated entity reference")?;
        let entity = &input[pos + 1..pos + semi_offset];
        result.push(decode_entity(entity)?);
        pos += semi_offset + 1;
    }
    result.push_str(&input[pos..]);

    Ok(result)
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Result<char, &'static str> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric).ok_or("Invalid character reference");
    }

    match entity {
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "amp" => Ok('&'),
        "quot" => Ok('"'),
        "apos" => Ok('\''),
        "" => Err("Empty entity reference"),
        _ => Err("Undefined entity reference"),
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = if let Some(hex) = entity.strip_prefix(['x', 'X']) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.parse::<u32>().ok()?
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape element text: & < >
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len() + 8);
    escape_to_buf(s, &mut buf, false);
    Cow::Owned(buf)
}

/// Escape an attribute value: & < > " plus tab, newline and carriage return
/// as character references
pub fn escape_attribute(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\t' | b'\n' | b'\r')) {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len() + 8);
    escape_to_buf(s, &mut buf, true);
    Cow::Owned(buf)
}

#[inline]
fn escape_to_buf(s: &str, buf: &mut String, attribute: bool) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' if attribute => buf.push_str("&quot;"),
            '\t' if attribute => buf.push_str("&#9;"),
            '\n' if attribute => buf.push_str("&#10;"),
            '\r' if attribute => buf.push_str("&#13;"),
            _ => buf.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_borrows() {
        assert!(matches!(decode_text("hello world"), Ok(Cow::Borrowed(_))));
    }

    #[test]
    fn test_builtin_entities() {
        assert_eq!(decode_text("&lt;a&gt; &amp; &quot;b&quot; &apos;c&apos;").unwrap(), "<a> & \"b\" 'c'");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_text("&#65;&#x42;&#X43;").unwrap(), "ABC");
        assert_eq!(decode_text("caf&#233;").unwrap(), "café");
    }

    #[test]
    fn test_invalid_references() {
        assert!(decode_text("a & b").is_err());
        assert!(decode_text("&bogus;").is_err());
        assert!(decode_text("&#0;").is_err());
        assert!(decode_text("&#xZZ;").is_err());
        assert!(decode_text("&;").is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_text("a < b & c > \"d\""), "a &lt; b &amp; c &gt; \"d\"");
        assert_eq!(escape_attribute("say \"hi\" & go"), "say &quot;hi&quot; &amp; go");
        assert!(matches!(escape_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_attribute_whitespace() {
        assert_eq!(escape_attribute("a\tb\nc\rd"), "a&#9;b&#10;c&#13;d");
        assert_eq!(escape_text("a\tb\nc"), "a\tb\nc");
        assert_eq!(decode_text(&escape_attribute("x\ny")).unwrap(), "x\ny");
    }
}
