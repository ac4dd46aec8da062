//! XML Tokenizer
//!
//! Splits a document into markup and character-data tokens. Tag names are
//! extracted here; attribute sections and entity references are left raw for
//! the reader. The first well-formedness error stops tokenization and is
//! kept in `error()`.

use super::attributes::{is_name_char, is_name_start_char, is_whitespace};
use super::scanner::Scanner;
use std::fmt;

/// Kind of token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// <name ...>
    StartTag,
    /// </name>
    EndTag,
    /// <name .../>
    EmptyTag,
    /// Character data between markup
    Text,
    /// <![CDATA[...]]>
    CData,
    /// <!--...-->
    Comment,
    /// <?target data?>
    ProcessingInstruction,
    /// <?xml ...?>
    XmlDeclaration,
    /// <!DOCTYPE ...>
    DocType,
}

/// A token borrowed from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Tag name or PI target
    pub name: Option<&'a str>,
    /// Text, comment or CDATA body; raw attribute section for tags; PI data
    pub content: Option<&'a str>,
    /// Byte range of the whole token in the input
    pub span: (usize, usize),
}

/// Well-formedness error with the byte offset where it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Pull tokenizer over a UTF-8 string
pub struct Tokenizer<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    error: Option<ParseError>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            scanner: Scanner::new(input.as_bytes()),
            error: None,
        }
    }

    /// First error encountered, if any
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Next token, or None at end of input or after an error
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        if self.error.is_some() || self.scanner.is_eof() {
            return None;
        }
        let result = if self.scanner.peek() == Some(b'<') {
            self.markup()
        } else {
            Ok(self.text())
        };
        match result {
            Ok(token) => Some(token),
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }

    fn fail<T>(&self, message: &str, position: usize) -> Result<T, ParseError> {
        Err(ParseError::new(message, position))
    }

    fn text(&mut self) -> Token<'a> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.input.len());
        self.scanner.set_position(end);
        Token {
            kind: TokenKind::Text,
            name: None,
            content: Some(&self.input[start..end]),
            span: (start, end),
        }
    }

    /// Consume up to and including `terminator`, returning the body between
    /// `body_start` and the terminator
    fn until(&mut self, body_start: usize, terminator: &str, what: &str) -> Result<&'a str, ParseError> {
        let start = self.scanner.position();
        self.scanner.set_position(body_start);
        match self.scanner.find_str(terminator.as_bytes()) {
            Some(end) => {
                self.scanner.set_position(end + terminator.len());
                Ok(&self.input[body_start..end])
            }
            None => self.fail(&format!("Unterminated {}", what), start),
        }
    }

    fn markup(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        let rest = self.scanner.remaining();

        if rest.starts_with(b"<!--") {
            let body = self.until(start + 4, "-->", "comment")?;
            if body.contains("--") || body.ends_with('-') {
                return self.fail("'--' not allowed inside comment", start);
            }
            return Ok(self.token(TokenKind::Comment, None, Some(body), start));
        }
        if rest.starts_with(b"<![CDATA[") {
            let body = self.until(start + 9, "]]>", "CDATA section")?;
            return Ok(self.token(TokenKind::CData, None, Some(body), start));
        }
        if rest.starts_with(b"<!DOCTYPE") {
            return self.doctype(start);
        }
        if rest.starts_with(b"<?") {
            return self.processing_instruction(start);
        }
        if rest.starts_with(b"</") {
            return self.end_tag(start);
        }
        if rest.get(1).copied().is_some_and(is_name_start_char) {
            return self.start_tag(start);
        }
        self.fail("Invalid markup", start)
    }

    fn token(&self, kind: TokenKind, name: Option<&'a str>, content: Option<&'a str>, start: usize) -> Token<'a> {
        Token {
            kind,
            name,
            content,
            span: (start, self.scanner.position()),
        }
    }

    /// Read a Name starting at `pos`, returning it and the offset after it
    fn name_at(&self, pos: usize) -> Option<(&'a str, usize)> {
        let bytes = self.input.as_bytes();
        if !bytes.get(pos).copied().is_some_and(is_name_start_char) {
            return None;
        }
        let mut end = pos + 1;
        while end < bytes.len() && is_name_char(bytes[end]) {
            end += 1;
        }
        Some((&self.input[pos..end], end))
    }

    fn start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let (name, name_end) = self
            .name_at(start + 1)
            .ok_or_else(|| ParseError::new("Invalid element name", start))?;
        self.scanner.set_position(name_end);
        let close = match self.scanner.find_tag_end_quoted() {
            Some(close) => close,
            None => return self.fail("Unterminated start tag", start),
        };
        self.scanner.set_position(close + 1);

        let bytes = self.input.as_bytes();
        let (kind, attr_end) = if close > name_end && bytes[close - 1] == b'/' {
            (TokenKind::EmptyTag, close - 1)
        } else {
            (TokenKind::StartTag, close)
        };
        if attr_end > name_end && !is_whitespace(bytes[name_end]) {
            return self.fail("Invalid character in element name", name_end);
        }
        let attrs = &self.input[name_end..attr_end];
        Ok(self.token(kind, Some(name), Some(attrs), start))
    }

    fn end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let (name, mut pos) = self
            .name_at(start + 2)
            .ok_or_else(|| ParseError::new("Invalid end tag name", start))?;
        let bytes = self.input.as_bytes();
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'>') {
            return self.fail("Malformed end tag", start);
        }
        self.scanner.set_position(pos + 1);
        Ok(self.token(TokenKind::EndTag, Some(name), None, start))
    }

    fn processing_instruction(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let (target, name_end) = self
            .name_at(start + 2)
            .ok_or_else(|| ParseError::new("Invalid processing instruction target", start))?;
        let body = self.until(name_end, "?>", "processing instruction")?;
        let data = body.trim_start_matches([' ', '\t', '\r', '\n']);
        if !body.is_empty() && data.len() == body.len() {
            return self.fail("Invalid processing instruction target", start);
        }
        let kind = if target.eq_ignore_ascii_case("xml") {
            if start != 0 {
                return self.fail("XML declaration must be at the start of the document", start);
            }
            TokenKind::XmlDeclaration
        } else {
            TokenKind::ProcessingInstruction
        };
        let data = (!data.is_empty()).then_some(data);
        Ok(self.token(kind, Some(target), data, start))
    }

    /// DOCTYPE may carry an internal subset in brackets containing '>'
    fn doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let bytes = self.input.as_bytes();
        let mut pos = start + 9;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while pos < bytes.len() {
            let b = bytes[pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => {
                        self.scanner.set_position(pos + 1);
                        let body = self.input[start + 9..pos].trim();
                        return Ok(self.token(TokenKind::DocType, None, Some(body), start));
                    }
                    _ => {}
                },
            }
            pos += 1;
        }
        self.fail("Unterminated DOCTYPE", start)
    }
}
