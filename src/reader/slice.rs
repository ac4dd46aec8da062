//! Slice Reader
//!
//! Turns tokens into events over a borrowed string. Text without entity
//! references and all names are returned as slices of the input.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::entities::decode_text;
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};

/// Zero-copy XML reader from a string slice
pub struct SliceReader<'a> {
    tokenizer: Tokenizer<'a>,
    error: Option<ParseError>,
    /// Start offset of the token behind the last event
    last_start: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            tokenizer: Tokenizer::new(input),
            error: None,
            last_start: 0,
        }
    }

    /// First error from the tokenizer, attribute parsing or entity decoding
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref().or_else(|| self.tokenizer.error())
    }

    /// Consume the reader, returning its error if any
    pub fn into_error(self) -> Option<ParseError> {
        self.error.or_else(|| self.tokenizer.error().cloned())
    }

    /// Byte offset where the most recent event started
    pub fn last_position(&self) -> usize {
        self.last_start
    }

    /// Get the next XML event; None at end of input or after an error
    pub fn next_event(&mut self) -> Option<XmlEvent<'a>> {
        if self.error.is_some() {
            return None;
        }
        let token = self.tokenizer.next_token()?;
        let position = token.span.0;
        self.last_start = position;
        match Self::convert(token) {
            Ok(event) => Some(event),
            Err(message) => {
                self.error = Some(ParseError::new(message, position));
                None
            }
        }
    }

    fn convert(token: Token<'a>) -> Result<XmlEvent<'a>, &'static str> {
        let content = token.content.unwrap_or("");
        let name = token.name.unwrap_or("");
        Ok(match token.kind {
            TokenKind::StartTag => {
                XmlEvent::StartElement(StartElement::new(name, parse_attributes(content)?))
            }
            TokenKind::EmptyTag => {
                XmlEvent::EmptyElement(StartElement::new(name, parse_attributes(content)?))
            }
            TokenKind::EndTag => XmlEvent::EndElement(EndElement::new(name)),
            TokenKind::Text => {
                if content.contains("]]>") {
                    return Err("']]>' not allowed in text content");
                }
                XmlEvent::Text(decode_text(content)?)
            }
            TokenKind::CData => XmlEvent::CData(content),
            TokenKind::Comment => XmlEvent::Comment(content),
            TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
                target: name,
                data: token.content,
            },
            TokenKind::XmlDeclaration => {
                parse_attributes(content)?;
                XmlEvent::XmlDeclaration
            }
            TokenKind::DocType => XmlEvent::DocType(content),
        })
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}
