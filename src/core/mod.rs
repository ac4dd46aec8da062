//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: Markup/character-data splitting with well-formedness errors
//! - Entities: XML entity decoding with Cow (zero-copy when possible), escaping
//! - Attributes: Attribute parsing and extraction
//! - Encoding: File encodings (UTF-16, UTF-8, ASCII) and BOM detection

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
