//! RustyFoundation - reusable building blocks
//!
//! Components:
//! - delegate: Multicast delegate with pluggable lock policies
//! - document: XML document with file load/save and bulk value substitution
//!
//! Supporting layers for the document:
//! - core: Scanner, tokenizer, entities, attributes, text encodings
//! - reader: Pull reader producing XML events
//! - dom: Mutable arena tree and XML writer
//! - file: Encoding-aware file base

pub mod core;
pub mod delegate;
pub mod document;
pub mod dom;
pub mod error;
pub mod file;
pub mod reader;

pub use crate::core::encoding::FileEncoding;
pub use crate::core::tokenizer::ParseError;
pub use delegate::{Delegate, Delegate0, DelegateError, Handler, LockPolicy, MulticastDelegate};
pub use document::XmlDocument;
pub use dom::{NodeId, WriteOptions, XmlTree};
pub use error::XmlError;
pub use file::TextFile;
