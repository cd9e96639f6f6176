//! # Splice Document
//!
//! Attributed element tree for MLT project files.
//!
//! ```text
//! XML text ──tokenize──▶ tokens ──parse──▶ XmlDocument (arena) ──serialize──▶ XML text
//! ```
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; structural
//! edits move handles between ordered child lists, so an element keeps
//! every attribute and child it carries when it is re-parented.

pub mod error;
pub mod escape;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use error::{DocumentError, DocumentResult};
pub use node::{Node, NodeId, XmlDocument};
pub use parser::{parse, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};

use std::path::Path;

impl XmlDocument {
    /// Parse a document from a file
    pub fn load(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let source = std::fs::read_to_string(path)?;
        parse(&source)
    }

    /// Write the serialized document to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> DocumentResult<()> {
        std::fs::write(path, serialize(self))?;
        Ok(())
    }

    /// Serialize with the default settings
    pub fn to_xml_string(&self) -> String {
        serialize(self)
    }
}
