//! XML Document
//!
//! An [`XmlTree`] paired with a [`TextFile`]: bulk node-value substitution
//! plus whole-document load and save.

use std::path::Path;

use tracing::{debug, warn};

use crate::core::encoding::FileEncoding;
use crate::dom::{NodeId, WriteOptions, XmlTree, ROOT};
use crate::error::Result;
use crate::file::TextFile;

/// In-memory XML document bound to a file encoding
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    tree: XmlTree,
    file: TextFile,
    options: WriteOptions,
}

impl XmlDocument {
    /// Create an empty document read and written in `encoding`
    pub fn new(encoding: FileEncoding) -> Self {
        XmlDocument {
            tree: XmlTree::new(),
            file: TextFile::new(encoding),
            options: WriteOptions::default(),
        }
    }

    /// Create an empty document with explicit XML generation rules
    pub fn with_options(encoding: FileEncoding, options: WriteOptions) -> Self {
        XmlDocument {
            options,
            ..Self::new(encoding)
        }
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut XmlTree {
        &mut self.tree
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn encoding(&self) -> FileEncoding {
        self.file.encoding()
    }

    pub fn set_encoding(&mut self, encoding: FileEncoding) {
        self.file.set_encoding(encoding);
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Replace the value of every element named `node_name`.
    ///
    /// With a non-empty `attr_name`, only elements carrying that attribute
    /// with a value equal to `attr_val` qualify; an empty `attr_val` then
    /// matches only an attribute whose value is empty. Returns the number of
    /// elements updated.
    pub fn set_node_value(&mut self, node_name: &str, attr_name: &str, attr_val: &str, node_val: &str) -> usize {
        let matches: Vec<NodeId> = self
            .find_all_nodes(ROOT, node_name)
            .into_iter()
            .filter(|&id| attr_name.is_empty() || self.tree.attribute(id, attr_name) == Some(attr_val))
            .collect();

        for &id in &matches {
            self.tree.set_value(id, node_val);
        }
        matches.len()
    }

    /// Every element at or below `node` named `node_name`, in pre-order
    pub fn find_all_nodes(&self, node: NodeId, node_name: &str) -> Vec<NodeId> {
        self.tree.find_elements(node, node_name)
    }

    /// Remove all children and attributes of the document node
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Serialize with the document's generation rules
    pub fn to_xml(&self) -> String {
        let options = self.options.with_encoding(self.file.encoding());
        self.tree.to_xml(&options)
    }

    /// Serialize the tree and overwrite `path` with it
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.file.write_str(path, &self.to_xml())?;
        debug!(path = %path.display(), nodes = self.tree.node_count(), "saved document");
        Ok(())
    }

    /// Replace the document with the contents of `path`.
    ///
    /// On failure the document is left empty.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match self.read_tree(path) {
            Ok(tree) => {
                self.tree = tree;
                debug!(path = %path.display(), nodes = self.tree.node_count(), "loaded document");
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "load failed, document cleared");
                self.tree.clear();
                Err(err)
            }
        }
    }

    fn read_tree(&self, path: &Path) -> Result<XmlTree> {
        let text = self.file.read_to_string(path)?;
        Ok(XmlTree::parse(&text)?)
    }
}
