//! The aggregate addon manifest (`addons.xml`).
//!
//! The manifest is an ordered mapping from addon identifier to the verbatim
//! XML subtree describing that addon. Subtrees are never re-encoded: they
//! are sliced verbatim out of the source text on load and written back
//! unchanged, so serializing an unchanged index reproduces the file
//! byte for byte.

use std::fs;
use std::path::Path;

use roxmltree::Document;

use crate::error::{SyncError, SyncResult};

/// Manifest filename.
pub const MANIFEST_FILENAME: &str = "addons.xml";

/// XML declaration emitted at the top of the manifest.
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Root element name.
const ROOT_ELEMENT: &str = "addons";

#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    xml: String,
}

/// The repository manifest: at most one entry per addon identifier,
/// kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct AddonIndex {
    entries: Vec<IndexEntry>,
}

impl AddonIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest file, or construct an empty index if it does not
    /// exist. No schema validation is performed beyond well-formedness.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let text = fs::read_to_string(path).map_err(|e| SyncError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&text).map_err(|e| match e {
            SyncError::InvalidManifest { reason, .. } => SyncError::InvalidManifest {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a manifest document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not well-formed XML, the root
    /// element is not `<addons>`, or a child element lacks an `id`
    /// attribute.
    pub fn parse(text: &str) -> SyncResult<Self> {
        let invalid = |reason: String| SyncError::InvalidManifest {
            path: Default::default(),
            reason,
        };

        let doc = Document::parse(text).map_err(|e| invalid(e.to_string()))?;

        let root = doc.root_element();
        if root.tag_name().name() != ROOT_ELEMENT {
            return Err(invalid(format!(
                "expected <{}> root, got <{}>",
                ROOT_ELEMENT,
                root.tag_name().name()
            )));
        }

        let mut entries = Vec::new();
        for child in root.children().filter(|n| n.is_element()) {
            let id = child
                .attribute("id")
                .ok_or_else(|| {
                    invalid(format!(
                        "<{}> entry is missing an id attribute",
                        child.tag_name().name()
                    ))
                })?
                .to_string();

            entries.push(IndexEntry {
                id,
                xml: text[child.range()].to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// Look up the subtree for an addon identifier.
    pub fn find(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.xml.as_str())
    }

    /// Replace the entry for an addon identifier.
    ///
    /// Any existing subtree for the identifier is discarded wholesale (no
    /// version comparison is performed) and the new subtree is appended as
    /// the last entry.
    pub fn replace(&mut self, id: &str, subtree: &str) {
        self.entries.retain(|e| e.id != id);
        self.entries.push(IndexEntry {
            id: id.to_string(),
            xml: subtree.to_string(),
        });
    }

    /// Addon identifiers in manifest order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the manifest back to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_DECLARATION);
        out.push('\n');
        out.push_str("<addons>\n");
        for entry in &self.entries {
            out.push_str(&entry.xml);
            out.push('\n');
        }
        out.push_str("</addons>\n");
        out
    }
}
