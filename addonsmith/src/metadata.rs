//! Addon descriptor parsing (`addon.xml`).
//!
//! Each distributable archive carries a descriptor at `<id>/addon.xml`.
//! The descriptor's root element is what gets merged into the repository
//! manifest, so the verbatim subtree text is preserved alongside the
//! parsed fields.

use roxmltree::Document;

use crate::error::{SyncError, SyncResult};

/// Parsed view of an addon descriptor.
#[derive(Debug, Clone)]
pub struct AddonMetadata {
    /// Stable addon identifier (the root element's `id` attribute).
    pub id: String,

    /// Declared version (the root element's `version` attribute).
    pub version: String,

    /// Declared asset paths, relative to the addon directory.
    pub assets: Vec<String>,

    /// Verbatim text of the root element subtree.
    subtree: String,
}

impl AddonMetadata {
    /// Parse a descriptor document.
    ///
    /// The root element must be `<addon>` with an `id` attribute. An
    /// `<assets>` section is optional; when present, the text of each of
    /// its descendant elements is collected as an asset path.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not well-formed XML, the root
    /// element is not `addon`, or the `id` attribute is missing.
    pub fn parse(xml: &str) -> SyncResult<Self> {
        let doc = Document::parse(xml).map_err(|e| SyncError::InvalidDescriptor {
            reason: e.to_string(),
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "addon" {
            return Err(SyncError::InvalidDescriptor {
                reason: format!("expected <addon> root, got <{}>", root.tag_name().name()),
            });
        }

        let id = root
            .attribute("id")
            .ok_or_else(|| SyncError::InvalidDescriptor {
                reason: "missing id attribute on <addon>".to_string(),
            })?
            .to_string();

        let version = root.attribute("version").unwrap_or_default().to_string();

        let assets = root
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "assets")
            .map(|assets| {
                assets
                    .descendants()
                    .filter(|n| n.is_element() && n.tag_name().name() != "assets")
                    .filter_map(|n| n.text())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let subtree = xml[root.range()].to_string();

        Ok(Self {
            id,
            version,
            assets,
            subtree,
        })
    }

    /// The verbatim `<addon>` subtree, ready for manifest merging.
    pub fn subtree(&self) -> &str {
        &self.subtree
    }
}
