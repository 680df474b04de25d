//! Document-level manifest type.

use super::WhitelistedPage;
use serde::{Deserialize, Serialize};

/// The whitelisted description of a whole document.
///
/// Invariant: `pages.len()` equals the source page count. Pages that fail
/// extraction are represented by [`WhitelistedPage::blank`], never dropped,
/// so multi-page salvage keeps page numbering intact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhitelistedDocument {
    /// Ordered page descriptors, one per source page
    pub pages: Vec<WhitelistedPage>,
}

impl WhitelistedDocument {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Number of pages in the manifest.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a page descriptor.
    pub fn add_page(&mut self, page: WhitelistedPage) {
        self.pages.push(page);
    }

    /// Whether the manifest describes no pages at all.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total number of whitelisted resources across all pages.
    pub fn resource_count(&self) -> usize {
        self.pages.iter().map(|p| p.resource_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_manifest() {
        let doc = WhitelistedDocument::new();
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn test_add_pages() {
        let mut doc = WhitelistedDocument::new();
        doc.add_page(WhitelistedPage::blank());
        doc.add_page(WhitelistedPage::new([0.0, 0.0, 595.0, 842.0]));
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].width(), 595.0);
    }
}
