//! Page-level manifest types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Media box used when a page has no usable geometry: US Letter in points.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// The whitelisted description of a single page.
///
/// Holds only metadata: the media box, a font manifest (resource name to
/// BaseFont string) and an image manifest. Content streams stay in the
/// source document and are copied at the object-graph level during
/// reconstruction, never through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistedPage {
    /// Page media box `[llx, lly, urx, ury]` in points
    pub media_box: [f32; 4],

    /// Font resources: name → BaseFont
    #[serde(default)]
    pub fonts: BTreeMap<String, String>,

    /// Image XObject resources: name → image properties
    #[serde(default)]
    pub images: BTreeMap<String, ImageInfo>,

    /// Whether the page carries a content stream
    pub has_contents: bool,
}

impl WhitelistedPage {
    /// Create a page descriptor with the given media box and no resources.
    pub fn new(media_box: [f32; 4]) -> Self {
        Self {
            media_box,
            fonts: BTreeMap::new(),
            images: BTreeMap::new(),
            has_contents: false,
        }
    }

    /// The blank descriptor substituted for pages that failed extraction.
    pub fn blank() -> Self {
        Self::new(DEFAULT_MEDIA_BOX)
    }

    /// Page width in points.
    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    /// Page height in points.
    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Total number of whitelisted resources on the page.
    pub fn resource_count(&self) -> usize {
        self.fonts.len() + self.images.len()
    }
}

impl Default for WhitelistedPage {
    fn default() -> Self {
        Self::blank()
    }
}

/// Properties recorded for an admitted Image XObject.
///
/// Only raster images pass the whitelist; Form XObjects (which can nest
/// further content) never reach this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    /// XObject subtype, always an image variant
    pub subtype: String,

    /// Image width in pixels
    pub width: Option<u32>,

    /// Image height in pixels
    pub height: Option<u32>,

    /// Color space name, if declared
    pub color_space: Option<String>,
}
