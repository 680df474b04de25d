//! Whitelist parser over lopdf.

use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{ImageInfo, WhitelistedDocument, WhitelistedPage, DEFAULT_MEDIA_BOX};

/// Parses a PDF and extracts only whitelisted structure.
///
/// The manifest admits Font entries (name + BaseFont) and Image XObjects
/// (name + Subtype/Width/Height/ColorSpace). Form XObjects and every other
/// XObject subtype are excluded: non-image XObjects can carry nested
/// content streams or scripts, and their exclusion is the security
/// boundary of the whole pipeline.
pub struct WhitelistParser {
    doc: LopdfDocument,
}

impl WhitelistParser {
    /// Open a PDF file.
    ///
    /// Fails with [`Error::PasswordProtected`] when the document cannot be
    /// opened without credentials.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path.as_ref()).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::PasswordProtected,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::PasswordProtected,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::PasswordProtected);
        }
        Ok(Self { doc })
    }

    /// Number of pages in the source document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Extract the whitelist manifest.
    ///
    /// Yields exactly one descriptor per source page. A page that fails
    /// extraction degrades to the blank descriptor; parsing never aborts
    /// the whole document for a single bad page.
    pub fn parse(&self) -> WhitelistedDocument {
        let mut manifest = WhitelistedDocument::new();
        let pages = self.doc.get_pages();
        let total = pages.len();

        for (page_num, page_id) in pages {
            log::debug!("processing page {}/{}", page_num, total);
            match self.parse_page(page_id) {
                Ok(page) => manifest.add_page(page),
                Err(e) => {
                    log::warn!("page {} failed extraction, substituting blank: {}", page_num, e);
                    manifest.add_page(WhitelistedPage::blank());
                }
            }
        }

        manifest
    }

    /// Extract the whitelisted description of a single page.
    fn parse_page(&self, page_id: ObjectId) -> Result<WhitelistedPage> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let mut page = WhitelistedPage::new(self.media_box(page_dict));
        page.has_contents = page_dict.get(b"Contents").is_ok();

        if let Ok(res) = page_dict.get(b"Resources") {
            if let Some(res_dict) = self.resolve_dict(res) {
                self.extract_fonts(res_dict, &mut page);
                self.extract_images(res_dict, &mut page);
            }
        }

        Ok(page)
    }

    /// Read the page media box, defaulting on missing or malformed input.
    fn media_box(&self, page_dict: &lopdf::Dictionary) -> [f32; 4] {
        let array = match page_dict.get(b"MediaBox").and_then(|o| o.as_array()) {
            Ok(array) if array.len() >= 4 => array,
            _ => return DEFAULT_MEDIA_BOX,
        };

        let mut media_box = [0.0f32; 4];
        for (slot, obj) in media_box.iter_mut().zip(array.iter()) {
            match obj.as_float() {
                Ok(v) => *slot = v,
                Err(_) => return DEFAULT_MEDIA_BOX,
            }
        }
        media_box
    }

    /// Record Font resources: name plus BaseFont string only.
    fn extract_fonts(&self, res_dict: &lopdf::Dictionary, page: &mut WhitelistedPage) {
        let fonts = match res_dict.get(b"Font") {
            Ok(obj) => obj,
            Err(_) => return,
        };
        let Some(font_dict) = self.resolve_dict(fonts) else {
            return;
        };

        for (name, obj) in font_dict.iter() {
            let name = String::from_utf8_lossy(name).to_string();
            let base_font = self
                .resolve_dict(obj)
                .and_then(|d| d.get(b"BaseFont").ok())
                .and_then(|b| b.as_name_str().ok())
                .unwrap_or("Unknown")
                .to_string();
            log::debug!("whitelisted font {} ({})", name, base_font);
            page.fonts.insert(name, base_font);
        }
    }

    /// Record Image XObjects; skip forms and every other subtype.
    fn extract_images(&self, res_dict: &lopdf::Dictionary, page: &mut WhitelistedPage) {
        let xobjects = match res_dict.get(b"XObject") {
            Ok(obj) => obj,
            Err(_) => return,
        };
        let Some(xobj_dict) = self.resolve_dict(xobjects) else {
            return;
        };

        for (name, obj) in xobj_dict.iter() {
            let name = String::from_utf8_lossy(name).to_string();
            let Some(dict) = self.resolve_stream_dict(obj) else {
                continue;
            };

            let subtype = dict
                .get(b"Subtype")
                .ok()
                .and_then(|s| s.as_name_str().ok())
                .unwrap_or("");
            if !subtype.contains("Image") {
                log::debug!("skipped non-image XObject {} (subtype {:?})", name, subtype);
                continue;
            }

            let width = dict.get(b"Width").ok().and_then(|w| w.as_i64().ok()).map(|w| w as u32);
            let height = dict.get(b"Height").ok().and_then(|h| h.as_i64().ok()).map(|h| h as u32);
            let color_space = dict.get(b"ColorSpace").ok().and_then(|cs| match cs {
                Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
                Object::Array(arr) => arr
                    .first()
                    .and_then(|o| o.as_name_str().ok())
                    .map(String::from),
                _ => None,
            });

            log::debug!("whitelisted image {}", name);
            page.images.insert(
                name,
                ImageInfo {
                    subtype: subtype.to_string(),
                    width,
                    height,
                    color_space,
                },
            );
        }
    }

    /// Follow a reference to a dictionary, or take an inline dictionary.
    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a lopdf::Dictionary> {
        match obj {
            Object::Reference(r) => match self.doc.get_object(*r).ok()? {
                Object::Dictionary(d) => Some(d),
                Object::Stream(s) => Some(&s.dict),
                _ => None,
            },
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Resolve an XObject entry to its stream dictionary.
    fn resolve_stream_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a lopdf::Dictionary> {
        match obj {
            Object::Reference(r) => match self.doc.get_object(*r).ok()? {
                Object::Stream(s) => Some(&s.dict),
                Object::Dictionary(d) => Some(d),
                _ => None,
            },
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }
}
