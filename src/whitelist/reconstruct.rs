//! Sanitized document reconstruction.

use std::fs;
use std::path::Path;

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::model::WhitelistedDocument;

/// Rebuilds a clean PDF from a whitelist manifest.
///
/// With a source document attached, pages are copied verbatim at the
/// object-graph level, content streams included; the whitelist decides
/// what *structure* survives, it does not rewrite stream operators.
/// Without a source, blank pages are synthesized from the manifest media
/// boxes with an empty font dictionary.
///
/// In both modes the document information dictionary, any XMP metadata
/// stream and any AcroForm dictionary are deleted if present; their
/// absence is not an error.
pub struct Reconstructor {
    manifest: WhitelistedDocument,
    source: Option<LopdfDocument>,
}

impl Reconstructor {
    /// Create a reconstructor that synthesizes blank pages.
    pub fn new(manifest: WhitelistedDocument) -> Self {
        Self {
            manifest,
            source: None,
        }
    }

    /// Attach the source document by path for verbatim page copy-through.
    pub fn with_source_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path.as_ref()).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::PasswordProtected,
            _ => Error::ReconstructionFailed(e.to_string()),
        })?;
        self.source = Some(doc);
        Ok(self)
    }

    /// Attach the source document from bytes.
    pub fn with_source_bytes(mut self, data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::PasswordProtected,
            _ => Error::ReconstructionFailed(e.to_string()),
        })?;
        self.source = Some(doc);
        Ok(self)
    }

    /// Build the sanitized document and return its bytes.
    pub fn build(self) -> Result<Vec<u8>> {
        let mut doc = match self.source {
            Some(doc) => {
                log::info!("copying {} pages from source document", doc.get_pages().len());
                doc
            }
            None => {
                log::warn!("no source document attached, synthesizing blank pages");
                synthesize_blank(&self.manifest)
            }
        };

        strip_disallowed(&mut doc);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Error::ReconstructionFailed(e.to_string()))?;
        Ok(bytes)
    }

    /// Build the sanitized document and write it to `path`.
    pub fn build_to_file<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.build()?;
        fs::write(path, bytes).map_err(|e| Error::ReconstructionFailed(e.to_string()))?;
        log::info!("sanitized document written to {}", path.display());
        Ok(())
    }
}

/// Delete the info dictionary, XMP metadata and AcroForm, then drop
/// whatever objects that left unreferenced.
fn strip_disallowed(doc: &mut LopdfDocument) {
    if doc.trailer.remove(b"Info").is_some() {
        log::debug!("removed document information dictionary");
    }

    if let Ok(root_id) = doc.trailer.get(b"Root").and_then(|o| o.as_reference()) {
        if let Ok(catalog) = doc.get_object_mut(root_id).and_then(|o| o.as_dict_mut()) {
            if catalog.remove(b"Metadata").is_some() {
                log::debug!("removed XMP metadata stream");
            }
            if catalog.remove(b"AcroForm").is_some() {
                log::debug!("removed AcroForm dictionary");
            }
        }
    }

    doc.prune_objects();
}

/// Build a document of blank pages sized from the manifest media boxes.
fn synthesize_blank(manifest: &WhitelistedDocument) -> LopdfDocument {
    let mut doc = LopdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(manifest.page_count());
    for page in &manifest.pages {
        let resources = dictionary! {
            "Font" => Dictionary::new(),
            "ProcSet" => vec![
                "PDF".into(),
                "Text".into(),
                "ImageB".into(),
                "ImageC".into(),
                "ImageI".into(),
            ],
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0f32.into(),
                0f32.into(),
                page.width().into(),
                page.height().into(),
            ],
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}
