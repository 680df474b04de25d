//! Integration tests for the whitelist transform.

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, Stream};
use sanipdf::model::DEFAULT_MEDIA_BOX;
use sanipdf::{Reconstructor, WhitelistParser};

/// Build a PDF fixture in memory.
///
/// `media_boxes` holds one entry per page; `None` omits the MediaBox key
/// entirely. Optionally attaches an info dictionary, an XMP metadata
/// stream and an AcroForm to exercise the stripping paths.
struct FixtureBuilder {
    media_boxes: Vec<Option<[f32; 4]>>,
    with_info: bool,
    with_metadata: bool,
    with_acroform: bool,
    with_form_xobject: bool,
}

impl FixtureBuilder {
    fn new() -> Self {
        Self {
            media_boxes: vec![Some([0.0, 0.0, 612.0, 792.0])],
            with_info: false,
            with_metadata: false,
            with_acroform: false,
            with_form_xobject: false,
        }
    }

    fn pages(mut self, media_boxes: Vec<Option<[f32; 4]>>) -> Self {
        self.media_boxes = media_boxes;
        self
    }

    fn info(mut self) -> Self {
        self.with_info = true;
        self
    }

    fn metadata(mut self) -> Self {
        self.with_metadata = true;
        self
    }

    fn acroform(mut self) -> Self {
        self.with_acroform = true;
        self
    }

    fn form_xobject(mut self) -> Self {
        self.with_form_xobject = true;
        self
    }

    fn build(self) -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for media_box in &self.media_boxes {
            let content_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {},
                b"BT /F1 12 Tf 72 720 Td (fixture) Tj ET".to_vec(),
            )));

            let mut xobjects = Dictionary::new();
            let image_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 8,
                    "Height" => 8,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                vec![0u8; 8 * 8 * 3],
            )));
            xobjects.set("Im0", image_id);
            if self.with_form_xobject {
                let form_id = doc.add_object(Object::Stream(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                    },
                    b"0 0 50 50 re f".to_vec(),
                )));
                xobjects.set("Fm0", form_id);
            }

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => xobjects,
                },
            };
            if let Some(mb) = media_box {
                page.set(
                    "MediaBox",
                    vec![mb[0].into(), mb[1].into(), mb[2].into(), mb[3].into()],
                );
            }
            let page_id = doc.add_object(page);
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

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if self.with_metadata {
            let metadata_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
                b"<?xpacket begin=\"\"?><x:xmpmeta/><?xpacket end=\"w\"?>".to_vec(),
            )));
            catalog.set("Metadata", metadata_id);
        }
        if self.with_acroform {
            let acroform_id = doc.add_object(dictionary! {
                "Fields" => Vec::<Object>::new(),
            });
            catalog.set("AcroForm", acroform_id);
        }
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", catalog_id);

        if self.with_info {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal("fixture"),
                "Producer" => Object::string_literal("sanipdf tests"),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

fn sanitize_bytes(bytes: &[u8]) -> Vec<u8> {
    let parser = WhitelistParser::from_bytes(bytes).unwrap();
    let manifest = parser.parse();
    Reconstructor::new(manifest)
        .with_source_bytes(bytes)
        .unwrap()
        .build()
        .unwrap()
}

// One descriptor per source page, malformed geometry defaulted.
#[test]
fn parse_keeps_one_descriptor_per_page() {
    let bytes = FixtureBuilder::new()
        .pages(vec![
            Some([0.0, 0.0, 612.0, 792.0]),
            None,
            Some([0.0, 0.0, 595.0, 842.0]),
        ])
        .build();

    let parser = WhitelistParser::from_bytes(&bytes).unwrap();
    let manifest = parser.parse();

    assert_eq!(manifest.page_count(), 3);
    assert_eq!(manifest.pages[0].media_box, [0.0, 0.0, 612.0, 792.0]);
    assert_eq!(manifest.pages[1].media_box, DEFAULT_MEDIA_BOX);
    assert_eq!(manifest.pages[2].media_box, [0.0, 0.0, 595.0, 842.0]);
}

#[test]
fn parse_whitelists_fonts_and_images() {
    let bytes = FixtureBuilder::new().build();
    let parser = WhitelistParser::from_bytes(&bytes).unwrap();
    let manifest = parser.parse();

    let page = &manifest.pages[0];
    assert_eq!(page.fonts["F1"], "Helvetica");
    assert_eq!(page.images["Im0"].subtype, "Image");
    assert_eq!(page.images["Im0"].width, Some(8));
    assert_eq!(page.images["Im0"].color_space.as_deref(), Some("DeviceRGB"));
    assert!(page.has_contents);
}

// Form XObjects are the security boundary: they never enter the manifest.
#[test]
fn parse_excludes_form_xobjects() {
    let bytes = FixtureBuilder::new().form_xobject().build();
    let parser = WhitelistParser::from_bytes(&bytes).unwrap();
    let manifest = parser.parse();

    let page = &manifest.pages[0];
    assert!(page.images.contains_key("Im0"));
    assert!(!page.images.contains_key("Fm0"));
}

// Reconstruction output never contains Info, XMP metadata or AcroForm.
#[test]
fn reconstruct_strips_disallowed_dictionaries() {
    let bytes = FixtureBuilder::new()
        .info()
        .metadata()
        .acroform()
        .build();

    let sanitized = sanitize_bytes(&bytes);
    let doc = LopdfDocument::load_mem(&sanitized).unwrap();

    assert!(doc.trailer.get(b"Info").is_err());
    let catalog = doc.catalog().unwrap();
    assert!(catalog.get(b"Metadata").is_err());
    assert!(catalog.get(b"AcroForm").is_err());
}

#[test]
fn reconstruct_preserves_page_count_and_content() {
    let bytes = FixtureBuilder::new()
        .pages(vec![Some([0.0, 0.0, 612.0, 792.0]), None])
        .info()
        .build();

    let sanitized = sanitize_bytes(&bytes);
    let doc = LopdfDocument::load_mem(&sanitized).unwrap();
    assert_eq!(doc.get_pages().len(), 2);

    // Copy-through keeps the content stream of the first page.
    let pages = doc.get_pages();
    let first = pages.values().next().unwrap();
    let page_dict = doc.get_dictionary(*first).unwrap();
    assert!(page_dict.get(b"Contents").is_ok());
}

// Re-sanitizing a sanitized document changes neither page count nor
// the absence of the stripped dictionaries.
#[test]
fn sanitization_is_idempotent() {
    let bytes = FixtureBuilder::new()
        .pages(vec![Some([0.0, 0.0, 612.0, 792.0]), None, None])
        .info()
        .metadata()
        .acroform()
        .build();

    let once = sanitize_bytes(&bytes);
    let twice = sanitize_bytes(&once);

    let doc = LopdfDocument::load_mem(&twice).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert!(doc.trailer.get(b"Info").is_err());
    let catalog = doc.catalog().unwrap();
    assert!(catalog.get(b"Metadata").is_err());
    assert!(catalog.get(b"AcroForm").is_err());
}

// Without a source document, reconstruction synthesizes blank pages from
// the manifest geometry.
#[test]
fn reconstruct_without_source_synthesizes_blanks() {
    let bytes = FixtureBuilder::new()
        .pages(vec![Some([0.0, 0.0, 300.0, 400.0]), None])
        .build();

    let parser = WhitelistParser::from_bytes(&bytes).unwrap();
    let manifest = parser.parse();
    let blank = Reconstructor::new(manifest).build().unwrap();

    let doc = LopdfDocument::load_mem(&blank).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 2);

    let first = doc.get_dictionary(*pages.values().next().unwrap()).unwrap();
    let mb = first.get(b"MediaBox").unwrap().as_array().unwrap();
    assert_eq!(mb[2].as_float().unwrap(), 300.0);
    assert_eq!(mb[3].as_float().unwrap(), 400.0);
    // Blank pages carry no content stream.
    assert!(first.get(b"Contents").is_err());
}
