//! End-to-end tests driving the real worker binary through the protocol.

use std::path::Path;
use std::time::Duration;

use lopdf::{dictionary, Document as LopdfDocument, Object, Stream};
use sanipdf::worker::{WorkerProtocol, WorkerResult};

const WORKER_BIN: &str = env!("CARGO_BIN_EXE_sanipdf-worker");

fn write_fixture(path: &Path, pages: usize) {
    let mut doc = LopdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            b"BT 72 720 Td (worker fixture) Tj ET".to_vec(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
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
    doc.save(path).unwrap();
}

#[test]
fn worker_binary_produces_manifest_for_valid_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("brochure.pdf");
    write_fixture(&input, 2);

    let protocol = WorkerProtocol::new(WORKER_BIN).with_timeout(Duration::from_secs(30));
    let report = protocol.submit(&input).unwrap();

    assert!(report.result.is_success());
    let manifest = report.manifest.unwrap();
    assert_eq!(manifest.page_count(), 2);
    assert!(manifest.pages.iter().all(|p| p.has_contents));
}

#[test]
fn worker_binary_reports_error_for_garbage_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("garbage.pdf");
    std::fs::write(&input, b"%PDF-nope this is not a pdf").unwrap();

    let protocol = WorkerProtocol::new(WORKER_BIN).with_timeout(Duration::from_secs(30));
    let report = protocol.submit(&input).unwrap();

    match report.result {
        WorkerResult::Error { message, .. } => assert!(!message.is_empty()),
        other => panic!("expected error descriptor, got {:?}", other),
    }
    assert!(report.manifest.is_none());
}
