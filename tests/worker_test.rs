//! Integration tests for the worker protocol.
//!
//! These drive the protocol through `sh` scripts instead of the real
//! worker binary, so each outcome class can be scripted precisely. The
//! appended `--input`/`--output` arguments land in the scripts as
//! `$1 $2 $3 $4`.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sanipdf::worker::WorkerProtocol;
use sanipdf::Error;

fn scripted_protocol(script: &str) -> WorkerProtocol {
    WorkerProtocol::new("sh").with_base_args(vec!["-c", script, "worker"])
}

/// Side file the scripts use to report their output directory back to the
/// test, so deletion of the ephemeral directory can be asserted.
fn outdir_probe(dir: &Path) -> (PathBuf, String) {
    let probe = dir.join("outdir.txt");
    let fragment = format!(r#"printf '%s' "$4" > {}"#, probe.display());
    (probe, fragment)
}

#[test]
fn scripted_worker_success_returns_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"irrelevant, the script never reads it").unwrap();
    let (probe, record_outdir) = outdir_probe(dir.path());

    let script = format!(
        concat!(
            "{record_outdir}\n",
            r#"printf '{{"pages":[{{"media_box":[0.0,0.0,612.0,792.0],"fonts":{{}},"images":{{}},"has_contents":false}}]}}' > "$4/whitelist.json""#,
            "\n",
            r#"printf '{{"status":"success","output_file":"%s","pages":1}}' "$4/doc_sanitized.pdf" > "$4/result.json""#,
        ),
        record_outdir = record_outdir,
    );

    let protocol = scripted_protocol(&script).with_timeout(Duration::from_secs(10));
    let report = protocol.submit(&input).unwrap();

    assert!(report.result.is_success());
    let manifest = report.manifest.unwrap();
    assert_eq!(manifest.page_count(), 1);
    assert_eq!(manifest.pages[0].media_box, [0.0, 0.0, 612.0, 792.0]);

    // The ephemeral output directory is gone once submit returns.
    let outdir = PathBuf::from(fs::read_to_string(&probe).unwrap());
    assert!(!outdir.exists());
}

#[test]
fn hung_worker_is_killed_on_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"x").unwrap();
    let (probe, record_outdir) = outdir_probe(dir.path());

    let script = format!("{record_outdir}\nsleep 30");
    let protocol = scripted_protocol(&script).with_timeout(Duration::from_secs(1));

    let err = protocol.submit(&input).unwrap_err();
    assert!(matches!(err, Error::WorkerTimeout(1)));
    assert!(err.to_string().contains("timeout"));

    let outdir = PathBuf::from(fs::read_to_string(&probe).unwrap());
    assert!(!outdir.exists());
}

#[test]
fn crashing_worker_reports_exit_code_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"x").unwrap();

    let script = "echo 'simulated segfault' >&2\nexit 3";
    let protocol = scripted_protocol(script).with_timeout(Duration::from_secs(10));

    match protocol.submit(&input).unwrap_err() {
        Error::WorkerCrashed { code, stderr } => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("simulated segfault"));
        }
        other => panic!("expected WorkerCrashed, got {:?}", other),
    }
}

#[test]
fn clean_exit_without_descriptor_is_no_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"x").unwrap();

    let protocol = scripted_protocol("exit 0").with_timeout(Duration::from_secs(10));
    let err = protocol.submit(&input).unwrap_err();
    assert!(matches!(err, Error::NoResultProduced));
}

// A success descriptor is not enough by itself: the manifest must exist.
#[test]
fn success_descriptor_without_manifest_is_no_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"x").unwrap();

    let script = r#"printf '{"status":"success","output_file":"out.pdf","pages":1}' > "$4/result.json""#;
    let protocol = scripted_protocol(script).with_timeout(Duration::from_secs(10));

    let err = protocol.submit(&input).unwrap_err();
    assert!(matches!(err, Error::NoResultProduced));
}

#[test]
fn error_descriptor_is_returned_without_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"x").unwrap();

    let script =
        r#"printf '{"status":"error","message":"Document is password-protected and cannot be opened"}' > "$4/result.json""#;
    let protocol = scripted_protocol(script).with_timeout(Duration::from_secs(10));

    let report = protocol.submit(&input).unwrap();
    assert!(!report.result.is_success());
    assert!(report.manifest.is_none());
}

#[test]
fn garbage_descriptor_is_no_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    fs::write(&input, b"x").unwrap();

    let script = r#"printf 'not json' > "$4/result.json""#;
    let protocol = scripted_protocol(script).with_timeout(Duration::from_secs(10));

    let err = protocol.submit(&input).unwrap_err();
    assert!(matches!(err, Error::NoResultProduced));
}
