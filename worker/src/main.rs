//! sanipdf worker - sandboxed PDF parsing process
//!
//! Entry point for the isolated side of the worker protocol. The
//! orchestrator launches one of these per document under resource
//! ceilings; the only trusted channel back is `result.json` in the
//! `--output` directory. Logging goes to stderr so diagnostics ride the
//! crash channel when the process dies.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use sanipdf::worker::{WorkerResult, MANIFEST_FILE, RESULT_FILE};
use sanipdf::{Reconstructor, WhitelistParser};

#[derive(Parser)]
#[command(name = "sanipdf-worker")]
#[command(version)]
#[command(about = "Sandboxed parsing worker for the sanipdf PDF sanitizer", long_about = None)]
struct Cli {
    /// Untrusted input PDF
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    /// Exclusive result directory created by the orchestrator
    #[arg(long, value_name = "DIR")]
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    log::info!("worker started for {}", cli.input.display());

    match run(&cli.input, &cli.output) {
        Ok(pages) => {
            log::info!("sanitization complete ({} pages), worker exiting", pages);
            ExitCode::SUCCESS
        }
        Err(e) => {
            // A handled error still exits cleanly: the descriptor is the
            // channel, nonzero exit is reserved for genuine crashes.
            log::error!("sanitization failed: {}", e);
            write_result(
                &cli.output,
                &WorkerResult::Error {
                    message: e.to_string(),
                    traceback: format!("{e:?}"),
                },
            );
            ExitCode::SUCCESS
        }
    }
}

/// Parse, reconstruct and publish the result descriptor.
fn run(input: &Path, output_dir: &Path) -> sanipdf::Result<usize> {
    let parser = WhitelistParser::open(input)?;
    let manifest = parser.parse();
    let pages = manifest.page_count();
    log::info!("whitelist extraction kept {} pages", pages);

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let output_file = output_dir.join(format!("{stem}_sanitized.pdf"));

    Reconstructor::new(manifest.clone())
        .with_source_path(input)?
        .build_to_file(&output_file)?;
    log::info!("sanitized document written to {}", output_file.display());

    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| sanipdf::Error::ReconstructionFailed(e.to_string()))?;
    fs::write(output_dir.join(MANIFEST_FILE), manifest_json)?;

    write_result(
        output_dir,
        &WorkerResult::Success {
            output_file,
            pages,
        },
    );
    Ok(pages)
}

/// Write the one-shot result descriptor; best-effort on the error path.
fn write_result(output_dir: &Path, result: &WorkerResult) {
    let path = output_dir.join(RESULT_FILE);
    match serde_json::to_vec_pretty(result) {
        Ok(json) => {
            if let Err(e) = fs::write(&path, json) {
                log::error!("failed to write result descriptor {}: {}", path.display(), e);
            }
        }
        Err(e) => log::error!("failed to serialize result descriptor: {}", e),
    }
}
