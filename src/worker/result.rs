//! Wire types for the worker's one-shot result channel.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::WhitelistedDocument;

/// Name of the result descriptor the worker writes into its output
/// directory. It is the only channel the orchestrator trusts.
pub const RESULT_FILE: &str = "result.json";

/// Name of the manifest file written beside the result descriptor on
/// success, so the orchestrator can reconstruct without re-parsing the
/// hostile input in-process.
pub const MANIFEST_FILE: &str = "whitelist.json";

/// The worker's result descriptor (`result.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerResult {
    /// The worker parsed and rebuilt the document inside the sandbox.
    Success {
        /// Path of the sanitized file inside the ephemeral directory
        output_file: PathBuf,
        /// Number of pages in the whitelist manifest
        pages: usize,
    },
    /// The worker failed and reported why before exiting cleanly. A
    /// nonzero exit with no descriptor is a crash, not an error report.
    Error {
        /// Human-readable failure message
        message: String,
        /// Diagnostic trace, may be empty
        #[serde(default)]
        traceback: String,
    },
}

impl WorkerResult {
    /// Whether the descriptor reports success.
    pub fn is_success(&self) -> bool {
        matches!(self, WorkerResult::Success { .. })
    }
}

/// Everything `submit` recovers from the ephemeral directory before it is
/// deleted: the result descriptor plus, on success, the manifest.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    /// The parsed `result.json`
    pub result: WorkerResult,
    /// The whitelist manifest, present on success
    pub manifest: Option<WhitelistedDocument>,
}
