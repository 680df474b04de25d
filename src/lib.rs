//! # sanipdf
//!
//! Whitelist-based PDF sanitization with process-isolated parsing.
//!
//! Untrusted documents are parsed inside a separate, resource-capped
//! worker process; only a metadata manifest crosses the process boundary,
//! and a reduced-attack-surface copy is rebuilt from it. An independent
//! background monitor watches the OS-level isolation controls and
//! terminates the application when one is no longer verifiably active.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sanipdf::{SanitizationQueue, WorkerProtocol};
//!
//! fn main() -> sanipdf::Result<()> {
//!     let worker = WorkerProtocol::new("sanipdf-worker");
//!     let mut queue = SanitizationQueue::new(Box::new(worker));
//!
//!     queue.enqueue("untrusted.pdf");
//!     queue.process_next();
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Whitelist transform**: admit page geometry, Fonts (BaseFont only)
//!   and Image XObjects; exclude Form XObjects and everything else.
//! - **Isolated worker**: one process per document, memory/CPU ceilings,
//!   one-shot file-based result channel, killed on timeout.
//! - **Sanitization queue**: strict FIFO, one job at a time, success gated
//!   on the output artifact existing, audit record per terminal outcome.
//! - **Isolation monitor**: event-driven watchdog that terminates the
//!   whole application on a verified control violation.

pub mod audit;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod queue;
pub mod whitelist;
pub mod worker;

// Re-export commonly used types
pub use audit::{AuditRecord, AuditSink, AuditStatus, JsonAuditLog};
pub use config::SanitizerConfig;
pub use error::{Error, Result};
pub use model::{ImageInfo, WhitelistedDocument, WhitelistedPage};
pub use monitor::{
    ControlStatus, IsolationControl, IsolationMonitor, IsolationState, MonitorHandle,
};
pub use queue::{IsolatedParser, JobState, QueueEvent, SanitizationJob, SanitizationQueue};
pub use whitelist::{sanitized_path, Reconstructor, WhitelistParser};
pub use worker::{WorkerProtocol, WorkerReport, WorkerResult};

use std::path::{Path, PathBuf};

/// Sanitize a PDF in-process, without worker isolation.
///
/// This is the pipeline the worker binary runs inside its sandbox: parse
/// the whitelist manifest, then reconstruct beside the input with the
/// `_sanitized` suffix. Call it directly only on input you already trust
/// or inside an isolated process.
pub fn sanitize_file<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let parser = WhitelistParser::open(path)?;
    let manifest = parser.parse();

    let output = sanitized_path(path);
    Reconstructor::new(manifest)
        .with_source_path(path)?
        .build_to_file(&output)?;

    if !output.exists() {
        return Err(Error::OutputNotCreated(output));
    }
    Ok(output)
}

/// Parse a PDF and return its whitelist manifest without reconstructing.
pub fn parse_manifest<P: AsRef<Path>>(path: P) -> Result<WhitelistedDocument> {
    let parser = WhitelistParser::open(path)?;
    Ok(parser.parse())
}
