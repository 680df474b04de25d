//! Error types for the sanipdf library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sanitization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF sanitization.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The document is encrypted and cannot be opened without credentials.
    #[error("Document is password-protected and cannot be opened")]
    PasswordProtected,

    /// The input file disappeared before processing started.
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// The isolated worker exceeded its wall-clock timeout and was killed.
    #[error("Worker exceeded {0}s timeout and was killed")]
    WorkerTimeout(u64),

    /// The isolated worker exited with a nonzero status.
    #[error("Worker crashed (exit code {code:?}): {stderr}")]
    WorkerCrashed {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// The worker exited cleanly but wrote no result descriptor.
    #[error("Worker produced no result descriptor")]
    NoResultProduced,

    /// Rebuilding the sanitized document failed.
    #[error("Reconstruction failed: {0}")]
    ReconstructionFailed(String),

    /// The sanitized output file does not exist where it was expected.
    #[error("Sanitized output not created at {0}")]
    OutputNotCreated(PathBuf),

    /// An OS-level isolation control is no longer verifiably active.
    /// Fatal and unrecoverable; bypasses the ordinary job error channel.
    #[error("Isolation breach detected: {0}")]
    IsolationBreach(String),

    /// A configuration value is outside its permitted range.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::PasswordProtected,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl Error {
    /// Whether this error must terminate the whole process rather than
    /// fail a single job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::IsolationBreach(_))
    }
}
