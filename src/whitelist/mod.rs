//! Whitelist transform: parse and reconstruct.
//!
//! Parsing reduces an untrusted document to a [`WhitelistedDocument`]
//! manifest; reconstruction rebuilds a clean container from that manifest,
//! copying page content from the source at the object-graph level and
//! unconditionally stripping the document info dictionary, XMP metadata
//! and interactive forms.

mod parser;
mod reconstruct;

pub use parser::WhitelistParser;
pub use reconstruct::Reconstructor;

/// Suffix appended to the input file stem for sanitized output.
pub const SANITIZED_SUFFIX: &str = "_sanitized";

use std::path::{Path, PathBuf};

/// Compute the sanitized output path for an input: same directory, same
/// stem with the `_sanitized` suffix, `.pdf` extension.
pub fn sanitized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{SANITIZED_SUFFIX}.pdf"))
}
