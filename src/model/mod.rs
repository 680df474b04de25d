//! Whitelist manifest model.
//!
//! The manifest is everything the sanitizer keeps from an untrusted
//! document: page geometry and a resource inventory. It deliberately owns
//! no binary content, so it can cross the worker process boundary as JSON.

mod document;
mod page;

pub use document::WhitelistedDocument;
pub use page::{ImageInfo, WhitelistedPage, DEFAULT_MEDIA_BOX};
