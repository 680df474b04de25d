//! Audit collaborator contract and a reference JSON sink.
//!
//! The queue forwards one structured record per terminal job outcome.
//! Digest computation and on-disk formatting are the sink's concern, never
//! the queue's: the core must stay testable without hashing real files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Job outcome forwarded to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// A verifiable sanitized artifact exists
    Success,
    /// The job reached a terminal failure
    Failed,
}

/// A threat itemized in the audit trail.
///
/// Whitelist sanitization removes threats implicitly rather than detecting
/// them, so successful jobs carry an empty threat list; the type exists
/// for sinks that merge records from scanning tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    /// Threat category, e.g. "EMBEDDED_EXECUTABLE"
    #[serde(rename = "type")]
    pub threat_type: String,
    /// Severity label
    pub severity: String,
    /// Action taken, e.g. "REMOVED"
    pub action: String,
}

/// Document identity within an audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Original file name
    pub original_name: String,
    /// Full path of the original file
    pub original_path: PathBuf,
    /// Path of the sanitized artifact, absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_path: Option<PathBuf>,
    /// Wall-clock processing time
    pub processing_time_ms: u64,
}

/// Per-job record forwarded to the audit collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Acting operator identity
    pub operator: String,
    /// Document classification label
    pub classification: String,
    /// Document identity and timing
    pub document: DocumentRecord,
    /// Itemized threats; empty for whitelist sanitization
    pub threats_detected: Vec<Threat>,
    /// Policy in force when the job ran
    pub sanitization_policy: String,
    /// Terminal outcome
    pub status: AuditStatus,
    /// Failure message, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Receives per-job audit records.
pub trait AuditSink: Send {
    /// Persist one record. Sink failures must not fail the job.
    fn log_event(&self, record: AuditRecord);
}

/// Reference sink: one JSON file per event, enriched with SHA-256 digests
/// and byte sizes of the original and sanitized files.
pub struct JsonAuditLog {
    log_dir: PathBuf,
}

/// The enriched on-disk form of an [`AuditRecord`].
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredAuditEvent {
    /// Unique event id, `STZ-YYYYMMDD-HHMMSSmmm`
    pub event_id: String,
    /// UTC timestamp of the record
    pub timestamp: String,
    /// Hostname of the sanitizing workstation
    pub workstation_id: String,
    /// The forwarded record
    #[serde(flatten)]
    pub record: AuditRecord,
    /// SHA-256 of the original file, if readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_hash_sha256: Option<String>,
    /// Size of the original file in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size_bytes: Option<u64>,
    /// SHA-256 of the sanitized file, if readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_hash_sha256: Option<String>,
    /// Size of the sanitized file in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_size_bytes: Option<u64>,
}

impl JsonAuditLog {
    /// Create a sink writing into `log_dir`, creating it if needed.
    pub fn new<P: Into<PathBuf>>(log_dir: P) -> std::io::Result<Self> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir)?;
        Ok(Self { log_dir })
    }

    fn digest(path: &Path) -> Option<(String, u64)> {
        let bytes = fs::read(path).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Some((format!("{:x}", hasher.finalize()), bytes.len() as u64))
    }
}

impl AuditSink for JsonAuditLog {
    fn log_event(&self, record: AuditRecord) {
        let now = Utc::now();
        let event_id = format!("STZ-{}", now.format("%Y%m%d-%H%M%S%3f"));

        let original = Self::digest(&record.document.original_path);
        let sanitized = record
            .document
            .sanitized_path
            .as_deref()
            .and_then(Self::digest);

        let event = StoredAuditEvent {
            event_id: event_id.clone(),
            timestamp: now.to_rfc3339(),
            workstation_id: hostname(),
            record,
            original_hash_sha256: original.as_ref().map(|(h, _)| h.clone()),
            original_size_bytes: original.map(|(_, s)| s),
            sanitized_hash_sha256: sanitized.as_ref().map(|(h, _)| h.clone()),
            sanitized_size_bytes: sanitized.map(|(_, s)| s),
        };

        let path = self.log_dir.join(format!("{event_id}.json"));
        match serde_json::to_vec_pretty(&event).map(|json| fs::write(&path, json)) {
            Ok(Ok(())) => log::info!("audit event written: {}", path.display()),
            Ok(Err(e)) => log::error!("failed to write audit event {}: {}", path.display(), e),
            Err(e) => log::error!("failed to serialize audit event: {}", e),
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
