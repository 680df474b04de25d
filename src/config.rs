//! Sanitizer configuration.
//!
//! The crate consumes validated values only; signed storage and admin
//! tooling live outside. `validate` enforces the permitted ranges before
//! any component sees the numbers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Validated configuration for the sanitization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Policy label recorded in audit events
    pub sanitization_policy: String,

    /// Worker memory ceiling in MB, valid range 100–2048
    pub memory_limit_mb: u32,

    /// Worker wall-clock timeout in seconds, valid range 10–3600
    pub timeout_seconds: u64,

    /// Largest accepted input in MB
    pub max_file_size_mb: u64,

    /// Whether the isolation monitor runs
    pub enable_isolation_monitoring: bool,

    /// Whether audit records are forwarded
    pub enable_audit_logging: bool,

    /// Directory for rejected input
    pub quarantine_directory: PathBuf,

    /// Directory for audit and forensic logs
    pub log_directory: PathBuf,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            sanitization_policy: "AGGRESSIVE".to_string(),
            memory_limit_mb: 500,
            timeout_seconds: 300,
            max_file_size_mb: 500,
            enable_isolation_monitoring: true,
            enable_audit_logging: true,
            quarantine_directory: PathBuf::from("quarantine"),
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl SanitizerConfig {
    /// Check the numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if !(100..=2048).contains(&self.memory_limit_mb) {
            return Err(Error::Config(format!(
                "memory_limit_mb must be between 100 and 2048, got {}",
                self.memory_limit_mb
            )));
        }
        if !(10..=3600).contains(&self.timeout_seconds) {
            return Err(Error::Config(format!(
                "timeout_seconds must be between 10 and 3600, got {}",
                self.timeout_seconds
            )));
        }
        Ok(())
    }

    /// Path of the forensic compromise log inside the log directory.
    pub fn forensic_log_path(&self) -> PathBuf {
        self.log_directory.join("compromise_alert.json")
    }
}
