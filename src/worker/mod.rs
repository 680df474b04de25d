//! Process-isolated worker protocol.
//!
//! PDF parsers are a common target for memory-exhaustion and infinite-loop
//! attacks, so parsing runs in a separate process under a resource-bounded
//! execution context. The orchestrator trusts exactly one channel: a
//! `result.json` descriptor inside an ephemeral, exclusive output
//! directory created per submission and deleted on every exit path.

mod limits;
mod result;

pub use limits::{native_context, ExecutionContext, ResourceLimits, UnboundedContext, WorkerHandle};
#[cfg(unix)]
pub use limits::RlimitContext;
pub use result::{WorkerReport, WorkerResult, MANIFEST_FILE, RESULT_FILE};

use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::SanitizerConfig;
use crate::error::{Error, Result};
use crate::model::WhitelistedDocument;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs the whitelist transform in an isolated worker process.
///
/// `submit` blocks until the worker exits or the timeout elapses. On
/// timeout the worker is force-killed. The ephemeral output directory is
/// removed on success, timeout and crash alike.
pub struct WorkerProtocol {
    program: PathBuf,
    base_args: Vec<OsString>,
    context: Box<dyn ExecutionContext>,
    timeout: Duration,
    limits: ResourceLimits,
}

impl WorkerProtocol {
    /// Create a protocol around the given worker binary with default
    /// limits (500 MB, 300 s).
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            context: native_context(),
            timeout: Duration::from_secs(300),
            limits: ResourceLimits {
                memory_limit_mb: 500,
                cpu_time_limit_secs: 300,
            },
        }
    }

    /// Create a protocol with limits taken from validated configuration.
    pub fn from_config<P: Into<PathBuf>>(program: P, config: &SanitizerConfig) -> Self {
        Self::new(program)
            .with_timeout(Duration::from_secs(config.timeout_seconds))
            .with_memory_limit(config.memory_limit_mb)
    }

    /// Set the wall-clock timeout for a submission.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.limits.cpu_time_limit_secs = timeout.as_secs().max(1);
        self
    }

    /// Set the worker memory ceiling in megabytes.
    pub fn with_memory_limit(mut self, memory_limit_mb: u32) -> Self {
        self.limits.memory_limit_mb = memory_limit_mb;
        self
    }

    /// Replace the execution context backend.
    pub fn with_context(mut self, context: Box<dyn ExecutionContext>) -> Self {
        self.context = context;
        self
    }

    /// Arguments inserted before `--input`/`--output`; used to drive the
    /// protocol through interpreters in tests.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the platform backend cannot enforce resource ceilings.
    pub fn reduced_isolation(&self) -> bool {
        self.context.reduced_isolation()
    }

    /// Run the worker against `input` and collect its report.
    ///
    /// Outcome classification:
    /// - timeout elapsed: the worker is killed, `WorkerTimeout`;
    /// - nonzero exit: `WorkerCrashed` with captured stderr;
    /// - clean exit, no descriptor: `NoResultProduced`.
    pub fn submit(&self, input: &Path) -> Result<WorkerReport> {
        let out_dir = tempfile::Builder::new()
            .prefix("pdf-parse-")
            .tempdir()
            .map_err(Error::Io)?;

        log::info!(
            "submitting {} to isolated worker (output {})",
            input.display(),
            out_dir.path().display()
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(out_dir.path());

        let mut handle = self.context.launch(cmd, &self.limits)?;
        let stdout_drain = drain(handle.take_stdout());
        let stderr_drain = drain(handle.take_stderr());

        let status = match self.wait(&mut handle)? {
            Some(status) => status,
            None => {
                log::error!(
                    "worker pid {} exceeded {:?} timeout, killing",
                    handle.pid(),
                    self.timeout
                );
                handle.kill_all();
                // Drains finish once the pipes close with the child.
                let _ = stdout_drain.join();
                let _ = stderr_drain.join();
                return Err(Error::WorkerTimeout(self.timeout.as_secs()));
            }
        };

        let stdout = stdout_drain.join().unwrap_or_default();
        let stderr = stderr_drain.join().unwrap_or_default();
        if !stdout.trim().is_empty() {
            log::debug!("worker stdout: {}", stdout.trim());
        }

        if !status.success() {
            log::error!("worker exited with {:?}: {}", status.code(), stderr.trim());
            return Err(Error::WorkerCrashed {
                code: status.code(),
                stderr,
            });
        }

        self.read_report(out_dir.path())
        // out_dir dropped here: the ephemeral directory is deleted on
        // every exit path, including the early returns above.
    }

    /// Poll the handle until exit or deadline. `None` means timeout.
    fn wait(&self, handle: &mut WorkerHandle) -> Result<Option<std::process::ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = handle.try_wait().map_err(Error::Io)? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Read the one-shot result descriptor and, on success, the manifest.
    fn read_report(&self, dir: &Path) -> Result<WorkerReport> {
        let result_path = dir.join(RESULT_FILE);
        let raw = match fs::read(&result_path) {
            Ok(raw) => raw,
            Err(_) => {
                log::error!("worker exited cleanly but wrote no {}", RESULT_FILE);
                return Err(Error::NoResultProduced);
            }
        };
        let result: WorkerResult = serde_json::from_slice(&raw).map_err(|e| {
            log::error!("unreadable result descriptor: {}", e);
            Error::NoResultProduced
        })?;

        let manifest = if result.is_success() {
            let manifest_path = dir.join(MANIFEST_FILE);
            let raw = fs::read(&manifest_path).map_err(|_| {
                log::error!("success descriptor without {} manifest", MANIFEST_FILE);
                Error::NoResultProduced
            })?;
            let manifest: WhitelistedDocument =
                serde_json::from_slice(&raw).map_err(|e| {
                    log::error!("unreadable whitelist manifest: {}", e);
                    Error::NoResultProduced
                })?;
            Some(manifest)
        } else {
            None
        };

        Ok(WorkerReport { result, manifest })
    }
}

/// Drain a pipe on a background thread so a chatty worker cannot deadlock
/// against a full pipe buffer.
fn drain<R: Read + Send + 'static>(reader: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
