//! Single-flight sanitization queue.
//!
//! Sequences jobs through the isolated worker one at a time, classifies
//! outcomes and forwards a structured record per terminal job to the audit
//! collaborator. The queue holds no internal locking and assumes a single
//! draining thread by convention; `process_next` runs synchronously on the
//! calling thread and never auto-advances.

mod job;

pub use job::{JobState, SanitizationJob};

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::audit::{AuditRecord, AuditSink, AuditStatus, DocumentRecord};
use crate::error::{Error, Result};
use crate::whitelist::{sanitized_path, Reconstructor};
use crate::worker::{WorkerProtocol, WorkerReport, WorkerResult};

/// Seam between the queue and the isolation layer, so queue behavior is
/// testable without spawning real processes.
pub trait IsolatedParser: Send {
    /// Run the whitelist transform against `input` in isolation.
    fn submit(&self, input: &Path) -> Result<WorkerReport>;
}

impl IsolatedParser for WorkerProtocol {
    fn submit(&self, input: &Path) -> Result<WorkerReport> {
        WorkerProtocol::submit(self, input)
    }
}

/// Event emitted to queue observers.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A job entered the queue
    Added(PathBuf),
    /// The head job started processing
    Started(PathBuf),
    /// A job reached a terminal state
    Finished {
        /// Input path of the job
        path: PathBuf,
        /// Whether a verifiable output artifact exists
        success: bool,
        /// Terminal result message
        message: String,
    },
}

/// FIFO queue orchestrating sanitization jobs.
pub struct SanitizationQueue {
    jobs: VecDeque<SanitizationJob>,
    parser: Box<dyn IsolatedParser>,
    audit: Option<Box<dyn AuditSink>>,
    subscribers: Vec<Sender<QueueEvent>>,
    policy: String,
    operator: String,
    processed: u64,
}

impl SanitizationQueue {
    /// Create a queue draining into the given isolation layer.
    pub fn new(parser: Box<dyn IsolatedParser>) -> Self {
        Self {
            jobs: VecDeque::new(),
            parser,
            audit: None,
            subscribers: Vec::new(),
            policy: "AGGRESSIVE".to_string(),
            operator: "pdf_sanitizer_system".to_string(),
            processed: 0,
        }
    }

    /// Attach the audit collaborator.
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the policy label recorded in audit events.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Subscribe to queue events. Disconnected receivers are dropped on
    /// the next emit.
    pub fn subscribe(&mut self) -> Receiver<QueueEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Append a job in strict FIFO order.
    pub fn enqueue<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        log::info!("adding file to queue: {}", path.display());
        self.jobs.push_back(SanitizationJob::new(path.clone()));
        self.emit(QueueEvent::Added(path));
    }

    /// Process the head job to a terminal outcome.
    ///
    /// Returns `None` when the queue is empty, otherwise whether the job
    /// succeeded. The job is peeked, not popped: it leaves the queue only
    /// after reaching a terminal state, so a crash mid-processing leaves
    /// it at the head rather than silently dropping it.
    pub fn process_next(&mut self) -> Option<bool> {
        let path = match self.jobs.front_mut() {
            None => {
                log::warn!("queue is empty, nothing to process");
                return None;
            }
            Some(job) => {
                job.advance(JobState::Processing);
                job.path.clone()
            }
        };

        log::info!("processing file: {}", path.display());
        self.emit(QueueEvent::Started(path.clone()));
        let started = Instant::now();

        let outcome = self.run_job(&path);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (success, message) = match outcome {
            Ok(output) => {
                let message = format!("Sanitization successful: {}", output.display());
                log::info!("{}", message);
                self.record_audit(&path, Some(&output), elapsed_ms, None);
                self.finish_head(JobState::Succeeded, &message);
                self.processed += 1;
                (true, message)
            }
            Err(e) => {
                let message = format!("Error: {e}");
                log::error!("sanitization failed for {}: {}", path.display(), e);
                self.record_audit(&path, None, elapsed_ms, Some(e.to_string()));
                self.finish_head(JobState::Failed, &message);
                (false, message)
            }
        };

        self.emit(QueueEvent::Finished {
            path,
            success,
            message,
        });
        Some(success)
    }

    /// Remove jobs that have not started. The in-flight head, if any,
    /// stays: an individual Processing job cannot be cancelled.
    pub fn clear(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.state != JobState::Queued);
        let removed = before - self.jobs.len();
        if removed > 0 {
            log::info!("cleared {} pending jobs from queue", removed);
        }
        removed
    }

    /// Number of jobs currently in the queue.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs currently in the queue, head first.
    pub fn jobs(&self) -> impl Iterator<Item = &SanitizationJob> {
        self.jobs.iter()
    }

    /// Number of jobs processed to success since creation.
    pub fn processed_count(&self) -> u64 {
        self.processed
    }

    /// Run one job through isolation and reconstruction.
    ///
    /// Success is gated on the existence of the output artifact, not on
    /// the absence of errors.
    fn run_job(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }

        let report = self.parser.submit(path)?;
        let manifest = match report.result {
            WorkerResult::Error { message, traceback } => {
                if !traceback.is_empty() {
                    log::debug!("worker traceback: {}", traceback);
                }
                return Err(Error::PdfParse(message));
            }
            WorkerResult::Success { pages, .. } => {
                log::info!("worker whitelisted {} pages", pages);
                report.manifest.ok_or(Error::NoResultProduced)?
            }
        };

        let output = sanitized_path(path);
        Reconstructor::new(manifest)
            .with_source_path(path)?
            .build_to_file(&output)?;

        if !output.exists() {
            return Err(Error::OutputNotCreated(output));
        }
        Ok(output)
    }

    fn finish_head(&mut self, state: JobState, message: &str) {
        if let Some(job) = self.jobs.front_mut() {
            job.finish(state, message);
        }
        // Terminal outcome reached; only now does the job leave the queue.
        self.jobs.pop_front();
    }

    fn record_audit(
        &self,
        input: &Path,
        output: Option<&Path>,
        elapsed_ms: u64,
        error: Option<String>,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        let record = AuditRecord {
            operator: self.operator.clone(),
            classification: "UNCLASSIFIED".to_string(),
            document: DocumentRecord {
                original_name: input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                original_path: input.to_path_buf(),
                sanitized_path: output.map(Path::to_path_buf),
                processing_time_ms: elapsed_ms,
            },
            threats_detected: Vec::new(),
            sanitization_policy: self.policy.clone(),
            status: if error.is_none() {
                AuditStatus::Success
            } else {
                AuditStatus::Failed
            },
            error_message: error,
        };
        audit.log_event(record);
    }

    fn emit(&mut self, event: QueueEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverCalledParser;

    impl IsolatedParser for NeverCalledParser {
        fn submit(&self, _input: &Path) -> Result<WorkerReport> {
            panic!("submit must not be called");
        }
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let mut queue = SanitizationQueue::new(Box::new(NeverCalledParser));
        assert!(queue.process_next().is_none());
    }

    #[test]
    fn test_enqueue_emits_added_in_fifo_order() {
        let mut queue = SanitizationQueue::new(Box::new(NeverCalledParser));
        let events = queue.subscribe();
        queue.enqueue("/drop/a.pdf");
        queue.enqueue("/drop/b.pdf");

        assert_eq!(queue.len(), 2);
        assert!(matches!(events.try_recv().unwrap(), QueueEvent::Added(p) if p == Path::new("/drop/a.pdf")));
        assert!(matches!(events.try_recv().unwrap(), QueueEvent::Added(p) if p == Path::new("/drop/b.pdf")));
    }

    #[test]
    fn test_missing_input_fails_without_submit() {
        let mut queue = SanitizationQueue::new(Box::new(NeverCalledParser));
        let events = queue.subscribe();
        queue.enqueue("/nonexistent/input.pdf");

        assert_eq!(queue.process_next(), Some(false));
        assert!(queue.is_empty());

        let _added = events.try_recv().unwrap();
        let _started = events.try_recv().unwrap();
        match events.try_recv().unwrap() {
            QueueEvent::Finished { success, message, .. } => {
                assert!(!success);
                assert!(message.contains("not found"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_clear_removes_only_queued_jobs() {
        let mut queue = SanitizationQueue::new(Box::new(NeverCalledParser));
        queue.enqueue("/drop/a.pdf");
        queue.enqueue("/drop/b.pdf");
        queue.enqueue("/drop/c.pdf");

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
    }
}
