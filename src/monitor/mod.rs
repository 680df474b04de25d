//! Isolation breach monitor.
//!
//! A background watchdog over the OS-level controls assumed to contain
//! hostile content: write-protection on the input medium, application
//! execution control, kernel code integrity. It consumes change
//! notifications (event-driven, not polling), independently re-verifies
//! every control when one arrives, and on a verified violation terminates
//! the whole application. The threat model assumes the process's own
//! integrity may be compromised, so there is no unwind and no save of
//! in-flight work.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Health of the isolation controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationState {
    /// Every control verified in its expected state so far
    Healthy,
    /// A verified violation was observed; terminal for the process
    Compromised,
    /// No verification has completed yet
    Unknown,
}

/// Independently measured status of a single control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlStatus {
    /// The control is verifiably active
    Enforced,
    /// The control is verifiably off: a breach
    Disabled,
    /// The control could not be measured
    Unknown,
}

/// One OS-level isolation control the monitor watches.
pub trait IsolationControl: Send + Sync {
    /// Stable name used in forensic records.
    fn name(&self) -> &str;

    /// Measure the control right now, independent of any cached state.
    fn verify(&self) -> ControlStatus;
}

/// Change notification from platform glue (service state change, registry
/// write, mount table change). Receipt alone is not a breach; it triggers
/// re-verification of every control.
#[derive(Debug, Clone)]
pub struct ControlEvent {
    /// Name of the control the notification concerns
    pub control: String,
}

/// Seam for process termination so breach handling is testable.
pub trait Terminator: Send + Sync {
    /// Kill the whole process. Must not unwind.
    fn terminate(&self);
}

/// Default terminator: immediate nonzero exit, no unwinding, no cleanup
/// of in-flight work.
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self) {
        std::process::exit(1);
    }
}

/// Forensic record appended on breach, one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForensicRecord {
    /// UTC timestamp of the breach
    pub timestamp: String,
    /// Record discriminator
    pub event_type: String,
    /// Severity label
    pub severity: String,
    /// Control named by the triggering notification
    pub trigger: String,
    /// Independently measured status of every watched control
    pub controls: BTreeMap<String, ControlStatus>,
    /// What the monitor did
    pub action_taken: String,
}

/// Verifies input-medium write-protection with a test write: if creating
/// a file under the watched root succeeds, the medium is not read-only.
pub struct ReadOnlyMediumControl {
    root: PathBuf,
}

impl ReadOnlyMediumControl {
    /// Watch the given mount root.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl IsolationControl for ReadOnlyMediumControl {
    fn name(&self) -> &str {
        "medium_write_protection"
    }

    fn verify(&self) -> ControlStatus {
        let probe = self.root.join(".sanipdf_write_probe");
        match std::fs::write(&probe, b"probe") {
            Ok(()) => {
                // The write went through: the medium is not read-only.
                let _ = std::fs::remove_file(&probe);
                ControlStatus::Disabled
            }
            Err(_) => ControlStatus::Enforced,
        }
    }
}

/// Background watchdog; see module docs.
pub struct IsolationMonitor {
    controls: Vec<Box<dyn IsolationControl>>,
    forensic_log: PathBuf,
    soc_endpoint: Option<String>,
    warning_hook: Option<Box<dyn Fn(&str) + Send>>,
    terminator: Box<dyn Terminator>,
    wait_interval: Duration,
}

impl IsolationMonitor {
    /// Create a monitor with no controls attached yet.
    pub fn new<P: Into<PathBuf>>(forensic_log: P) -> Self {
        Self {
            controls: Vec::new(),
            forensic_log: forensic_log.into(),
            soc_endpoint: None,
            warning_hook: None,
            terminator: Box::new(ProcessTerminator),
            wait_interval: Duration::from_secs(5),
        }
    }

    /// Watch an additional control.
    pub fn with_control(mut self, control: Box<dyn IsolationControl>) -> Self {
        self.controls.push(control);
        self
    }

    /// Set the SOC endpoint for best-effort breach datagrams.
    pub fn with_soc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.soc_endpoint = Some(endpoint.into());
        self
    }

    /// Attach a blocking operator warning, shown before termination when a
    /// UI is present.
    pub fn with_warning_hook(mut self, hook: Box<dyn Fn(&str) + Send>) -> Self {
        self.warning_hook = Some(hook);
        self
    }

    /// Replace the termination seam.
    pub fn with_terminator(mut self, terminator: Box<dyn Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Bound on how long the loop waits before rechecking for a stop
    /// request.
    pub fn with_wait_interval(mut self, interval: Duration) -> Self {
        self.wait_interval = interval;
        self
    }

    /// Start the monitor on its dedicated background thread.
    ///
    /// The monitor is started once at application startup and runs for the
    /// process lifetime; it is the only component permitted to terminate
    /// the whole application unilaterally.
    pub fn start(self) -> MonitorHandle {
        let (event_tx, event_rx) = unbounded::<ControlEvent>();
        let (stop_tx, stop_rx) = unbounded::<()>();
        let state = Arc::new(AtomicU8::new(state_code(IsolationState::Healthy)));

        let thread_state = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name("isolation-monitor".to_string())
            .spawn(move || self.run(event_rx, stop_rx, thread_state))
            .expect("failed to spawn isolation monitor thread");

        MonitorHandle {
            state,
            notifier: event_tx,
            stop: stop_tx,
            thread: Some(thread),
        }
    }

    fn run(self, events: Receiver<ControlEvent>, stop: Receiver<()>, state: Arc<AtomicU8>) {
        log::info!(
            "isolation monitor started, watching {} controls",
            self.controls.len()
        );
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => {
                    log::info!("isolation monitor stopping on request");
                    break;
                }
                recv(events) -> msg => {
                    let Ok(event) = msg else { break };
                    log::warn!("change notification for control '{}'", event.control);
                    let statuses = self.measure_all();
                    if statuses.values().any(|s| *s == ControlStatus::Disabled) {
                        state.store(state_code(IsolationState::Compromised), Ordering::SeqCst);
                        self.handle_breach(&event, statuses);
                        break;
                    }
                    log::info!("re-verification clean, isolation still healthy");
                }
                default(self.wait_interval) => {
                    // Bounded wait so a stop request is observed even when
                    // no notifications arrive.
                }
            }
        }
    }

    /// Measure every watched control independently.
    fn measure_all(&self) -> BTreeMap<String, ControlStatus> {
        self.controls
            .iter()
            .map(|c| {
                let status = c.verify();
                log::info!("control '{}' measured {:?}", c.name(), status);
                (c.name().to_string(), status)
            })
            .collect()
    }

    fn handle_breach(&self, event: &ControlEvent, controls: BTreeMap<String, ControlStatus>) {
        log::error!(
            "ISOLATION BREACH: control '{}' left its expected state, terminating",
            event.control
        );

        self.write_forensic_record(event, controls);
        self.alert_soc(&event.control);

        let warning = format!(
            "ISOLATION CONTROLS COMPROMISED\n\n\
             The control '{}' is no longer verifiably active.\n\
             This application is terminating immediately for security.\n\n\
             Contact the SOC, preserve the workstation for forensics,\n\
             and do not process further documents.",
            event.control
        );
        log::error!("{}", warning);
        if let Some(hook) = &self.warning_hook {
            hook(&warning);
        }

        self.terminator.terminate();
    }

    /// Append the forensic record; failure to write must not stop the
    /// termination path.
    fn write_forensic_record(&self, event: &ControlEvent, controls: BTreeMap<String, ControlStatus>) {
        let record = ForensicRecord {
            timestamp: Utc::now().to_rfc3339(),
            event_type: "ISOLATION_BREACH_DETECTED".to_string(),
            severity: "CRITICAL".to_string(),
            trigger: event.control.clone(),
            controls,
            action_taken: "APPLICATION_TERMINATED".to_string(),
        };

        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.forensic_log.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.forensic_log)?;
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            file.write_all(&line)
        };
        match write() {
            Ok(()) => log::info!("forensic record appended to {}", self.forensic_log.display()),
            Err(e) => log::error!("could not write forensic record: {}", e),
        }
    }

    /// Best-effort, fire-and-forget datagram to the security endpoint.
    /// No delivery guarantee and no retry.
    fn alert_soc(&self, control: &str) {
        let Some(endpoint) = &self.soc_endpoint else {
            return;
        };
        let message = format!(
            "[CRITICAL] PDF sanitizer isolation breach: control '{}' compromised, application terminated",
            control
        );
        let send = || -> std::io::Result<()> {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            socket.send_to(message.as_bytes(), endpoint.as_str())?;
            Ok(())
        };
        if let Err(e) = send() {
            log::warn!("could not notify SOC at {}: {}", endpoint, e);
        }
    }
}

/// Handle to a running monitor thread.
pub struct MonitorHandle {
    state: Arc<AtomicU8>,
    notifier: Sender<ControlEvent>,
    stop: Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MonitorHandle {
    /// Current isolation state. Healthy → Compromised is irreversible.
    pub fn state(&self) -> IsolationState {
        match self.state.load(Ordering::SeqCst) {
            0 => IsolationState::Healthy,
            1 => IsolationState::Compromised,
            _ => IsolationState::Unknown,
        }
    }

    /// Sender for platform glue to push change notifications into.
    pub fn notifier(&self) -> Sender<ControlEvent> {
        self.notifier.clone()
    }

    /// Cooperatively stop the monitor and join its thread.
    pub fn stop(mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("isolation monitor thread panicked");
            }
        }
    }
}

fn state_code(state: IsolationState) -> u8 {
    match state {
        IsolationState::Healthy => 0,
        IsolationState::Compromised => 1,
        IsolationState::Unknown => 2,
    }
}
