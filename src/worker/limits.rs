//! Resource-bounded execution context.
//!
//! The OS-specific limiting primitive is an abstraction point: `launch`
//! starts a command under the platform's resource ceilings and returns a
//! handle whose closure kills everything it owns. Platforms without an
//! enforcement backend degrade explicitly to timeout-only isolation and
//! say so through [`ExecutionContext::reduced_isolation`], rather than
//! weakening the guarantee silently.

use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::{Error, Result};

/// Resource ceilings applied to a worker process.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    /// Hard ceiling on committed memory, in megabytes
    pub memory_limit_mb: u32,
    /// Hard ceiling on CPU time, in seconds
    pub cpu_time_limit_secs: u64,
}

/// Launches commands under resource ceilings with kill-on-close semantics.
pub trait ExecutionContext: Send + Sync {
    /// Start `cmd` with `limits` applied. Stdin is closed, stdout and
    /// stderr are piped back to the caller.
    fn launch(&self, cmd: Command, limits: &ResourceLimits) -> Result<WorkerHandle>;

    /// Whether this backend cannot enforce memory/CPU ceilings and relies
    /// on the caller's timeout alone.
    fn reduced_isolation(&self) -> bool;
}

/// A running worker owned by an execution context.
///
/// Dropping the handle kills the process if it is still running, so no
/// exit path can leak an orphaned worker.
pub struct WorkerHandle {
    child: Child,
    finished: bool,
}

impl WorkerHandle {
    fn new(child: Child) -> Self {
        Self {
            child,
            finished: false,
        }
    }

    /// The child's OS process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking exit check.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.finished = true;
        }
        Ok(status)
    }

    /// Force-kill the process and reap it.
    pub fn kill_all(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.child.kill() {
            log::warn!("failed to kill worker {}: {}", self.child.id(), e);
        }
        let _ = self.child.wait();
        self.finished = true;
    }

    /// Take the piped stdout, if not already taken.
    pub fn take_stdout(&mut self) -> Option<std::process::ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the piped stderr, if not already taken.
    pub fn take_stderr(&mut self) -> Option<std::process::ChildStderr> {
        self.child.stderr.take()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.kill_all();
    }
}

/// Select the best execution context available on this platform.
pub fn native_context() -> Box<dyn ExecutionContext> {
    #[cfg(unix)]
    {
        Box::new(RlimitContext)
    }
    #[cfg(not(unix))]
    {
        Box::new(UnboundedContext)
    }
}

fn configure_stdio(cmd: &mut Command) {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
}

/// Unix backend: applies `RLIMIT_AS` and `RLIMIT_CPU` in the child before
/// exec. The address-space ceiling bounds committed memory per process;
/// exceeding it turns allocation failures into a worker crash instead of
/// orchestrator memory pressure.
#[cfg(unix)]
pub struct RlimitContext;

#[cfg(unix)]
impl ExecutionContext for RlimitContext {
    fn launch(&self, mut cmd: Command, limits: &ResourceLimits) -> Result<WorkerHandle> {
        use std::os::unix::process::CommandExt;

        configure_stdio(&mut cmd);

        let mem_bytes = u64::from(limits.memory_limit_mb) * 1024 * 1024;
        let cpu_secs = limits.cpu_time_limit_secs;
        unsafe {
            cmd.pre_exec(move || {
                let mem = libc::rlimit {
                    rlim_cur: mem_bytes as libc::rlim_t,
                    rlim_max: mem_bytes as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &mem) != 0 {
                    return Err(io::Error::last_os_error());
                }
                let cpu = libc::rlimit {
                    rlim_cur: cpu_secs as libc::rlim_t,
                    rlim_max: cpu_secs as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_CPU, &cpu) != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(Error::Io)?;
        log::info!(
            "launched worker pid {} ({} MB memory, {} s CPU)",
            child.id(),
            limits.memory_limit_mb,
            limits.cpu_time_limit_secs
        );
        Ok(WorkerHandle::new(child))
    }

    fn reduced_isolation(&self) -> bool {
        false
    }
}

/// Fallback backend: no resource ceilings, timeout-only isolation.
pub struct UnboundedContext;

impl ExecutionContext for UnboundedContext {
    fn launch(&self, mut cmd: Command, _limits: &ResourceLimits) -> Result<WorkerHandle> {
        configure_stdio(&mut cmd);
        let child = cmd.spawn().map_err(Error::Io)?;
        log::warn!(
            "launched worker pid {} without resource ceilings (reduced isolation)",
            child.id()
        );
        Ok(WorkerHandle::new(child))
    }

    fn reduced_isolation(&self) -> bool {
        true
    }
}
