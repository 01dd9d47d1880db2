//! Lifecycle of UDLF child processes
//!
//! A UDLF run can take minutes on large datasets. If this process is
//! interrupted, the binary must not keep running and writing output files
//! behind our back.
//!
//! # Mechanism
//! - Every child is spawned as the leader of its own process group, with a
//!   parent-death signal so the kernel terminates it if we die abruptly.
//! - Live children are tracked in a global [`RunRegistry`].
//! - On SIGINT, SIGTERM or SIGHUP every tracked group gets SIGTERM, then
//!   SIGKILL once the grace period is over.

#[cfg(target_os = "linux")]
use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Grace period between SIGTERM and SIGKILL on shutdown
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

static RUN_REGISTRY: OnceLock<Arc<Mutex<RunRegistry>>> = OnceLock::new();

/// PIDs of the UDLF processes currently running
#[derive(Debug, Default)]
pub struct RunRegistry {
    pids: HashSet<u32>,
    cleanup_initiated: bool,
}

impl RunRegistry {
    /// The process-wide registry
    pub fn global() -> Arc<Mutex<RunRegistry>> {
        RUN_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(RunRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Tracking UDLF process {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("UDLF process {} finished", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// SIGTERM every tracked process group, wait up to `grace_period`, then
    /// SIGKILL the survivors. Only the first call does anything.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            return;
        }
        info!("Stopping {} UDLF process(es)", self.pids.len());

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            if let Err(e) = signal_group(pid, Signal::SIGTERM) {
                warn!("SIGTERM to process group {} failed: {}", pid, e);
                if let Err(e) = signal_process(pid, Signal::SIGTERM) {
                    warn!("SIGTERM to PID {} failed: {}", pid, e);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                info!("All UDLF processes stopped");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids.iter().filter(|&&pid| is_process_alive(pid)) {
            warn!("Process group {} ignored SIGTERM, sending SIGKILL", pid);
            if let Err(e) = signal_group(pid, Signal::SIGKILL) {
                error!("SIGKILL to process group {} failed: {}", pid, e);
                let _ = signal_process(pid, Signal::SIGKILL);
            }
        }
        self.pids.clear();
    }
}

fn signal_process(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID addresses the whole group
fn signal_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Alive means it exists and is neither a zombie nor dead
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        if let Some(state) = stat.split_whitespace().nth(2) {
            return !matches!(state, "Z" | "X");
        }
    }
    true
}

/// Keeps a child registered for as long as it is alive
pub struct TrackedChild {
    pid: u32,
    registry: Arc<Mutex<RunRegistry>>,
}

impl TrackedChild {
    /// Register `pid` in the global registry
    pub fn register(pid: u32) -> Self {
        let registry = RunRegistry::global();
        if let Ok(mut r) = registry.lock() {
            r.register(pid);
        }
        Self { pid, registry }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for TrackedChild {
    fn drop(&mut self) {
        if let Ok(mut r) = self.registry.lock() {
            r.unregister(self.pid);
        }
    }
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP that stop every tracked
/// child and exit with `128 + signal`. Call once at startup.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            info!("Received {}, stopping UDLF", name);
            if let Ok(mut registry) = RunRegistry::global().lock() {
                registry.terminate_all(SHUTDOWN_GRACE);
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Spawn a [`std::process::Command`] as a process group leader
pub trait CommandProcessGroup {
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe syscalls.
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                #[cfg(target_os = "linux")]
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}
