mod output;
mod process;

pub use output::{classify, OutputClass};
pub use process::{ManagedProcess, ProcessHealth, ProcessRole, ProcessStatus, WorkerSpec};

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_secs(2);
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the lifecycle of the workers registered with it: spawn with an
/// explicit environment, settle-check, graceful-then-forced stop, and
/// bounded-delay restart. Retry ceilings are the caller's responsibility.
pub struct ProcessSupervisor {
    specs: Arc<RwLock<HashMap<ProcessRole, WorkerSpec>>>,
    processes: Arc<RwLock<HashMap<ProcessRole, ManagedProcess>>>,
    restart_counts: Arc<RwLock<HashMap<ProcessRole, u32>>>,
    settle_window: Duration,
    grace_window: Duration,
    restart_delay: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            specs: Arc::new(RwLock::new(HashMap::new())),
            processes: Arc::new(RwLock::new(HashMap::new())),
            restart_counts: Arc::new(RwLock::new(HashMap::new())),
            settle_window: DEFAULT_SETTLE_WINDOW,
            grace_window: DEFAULT_GRACE_WINDOW,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    pub fn with_settle_window(mut self, settle_window: Duration) -> Self {
        self.settle_window = settle_window;

        self
    }

    pub fn with_grace_window(mut self, grace_window: Duration) -> Self {
        self.grace_window = grace_window;

        self
    }

    pub fn with_restart_delay(mut self, restart_delay: Duration) -> Self {
        self.restart_delay = restart_delay;

        self
    }

    /// Registers a worker under a role. Start/stop/restart/health all key
    /// off the roles registered here.
    pub async fn manage(&self, role: ProcessRole, spec: WorkerSpec) {
        self.specs.write().await.insert(role, spec);
    }

    /// Points a role's next start at a freshly activated storage schema.
    pub async fn update_schema(&self, role: ProcessRole, schema: &str) {
        if let Some(spec) = self.specs.write().await.get_mut(&role) {
            spec.schema = schema.to_string();
        }
    }

    pub async fn start(&self, role: ProcessRole) -> bool {
        if self.processes.read().await.contains_key(&role) {
            warn!(worker = %role, "worker already running");
            return true;
        }

        let spec = self.specs.read().await.get(&role).cloned();
        let Some(spec) = spec else {
            error!(worker = %role, "no worker spec registered for role");
            return false;
        };

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env("DATABASE_URL", &spec.database_url)
            .env("RPC_API_KEY", &spec.rpc_api_key)
            .env("PORT", spec.port.to_string())
            .env("STORAGE_SCHEMA", &spec.schema)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Own process group so stop() can signal the worker and any
            // children it forks in one go
            .process_group(0)
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                error!(worker = %role, %error, "failed to spawn worker");
                return false;
            }
        };

        let Some(pid) = child.id() else {
            error!(worker = %role, "worker exited before its pid could be read");
            return false;
        };

        output::stream_output(role, child.stdout.take(), child.stderr.take());

        // Settle check: a worker that dies right after spawn fails the
        // start instead of surfacing later as an unhealthy process.
        sleep(self.settle_window).await;
        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                error!(worker = %role, ?status, "worker exited during settle window");
                return false;
            }
            Err(error) => {
                error!(worker = %role, %error, "failed to check worker during settle window");
                return false;
            }
        }

        let restart_count = self.restart_count(role).await;
        self.processes.write().await.insert(
            role,
            ManagedProcess {
                role,
                pid,
                status: ProcessStatus::Running,
                started_at: Utc::now(),
                restart_count,
            },
        );

        info!(worker = %role, pid, "worker started");

        self.watch_exit(role, child);

        true
    }

    /// Graceful-then-forced stop: SIGTERM, a bounded grace wait, then
    /// SIGKILL. Mandatory for every stop path, including restarts.
    pub async fn stop(&self, role: ProcessRole) -> bool {
        let pid = self.processes.read().await.get(&role).map(|process| process.pid);
        let Some(pid) = pid else {
            return true;
        };

        info!(worker = %role, pid, "stopping worker");
        signal_worker(pid, Signal::SIGTERM);

        if self.wait_for_exit(role, self.grace_window).await {
            return true;
        }

        warn!(
            worker = %role,
            pid,
            grace = ?self.grace_window,
            "worker ignored graceful stop, escalating to forced kill"
        );
        signal_worker(pid, Signal::SIGKILL);

        self.wait_for_exit(role, self.grace_window).await
    }

    /// Increments the role's restart count up front, then runs the full
    /// stop/start cycle with the configured inter-attempt delay. Does not
    /// enforce a retry ceiling; the caller compares the count against its
    /// configured maximum before invoking this again.
    pub async fn restart(&self, role: ProcessRole) -> bool {
        {
            let mut restart_counts = self.restart_counts.write().await;
            *restart_counts.entry(role).or_insert(0) += 1;
        }
        if let Some(process) = self.processes.write().await.get_mut(&role) {
            process.status = ProcessStatus::Restarting;
        }

        info!(worker = %role, "restarting worker");

        self.stop(role).await;
        sleep(self.restart_delay).await;

        self.start(role).await
    }

    pub async fn stop_all(&self) {
        let roles: Vec<_> = self.specs.read().await.keys().copied().collect();

        join_all(roles.into_iter().map(|role| self.stop(role))).await;
    }

    /// Health of every registered role. Roles without a live process entry
    /// report `running: false, uptime_secs: 0`.
    pub async fn health_status(&self) -> HashMap<ProcessRole, ProcessHealth> {
        let specs = self.specs.read().await;
        let processes = self.processes.read().await;
        let restart_counts = self.restart_counts.read().await;

        specs
            .keys()
            .map(|role| {
                let restarts = restart_counts.get(role).copied().unwrap_or(0);
                let health = match processes.get(role) {
                    Some(process) if process.status == ProcessStatus::Running => ProcessHealth {
                        running: true,
                        uptime_secs: (Utc::now() - process.started_at).num_seconds().max(0) as u64,
                        restarts,
                    },
                    _ => ProcessHealth {
                        running: false,
                        uptime_secs: 0,
                        restarts,
                    },
                };

                (*role, health)
            })
            .collect()
    }

    pub async fn process(&self, role: ProcessRole) -> Option<ManagedProcess> {
        self.processes.read().await.get(&role).cloned()
    }

    pub async fn restart_count(&self, role: ProcessRole) -> u32 {
        self.restart_counts.read().await.get(&role).copied().unwrap_or(0)
    }

    /// Worker exit of either kind clears the bookkeeping entry immediately.
    fn watch_exit(&self, role: ProcessRole, mut child: Child) {
        let processes = self.processes.clone();

        tokio::spawn(async move {
            let exit = child.wait().await;
            processes.write().await.remove(&role);

            match exit {
                Ok(status) if status.success() => info!(worker = %role, "worker exited"),
                Ok(status) => warn!(worker = %role, ?status, "worker exited unexpectedly"),
                Err(error) => error!(worker = %role, %error, "failed waiting on worker exit"),
            }
        });
    }

    async fn wait_for_exit(&self, role: ProcessRole, window: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + window;

        loop {
            if !self.processes.read().await.contains_key(&role) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            sleep(EXIT_POLL_INTERVAL).await;
        }
    }
}

fn signal_worker(pid: u32, signal: Signal) {
    // Negative pid targets the worker's process group
    let group = Pid::from_raw(-(pid as i32));

    match kill(group, signal) {
        Ok(()) => {}
        // Exited between our check and the signal
        Err(nix::errno::Errno::ESRCH) => {}
        Err(error) => warn!(pid, %signal, %error, "failed to signal worker"),
    }
}
