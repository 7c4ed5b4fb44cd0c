mod readiness;

pub use readiness::{probe_ready, wait_until_ready};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_more::Display;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::discovery::{self, AggregatorRegistry, DiscoveryError};
use crate::manifest::{ConfigMutator, ManifestError};
use crate::repos::Repo;
use crate::supervisor::{ProcessHealth, ProcessRole, ProcessSupervisor};
use crate::{FeedwardenRepo, FeedwardenRepoPool};

/// How long the dependent worker's API gets to come up after a start
/// before we stop waiting on it. Informational only, never fatal.
const SERVER_API_GRACE: Duration = Duration::from_secs(30);

/// Absolute bound on the bootstrap discovery pass.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    Bootstrapping,
    AwaitingReadiness,
    Discovering,
    ConfiguringDependent,
    StartingDependent,
    Steady,
    Aborted,
}

#[derive(Debug, Display)]
pub enum OrchestratorError {
    #[display("discovery worker failed to start")]
    IndexerStartFailed,
    #[display("dependent worker failed to start")]
    ServerStartFailed,
    #[display("discovery worker did not reach readiness within the configured timeout")]
    ReadinessTimedOut,
    #[display("initial discovery did not complete within its absolute timeout")]
    DiscoveryTimedOut,
    Discovery(DiscoveryError),
    Manifest(ManifestError),
}

impl From<DiscoveryError> for OrchestratorError {
    fn from(value: DiscoveryError) -> Self {
        OrchestratorError::Discovery(value)
    }
}

impl From<ManifestError> for OrchestratorError {
    fn from(value: ManifestError) -> Self {
        OrchestratorError::Manifest(value)
    }
}

/// What the health timer should do about one worker's reported health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthAction {
    /// Not running and under the ceiling: attempt automatic recovery.
    Restart,
    /// Not running with the ceiling reached: leave stopped, flag it.
    Flag,
    /// Running; nothing to do.
    Wait,
}

pub fn health_action(health: &ProcessHealth, max_restarts: u32) -> HealthAction {
    if health.running {
        HealthAction::Wait
    } else if health.restarts < max_restarts {
        HealthAction::Restart
    } else {
        HealthAction::Flag
    }
}

/// Threshold gating: only a delta of at least `threshold` newly discovered
/// aggregators justifies a dependent-worker restart.
pub fn reconfigure_due(configured: usize, discovered: usize, threshold: usize) -> bool {
    discovered.saturating_sub(configured) >= threshold
}

struct SteadyState {
    configured_total: usize,
    last_generated_at: Option<DateTime<Utc>>,
}

/// Phased control loop bridging the discovery worker and the dependent
/// worker: bootstrap, readiness wait, discovery, configuration activation,
/// dependent start, then concurrent health and discovery timers.
pub struct Orchestrator {
    config: Config,
    pool: FeedwardenRepoPool,
    registry: Arc<Mutex<AggregatorRegistry>>,
    indexer: Arc<ProcessSupervisor>,
    server: Arc<ProcessSupervisor>,
    mutator: Arc<ConfigMutator>,
    /// Serializes reconfigure-and-restart against health-timer restarts of
    /// the same worker.
    reconfigure_guard: Arc<Mutex<()>>,
    steady_state: Arc<Mutex<SteadyState>>,
    phase: Phase,
    steady_tasks: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub async fn new(config: Config) -> Self {
        let repo = FeedwardenRepo::new(&config.database_url).await;
        let pool = repo.get_pool(2).await;

        let restart_delay = Duration::from_millis(config.restart_delay_ms);

        let indexer = Arc::new(ProcessSupervisor::new().with_restart_delay(restart_delay));
        indexer.manage(ProcessRole::Indexer, config.indexer_worker.clone()).await;

        let server = Arc::new(ProcessSupervisor::new().with_restart_delay(restart_delay));
        server.manage(ProcessRole::Server, config.server_worker.clone()).await;

        let mutator = Arc::new(
            ConfigMutator::new(config.manifest_path.clone(), config.backup_dir.clone())
                .with_default_start_block(config.default_start_block),
        );

        Self {
            config,
            pool,
            registry: Arc::new(Mutex::new(AggregatorRegistry::new())),
            indexer,
            server,
            mutator,
            reconfigure_guard: Arc::new(Mutex::new(())),
            steady_state: Arc::new(Mutex::new(SteadyState {
                configured_total: 0,
                last_generated_at: None,
            })),
            phase: Phase::Bootstrapping,
            steady_tasks: vec![],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub async fn stats(&self) -> crate::discovery::DiscoveryStats {
        self.registry.lock().await.stats()
    }

    /// Runs the bootstrap phase sequence. On success the steady-state
    /// timers are live; on failure every started worker is torn down.
    pub async fn start(&mut self) -> Result<(), OrchestratorError> {
        match self.bootstrap().await {
            Ok(()) => {
                self.phase = Phase::Steady;
                self.spawn_steady_tasks();
                info!("orchestrator entered steady state");

                Ok(())
            }
            Err(bootstrap_error) => {
                self.phase = Phase::Aborted;
                error!(error = %bootstrap_error, phase = %self.phase, "bootstrap failed, tearing down workers");
                self.teardown().await;

                Err(bootstrap_error)
            }
        }
    }

    async fn bootstrap(&mut self) -> Result<(), OrchestratorError> {
        self.phase = Phase::Bootstrapping;
        info!(phase = %self.phase, "starting discovery worker");
        if !self.indexer.start(ProcessRole::Indexer).await {
            return Err(OrchestratorError::IndexerStartFailed);
        }

        self.phase = Phase::AwaitingReadiness;
        info!(phase = %self.phase, url = %self.config.indexer_api_url, "awaiting historical sync");
        let ready = wait_until_ready(
            &self.config.indexer_api_url,
            Duration::from_millis(self.config.readiness_poll_interval_ms),
            Duration::from_millis(self.config.readiness_timeout_ms),
        )
        .await;
        if !ready {
            return Err(OrchestratorError::ReadinessTimedOut);
        }

        self.phase = Phase::Discovering;
        let discovered = tokio::time::timeout(DISCOVERY_TIMEOUT, async {
            let mut conn =
                FeedwardenRepo::get_conn(&self.pool).await.map_err(DiscoveryError::Repo)?;
            let mut registry = self.registry.lock().await;

            discovery::discover::<FeedwardenRepo>(&mut conn, &mut registry, None).await
        })
        .await
        .map_err(|_| OrchestratorError::DiscoveryTimedOut)??;
        info!(phase = %self.phase, discovered = discovered.len(), "initial discovery complete");

        self.phase = Phase::ConfiguringDependent;
        let aggregators = self.registry.lock().await.all();
        let (snapshot, manifest_text) = self.mutator.generate(&aggregators).await?;
        let schema = self.mutator.activate(&snapshot, &manifest_text).await?;
        self.server.update_schema(ProcessRole::Server, &schema).await;
        {
            let mut steady_state = self.steady_state.lock().await;
            steady_state.configured_total = snapshot.total_aggregators();
            steady_state.last_generated_at = Some(snapshot.generated_at);
        }

        self.phase = Phase::StartingDependent;
        info!(phase = %self.phase, schema = %schema, "starting dependent worker");
        if !self.server.start(ProcessRole::Server).await {
            return Err(OrchestratorError::ServerStartFailed);
        }

        let api_up = wait_until_ready(
            &self.config.server_api_url,
            Duration::from_millis(self.config.readiness_poll_interval_ms),
            SERVER_API_GRACE,
        )
        .await;
        if !api_up {
            warn!(url = %self.config.server_api_url, "dependent worker api not serving yet");
        }

        Ok(())
    }

    /// Cancels the steady timers and stops every managed worker.
    pub async fn shutdown(&mut self) {
        info!("shutting down orchestrator");

        for task in self.steady_tasks.drain(..) {
            task.abort();
        }

        self.teardown().await;
    }

    async fn teardown(&self) {
        // Dependent worker first; the discovery worker is its upstream
        self.server.stop_all().await;
        self.indexer.stop_all().await;
    }

    fn spawn_steady_tasks(&mut self) {
        let health_timer = self.spawn_health_timer();
        let discovery_timer = self.spawn_discovery_timer();

        self.steady_tasks.push(health_timer);
        self.steady_tasks.push(discovery_timer);
    }

    fn spawn_health_timer(&self) -> JoinHandle<()> {
        let supervisors = vec![self.indexer.clone(), self.server.clone()];
        let reconfigure_guard = self.reconfigure_guard.clone();
        let max_restarts = self.config.max_restarts;
        let period = Duration::from_millis(self.config.health_interval_ms);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                for supervisor in &supervisors {
                    for (role, health) in supervisor.health_status().await {
                        match health_action(&health, max_restarts) {
                            HealthAction::Restart => {
                                warn!(worker = %role, restarts = health.restarts, "worker down, attempting recovery");
                                let _guard = reconfigure_guard.lock().await;
                                supervisor.restart(role).await;
                            }
                            HealthAction::Flag => {
                                warn!(
                                    worker = %role,
                                    restarts = health.restarts,
                                    max_restarts,
                                    "worker exhausted its restart budget, operator attention required"
                                );
                            }
                            HealthAction::Wait => {}
                        }
                    }
                }
            }
        })
    }

    fn spawn_discovery_timer(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let registry = self.registry.clone();
        let mutator = self.mutator.clone();
        let server = self.server.clone();
        let reconfigure_guard = self.reconfigure_guard.clone();
        let steady_state = self.steady_state.clone();
        let threshold = self.config.reconfigure_threshold;
        let period = Duration::from_millis(self.config.discovery_interval_ms);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let _guard = reconfigure_guard.lock().await;

                let since = steady_state.lock().await.last_generated_at;
                let outcome = {
                    let mut conn = match FeedwardenRepo::get_conn(&pool).await {
                        Ok(conn) => conn,
                        Err(repo_error) => {
                            warn!(error = %repo_error, "discovery tick could not reach the store");
                            continue;
                        }
                    };
                    let mut registry = registry.lock().await;

                    discovery::discover::<FeedwardenRepo>(&mut conn, &mut registry, since).await
                };

                if let Err(discovery_error) = outcome {
                    warn!(error = %discovery_error, "discovery tick failed");
                    continue;
                }

                let discovered_total = registry.lock().await.len();
                let configured_total = steady_state.lock().await.configured_total;

                if reconfigure_due(configured_total, discovered_total, threshold) {
                    info!(
                        new = discovered_total - configured_total,
                        "reconfiguring dependent worker for newly discovered aggregators"
                    );

                    let aggregators = registry.lock().await.all();
                    let (snapshot, manifest_text) = match mutator.generate(&aggregators).await {
                        Ok(generated) => generated,
                        Err(manifest_error) => {
                            warn!(error = %manifest_error, "configuration generation failed");
                            continue;
                        }
                    };
                    let schema = match mutator.activate(&snapshot, &manifest_text).await {
                        Ok(schema) => schema,
                        Err(manifest_error) => {
                            warn!(error = %manifest_error, "configuration activation failed, prior manifest stays active");
                            continue;
                        }
                    };

                    server.update_schema(ProcessRole::Server, &schema).await;
                    server.restart(ProcessRole::Server).await;

                    let mut steady_state = steady_state.lock().await;
                    steady_state.configured_total = snapshot.total_aggregators();
                    steady_state.last_generated_at = Some(snapshot.generated_at);
                } else if discovered_total > configured_total {
                    info!(
                        new = discovered_total - configured_total,
                        threshold,
                        "discovery delta below reconfiguration threshold"
                    );
                }
            }
        })
    }
}
