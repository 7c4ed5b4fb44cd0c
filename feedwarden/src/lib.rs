mod chains;
mod config;
mod diesel;
pub mod discovery;
pub mod manifest;
#[cfg(feature = "postgres")]
pub mod orchestrator;
mod repos;
pub mod supervisor;

pub use chains::{resolve_chain_id, resolve_chain_name, ChainId};
pub use config::{Config, ConfigError, DEFAULT_START_BLOCK};
pub use discovery::{
    AggregatorRegistry, AggregatorStatus, DiscoveredAggregator, DiscoveryError, DiscoveryStats,
    Feed, UnsavedFeed,
};
pub use manifest::{
    ConfigIdentity, ConfigMutator, ConfigSnapshot, IndexerManifest, ManifestError,
};
#[cfg(feature = "postgres")]
pub use orchestrator::{Orchestrator, OrchestratorError, Phase};
pub use repos::*;
pub use supervisor::{
    ManagedProcess, ProcessHealth, ProcessRole, ProcessStatus, ProcessSupervisor, WorkerSpec,
};

#[cfg(feature = "postgres")]
pub use repos::{PostgresRepo, PostgresRepoConn, PostgresRepoPool};

#[cfg(feature = "postgres")]
pub use repos::PostgresRepoAsyncConnection as FeedwardenRepoAsyncConnection;

#[cfg(feature = "postgres")]
pub type FeedwardenRepo = PostgresRepo;

#[cfg(feature = "postgres")]
pub type FeedwardenRepoPool = PostgresRepoPool;

#[cfg(feature = "postgres")]
pub type FeedwardenRepoConn<'a> = PostgresRepoConn<'a>;

pub enum FeedwardenError {
    Config(ConfigError),
    #[cfg(feature = "postgres")]
    Orchestration(OrchestratorError),
}

impl From<ConfigError> for FeedwardenError {
    fn from(value: ConfigError) -> Self {
        FeedwardenError::Config(value)
    }
}

#[cfg(feature = "postgres")]
impl From<OrchestratorError> for FeedwardenError {
    fn from(value: OrchestratorError) -> Self {
        FeedwardenError::Orchestration(value)
    }
}

impl std::fmt::Debug for FeedwardenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedwardenError::Config(config_error) => {
                write!(f, "Config Error: {:?}", config_error)
            }
            #[cfg(feature = "postgres")]
            FeedwardenError::Orchestration(orchestrator_error) => {
                write!(f, "Orchestration Error: {}", orchestrator_error)
            }
        }
    }
}

/// Boots the supervisor: validates the configuration, drives the bootstrap
/// phases, then parks on the steady-state timers until an external
/// termination signal arrives.
#[cfg(feature = "postgres")]
pub async fn start(config: Config) -> Result<(), FeedwardenError> {
    config.validate()?;

    let mut orchestrator = Orchestrator::new(config).await;
    orchestrator.start().await?;

    if let Err(signal_error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %signal_error, "failed to listen for termination signal");
    }

    orchestrator.shutdown().await;

    Ok(())
}
