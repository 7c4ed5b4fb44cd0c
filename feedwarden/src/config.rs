use std::env;
use std::path::PathBuf;

use crate::supervisor::WorkerSpec;

/// Block height the dependent indexer falls back to when a chain has no
/// configured start block for the feed registry contract.
pub const DEFAULT_START_BLOCK: i64 = 12_864_088;

pub enum ConfigError {
    EmptyDatabaseUrl,
    EmptyManifestPath,
    ZeroReconfigureThreshold,
}

impl std::fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyDatabaseUrl => {
                write!(f, "A database URL is required")
            }
            ConfigError::EmptyManifestPath => {
                write!(f, "A manifest path for the dependent worker is required")
            }
            ConfigError::ZeroReconfigureThreshold => {
                write!(f, "The reconfiguration threshold must be at least 1")
            }
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    /// Manifest the dependent worker reads its contract set from.
    pub manifest_path: PathBuf,
    /// Where timestamped manifest backups land before every rewrite.
    pub backup_dir: PathBuf,
    pub indexer_worker: WorkerSpec,
    pub server_worker: WorkerSpec,
    pub indexer_api_url: String,
    pub server_api_url: String,
    pub health_interval_ms: u64,
    pub discovery_interval_ms: u64,
    pub restart_delay_ms: u64,
    pub max_restarts: u32,
    pub readiness_timeout_ms: u64,
    pub readiness_poll_interval_ms: u64,
    pub reconfigure_threshold: usize,
    pub default_start_block: i64,
}

impl Config {
    pub fn new(
        database_url: &str,
        manifest_path: impl Into<PathBuf>,
        indexer_worker: WorkerSpec,
        server_worker: WorkerSpec,
    ) -> Self {
        let manifest_path = manifest_path.into();
        let backup_dir = manifest_path.parent().map(PathBuf::from).unwrap_or_default();

        Self {
            database_url: database_url.to_string(),
            manifest_path,
            backup_dir,
            indexer_worker,
            server_worker,
            indexer_api_url: "http://localhost:42069".to_string(),
            server_api_url: "http://localhost:42070".to_string(),
            health_interval_ms: 30_000,
            discovery_interval_ms: 600_000,
            restart_delay_ms: 5_000,
            max_restarts: 5,
            readiness_timeout_ms: 600_000,
            readiness_poll_interval_ms: 10_000,
            reconfigure_threshold: 3,
            default_start_block: DEFAULT_START_BLOCK,
        }
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();

        self
    }

    pub fn with_indexer_api_url(mut self, indexer_api_url: &str) -> Self {
        self.indexer_api_url = indexer_api_url.to_string();

        self
    }

    pub fn with_server_api_url(mut self, server_api_url: &str) -> Self {
        self.server_api_url = server_api_url.to_string();

        self
    }

    pub fn with_health_interval_ms(mut self, health_interval_ms: u64) -> Self {
        self.health_interval_ms = health_interval_ms;

        self
    }

    pub fn with_discovery_interval_ms(mut self, discovery_interval_ms: u64) -> Self {
        self.discovery_interval_ms = discovery_interval_ms;

        self
    }

    pub fn with_restart_delay_ms(mut self, restart_delay_ms: u64) -> Self {
        self.restart_delay_ms = restart_delay_ms;

        self
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;

        self
    }

    pub fn with_readiness_timeout_ms(mut self, readiness_timeout_ms: u64) -> Self {
        self.readiness_timeout_ms = readiness_timeout_ms;

        self
    }

    pub fn with_readiness_poll_interval_ms(mut self, readiness_poll_interval_ms: u64) -> Self {
        self.readiness_poll_interval_ms = readiness_poll_interval_ms;

        self
    }

    pub fn with_reconfigure_threshold(mut self, reconfigure_threshold: usize) -> Self {
        self.reconfigure_threshold = reconfigure_threshold;

        self
    }

    pub fn with_default_start_block(mut self, default_start_block: i64) -> Self {
        self.default_start_block = default_start_block;

        self
    }

    /// Applies the externally tunable parameters from the environment,
    /// leaving everything else at its configured value.
    pub fn from_env(mut self) -> Self {
        self.health_interval_ms = env_u64("FEEDWARDEN_HEALTH_INTERVAL_MS", self.health_interval_ms);
        self.discovery_interval_ms =
            env_u64("FEEDWARDEN_DISCOVERY_INTERVAL_MS", self.discovery_interval_ms);
        self.restart_delay_ms = env_u64("FEEDWARDEN_RESTART_DELAY_MS", self.restart_delay_ms);
        self.max_restarts = env_u64("FEEDWARDEN_MAX_RESTARTS", self.max_restarts as u64) as u32;

        if let Ok(url) = env::var("FEEDWARDEN_INDEXER_API_URL") {
            self.indexer_api_url = url;
        }
        if let Ok(url) = env::var("FEEDWARDEN_SERVER_API_URL") {
            self.server_api_url = url;
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            Err(ConfigError::EmptyDatabaseUrl)
        } else if self.manifest_path.as_os_str().is_empty() {
            Err(ConfigError::EmptyManifestPath)
        } else if self.reconfigure_threshold == 0 {
            Err(ConfigError::ZeroReconfigureThreshold)
        } else {
            Ok(())
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
