use chrono::{DateTime, Utc};
use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProcessRole {
    #[display("indexer")]
    Indexer,
    #[display("server")]
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Stopped,
    Restarting,
}

/// One supervised OS-level worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedProcess {
    pub role: ProcessRole,
    pub pid: u32,
    pub status: ProcessStatus,
    pub started_at: DateTime<Utc>,
    pub restart_count: u32,
}

/// How to launch one worker: the program plus the explicit environment
/// every worker receives.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    pub program: String,
    pub args: Vec<String>,
    pub database_url: String,
    pub rpc_api_key: String,
    pub port: u16,
    /// Storage-schema selector produced by configuration activation.
    pub schema: String,
}

impl WorkerSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
            database_url: String::new(),
            rpc_api_key: String::new(),
            port: 42069,
            schema: "public".to_string(),
        }
    }

    pub fn add_arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());

        self
    }

    pub fn with_database_url(mut self, database_url: &str) -> Self {
        self.database_url = database_url.to_string();

        self
    }

    pub fn with_rpc_api_key(mut self, rpc_api_key: &str) -> Self {
        self.rpc_api_key = rpc_api_key.to_string();

        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;

        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();

        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHealth {
    pub running: bool,
    pub uptime_secs: u64,
    pub restarts: u32,
}
