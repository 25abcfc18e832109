//! Application state for the agent registry service

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::{Database, StorageResult};
use crate::registry::{AgentRegistry, KeyRegistry};
use crate::types::ServiceInfo;

/// Shared state handed to every request handler
pub struct AppState {
    /// Agent lifecycle
    pub agents: AgentRegistry,
    /// Key lifecycle
    pub keys: KeyRegistry,
    /// Configuration
    pub config: Config,
    /// Start time for uptime calculation
    pub start_time: Instant,
    db: Arc<Database>,
}

impl AppState {
    /// Build state around an already opened database
    pub fn new(config: Config, db: Database) -> Arc<Self> {
        let db = Arc::new(db);

        Arc::new(Self {
            agents: AgentRegistry::new(Arc::clone(&db)),
            keys: KeyRegistry::new(Arc::clone(&db)),
            config,
            start_time: Instant::now(),
            db,
        })
    }

    /// Open the database named by `config.database_path` and build state
    pub fn open(config: Config) -> StorageResult<Arc<Self>> {
        let db = Database::open(&config.database_path)?;
        Ok(Self::new(config, db))
    }

    /// Service banner
    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            message: "Agent Registry Service is running".into(),
            version: self.config.version.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Direct store access for maintenance and tests
    pub fn database(&self) -> &Database {
        &self.db
    }
}
