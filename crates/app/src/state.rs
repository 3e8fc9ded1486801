//! Application state management

use std::sync::{Arc, Mutex};

use bookline_core::{AppConfig, Database, Result};

/// Shared state for the booking service
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: AppConfig,
}

impl AppState {
    /// Open the ledger at the configured path
    pub fn new(config: AppConfig) -> Result<Self> {
        let db_path = config.db_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            config,
        })
    }

    /// In-memory ledger (for testing)
    pub fn in_memory(config: AppConfig) -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.data_dir = Some(dir.path().to_path_buf());

        let state = AppState::new(config).unwrap();
        assert!(state.db.lock().unwrap().schema_version() > 0);
        assert!(dir.path().join("bookline.db").exists());
    }
}
