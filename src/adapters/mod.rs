//! Concrete adapter implementations for ports.

#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
pub mod file_config_adapter;

use std::sync::Arc;

use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerStore;

/// Storage backends selectable through `[database] backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let name = config
            .get_string("database", "backend")
            .unwrap_or_else(|| "sqlite".to_string());
        match name.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(LedgerError::ConfigInvalid {
                section: "database".into(),
                key: "backend".into(),
                reason: format!("unknown backend '{other}' (expected sqlite or postgres)"),
            }),
        }
    }
}

/// Opens the configured backend and, unless `[database] init_schema = false`,
/// creates the tables.
pub fn open_store(config: &dyn ConfigPort) -> Result<Arc<dyn LedgerStore>, LedgerError> {
    let store: Arc<dyn LedgerStore> = match Backend::from_config(config)? {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Arc::new(sqlite_adapter::SqliteAdapter::from_config(config)?),
        #[cfg(feature = "postgres")]
        Backend::Postgres => Arc::new(postgres_adapter::PostgresAdapter::from_config(config)?),
        #[allow(unreachable_patterns)]
        backend => {
            return Err(LedgerError::ConfigInvalid {
                section: "database".into(),
                key: "backend".into(),
                reason: format!("{backend:?} support was not compiled in"),
            });
        }
    };

    store.ping()?;
    tracing::info!("connected to the database");

    if config.get_bool("database", "init_schema", true) {
        store.initialize_schema()?;
    }

    Ok(store)
}
