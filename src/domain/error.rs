//! Domain error types.

/// Broad classification used to pick an HTTP status or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable input or business-rule rejection.
    Validation,
    /// The referenced entity does not exist.
    NotFound,
    /// Connectivity, constraint violation or driver fault.
    Storage,
    Config,
    Io,
}

/// Top-level error type for stockledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Name is required")]
    NameRequired,

    #[error("Amount must be positive")]
    InvalidSaleAmount { amount: i64 },

    #[error("Amount must not be negative")]
    NegativeStockAmount { amount: i64 },

    #[error("Stock not found")]
    StockNotFound { name: String },

    #[error("Insufficient stock")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("No stocks to delete")]
    NoStocksToDelete,

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("background task failed: {reason}")]
    Task { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NameRequired
            | LedgerError::InvalidSaleAmount { .. }
            | LedgerError::NegativeStockAmount { .. }
            | LedgerError::InsufficientStock { .. } => ErrorKind::Validation,
            LedgerError::StockNotFound { .. } | LedgerError::NoStocksToDelete => {
                ErrorKind::NotFound
            }
            LedgerError::Database { .. }
            | LedgerError::DatabaseQuery { .. }
            | LedgerError::Task { .. } => ErrorKind::Storage,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => ErrorKind::Config,
            LedgerError::Io(_) => ErrorKind::Io,
        }
    }

    /// Client-caused failures, as opposed to internal faults.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::Storage => 3,
            ErrorKind::Validation => 4,
            ErrorKind::NotFound => 5,
        };
        std::process::ExitCode::from(code)
    }
}
