//! Storage ports for stocks and sales.

use crate::domain::error::LedgerError;
use crate::domain::sale::{Sale, SaleRequest};
use crate::domain::stock::Stock;

/// Single-statement CRUD over the `stocks` table.
pub trait StockRepository {
    fn create_stock(&self, name: &str, amount: i64) -> Result<Stock, LedgerError>;

    /// All stocks ordered by ascending amount.
    fn list_stocks(&self) -> Result<Vec<Stock>, LedgerError>;

    /// Case-insensitive lookup. An exact-case match is preferred when several
    /// rows fold to the same name.
    fn get_stock(&self, name: &str) -> Result<Stock, LedgerError>;

    /// Exact-match update.
    fn update_stock_amount(&self, name: &str, amount: i64) -> Result<Stock, LedgerError>;

    /// Returns the number of rows removed; zero rows is `NoStocksToDelete`.
    fn delete_all_stocks(&self) -> Result<usize, LedgerError>;
}

pub trait SalesRecorder {
    /// Records a sale and debits the matching stock in one transaction.
    fn record_sale(&self, request: SaleRequest) -> Result<Sale, LedgerError>;
}

pub trait SalesAggregator {
    /// Sum of `amount * price` over all sales; `0.0` when there are none.
    fn total_sales(&self) -> Result<f64, LedgerError>;
}

/// A storage handle providing every ledger operation.
pub trait LedgerStore: StockRepository + SalesRecorder + SalesAggregator + Send + Sync {
    fn initialize_schema(&self) -> Result<(), LedgerError>;

    /// Round-trips a trivial query to verify connectivity.
    fn ping(&self) -> Result<(), LedgerError>;
}
