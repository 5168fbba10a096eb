//! Stock records and the name-to-amount projection.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// A named inventory item with a quantity on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub name: String,
    pub amount: i64,
}

impl Stock {
    /// Single-entry `{name: amount}` view returned by the lookup endpoint.
    pub fn as_entry(&self) -> StockMap {
        let mut map = StockMap::new();
        map.insert(self.name.clone(), self.amount);
        map
    }
}

/// Keeps insertion order, so a listing serializes in the order rows were read.
pub type StockMap = IndexMap<String, i64>;

/// Projects stocks (already ordered by ascending amount) into a name→amount map.
///
/// Duplicate names keep the entry seen last.
pub fn to_stock_map(stocks: impl IntoIterator<Item = Stock>) -> StockMap {
    stocks
        .into_iter()
        .fold(StockMap::new(), |mut acc, stock| {
            acc.insert(stock.name, stock.amount);
            acc
        })
}

pub fn validate_stock_amount(amount: i64) -> Result<i64, LedgerError> {
    if amount < 0 {
        return Err(LedgerError::NegativeStockAmount { amount });
    }
    Ok(amount)
}
