//! Sale records and the sale-recording algorithm.
//!
//! [`execute_sale`] is the body of the sale transaction. Backends supply a
//! [`SaleTransaction`] bound to an open transaction whose stock read holds a
//! write lock on the stock until commit or rollback; the caller owns begin,
//! commit and rollback.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Immutable record of stock sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub name: String,
    pub amount: i64,
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Raw sale request body; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl SaleRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }
}

/// A validated sale ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub name: String,
    pub amount: i64,
    pub price: Option<Decimal>,
}

pub const DEFAULT_SALE_AMOUNT: i64 = 1;

impl TryFrom<SaleRequest> for NewSale {
    type Error = LedgerError;

    fn try_from(request: SaleRequest) -> Result<Self, Self::Error> {
        let name = match request.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(LedgerError::NameRequired),
        };
        let amount = request.amount.unwrap_or(DEFAULT_SALE_AMOUNT);
        if amount < 1 {
            return Err(LedgerError::InvalidSaleAmount { amount });
        }
        Ok(Self {
            name,
            amount,
            price: request.price,
        })
    }
}

/// Storage operations available inside one open sale transaction.
pub trait SaleTransaction {
    /// Current amount for an exact-match name, locking the stock against
    /// concurrent writers for the rest of the transaction.
    fn lock_stock_amount(&mut self, name: &str) -> Result<Option<i64>, LedgerError>;

    fn insert_sale(&mut self, sale: &NewSale) -> Result<Sale, LedgerError>;

    fn decrement_stock(&mut self, name: &str, amount: i64) -> Result<(), LedgerError>;
}

/// Checks availability, inserts the sale and debits the stock.
///
/// Any error leaves the transaction dirty; the caller must roll back.
pub fn execute_sale<T: SaleTransaction + ?Sized>(
    tx: &mut T,
    sale: &NewSale,
) -> Result<Sale, LedgerError> {
    let available = tx
        .lock_stock_amount(&sale.name)?
        .ok_or_else(|| LedgerError::StockNotFound {
            name: sale.name.clone(),
        })?;

    if available < sale.amount {
        return Err(LedgerError::InsufficientStock {
            name: sale.name.clone(),
            available,
            requested: sale.amount,
        });
    }

    let recorded = tx.insert_sale(sale)?;
    tx.decrement_stock(&sale.name, sale.amount)?;
    Ok(recorded)
}
