//! SQLite ledger adapter.
//!
//! Sales run under `BEGIN IMMEDIATE`, which takes the database write lock
//! before the stock is read. Concurrent sales queue on the busy timeout
//! instead of racing past the availability check.

use crate::domain::error::LedgerError;
use crate::domain::sale::{execute_sale, NewSale, Sale, SaleRequest, SaleTransaction};
use crate::domain::stock::{validate_stock_amount, Stock};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::{LedgerStore, SalesAggregator, SalesRecorder, StockRepository};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5000;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> LedgerError {
    LedgerError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> LedgerError {
    LedgerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| LedgerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;
        let busy_timeout =
            config.get_int("sqlite", "busy_timeout_ms", DEFAULT_BUSY_TIMEOUT_MS).max(0) as u64;

        Self::open(&db_path, pool_size, Duration::from_millis(busy_timeout))
    }

    pub fn open<P: AsRef<Path>>(
        path: P,
        pool_size: u32,
        busy_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(move |conn| conn.busy_timeout(busy_timeout));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every pooled call sees the same data.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, LedgerError> {
        self.pool.get().map_err(pool_error)
    }
}

fn map_stock_row(row: &Row<'_>) -> rusqlite::Result<Stock> {
    Ok(Stock {
        name: row.get(0)?,
        amount: row.get(1)?,
    })
}

fn map_sale_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    let price = row
        .get::<_, Option<String>>(3)?
        .map(|text| {
            Decimal::from_str(&text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(Sale {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        price,
        created_at,
    })
}

struct SqliteSaleTransaction<'a, 'conn> {
    tx: &'a Transaction<'conn>,
}

impl SaleTransaction for SqliteSaleTransaction<'_, '_> {
    fn lock_stock_amount(&mut self, name: &str) -> Result<Option<i64>, LedgerError> {
        // The write lock is already held from BEGIN IMMEDIATE.
        self.tx
            .query_row(
                "SELECT amount FROM stocks WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)
    }

    fn insert_sale(&mut self, sale: &NewSale) -> Result<Sale, LedgerError> {
        self.tx
            .query_row(
                "INSERT INTO sales (name, amount, price, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, name, amount, price, created_at",
                params![
                    sale.name,
                    sale.amount,
                    sale.price.map(|p| p.to_string()),
                    Utc::now().to_rfc3339()
                ],
                map_sale_row,
            )
            .map_err(query_error)
    }

    fn decrement_stock(&mut self, name: &str, amount: i64) -> Result<(), LedgerError> {
        let updated = self
            .tx
            .execute(
                "UPDATE stocks SET amount = amount - ?1 WHERE name = ?2",
                params![amount, name],
            )
            .map_err(query_error)?;
        if updated == 0 {
            return Err(LedgerError::StockNotFound { name: name.into() });
        }
        Ok(())
    }
}

impl StockRepository for SqliteAdapter {
    fn create_stock(&self, name: &str, amount: i64) -> Result<Stock, LedgerError> {
        let amount = validate_stock_amount(amount)?;
        let conn = self.connection()?;
        conn.query_row(
            "INSERT INTO stocks (name, amount) VALUES (?1, ?2) RETURNING name, amount",
            params![name, amount],
            map_stock_row,
        )
        .map_err(query_error)
    }

    fn list_stocks(&self) -> Result<Vec<Stock>, LedgerError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT name, amount FROM stocks ORDER BY amount ASC, rowid ASC")
            .map_err(query_error)?;

        let rows = stmt.query_map([], map_stock_row).map_err(query_error)?;

        let mut stocks = Vec::new();
        for row in rows {
            stocks.push(row.map_err(query_error)?);
        }

        Ok(stocks)
    }

    fn get_stock(&self, name: &str) -> Result<Stock, LedgerError> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT name, amount FROM stocks
             WHERE name = ?1 COLLATE NOCASE
             ORDER BY name = ?1 DESC
             LIMIT 1",
            params![name],
            map_stock_row,
        )
        .optional()
        .map_err(query_error)?
        .ok_or_else(|| LedgerError::StockNotFound { name: name.into() })
    }

    fn update_stock_amount(&self, name: &str, amount: i64) -> Result<Stock, LedgerError> {
        let amount = validate_stock_amount(amount)?;
        let conn = self.connection()?;
        conn.query_row(
            "UPDATE stocks SET amount = ?2 WHERE name = ?1 RETURNING name, amount",
            params![name, amount],
            map_stock_row,
        )
        .optional()
        .map_err(query_error)?
        .ok_or_else(|| LedgerError::StockNotFound { name: name.into() })
    }

    fn delete_all_stocks(&self) -> Result<usize, LedgerError> {
        let conn = self.connection()?;
        let deleted = conn.execute("DELETE FROM stocks", []).map_err(query_error)?;
        if deleted == 0 {
            return Err(LedgerError::NoStocksToDelete);
        }
        Ok(deleted)
    }
}

impl SalesRecorder for SqliteAdapter {
    fn record_sale(&self, request: SaleRequest) -> Result<Sale, LedgerError> {
        let sale = NewSale::try_from(request)?;

        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error)?;

        let result = execute_sale(&mut SqliteSaleTransaction { tx: &tx }, &sale);
        match result {
            Ok(recorded) => {
                tx.commit().map_err(query_error)?;
                tracing::info!(sale_id = recorded.id, name = %recorded.name, amount = recorded.amount, "sale recorded");
                Ok(recorded)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, name = %sale.name, "sale rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl SalesAggregator for SqliteAdapter {
    fn total_sales(&self) -> Result<f64, LedgerError> {
        let conn = self.connection()?;
        let total: Option<f64> = conn
            .query_row(
                "SELECT SUM(amount * CAST(price AS REAL)) FROM sales",
                [],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        Ok(total.unwrap_or(0.0))
    }
}

impl LedgerStore for SqliteAdapter {
    fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.connection()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stocks (
                name TEXT NOT NULL UNIQUE,
                amount INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                price TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_stocks_amount ON stocks(amount);",
        )
        .map_err(query_error)?;

        Ok(())
    }

    fn ping(&self) -> Result<(), LedgerError> {
        let conn = self.connection()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(query_error)?;
        Ok(())
    }
}
