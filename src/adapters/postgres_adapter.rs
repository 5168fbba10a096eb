//! PostgreSQL ledger adapter.

use crate::domain::error::LedgerError;
use crate::domain::sale::{execute_sale, NewSale, Sale, SaleRequest, SaleTransaction};
use crate::domain::stock::{validate_stock_amount, Stock};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::{LedgerStore, SalesAggregator, SalesRecorder, StockRepository};
use postgres::{NoTls, Row, Transaction};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn pool_error(e: r2d2::Error) -> LedgerError {
    LedgerError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: postgres::Error) -> LedgerError {
    LedgerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        // Try [postgres] connection_string first, fall back to [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| LedgerError::ConfigMissing {
                section: "database".into(),
                key: "conninfo".into(),
            })?;

        let pg_config = connection_string
            .parse::<postgres::Config>()
            .map_err(|e| LedgerError::ConfigInvalid {
                section: "postgres".into(),
                key: "connection_string".into(),
                reason: e.to_string(),
            })?;

        let pool_size = config.get_int("postgres", "pool_size", 8).max(1) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    fn connection(&self) -> Result<PooledConnection<Manager>, LedgerError> {
        self.pool.get().map_err(pool_error)
    }
}

// Integer columns are read through `::bigint` casts so INTEGER and BIGINT
// schemas both decode into i64.
fn stock_from_row(row: &Row) -> Result<Stock, LedgerError> {
    Ok(Stock {
        name: row.try_get(0).map_err(query_error)?,
        amount: row.try_get(1).map_err(query_error)?,
    })
}

fn sale_from_row(row: &Row) -> Result<Sale, LedgerError> {
    Ok(Sale {
        id: row.try_get(0).map_err(query_error)?,
        name: row.try_get(1).map_err(query_error)?,
        amount: row.try_get(2).map_err(query_error)?,
        price: row.try_get(3).map_err(query_error)?,
        created_at: row.try_get(4).map_err(query_error)?,
    })
}

struct PgSaleTransaction<'a, 'conn> {
    tx: &'a mut Transaction<'conn>,
}

impl SaleTransaction for PgSaleTransaction<'_, '_> {
    fn lock_stock_amount(&mut self, name: &str) -> Result<Option<i64>, LedgerError> {
        let row = self
            .tx
            .query_opt(
                "SELECT amount::bigint FROM stocks WHERE name = $1 FOR UPDATE",
                &[&name],
            )
            .map_err(query_error)?;
        row.map(|r| r.try_get(0).map_err(query_error)).transpose()
    }

    fn insert_sale(&mut self, sale: &NewSale) -> Result<Sale, LedgerError> {
        let row = self
            .tx
            .query_one(
                "INSERT INTO sales (name, amount, price) VALUES ($1, $2::bigint, $3)
                 RETURNING id::bigint, name, amount::bigint, price, created_at",
                &[&sale.name, &sale.amount, &sale.price],
            )
            .map_err(query_error)?;
        sale_from_row(&row)
    }

    fn decrement_stock(&mut self, name: &str, amount: i64) -> Result<(), LedgerError> {
        let updated = self
            .tx
            .execute(
                "UPDATE stocks SET amount = amount - $1::bigint WHERE name = $2",
                &[&amount, &name],
            )
            .map_err(query_error)?;
        if updated == 0 {
            return Err(LedgerError::StockNotFound { name: name.into() });
        }
        Ok(())
    }
}

impl StockRepository for PostgresAdapter {
    fn create_stock(&self, name: &str, amount: i64) -> Result<Stock, LedgerError> {
        let amount = validate_stock_amount(amount)?;
        let row = self
            .connection()?
            .query_one(
                "INSERT INTO stocks (name, amount) VALUES ($1, $2::bigint)
                 RETURNING name, amount::bigint",
                &[&name, &amount],
            )
            .map_err(query_error)?;
        stock_from_row(&row)
    }

    fn list_stocks(&self) -> Result<Vec<Stock>, LedgerError> {
        let rows = self
            .connection()?
            .query(
                "SELECT name, amount::bigint FROM stocks ORDER BY amount ASC",
                &[],
            )
            .map_err(query_error)?;
        rows.iter().map(stock_from_row).collect()
    }

    fn get_stock(&self, name: &str) -> Result<Stock, LedgerError> {
        let row = self
            .connection()?
            .query_opt(
                "SELECT name, amount::bigint FROM stocks
                 WHERE lower(name) = lower($1)
                 ORDER BY (name = $1) DESC
                 LIMIT 1",
                &[&name],
            )
            .map_err(query_error)?;
        match row {
            Some(row) => stock_from_row(&row),
            None => Err(LedgerError::StockNotFound { name: name.into() }),
        }
    }

    fn update_stock_amount(&self, name: &str, amount: i64) -> Result<Stock, LedgerError> {
        let amount = validate_stock_amount(amount)?;
        let row = self
            .connection()?
            .query_opt(
                "UPDATE stocks SET amount = $2::bigint WHERE name = $1
                 RETURNING name, amount::bigint",
                &[&name, &amount],
            )
            .map_err(query_error)?;
        match row {
            Some(row) => stock_from_row(&row),
            None => Err(LedgerError::StockNotFound { name: name.into() }),
        }
    }

    fn delete_all_stocks(&self) -> Result<usize, LedgerError> {
        let deleted = self
            .connection()?
            .execute("DELETE FROM stocks", &[])
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(LedgerError::NoStocksToDelete);
        }
        Ok(deleted as usize)
    }
}

impl SalesRecorder for PostgresAdapter {
    fn record_sale(&self, request: SaleRequest) -> Result<Sale, LedgerError> {
        let sale = NewSale::try_from(request)?;

        let mut conn = self.connection()?;
        let mut tx = conn.transaction().map_err(query_error)?;

        let result = execute_sale(&mut PgSaleTransaction { tx: &mut tx }, &sale);
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

impl SalesAggregator for PostgresAdapter {
    fn total_sales(&self) -> Result<f64, LedgerError> {
        let row = self
            .connection()?
            .query_one("SELECT SUM(amount * price)::float8 FROM sales", &[])
            .map_err(query_error)?;
        let total: Option<f64> = row.try_get(0).map_err(query_error)?;
        Ok(total.unwrap_or(0.0))
    }
}

impl LedgerStore for PostgresAdapter {
    fn initialize_schema(&self) -> Result<(), LedgerError> {
        self.connection()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS stocks (
                    name TEXT NOT NULL UNIQUE,
                    amount INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS sales (
                    id SERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    amount INTEGER NOT NULL,
                    price NUMERIC,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                );",
            )
            .map_err(query_error)
    }

    fn ping(&self) -> Result<(), LedgerError> {
        self.connection()?
            .simple_query("SELECT 1")
            .map_err(query_error)?;
        Ok(())
    }
}
