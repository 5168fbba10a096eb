#![cfg(feature = "sqlite")]
//! Store-level integration tests against SQLite.
//!
//! Tests cover:
//! - Stock repository lookups, updates and bulk delete
//! - Sale recording: defaults, rejections, rollback after a mid-transaction fault
//! - Concurrent sales against the same stock never oversell
//! - Total sales aggregation
//! - Stock never goes negative over arbitrary sale sequences

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Barrier;
use stockledger::domain::error::LedgerError;
use stockledger::domain::sale::SaleRequest;
use stockledger::ports::ledger_port::{SalesAggregator, SalesRecorder, StockRepository};
use tempfile::TempDir;

mod stock_repository {
    use super::*;

    #[test]
    fn create_returns_created_record() {
        let store = memory_store();
        let stock = store.create_stock("widget", 10).unwrap();
        assert_eq!(stock.name, "widget");
        assert_eq!(stock.amount, 10);
    }

    #[test]
    fn create_rejects_negative_amount() {
        let store = memory_store();
        assert!(matches!(
            store.create_stock("widget", -1),
            Err(LedgerError::NegativeStockAmount { amount: -1 })
        ));
        assert!(store.list_stocks().unwrap().is_empty());
    }

    #[test]
    fn get_by_name_is_case_insensitive() {
        let store = memory_store();
        store.create_stock("widget", 10).unwrap();

        let stock = store.get_stock("WiDgEt").unwrap();
        assert_eq!(stock.name, "widget");
        assert_eq!(stock.amount, 10);
    }

    #[test]
    fn get_by_name_treats_like_wildcards_literally() {
        let store = memory_store();
        store.create_stock("widget", 10).unwrap();

        assert!(matches!(
            store.get_stock("wid%"),
            Err(LedgerError::StockNotFound { .. })
        ));
    }

    #[test]
    fn update_missing_stock_is_not_found() {
        let store = memory_store();
        assert!(matches!(
            store.update_stock_amount("widget", 3),
            Err(LedgerError::StockNotFound { name }) if name == "widget"
        ));
    }

    #[test]
    fn delete_all_on_empty_table_is_nothing_to_delete() {
        let store = memory_store();
        let err = store.delete_all_stocks().unwrap_err();
        assert_eq!(err.to_string(), "No stocks to delete");
    }
}

mod sales_recorder {
    use super::*;

    #[test]
    fn widget_scenario() {
        let store = memory_store();
        store.create_stock("widget", 10).unwrap();

        let sale = store
            .record_sale(SaleRequest::new("widget").amount(4).price(Decimal::from(2)))
            .unwrap();
        assert_eq!(sale.name, "widget");
        assert_eq!(sale.amount, 4);
        assert_eq!(store.get_stock("widget").unwrap().amount, 6);

        let err = store
            .record_sale(SaleRequest::new("widget").amount(100))
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock");
        assert_eq!(store.get_stock("widget").unwrap().amount, 6);
    }

    #[test]
    fn missing_amount_records_one() {
        let store = memory_store();
        store.create_stock("widget", 3).unwrap();

        let sale = store.record_sale(SaleRequest::new("widget")).unwrap();
        assert_eq!(sale.amount, 1);
        assert_eq!(sale.price, None);
        assert_eq!(store.get_stock("widget").unwrap().amount, 2);
    }

    #[test]
    fn name_checked_before_touching_storage() {
        let store = stockledger::adapters::sqlite_adapter::SqliteAdapter::in_memory().unwrap();
        // No schema: any storage access would fail with a query error.
        assert!(matches!(
            store.record_sale(SaleRequest::default()),
            Err(LedgerError::NameRequired)
        ));
    }

    #[test]
    fn sale_requires_exact_name() {
        let store = memory_store();
        store.create_stock("widget", 3).unwrap();

        assert!(matches!(
            store.record_sale(SaleRequest::new("WIDGET")),
            Err(LedgerError::StockNotFound { .. })
        ));
        assert_eq!(store.get_stock("widget").unwrap().amount, 3);
    }

    #[test]
    fn sale_ids_are_assigned_in_order() {
        let store = memory_store();
        store.create_stock("widget", 3).unwrap();

        let first = store.record_sale(SaleRequest::new("widget")).unwrap();
        let second = store.record_sale(SaleRequest::new("widget")).unwrap();
        assert!(second.id > first.id);
        assert!(second.created_at >= first.created_at);
    }

    #[test]
    fn fault_after_insert_rolls_back_sale_and_stock() {
        let dir = TempDir::new().unwrap();
        let (store, path) = file_store(&dir, 2);
        store.create_stock("widget", 10).unwrap();

        raw_connection(&path)
            .execute_batch(
                "CREATE TRIGGER fail_decrement BEFORE UPDATE ON stocks
                 BEGIN SELECT RAISE(ABORT, 'injected fault'); END;",
            )
            .unwrap();

        let err = store
            .record_sale(SaleRequest::new("widget").amount(4))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DatabaseQuery { ref reason } if reason.contains("injected fault")));
        assert_eq!(count_sales(&path), 0);
        assert_eq!(store.get_stock("widget").unwrap().amount, 10);
    }

    #[test]
    fn connections_are_released_after_failures() {
        let dir = TempDir::new().unwrap();
        let (store, _path) = file_store(&dir, 1);
        store.create_stock("widget", 1).unwrap();

        for _ in 0..5 {
            assert!(store.record_sale(SaleRequest::new("gadget")).is_err());
            assert!(store.record_sale(SaleRequest::new("widget").amount(2)).is_err());
        }
        // Pool of one: a leaked connection would make this time out.
        assert!(store.record_sale(SaleRequest::new("widget")).is_ok());
    }
}

mod concurrency {
    use super::*;

    #[test]
    fn two_full_sales_of_the_same_stock_yield_one_success() {
        let dir = TempDir::new().unwrap();
        let (store, path) = file_store(&dir, 4);
        store.create_stock("widget", 5).unwrap();

        let barrier = Barrier::new(2);
        let (store_ref, barrier_ref) = (&store, &barrier);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(move |_| {
                    s.spawn(move || {
                        barrier_ref.wait();
                        store_ref.record_sale(SaleRequest::new("widget").amount(5))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let insufficient = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientStock { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(store.get_stock("widget").unwrap().amount, 0);
        assert_eq!(count_sales(&path), 1);
    }

    #[test]
    fn many_unit_sales_stop_at_zero() {
        let dir = TempDir::new().unwrap();
        let (store, path) = file_store(&dir, 4);
        store.create_stock("widget", 5).unwrap();

        let barrier = Barrier::new(8);
        let (store_ref, barrier_ref) = (&store, &barrier);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(move |_| {
                    s.spawn(move || {
                        barrier_ref.wait();
                        store_ref.record_sale(SaleRequest::new("widget"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
        assert_eq!(store.get_stock("widget").unwrap().amount, 0);
        assert_eq!(count_sales(&path), 5);
    }
}

mod sales_aggregator {
    use super::*;

    #[test]
    fn total_is_zero_without_sales() {
        let store = memory_store();
        assert_eq!(store.total_sales().unwrap(), 0.0);
    }

    #[test]
    fn sale_adds_amount_times_price() {
        let store = memory_store();
        store.create_stock("widget", 10).unwrap();
        store
            .record_sale(SaleRequest::new("widget").amount(4).price(Decimal::from(2)))
            .unwrap();
        let before = store.total_sales().unwrap();

        store
            .record_sale(SaleRequest::new("widget").amount(3).price(Decimal::new(25, 1)))
            .unwrap();
        let after = store.total_sales().unwrap();

        assert_relative_eq!(before, 8.0);
        assert_relative_eq!(after - before, 7.5);
    }

    #[test]
    fn rejected_sales_do_not_count() {
        let store = memory_store();
        store.create_stock("widget", 1).unwrap();
        let _ = store.record_sale(SaleRequest::new("widget").amount(2).price(Decimal::from(100)));
        assert_eq!(store.total_sales().unwrap(), 0.0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stock_never_goes_negative(
        initial in 0i64..50,
        amounts in proptest::collection::vec(1i64..20, 0..12),
    ) {
        let store = memory_store();
        store.create_stock("widget", initial).unwrap();

        let mut expected = initial;
        for amount in amounts {
            match store.record_sale(SaleRequest::new("widget").amount(amount)) {
                Ok(_) => {
                    prop_assert!(amount <= expected);
                    expected -= amount;
                }
                Err(LedgerError::InsufficientStock { available, requested, .. }) => {
                    prop_assert!(amount > expected);
                    prop_assert_eq!(available, expected);
                    prop_assert_eq!(requested, amount);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
            let current = store.get_stock("widget").unwrap().amount;
            prop_assert_eq!(current, expected);
            prop_assert!(current >= 0);
        }
    }
}
