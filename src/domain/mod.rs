//! Core domain types and logic.

pub mod error;
pub mod sale;
pub mod stock;
