//! SQLite backend for the marketplace database contract.
//!
//! The individual query functions live in the sibling modules and operate on a
//! `SqliteConnection`, so they can be composed inside a transaction by passing `&mut *tx`.
mod activity;
mod db;
mod errors;
mod orders;
mod products;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
