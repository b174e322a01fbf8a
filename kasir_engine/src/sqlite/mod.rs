//! SQLite backend for the POS engine.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
