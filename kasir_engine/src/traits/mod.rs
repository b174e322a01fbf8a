//! The traits that a storage backend must implement to drive the POS engine.
//!
//! The engine is backend-agnostic: all order, stock and payment semantics are expressed against [`PosDatabase`],
//! and the SQLite implementation lives in the `sqlite` module. Swapping the storage layer means implementing this
//! one trait.

mod pos_database;

pub use pos_database::{PosDatabase, PosDatabaseError};
