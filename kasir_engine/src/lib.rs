//! KasirGo POS engine
//!
//! The engine holds the core logic for a multi-tenant café point-of-sale backend: the product stock ledger, the
//! transaction lifecycle, and the payment orchestration state machine. It is storage-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public API instead. The exception is the data types used in the
//!    database, which are defined in the [`mod@db_types`] module and are public.
//! 2. The engine public API ([`OrderFlowApi`] and [`PaymentApi`]). These provide the public-facing functionality:
//!    managing products and stock, the order lifecycle, and the payment lifecycle. A backend acts as storage for
//!    the engine by implementing the [`PosDatabase`] trait.
mod api;
pub mod db_types;
pub mod helpers;
mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::{db, SqliteDatabase};
pub use api::{order_flow_api::OrderFlowApi, payment_api::PaymentApi};
pub use traits::{PosDatabase, PosDatabaseError};
