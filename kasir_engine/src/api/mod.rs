//! # KasirGo engine public API
//!
//! The `api` module exposes the programmatic API for the POS engine. The API is modular:
//!
//! * [`order_flow_api`] handles the cashier-facing transaction lifecycle: creating orders, searching and updating
//!   them, and cancelling or deleting them.
//! * [`payment_api`] handles the payment lifecycle: recording gateway payments, applying callback and poll results,
//!   and sweeping expired payments.
//!
//! An API instance is created by supplying a database backend that implements [`PosDatabase`](crate::PosDatabase):
//!
//! ```rust,ignore
//! use kasir_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderFlowApi::new(db);
//! let order = api.create_order(&ctx, new_transaction).await?;
//! ```

pub mod order_flow_api;
pub mod payment_api;
