//! # KasirGo server
//! This module hosts the HTTP surface for the KasirGo POS backend. It is responsible for:
//! * Translating identity headers into a tenant context for the engine.
//! * Exposing the order, product and payment lifecycle over REST.
//! * Receiving and verifying server-to-server callbacks from the Duitku payment gateway.
//! * Running the background payment expiry sweeper.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! All business routes live under the `/api` scope and require the `X-Tenant-Id`, `X-Actor-Id` and `X-Actor-Role`
//! headers, with two exceptions: `/health` (no auth at all) and `/api/payments/callback`, which is authenticated
//! by its gateway signature instead.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod routes;
pub mod server;
