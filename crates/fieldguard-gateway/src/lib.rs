//! fieldguard gateway library entry.
//!
//! Wires the filter engine into axum: the response capture middleware, the
//! envelope handlers return, config loading, shared state, and ops
//! endpoints. Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod capture;
pub mod config;
pub mod context;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
