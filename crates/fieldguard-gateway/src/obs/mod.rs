//! Lightweight in-process metrics (dependency-free apart from `DashMap`).
//!
//! Counters and a latency histogram for the capture middleware, rendered in
//! Prometheus text format by the `/metrics` handler.

pub mod metrics;

pub use metrics::FilterMetrics;
