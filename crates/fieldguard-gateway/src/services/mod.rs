//! Demo handlers and custom transforms used by the gateway binary.

pub mod demo;

pub use demo::{register_transforms, routes};
