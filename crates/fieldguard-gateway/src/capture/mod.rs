//! Response capture: buffer the handler's output, then either pass it through
//! untouched or replace it with the filtered serialization of a registered
//! envelope.
//!
//! - `state`: the three-state machine with an injected writer
//! - `envelope`: how handlers opt a payload into filtering
//! - `middleware`: axum glue (`from_fn_with_state`)

pub mod envelope;
pub mod middleware;
pub mod state;

pub use envelope::{Envelope, EnvelopeSlot, FilterContext, PendingEnvelope};
pub use middleware::capture_middleware;
pub use state::{AxumWriter, CaptureState, ResponseCapture, ResponseWriter};

/// Content type of every filtered response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
