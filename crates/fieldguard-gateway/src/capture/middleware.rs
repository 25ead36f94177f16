//! axum glue for the capture state machine.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::app_state::AppState;
use crate::context::principal_of;

use super::envelope::EnvelopeSlot;
use super::state::{AxumWriter, ResponseCapture};

/// Buffer the handler's body, then write exactly one response: the filtered
/// envelope if one was registered, otherwise the captured bytes verbatim.
///
/// Install with `axum::middleware::from_fn_with_state`, inside the
/// authentication layer so the principal is already attached.
pub async fn capture_middleware(State(app): State<AppState>, mut req: Request, next: Next) -> Response {
    let principal = principal_of(&req);
    let slot = EnvelopeSlot::new();
    req.extensions_mut().insert(slot.clone());

    let res = next.run(req).await;
    let started = Instant::now();

    let (parts, body) = res.into_parts();
    let mut capture = ResponseCapture::new(AxumWriter::default());

    let mut interrupted = false;
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                if let Err(e) = capture.buffer(&bytes) {
                    tracing::warn!(error = %e, "capture buffer rejected chunk");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "handler body failed mid-stream");
                interrupted = true;
                break;
            }
        }
    }

    let outcome = if interrupted {
        capture.abort(parts)
    } else {
        capture.complete(parts, slot.take(), app.engine(), principal)
    };

    let metrics = app.metrics();
    match outcome {
        Ok(state) => {
            tracing::debug!(outcome = state.as_str(), "response captured");
            metrics.responses.inc(&[("outcome", state.as_str())]);
        }
        Err(e) => {
            metrics.filter_errors.inc(&[("code", e.client_code().as_str())]);
        }
    }
    metrics.filter_duration.observe(&[], started.elapsed());

    capture.into_writer().into_response()
}
