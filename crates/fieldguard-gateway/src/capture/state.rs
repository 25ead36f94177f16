//! Capture state machine.
//!
//! `Buffering` is the only non-terminal state. Exactly one of `PassThrough`
//! or `Filtered` is entered per request and the injected writer is called at
//! most once; nothing reaches it while buffering.

use axum::{
    body::Body,
    http::{header, response::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use serde_json::json;

use fieldguard_core::error::{FilterError, Result};
use fieldguard_core::{FilterEngine, Principal};

use super::envelope::PendingEnvelope;
use super::JSON_CONTENT_TYPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Buffering,
    PassThrough,
    Filtered,
}

impl CaptureState {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureState::Buffering => "buffering",
            CaptureState::PassThrough => "pass_through",
            CaptureState::Filtered => "filtered",
        }
    }
}

/// The real network write, injected into the capture.
pub trait ResponseWriter {
    fn write_response(&mut self, parts: Parts, body: Bytes) -> Result<()>;
}

pub struct ResponseCapture<W> {
    state: CaptureState,
    buf: BytesMut,
    writer: W,
}

impl<W: ResponseWriter> ResponseCapture<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: CaptureState::Buffering,
            buf: BytesMut::new(),
            writer,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Redirect a handler write into the buffer. The returned count is not
    /// meaningful (always 0).
    pub fn buffer(&mut self, chunk: &[u8]) -> Result<usize> {
        self.ensure_buffering()?;
        self.buf.extend_from_slice(chunk);
        Ok(0)
    }

    /// Handler finished: decide and write exactly once.
    ///
    /// With an envelope the buffer is discarded and the filtered payload is
    /// written as JSON. If serialization fails, a single 500 JSON error is
    /// written instead and the error is returned.
    pub fn complete(
        &mut self,
        parts: Parts,
        envelope: Option<PendingEnvelope>,
        engine: &FilterEngine,
        principal: Option<Principal>,
    ) -> Result<CaptureState> {
        self.ensure_buffering()?;

        let Some(envelope) = envelope else {
            return self.pass_through(parts);
        };

        self.state = CaptureState::Filtered;
        self.buf.clear();

        let filter = engine.begin(principal.unwrap_or_default());
        match envelope.render(&filter) {
            Ok(body) => {
                self.writer.write_response(json_parts(parts), Bytes::from(body))?;
                Ok(CaptureState::Filtered)
            }
            Err(e) => {
                tracing::error!(error = %e, user = %filter.principal().user, "filtered serialization failed");
                self.writer.write_response(error_parts(), error_body(&e))?;
                Err(e)
            }
        }
    }

    /// Cancellation before the handler finished cleanly: flush what was
    /// captured without waiting for anything else.
    pub fn abort(&mut self, parts: Parts) -> Result<CaptureState> {
        self.ensure_buffering()?;
        tracing::warn!(buffered = self.buf.len(), "capture aborted; passing captured bytes through");
        self.pass_through(parts)
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn pass_through(&mut self, parts: Parts) -> Result<CaptureState> {
        self.state = CaptureState::PassThrough;
        let body = self.buf.split().freeze();
        self.writer.write_response(parts, body)?;
        Ok(CaptureState::PassThrough)
    }

    fn ensure_buffering(&self) -> Result<()> {
        if self.state != CaptureState::Buffering {
            return Err(FilterError::Internal(format!(
                "capture already completed ({})",
                self.state.as_str()
            )));
        }
        Ok(())
    }
}

fn json_parts(mut parts: Parts) -> Parts {
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    parts
}

fn error_body(e: &FilterError) -> Bytes {
    let body = json!({
        "code": e.client_code().as_str(),
        "msg": "response serialization failed",
    });
    Bytes::from(body.to_string())
}

fn error_parts() -> Parts {
    let mut res = axum::http::Response::new(());
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    res.into_parts().0
}

/// Writer that materializes the single axum `Response`.
#[derive(Default)]
pub struct AxumWriter {
    response: Option<Response>,
}

impl ResponseWriter for AxumWriter {
    fn write_response(&mut self, parts: Parts, body: Bytes) -> Result<()> {
        if self.response.is_some() {
            return Err(FilterError::Internal("response already written".into()));
        }
        self.response = Some(Response::from_parts(parts, Body::from(body)));
        Ok(())
    }
}

impl IntoResponse for AxumWriter {
    fn into_response(self) -> Response {
        match self.response {
            Some(r) => r,
            None => {
                tracing::error!("capture finished without a response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
