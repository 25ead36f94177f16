//! Envelopes: how a handler opts its payload into filtering.
//!
//! The capture middleware inserts an [`EnvelopeSlot`] into the request. A
//! handler takes a [`FilterContext`] (which carries that slot) and returns
//! `Envelope::new(ctx, payload)` instead of `Json(payload)`. Without the
//! middleware the envelope renders as plain JSON.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use fieldguard_core::error::Result;
use fieldguard_core::RequestFilterState;

use super::JSON_CONTENT_TYPE;

/// Body written by an envelope while the capture middleware is buffering.
/// It is always discarded.
const PLACEHOLDER: &str = "[]";

type RenderFn = Box<dyn FnOnce(&RequestFilterState) -> Result<Vec<u8>> + Send>;

/// Type-erased payload waiting for the filter decision.
pub struct PendingEnvelope {
    type_name: &'static str,
    render: RenderFn,
}

impl PendingEnvelope {
    pub fn new<T>(payload: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            render: Box::new(move |filter| filter.to_vec(&payload)),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Serialize through the request's override table. Consumes the envelope.
    pub fn render(self, filter: &RequestFilterState) -> Result<Vec<u8>> {
        (self.render)(filter)
    }
}

impl std::fmt::Debug for PendingEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEnvelope")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Request-scoped registration point. The first envelope wins.
#[derive(Clone, Default)]
pub struct EnvelopeSlot {
    inner: Arc<Mutex<Option<PendingEnvelope>>>,
}

impl EnvelopeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and drops `env`) if an envelope was already registered.
    pub fn register(&self, env: PendingEnvelope) -> bool {
        // Poisoned mutex means a handler panicked mid-registration; ignore the
        // envelope so the response falls back to pass-through.
        let Ok(mut slot) = self.inner.lock() else { return false; };
        if let Some(existing) = slot.as_ref() {
            tracing::warn!(
                kept = existing.type_name(),
                ignored = env.type_name(),
                "more than one envelope registered in a request; keeping the first"
            );
            return false;
        }
        *slot = Some(env);
        true
    }

    pub fn take(&self) -> Option<PendingEnvelope> {
        self.inner.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn is_registered(&self) -> bool {
        self.inner.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

/// The request context an envelope needs. Always extractable.
#[derive(Clone, Default)]
pub struct FilterContext {
    slot: Option<EnvelopeSlot>,
}

impl FilterContext {
    /// True when the capture middleware is active for this request.
    pub fn is_captured(&self) -> bool {
        self.slot.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for FilterContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut request::Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self {
            slot: parts.extensions.get::<EnvelopeSlot>().cloned(),
        })
    }
}

/// A payload that is filtered per principal before it is sent.
pub struct Envelope<T> {
    ctx: FilterContext,
    status: StatusCode,
    data: T,
}

impl<T> Envelope<T>
where
    T: Serialize + Send + 'static,
{
    pub fn new(ctx: FilterContext, data: T) -> Self {
        Self {
            ctx,
            status: StatusCode::OK,
            data,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T> IntoResponse for Envelope<T>
where
    T: Serialize + Send + 'static,
{
    fn into_response(self) -> Response {
        let headers = [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)];

        if let Some(slot) = self.ctx.slot {
            slot.register(PendingEnvelope::new(self.data));
            return (self.status, headers, PLACEHOLDER).into_response();
        }

        match serde_json::to_vec(&self.data) {
            Ok(body) => (self.status, headers, body).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "envelope serialization failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
