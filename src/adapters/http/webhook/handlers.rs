//! Axum handlers for the gateway webhook endpoints.
//!
//! The gateway authenticates by signature, not by session, so these
//! endpoints take no auth middleware. The production route can also be
//! gated to the gateway's published source addresses.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::application::handlers::{ProcessWebhookCommand, ProcessWebhookHandler};
use crate::config::PaymentConfig;
use crate::domain::reconciliation::{ReconcileOutcome, WebhookError};

use super::dto::{AlreadyProcessed, WebhookAck, WebhookErrorBody};

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub handler: Arc<ProcessWebhookHandler>,

    /// Source addresses allowed to call the production endpoint.
    /// `None` disables the gate.
    pub ip_allowlist: Option<Arc<Vec<IpAddr>>>,
}

impl WebhookAppState {
    /// Builds state from configuration.
    pub fn new(handler: Arc<ProcessWebhookHandler>, payment: &PaymentConfig) -> Self {
        let ip_allowlist = payment
            .ip_allowlist_enabled
            .then(|| Arc::new(payment.allowlist_addrs()));
        Self {
            handler,
            ip_allowlist,
        }
    }
}

/// POST /webhooks/midtrans - production notification endpoint.
pub async fn handle_midtrans_webhook(
    State(state): State<WebhookAppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    if let Some(allowlist) = &state.ip_allowlist {
        if !allowlist.contains(&addr.ip()) {
            tracing::warn!(source = %addr.ip(), "webhook from address outside allowlist");
            return Err(WebhookApiError(WebhookError::ForbiddenSource));
        }
    }

    process(&state, &body).await
}

/// POST /test/webhook/midtrans - simulation endpoint.
///
/// Same pipeline, never IP-gated. Mounted only outside production.
pub async fn handle_test_webhook(
    State(state): State<WebhookAppState>,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    process(&state, &body).await
}

async fn process(state: &WebhookAppState, body: &Bytes) -> Result<Response, WebhookApiError> {
    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| WebhookApiError(WebhookError::ParseError(e.to_string())))?;

    let outcome = state
        .handler
        .handle(ProcessWebhookCommand { payload })
        .await?;

    let response = match outcome {
        ReconcileOutcome::Duplicate => {
            (StatusCode::OK, Json(AlreadyProcessed::new())).into_response()
        }
        ReconcileOutcome::Applied { .. }
        | ReconcileOutcome::Ignored { .. }
        | ReconcileOutcome::Anomaly { .. }
        | ReconcileOutcome::UnknownOrder { .. } => {
            (StatusCode::OK, Json(WebhookAck::ok())).into_response()
        }
    };
    Ok(response)
}

/// API error wrapper mapping WebhookError to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(pub WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = match self.0 {
            WebhookError::MissingFields(fields) => WebhookErrorBody::missing(fields),
            err => WebhookErrorBody::new(err.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
