//! Axum handlers for the billing endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::application::handlers::{CreateCheckoutCommand, CreateCheckoutHandler};
use crate::domain::billing::BillingPackage;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};

use super::dto::{CheckoutRequest, CheckoutResponse, ErrorResponse};

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub checkout: Arc<CreateCheckoutHandler>,

    /// Subscribable packages keyed by id. The catalog is owned by the
    /// platform; this service only needs price and interval.
    pub packages: Arc<HashMap<i64, BillingPackage>>,
}

/// POST /billing/checkout - initiate a paid checkout.
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response, BillingApiError> {
    let user_id = UserId::new(request.user_id)
        .map_err(|e| BillingApiError(DomainError::validation("user_id", e.to_string())))?;

    let package = state
        .packages
        .get(&request.package_id)
        .cloned()
        .ok_or_else(|| {
            BillingApiError(DomainError::new(
                ErrorCode::PackageNotFound,
                format!("No package with id {}", request.package_id),
            ))
        })?;

    let result = state
        .checkout
        .handle(CreateCheckoutCommand { user_id, package })
        .await
        .map_err(BillingApiError)?;

    let body = CheckoutResponse::from_subscription(&result.subscription, result.gross_amount);
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// API error wrapper mapping DomainError to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(pub DomainError);

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0.code {
            ErrorCode::PackageNotFound => (StatusCode::NOT_FOUND, "PACKAGE_NOT_FOUND"),
            ErrorCode::SubscriptionNotFound => (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND"),
            ErrorCode::DuplicateOrder => (StatusCode::CONFLICT, "DUPLICATE_ORDER"),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse::new(code, self.0.message);
        (status, Json(body)).into_response()
    }
}
