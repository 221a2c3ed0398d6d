//! services/web/src/web/error.rs
//!
//! Request-level errors and the terminal error handler.
//!
//! Handlers and pipeline stages only ever return an `AppError`. Its response
//! carries an `ErrorReport` extension; `handle_errors` is the one place that
//! decides the final shape (JSON for `/api` and the payment webhook, a
//! rendered page otherwise).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tour_booking_core::ports::PortError;
use tracing::error;

use crate::web::{rate_limit::is_under_prefix, state::AppState, webhook::WEBHOOK_PATH};

/// Errors a request can end with.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    /// One message per rejected field.
    #[error("Invalid input data. {}", .0.join(". "))]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("You are not logged in! Please log in to get access.")]
    Unauthorized,

    #[error("Request body is larger than {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    TooManyRequests(String),

    /// Anything we did not anticipate. Never shown verbatim in production.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operational errors are expected outcomes whose message is safe to show.
    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => AppError::NotFound(msg),
            PortError::Validation(fields) => AppError::Validation(fields),
            duplicate @ PortError::Duplicate(_) => AppError::BadRequest(duplicate.to_string()),
            PortError::Unauthorized => AppError::Unauthorized,
            PortError::Unexpected(msg) => AppError::Internal(msg),
        }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {}", err))
    }
}

/// What went wrong, attached to the response for the terminal handler.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub operational: bool,
}

fn status_label(status: StatusCode) -> &'static str {
    if status.is_client_error() {
        "fail"
    } else {
        "error"
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = ErrorReport {
            status: self.status(),
            message: self.to_string(),
            operational: self.is_operational(),
        };
        let body = json!({
            "status": status_label(report.status),
            "message": report.message,
        });
        let mut response = (report.status, Json(body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

#[derive(Serialize)]
struct ErrorPage<'a> {
    title: &'a str,
    msg: &'a str,
}

/// The terminal error handler.
pub async fn handle_errors(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    // Machine clients (the API and the payment processor) always get JSON.
    let is_api = is_under_prefix(req.uri().path(), "/api") || req.uri().path() == WEBHOOK_PATH;
    let response = next.run(req).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if !report.operational {
        error!(status = %report.status, "Unexpected fault: {}", report.message);
    }
    let masked = state.config.is_production() && !report.operational;

    if is_api {
        if !masked {
            return response;
        }
        let body = json!({ "status": "error", "message": "Something went very wrong!" });
        return (report.status, Json(body)).into_response();
    }

    let msg = if masked {
        "Please try again later."
    } else {
        report.message.as_str()
    };
    let page = ErrorPage {
        title: "Something went wrong!",
        msg,
    };
    match state.renderer.render("error.html", &page) {
        Ok(html) => (report.status, html).into_response(),
        Err(render_err) => {
            error!("Failed to render the error page: {}", render_err);
            (report.status, msg.to_string()).into_response()
        }
    }
}
