//! services/web/src/web/middleware.rs
//!
//! Request annotators and the authentication gate, plus the extractors
//! handlers use to read what these stages attached.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tour_booking_core::domain::User;
use tracing::{debug, error};
use url::form_urlencoded;

use crate::web::{
    error::AppError,
    state::{Alert, AppState, Cookies, CurrentUser, RequestTime},
};

pub const SESSION_COOKIE: &str = "session";

const BOOKING_ALERT: &str = "Your booking was successful! Please check your email for confirmation. \
If your booking doesn't show here immediately, please come back later.";

//=========================================================================================
// Client Address
//=========================================================================================

/// The address the request originated from. The service runs behind a proxy,
/// so the first `X-Forwarded-For` hop wins over the socket peer.
pub fn client_address(req: &Request) -> String {
    forwarded_for(req.headers())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

//=========================================================================================
// Pipeline Stages
//=========================================================================================

/// Parses the `Cookie` header into a `Cookies` extension.
pub async fn parse_cookies(mut req: Request, next: Next) -> Response {
    let cookies = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .fold(Cookies::default(), |mut acc, raw| {
            acc.0.extend(Cookies::parse(raw).0);
            acc
        });
    req.extensions_mut().insert(cookies);
    next.run(req).await
}

/// Stamps the request with the moment it reached the handlers.
pub async fn stamp_request_time(mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(RequestTime(Utc::now()));
    next.run(req).await
}

/// Attaches a one-time message when the query carries a known `alert` flag.
pub async fn alerts(mut req: Request, next: Next) -> Response {
    let flag = req.uri().query().and_then(|q| {
        form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "alert")
            .map(|(_, value)| value.into_owned())
    });
    if flag.as_deref() == Some("booking") {
        req.extensions_mut().insert(Alert(BOOKING_ALERT.to_string()));
    }
    next.run(req).await
}

//=========================================================================================
// Authentication Gate
//=========================================================================================

fn session_token(req: &Request) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    req.extensions()
        .get::<Cookies>()
        .and_then(|cookies| cookies.get(SESSION_COOKIE))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

async fn resolve_user(state: &AppState, token: &str) -> Result<User, AppError> {
    let user_id = state.db.validate_auth_session(token).await?;
    Ok(state.db.get_user_by_id(user_id).await?)
}

/// Attaches the current user when a valid session is presented. Never rejects.
pub async fn optional_auth(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    if let Some(token) = session_token(&req) {
        match resolve_user(&state, &token).await {
            Ok(user) => {
                req.extensions_mut().insert(CurrentUser(user));
            }
            Err(e) => debug!("Ignoring invalid session: {}", e),
        }
    }
    next.run(req).await
}

/// Middleware that validates the session and attaches the current user.
///
/// If invalid or missing, the request ends with `AppError::Unauthorized`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Find the session token
    let token = session_token(&req).ok_or(AppError::Unauthorized)?;

    // 2. Validate it and load the user
    let user = resolve_user(&state, &token).await.map_err(|e| {
        error!("Failed to validate auth session: {}", e);
        AppError::Unauthorized
    })?;

    // 3. Insert the user into request extensions
    req.extensions_mut().insert(CurrentUser(user));

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

//=========================================================================================
// Extractors
//=========================================================================================

/// Who is looking at a page and what alert, if any, to show them.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
    pub alert: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            user: parts.extensions.get::<CurrentUser>().map(|u| u.0.clone()),
            alert: parts.extensions.get::<Alert>().map(|a| a.0.clone()),
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestTime {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestTime>()
            .copied()
            .unwrap_or_else(|| RequestTime(Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn forwarded_for_wins_over_the_socket_peer() {
        let mut req = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));
        assert_eq!(client_address(&req), "203.0.113.5");

        req.headers_mut().remove("x-forwarded-for");
        assert_eq!(client_address(&req), "10.0.0.1");
    }

    #[test]
    fn bearer_tokens_take_precedence_over_cookies() {
        let mut req = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(Cookies::parse("session=from-cookie"));
        assert_eq!(session_token(&req).as_deref(), Some("from-header"));

        req.headers_mut().remove(header::AUTHORIZATION);
        assert_eq!(session_token(&req).as_deref(), Some("from-cookie"));
    }
}
