//! services/web/src/web/pipeline.rs
//!
//! Assembles the application: the ordered request stages and the route table.
//!
//! `Router::layer` wraps whatever has been registered so far, so the stages
//! below are applied innermost first. Read `build_app` bottom-up to see the
//! order a request travels in.

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{get, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::{predicate::SizeAbove, CompressionLayer, DefaultPredicate, Predicate},
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    CompressionLevel,
};

use crate::error::ApiError;
use crate::web::{
    access_log::log_access,
    api,
    error::handle_errors,
    middleware::{alerts, optional_auth, parse_cookies, require_auth, stamp_request_time},
    rate_limit::limit_requests,
    sanitize::{prevent_parameter_pollution, read_body, sanitize_input},
    state::AppState,
    static_files::serve_static,
    views,
    webhook::{webhook_checkout, WEBHOOK_PATH},
};

/// Responses smaller than this are sent uncompressed.
const COMPRESSION_THRESHOLD: u16 = 1024;
const COMPRESSION_LEVEL: i32 = 6;
const NO_COMPRESSION_HEADER: HeaderName = HeaderName::from_static("x-no-compression");

//=========================================================================================
// Security Headers
//=========================================================================================

const CSP_DIRECTIVES: &[(&str, &[&str])] = &[
    ("default-src", &["'self'", "data:", "blob:", "https:", "ws:"]),
    ("base-uri", &["'self'"]),
    (
        "font-src",
        &["'self'", "https://fonts.googleapis.com", "https://fonts.gstatic.com"],
    ),
    ("script-src", &["'self'", "https:", "http:", "blob:", "https://unpkg.com"]),
    ("frame-src", &["'self'", "https://js.stripe.com"]),
    ("object-src", &["'none'"]),
    (
        "style-src",
        &[
            "'self'",
            "'unsafe-inline'",
            "https://fonts.googleapis.com",
            "https://unpkg.com",
        ],
    ),
    ("worker-src", &["'self'", "blob:", "https://m.stripe.network"]),
    ("child-src", &["'self'", "blob:"]),
    ("img-src", &["'self'", "blob:", "data:", "https:"]),
    ("form-action", &["'self'"]),
    (
        "connect-src",
        &["'self'", "https:", "http:", "ws:", "wss:", "data:", "blob:"],
    ),
    ("upgrade-insecure-requests", &[]),
];

/// The `Content-Security-Policy` value built from `CSP_DIRECTIVES`.
pub fn content_security_policy() -> String {
    CSP_DIRECTIVES
        .iter()
        .map(|(directive, sources)| {
            if sources.is_empty() {
                directive.to_string()
            } else {
                format!("{} {}", directive, sources.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

//=========================================================================================
// Route Table
//=========================================================================================

/// Whether a route needs a logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Attach the user when a valid session is present; never reject.
    Optional,
    /// Reject with 401 unless a valid session is present.
    Required,
}

type RouteTable = Vec<(&'static str, Access, MethodRouter<Arc<AppState>>)>;

fn view_routes() -> RouteTable {
    vec![
        ("/", Access::Optional, get(views::overview)),
        ("/destinations", Access::Optional, get(views::destinations)),
        ("/stories", Access::Optional, get(views::stories)),
        ("/tour/{slug}", Access::Optional, get(views::tour)),
        ("/about", Access::Optional, views::info_page("About Us", "about")),
        ("/careers", Access::Optional, views::info_page("Careers", "careers")),
        ("/contact", Access::Optional, views::info_page("Contact Us", "contact")),
        (
            "/download-apps",
            Access::Optional,
            views::info_page("Download Apps", "download-apps"),
        ),
        (
            "/become-guide",
            Access::Optional,
            views::info_page("Become a Guide", "become-guide"),
        ),
        ("/signup", Access::Optional, views::info_page("Sign up your account", "signup")),
        ("/login", Access::Optional, views::info_page("Log into your account", "login")),
        ("/book", Access::Optional, views::info_page("Book your first tour", "book")),
        ("/me", Access::Required, get(views::account)),
        ("/my-tours", Access::Required, get(views::my_tours)),
        ("/submit-user-data", Access::Required, post(views::update_user_data)),
    ]
}

fn mount(state: &Arc<AppState>, table: RouteTable) -> Router<Arc<AppState>> {
    table
        .into_iter()
        .fold(Router::new(), |router, (path, access, method_router)| {
            let gated = match access {
                Access::Optional => method_router.route_layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth,
                )),
                Access::Required => method_router.route_layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    require_auth,
                )),
            };
            router.route(path, gated)
        })
}

//=========================================================================================
// Stages Defined Here
//=========================================================================================

/// Lets a client opt out of compression by sending `x-no-compression`.
async fn honour_no_compression(mut req: Request, next: Next) -> Response {
    if req.headers().contains_key(&NO_COMPRESSION_HEADER) {
        req.headers_mut().remove(header::ACCEPT_ENCODING);
    }
    next.run(req).await
}

fn compression() -> CompressionLayer<impl Predicate> {
    CompressionLayer::new()
        .quality(CompressionLevel::Precise(COMPRESSION_LEVEL))
        .compress_when(DefaultPredicate::new().and(SizeAbove::new(COMPRESSION_THRESHOLD)))
}

//=========================================================================================
// Application
//=========================================================================================

/// Builds the full application router around `state`.
pub fn build_app(state: Arc<AppState>) -> Result<Router, ApiError> {
    let csp = HeaderValue::from_str(&content_security_policy())
        .map_err(|e| ApiError::Internal(format!("invalid Content-Security-Policy: {}", e)))?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pages = mount(&state, view_routes()).route_layer(axum_middleware::from_fn(alerts));

    let api_v1 = Router::new().route("/api/v1/tours", get(api::list_tours));

    // Unsupported methods on known paths are not-found too.
    let app = Router::new()
        .merge(pages)
        .merge(api_v1)
        .method_not_allowed_fallback(views::not_found)
        .fallback(views::not_found)
        // 12. request timestamp
        .layer(axum_middleware::from_fn(stamp_request_time))
        // 11. compression, with the opt-out header checked first
        .layer(compression())
        .layer(axum_middleware::from_fn(honour_no_compression))
        // 10. parameter-pollution guard
        .layer(axum_middleware::from_fn(prevent_parameter_pollution))
        // 9. input sanitisation
        .layer(axum_middleware::from_fn(sanitize_input))
        // 8. cookies
        .layer(axum_middleware::from_fn(parse_cookies))
        // 7. body parsing
        .layer(axum_middleware::from_fn(read_body))
        // 6. the webhook joins here so none of the stages above touch its body
        .route(
            WEBHOOK_PATH,
            post(webhook_checkout).fallback(views::not_found),
        )
        // terminal error handler, wrapping everything registered so far
        .layer(axum_middleware::from_fn_with_state(state.clone(), handle_errors))
        // 5. rate limiting
        .layer(axum_middleware::from_fn_with_state(state.clone(), limit_requests))
        // 4. access log
        .layer(axum_middleware::from_fn_with_state(state.clone(), log_access))
        // 3. security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp,
        ))
        // 2. static assets
        .layer(axum_middleware::from_fn_with_state(state.clone(), serve_static))
        // 1. CORS
        .layer(cors)
        .with_state(state);

    Ok(app)
}
