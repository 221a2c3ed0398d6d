//! services/web/src/web/static_files.rs
//!
//! Serves files from the public directory ahead of every other stage, with a
//! cache policy chosen by file extension.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::config::Environment;
use crate::web::state::AppState;

const REVALIDATE: &str = "public, max-age=0, must-revalidate";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const LONG_LIVED: &str = "public, max-age=31536000";
const NO_CACHE: &str = "public, max-age=0";

static FINGERPRINTED_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|ico|svg|webp|css|js)$").expect("asset pattern is valid")
});

/// The `Cache-Control` value for a served file.
pub fn cache_control_for(path: &Path, environment: Environment) -> &'static str {
    let name = path.to_string_lossy();
    if name.to_ascii_lowercase().ends_with(".html") {
        REVALIDATE
    } else if FINGERPRINTED_ASSET.is_match(&name) {
        IMMUTABLE
    } else if environment == Environment::Production {
        LONG_LIVED
    } else {
        NO_CACHE
    }
}

/// Maps a request path onto the public directory. Anything that could climb
/// out of it (`..`, absolute segments) or names a hidden file is refused.
pub fn resolve_public_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) if !segment.to_string_lossy().starts_with('.') => {
                resolved.push(segment)
            }
            _ => return None,
        }
    }
    Some(resolved)
}

/// Pipeline stage: answers with the file when the path names one.
pub async fn serve_static(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return next.run(req).await;
    }
    let Some(path) = resolve_public_path(&state.config.public_dir, req.uri().path()) else {
        return next.run(req).await;
    };
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return next.run(req).await;
    }

    let cache_control = cache_control_for(&path, state.config.environment);
    let mut response = match ServeFile::new(&path).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    }
    response
}
