//! services/web/src/web/sanitize.rs
//!
//! Body buffering, input sanitisation and the parameter-pollution guard.
//!
//! These stages rewrite the request in place (query string and body) so the
//! handlers' extractors only ever see cleaned input.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, uri::PathAndQuery, HeaderMap, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::form_urlencoded;

use crate::web::error::AppError;

/// Largest JSON or URL-encoded body accepted, in bytes.
pub const BODY_LIMIT: usize = 10 * 1024;

/// Query keys that may legitimately repeat (e.g. `?difficulty=easy&difficulty=medium`).
pub const REPEATABLE_QUERY_KEYS: [&str; 6] = [
    "duration",
    "ratingsAverage",
    "ratingsQuantity",
    "maxGroupSize",
    "difficulty",
    "price",
];

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script block pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyKind {
    Json,
    Form,
}

pub(crate) fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if mime == "application/json" || mime.ends_with("+json") {
        Some(BodyKind::Json)
    } else if mime == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else {
        None
    }
}

//=========================================================================================
// Cleaning Rules
//=========================================================================================

/// Keys that would be read as query operators by a document store, either
/// directly (`$gt`, `a.b`) or through bracket nesting (`price[$gt]`).
fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.') || key.contains("[$")
}

/// Removes `<script>` blocks and escapes any remaining markup.
pub fn clean_text(value: &str) -> String {
    SCRIPT_BLOCK
        .replace_all(value, "")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Cleans every key and string inside a JSON document.
pub fn clean_json(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_json).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(key, _)| !is_operator_key(key))
                .map(|(key, v)| (clean_text(&key), clean_json(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Cleans URL-encoded pairs. Returns `None` when nothing needed changing.
pub fn clean_urlencoded(encoded: &str) -> Option<String> {
    let mut changed = false;
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(encoded.as_bytes()) {
        if is_operator_key(&key) {
            changed = true;
            continue;
        }
        let clean_key = clean_text(&key);
        let clean_value = clean_text(&value);
        changed |= clean_key != key || clean_value != value;
        serializer.append_pair(&clean_key, &clean_value);
    }
    changed.then(|| serializer.finish())
}

/// Collapses repeated query keys to their last value, except for
/// `REPEATABLE_QUERY_KEYS`. Returns `None` when no key was collapsed.
pub fn collapse_repeated_keys(query: &str) -> Option<String> {
    let mut order: Vec<String> = Vec::new();
    let mut values: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let key = key.into_owned();
        if !values.contains_key(&key) {
            order.push(key.clone());
        }
        values.entry(key).or_default().push(value.into_owned());
    }

    let polluted = values
        .iter()
        .any(|(key, vals)| vals.len() > 1 && !REPEATABLE_QUERY_KEYS.contains(&key.as_str()));
    if !polluted {
        return None;
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for key in &order {
        let Some(vals) = values.get(key) else { continue };
        if REPEATABLE_QUERY_KEYS.contains(&key.as_str()) {
            for value in vals {
                serializer.append_pair(key, value);
            }
        } else if let Some(last) = vals.last() {
            serializer.append_pair(key, last);
        }
    }
    Some(serializer.finish())
}

fn replace_query(uri: &Uri, query: &str) -> Result<Uri, AppError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse::<PathAndQuery>()
            .map_err(|e| AppError::BadRequest(format!("Invalid query string: {}", e)))?,
    );
    Uri::from_parts(parts).map_err(|e| AppError::BadRequest(format!("Invalid request URI: {}", e)))
}

//=========================================================================================
// Pipeline Stages
//=========================================================================================

/// Buffers JSON and URL-encoded bodies up to `BODY_LIMIT` and rejects
/// anything larger or any malformed JSON. Other bodies stream through.
pub async fn read_body(req: Request, next: Next) -> Result<Response, AppError> {
    let Some(kind) = body_kind(req.headers()) else {
        return Ok(next.run(req).await);
    };

    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > BODY_LIMIT) {
        return Err(AppError::PayloadTooLarge { limit: BODY_LIMIT });
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|_| AppError::PayloadTooLarge { limit: BODY_LIMIT })?;

    if kind == BodyKind::Json && !bytes.is_empty() {
        serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Strips operator keys and script payloads from the query string and body.
pub async fn sanitize_input(req: Request, next: Next) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    if let Some(query) = parts.uri.query() {
        if let Some(cleaned) = clean_urlencoded(query) {
            parts.uri = replace_query(&parts.uri, &cleaned)?;
        }
    }

    let body = match body_kind(&parts.headers) {
        None => body,
        Some(kind) => {
            let bytes = to_bytes(body, BODY_LIMIT)
                .await
                .map_err(|_| AppError::PayloadTooLarge { limit: BODY_LIMIT })?;
            let cleaned = match kind {
                BodyKind::Json if bytes.is_empty() => None,
                BodyKind::Json => {
                    let value: Value = serde_json::from_slice(&bytes)
                        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
                    let cleaned = clean_json(value.clone());
                    if cleaned == value {
                        None
                    } else {
                        Some(
                            serde_json::to_vec(&cleaned)
                                .map_err(|e| AppError::Internal(e.to_string()))?,
                        )
                    }
                }
                BodyKind::Form => {
                    let text = String::from_utf8_lossy(&bytes);
                    clean_urlencoded(&text).map(String::into_bytes)
                }
            };
            match cleaned {
                Some(rewritten) => {
                    parts
                        .headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
                    Body::from(rewritten)
                }
                None => Body::from(bytes),
            }
        }
    };

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Collapses repeated query keys, see `collapse_repeated_keys`.
pub async fn prevent_parameter_pollution(mut req: Request, next: Next) -> Result<Response, AppError> {
    if let Some(collapsed) = req.uri().query().and_then(collapse_repeated_keys) {
        let uri = replace_query(req.uri(), &collapsed)?;
        *req.uri_mut() = uri;
    }
    Ok(next.run(req).await)
}
