//! services/web/src/web/access_log.rs
//!
//! Per-request access logging. Development writes to the console through
//! `tracing`; production appends to `access.log` in the configured log
//! directory.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::{info, warn};

use crate::web::{middleware::client_address, state::AppState};

pub const ACCESS_LOG_FILE: &str = "access.log";

/// Where access lines go.
#[derive(Clone)]
pub enum AccessLog {
    Console,
    File(Arc<AccessLogFile>),
}

pub struct AccessLogFile {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl AccessLogFile {
    /// Opens (creating when needed) `<dir>/access.log` for appending.
    pub async fn open(dir: &Path) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(ACCESS_LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await
    }
}

/// One finished request, as recorded in the access log.
#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub client: String,
    pub method: String,
    pub url: String,
    pub status: StatusCode,
    pub elapsed_ms: f64,
    pub content_length: Option<String>,
}

impl AccessEntry {
    /// `<client> <method> <url> <status> <ms> ms - <content-length>`
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {:.3} ms - {}",
            self.client,
            self.method,
            self.url,
            self.status.as_u16(),
            self.elapsed_ms,
            self.content_length.as_deref().unwrap_or("-")
        )
    }
}

/// Pipeline stage: records every request once its response is ready.
pub async fn log_access(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let client = client_address(&req);
    let method = req.method().to_string();
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let entry = AccessEntry {
        client,
        method,
        url,
        status: response.status(),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        content_length: response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    match &state.access_log {
        AccessLog::Console => info!(
            target: "access",
            "{} {} {} {} - {:.3} ms",
            entry.method,
            entry.url,
            entry.status.as_u16(),
            entry.content_length.as_deref().unwrap_or("-"),
            entry.elapsed_ms
        ),
        AccessLog::File(file) => {
            if let Err(e) = file.append(&entry.to_line()).await {
                warn!("Failed to write access log {}: {}", file.path().display(), e);
            }
        }
    }
    response
}
