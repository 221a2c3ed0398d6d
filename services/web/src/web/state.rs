//! services/web/src/web/state.rs
//!
//! Defines the application's shared state and the per-request values that
//! pipeline stages attach for later stages and handlers.

use crate::config::Config;
use crate::web::{access_log::AccessLog, rate_limit::RateLimiter, render::Renderer};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tour_booking_core::domain::User;
use tour_booking_core::ports::{DatabaseService, PaymentWebhookService};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub webhook: Arc<dyn PaymentWebhookService>,
    pub config: Arc<Config>,
    pub renderer: Arc<Renderer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub access_log: AccessLog,
}

//=========================================================================================
// Request Extensions
//=========================================================================================

/// Cookies sent with the request, by name.
#[derive(Debug, Clone, Default)]
pub struct Cookies(pub HashMap<String, String>);

impl Cookies {
    pub fn parse(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().trim_matches('"').to_string()))
            })
            .collect();
        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// The logged-in user, attached by the auth gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// One-time status message shown on the next rendered page.
#[derive(Debug, Clone)]
pub struct Alert(pub String);

/// When the request entered the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RequestTime(pub DateTime<Utc>);
