//! services/web/src/web/api.rs
//!
//! The JSON tour listing served under `/api/v1`.

use axum::{
    extract::State,
    http::Uri,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tour_booking_core::domain::{Difficulty, TourCard, TourQuery};
use url::form_urlencoded;

use crate::web::{
    error::AppError,
    state::{AppState, RequestTime},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToursResponse {
    status: &'static str,
    requested_at: String,
    results: usize,
    data: ToursPayload,
}

#[derive(Serialize)]
pub struct ToursPayload {
    tours: Vec<TourCard>,
}

/// Reads `difficulty` (repeatable, comma lists allowed) and `limit` from a
/// query string. Unknown keys are ignored.
pub fn parse_tour_query(query: Option<&str>) -> Result<TourQuery, AppError> {
    let mut difficulties = Vec::new();
    let mut limit = None;

    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "difficulty" => {
                for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let difficulty = part.parse::<Difficulty>().map_err(AppError::BadRequest)?;
                    if !difficulties.contains(&difficulty) {
                        difficulties.push(difficulty);
                    }
                }
            }
            "limit" => {
                let parsed = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid limit: {}", value)))?;
                limit = Some(parsed);
            }
            _ => {}
        }
    }

    let mut tour_query = TourQuery::all().with_difficulties(difficulties);
    if let Some(limit) = limit {
        tour_query = tour_query.with_limit(limit);
    }
    Ok(tour_query)
}

/// `GET /api/v1/tours`
pub async fn list_tours(
    State(state): State<Arc<AppState>>,
    RequestTime(requested_at): RequestTime,
    uri: Uri,
) -> Result<Json<ToursResponse>, AppError> {
    let query = parse_tour_query(uri.query())?;
    let tours = state.db.list_tour_cards(&query).await?;

    Ok(Json(ToursResponse {
        status: "success",
        requested_at: requested_at.to_rfc3339(),
        results: tours.len(),
        data: ToursPayload { tours },
    }))
}
