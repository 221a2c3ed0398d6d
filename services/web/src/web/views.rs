//! services/web/src/web/views.rs
//!
//! Page controllers. Each one fetches projections through the database port,
//! shapes them with `tour_booking_core::pages` and renders a template. Errors
//! are returned, never rendered here; the terminal handler owns that.

use axum::{
    extract::{rejection::PathRejection, FromRequest, OriginalUri, Path, Request, State},
    response::Html,
    routing::{get, MethodRouter},
    Form, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tour_booking_core::domain::{ProfileUpdate, TourCard, TourDetail, TourQuery, User};
use tour_booking_core::pages::{
    destinations_page, stories_page, DestinationsPage, StoriesPage, StoryDefaults,
    FEATURED_MIN_RATING, FEATURED_TOUR_LIMIT, STORY_MIN_RATINGS, STORY_TOUR_LIMIT,
};
use tracing::info;

use crate::web::{
    error::AppError,
    middleware::Viewer,
    sanitize::{body_kind, clean_text, BodyKind},
    state::{AppState, CurrentUser},
};

//=========================================================================================
// Page Context
//=========================================================================================

/// Everything a page template receives: the shared chrome (title, user,
/// alert) plus the page's own data flattened alongside it.
#[derive(Serialize)]
struct Page<'a, T: Serialize> {
    title: &'a str,
    user: Option<&'a User>,
    alert: Option<&'a str>,
    #[serde(flatten)]
    data: T,
}

impl<'a, T: Serialize> Page<'a, T> {
    fn new(title: &'a str, viewer: &'a Viewer, data: T) -> Self {
        Self {
            title,
            user: viewer.user.as_ref(),
            alert: viewer.alert.as_deref(),
            data,
        }
    }
}

#[derive(Serialize)]
struct ToursData {
    tours: Vec<TourCard>,
}

#[derive(Serialize)]
struct TourData {
    tour: TourDetail,
}

#[derive(Serialize)]
struct InfoData<'a> {
    page: &'a str,
}

#[derive(Serialize)]
struct NoData {}

//=========================================================================================
// Tour Pages
//=========================================================================================

/// `GET /`: every tour as a card.
pub async fn overview(State(state): State<Arc<AppState>>, viewer: Viewer) -> Result<Html<String>, AppError> {
    let tours = state.db.list_tour_cards(&TourQuery::all()).await?;
    state
        .renderer
        .render("overview.html", Page::new("All Tours", &viewer, ToursData { tours }))
}

/// `GET /destinations`: the top-rated cards and the difficulty of every tour
/// are read concurrently; either failing fails the page.
pub async fn destinations(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<Html<String>, AppError> {
    let featured_query = TourQuery::rated_at_least(FEATURED_MIN_RATING).with_limit(FEATURED_TOUR_LIMIT);
    let (featured, difficulties) = tokio::try_join!(
        state.db.list_tour_cards(&featured_query),
        state.db.list_tour_difficulties(),
    )?;

    let page: DestinationsPage = destinations_page(featured, &difficulties);
    state
        .renderer
        .render("destinations.html", Page::new("Featured Destinations", &viewer, page))
}

/// `GET /stories`
pub async fn stories(State(state): State<Arc<AppState>>, viewer: Viewer) -> Result<Html<String>, AppError> {
    let sources = state
        .db
        .list_story_sources(STORY_MIN_RATINGS, STORY_TOUR_LIMIT)
        .await?;
    let page: StoriesPage = stories_page(sources, &StoryDefaults::at(Utc::now()));
    state
        .renderer
        .render("stories.html", Page::new("Travel Stories", &viewer, page))
}

/// `GET /tour/{slug}`
pub async fn tour(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    slug: Result<Path<String>, PathRejection>,
) -> Result<Html<String>, AppError> {
    let Path(slug) = slug.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let slug = clean_text(&slug);

    let tour = state
        .db
        .find_tour_detail(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no tour with that name.".to_string()))?;

    let title = format!("{} Tour", tour.tour.name);
    state
        .renderer
        .render("tour.html", Page::new(&title, &viewer, TourData { tour }))
}

/// `GET /my-tours`: bookings first, then the cards they point at.
pub async fn my_tours(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    viewer: Viewer,
) -> Result<Html<String>, AppError> {
    let tour_ids = state.db.list_booked_tour_ids(user.id).await?;
    let tours = if tour_ids.is_empty() {
        Vec::new()
    } else {
        state.db.list_tour_cards_by_ids(&tour_ids).await?
    };
    state
        .renderer
        .render("overview.html", Page::new("My Tours", &viewer, ToursData { tours }))
}

//=========================================================================================
// Account
//=========================================================================================

/// `GET /me`
pub async fn account(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    viewer: Viewer,
) -> Result<Html<String>, AppError> {
    state
        .renderer
        .render("account.html", Page::new("Your account", &viewer, NoData {}))
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

/// The profile fields from either a JSON or a URL-encoded body.
pub struct ProfileInput(pub ProfileForm);

impl<S: Send + Sync> FromRequest<S> for ProfileInput {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if body_kind(req.headers()) == Some(BodyKind::Json) {
            let Json(form) = Json::<ProfileForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self(form))
        } else {
            let Form(form) = Form::<ProfileForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self(form))
        }
    }
}

/// `POST /submit-user-data`: writes exactly the name and email from a JSON or
/// URL-encoded body, then shows the account page with the stored values.
pub async fn update_user_data(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    viewer: Viewer,
    ProfileInput(form): ProfileInput,
) -> Result<Html<String>, AppError> {
    let update = ProfileUpdate::new(&form.name, &form.email);

    let problems = update.validate();
    if !problems.is_empty() {
        return Err(AppError::Validation(problems));
    }

    let updated = state.db.update_user_profile(user.id, &update).await?;
    info!(user_id = %updated.id, "Updated account details");

    let viewer = Viewer {
        user: Some(updated),
        alert: viewer.alert,
    };
    state
        .renderer
        .render("account.html", Page::new("Your account", &viewer, NoData {}))
}

//=========================================================================================
// Informational Pages
//=========================================================================================

/// A GET route that renders `info.html` with a fixed title.
pub fn info_page(title: &'static str, page: &'static str) -> MethodRouter<Arc<AppState>> {
    get(move |State(state): State<Arc<AppState>>, viewer: Viewer| async move {
        state
            .renderer
            .render("info.html", Page::new(title, &viewer, InfoData { page }))
    })
}

/// Fallback for anything the route table does not know.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    AppError::NotFound(format!("Can't find {} on this server!", target))
}
