//! Shared fixtures for the router-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tour_booking_core::domain::{Difficulty, ReviewAuthor, Role, TourCard, User};
use tour_booking_core::ports::{PaymentWebhookService, PortError, PortResult};
use tower::ServiceExt;
use uuid::Uuid;
use web_lib::{
    adapters::{memory::StoredReview, MemoryDb},
    config::{Config, Environment},
    web::{
        access_log::AccessLog,
        build_app,
        rate_limit::{RateLimiter, SystemClock, RATE_LIMIT_MAX, RATE_LIMIT_WINDOW},
        render::Renderer,
        AppState,
    },
};

pub const SESSION_TOKEN: &str = "a-valid-session-token";

/// Remembers every checkout event it is handed. With `reject` set, every
/// event fails signature verification.
#[derive(Default)]
pub struct RecordingWebhook {
    pub calls: Mutex<Vec<(Option<String>, Vec<u8>)>>,
    pub reject: AtomicBool,
}

#[async_trait]
impl PaymentWebhookService for RecordingWebhook {
    async fn handle_checkout_event(&self, signature: Option<&str>, payload: &[u8]) -> PortResult<()> {
        self.calls
            .lock()
            .push((signature.map(str::to_string), payload.to_vec()));
        if self.reject.load(Ordering::SeqCst) {
            return Err(PortError::Validation(vec![
                "No signatures found matching the expected signature for payload".to_string(),
            ]));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDb>,
    pub webhook: Arc<RecordingWebhook>,
    pub user: User,
    pub public_dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_as_user(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header("cookie", format!("session={}", SESSION_TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub fn config(environment: Environment, public_dir: &Path, log_dir: &Path) -> Config {
    Config {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "postgres://unused".to_string(),
        environment,
        log_filter: "info".to_string(),
        public_dir: public_dir.to_path_buf(),
        log_dir: log_dir.to_path_buf(),
    }
}

pub fn tour(name: &str, difficulty: Difficulty, rating: f64) -> TourCard {
    TourCard {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        price: 397.0,
        ratings_average: rating,
        ratings_quantity: 12,
        difficulty,
        duration: 7,
        summary: format!("Exploring the best of {}", name),
        image_cover: "tour-1-cover.jpg".to_string(),
        start_location: Some("Banff, CAN".to_string()),
        max_group_size: 15,
    }
}

/// A catalogue of four tours, one user with a live session and one review.
pub fn seeded_db() -> (Arc<MemoryDb>, User) {
    let db = Arc::new(MemoryDb::new());
    let forest = tour("The Forest Hiker", Difficulty::Easy, 4.7);
    let forest_id = forest.id;
    db.add_tour(forest);
    db.add_tour(tour("The Sea Explorer", Difficulty::Medium, 4.8));
    db.add_tour(tour("The Snow Adventurer", Difficulty::Difficult, 4.5));
    db.add_tour(tour("The City Wanderer", Difficulty::Easy, 4.1));

    let user = User {
        id: Uuid::new_v4(),
        name: "Laura Wilson".to_string(),
        email: "laura@example.com".to_string(),
        photo: "user-3.jpg".to_string(),
        role: Role::User,
    };
    db.add_user(user.clone());
    db.add_session(SESSION_TOKEN, user.id);

    db.add_review(StoredReview {
        id: Uuid::new_v4(),
        tour_id: forest_id,
        review: "Unforgettable trails and a great guide.".to_string(),
        rating: 5.0,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        author: Some(ReviewAuthor {
            name: user.name.clone(),
            photo: user.photo.clone(),
        }),
    });
    (db, user)
}

pub fn test_app_with(db: Arc<MemoryDb>, user: User, environment: Environment, access_log: AccessLog) -> TestApp {
    let public_dir = tempfile::tempdir().unwrap();
    let webhook = Arc::new(RecordingWebhook::default());
    let state = Arc::new(AppState {
        db: db.clone(),
        webhook: webhook.clone(),
        config: Arc::new(config(environment, public_dir.path(), public_dir.path())),
        renderer: Arc::new(Renderer::new().unwrap()),
        rate_limiter: Arc::new(RateLimiter::new(
            Arc::new(SystemClock),
            RATE_LIMIT_WINDOW,
            RATE_LIMIT_MAX,
        )),
        access_log,
    });
    TestApp {
        router: build_app(state).unwrap(),
        db,
        webhook,
        user,
        public_dir,
    }
}

pub fn test_app() -> TestApp {
    let (db, user) = seeded_db();
    test_app_with(db, user, Environment::Development, AccessLog::Console)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
