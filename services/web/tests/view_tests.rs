//! Page controllers and the authentication gate, exercised through the full router.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use common::{body_text, test_app, tour, SESSION_TOKEN};
use tour_booking_core::domain::{Difficulty, Guide, ReviewAuthor, Role};
use uuid::Uuid;
use web_lib::adapters::memory::StoredReview;

// =========================================================
// Overview and Destinations
// =========================================================

#[tokio::test]
async fn overview_lists_every_tour_and_is_repeatable() {
    let app = test_app();

    let first = app.get("/").await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_text(first).await;
    assert!(first.contains("<title>Natours | All Tours</title>"));
    for name in ["The Forest Hiker", "The Sea Explorer", "The Snow Adventurer", "The City Wanderer"] {
        assert!(first.contains(name), "missing {}", name);
    }

    let second = body_text(app.get("/").await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn destinations_group_tours_by_difficulty() {
    let app = test_app();
    let response = app.get("/destinations").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Featured Destinations"));
    let mountain = html.find("Mountain Adventures").unwrap();
    let coastal = html.find("Coastal Escapes").unwrap();
    let cultural = html.find("Cultural Journeys").unwrap();
    assert!(mountain < coastal && coastal < cultural);
}

#[tokio::test]
async fn a_failing_difficulty_read_fails_destinations() {
    let app = test_app();
    app.db.fail_difficulty_reads();

    let response = app.get("/destinations").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_text(response).await;
    assert!(!html.contains("Mountain Adventures"));
    assert!(html.contains("Uh oh! Something went wrong!"));
}

// =========================================================
// Stories
// =========================================================

#[tokio::test]
async fn stories_skip_tours_without_a_usable_review() {
    let app = test_app();
    let silent = tour("The Wine Taster", Difficulty::Easy, 4.4);
    let silent_id = silent.id;
    app.db.add_tour(silent);
    app.db.add_review(StoredReview {
        id: Uuid::new_v4(),
        tour_id: silent_id,
        review: "   ".to_string(),
        rating: 4.0,
        created_at: Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        author: Some(ReviewAuthor {
            name: "Max Smith".to_string(),
            photo: "user-8.jpg".to_string(),
        }),
    });

    let response = app.get("/stories").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Travel Stories"));
    assert!(html.contains("Unforgettable trails and a great guide."));
    assert!(!html.contains("Max Smith"));
}

// =========================================================
// Tour Detail
// =========================================================

#[tokio::test]
async fn a_known_slug_renders_the_tour() {
    let app = test_app();
    let response = app.get("/tour/the-forest-hiker").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<title>Natours | The Forest Hiker Tour</title>"));
    assert!(html.contains("Unforgettable trails and a great guide."));
}

#[tokio::test]
async fn the_tour_page_lists_its_guides() {
    let app = test_app();
    let park = tour("The Park Camper", Difficulty::Medium, 4.9);
    app.db.add_guide(
        park.id,
        Guide {
            id: Uuid::new_v4(),
            name: "Steven Miller".to_string(),
            photo: "user-4.jpg".to_string(),
            role: Role::LeadGuide,
        },
    );
    app.db.add_tour(park);

    let html = body_text(app.get("/tour/the-park-camper").await).await;
    assert!(html.contains("Steven Miller"));
    assert!(html.contains("Lead guide"));
}

#[tokio::test]
async fn an_unknown_slug_is_not_found() {
    let app = test_app();
    let response = app.get("/tour/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("There is no tour with that name."));
}

// =========================================================
// Authentication Gate and Account
// =========================================================

#[tokio::test]
async fn my_tours_requires_a_session() {
    let app = test_app();
    let response = app.get("/my-tours").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response)
        .await
        .contains("You are not logged in! Please log in to get access."));

    let response = app
        .send(
            Request::get("/my-tours")
                .header(header::COOKIE, "session=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn my_tours_with_no_bookings_is_an_empty_list() {
    let app = test_app();
    let reads_before = app.db.read_count();
    let response = app.get_as_user("/my-tours").await;
    assert_eq!(response.status(), StatusCode::OK);
    // The user lookup and the bookings read; no card read for an empty list.
    assert_eq!(app.db.read_count() - reads_before, 2);
    let html = body_text(response).await;
    assert!(html.contains("<title>Natours | My Tours</title>"));
    assert!(html.contains("No tours to show yet."));
    assert!(!html.contains("The Forest Hiker"));
}

#[tokio::test]
async fn my_tours_lists_only_booked_tours() {
    let app = test_app();
    let sea = tour("The Northern Lights", Difficulty::Medium, 4.9);
    app.db.add_booking(app.user.id, sea.id);
    app.db.add_tour(sea);

    let html = body_text(app.get_as_user("/my-tours").await).await;
    assert!(html.contains("The Northern Lights"));
    assert!(!html.contains("The Sea Explorer"));
}

#[tokio::test]
async fn a_bearer_token_also_opens_a_session() {
    let app = test_app();
    let response = app
        .send(
            Request::get("/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", SESSION_TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("laura@example.com"));
}

fn profile_update(body: &str) -> Request<Body> {
    Request::post("/submit-user-data")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, format!("session={}", SESSION_TOKEN))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn account_updates_write_name_and_email() {
    let app = test_app();
    let response = app
        .send(profile_update("name=Laura+W.&email=Laura.W%40Example.com&role=admin"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.db.user(app.user.id).unwrap();
    assert_eq!(stored.name, "Laura W.");
    assert_eq!(stored.email, "laura.w@example.com");
    assert_eq!(stored.role, app.user.role);
}

#[tokio::test]
async fn account_updates_also_accept_json() {
    let app = test_app();
    let response = app
        .send(
            Request::post("/submit-user-data")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, format!("session={}", SESSION_TOKEN))
                .body(Body::from(r#"{"name":"Laura W","email":"lw@example.com","role":"admin"}"#))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.db.user(app.user.id).unwrap();
    assert_eq!(stored.name, "Laura W");
    assert_eq!(stored.email, "lw@example.com");
    assert_eq!(stored.role, app.user.role);
}

#[tokio::test]
async fn account_updates_need_a_form_or_json_body() {
    let app = test_app();
    let response = app
        .send(
            Request::post("/submit-user-data")
                .header(header::CONTENT_TYPE, "text/plain")
                .header(header::COOKIE, format!("session={}", SESSION_TOKEN))
                .body(Body::from("name=Laura"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.db.user(app.user.id).unwrap(), app.user);
}

#[tokio::test]
async fn invalid_account_updates_change_nothing() {
    let app = test_app();
    let response = app.send(profile_update("name=&email=not-an-email")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("Please tell us your name!"));
    assert!(html.contains("Please provide a valid email"));
    assert_eq!(app.db.user(app.user.id).unwrap(), app.user);
}

// =========================================================
// Alerts and Informational Pages
// =========================================================

#[tokio::test]
async fn the_booking_alert_is_attached_from_the_query() {
    let app = test_app();
    let html = body_text(app.get("/?alert=booking").await).await;
    assert!(html.contains("Your booking was successful!"));

    let html = body_text(app.get("/?alert=other").await).await;
    assert!(!html.contains("data-alert"));
}

#[tokio::test]
async fn informational_pages_render_their_titles() {
    let app = test_app();
    for (path, title) in [
        ("/about", "About Us"),
        ("/careers", "Careers"),
        ("/contact", "Contact Us"),
        ("/download-apps", "Download Apps"),
        ("/become-guide", "Become a Guide"),
        ("/signup", "Sign up your account"),
        ("/login", "Log into your account"),
        ("/book", "Book your first tour"),
    ] {
        let response = app.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        let expected = format!("<title>Natours | {}</title>", title);
        assert!(body_text(response).await.contains(&expected), "{}", path);
    }
}
