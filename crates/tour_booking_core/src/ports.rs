//! crates/tour_booking_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! payment processors.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Difficulty, ProfileUpdate, StorySource, TourCard, TourDetail, TourQuery, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// One message per rejected field.
    #[error("Invalid input data. {}", .0.join(". "))]
    Validation(Vec<String>),
    /// A unique value is already taken by another record.
    #[error("Duplicate field value: {0}. Please use another value!")]
    Duplicate(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Tour reads ---
    /// Tour cards matching `query`, in catalogue order.
    async fn list_tour_cards(&self, query: &TourQuery) -> PortResult<Vec<TourCard>>;

    /// The difficulty of every tour, and nothing else.
    async fn list_tour_difficulties(&self) -> PortResult<Vec<Difficulty>>;

    /// Up to `limit` tours with at least `min_ratings` ratings, each with its
    /// most recent review and that review's author expanded.
    async fn list_story_sources(&self, min_ratings: u32, limit: usize) -> PortResult<Vec<StorySource>>;

    async fn find_tour_detail(&self, slug: &str) -> PortResult<Option<TourDetail>>;

    async fn list_tour_cards_by_ids(&self, tour_ids: &[Uuid]) -> PortResult<Vec<TourCard>>;

    // --- Bookings ---
    async fn list_booked_tour_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    // --- Users and auth sessions ---
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Validates `update` and writes exactly the name and email fields.
    async fn update_user_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<User>;

    /// Resolves a live auth session token into the id of its user.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;
}

#[async_trait]
pub trait PaymentWebhookService: Send + Sync {
    /// Hands the untouched request body to the payment processor integration.
    async fn handle_checkout_event(&self, signature: Option<&str>, payload: &[u8]) -> PortResult<()>;
}
