//! services/web/src/adapters/memory.rs
//!
//! An in-memory `DatabaseService` for tests and local runs without Postgres.
//! Tours keep insertion order, which stands in for catalogue order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tour_booking_core::domain::{
    AuthorSnapshot, Difficulty, Guide, ProfileUpdate, ReviewAuthor, ReviewSnapshot, StorySource,
    TourCard, TourDetail, TourQuery, TourReview, User,
};
use tour_booking_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

/// A review as stored. The author may have been deleted since it was written.
#[derive(Debug, Clone)]
pub struct StoredReview {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub review: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub author: Option<ReviewAuthor>,
}

#[derive(Default)]
struct Store {
    tours: Vec<TourCard>,
    guides: HashMap<Uuid, Vec<Guide>>,
    reviews: Vec<StoredReview>,
    users: Vec<User>,
    sessions: HashMap<String, Uuid>,
    bookings: Vec<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryDb {
    store: Mutex<Store>,
    fail_difficulty_reads: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tour(&self, tour: TourCard) {
        self.store.lock().tours.push(tour);
    }

    pub fn add_guide(&self, tour_id: Uuid, guide: Guide) {
        self.store.lock().guides.entry(tour_id).or_default().push(guide);
    }

    pub fn add_review(&self, review: StoredReview) {
        self.store.lock().reviews.push(review);
    }

    pub fn add_user(&self, user: User) {
        self.store.lock().users.push(user);
    }

    pub fn add_session(&self, token: &str, user_id: Uuid) {
        self.store.lock().sessions.insert(token.to_string(), user_id);
    }

    pub fn add_booking(&self, user_id: Uuid, tour_id: Uuid) {
        self.store.lock().bookings.push((user_id, tour_id));
    }

    /// Makes every later `list_tour_difficulties` call fail.
    pub fn fail_difficulty_reads(&self) {
        self.fail_difficulty_reads.store(true, Ordering::SeqCst);
    }

    /// How many port reads have been served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.store.lock().users.iter().find(|u| u.id == user_id).cloned()
    }

    fn count_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

fn latest_review(reviews: &[StoredReview], tour_id: Uuid) -> Option<&StoredReview> {
    reviews
        .iter()
        .filter(|r| r.tour_id == tour_id)
        .max_by_key(|r| r.created_at)
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn list_tour_cards(&self, query: &TourQuery) -> PortResult<Vec<TourCard>> {
        self.count_read();
        let store = self.store.lock();
        let matching = store.tours.iter().filter(|t| query.matches(t)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn list_tour_difficulties(&self) -> PortResult<Vec<Difficulty>> {
        self.count_read();
        if self.fail_difficulty_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("difficulty read failed".to_string()));
        }
        Ok(self.store.lock().tours.iter().map(|t| t.difficulty).collect())
    }

    async fn list_story_sources(&self, min_ratings: u32, limit: usize) -> PortResult<Vec<StorySource>> {
        self.count_read();
        let store = self.store.lock();
        let sources = store
            .tours
            .iter()
            .filter(|t| t.ratings_quantity >= min_ratings)
            .take(limit)
            .map(|t| StorySource {
                tour_id: t.id,
                tour_name: t.name.clone(),
                tour_image: t.image_cover.clone(),
                tour_slug: t.slug.clone(),
                duration: Some(t.duration),
                location: t.start_location.clone(),
                latest_review: latest_review(&store.reviews, t.id).map(|r| ReviewSnapshot {
                    review: Some(r.review.clone()),
                    rating: Some(r.rating),
                    created_at: Some(r.created_at),
                    author: r.author.as_ref().map(|a| AuthorSnapshot {
                        name: Some(a.name.clone()),
                        photo: Some(a.photo.clone()),
                    }),
                }),
            })
            .collect();
        Ok(sources)
    }

    async fn find_tour_detail(&self, slug: &str) -> PortResult<Option<TourDetail>> {
        self.count_read();
        let store = self.store.lock();
        let Some(tour) = store.tours.iter().find(|t| t.slug == slug).cloned() else {
            return Ok(None);
        };
        let mut reviews: Vec<TourReview> = store
            .reviews
            .iter()
            .filter(|r| r.tour_id == tour.id)
            .filter_map(|r| {
                Some(TourReview {
                    id: r.id,
                    review: r.review.clone(),
                    rating: r.rating,
                    created_at: r.created_at,
                    author: r.author.clone()?,
                })
            })
            .collect();
        reviews.sort_by_key(|r| r.created_at);
        let guides = store.guides.get(&tour.id).cloned().unwrap_or_default();
        Ok(Some(TourDetail { tour, reviews, guides }))
    }

    async fn list_tour_cards_by_ids(&self, tour_ids: &[Uuid]) -> PortResult<Vec<TourCard>> {
        self.count_read();
        let store = self.store.lock();
        Ok(store
            .tours
            .iter()
            .filter(|t| tour_ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn list_booked_tour_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        self.count_read();
        let store = self.store.lock();
        Ok(store
            .bookings
            .iter()
            .filter(|(booker, _)| *booker == user_id)
            .map(|(_, tour_id)| *tour_id)
            .collect())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.count_read();
        self.user(user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_user_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<User> {
        let problems = update.validate();
        if !problems.is_empty() {
            return Err(PortError::Validation(problems));
        }

        let mut store = self.store.lock();
        if store
            .users
            .iter()
            .any(|u| u.id != user_id && u.email == update.email)
        {
            return Err(PortError::Duplicate(update.email.clone()));
        }
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.name = update.name.clone();
        user.email = update.email.clone();
        Ok(user.clone())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.store
            .lock()
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)
    }
}
