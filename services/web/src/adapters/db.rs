//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every read selects only the columns its projection needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tour_booking_core::domain::{
    AuthorSnapshot, Difficulty, Guide, ProfileUpdate, ReviewAuthor, ReviewSnapshot, Role,
    StorySource, TourCard, TourDetail, TourQuery, TourReview, User,
};
use tour_booking_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens one connection to prove the database is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn to_count(value: i32, column: &str) -> PortResult<u32> {
    u32::try_from(value).map_err(|_| PortError::Unexpected(format!("negative {}: {}", column, value)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const TOUR_CARD_COLUMNS: &str = "id, name, slug, price, ratings_average, ratings_quantity, \
     difficulty, duration, summary, image_cover, start_location, max_group_size";

#[derive(FromRow)]
struct TourCardRecord {
    id: Uuid,
    name: String,
    slug: String,
    price: f64,
    ratings_average: f64,
    ratings_quantity: i32,
    difficulty: String,
    duration: i32,
    summary: String,
    image_cover: String,
    start_location: Option<String>,
    max_group_size: i32,
}
impl TourCardRecord {
    fn try_into_domain(self) -> PortResult<TourCard> {
        Ok(TourCard {
            id: self.id,
            name: self.name,
            slug: self.slug,
            price: self.price,
            ratings_average: self.ratings_average,
            ratings_quantity: to_count(self.ratings_quantity, "ratings_quantity")?,
            difficulty: self
                .difficulty
                .parse::<Difficulty>()
                .map_err(PortError::Unexpected)?,
            duration: to_count(self.duration, "duration")?,
            summary: self.summary,
            image_cover: self.image_cover,
            start_location: self.start_location,
            max_group_size: to_count(self.max_group_size, "max_group_size")?,
        })
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    photo: String,
    role: String,
}
impl UserRecord {
    fn try_into_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            photo: self.photo,
            role: self.role.parse::<Role>().map_err(PortError::Unexpected)?,
        })
    }
}

#[derive(FromRow)]
struct ReviewRecord {
    id: Uuid,
    review: String,
    rating: f64,
    created_at: DateTime<Utc>,
    author_name: String,
    author_photo: String,
}
impl ReviewRecord {
    fn to_domain(self) -> TourReview {
        TourReview {
            id: self.id,
            review: self.review,
            rating: self.rating,
            created_at: self.created_at,
            author: ReviewAuthor {
                name: self.author_name,
                photo: self.author_photo,
            },
        }
    }
}

#[derive(FromRow)]
struct GuideRecord {
    id: Uuid,
    name: String,
    photo: String,
    role: String,
}
impl GuideRecord {
    fn try_into_domain(self) -> PortResult<Guide> {
        Ok(Guide {
            id: self.id,
            name: self.name,
            photo: self.photo,
            role: self.role.parse::<Role>().map_err(PortError::Unexpected)?,
        })
    }
}

/// A tour joined with its latest review (if any) and that review's author
/// (if still present).
#[derive(FromRow)]
struct StorySourceRecord {
    tour_id: Uuid,
    tour_name: String,
    tour_image: String,
    tour_slug: String,
    duration: Option<i32>,
    location: Option<String>,
    review_id: Option<Uuid>,
    review: Option<String>,
    rating: Option<f64>,
    review_created_at: Option<DateTime<Utc>>,
    author_id: Option<Uuid>,
    author_name: Option<String>,
    author_photo: Option<String>,
}
impl StorySourceRecord {
    fn to_domain(self) -> StorySource {
        let author = self.author_id.map(|_| AuthorSnapshot {
            name: self.author_name,
            photo: self.author_photo,
        });
        let latest_review = self.review_id.map(|_| ReviewSnapshot {
            review: self.review,
            rating: self.rating,
            created_at: self.review_created_at,
            author,
        });
        StorySource {
            tour_id: self.tour_id,
            tour_name: self.tour_name,
            tour_image: self.tour_image,
            tour_slug: self.tour_slug,
            duration: self.duration.and_then(|d| u32::try_from(d).ok()),
            location: self.location,
            latest_review,
        }
    }
}

fn collect_cards(records: Vec<TourCardRecord>) -> PortResult<Vec<TourCard>> {
    records.into_iter().map(TourCardRecord::try_into_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn list_tour_cards(&self, query: &TourQuery) -> PortResult<Vec<TourCard>> {
        let difficulties: Vec<String> = query
            .difficulties
            .iter()
            .map(|d| d.as_str().to_string())
            .collect();
        let limit = query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let sql = format!(
            "SELECT {} FROM tours \
             WHERE ($1::float8 IS NULL OR ratings_average >= $1) \
               AND (cardinality($2::text[]) = 0 OR difficulty = ANY($2)) \
             ORDER BY created_at ASC, id ASC \
             LIMIT $3",
            TOUR_CARD_COLUMNS
        );
        let records = sqlx::query_as::<_, TourCardRecord>(&sql)
            .bind(query.min_rating)
            .bind(difficulties)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        collect_cards(records)
    }

    async fn list_tour_difficulties(&self) -> PortResult<Vec<Difficulty>> {
        let rows = sqlx::query_scalar::<_, String>("SELECT difficulty FROM tours")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        rows.iter()
            .map(|d| d.parse::<Difficulty>().map_err(PortError::Unexpected))
            .collect()
    }

    async fn list_story_sources(&self, min_ratings: u32, limit: usize) -> PortResult<Vec<StorySource>> {
        let records = sqlx::query_as::<_, StorySourceRecord>(
            "SELECT t.id AS tour_id, t.name AS tour_name, t.image_cover AS tour_image, \
                    t.slug AS tour_slug, t.duration, t.start_location AS location, \
                    r.id AS review_id, r.review, r.rating, r.created_at AS review_created_at, \
                    u.id AS author_id, u.name AS author_name, u.photo AS author_photo \
             FROM tours t \
             LEFT JOIN LATERAL ( \
                 SELECT id, review, rating, created_at, user_id FROM reviews \
                 WHERE tour_id = t.id ORDER BY created_at DESC LIMIT 1 \
             ) r ON TRUE \
             LEFT JOIN users u ON u.id = r.user_id \
             WHERE t.ratings_quantity >= $1 \
             ORDER BY t.created_at ASC, t.id ASC \
             LIMIT $2",
        )
        .bind(i64::from(min_ratings))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_tour_detail(&self, slug: &str) -> PortResult<Option<TourDetail>> {
        let sql = format!("SELECT {} FROM tours WHERE slug = $1", TOUR_CARD_COLUMNS);
        let Some(record) = sqlx::query_as::<_, TourCardRecord>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
        else {
            return Ok(None);
        };
        let tour = record.try_into_domain()?;

        let reviews = sqlx::query_as::<_, ReviewRecord>(
            "SELECT r.id, r.review, r.rating, r.created_at, \
                    u.name AS author_name, u.photo AS author_photo \
             FROM reviews r JOIN users u ON u.id = r.user_id \
             WHERE r.tour_id = $1 ORDER BY r.created_at ASC",
        )
        .bind(tour.id)
        .fetch_all(&self.pool);

        let guides = sqlx::query_as::<_, GuideRecord>(
            "SELECT u.id, u.name, u.photo, u.role \
             FROM tour_guides g JOIN users u ON u.id = g.user_id \
             WHERE g.tour_id = $1 ORDER BY g.position ASC",
        )
        .bind(tour.id)
        .fetch_all(&self.pool);

        let (reviews, guides) = tokio::try_join!(reviews, guides).map_err(unexpected)?;

        Ok(Some(TourDetail {
            tour,
            reviews: reviews.into_iter().map(|r| r.to_domain()).collect(),
            guides: guides
                .into_iter()
                .map(GuideRecord::try_into_domain)
                .collect::<PortResult<Vec<_>>>()?,
        }))
    }

    async fn list_tour_cards_by_ids(&self, tour_ids: &[Uuid]) -> PortResult<Vec<TourCard>> {
        let sql = format!(
            "SELECT {} FROM tours WHERE id = ANY($1) ORDER BY created_at ASC, id ASC",
            TOUR_CARD_COLUMNS
        );
        let records = sqlx::query_as::<_, TourCardRecord>(&sql)
            .bind(tour_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        collect_cards(records)
    }

    async fn list_booked_tour_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT tour_id FROM bookings WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>("SELECT id, name, email, photo, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?
            .try_into_domain()
    }

    async fn update_user_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<User> {
        let problems = update.validate();
        if !problems.is_empty() {
            return Err(PortError::Validation(problems));
        }

        sqlx::query_as::<_, UserRecord>(
            "UPDATE users SET name = $1, email = $2 WHERE id = $3 \
             RETURNING id, name, email, photo, role",
        )
        .bind(&update.name)
        .bind(&update.email)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Duplicate(update.email.clone())
            }
            other => unexpected(other),
        })?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?
        .try_into_domain()
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }
}
