//! crates/tour_booking_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database engine. Reads hand back
//! projections (plain structs shaped for one page) rather than full entities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How demanding a tour is. Every tour carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            other => Err(format!("Difficulty is either: easy, medium, difficult (got '{}')", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
}

/// The rendering projection of a tour: only what the tour cards show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourCard {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: f64,
    pub ratings_average: f64,
    pub ratings_quantity: u32,
    pub difficulty: Difficulty,
    pub duration: u32,
    pub summary: String,
    pub image_cover: String,
    pub start_location: Option<String>,
    pub max_group_size: u32,
}

/// Name and photo of whoever wrote a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewAuthor {
    pub name: String,
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourReview {
    pub id: Uuid,
    pub review: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub author: ReviewAuthor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guide {
    pub id: Uuid,
    pub name: String,
    pub photo: String,
    pub role: Role,
}

/// A single tour with its reviews and guides expanded, for the detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourDetail {
    pub tour: TourCard,
    pub reviews: Vec<TourReview>,
    pub guides: Vec<Guide>,
}

/// A tour with the single most recent review expanded.
///
/// Every expanded field is optional: the store hands back whatever it has and
/// the stories page decides what is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct StorySource {
    pub tour_id: Uuid,
    pub tour_name: String,
    pub tour_image: String,
    pub tour_slug: String,
    pub duration: Option<u32>,
    pub location: Option<String>,
    pub latest_review: Option<ReviewSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSnapshot {
    pub review: Option<String>,
    pub rating: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<AuthorSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorSnapshot {
    pub name: Option<String>,
    pub photo: Option<String>,
}

/// Filters for a tour card read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourQuery {
    pub min_rating: Option<f64>,
    pub difficulties: Vec<Difficulty>,
    pub limit: Option<usize>,
}

impl TourQuery {
    /// Every tour, unfiltered.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn rated_at_least(min_rating: f64) -> Self {
        Self {
            min_rating: Some(min_rating),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_difficulties(mut self, difficulties: Vec<Difficulty>) -> Self {
        self.difficulties = difficulties;
        self
    }

    /// Whether a card passes the rating and difficulty filters. The limit is
    /// applied by the caller over the ordered result.
    pub fn matches(&self, card: &TourCard) -> bool {
        let rating_ok = self
            .min_rating
            .map_or(true, |min| card.ratings_average >= min);
        let difficulty_ok =
            self.difficulties.is_empty() || self.difficulties.contains(&card.difficulty);
        rating_ok && difficulty_ok
    }
}

/// The two user fields editable from the account page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
}

impl ProfileUpdate {
    /// Normalises the submitted values (trimmed name, trimmed lowercase email).
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
        }
    }

    /// Returns one message per failing field; empty when the update is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push("Please tell us your name!".to_string());
        }
        if self.email.is_empty() {
            errors.push("Please provide your email".to_string());
        } else if !is_plausible_email(&self.email) {
            errors.push("Please provide a valid email".to_string());
        }
        errors
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_is_normalised() {
        let update = ProfileUpdate::new("  Jonas  ", " Jonas@Example.COM ");
        assert_eq!(update.name, "Jonas");
        assert_eq!(update.email, "jonas@example.com");
        assert!(update.validate().is_empty());
    }

    #[test]
    fn profile_update_reports_every_failing_field() {
        let update = ProfileUpdate::new("", "");
        assert_eq!(
            update.validate(),
            vec!["Please tell us your name!", "Please provide your email"]
        );

        let update = ProfileUpdate::new("Jonas", "not-an-email");
        assert_eq!(update.validate(), vec!["Please provide a valid email"]);
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["a@b", "@b.io", "a@@b.io", "a b@c.io", "a@.io", "a@b."] {
            assert!(!is_plausible_email(email), "{} should be rejected", email);
        }
        assert!(is_plausible_email("hiker@natours.io"));
    }

    #[test]
    fn difficulty_round_trips_through_text() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Difficult] {
            assert_eq!(difficulty.as_str().parse::<Difficulty>(), Ok(difficulty));
        }
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
