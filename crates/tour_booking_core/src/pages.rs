//! crates/tour_booking_core/src/pages.rs
//!
//! Pure assembly of page view models from already-fetched projections.
//! Nothing here touches a port; controllers fetch, these functions shape.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Difficulty, StorySource, TourCard};

//=========================================================================================
// Destinations
//=========================================================================================

pub const FEATURED_MIN_RATING: f64 = 4.5;
pub const FEATURED_TOUR_LIMIT: usize = 6;
const FEATURED_PER_DESTINATION: usize = 2;

struct DestinationKind {
    difficulty: Difficulty,
    name: &'static str,
    description: &'static str,
    image: &'static str,
}

const DESTINATIONS: [DestinationKind; 3] = [
    DestinationKind {
        difficulty: Difficulty::Difficult,
        name: "Mountain Adventures",
        description: "Conquer the world's most breathtaking peaks",
        image: "tour-1-cover.jpg",
    },
    DestinationKind {
        difficulty: Difficulty::Easy,
        name: "Coastal Escapes",
        description: "Discover pristine beaches and coastal wonders",
        image: "tour-2-cover.jpg",
    },
    DestinationKind {
        difficulty: Difficulty::Medium,
        name: "Cultural Journeys",
        description: "Immerse yourself in rich traditions and history",
        image: "tour-3-cover.jpg",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    pub difficulty: Difficulty,
    pub tour_count: usize,
    pub featured_tours: Vec<TourCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationsPage {
    pub destinations: Vec<DestinationCategory>,
    pub featured_tours: Vec<TourCard>,
}

/// Partitions tours by difficulty into the three fixed destination categories.
///
/// `difficulties` is the cheap projection of every tour and drives the counts;
/// `featured` supplies the first two cards of each category.
pub fn destinations_page(featured: Vec<TourCard>, difficulties: &[Difficulty]) -> DestinationsPage {
    let destinations = DESTINATIONS
        .iter()
        .map(|kind| DestinationCategory {
            name: kind.name,
            description: kind.description,
            image: kind.image,
            difficulty: kind.difficulty,
            tour_count: difficulties.iter().filter(|d| **d == kind.difficulty).count(),
            featured_tours: featured
                .iter()
                .filter(|tour| tour.difficulty == kind.difficulty)
                .take(FEATURED_PER_DESTINATION)
                .cloned()
                .collect(),
        })
        .collect();

    DestinationsPage {
        destinations,
        featured_tours: featured,
    }
}

//=========================================================================================
// Stories
//=========================================================================================

pub const STORY_MIN_RATINGS: u32 = 5;
pub const STORY_TOUR_LIMIT: usize = 8;
const FEATURED_STORY_COUNT: usize = 3;
const STORIES_PER_CATEGORY: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelStory {
    pub id: Uuid,
    pub tour_name: String,
    pub tour_image: String,
    pub tour_slug: String,
    pub story: String,
    pub author: String,
    pub author_photo: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub location: String,
    pub duration: u32,
}

/// Fallbacks for the story fields a source may lack.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryDefaults {
    pub author_photo: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub location: String,
    pub duration: u32,
}

impl StoryDefaults {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            author_photo: "default.jpg".to_string(),
            rating: 0.0,
            date: now,
            location: "Unknown location".to_string(),
            duration: 0,
        }
    }

    /// Turns a source into a story, or `None` when it has no usable review:
    /// the review text and the author's name are mandatory, everything else
    /// falls back to these defaults.
    pub fn resolve(&self, source: StorySource) -> Option<TravelStory> {
        let review = source.latest_review?;
        let story = non_blank(review.review)?;
        let author = review.author?;
        let author_name = non_blank(author.name)?;

        Some(TravelStory {
            id: source.tour_id,
            tour_name: source.tour_name,
            tour_image: source.tour_image,
            tour_slug: source.tour_slug,
            story,
            author: author_name,
            author_photo: non_blank(author.photo).unwrap_or_else(|| self.author_photo.clone()),
            rating: review.rating.unwrap_or(self.rating),
            date: review.created_at.unwrap_or(self.date),
            location: non_blank(source.location).unwrap_or_else(|| self.location.clone()),
            duration: source.duration.unwrap_or(self.duration),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

struct StoryCategoryRule {
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    min_rating: f64,
}

const STORY_CATEGORIES: [StoryCategoryRule; 3] = [
    StoryCategoryRule {
        name: "Adventure Stories",
        description: "Epic tales from the world's most challenging adventures",
        icon: "icon-trending-up",
        min_rating: 4.5,
    },
    StoryCategoryRule {
        name: "Cultural Experiences",
        description: "Heartwarming stories of cultural discovery and connection",
        icon: "icon-users",
        min_rating: 4.0,
    },
    StoryCategoryRule {
        name: "Hidden Gems",
        description: "Discoveries of secret places and unexpected adventures",
        icon: "icon-map-pin",
        min_rating: 4.2,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub stories: Vec<TravelStory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoriesPage {
    pub travel_stories: Vec<TravelStory>,
    pub featured_stories: Vec<TravelStory>,
    pub story_categories: Vec<StoryCategory>,
}

/// Builds the stories page. Sources without a usable review are dropped, not
/// defaulted. Categories overlap: a story may sit in several of them.
pub fn stories_page(sources: Vec<StorySource>, defaults: &StoryDefaults) -> StoriesPage {
    let travel_stories: Vec<TravelStory> = sources
        .into_iter()
        .filter_map(|source| defaults.resolve(source))
        .collect();

    let featured_stories = travel_stories
        .iter()
        .take(FEATURED_STORY_COUNT)
        .cloned()
        .collect();

    let story_categories = STORY_CATEGORIES
        .iter()
        .map(|rule| StoryCategory {
            name: rule.name,
            description: rule.description,
            icon: rule.icon,
            stories: travel_stories
                .iter()
                .filter(|story| story.rating >= rule.min_rating)
                .take(STORIES_PER_CATEGORY)
                .cloned()
                .collect(),
        })
        .collect();

    StoriesPage {
        travel_stories,
        featured_stories,
        story_categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthorSnapshot, ReviewSnapshot};
    use chrono::TimeZone;

    fn card(name: &str, difficulty: Difficulty, rating: f64) -> TourCard {
        TourCard {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            price: 497.0,
            ratings_average: rating,
            ratings_quantity: 9,
            difficulty,
            duration: 5,
            summary: "Breathtaking hike".to_string(),
            image_cover: "tour-1-cover.jpg".to_string(),
            start_location: Some("Banff, CAN".to_string()),
            max_group_size: 25,
        }
    }

    fn source(name: &str, review: Option<ReviewSnapshot>) -> StorySource {
        StorySource {
            tour_id: Uuid::new_v4(),
            tour_name: name.to_string(),
            tour_image: "tour-2-cover.jpg".to_string(),
            tour_slug: name.to_lowercase(),
            duration: Some(7),
            location: Some("Miami, USA".to_string()),
            latest_review: review,
        }
    }

    fn review(text: &str, author: Option<&str>, rating: Option<f64>) -> ReviewSnapshot {
        ReviewSnapshot {
            review: Some(text.to_string()),
            rating,
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            author: Some(AuthorSnapshot {
                name: author.map(str::to_string),
                photo: Some("user-7.jpg".to_string()),
            }),
        }
    }

    fn defaults() -> StoryDefaults {
        StoryDefaults::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn destination_counts_partition_every_tour() {
        let difficulties = vec![
            Difficulty::Easy,
            Difficulty::Difficult,
            Difficulty::Medium,
            Difficulty::Easy,
            Difficulty::Difficult,
            Difficulty::Easy,
        ];
        let page = destinations_page(Vec::new(), &difficulties);

        let names: Vec<_> = page.destinations.iter().map(|d| d.name).collect();
        assert_eq!(names, ["Mountain Adventures", "Coastal Escapes", "Cultural Journeys"]);

        let counts: Vec<_> = page.destinations.iter().map(|d| d.tour_count).collect();
        assert_eq!(counts, [2, 3, 1]);
        assert_eq!(counts.iter().sum::<usize>(), difficulties.len());
    }

    #[test]
    fn destinations_feature_the_first_two_matching_tours() {
        let featured = vec![
            card("Sea Explorer", Difficulty::Medium, 4.8),
            card("Snow Adventurer", Difficulty::Difficult, 4.5),
            card("Forest Hiker", Difficulty::Easy, 4.7),
            card("Wine Taster", Difficulty::Medium, 4.5),
            card("Northern Lights", Difficulty::Medium, 4.9),
        ];
        let page = destinations_page(featured.clone(), &[]);

        let cultural = &page.destinations[2];
        let names: Vec<_> = cultural.featured_tours.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Sea Explorer", "Wine Taster"]);
        assert_eq!(page.destinations[0].featured_tours.len(), 1);
        assert_eq!(page.featured_tours, featured);
    }

    #[test]
    fn stories_drop_sources_without_text_or_author() {
        let mut no_author = review("Great trip", None, Some(5.0));
        no_author.author = None;

        let sources = vec![
            source("Keeps", Some(review("Loved it", Some("Lourdes"), Some(4.0)))),
            source("No review", None),
            source("Blank text", Some(review("   ", Some("Sophie"), Some(5.0)))),
            source("No author", Some(no_author)),
            source("Nameless", Some(review("Fine", None, Some(4.7)))),
            source("Blank name", Some(review("Fine", Some(""), Some(4.7)))),
        ];

        let page = stories_page(sources, &defaults());
        let names: Vec<_> = page.travel_stories.iter().map(|s| s.tour_name.as_str()).collect();
        assert_eq!(names, ["Keeps"]);
        assert!(page
            .travel_stories
            .iter()
            .all(|s| !s.story.is_empty() && !s.author.is_empty()));
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let defaults = defaults();
        let mut src = source(
            "Sparse",
            Some(ReviewSnapshot {
                review: Some("Unforgettable".to_string()),
                rating: None,
                created_at: None,
                author: Some(AuthorSnapshot {
                    name: Some("Max".to_string()),
                    photo: None,
                }),
            }),
        );
        src.location = None;
        src.duration = None;

        let story = defaults.resolve(src).expect("story should survive");
        assert_eq!(story.author_photo, "default.jpg");
        assert_eq!(story.rating, 0.0);
        assert_eq!(story.date, defaults.date);
        assert_eq!(story.location, "Unknown location");
        assert_eq!(story.duration, 0);
    }

    #[test]
    fn story_categories_overlap_and_cap_at_two() {
        let sources = vec![
            source("A", Some(review("a", Some("Ann"), Some(4.9)))),
            source("B", Some(review("b", Some("Ben"), Some(4.3)))),
            source("C", Some(review("c", Some("Cat"), Some(4.6)))),
            source("D", Some(review("d", Some("Dan"), Some(4.1)))),
        ];

        let page = stories_page(sources, &defaults());
        assert_eq!(page.featured_stories.len(), 3);

        let by_category: Vec<Vec<&str>> = page
            .story_categories
            .iter()
            .map(|c| c.stories.iter().map(|s| s.tour_name.as_str()).collect())
            .collect();
        assert_eq!(by_category[0], ["A", "C"]);
        assert_eq!(by_category[1], ["A", "B"]);
        assert_eq!(by_category[2], ["A", "B"]);
    }
}
