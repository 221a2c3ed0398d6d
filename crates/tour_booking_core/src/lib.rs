pub mod domain;
pub mod pages;
pub mod ports;

pub use domain::{
    AuthorSnapshot, Difficulty, Guide, ProfileUpdate, ReviewAuthor, ReviewSnapshot, Role,
    StorySource, TourCard, TourDetail, TourQuery, TourReview, User,
};
pub use ports::{DatabaseService, PaymentWebhookService, PortError, PortResult};
