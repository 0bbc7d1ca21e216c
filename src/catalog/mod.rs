pub mod client;
pub mod images;
pub mod types;

pub use client::{CatalogClient, TmdbClient, BROWSE_MIN_VOTES, MOOD_MIN_VOTES};
pub use images::{ImageSize, ImageUrls};
pub use types::{release_year, Genre, GenreId, MovieDetail, MovieId, MovieSummary};
