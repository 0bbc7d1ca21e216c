pub mod classifier;
pub mod genre;

pub use classifier::{HttpMoodClassifier, MoodClassifier};
pub use genre::{resolve_genre, Mood, MoodLabel, DEFAULT_GENRE};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{CatalogClient, GenreId, MovieSummary, MOOD_MIN_VOTES};
use crate::error::ServiceResult;

/// Movies suggested for a detected mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSuggestions {
    pub mood: MoodLabel,
    #[serde(rename = "genreId")]
    pub genre_id: GenreId,
    pub movies: Vec<MovieSummary>,
}

pub async fn suggest_for_label(
    catalog: &dyn CatalogClient,
    label: MoodLabel,
) -> ServiceResult<MoodSuggestions> {
    let genre_id = resolve_genre(label.as_str());
    let movies = catalog.by_genre(genre_id, MOOD_MIN_VOTES).await?;
    info!(mood = %label, genre = %genre_id, count = movies.len(), "Mood suggestions");
    Ok(MoodSuggestions {
        mood: label,
        genre_id,
        movies,
    })
}
