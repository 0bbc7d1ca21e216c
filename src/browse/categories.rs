use std::sync::Arc;

use super::aggregator::CategoryRequest;
use crate::catalog::{CatalogClient, BROWSE_MIN_VOTES};
use crate::config::GenreConfig;

pub const TRENDING_KEY: &str = "trending";
pub const TRENDING_TITLE: &str = "Trending Now";

/// Category key for a genre name: lowercase with all whitespace removed,
/// so "Science Fiction" becomes "sciencefiction".
pub fn category_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The browse page rows: trending first, then one row per configured genre.
pub fn browse_requests(
    catalog: Arc<dyn CatalogClient>,
    genres: &[GenreConfig],
) -> Vec<CategoryRequest> {
    let mut requests = Vec::with_capacity(genres.len() + 1);

    let trending = catalog.clone();
    requests.push(CategoryRequest::new(TRENDING_KEY, TRENDING_TITLE, move || {
        let catalog = trending.clone();
        async move { catalog.trending().await }
    }));

    for genre in genres {
        let catalog = catalog.clone();
        let genre_id = genre.id;
        requests.push(CategoryRequest::new(
            category_key(&genre.name),
            genre.name.clone(),
            move || {
                let catalog = catalog.clone();
                async move { catalog.by_genre(genre_id, BROWSE_MIN_VOTES).await }
            },
        ));
    }

    requests
}
