use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::images::{ImageSize, ImageUrls};
use super::types::*;
use crate::config::TmdbConfig;
use crate::error::{ServiceError, ServiceResult};

/// Minimum vote count for movies listed on the browse page.
pub const BROWSE_MIN_VOTES: u32 = 50;
/// Minimum vote count for mood-based suggestions.
pub const MOOD_MIN_VOTES: u32 = 100;

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Movies trending this week.
    async fn trending(&self) -> ServiceResult<Vec<MovieSummary>>;
    /// Most popular non-adult movies of a genre with at least `min_votes` votes.
    async fn by_genre(&self, genre: GenreId, min_votes: u32) -> ServiceResult<Vec<MovieSummary>>;
    async fn by_id(&self, id: &MovieId) -> ServiceResult<MovieDetail>;
    async fn search(&self, term: &str) -> ServiceResult<Vec<MovieSummary>>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    images: ImageUrls,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            warn!("TMDB API key not found; catalog requests will fail until tmdb.apikey or TMDB_API_KEY is set");
        }

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key,
            images: ImageUrls::new(&config.image_url, &config.placeholder),
        })
    }

    fn summaries(&self, page: TmdbPage) -> Vec<MovieSummary> {
        page.results
            .unwrap_or_default()
            .into_iter()
            .map(|m| MovieSummary {
                id: MovieId::from(m.id),
                title: m.title.unwrap_or_default(),
                poster_url: self
                    .images
                    .poster(ImageSize::ListThumbnail, m.poster_path.as_deref()),
            })
            .collect()
    }

    fn detail(&self, m: TmdbMovieDetail) -> MovieDetail {
        let release_date = m.release_date.filter(|d| !d.trim().is_empty());
        MovieDetail {
            id: MovieId::from(m.id),
            title: m.title.unwrap_or_default(),
            poster_url: self
                .images
                .poster(ImageSize::DetailPoster, m.poster_path.as_deref()),
            overview: m.overview.unwrap_or_default(),
            tagline: m.tagline.unwrap_or_default(),
            backdrop_url: self
                .images
                .url(ImageSize::DetailBackdrop, m.backdrop_path.as_deref()),
            release_year: release_year(release_date.as_deref()),
            release_date,
            genres: m
                .genres
                .into_iter()
                .map(|g| Genre { id: GenreId(g.id), name: g.name })
                .collect(),
            rating: m.vote_average.unwrap_or(0.0).clamp(0.0, 10.0),
            runtime_minutes: m.runtime.filter(|r| *r > 0),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ServiceResult<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Configuration("TMDB API key is missing".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "TMDB request");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", api_key)])
            .query(params)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport("TMDB", e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::from_transport("TMDB", e))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(path.to_string()));
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<TmdbStatus>(&body)
                .ok()
                .and_then(|s| s.status_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            warn!(path = %path, status = status.as_u16(), "TMDB request failed: {}", message);
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| {
            ServiceError::ProtocolViolation(format!("unexpected TMDB response for {}: {}", path, e))
        })
    }
}

#[async_trait]
impl CatalogClient for TmdbClient {
    async fn trending(&self) -> ServiceResult<Vec<MovieSummary>> {
        let page: TmdbPage = self.get_json("/trending/movie/week", &[]).await?;
        Ok(self.summaries(page))
    }

    async fn by_genre(&self, genre: GenreId, min_votes: u32) -> ServiceResult<Vec<MovieSummary>> {
        if genre.0 == 0 {
            return Err(ServiceError::InvalidInput("Genre ID is required.".to_string()));
        }
        let params = [
            ("sort_by", "popularity.desc".to_string()),
            ("with_genres", genre.to_string()),
            ("include_adult", "false".to_string()),
            ("vote_count.gte", min_votes.to_string()),
            ("page", "1".to_string()),
        ];
        let page: TmdbPage = self.get_json("/discover/movie", &params).await?;
        let movies = self.summaries(page);
        debug!(genre = %genre, count = movies.len(), "Fetched genre movies");
        Ok(movies)
    }

    async fn by_id(&self, id: &MovieId) -> ServiceResult<MovieDetail> {
        let path = format!("/movie/{}", urlencoding::encode(id.as_str()));
        match self.get_json::<TmdbMovieDetail>(&path, &[]).await {
            Ok(movie) => Ok(self.detail(movie)),
            Err(ServiceError::NotFound(_)) => {
                Err(ServiceError::NotFound(format!("Movie with ID {} not found", id)))
            }
            Err(e) => Err(e),
        }
    }

    async fn search(&self, term: &str) -> ServiceResult<Vec<MovieSummary>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ServiceError::InvalidInput("search term is required".to_string()));
        }
        let params = [
            ("query", term.to_string()),
            ("include_adult", "false".to_string()),
            ("page", "1".to_string()),
        ];
        let page: TmdbPage = self.get_json("/search/movie", &params).await?;
        Ok(self.summaries(page))
    }
}
