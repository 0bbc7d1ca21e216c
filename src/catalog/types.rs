use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a movie in the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    /// Returns `None` for blank identifiers.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog genre identifier (TMDB numeric genre id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreId(pub u32);

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(rename = "posterUrl")]
    pub poster_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: MovieId,
    pub title: String,
    #[serde(rename = "posterUrl")]
    pub poster_url: String,
    pub overview: String,
    pub tagline: String,
    #[serde(rename = "backdropUrl")]
    pub backdrop_url: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    #[serde(rename = "releaseYear")]
    pub release_year: String,
    pub genres: Vec<Genre>,
    pub rating: f64,
    #[serde(rename = "runtimeMinutes")]
    pub runtime_minutes: Option<u32>,
}

// Wire types of the TMDB v3 API. Only the fields we map are declared.

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbPage {
    #[serde(default)]
    pub results: Option<Vec<TmdbMovie>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbMovie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbMovieDetail {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmdbStatus {
    #[serde(default)]
    pub status_message: Option<String>,
}

/// First four characters of a release date, or "N/A" when it is absent.
pub fn release_year(release_date: Option<&str>) -> String {
    match release_date.map(str::trim) {
        Some(date) if !date.is_empty() => date.chars().take(4).collect(),
        _ => "N/A".to_string(),
    }
}
