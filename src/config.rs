use serde::{Deserialize, Serialize};

use crate::catalog::GenreId;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub mood: MoodConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(default)]
    pub apikey: Option<String>,
    #[serde(default = "default_tmdb_url")]
    pub url: String,
    #[serde(alias = "imageUrl", rename = "imageurl")]
    #[serde(default = "default_tmdb_image_url")]
    pub image_url: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            apikey: None,
            url: default_tmdb_url(),
            image_url: default_tmdb_image_url(),
            placeholder: default_placeholder(),
            timeout: default_timeout(),
        }
    }
}

impl TmdbConfig {
    /// The configured key, or `TMDB_API_KEY` from the environment.
    /// Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.apikey
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("TMDB_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MoodConfig {
    #[serde(default = "default_mood_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            url: default_mood_url(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GenreConfig {
    pub id: GenreId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseConfig {
    #[serde(default = "default_genres")]
    pub genres: Vec<GenreConfig>,
    /// Background refresh interval in seconds, 0 disables it.
    #[serde(default)]
    pub refresh: u64,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            genres: default_genres(),
            refresh: 0,
        }
    }
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_tmdb_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_placeholder() -> String {
    "/placeholder.png".to_string()
}

fn default_mood_url() -> String {
    "http://localhost:5000/predict".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_genres() -> Vec<GenreConfig> {
    [
        (28, "Action"),
        (35, "Comedy"),
        (18, "Drama"),
        (27, "Horror"),
        (10749, "Romance"),
        (878, "Science Fiction"),
        (53, "Thrillers"),
    ]
    .into_iter()
    .map(|(id, name)| GenreConfig {
        id: GenreId(id),
        name: name.to_string(),
    })
    .collect()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}
