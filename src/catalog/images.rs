/// Size variants requested from the image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    /// Poster thumbnails in movie lists.
    ListThumbnail,
    DetailPoster,
    DetailBackdrop,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::ListThumbnail => "w300",
            ImageSize::DetailPoster => "w500",
            ImageSize::DetailBackdrop => "w1280",
        }
    }
}

/// Builds `<base>/<size>/<path>` asset URLs.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
    placeholder: String,
}

impl ImageUrls {
    pub fn new(base: &str, placeholder: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            placeholder: placeholder.to_string(),
        }
    }

    pub fn url(&self, size: ImageSize, path: Option<&str>) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        let path = path.trim_start_matches('/');
        Some(format!("{}/{}/{}", self.base, size.as_str(), path))
    }

    /// Poster URL, falling back to the local placeholder asset.
    pub fn poster(&self, size: ImageSize, path: Option<&str>) -> String {
        self.url(size, path)
            .unwrap_or_else(|| self.placeholder.clone())
    }
}
