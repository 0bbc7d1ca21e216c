use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::genre::MoodLabel;
use crate::config::MoodConfig;
use crate::error::{ServiceError, ServiceResult};

#[async_trait]
pub trait MoodClassifier: Send + Sync {
    async fn classify(&self, image: Vec<u8>, mime_type: &str) -> ServiceResult<MoodLabel>;
}

/// Client for the `/predict` emotion classification endpoint.
pub struct HttpMoodClassifier {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    prediction: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpMoodClassifier {
    pub fn new(config: &MoodConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl MoodClassifier for HttpMoodClassifier {
    async fn classify(&self, image: Vec<u8>, mime_type: &str) -> ServiceResult<MoodLabel> {
        if image.is_empty() {
            return Err(ServiceError::InvalidInput("no image provided for detection".to_string()));
        }

        let part = reqwest::multipart::Part::bytes(image)
            .file_name("frame.jpg")
            .mime_str(mime_type)
            .map_err(|e| ServiceError::InvalidInput(format!("invalid mime type {}: {}", mime_type, e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(url = %self.url, "Sending frame to mood classifier");
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|_| {
                ServiceError::NetworkUnreachable(
                    "Could not connect to the emotion detection service".to_string(),
                )
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::from_transport("mood classifier", e))?;
        let parsed = serde_json::from_slice::<PredictResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            warn!(status = status.as_u16(), "Mood classifier returned an error: {}", message);
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        match parsed {
            Ok(PredictResponse { prediction: Some(label), .. }) => Ok(MoodLabel::new(label)),
            Ok(PredictResponse { error: Some(message), .. }) => Err(ServiceError::Upstream {
                status: status.as_u16(),
                message,
            }),
            _ => Err(ServiceError::ProtocolViolation(
                "Invalid response format from mood classifier".to_string(),
            )),
        }
    }
}
