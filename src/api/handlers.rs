use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::types::*;
use crate::browse::RunStatus;
use crate::catalog::{MovieDetail, MovieId, MovieSummary};
use crate::config::GenreConfig;
use crate::mood::{suggest_for_label, MoodLabel, MoodSuggestions};
use crate::server::AppState;

/// Latest browse snapshot. A cold session joins the run already in flight
/// (or starts one) instead of superseding it.
pub async fn get_browse(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.browse.load().await {
        RunStatus::Completed(snapshot) => {
            let refreshing = state.browse.is_refreshing();
            Ok(Json(BrowseResponse::from_snapshot(&snapshot, refreshing)).into_response())
        }
        RunStatus::Superseded => {
            Ok((StatusCode::ACCEPTED, Json(BrowseResponse::loading())).into_response())
        }
        RunStatus::Closed => Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Browse session is closed",
        )),
    }
}

pub async fn refresh_browse(State(state): State<AppState>) -> Result<Json<BrowseResponse>, ApiError> {
    match state.browse.refresh().await {
        RunStatus::Completed(snapshot) => Ok(Json(BrowseResponse::from_snapshot(&snapshot, false))),
        RunStatus::Superseded => Err(ApiError::new(
            StatusCode::CONFLICT,
            "Refresh superseded by a newer run",
        )),
        RunStatus::Closed => Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Browse session is closed",
        )),
    }
}

pub async fn list_genres(State(state): State<AppState>) -> Json<Vec<GenreConfig>> {
    Json(state.config.browse.genres.clone())
}

pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MovieSummary>>, ApiError> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Please enter a search term."))?;

    let results = state.catalog.search(query).await?;
    debug!(query = %query, count = results.len(), "Search");
    Ok(Json(results))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<MovieDetail>, ApiError> {
    let id = MovieId::new(movie_id)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "No movie ID provided."))?;
    Ok(Json(state.catalog.by_id(&id).await?))
}

/// Classify an uploaded frame (multipart field `file`) and suggest movies.
pub async fn post_mood(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MoodSuggestions>, ApiError> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let mime = field.content_type().unwrap_or("image/jpeg").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
        image = Some((data.to_vec(), mime));
        break;
    }

    let (data, mime) =
        image.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "No file part"))?;
    let label = state.classifier.classify(data, &mime).await?;
    Ok(Json(suggest_for_label(state.catalog.as_ref(), label).await?))
}

pub async fn get_mood_suggestions(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<Json<MoodSuggestions>, ApiError> {
    Ok(Json(
        suggest_for_label(state.catalog.as_ref(), MoodLabel::new(label)).await?,
    ))
}
