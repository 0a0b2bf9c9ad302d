use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use serde::Deserialize;
use vetrina_api_types::{GalleryInfoBody, GalleryResponse};

use crate::domain::gallery::GalleryId;

use super::error::ApiError;
use super::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct ImagesQuery {
    pub url: Option<String>,
}

/// `GET /api/images?url=<album page url>`
///
/// The gallery id is extracted from the album URL before the core runs;
/// anything without a trailing `-<digits>.html` id never reaches it.
pub async fn list_images(
    State(state): State<ApiState>,
    Query(query): Query<ImagesQuery>,
) -> Response {
    let Some(album_url) = query.url else {
        return ApiError::bad_request("Query parameter `url` is required", None).into_response();
    };

    let id = match GalleryId::from_album_url(&album_url) {
        Ok(id) => id,
        Err(err) => {
            return ApiError::bad_request("Album URL carries no gallery id", Some(err.to_string()))
                .into_response();
        }
    };

    match state.gallery.fetch_gallery(&id, &album_url).await {
        Ok(info) => Json(GalleryResponse {
            gallery_info: GalleryInfoBody {
                files: info.files,
                tags: info.tags,
                headers: info.headers,
            },
        })
        .into_response(),
        Err(err) => {
            // Kinds are split for observability only; the body stays generic.
            counter!("vetrina_request_error_total", "kind" => err.kind()).increment(1);
            err.into_response()
        }
    }
}

pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}
