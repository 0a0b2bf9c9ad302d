//! Shared request and response bodies for the vetrina gallery listing API.
//!
//! Kept free of server-side types so automation clients and tests can depend on
//! this crate alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Successful body of `GET /api/images`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryResponse {
    pub gallery_info: GalleryInfoBody,
}

/// Resolved listing for one gallery.
///
/// `files` preserves the upstream metadata order, which reflects plate order
/// within the gallery. `headers` is the header bundle a downstream consumer
/// must send when fetching the resolved URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryInfoBody {
    pub files: Vec<String>,
    pub tags: String,
    pub headers: BTreeMap<String, String>,
}

/// Error envelope shared by every non-success API response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_response_round_trips() {
        let body = GalleryResponse {
            gallery_info: GalleryInfoBody {
                files: vec!["https://a1.example.net/p/1/abc.webp".to_string()],
                tags: "portrait, studio".to_string(),
                headers: BTreeMap::from([(
                    "referer".to_string(),
                    "https://example.net/album-1.html".to_string(),
                )]),
            },
        };

        let json = serde_json::to_string(&body).expect("serialize");
        let parsed: GalleryResponse = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.gallery_info.files.len(), 1);
        assert_eq!(parsed.gallery_info.tags, "portrait, studio");
    }

    #[test]
    fn error_hint_is_omitted_when_absent() {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: "bad_request".to_string(),
                message: "Query parameter `url` is required".to_string(),
                hint: None,
            },
        };

        let json = serde_json::to_string(&body).expect("serialize");
        assert!(!json.contains("hint"));
    }
}
