//! Gallery listing assembly.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::application::error::AppError;
use crate::application::mapping::MappingResolver;
use crate::application::resolver;
use crate::domain::gallery::{AssetDescriptor, GalleryId, GalleryInfo, flatten_tags};
use crate::infra::fetch::UpstreamFetcher;
use crate::infra::script;

/// Rendition requested for every listed file.
const LISTING_RENDITION: &str = "webp";

/// Fetches a gallery's metadata document and resolves each file entry into a
/// final download URL through the current mapping routine.
pub struct GalleryService {
    fetcher: Arc<dyn UpstreamFetcher>,
    mappings: Arc<MappingResolver>,
    metadata_base_url: String,
    user_agent: String,
}

impl GalleryService {
    pub fn new(
        fetcher: Arc<dyn UpstreamFetcher>,
        mappings: Arc<MappingResolver>,
        metadata_base_url: String,
        user_agent: String,
    ) -> Self {
        Self {
            fetcher,
            mappings,
            metadata_base_url,
            user_agent,
        }
    }

    /// Assemble the resolved listing for one gallery.
    ///
    /// File order follows the metadata document exactly; it reflects plate
    /// order within the gallery. A document without a file list yields an
    /// empty listing, not an error.
    pub async fn fetch_gallery(
        &self,
        id: &GalleryId,
        album_url: &str,
    ) -> Result<GalleryInfo, AppError> {
        let routine = self.mappings.resolve(id, album_url).await?;

        let metadata_url = format!(
            "{}/{id}.js",
            self.metadata_base_url.trim_end_matches('/')
        );
        let source = self.fetcher.fetch_text(&metadata_url, album_url, false).await?;
        let document = script::parse_gallery_document(&source)?;

        let mut files = Vec::with_capacity(document.files().len());
        for entry in document.files() {
            let descriptor = AssetDescriptor {
                hash: entry.hash.clone(),
                name: entry.name.clone(),
            };
            files.push(resolver::resolve_asset_url(
                &descriptor,
                LISTING_RENDITION,
                None,
                &routine,
            )?);
        }

        let tags = flatten_tags(document.tags().iter().map(|entry| entry.tag.as_str()));

        debug!(
            target: "vetrina::gallery",
            gallery = %id,
            files = files.len(),
            "resolved gallery listing"
        );

        Ok(GalleryInfo {
            id: id.clone(),
            files,
            tags,
            headers: self.downstream_headers(album_url),
        })
    }

    /// Header bundle a downstream consumer must send when fetching the
    /// resolved URLs; the upstream rejects bare requests.
    fn downstream_headers(&self, album_url: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("referer".to_string(), album_url.to_string()),
            ("user-agent".to_string(), self.user_agent.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::cache::{CacheConfig, MappingStore};
    use crate::infra::fetch::FetchError;

    use super::*;

    const SCRIPT: &str = "var gg = {\nm: function(g) {\nvar o = 0;\nswitch (g) {\ncase 427:\no = 1; break;\ncase 712:\no = 2; break;\n}\nreturn o;\n},\nb: 'p/',\ns: function(h) { var m = /(..)(.)$/.exec(h); return parseInt(m[2]+m[1], 16).toString(10); }\n};";

    struct ScriptedFetcher {
        script: &'static str,
        metadata: String,
    }

    #[async_trait]
    impl UpstreamFetcher for ScriptedFetcher {
        async fn fetch_text(
            &self,
            url: &str,
            _referer: &str,
            _encode_referer: bool,
        ) -> Result<String, FetchError> {
            if url.ends_with("gg.js") {
                Ok(self.script.to_string())
            } else {
                Ok(self.metadata.clone())
            }
        }
    }

    fn service_with(metadata: String) -> GalleryService {
        let fetcher = Arc::new(ScriptedFetcher {
            script: SCRIPT,
            metadata,
        });
        let store = Arc::new(MappingStore::new(&CacheConfig::default()));
        let mappings = Arc::new(MappingResolver::new(
            fetcher.clone(),
            store,
            "https://upstream.example/gg.js".to_string(),
        ));
        GalleryService::new(
            fetcher,
            mappings,
            "https://upstream.example/galleries".to_string(),
            "test-agent/1.0".to_string(),
        )
    }

    fn hash_ending(tail: &str) -> String {
        format!("{}{tail}", "0".repeat(64 - tail.len()))
    }

    #[tokio::test]
    async fn resolves_files_in_metadata_order() {
        // `ab1` swaps to 0x1ab = 427 -> shard 1; `c82` swaps to 0x2c8 = 712 -> shard 2.
        let metadata = format!(
            r#"var galleryinfo = {{"files":[{{"hash":"{}","name":"01.jpg"}},{{"hash":"{}","name":"02.jpg"}}],"tags":[{{"tag":"studio"}},{{"tag":""}},{{"tag":"portrait"}}]}}"#,
            hash_ending("ab1"),
            hash_ending("c82"),
        );
        let service = service_with(metadata);

        let id = GalleryId::from_album_url("https://example.net/set-123456.html").expect("id");
        let info = service
            .fetch_gallery(&id, "https://example.net/set-123456.html")
            .await
            .expect("gallery info");

        assert_eq!(
            info.files,
            vec![
                format!(
                    "https://w2.gold-usergeneratedcontent.net/p/427/{}.webp",
                    hash_ending("ab1")
                ),
                format!(
                    "https://w3.gold-usergeneratedcontent.net/p/712/{}.webp",
                    hash_ending("c82")
                ),
            ]
        );
        assert_eq!(info.tags, "studio, portrait");
        assert_eq!(
            info.headers.get("referer").map(String::as_str),
            Some("https://example.net/set-123456.html")
        );
        assert_eq!(
            info.headers.get("user-agent").map(String::as_str),
            Some("test-agent/1.0")
        );
    }

    #[tokio::test]
    async fn empty_gallery_is_not_an_error() {
        let service = service_with(r#"var galleryinfo = {"id":"9"}"#.to_string());

        let id = GalleryId::from_album_url("https://example.net/set-9.html").expect("id");
        let info = service
            .fetch_gallery(&id, "https://example.net/set-9.html")
            .await
            .expect("gallery info");

        assert!(info.files.is_empty());
        assert_eq!(info.tags, "");
    }

    #[tokio::test]
    async fn malformed_file_hash_fails_the_request() {
        let service = service_with(
            r#"var galleryinfo = {"files":[{"hash":"short","name":"01.jpg"}]}"#.to_string(),
        );

        let id = GalleryId::from_album_url("https://example.net/set-9.html").expect("id");
        let err = service
            .fetch_gallery(&id, "https://example.net/set-9.html")
            .await
            .expect_err("malformed hash");
        assert_eq!(err.kind(), "malformed_hash");
    }
}
