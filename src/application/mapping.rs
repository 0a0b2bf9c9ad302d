//! Mapping-routine resolution: cache first, fetch and evaluate on a miss.

use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::application::error::AppError;
use crate::cache::MappingStore;
use crate::domain::gallery::GalleryId;
use crate::domain::mapping::MappingRoutine;
use crate::infra::fetch::UpstreamFetcher;
use crate::infra::script;

/// Resolves the mapping routine a gallery's URL derivation needs.
///
/// The script source is global (one fixed URL); only the cache key is
/// per-gallery, so each gallery id independently bounds its routine's age to
/// the cache TTL. Two galleries resolved inside the same window may hold
/// different routine instances, which is accepted. Concurrent misses for one
/// id may each fetch; the cache write is last-writer-wins and idempotent in
/// effect, so no single-flight dedup is needed.
pub struct MappingResolver {
    fetcher: Arc<dyn UpstreamFetcher>,
    store: Arc<MappingStore>,
    script_url: String,
}

impl MappingResolver {
    pub fn new(
        fetcher: Arc<dyn UpstreamFetcher>,
        store: Arc<MappingStore>,
        script_url: String,
    ) -> Self {
        Self {
            fetcher,
            store,
            script_url,
        }
    }

    /// Return the cached routine for `id`, or fetch, evaluate, and cache one.
    pub async fn resolve(
        &self,
        id: &GalleryId,
        album_url: &str,
    ) -> Result<Arc<MappingRoutine>, AppError> {
        if let Some(routine) = self.store.get(id) {
            return Ok(routine);
        }

        debug!(
            target: "vetrina::mapping",
            gallery = %id,
            url = %self.script_url,
            "mapping cache miss, fetching script"
        );
        counter!("vetrina_mapping_fetch_total").increment(1);

        let source = self
            .fetcher
            .fetch_text(&self.script_url, album_url, true)
            .await?;
        let routine = Arc::new(script::parse_mapping_script(&source)?);

        self.store.put(id.clone(), routine.clone());
        Ok(routine)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::cache::CacheConfig;
    use crate::infra::fetch::FetchError;

    use super::*;

    const SCRIPT: &str = "var gg = {\nm: function(g) {\nvar o = 0;\nswitch (g) {\ncase 11:\no = 1; break;\n}\nreturn o;\n},\nb: '99/',\ns: function(h) { var m = /(..)(.)$/.exec(h); return parseInt(m[2]+m[1], 16).toString(10); }\n};";

    struct CountingFetcher {
        calls: AtomicUsize,
        body: &'static str,
    }

    #[async_trait]
    impl UpstreamFetcher for CountingFetcher {
        async fn fetch_text(
            &self,
            _url: &str,
            _referer: &str,
            _encode_referer: bool,
        ) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.to_string())
        }
    }

    fn resolver_with(body: &'static str) -> (MappingResolver, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            body,
        });
        let store = Arc::new(MappingStore::new(&CacheConfig::default()));
        let resolver = MappingResolver::new(
            fetcher.clone(),
            store,
            "https://upstream.example/gg.js".to_string(),
        );
        (resolver, fetcher)
    }

    fn id(raw: &str) -> GalleryId {
        GalleryId::from_album_url(&format!("https://example.net/a-{raw}.html")).expect("id")
    }

    #[tokio::test]
    async fn second_resolution_hits_the_cache() {
        let (resolver, fetcher) = resolver_with(SCRIPT);
        let album = "https://example.net/a-123456.html";

        let first = resolver.resolve(&id("123456"), album).await.expect("routine");
        let second = resolver.resolve(&id("123456"), album).await.expect("routine");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.path_prefix(), "99/");
    }

    #[tokio::test]
    async fn distinct_galleries_fetch_independently() {
        let (resolver, fetcher) = resolver_with(SCRIPT);

        resolver
            .resolve(&id("1"), "https://example.net/a-1.html")
            .await
            .expect("routine");
        resolver
            .resolve(&id("2"), "https://example.net/a-2.html")
            .await
            .expect("routine");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_script_is_an_eval_error() {
        let (resolver, _) = resolver_with("window.alert('nope')");

        let err = resolver
            .resolve(&id("1"), "https://example.net/a-1.html")
            .await
            .expect_err("malformed script");
        assert_eq!(err.kind(), "eval");
    }
}
