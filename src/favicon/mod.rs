//! 完整流程：缓存 -> 解析 -> 规范化 -> 写缓存

use std::sync::Arc;

use crate::IconResult;
use crate::cache::CacheStore;
use crate::config::FaviconConfig;
use crate::domain::DomainClassifier;
use crate::error::Result;
use crate::fetch::{ReqwestTransport, ResilientFetcher, Transport};
use crate::proxy::{HealthStore, InMemoryHealthStore, ProxyPool};
use crate::resolver::IconResolver;

pub struct FaviconFetcher {
    resolver: IconResolver,
    cache: CacheStore,
    pool: Arc<ProxyPool>,
}

impl FaviconFetcher {
    pub fn new(config: FaviconConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.fetch)?);
        Self::with_parts(config, transport, Arc::new(InMemoryHealthStore::new()))
    }

    pub fn with_parts(
        config: FaviconConfig,
        transport: Arc<dyn Transport>,
        health_store: Arc<dyn HealthStore>,
    ) -> Result<Self> {
        let cache = CacheStore::new(&config.cache.dir)?;
        let removed = cache.evict_expired(config.cache.cleanup_ttl());
        if removed > 0 {
            log::info!("清理了 {} 个过期缓存文件", removed);
        }

        let classifier = Arc::new(DomainClassifier::new(&config.domains));
        let pool = Arc::new(ProxyPool::new(
            config.proxy.clone(),
            health_store,
            transport.clone(),
        ));
        let fetcher = Arc::new(ResilientFetcher::new(
            transport,
            pool.clone(),
            classifier,
            config.fetch.clone(),
        ));
        let resolver = IconResolver::new(fetcher, &config.services);

        Ok(Self {
            resolver,
            cache,
            pool,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn proxy_pool(&self) -> &ProxyPool {
        &self.pool
    }

    /// 获取图标，`refresh` 为 true 时跳过缓存
    pub async fn fetch(&self, url: &str, refresh: bool) -> IconResult {
        if !refresh {
            if let Some(hit) = self.cache.lookup(url) {
                log::info!("缓存命中: {} ({})", url, hit.mime());
                return hit;
            }
        }

        log::info!("缓存未命中: {}", url);
        let resolved = self.resolver.resolve(url).await;
        self.cache.store(url, resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::SVG_MIME;
    use crate::testing::StubTransport;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn config_in(dir: &TempDir) -> FaviconConfig {
        let mut config = FaviconConfig::default();
        config.cache.dir = dir.path().join("cache");
        config.fetch.max_retries = 0;
        config.fetch.retry_delay_ms = 0;
        config
    }

    fn fetcher(config: FaviconConfig, transport: Arc<StubTransport>) -> FaviconFetcher {
        FaviconFetcher::with_parts(config, transport, Arc::new(InMemoryHealthStore::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_fetch_hits_cache() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StubTransport::new());
        transport.respond("http://example.com/favicon.ico", PNG_HEADER.to_vec(), None);
        let favicons = fetcher(config_in(&dir), transport.clone());

        let first = favicons.fetch("example.com", false).await;
        assert!(!first.is_cached());
        assert_eq!(first.mime(), "image/png");

        let second = favicons.fetch("https://example.com/", false).await;
        assert!(second.is_cached());
        assert_eq!(second.content(), first.content());
        assert_eq!(transport.hits("http://example.com/favicon.ico"), 1);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StubTransport::new());
        let favicons = fetcher(config_in(&dir), transport.clone());

        let placeholder = favicons.fetch("offline.example", false).await;
        assert_eq!(placeholder.mime(), SVG_MIME);
        assert!(favicons.fetch("offline.example", false).await.is_cached());

        transport.respond("http://offline.example/favicon.ico", PNG_HEADER.to_vec(), None);
        let refreshed = favicons.fetch("offline.example", true).await;
        assert!(!refreshed.is_cached());
        assert_eq!(refreshed.content(), PNG_HEADER);

        let names: Vec<_> = std::fs::read_dir(favicons.cache().dir()).unwrap().flatten().collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_construction_evicts_expired_entries() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        let transport = Arc::new(StubTransport::new());
        {
            let favicons = fetcher(config.clone(), transport.clone());
            favicons.fetch("stale.example", false).await;
        }

        config.cache.cleanup_ttl_secs = 0;
        std::thread::sleep(std::time::Duration::from_millis(20));
        let favicons = fetcher(config, transport);
        assert!(favicons.cache().lookup("stale.example").is_none());
    }
}
