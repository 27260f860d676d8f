//! 带重试和代理选择的请求层

mod transport;

pub use transport::{FetchRequest, FetchedResponse, ReqwestTransport, Transport};

use std::sync::Arc;
use url::Url;

use crate::config::FetchOptions;
use crate::domain::{DomainClassifier, Region};
use crate::error::FetchError;
use crate::proxy::ProxyPool;

/// 浏览器风格的 HTML 请求头
pub const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const DEFAULT_ACCEPT: &str = "image/webp,image/*,*/*;q=0.8";

/// 合并请求头，调用方的同名请求头覆盖默认值（不区分大小写）
pub fn merge_headers(extra: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = vec![
        ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
        ("Connection".to_string(), "close".to_string()),
    ];
    for (name, value) in extra {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => headers.push((name.to_string(), value.to_string())),
        }
    }
    headers
}

pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    pool: Arc<ProxyPool>,
    classifier: Arc<DomainClassifier>,
    options: FetchOptions,
}

impl ResilientFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        pool: Arc<ProxyPool>,
        classifier: Arc<DomainClassifier>,
        options: FetchOptions,
    ) -> Self {
        Self {
            transport,
            pool,
            classifier,
            options,
        }
    }

    fn region_for(&self, url: &str) -> Region {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.classifier.classify(h)))
            .unwrap_or(Region::Global)
    }

    /// 发起 GET 请求，失败时最多重试 `max_retries` 次
    pub async fn fetch(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<FetchedResponse, FetchError> {
        let headers = merge_headers(extra_headers);
        let region = self.region_for(url);
        let max_attempts = self.options.max_retries.saturating_add(1);

        let mut used_proxies: Vec<String> = Vec::new();
        let mut last_error = FetchError::EmptyBody;

        for attempt in 0..max_attempts {
            let proxy = self
                .pool
                .select_proxy_excluding(region, &used_proxies)
                .await;
            if let Some(proxy) = &proxy {
                used_proxies.push(proxy.name.clone());
            }

            let request = FetchRequest {
                url,
                headers: &headers,
                proxy: proxy.as_ref(),
                timeout: self.options.timeout(),
            };

            let error = match self.transport.get(request).await {
                Ok(response) if !response.body.is_empty() => return Ok(response),
                Ok(_) => FetchError::EmptyBody,
                Err(e) => e,
            };

            if self.options.debug {
                log::debug!(
                    "第 {} 次请求 {} 失败 (代理: {}): {}",
                    attempt + 1,
                    url,
                    proxy.as_ref().map(|p| p.name.as_str()).unwrap_or("直连"),
                    error
                );
            }

            if let Some(proxy) = &proxy {
                self.pool.record_failure(proxy);
            }
            last_error = error;

            if attempt + 1 < max_attempts {
                tokio::time::sleep(self.options.retry_delay()).await;
            }
        }

        Err(FetchError::RetriesExhausted {
            attempts: max_attempts,
            last: Box::new(last_error),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainLists, ProxyConfig};
    use crate::domain::DomainClassifier;
    use crate::proxy::{HealthStore, InMemoryHealthStore, ProxyDescriptor};
    use crate::testing::StubTransport;
    use chrono::Utc;

    fn options(max_retries: u32) -> FetchOptions {
        FetchOptions {
            max_retries,
            retry_delay_ms: 0,
            debug: true,
            ..FetchOptions::default()
        }
    }

    fn fetcher_with(
        transport: Arc<StubTransport>,
        proxy_config: ProxyConfig,
        store: Arc<InMemoryHealthStore>,
        max_retries: u32,
    ) -> ResilientFetcher {
        let pool = Arc::new(ProxyPool::new(proxy_config, store, transport.clone()));
        let classifier = Arc::new(DomainClassifier::new(&DomainLists::default()));
        ResilientFetcher::new(transport, pool, classifier, options(max_retries))
    }

    #[test]
    fn test_merge_headers_overrides_case_insensitively() {
        let headers = merge_headers(&[("accept", HTML_ACCEPT), ("X-Test", "1")]);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0], ("Accept".to_string(), HTML_ACCEPT.to_string()));
        assert_eq!(headers[1].1, "close");
        assert_eq!(headers[2].0, "X-Test");
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let transport = Arc::new(StubTransport::new());
        transport.fail_times("http://example.com/a", 2);
        transport.respond("http://example.com/a", b"ok".to_vec(), Some("text/plain"));

        let fetcher = fetcher_with(
            transport.clone(),
            ProxyConfig::default(),
            Arc::new(InMemoryHealthStore::new()),
            2,
        );
        let response = fetcher.fetch("http://example.com/a", &[]).await.unwrap();
        assert_eq!(response.body, b"ok");
        assert_eq!(transport.hits("http://example.com/a"), 3);
    }

    #[tokio::test]
    async fn test_unbounded_retry_setting_does_not_overflow() {
        let transport = Arc::new(StubTransport::new());
        transport.respond("http://example.com/ok", b"ok".to_vec(), None);
        let fetcher = fetcher_with(
            transport.clone(),
            ProxyConfig::default(),
            Arc::new(InMemoryHealthStore::new()),
            u32::MAX,
        );

        let response = fetcher.fetch("http://example.com/ok", &[]).await.unwrap();
        assert_eq!(response.body, b"ok");
        assert_eq!(transport.hits("http://example.com/ok"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_last_error() {
        let transport = Arc::new(StubTransport::new());
        let fetcher = fetcher_with(
            transport.clone(),
            ProxyConfig::default(),
            Arc::new(InMemoryHealthStore::new()),
            1,
        );

        let err = fetcher.fetch("http://missing.example/", &[]).await.unwrap_err();
        match err {
            FetchError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, FetchError::Status(404)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.hits("http://missing.example/"), 2);
    }

    #[tokio::test]
    async fn test_empty_body_counts_as_failure() {
        let transport = Arc::new(StubTransport::new());
        transport.respond("http://example.com/empty", Vec::new(), None);
        let fetcher = fetcher_with(
            transport.clone(),
            ProxyConfig::default(),
            Arc::new(InMemoryHealthStore::new()),
            0,
        );

        let err = fetcher.fetch("http://example.com/empty", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::RetriesExhausted { attempts: 1, ref last } if matches!(**last, FetchError::EmptyBody)
        ));
    }

    #[tokio::test]
    async fn test_failed_proxy_is_recorded_and_not_reused() {
        let transport = Arc::new(StubTransport::new());
        transport.fail_times("http://example.com/icon", 1);
        transport.respond("http://example.com/icon", b"icon".to_vec(), None);

        let mut proxy_config = ProxyConfig::default();
        proxy_config.strategy.use_proxy_for_global = true;
        proxy_config.servers.global = vec![
            ProxyDescriptor::new("p1").with_http("http://127.0.0.1:3128"),
            ProxyDescriptor::new("p2").with_http("http://127.0.0.1:3129"),
        ];

        // 两个代理都刚检查过，跳过探测
        let store = Arc::new(InMemoryHealthStore::new());
        for name in ["p1", "p2"] {
            store.update(name, &mut |r| r.mark_healthy(Utc::now()));
        }

        let fetcher = fetcher_with(transport.clone(), proxy_config, store.clone(), 1);
        fetcher.fetch("http://example.com/icon", &[]).await.unwrap();

        let proxies = transport.proxies_used("http://example.com/icon");
        assert_eq!(proxies.len(), 2);
        assert_ne!(proxies[0], proxies[1]);
        let failed = proxies[0].clone().unwrap();
        assert_eq!(store.load(&failed).fails, 1);
    }
}
