//! 代理健康状态存储与健康检查

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use super::types::{ProxyDescriptor, ProxyHealthRecord};
use crate::config::{HealthCheckConfig, Regional};
use crate::domain::Region;
use crate::error::FetchError;
use crate::fetch::{FetchRequest, Transport};

/// 健康记录存储接口
///
/// 单进程长期运行的服务用 [`InMemoryHealthStore`]；多进程部署可以接入外部 KV 存储。
pub trait HealthStore: Send + Sync {
    /// 读取记录，不存在时返回全零记录
    fn load(&self, name: &str) -> ProxyHealthRecord;

    /// 原子地修改一条记录
    fn update(&self, name: &str, apply: &mut dyn FnMut(&mut ProxyHealthRecord));
}

/// 进程内存储，生命周期与进程相同
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    records: DashMap<String, ProxyHealthRecord>,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HealthStore for InMemoryHealthStore {
    fn load(&self, name: &str) -> ProxyHealthRecord {
        self.records
            .get(name)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    fn update(&self, name: &str, apply: &mut dyn FnMut(&mut ProxyHealthRecord)) {
        let mut entry = self.records.entry(name.to_string()).or_default();
        apply(entry.value_mut());
    }
}

/// 代理健康检查器：通过代理请求测试 URL
#[derive(Clone)]
pub struct ProxyHealthChecker {
    transport: Arc<dyn Transport>,
    /// 测试超时时间
    timeout: Duration,
    /// 测试目标 URL
    test_url: Regional<String>,
}

impl ProxyHealthChecker {
    pub fn new(transport: Arc<dyn Transport>, config: &HealthCheckConfig) -> Self {
        Self {
            transport,
            timeout: config.timeout(),
            test_url: config.test_url.clone(),
        }
    }

    pub fn test_url(&self, region: Region) -> &str {
        match region {
            Region::Regional => &self.test_url.regional,
            Region::Global => &self.test_url.global,
        }
    }

    /// 检查单个代理，任何非 2xx 响应或网络错误都视为不健康
    pub async fn check_proxy_health(
        &self,
        proxy: &ProxyDescriptor,
        region: Region,
    ) -> Result<(), FetchError> {
        let request = FetchRequest {
            url: self.test_url(region),
            headers: &[],
            proxy: Some(proxy),
            timeout: self.timeout,
        };
        self.transport.get(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use chrono::Utc;

    #[test]
    fn test_store_lazily_creates_zero_records() {
        let store = InMemoryHealthStore::new();
        assert_eq!(store.load("p1"), ProxyHealthRecord::default());
        assert!(store.is_empty());

        let now = Utc::now();
        store.update("p1", &mut |r| r.mark_failure(now));
        store.update("p1", &mut |r| r.mark_failure(now));
        assert_eq!(store.load("p1").fails, 2);
        assert_eq!(store.load("p1").last_fail, Some(now));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_checker_uses_region_test_url_through_proxy() {
        let transport = Arc::new(StubTransport::new());
        transport.respond("https://www.google.com", b"ok".to_vec(), None);

        let checker = ProxyHealthChecker::new(transport.clone(), &HealthCheckConfig::default());
        let proxy = ProxyDescriptor::new("g1").with_https("http://127.0.0.1:3128");

        assert!(checker.check_proxy_health(&proxy, Region::Global).await.is_ok());
        assert!(checker.check_proxy_health(&proxy, Region::Regional).await.is_err());
        assert_eq!(
            transport.proxies_used("https://www.google.com"),
            vec![Some("g1".to_string())]
        );
        assert_eq!(checker.test_url(Region::Regional), "http://www.baidu.com");
    }
}
