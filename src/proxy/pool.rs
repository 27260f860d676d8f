//! 代理池：健康过滤 + 加权随机选择

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;

use super::health_check::{HealthStore, ProxyHealthChecker};
use super::types::{ProxyDescriptor, ProxyHealthRecord};
use crate::config::ProxyConfig;
use crate::domain::Region;
use crate::fetch::Transport;

pub struct ProxyPool {
    config: ProxyConfig,
    store: Arc<dyn HealthStore>,
    checker: ProxyHealthChecker,
}

impl ProxyPool {
    pub fn new(
        config: ProxyConfig,
        store: Arc<dyn HealthStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let checker = ProxyHealthChecker::new(transport, &config.health_check);
        Self {
            config,
            store,
            checker,
        }
    }

    /// 该区域启用代理时返回代理列表
    fn servers_for(&self, region: Region) -> Option<&[ProxyDescriptor]> {
        let (enabled, servers) = match region {
            Region::Regional => (
                self.config.strategy.use_proxy_for_regional,
                &self.config.servers.regional,
            ),
            Region::Global => (
                self.config.strategy.use_proxy_for_global,
                &self.config.servers.global,
            ),
        };
        (enabled && !servers.is_empty()).then_some(servers.as_slice())
    }

    pub async fn select_proxy(&self, region: Region) -> Option<ProxyDescriptor> {
        self.select_proxy_excluding(region, &[]).await
    }

    /// 选择一个可用代理，`used` 中的代理本轮不再选择
    pub async fn select_proxy_excluding(
        &self,
        region: Region,
        used: &[String],
    ) -> Option<ProxyDescriptor> {
        let servers = self.servers_for(region)?;
        let health = &self.config.health_check;
        let mut eligible: Vec<&ProxyDescriptor> = Vec::with_capacity(servers.len());

        for proxy in servers {
            if used.iter().any(|name| name == &proxy.name) {
                continue;
            }

            let now = Utc::now();
            let record = self.store.load(&proxy.name);
            if record.fails >= health.fail_threshold {
                if record.in_penalty_box(now, health.fail_threshold, health.recovery()) {
                    log::debug!("代理 {} 仍在恢复期内，跳过", proxy.name);
                    continue;
                }
                // 恢复期已过，清零失败次数
                self.store.update(&proxy.name, &mut |r| r.fails = 0);
            }

            if record.needs_check(now, health.interval()) {
                match self.checker.check_proxy_health(proxy, region).await {
                    Ok(()) => {
                        self.store
                            .update(&proxy.name, &mut |r| r.mark_healthy(Utc::now()));
                    }
                    Err(e) => {
                        log::debug!("代理 {} 健康检查失败: {}", proxy.name, e);
                        let checked_at = Utc::now();
                        self.store.update(&proxy.name, &mut |r| {
                            r.mark_failure(checked_at);
                            r.last_check = Some(checked_at);
                        });
                        continue;
                    }
                }
            }

            eligible.push(proxy);
        }

        let mut rng = rand::thread_rng();
        weighted_pick(&eligible, &mut rng).cloned()
    }

    /// 记录一次经由该代理的失败请求
    pub fn record_failure(&self, proxy: &ProxyDescriptor) {
        let now = Utc::now();
        self.store.update(&proxy.name, &mut |r| r.mark_failure(now));
    }

    pub fn health(&self, name: &str) -> ProxyHealthRecord {
        self.store.load(name)
    }
}

/// 按权重随机选择：在 `[1, total]` 中取整数，返回累计权重首个不小于它的代理
pub fn weighted_pick<'a, R: Rng + ?Sized>(
    candidates: &[&'a ProxyDescriptor],
    rng: &mut R,
) -> Option<&'a ProxyDescriptor> {
    let first = *candidates.first()?;
    let total: u64 = candidates.iter().map(|p| p.effective_weight()).sum();
    let draw = rng.gen_range(1..=total);

    let mut cumulative = 0;
    for proxy in candidates {
        cumulative += proxy.effective_weight();
        if cumulative >= draw {
            return Some(*proxy);
        }
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::InMemoryHealthStore;
    use crate::testing::StubTransport;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn global_config(proxies: Vec<ProxyDescriptor>) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.strategy.use_proxy_for_global = true;
        config.servers.global = proxies;
        config
    }

    fn fresh_store(names: &[&str]) -> Arc<InMemoryHealthStore> {
        let store = Arc::new(InMemoryHealthStore::new());
        for name in names {
            store.update(name, &mut |r| r.mark_healthy(Utc::now()));
        }
        store
    }

    #[test]
    fn test_weighted_pick_respects_weights() {
        let a = ProxyDescriptor::new("A").with_weight(1);
        let b = ProxyDescriptor::new("B").with_weight(3);
        let candidates = vec![&a, &b];
        let mut rng = StdRng::seed_from_u64(42);

        let draws = 20_000;
        let picked_b = (0..draws)
            .filter(|_| weighted_pick(&candidates, &mut rng).unwrap().name == "B")
            .count();
        let ratio = picked_b as f64 / draws as f64;
        assert!((0.72..=0.78).contains(&ratio), "B ratio was {ratio}");
    }

    #[test]
    fn test_weighted_pick_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(weighted_pick(&[], &mut rng).is_none());
    }

    #[tokio::test]
    async fn test_disabled_strategy_returns_none() {
        let transport = Arc::new(StubTransport::new());
        let mut config = global_config(vec![ProxyDescriptor::new("g1")]);
        config.strategy.use_proxy_for_global = false;
        let pool = ProxyPool::new(config, fresh_store(&["g1"]), transport);

        assert!(pool.select_proxy(Region::Global).await.is_none());
        assert!(pool.select_proxy(Region::Regional).await.is_none());
    }

    #[tokio::test]
    async fn test_penalty_box_excludes_then_recovers() {
        let transport = Arc::new(StubTransport::new());
        let store = fresh_store(&["g1"]);
        let config = global_config(vec![ProxyDescriptor::new("g1")]);
        let threshold = config.health_check.fail_threshold;
        let pool = ProxyPool::new(config, store.clone(), transport);

        let proxy = ProxyDescriptor::new("g1");
        assert!(pool.select_proxy(Region::Global).await.is_some());
        for _ in 0..threshold {
            pool.record_failure(&proxy);
        }
        assert!(pool.select_proxy(Region::Global).await.is_none());

        // 模拟恢复期已过
        store.update("g1", &mut |r| {
            r.last_fail = Some(Utc::now() - Duration::seconds(601));
        });
        let selected = pool.select_proxy(Region::Global).await;
        assert_eq!(selected.map(|p| p.name), Some("g1".to_string()));
        assert_eq!(pool.health("g1").fails, 0);
    }

    #[tokio::test]
    async fn test_failed_probe_removes_candidate() {
        let transport = Arc::new(StubTransport::new());
        // 测试 URL 不可达，探测失败
        let config = global_config(vec![ProxyDescriptor::new("g1")]);
        let pool = ProxyPool::new(config, Arc::new(InMemoryHealthStore::new()), transport.clone());

        assert!(pool.select_proxy(Region::Global).await.is_none());
        let record = pool.health("g1");
        assert_eq!(record.fails, 1);
        assert!(record.last_fail.is_some());
        assert!(record.last_check.is_some());

        // 刚检查过，不会重复探测
        transport.respond("https://www.google.com", b"ok".to_vec(), None);
        assert!(pool.select_proxy(Region::Global).await.is_some());
        assert_eq!(transport.hits("https://www.google.com"), 1);
    }

    #[tokio::test]
    async fn test_successful_probe_resets_failures() {
        let transport = Arc::new(StubTransport::new());
        transport.respond("http://www.baidu.com", b"ok".to_vec(), None);

        let mut config = ProxyConfig::default();
        config.strategy.use_proxy_for_regional = true;
        config.servers.regional = vec![ProxyDescriptor::new("c1")];
        let store = Arc::new(InMemoryHealthStore::new());
        store.update("c1", &mut |r| r.fails = 1);
        let pool = ProxyPool::new(config, store, transport.clone());

        assert!(pool.select_proxy(Region::Regional).await.is_some());
        assert_eq!(pool.health("c1").fails, 0);
        assert_eq!(transport.hits("http://www.baidu.com"), 1);
    }

    #[tokio::test]
    async fn test_excluding_used_proxies() {
        let transport = Arc::new(StubTransport::new());
        let config = global_config(vec![ProxyDescriptor::new("g1"), ProxyDescriptor::new("g2")]);
        let pool = ProxyPool::new(config, fresh_store(&["g1", "g2"]), transport);

        let used = vec!["g1".to_string()];
        for _ in 0..20 {
            let picked = pool.select_proxy_excluding(Region::Global, &used).await;
            assert_eq!(picked.map(|p| p.name), Some("g2".to_string()));
        }
        let all = vec!["g1".to_string(), "g2".to_string()];
        assert!(pool.select_proxy_excluding(Region::Global, &all).await.is_none());
    }
}
