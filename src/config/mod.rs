use crate::error::Result;
use crate::proxy::ProxyDescriptor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 请求参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub timeout_ms: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// 跳过 TLS 证书校验，生产环境请保持关闭
    pub accept_invalid_certs: bool,
    /// 调试模式：记录每一次尝试和异常
    pub debug: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 2,
            retry_delay_ms: 1000,
            accept_invalid_certs: false,
            debug: false,
        }
    }
}

impl FetchOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// 按区域区分的一组值（中国大陆 / 境外）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Regional<T> {
    pub regional: T,
    pub global: T,
}

/// 代理策略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyStrategy {
    pub use_proxy_for_regional: bool,
    pub use_proxy_for_global: bool,
}

/// 超出范围的秒数按最大时长处理
fn seconds_delta(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

/// 代理服务器健康检查配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub interval_secs: u64,
    pub fail_threshold: u32,
    pub recovery_secs: u64,
    pub timeout_ms: u64,
    pub test_url: Regional<String>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            fail_threshold: 3,
            recovery_secs: 600,
            timeout_ms: 5000,
            test_url: Regional {
                regional: "http://www.baidu.com".to_string(),
                global: "https://www.google.com".to_string(),
            },
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> chrono::Duration {
        seconds_delta(self.interval_secs)
    }

    pub fn recovery(&self) -> chrono::Duration {
        seconds_delta(self.recovery_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub strategy: ProxyStrategy,
    pub servers: Regional<Vec<ProxyDescriptor>>,
    pub health_check: HealthCheckConfig,
}

/// 域名分类名单
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainLists {
    pub regional_whitelist: Vec<String>,
    pub global_whitelist: Vec<String>,
    pub regional_suffixes: Vec<String>,
}

impl Default for DomainLists {
    fn default() -> Self {
        let suffixes = [
            ".cn", ".com.cn", ".net.cn", ".org.cn", ".gov.cn", ".edu.cn", ".ac.cn", ".mil.cn",
            ".biz.cn", ".info.cn", ".name.cn", ".moe.cn", ".xn--fiqs8s", ".wang", ".top", ".xyz",
            ".site", ".online", ".tech", ".store", ".shop", ".club", ".vip", ".work", ".ltd",
            ".group", ".ink", ".design", ".website", ".space", ".press", ".host", ".fun",
        ];
        Self {
            regional_whitelist: vec![],
            global_whitelist: vec![],
            regional_suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 第三方 favicon 服务，`{host}` 会被替换为目标域名
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub google: String,
    pub duckduckgo: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            google: "https://www.google.com/s2/favicons?domain={host}".to_string(),
            duckduckgo: "https://icons.duckduckgo.com/ip3/{host}.ico".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// 超过该时长的缓存文件在启动时被清理
    pub cleanup_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            cleanup_ttl_secs: 2_592_000, // 30 天
        }
    }
}

impl CacheConfig {
    pub fn cleanup_ttl(&self) -> Duration {
        Duration::from_secs(self.cleanup_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaviconConfig {
    pub cache: CacheConfig,
    pub fetch: FetchOptions,
    pub proxy: ProxyConfig,
    pub domains: DomainLists,
    pub services: ServiceConfig,
}

impl FaviconConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: FaviconConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
