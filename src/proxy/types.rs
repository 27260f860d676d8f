//! 代理服务器描述与健康记录结构体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_weight() -> u32 {
    1
}

/// 代理服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    /// 代理名称（健康记录的键）
    pub name: String,
    /// 用于 http:// 目标的代理地址
    #[serde(default)]
    pub http_url: Option<String>,
    /// 用于 https:// 目标的代理地址
    #[serde(default)]
    pub https_url: Option<String>,
    /// 加权随机选择的权重
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl ProxyDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            http_url: None,
            https_url: None,
            weight: 1,
        }
    }

    pub fn with_http(mut self, url: impl Into<String>) -> Self {
        self.http_url = Some(url.into());
        self
    }

    pub fn with_https(mut self, url: impl Into<String>) -> Self {
        self.https_url = Some(url.into());
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// 权重为 0 的配置按 1 处理
    pub fn effective_weight(&self) -> u64 {
        u64::from(self.weight.max(1))
    }
}

/// 代理健康状态，按代理名称保存
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyHealthRecord {
    /// 连续失败次数
    pub fails: u32,
    pub last_fail: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
}

impl ProxyHealthRecord {
    /// 失败次数达到阈值且仍处于恢复期内
    pub fn in_penalty_box(
        &self,
        now: DateTime<Utc>,
        fail_threshold: u32,
        recovery: chrono::Duration,
    ) -> bool {
        if self.fails < fail_threshold {
            return false;
        }
        match self.last_fail {
            Some(last_fail) => now - last_fail < recovery,
            None => false,
        }
    }

    /// 从未检查过的代理视为需要检查
    pub fn needs_check(&self, now: DateTime<Utc>, interval: chrono::Duration) -> bool {
        match self.last_check {
            Some(last_check) => now - last_check > interval,
            None => true,
        }
    }

    pub fn mark_failure(&mut self, at: DateTime<Utc>) {
        self.fails = self.fails.saturating_add(1);
        self.last_fail = Some(at);
    }

    pub fn mark_healthy(&mut self, at: DateTime<Utc>) {
        self.fails = 0;
        self.last_check = Some(at);
    }
}
