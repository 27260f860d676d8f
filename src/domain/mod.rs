//! 域名分类：判断目标域名属于中国大陆（regional）还是境外（global）
//! 仅基于静态名单和后缀，不做 DNS 或 IP 归属查询

use crate::config::DomainLists;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Regional,
    Global,
}

#[derive(Debug, Clone)]
pub struct DomainClassifier {
    regional_whitelist: Vec<String>,
    global_whitelist: Vec<String>,
    regional_suffixes: Vec<String>,
}

impl DomainClassifier {
    pub fn new(lists: &DomainLists) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            regional_whitelist: lower(&lists.regional_whitelist),
            global_whitelist: lower(&lists.global_whitelist),
            regional_suffixes: lower(&lists.regional_suffixes),
        }
    }

    /// 按顺序匹配，先命中者生效
    pub fn classify(&self, host: &str) -> Region {
        let host = host.trim().trim_end_matches('.').to_ascii_lowercase();

        if self.regional_whitelist.iter().any(|d| matches_domain(&host, d)) {
            return Region::Regional;
        }
        // 境外白名单优先于后缀规则
        if self.global_whitelist.iter().any(|d| matches_domain(&host, d)) {
            return Region::Global;
        }
        if self.regional_suffixes.iter().any(|s| host.ends_with(s.as_str())) {
            return Region::Regional;
        }
        Region::Global
    }

    pub fn is_regional(&self, host: &str) -> bool {
        self.classify(host) == Region::Regional
    }
}

/// 完全相同，或者是该域名的子域名
fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}
