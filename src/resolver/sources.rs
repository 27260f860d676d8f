//! 图标来源，按顺序逐个尝试

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use super::html::{authority, find_icon_href, normalize_url, resolve_href};
use crate::fetch::{HTML_ACCEPT, ResilientFetcher};
use crate::icon::IconResult;
use crate::imaging::validate_icon;

const CONVENTIONAL_PREFIXES: [&str; 3] = ["", "/static", "/assets"];
const CONVENTIONAL_EXTENSIONS: [&str; 6] = ["ico", "png", "jpg", "jpeg", "svg", "gif"];

/// 一次解析的目标页面
#[derive(Debug, Clone)]
pub struct Target {
    pub url: String,
    pub page: Option<Url>,
    /// 页面主机名，解析失败时为规范化后的 URL
    pub host: String,
}

impl Target {
    pub fn new(raw: &str) -> Self {
        let url = normalize_url(raw);
        let page = Url::parse(&url).ok().filter(|u| u.host_str().is_some());
        let host = page
            .as_ref()
            .and_then(|u| u.host_str())
            .map(str::to_string)
            .unwrap_or_else(|| url.clone());
        Self { url, page, host }
    }
}

#[async_trait]
pub trait IconSource: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self, target: &Target) -> Option<IconResult>;
}

/// 下载并校验图标
pub async fn download_icon(fetcher: &ResilientFetcher, url: &str) -> Option<IconResult> {
    let response = match fetcher.fetch(url, &[]).await {
        Ok(response) => response,
        Err(e) => {
            log::debug!("下载图标 {} 失败: {}", url, e);
            return None;
        }
    };
    let mime = validate_icon(&response.body, response.content_type.as_deref())?;
    Some(IconResult::new(response.body, mime))
}

/// 页面 `<link>` 声明的图标
pub struct HtmlLinkSource {
    fetcher: Arc<ResilientFetcher>,
}

impl HtmlLinkSource {
    pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl IconSource for HtmlLinkSource {
    fn name(&self) -> &str {
        "html"
    }

    async fn attempt(&self, target: &Target) -> Option<IconResult> {
        let page = target.page.as_ref()?;
        let response = match self
            .fetcher
            .fetch(&target.url, &[("Accept", HTML_ACCEPT)])
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::debug!("获取页面 {} 失败: {}", target.url, e);
                return None;
            }
        };

        let html = String::from_utf8_lossy(&response.body);
        let href = find_icon_href(&html)?;
        let icon_url = resolve_href(&href, page);
        log::debug!("页面声明的图标: {}", icon_url);
        download_icon(&self.fetcher, &icon_url).await
    }
}

/// `/favicon.ico` 等常见路径
pub struct ConventionalPathSource {
    fetcher: Arc<ResilientFetcher>,
}

impl ConventionalPathSource {
    pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn candidates(page: &Url) -> Vec<String> {
        let base = authority(page);
        CONVENTIONAL_PREFIXES
            .iter()
            .flat_map(|prefix| {
                let base = &base;
                CONVENTIONAL_EXTENSIONS
                    .iter()
                    .map(move |ext| format!("{base}{prefix}/favicon.{ext}"))
            })
            .collect()
    }
}

#[async_trait]
impl IconSource for ConventionalPathSource {
    fn name(&self) -> &str {
        "conventional"
    }

    async fn attempt(&self, target: &Target) -> Option<IconResult> {
        let page = target.page.as_ref()?;
        for candidate in Self::candidates(page) {
            if let Some(icon) = download_icon(&self.fetcher, &candidate).await {
                return Some(icon);
            }
        }
        None
    }
}

/// 第三方图标服务，地址模板中的 `{host}` 会被替换
pub struct ExternalServiceSource {
    name: String,
    template: String,
    fetcher: Arc<ResilientFetcher>,
}

impl ExternalServiceSource {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        fetcher: Arc<ResilientFetcher>,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            fetcher,
        }
    }

    pub fn service_url(&self, host: &str) -> String {
        self.template.replace("{host}", &urlencoding::encode(host))
    }
}

#[async_trait]
impl IconSource for ExternalServiceSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, target: &Target) -> Option<IconResult> {
        let page = target.page.as_ref()?;
        let host = page.host_str()?;
        download_icon(&self.fetcher, &self.service_url(host)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_host_fallback() {
        let target = Target::new("example.com/");
        assert_eq!(target.url, "http://example.com");
        assert_eq!(target.host, "example.com");

        let broken = Target::new("http://");
        assert!(broken.page.is_none());
        assert_eq!(broken.host, "http:");
    }

    #[test]
    fn test_conventional_candidates_order() {
        let page = Url::parse("https://example.com:8080/a/b").unwrap();
        let candidates = ConventionalPathSource::candidates(&page);
        assert_eq!(candidates.len(), 18);
        assert_eq!(candidates[0], "https://example.com:8080/favicon.ico");
        assert_eq!(candidates[5], "https://example.com:8080/favicon.gif");
        assert_eq!(candidates[6], "https://example.com:8080/static/favicon.ico");
        assert_eq!(candidates[17], "https://example.com:8080/assets/favicon.gif");
    }
}
