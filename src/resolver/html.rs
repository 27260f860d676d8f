//! HTML 中的图标链接提取与相对地址解析

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    // 按优先级排列，第一个命中的模式胜出
    static ref ICON_LINK_PATTERNS: Vec<Regex> = [
        r#"(?i)<link[^>]+rel=["'](?:shortcut )?icon["'][^>]+href=["']([^"']+)["']"#,
        r#"(?i)<link[^>]+href=["']([^"']+)["'][^>]+rel=["'](?:shortcut )?icon["']"#,
        r#"(?i)<link[^>]+rel=["']apple-touch-icon["'][^>]+href=["']([^"']+)["']"#,
        r#"(?i)<link[^>]+href=["']([^"']+)["'][^>]+rel=["']apple-touch-icon["']"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect();
}

/// 补全 `http://` 前缀并去掉末尾的 `/`
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    let mut normalized = if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    while normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// 返回页面中第一个图标链接的原始 href
pub fn find_icon_href(html: &str) -> Option<String> {
    ICON_LINK_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `scheme://host[:port]`
pub fn authority(page: &Url) -> String {
    match (page.host_str(), page.port()) {
        (Some(host), Some(port)) => format!("{}://{}:{}", page.scheme(), host, port),
        (Some(host), None) => format!("{}://{}", page.scheme(), host),
        _ => format!("{}://", page.scheme()),
    }
}

/// 将 href 解析为绝对地址
pub fn resolve_href(href: &str, page: &Url) -> String {
    if href.starts_with("//") {
        return format!("{}:{}", page.scheme(), href);
    }
    if href.starts_with("http") {
        return href.to_string();
    }
    if href.starts_with('/') {
        return format!("{}{}", authority(page), href);
    }

    let path = page.path();
    let dir = path.rfind('/').map(|i| &path[..i]).unwrap_or_default();
    format!("{}{}/{}", authority(page), dir, href)
}
