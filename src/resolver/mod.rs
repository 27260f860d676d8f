//! 图标解析：按来源顺序查找，全部失败时生成占位图

mod html;
mod sources;

pub use html::{find_icon_href, normalize_url, resolve_href};
pub use sources::{
    ConventionalPathSource, ExternalServiceSource, HtmlLinkSource, IconSource, Target,
    download_icon,
};

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::fetch::ResilientFetcher;
use crate::icon::IconResult;
use crate::imaging::SVG_MIME;
use crate::placeholder::PlaceholderGenerator;

pub struct IconResolver {
    sources: Vec<Box<dyn IconSource>>,
    placeholder: PlaceholderGenerator,
}

impl IconResolver {
    /// 默认顺序：页面声明、常见路径、Google、DuckDuckGo
    pub fn new(fetcher: Arc<ResilientFetcher>, services: &ServiceConfig) -> Self {
        let sources: Vec<Box<dyn IconSource>> = vec![
            Box::new(HtmlLinkSource::new(fetcher.clone())),
            Box::new(ConventionalPathSource::new(fetcher.clone())),
            Box::new(ExternalServiceSource::new(
                "google",
                services.google.clone(),
                fetcher.clone(),
            )),
            Box::new(ExternalServiceSource::new(
                "duckduckgo",
                services.duckduckgo.clone(),
                fetcher,
            )),
        ];
        Self::with_sources(sources)
    }

    pub fn with_sources(sources: Vec<Box<dyn IconSource>>) -> Self {
        Self {
            sources,
            placeholder: PlaceholderGenerator::new(),
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// 总会返回非空的图片
    pub async fn resolve(&self, url: &str) -> IconResult {
        let target = Target::new(url);

        for source in &self.sources {
            if let Some(icon) = source.attempt(&target).await {
                log::debug!("{} 来自 {} ({})", target.host, source.name(), icon.mime());
                return icon;
            }
            log::debug!("{} 未能从 {} 获取图标", target.host, source.name());
        }

        log::debug!("{} 使用占位图", target.host);
        IconResult::new(self.placeholder.generate(&target.host), SVG_MIME)
    }
}
