//! 网站图标获取：缓存、多来源解析、代理与重试、格式规范化、占位图

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod favicon;
pub mod fetch;
mod icon;
pub mod imaging;
pub mod placeholder;
pub mod proxy;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use cache::CacheStore;
pub use config::FaviconConfig;
pub use error::{ConversionError, FaviconError, FetchError};
pub use favicon::FaviconFetcher;
pub use icon::IconResult;
