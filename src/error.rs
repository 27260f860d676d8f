//! 错误类型定义
//! 只有初始化阶段的错误会对外抛出，单次请求内的错误都在管线内部被吸收

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 初始化/配置错误（无法恢复，直接返回给调用方）
#[derive(Debug, Error)]
pub enum FaviconError {
    #[error("无法创建缓存目录 {path:?}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("配置文件读取失败: {0}")]
    ConfigIo(#[from] io::Error),

    #[error("配置文件解析失败: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("HTTP 客户端初始化失败: {0}")]
    Client(#[from] reqwest::Error),
}

/// 网络请求错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP 状态码异常: {0}")]
    Status(u16),

    #[error("响应内容为空")]
    EmptyBody,

    #[error("传输层错误: {0}")]
    Transport(String),

    #[error("重试 {attempts} 次后仍然失败: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// 图片格式转换错误
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("解码失败: {0}")]
    Decode(String),

    #[error("渲染失败: {0}")]
    Render(String),

    #[error("编码失败: {0}")]
    Encode(String),
}

pub type Result<T, E = FaviconError> = std::result::Result<T, E>;
