//! HTTP 传输层：基于 reqwest 的单次 GET 请求

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

use crate::config::FetchOptions;
use crate::error::{FaviconError, FetchError};
use crate::proxy::ProxyDescriptor;

/// 单次请求参数
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    pub proxy: Option<&'a ProxyDescriptor>,
    pub timeout: Duration,
}

/// 成功的响应（状态码 2xx）
#[derive(Debug, Clone, Default)]
pub struct FetchedResponse {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedResponse {
    pub fn new(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// 传输层接口，非 2xx 状态码必须返回错误
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: FetchRequest<'_>) -> Result<FetchedResponse, FetchError>;
}

/// 默认传输层实现
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    user_agent: String,
    accept_invalid_certs: bool,
    direct: Client,
}

impl ReqwestTransport {
    pub fn new(options: &FetchOptions) -> Result<Self, FaviconError> {
        let direct = Self::builder(&options.user_agent, options.accept_invalid_certs)
            .no_proxy()
            .build()?;
        Ok(Self {
            user_agent: options.user_agent.clone(),
            accept_invalid_certs: options.accept_invalid_certs,
            direct,
        })
    }

    fn builder(user_agent: &str, accept_invalid_certs: bool) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(accept_invalid_certs)
    }

    /// 每个代理单独创建客户端
    fn create_proxied_client(&self, proxy: &ProxyDescriptor) -> Result<Client, FetchError> {
        let mut builder = Self::builder(&self.user_agent, self.accept_invalid_certs).no_proxy();

        if let Some(http_url) = &proxy.http_url {
            builder = builder.proxy(reqwest::Proxy::http(http_url)?);
        }
        if let Some(https_url) = &proxy.https_url {
            builder = builder.proxy(reqwest::Proxy::https(https_url)?);
        }

        Ok(builder.build()?)
    }
}

fn build_header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            log::debug!("忽略无效的请求头: {}", name);
            continue;
        };
        map.insert(name, value);
    }
    map
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: FetchRequest<'_>) -> Result<FetchedResponse, FetchError> {
        let target = reqwest::Url::parse(request.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let proxied;
        let client = match request.proxy {
            Some(proxy) => {
                proxied = self.create_proxied_client(proxy)?;
                &proxied
            }
            None => &self.direct,
        };

        let response = client
            .get(target)
            .headers(build_header_map(request.headers))
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?.to_vec();

        Ok(FetchedResponse { body, content_type })
    }
}
