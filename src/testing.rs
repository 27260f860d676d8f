//! 单元测试用的传输层替身

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::FetchError;
use crate::fetch::{FetchRequest, FetchedResponse, Transport};

#[derive(Default)]
struct Route {
    failures_left: u32,
    response: Option<FetchedResponse>,
}

/// 按 URL 返回预设响应，未注册的 URL 返回 404
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: Vec<u8>, content_type: Option<&str>) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(url.to_string()).or_default().response =
            Some(FetchedResponse::new(body, content_type));
    }

    /// 前 `times` 次请求返回网络错误
    pub fn fail_times(&self, url: &str, times: u32) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(url.to_string()).or_default().failures_left = times;
    }

    pub fn hits(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    pub fn proxies_used(&self, url: &str) -> Vec<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn requested(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, request: FetchRequest<'_>) -> Result<FetchedResponse, FetchError> {
        self.calls.lock().unwrap().push((
            request.url.to_string(),
            request.proxy.map(|p| p.name.clone()),
        ));

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(request.url) {
            Some(route) if route.failures_left > 0 => {
                route.failures_left -= 1;
                Err(FetchError::Transport("connection reset".to_string()))
            }
            Some(Route {
                response: Some(response),
                ..
            }) => Ok(response.clone()),
            _ => Err(FetchError::Status(404)),
        }
    }
}
