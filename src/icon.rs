use serde::Serialize;

/// 一次图标请求的结果，构造后不可修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconResult {
    #[serde(skip)]
    content: Vec<u8>,
    mime: String,
    cached: bool,
}

impl IconResult {
    pub fn new(content: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            content,
            mime: mime.into(),
            cached: false,
        }
    }

    pub(crate) fn from_cache(content: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            content,
            mime: mime.into(),
            cached: true,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}
