//! 文件缓存：每个主机一个文件，文件名为 `{key}_{md5(key)}.{ext}`

use md5::{Digest, Md5};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use url::Url;

use crate::error::{FaviconError, Result};
use crate::icon::IconResult;
use crate::imaging::{
    ImageNormalizer, PNG_MIME, extension_for_mime, is_canonical, is_image_mime, sniff_mime,
};
use crate::resolver::normalize_url;

const CACHE_EXTENSIONS: [&str; 5] = ["png", "svg", "jpg", "gif", "ico"];

pub struct CacheStore {
    dir: PathBuf,
    normalizer: ImageNormalizer,
}

impl CacheStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_normalizer(dir, ImageNormalizer::default())
    }

    pub fn with_normalizer(dir: impl AsRef<Path>, normalizer: ImageNormalizer) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| FaviconError::CacheDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, normalizer })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 缓存键：主机名，解析失败时使用规范化后的 URL
    pub fn cache_key(url: &str) -> String {
        let normalized = normalize_url(url);
        Url::parse(&normalized)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or(normalized)
    }

    /// 不含扩展名的文件名
    pub fn entry_stem(key: &str) -> String {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{}", safe, hex::encode(Md5::digest(key.as_bytes())))
    }

    fn entry_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{ext}"))
    }

    /// 已存在的缓存文件，规范格式排在前面
    fn existing_entries(&self, stem: &str) -> Vec<PathBuf> {
        CACHE_EXTENSIONS
            .iter()
            .map(|ext| self.entry_path(stem, ext))
            .filter(|path| path.is_file())
            .collect()
    }

    /// 依次读取该键的缓存文件，损坏的文件会被删除
    pub fn lookup(&self, url: &str) -> Option<IconResult> {
        let stem = Self::entry_stem(&Self::cache_key(url));
        self.existing_entries(&stem)
            .into_iter()
            .find_map(|path| self.read_entry(&stem, path))
    }

    fn read_entry(&self, stem: &str, path: PathBuf) -> Option<IconResult> {
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("读取缓存 {} 失败: {}", path.display(), e);
                return None;
            }
        };
        let mime = sniff_mime(&content);
        if content.is_empty() || !is_image_mime(&mime) {
            log::debug!("缓存 {} 不是图片 ({})，已删除", path.display(), mime);
            let _ = fs::remove_file(&path);
            return None;
        }
        if is_canonical(&mime) {
            return Some(IconResult::from_cache(content, mime));
        }

        // 旧格式缓存：转换为 PNG 并替换
        match self.normalizer.to_canonical_form(&content, &mime) {
            Some(png) => {
                let png_path = self.entry_path(stem, "png");
                match fs::write(&png_path, &png) {
                    Ok(()) => {
                        if png_path != path {
                            let _ = fs::remove_file(&path);
                        }
                    }
                    Err(e) => log::debug!("写入缓存 {} 失败: {}", png_path.display(), e),
                }
                Some(IconResult::from_cache(png, PNG_MIME))
            }
            None => Some(IconResult::from_cache(content, mime)),
        }
    }

    /// 写入缓存并返回实际保存的内容，写入失败不影响返回值
    pub fn store(&self, url: &str, result: IconResult) -> IconResult {
        let stem = Self::entry_stem(&Self::cache_key(url));

        // SVG 原样保存，PNG 无需转换
        let persisted = if is_canonical(result.mime()) {
            result
        } else {
            match self.normalizer.to_canonical_form(result.content(), result.mime()) {
                Some(png) => IconResult::new(png, PNG_MIME),
                None => result,
            }
        };
        let ext = extension_for_mime(persisted.mime());

        for stale in self.existing_entries(&stem) {
            if stale.extension().and_then(|e| e.to_str()) != Some(ext) {
                let _ = fs::remove_file(stale);
            }
        }
        let path = self.entry_path(&stem, ext);
        if let Err(e) = fs::write(&path, persisted.content()) {
            log::debug!("写入缓存 {} 失败: {}", path.display(), e);
        }
        persisted
    }

    /// 删除修改时间早于 `now - ttl` 的缓存文件，返回删除数量
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("读取缓存目录 {} 失败: {}", self.dir.display(), e);
                return 0;
            }
        };
        let Some(cutoff) = SystemTime::now().checked_sub(ttl) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let expired = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
            if expired && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}
