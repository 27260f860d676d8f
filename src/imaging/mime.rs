//! 基于内容的 MIME 检测

use image::ImageFormat;

pub const PNG_MIME: &str = "image/png";
pub const SVG_MIME: &str = "image/svg+xml";

const SNIFF_WINDOW: usize = 4096;

/// 根据内容判断 MIME 类型，不信任扩展名和响应头
pub fn sniff_mime(content: &[u8]) -> String {
    // 只认可常见的网页图片格式，单字节魔数的格式容易误判
    if let Ok(format) = image::guess_format(content) {
        if matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Gif
                | ImageFormat::WebP
                | ImageFormat::Ico
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::Avif
        ) {
            return format.to_mime_type().to_string();
        }
    }

    let head = leading_text(content);
    if looks_like_svg(&head) {
        return SVG_MIME.to_string();
    }
    if head.starts_with('<') && (head.contains("<html") || head.starts_with("<!doctype html")) {
        return "text/html".to_string();
    }
    if std::str::from_utf8(content).is_ok() {
        return "text/plain".to_string();
    }
    "application/octet-stream".to_string()
}

/// 去掉 BOM 与前导空白后的前若干字节（小写）
fn leading_text(content: &[u8]) -> String {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    let window = &content[..content.len().min(SNIFF_WINDOW)];
    String::from_utf8_lossy(window)
        .trim_start()
        .to_ascii_lowercase()
}

/// 跳过 XML 声明、注释和 SVG doctype 后，第一个元素必须是 `<svg`
fn looks_like_svg(head: &str) -> bool {
    let mut rest = head;
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("<svg") {
            return after.starts_with(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/');
        }
        let skipped = if rest.starts_with("<?") {
            rest.find("?>").map(|i| i + 2)
        } else if rest.starts_with("<!--") {
            rest.find("-->").map(|i| i + 3)
        } else if rest.starts_with("<!doctype svg") {
            rest.find('>').map(|i| i + 1)
        } else {
            None
        };
        match skipped {
            Some(end) => rest = &rest[end..],
            None => return false,
        }
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// 是否为规范格式（PNG 或 SVG）
pub fn is_canonical(mime: &str) -> bool {
    mime == PNG_MIME || mime == SVG_MIME
}

/// 去掉参数并转为小写：`Image/PNG; charset=x` -> `image/png`
pub fn normalize_content_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 校验下载内容是否为图片，返回检测到的 MIME
///
/// 内容非空；若有 Content-Type 必须以 `image/` 开头；内容检测也必须是图片。
pub fn validate_icon(content: &[u8], content_type: Option<&str>) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    if let Some(header) = content_type {
        let header = normalize_content_type(header);
        if !header.is_empty() && !is_image_mime(&header) {
            log::debug!("Content-Type 不是图片: {}", header);
            return None;
        }
    }
    let sniffed = sniff_mime(content);
    if !is_image_mime(&sniffed) {
        log::debug!("内容检测不是图片: {}", sniffed);
        return None;
    }
    Some(sniffed)
}

/// MIME 对应的缓存文件扩展名，未知类型按 png 处理
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        _ => "png",
    }
}
