//! 图片规范化：把非 PNG 的图片转换为带 alpha 通道的 PNG
//! 按顺序尝试各个后端，第一个接受该格式并转换成功的胜出

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage, imageops};

use super::mime::{SVG_MIME, is_image_mime};
use crate::error::ConversionError;

/// 转换后端
pub trait ConversionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// 是否能处理该 MIME
    fn accepts(&self, mime: &str) -> bool;

    /// 返回 PNG 字节
    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

/// 最高压缩等级编码 PNG
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, ConversionError> {
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ConversionError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// 位图后端：通用解码后复制到全透明画布上
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterBackend;

impl ConversionBackend for RasterBackend {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn accepts(&self, mime: &str) -> bool {
        is_image_mime(mime) && mime != SVG_MIME
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let decoded =
            image::load_from_memory(content).map_err(|e| ConversionError::Decode(e.to_string()))?;
        let source = decoded.to_rgba8();

        let mut canvas =
            RgbaImage::from_pixel(source.width(), source.height(), Rgba([255, 255, 255, 0]));
        imageops::replace(&mut canvas, &source, 0, 0);

        encode_png(&canvas)
    }
}

/// 矢量后端：resvg 在透明背景上光栅化 SVG
#[cfg(feature = "svg")]
#[derive(Debug, Default, Clone, Copy)]
pub struct VectorBackend;

#[cfg(feature = "svg")]
impl ConversionBackend for VectorBackend {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn accepts(&self, mime: &str) -> bool {
        mime == SVG_MIME
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConversionError> {
        use resvg::{tiny_skia, usvg};

        let options = usvg::Options::default();
        let tree = usvg::Tree::from_data(content, &options)
            .map_err(|e| ConversionError::Decode(format!("Failed to parse SVG: {e}")))?;

        let size = tree.size().to_int_size();
        let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
            ConversionError::Render(format!(
                "无法创建 {}x{} 画布",
                size.width(),
                size.height()
            ))
        })?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let mut canvas = RgbaImage::new(pixmap.width(), pixmap.height());
        for (dst, src) in canvas.pixels_mut().zip(pixmap.pixels()) {
            let color = src.demultiply();
            *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        encode_png(&canvas)
    }
}

pub struct ImageNormalizer {
    backends: Vec<Box<dyn ConversionBackend>>,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        let mut backends: Vec<Box<dyn ConversionBackend>> = Vec::new();
        #[cfg(feature = "svg")]
        backends.push(Box::new(VectorBackend));
        backends.push(Box::new(RasterBackend));
        Self { backends }
    }
}

impl ImageNormalizer {
    pub fn new(backends: Vec<Box<dyn ConversionBackend>>) -> Self {
        Self { backends }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// 转换为 PNG，`None` 表示保持原样
    pub fn to_canonical_form(&self, content: &[u8], mime: &str) -> Option<Vec<u8>> {
        for backend in self.backends.iter().filter(|b| b.accepts(mime)) {
            match backend.convert(content) {
                Ok(png) => return Some(png),
                Err(e) => log::debug!("{} 后端转换 {} 失败: {}", backend.name(), mime, e),
            }
        }
        None
    }
}
