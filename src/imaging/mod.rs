//! 图片格式检测与转换

mod mime;
mod normalizer;

pub use mime::{
    PNG_MIME, SVG_MIME, extension_for_mime, is_canonical, is_image_mime, normalize_content_type,
    sniff_mime, validate_icon,
};
#[cfg(feature = "svg")]
pub use normalizer::VectorBackend;
pub use normalizer::{ConversionBackend, ImageNormalizer, RasterBackend, encode_png};
