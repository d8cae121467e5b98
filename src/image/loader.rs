use crate::utils::error::DigitError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// 解码后图像的最大字节数
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// 从base64字符串加载图像
    pub fn from_base64(base64_data: &str) -> Result<DynamicImage> {
        let base64_clean = Self::strip_data_url(base64_data.trim());
        if base64_clean.is_empty() {
            return Err(DigitError::ImageLoad("empty image payload".to_string()));
        }

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean)?;
        Self::from_bytes(&image_bytes)
    }

    /// 移除数据URL前缀 (data:image/xxx;base64,)
    pub fn strip_data_url(data: &str) -> &str {
        if !data.starts_with("data:") {
            return data;
        }
        match data.split_once(',') {
            Some((header, payload)) if header.ends_with(";base64") => payload,
            _ => data,
        }
    }

    /// 从字节加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(DigitError::ImageLoad("no image data found".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DigitError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(DigitError::UnsupportedFormat(format!("{:?}", format)));
            }
        }

        let image = image::load_from_memory(bytes)?;
        Self::validate_dimensions(&image)?;
        Ok(image)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: &Path) -> Result<DynamicImage> {
        if !path.is_file() {
            return Err(DigitError::ImageLoad(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path).map_err(|e| {
            DigitError::ImageLoad(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Gif
                | ImageFormat::Tiff
                | ImageFormat::WebP
        )
    }

    fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DigitError::ImageLoad(format!(
                "zero-dimension image: {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(())
    }
}
