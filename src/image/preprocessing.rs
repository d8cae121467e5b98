use crate::image::grid::{IntensityScale, NormalizedTensor, PixelGrid};
use crate::image::transforms::ImageTransforms;
use crate::utils::error::DigitError;
use crate::Result;
use image::imageops::FilterType;

/// 模型训练时的输入边长
pub const MODEL_INPUT_SIZE: usize = 28;

/// 预处理选项
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub target_height: usize,
    pub target_width: usize,
    /// 暗字亮底输入需要翻转成亮字暗底
    pub invert: bool,
    /// 缩放插值滤波器，不允许最近邻
    pub filter: FilterType,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            target_height: MODEL_INPUT_SIZE,
            target_width: MODEL_INPUT_SIZE,
            invert: true,
            filter: FilterType::CatmullRom,
        }
    }
}

impl PreprocessOptions {
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// 从名称解析滤波器（用于命令行）
    pub fn parse_filter(name: &str) -> Result<FilterType> {
        match name.to_ascii_lowercase().as_str() {
            "triangle" | "bilinear" => Ok(FilterType::Triangle),
            "catmullrom" | "catmull-rom" | "bicubic" => Ok(FilterType::CatmullRom),
            "gaussian" => Ok(FilterType::Gaussian),
            "lanczos3" | "lanczos" => Ok(FilterType::Lanczos3),
            other => Err(DigitError::Config(format!(
                "unknown resize filter '{}', expected one of: triangle, catmullrom, gaussian, lanczos3",
                other
            ))),
        }
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 把任意像素网格规范化为模型输入张量 (1, H, W)
    ///
    /// 步骤顺序固定：取通道0 -> 尺寸不符时缩放 -> 可选翻转 -> 最大值超过1时除以255 -> 加batch维。
    pub fn preprocess(grid: &PixelGrid, options: &PreprocessOptions) -> Result<NormalizedTensor> {
        let (target_h, target_w) = (options.target_height, options.target_width);
        if target_h == 0 || target_w == 0 {
            return Err(DigitError::Preprocess(format!(
                "target size must be non-zero, got {}x{}",
                target_w, target_h
            )));
        }

        // 1. 多通道只取第一个通道
        let mut plane = ImageTransforms::select_channel(grid, 0)?;
        Self::validate_intensities(&plane)?;
        let scale = IntensityScale::detect(&plane.view());

        // 2. 尺寸一致时原样通过
        if plane.dim() != (target_h, target_w) {
            tracing::debug!(
                "Resizing {}x{} -> {}x{} ({:?})",
                plane.ncols(),
                plane.nrows(),
                target_w,
                target_h,
                options.filter
            );
            let resized =
                ImageTransforms::resize(&plane.view(), target_h, target_w, options.filter, scale)?;
            plane = resized;
        }

        // 3.
        if options.invert {
            ImageTransforms::invert(&mut plane, scale);
        }

        // 4.
        ImageTransforms::normalize(&mut plane);

        // 5.
        NormalizedTensor::try_from_array(plane.insert_axis(ndarray::Axis(0)))
    }

    fn validate_intensities(plane: &ndarray::Array2<f32>) -> Result<()> {
        let max = IntensityScale::EIGHT_BIT_MAX;
        match plane.iter().find(|v| !v.is_finite() || **v < 0.0 || **v > max) {
            Some(bad) => Err(DigitError::Preprocess(format!(
                "pixel value {} outside the supported range 0..={}",
                bad, max
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, Axis};

    fn unit_pattern(height: usize, width: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| ((y * width + x) % 97) as f32 / 96.0)
    }

    #[test]
    fn normalized_input_at_target_size_passes_through_unchanged() {
        let plane = unit_pattern(28, 28);
        let grid = PixelGrid::from_2d(plane.clone()).unwrap();
        let options = PreprocessOptions::default().with_invert(false);

        let tensor = ImagePreprocessor::preprocess(&grid, &options).unwrap();

        assert_eq!(tensor.shape(), (1, 28, 28));
        assert_eq!(tensor.into_array(), plane.insert_axis(Axis(0)));
    }

    #[test]
    fn output_shape_is_fixed_regardless_of_input_size() {
        for (h, w, c) in [(200, 200, 1), (7, 13, 3), (28, 28, 4), (300, 41, 1), (1, 1, 1)] {
            let grid = PixelGrid::new(Array3::from_elem((h, w, c), 255.0)).unwrap();
            let tensor = ImagePreprocessor::preprocess(&grid, &PreprocessOptions::default()).unwrap();
            assert_eq!(tensor.shape(), (1, 28, 28), "input {h}x{w}x{c}");
        }
    }

    #[test]
    fn inverting_twice_restores_the_original() {
        let plane = unit_pattern(28, 28);
        let grid = PixelGrid::from_2d(plane.clone()).unwrap();
        let options = PreprocessOptions::default();

        let once = ImagePreprocessor::preprocess(&grid, &options).unwrap();
        let once_grid = PixelGrid::from_2d(once.into_array().remove_axis(Axis(0))).unwrap();
        let twice = ImagePreprocessor::preprocess(&once_grid, &options).unwrap();

        for (a, b) in twice.view().iter().zip(plane.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn eight_bit_canvas_is_inverted_and_scaled() {
        // 白底黑字
        let mut plane = Array2::from_elem((28, 28), 255.0f32);
        plane[[14, 14]] = 0.0;
        let grid = PixelGrid::from_2d(plane).unwrap();

        let tensor = ImagePreprocessor::preprocess(&grid, &PreprocessOptions::default()).unwrap();
        let view = tensor.view();
        assert_eq!(view[[0, 14, 14]], 1.0);
        assert_eq!(view[[0, 0, 0]], 0.0);
    }

    #[test]
    fn only_the_first_channel_is_used() {
        let mut data = Array3::<f32>::zeros((28, 28, 3));
        data.index_axis_mut(Axis(2), 1).fill(255.0);
        data.index_axis_mut(Axis(2), 2).fill(255.0);
        let grid = PixelGrid::new(data).unwrap();
        let options = PreprocessOptions::default().with_invert(false);

        let tensor = ImagePreprocessor::preprocess(&grid, &options).unwrap();
        assert!(tensor.view().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn resized_values_stay_within_unit_range() {
        let plane = Array2::from_shape_fn((200, 200), |(y, x)| {
            if (60..140).contains(&x) && (20..180).contains(&y) {
                0.0
            } else {
                255.0
            }
        });
        let grid = PixelGrid::from_2d(plane).unwrap();
        let options = PreprocessOptions::default().with_filter(FilterType::Lanczos3);

        let tensor = ImagePreprocessor::preprocess(&grid, &options).unwrap();
        assert!(tensor.view().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(tensor.view()[[0, 14, 14]] > 0.9);
    }

    #[test]
    fn out_of_range_pixels_are_a_preprocessing_failure() {
        let grid = PixelGrid::from_2d(Array2::from_elem((28, 28), 300.0)).unwrap();
        let err = ImagePreprocessor::preprocess(&grid, &PreprocessOptions::default()).unwrap_err();
        assert!(matches!(err, DigitError::Preprocess(_)));

        let grid = PixelGrid::from_2d(Array2::from_elem((28, 28), f32::NAN)).unwrap();
        assert!(ImagePreprocessor::preprocess(&grid, &PreprocessOptions::default()).is_err());
    }

    #[test]
    fn zero_target_size_is_rejected() {
        let grid = PixelGrid::from_2d(Array2::zeros((28, 28))).unwrap();
        let options = PreprocessOptions {
            target_height: 0,
            ..PreprocessOptions::default()
        };
        let err = ImagePreprocessor::preprocess(&grid, &options).unwrap_err();
        assert!(matches!(err, DigitError::Preprocess(_)));
    }

    #[test]
    fn filter_names_parse() {
        assert!(matches!(
            PreprocessOptions::parse_filter("Lanczos3"),
            Ok(FilterType::Lanczos3)
        ));
        assert!(matches!(
            PreprocessOptions::parse_filter("bicubic"),
            Ok(FilterType::CatmullRom)
        ));
        assert!(PreprocessOptions::parse_filter("nearest").is_err());
    }
}
