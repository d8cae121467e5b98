use crate::image::grid::{IntensityScale, PixelGrid};
use crate::utils::error::DigitError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2};

/// 图像变换工具集
pub struct ImageTransforms;

impl ImageTransforms {
    /// 取单个通道（不做亮度加权平均）
    pub fn select_channel(grid: &PixelGrid, channel: usize) -> Result<Array2<f32>> {
        grid.channel(channel)
            .map(|plane| plane.to_owned())
            .ok_or_else(|| {
                DigitError::Preprocess(format!(
                    "channel {} requested from image with {} channel(s)",
                    channel,
                    grid.channels()
                ))
            })
    }

    /// 单通道平面缩放到 (target_height, target_width)
    ///
    /// 先除以强度上限映射到[0,1]再插值，结果乘回原尺度；滤波器过冲被截断到该尺度范围内。
    pub fn resize(
        plane: &ArrayView2<'_, f32>,
        target_height: usize,
        target_width: usize,
        filter: FilterType,
        scale: IntensityScale,
    ) -> Result<Array2<f32>> {
        if target_height == 0 || target_width == 0 {
            return Err(DigitError::Preprocess(format!(
                "cannot resize to {}x{}",
                target_width, target_height
            )));
        }
        if matches!(filter, FilterType::Nearest) {
            return Err(DigitError::Preprocess(
                "nearest-neighbour resampling is not allowed".to_string(),
            ));
        }

        let (height, width) = plane.dim();
        let ceiling = scale.ceiling();
        let raw: Vec<f32> = plane.iter().map(|v| v / ceiling).collect();
        let source: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(width as u32, height as u32, raw).ok_or_else(|| {
                DigitError::Preprocess(format!(
                    "buffer does not match {}x{} plane",
                    width, height
                ))
            })?;

        let resized = imageops::resize(
            &source,
            target_width as u32,
            target_height as u32,
            filter,
        );

        let values = resized
            .into_raw()
            .into_iter()
            .map(|v| (v * ceiling).clamp(0.0, ceiling))
            .collect();
        Array2::from_shape_vec((target_height, target_width), values)
            .map_err(|e| DigitError::Preprocess(e.to_string()))
    }

    /// 强度翻转：v -> max - v
    pub fn invert(plane: &mut Array2<f32>, scale: IntensityScale) {
        let ceiling = scale.ceiling();
        plane.mapv_inplace(|v| ceiling - v);
    }

    /// 最大值超过1.0时按8位强度除以255
    pub fn normalize(plane: &mut Array2<f32>) -> bool {
        let max = plane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max > 1.0 {
            plane.mapv_inplace(|v| v / IntensityScale::EIGHT_BIT_MAX);
            true
        } else {
            false
        }
    }
}
