use crate::utils::error::DigitError;
use crate::Result;
use image::{DynamicImage, GrayImage, Luma};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// 预处理的统一输入：(H, W, C) 排列的 f32 像素网格
///
/// 所有前端（画布、上传、批处理文件）都先转换成 `PixelGrid` 再进入预处理。
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    data: Array3<f32>,
}

impl PixelGrid {
    pub fn new(data: Array3<f32>) -> Result<Self> {
        let (height, width, channels) = data.dim();
        if height == 0 || width == 0 || channels == 0 {
            return Err(DigitError::ImageLoad(format!(
                "zero-dimension image array: {}x{}x{}",
                height, width, channels
            )));
        }
        Ok(Self { data })
    }

    /// 单通道二维网格
    pub fn from_2d(data: Array2<f32>) -> Result<Self> {
        Self::new(data.insert_axis(Axis(2)))
    }

    /// 8位灰度原始数据（行优先）
    pub fn from_gray_u8(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(DigitError::ImageLoad(format!(
                "pixel buffer has {} bytes, expected {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        let data = Array2::from_shape_vec(
            (height, width),
            pixels.into_iter().map(f32::from).collect(),
        )
        .map_err(|e| DigitError::ImageLoad(e.to_string()))?;
        Self::from_2d(data)
    }

    /// 转换DynamicImage，灰度图保留单通道，彩色图保留RGB三通道（丢弃alpha）
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        if image.color().has_color() {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            let data = Array3::from_shape_vec(
                (height as usize, width as usize, 3),
                rgb.into_raw().into_iter().map(f32::from).collect(),
            )
            .map_err(|e| DigitError::ImageLoad(e.to_string()))?;
            Self::new(data)
        } else {
            Self::from_luma(&image.to_luma8())
        }
    }

    pub fn from_luma(image: &GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::from_gray_u8(width as usize, height as usize, image.as_raw().clone())
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 取出单个通道
    pub fn channel(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.channels()).then(|| self.data.index_axis(Axis(2), index))
    }
}

/// 强度范围，仅依据最大值判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntensityScale {
    /// [0, 1]
    Unit,
    /// [0, 255]
    EightBit,
}

impl IntensityScale {
    pub const EIGHT_BIT_MAX: f32 = 255.0;

    /// 最大值超过1.0即视为8位强度。
    /// 近乎全黑的8位图像（最大值≤1）会被当作已归一化，这是已知的启发式边界情况。
    pub fn detect(plane: &ArrayView2<'_, f32>) -> Self {
        let max = plane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max > 1.0 {
            IntensityScale::EightBit
        } else {
            IntensityScale::Unit
        }
    }

    pub fn ceiling(&self) -> f32 {
        match self {
            IntensityScale::Unit => 1.0,
            IntensityScale::EightBit => Self::EIGHT_BIT_MAX,
        }
    }
}

/// 模型输入张量：形状 (1, H, W)，取值 [0, 1]，亮字暗底
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array3<f32>,
}

impl NormalizedTensor {
    /// 校验形状与取值后构造
    pub fn try_from_array(data: Array3<f32>) -> Result<Self> {
        let (batch, height, width) = data.dim();
        if batch != 1 || height == 0 || width == 0 {
            return Err(DigitError::Preprocess(format!(
                "expected tensor shape (1, H, W), got ({}, {}, {})",
                batch, height, width
            )));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(DigitError::Preprocess(format!(
                "tensor value {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { data })
    }

    /// 全背景（全0）张量
    pub fn blank(height: usize, width: usize) -> Self {
        Self {
            data: Array3::zeros((1, height, width)),
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// 转回8位灰度图，便于调试查看
    pub fn to_gray_image(&self) -> GrayImage {
        let (_, height, width) = self.data.dim();
        let plane = self.data.index_axis(Axis(0), 0);
        GrayImage::from_fn(width as u32, height as u32, |x, y| {
            let value = plane[[y as usize, x as usize]];
            Luma([(value * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }
}
