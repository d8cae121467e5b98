use crate::{
    image::{ImageLoader, ImagePreprocessor, NormalizedTensor, PixelGrid, PreprocessOptions},
    models::DigitClassifier,
    recognition::types::Prediction,
    Result,
};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// 识别流水线：加载 -> 预处理 -> 推理
///
/// 克隆开销很小，所有克隆共享同一个只读模型。
#[derive(Clone)]
pub struct DigitRecognizer {
    classifier: Arc<dyn DigitClassifier>,
    options: PreprocessOptions,
}

/// 预处理张量与预测结果
#[derive(Debug, Clone)]
pub struct Recognition {
    pub tensor: NormalizedTensor,
    pub prediction: Prediction,
}

impl DigitRecognizer {
    pub fn new(classifier: Arc<dyn DigitClassifier>, options: PreprocessOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    pub fn preprocess(&self, grid: &PixelGrid) -> Result<NormalizedTensor> {
        ImagePreprocessor::preprocess(grid, &self.options)
    }

    pub fn predict(&self, tensor: &NormalizedTensor) -> Result<Prediction> {
        self.classifier.predict(tensor)
    }

    /// 处理像素网格
    pub fn recognize_grid(&self, grid: &PixelGrid) -> Result<Recognition> {
        let start_time = Instant::now();
        let tensor = self.preprocess(grid)?;
        let preprocessing_time = start_time.elapsed();

        let prediction = self.predict(&tensor)?;

        tracing::debug!(
            "Recognized {}x{}x{} grid as {} (preprocess={:.3}ms, total={:.3}ms)",
            grid.height(),
            grid.width(),
            grid.channels(),
            prediction.digit,
            preprocessing_time.as_secs_f64() * 1000.0,
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Recognition { tensor, prediction })
    }

    /// 画布截图：先转8位灰度（白底黑字）
    pub fn recognize_image(&self, image: &DynamicImage) -> Result<Recognition> {
        let grid = PixelGrid::from_luma(&image.to_luma8())?;
        self.recognize_grid(&grid)
    }

    /// 处理base64图像（可带数据URL前缀）
    pub fn recognize_base64(&self, base64_data: &str) -> Result<Recognition> {
        let image = ImageLoader::from_base64(base64_data)?;
        self.recognize_image(&image)
    }

    /// 处理图像文件，保留原始通道，预处理时取第一个通道
    pub fn recognize_path(&self, path: &Path) -> Result<Recognition> {
        let image = ImageLoader::from_path(path)?;
        let grid = PixelGrid::from_image(&image)?;
        self.recognize_grid(&grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::types::NUM_CLASSES;
    use crate::utils::error::{DigitError, ErrorStage};
    use base64::Engine;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// 按亮像素比例给出确定性的分布
    struct InkRatio;

    impl DigitClassifier for InkRatio {
        fn predict(&self, tensor: &NormalizedTensor) -> Result<Prediction> {
            crate::models::ensure_model_shape(tensor)?;
            let ink = tensor.view().iter().filter(|v| **v > 0.5).count() as f32;
            let total = tensor.view().len() as f32;
            let mut logits = [0.0f32; NUM_CLASSES];
            logits[((ink / total) * 9.0).round() as usize] = 5.0;
            Prediction::from_output(&logits)
        }

        fn name(&self) -> &str {
            "ink-ratio"
        }
    }

    fn recognizer() -> DigitRecognizer {
        DigitRecognizer::new(Arc::new(InkRatio), PreprocessOptions::default())
    }

    fn canvas_png_base64() -> String {
        let img = GrayImage::from_fn(200, 200, |x, y| {
            if (90..110).contains(&x) && (30..170).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(buffer.into_inner())
    }

    #[test]
    fn blank_canvas_produces_a_full_distribution() {
        let grid = PixelGrid::from_2d(ndarray::Array2::from_elem((280, 280), 255.0)).unwrap();
        let recognition = recognizer().recognize_grid(&grid).unwrap();

        assert_eq!(recognition.tensor.shape(), (1, 28, 28));
        assert!(recognition.tensor.view().iter().all(|v| *v == 0.0));
        assert!(recognition.prediction.digit < NUM_CLASSES);
        assert!(recognition
            .prediction
            .probabilities
            .iter()
            .all(|p| p.is_finite() && *p >= 0.0));
    }

    #[test]
    fn repeated_base64_calls_are_deterministic() {
        let payload = format!("data:image/png;base64,{}", canvas_png_base64());
        let recognizer = recognizer();

        let first = recognizer.recognize_base64(&payload).unwrap();
        for _ in 0..5 {
            let again = recognizer.recognize_base64(&payload).unwrap();
            assert_eq!(again.prediction, first.prediction);
            assert_eq!(again.tensor, first.tensor);
        }
    }

    #[test]
    fn decode_failures_keep_their_stage() {
        let err = recognizer().recognize_base64("%%%").unwrap_err();
        assert_eq!(err.stage(), ErrorStage::Decode);

        let err = recognizer()
            .recognize_path(Path::new("no/such/digit1.png"))
            .unwrap_err();
        assert!(matches!(err, DigitError::ImageLoad(_)));
    }
}
