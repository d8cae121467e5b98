use crate::image::{NormalizedTensor, MODEL_INPUT_SIZE};
use crate::models::{DigitClassifier, OnnxDigitClassifier};
use crate::recognition::types::{Prediction, NUM_CLASSES};
use crate::{Config, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// 进程级模型句柄
///
/// 启动时创建一次，通过 `Arc` 传给各个前端，加载后只读。
pub struct ModelManager {
    classifier: Arc<dyn DigitClassifier>,
    model_path: PathBuf,
    loaded_at: DateTime<Utc>,
}

impl ModelManager {
    /// 按配置加载ONNX模型，失败即为致命错误
    pub fn load(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let classifier = OnnxDigitClassifier::load(&config.model_path, &config.onnx_config)?;
        let manager = Self::from_classifier(Arc::new(classifier), config.model_path.clone());

        // 启动时先跑一次空白输入
        manager.health_check()?;

        tracing::info!("Model manager initialized successfully");
        Ok(manager)
    }

    /// 使用已有的分类器构造
    pub fn from_classifier(classifier: Arc<dyn DigitClassifier>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            classifier,
            model_path: model_path.into(),
            loaded_at: Utc::now(),
        }
    }

    /// 获取分类器引用
    pub fn classifier(&self) -> Arc<dyn DigitClassifier> {
        Arc::clone(&self.classifier)
    }

    /// 模型健康检查：空白输入必须得到合法的概率分布
    pub fn health_check(&self) -> Result<Prediction> {
        tracing::debug!("Performing model health check...");

        let blank = NormalizedTensor::blank(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE);
        let prediction = self.classifier.predict(&blank)?;

        tracing::debug!(
            "Model health check passed: blank input -> {} ({:.1}%)",
            prediction.digit,
            prediction.confidence_percent()
        );
        Ok(prediction)
    }

    /// 获取模型统计信息
    pub fn stats(&self) -> ModelStats {
        ModelStats {
            classifier: self.classifier.name().to_string(),
            model_path: self.model_path.display().to_string(),
            input_shape: [1, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE],
            num_classes: NUM_CLASSES,
            loaded_at: self.loaded_at.to_rfc3339(),
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub classifier: String,
    pub model_path: String,
    pub input_shape: [usize; 3],
    pub num_classes: usize,
    pub loaded_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::DigitError;

    struct Uniform;

    impl DigitClassifier for Uniform {
        fn predict(&self, _tensor: &NormalizedTensor) -> Result<Prediction> {
            Prediction::from_output(&[0.1; NUM_CLASSES])
        }

        fn name(&self) -> &str {
            "uniform"
        }
    }

    struct Broken;

    impl DigitClassifier for Broken {
        fn predict(&self, _tensor: &NormalizedTensor) -> Result<Prediction> {
            Prediction::from_output(&[f32::NAN; NUM_CLASSES])
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn health_check_accepts_a_valid_distribution() {
        let manager = ModelManager::from_classifier(Arc::new(Uniform), "models/test.onnx");
        let prediction = manager.health_check().unwrap();
        assert!(prediction.digit < NUM_CLASSES);

        let stats = manager.stats();
        assert_eq!(stats.classifier, "uniform");
        assert_eq!(stats.input_shape, [1, 28, 28]);
    }

    #[test]
    fn health_check_surfaces_nan_output() {
        let manager = ModelManager::from_classifier(Arc::new(Broken), "models/test.onnx");
        assert!(matches!(manager.health_check(), Err(DigitError::Inference(_))));
    }

    #[test]
    fn load_fails_when_model_is_missing() {
        let config = Config {
            model_path: PathBuf::from("nowhere/handwritten_digits.onnx"),
            ..Config::default()
        };
        assert!(matches!(
            ModelManager::load(&config),
            Err(DigitError::ModelNotFound(_))
        ));
    }
}
