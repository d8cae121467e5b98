use crate::image::grid::NormalizedTensor;
use crate::recognition::types::Prediction;
use crate::utils::error::DigitError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 对外返回的预测结果（百分比）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub digit: usize,
    /// 预测类别概率 × 100
    pub confidence: f32,
    /// 每个类别概率 × 100
    pub probabilities: Vec<f32>,
}

/// 结果格式化器
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn report(prediction: &Prediction) -> PredictionReport {
        PredictionReport {
            digit: prediction.digit,
            confidence: prediction.confidence_percent(),
            probabilities: prediction.probabilities_percent(),
        }
    }

    /// 单行摘要，例如 `predicted 7 (98.2% confidence)`
    pub fn format_summary(prediction: &Prediction) -> String {
        format!(
            "predicted {} ({:.1}% confidence)",
            prediction.digit,
            prediction.confidence_percent()
        )
    }

    /// 每个类别一行，附带简易条形图
    pub fn format_distribution(prediction: &Prediction) -> String {
        prediction
            .probabilities
            .iter()
            .enumerate()
            .map(|(digit, p)| {
                let bar = "#".repeat((p * 40.0).round() as usize);
                let marker = if digit == prediction.digit { '*' } else { ' ' };
                format!("{marker} {digit}: {:>6.2}% {bar}", p * 100.0)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 保存预处理后的张量为PNG（亮字暗底）
    pub fn save_tensor_png(tensor: &NormalizedTensor, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tensor.to_gray_image().save(path).map_err(|e| {
            DigitError::Internal(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_uses_percentages() {
        let prediction =
            Prediction::from_output(&[0.0, 0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let report = ResultFormatter::report(&prediction);

        assert_eq!(report.digit, 1);
        assert!((report.confidence - 90.0).abs() < 1e-4);
        assert_eq!(report.probabilities.len(), 10);
        assert!((report.probabilities[2] - 10.0).abs() < 1e-4);
    }

    #[test]
    fn summary_and_distribution_mention_the_digit() {
        let prediction =
            Prediction::from_output(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        assert_eq!(
            ResultFormatter::format_summary(&prediction),
            "predicted 8 (100.0% confidence)"
        );

        let table = ResultFormatter::format_distribution(&prediction);
        assert_eq!(table.lines().count(), 10);
        assert!(table.lines().nth(8).unwrap().starts_with("* 8"));
    }
}
