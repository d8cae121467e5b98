use crate::utils::error::DigitError;
use crate::Result;
use serde::Serialize;

/// 类别数（数字0-9）
pub const NUM_CLASSES: usize = 10;

/// 概率和的容差，超出则认为输出是logits
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// 单样本预测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// 概率最大的类别（并列时取第一个）
    pub digit: usize,
    /// softmax分布，非负且和为1
    pub probabilities: [f32; NUM_CLASSES],
}

impl Prediction {
    /// 从模型的原始输出构造
    ///
    /// 输出接近概率分布时按和重新归一化，否则先做softmax。
    pub fn from_output(raw: &[f32]) -> Result<Self> {
        if raw.len() != NUM_CLASSES {
            return Err(DigitError::Inference(format!(
                "expected {} output values, got {}",
                NUM_CLASSES,
                raw.len()
            )));
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(DigitError::Inference(format!(
                "model output contains non-finite values: {:?}",
                raw
            )));
        }

        let mut probabilities = [0.0f32; NUM_CLASSES];
        probabilities.copy_from_slice(raw);

        if Self::is_distribution(&probabilities) {
            let sum: f32 = probabilities.iter().sum();
            for p in probabilities.iter_mut() {
                *p /= sum;
            }
        } else {
            tracing::debug!("Model output is not normalized, applying softmax");
            softmax_in_place(&mut probabilities);
        }

        Ok(Self {
            digit: argmax(&probabilities),
            probabilities,
        })
    }

    fn is_distribution(values: &[f32; NUM_CLASSES]) -> bool {
        let sum: f32 = values.iter().sum();
        values.iter().all(|v| *v >= 0.0) && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE
    }

    /// 预测类别的概率
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.digit]
    }

    /// 百分比形式的置信度
    pub fn confidence_percent(&self) -> f32 {
        self.confidence() * 100.0
    }

    pub fn probabilities_percent(&self) -> Vec<f32> {
        self.probabilities.iter().map(|p| p * 100.0).collect()
    }
}

/// 第一个最大值的下标
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(prediction: &Prediction) {
        assert_eq!(prediction.probabilities.len(), NUM_CLASSES);
        assert!(prediction.probabilities.iter().all(|p| *p >= 0.0));
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "sum = {sum}");
        assert_eq!(prediction.digit, argmax(&prediction.probabilities));
    }

    #[test]
    fn distribution_keeps_its_shape() {
        let raw = [0.01, 0.02, 0.03, 0.04, 0.05, 0.05, 0.1, 0.6, 0.05, 0.05];
        let prediction = Prediction::from_output(&raw).unwrap();
        assert_eq!(prediction.digit, 7);
        for (p, r) in prediction.probabilities.iter().zip(raw.iter()) {
            assert!((p - r).abs() < 1e-6);
        }
        assert!((prediction.confidence_percent() - 60.0).abs() < 1e-4);
        assert_valid(&prediction);
    }

    #[test]
    fn near_distribution_is_rescaled_to_sum_one() {
        let mut raw = [0.1f32; NUM_CLASSES];
        raw[0] = 0.1009;
        let prediction = Prediction::from_output(&raw).unwrap();
        assert_eq!(prediction.digit, 0);
        assert!(prediction.probabilities[0] > prediction.probabilities[1]);
        assert_valid(&prediction);
    }

    #[test]
    fn logits_are_normalized_with_softmax() {
        let raw = [-3.0, 1.0, 8.5, 0.0, -1.0, 2.0, 0.5, 0.1, -7.0, 3.0];
        let prediction = Prediction::from_output(&raw).unwrap();
        assert_eq!(prediction.digit, 2);
        assert_valid(&prediction);
    }

    #[test]
    fn ties_pick_the_first_maximum() {
        let prediction = Prediction::from_output(&[0.1; NUM_CLASSES]).unwrap();
        assert_eq!(prediction.digit, 0);
        assert_valid(&prediction);
    }

    #[test]
    fn wrong_length_and_nan_are_inference_failures() {
        assert!(matches!(
            Prediction::from_output(&[0.5, 0.5]),
            Err(DigitError::Inference(_))
        ));

        let mut raw = [0.1f32; NUM_CLASSES];
        raw[3] = f32::NAN;
        assert!(matches!(
            Prediction::from_output(&raw),
            Err(DigitError::Inference(_))
        ));
    }

    #[test]
    fn percentages_scale_every_probability() {
        let raw = [0.0, 0.0, 0.0, 0.25, 0.0, 0.0, 0.0, 0.0, 0.0, 0.75];
        let prediction = Prediction::from_output(&raw).unwrap();
        assert_eq!(prediction.probabilities_percent()[9], 75.0);
        assert_eq!(prediction.probabilities_percent()[3], 25.0);
    }
}
