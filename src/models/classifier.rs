use crate::config::OnnxConfig;
use crate::image::{NormalizedTensor, MODEL_INPUT_SIZE};
use crate::recognition::types::{Prediction, NUM_CLASSES};
use crate::utils::error::DigitError;
use crate::Result;
use ndarray::ArrayD;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// 单样本数字分类器
///
/// 加载后只读，多个请求可以共享同一个实例。
pub trait DigitClassifier: Send + Sync {
    /// 一次前向推理，输入必须是 (1, 28, 28)
    fn predict(&self, tensor: &NormalizedTensor) -> Result<Prediction>;

    /// 用于日志和服务信息
    fn name(&self) -> &str;
}

/// 检查张量是否符合模型训练时的形状
pub fn ensure_model_shape(tensor: &NormalizedTensor) -> Result<()> {
    let expected = (1, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE);
    if tensor.shape() != expected {
        return Err(DigitError::Preprocess(format!(
            "model expects tensor shape {:?}, got {:?}",
            expected,
            tensor.shape()
        )));
    }
    Ok(())
}

/// 模型接受的输入排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// [N, 28, 28]，图内自带Flatten
    Image,
    /// [N, 784]
    Flat,
}

impl InputLayout {
    fn arrange(&self, tensor: &NormalizedTensor) -> Result<ArrayD<f32>> {
        let data = tensor.view().to_owned();
        match self {
            InputLayout::Image => Ok(data.into_dyn()),
            InputLayout::Flat => {
                let (batch, height, width) = data.dim();
                data.into_shape_with_order((batch, height * width))
                    .map(|flat| flat.into_dyn())
                    .map_err(|e| DigitError::Preprocess(e.to_string()))
            }
        }
    }
}

/// ONNX Runtime 加载的三层全连接分类器
pub struct OnnxDigitClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String, // 动态发现的输出名称
    layout: InputLayout,
    path: PathBuf,
}

impl OnnxDigitClassifier {
    pub fn load(path: &Path, onnx_config: &OnnxConfig) -> Result<Self> {
        if !path.exists() {
            return Err(DigitError::ModelNotFound(path.to_path_buf()));
        }

        tracing::info!("Loading digit classifier from: {}", path.display());

        let mut session = Self::build_session(path, onnx_config).map_err(|e| match e {
            DigitError::Ort(e) => DigitError::ModelIncompatible(format!(
                "failed to deserialize {}: {}",
                path.display(),
                e
            )),
            other => other,
        })?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(DigitError::ModelIncompatible(
                    "model has no inputs".to_string(),
                ))
            }
        };

        // 动态发现输出名称
        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(DigitError::ModelIncompatible(
                    "model has no outputs".to_string(),
                ))
            }
        };
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classifier output[{}]: '{}'", i, output.name);
        }

        let layout = Self::probe(&mut session, &input_name, &output_name)?;

        tracing::info!(
            "Digit classifier ready: input='{}' ({:?}), output='{}'",
            input_name,
            layout,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            layout,
            path: path.to_path_buf(),
        })
    }

    fn build_session(path: &Path, onnx_config: &OnnxConfig) -> Result<Session> {
        let level = match onnx_config.optimization_level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        };

        let session = Session::builder()?
            .with_optimization_level(level)?
            .with_intra_threads(onnx_config.intra_threads)?
            .commit_from_file(path)?;
        Ok(session)
    }

    /// 用空白输入试跑一次，确认模型是 28x28 -> 10 的分类器
    fn probe(session: &mut Session, input_name: &str, output_name: &str) -> Result<InputLayout> {
        let blank = NormalizedTensor::blank(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE);
        let mut failures = Vec::new();

        for layout in [InputLayout::Image, InputLayout::Flat] {
            match Self::run_once(session, input_name, output_name, layout, &blank) {
                Ok(output) if output.len() == NUM_CLASSES => return Ok(layout),
                Ok(output) => failures.push(format!(
                    "{:?} input produced {} values, expected {}",
                    layout,
                    output.len(),
                    NUM_CLASSES
                )),
                Err(e) => failures.push(format!("{:?} input rejected: {}", layout, e)),
            }
        }

        Err(DigitError::ModelIncompatible(format!(
            "not a 28x28 -> {} digit classifier ({})",
            NUM_CLASSES,
            failures.join("; ")
        )))
    }

    fn run_once(
        session: &mut Session,
        input_name: &str,
        output_name: &str,
        layout: InputLayout,
        tensor: &NormalizedTensor,
    ) -> Result<Vec<f32>> {
        let input = Tensor::from_array(layout.arrange(tensor)?)?;
        let outputs = session.run(inputs![input_name => input])?;

        let output = outputs.get(output_name).ok_or_else(|| {
            DigitError::Inference(format!("output '{}' not found", output_name))
        })?;
        let values = output.try_extract_array::<f32>()?.iter().copied().collect();
        Ok(values)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> InputLayout {
        self.layout
    }
}

impl DigitClassifier for OnnxDigitClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<Prediction> {
        ensure_model_shape(tensor)?;

        let output = {
            let mut session = self.session.lock();
            Self::run_once(
                &mut session,
                &self.input_name,
                &self.output_name,
                self.layout,
                tensor,
            )?
        };

        Prediction::from_output(&output)
    }

    fn name(&self) -> &str {
        "onnx-runtime"
    }
}
