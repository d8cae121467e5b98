pub mod classifier;
pub mod manager;

pub use classifier::{ensure_model_shape, DigitClassifier, InputLayout, OnnxDigitClassifier};
pub use manager::{ModelManager, ModelStats};
