pub mod grid;
pub mod loader;
pub mod preprocessing;
pub mod postprocessing;
pub mod transforms;

pub use grid::{IntensityScale, NormalizedTensor, PixelGrid};
pub use loader::ImageLoader;
pub use preprocessing::{ImagePreprocessor, PreprocessOptions, MODEL_INPUT_SIZE};
pub use postprocessing::{PredictionReport, ResultFormatter};
pub use transforms::ImageTransforms;
