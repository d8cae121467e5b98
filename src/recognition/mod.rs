pub mod batch;
pub mod pipeline;
pub mod types;

pub use batch::{BatchEntry, BatchOutcome, BatchReport, BatchScanner};
pub use pipeline::{DigitRecognizer, Recognition};
pub use types::{argmax, Prediction, NUM_CLASSES};
