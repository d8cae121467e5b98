pub mod error;

pub use error::{DigitError, ErrorStage};
