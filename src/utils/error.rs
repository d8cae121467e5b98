use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigitError {
    #[error("Image load failed: {0}")]
    ImageLoad(String),

    #[error("Image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Image decode failed: invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image load failed: file too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Image load failed: unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Model not found at {}. Train and export the classifier to this path first", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Model incompatible: {0}")]
    ModelIncompatible(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Invalid request: body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid request: timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inference failed: ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 错误发生的处理阶段
///
/// 调用方通过阶段判断是跳过继续（批处理）还是直接终止。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    /// 读取或解码图像
    Decode,
    /// 预处理无法得到合法张量
    Preprocess,
    /// 模型文件缺失或无法反序列化
    ModelLoad,
    /// 前向推理
    Inference,
    /// 请求本身不合法
    Request,
    Internal,
}

impl ErrorStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStage::Decode => "decode",
            ErrorStage::Preprocess => "preprocess",
            ErrorStage::ModelLoad => "model_load",
            ErrorStage::Inference => "inference",
            ErrorStage::Request => "request",
            ErrorStage::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DigitError {
    pub fn stage(&self) -> ErrorStage {
        match self {
            DigitError::ImageLoad(_)
            | DigitError::ImageDecode(_)
            | DigitError::Base64(_)
            | DigitError::FileTooLarge(_, _)
            | DigitError::UnsupportedFormat(_) => ErrorStage::Decode,
            DigitError::Preprocess(_) => ErrorStage::Preprocess,
            DigitError::ModelNotFound(_) | DigitError::ModelIncompatible(_) => {
                ErrorStage::ModelLoad
            }
            DigitError::Inference(_) | DigitError::Ort(_) => ErrorStage::Inference,
            DigitError::InvalidInput(_)
            | DigitError::PayloadTooLarge(_)
            | DigitError::Timeout(_)
            | DigitError::Json(_) => ErrorStage::Request,
            DigitError::Config(_) | DigitError::Io(_) | DigitError::Internal(_) => {
                ErrorStage::Internal
            }
        }
    }

    /// 解码、预处理和请求错误只影响单个样本，可以跳过
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.stage(),
            ErrorStage::Decode | ErrorStage::Preprocess | ErrorStage::Request
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DigitError::PayloadTooLarge(_) => return StatusCode::PAYLOAD_TOO_LARGE,
            DigitError::Timeout(_) => return StatusCode::REQUEST_TIMEOUT,
            _ => {}
        }
        match self.stage() {
            ErrorStage::Decode
            | ErrorStage::Preprocess
            | ErrorStage::Request
            | ErrorStage::Inference => StatusCode::BAD_REQUEST,
            ErrorStage::ModelLoad => StatusCode::SERVICE_UNAVAILABLE,
            ErrorStage::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DigitError::ImageLoad(_) => "IMAGE_LOAD_ERROR",
            DigitError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DigitError::Base64(_) => "BASE64_DECODE_ERROR",
            DigitError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DigitError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            DigitError::Preprocess(_) => "PREPROCESSING_ERROR",
            DigitError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            DigitError::ModelIncompatible(_) => "MODEL_INCOMPATIBLE",
            DigitError::Inference(_) => "INFERENCE_ERROR",
            DigitError::InvalidInput(_) => "INVALID_INPUT",
            DigitError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            DigitError::Timeout(_) => "REQUEST_TIMEOUT",
            DigitError::Config(_) => "CONFIG_ERROR",
            DigitError::Io(_) => "IO_ERROR",
            DigitError::Json(_) => "JSON_ERROR",
            DigitError::Ort(_) => "ORT_ERROR",
            DigitError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for DigitError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": self.to_string(),
            "code": self.error_code(),
        });

        tracing::error!("Request failed at {} stage: {} ({})", self.stage(), self, status);

        (status, axum::Json(error_response)).into_response()
    }
}
