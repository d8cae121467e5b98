use crate::{
    image::{PredictionReport, ResultFormatter},
    utils::error::DigitError,
    web::{extractors::ValidatedJson, AppState},
    Result,
};
use axum::{extract::State, response::Json};
use serde::Deserialize;
use std::time::Instant;

/// `POST /predict` 请求体
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// 画布PNG的base64编码，可带 `data:image/png;base64,` 前缀
    pub image: String,
}

/// 识别画布图像
///
/// 成功返回 `{digit, confidence, probabilities}`（百分比），
/// 任何处理失败都返回400和 `{error, code}`。
pub async fn predict_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PredictRequest>,
) -> Result<Json<PredictionReport>> {
    let start_time = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        "Processing predict request: request_id={}, payload={} bytes",
        request_id,
        request.image.len()
    );

    // 推理是CPU密集型操作，放到阻塞线程池
    let recognizer = state.recognizer.clone();
    let recognition = tokio::task::spawn_blocking(move || recognizer.recognize_base64(&request.image))
        .await
        .map_err(|e| DigitError::Internal(format!("prediction task failed: {}", e)))?;

    let recognition = match recognition {
        Ok(recognition) => recognition,
        Err(e) => {
            tracing::warn!("Predict request failed: request_id={}, error={}", request_id, e);
            return Err(e);
        }
    };

    tracing::info!(
        "Predict completed: request_id={}, {}, time={:.3}s",
        request_id,
        ResultFormatter::format_summary(&recognition.prediction),
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ResultFormatter::report(&recognition.prediction)))
}
