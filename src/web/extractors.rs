use crate::utils::error::DigitError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

/// 反序列化后再做字段校验的JSON提取器
///
/// 超出大小上限时返回 `DigitError::PayloadTooLarge`，其余拒绝返回
/// `DigitError::InvalidInput`，与其他失败共用同一种错误体。
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = DigitError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    DigitError::PayloadTooLarge(rejection.body_text())
                } else {
                    DigitError::InvalidInput(rejection.body_text())
                }
            })?;

        value.validate().map_err(DigitError::InvalidInput)?;

        Ok(ValidatedJson(value))
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for crate::web::handlers::PredictRequest {
    fn validate(&self) -> Result<(), String> {
        if self.image.trim().is_empty() {
            return Err("field `image` must not be empty".to_string());
        }
        Ok(())
    }
}
