use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON extractor that runs `validator` rules and surfaces failures as
/// field-level validation errors.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Business {
                status: axum::http::StatusCode::BAD_REQUEST,
                code: service_core::error::VALIDATION_ERROR_CODE,
                message: format!("Json parse error: {}", e),
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}
