use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use validator::Validate;

use crate::api::middleware::RequestId;
use crate::auth::{Credential, RequestContext};
use crate::error::{AppError, AppResult};

/// JSON body with rejections reported as [`AppError`]. No field rules run.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> AppResult<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// JSON body that has passed its `validator` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> AppResult<Self> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Builds the per-call context from the `Authorization` header and the
/// request id. Never rejects: a missing or malformed header is left for the
/// authentication layer to refuse.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = match parts.headers.get(header::AUTHORIZATION) {
            None => Credential::Missing,
            Some(value) => value
                .to_str()
                .map(|v| Credential::from_header(Some(v)))
                .unwrap_or(Credential::Malformed),
        };

        let ctx = RequestContext::new(credential);
        Ok(match parts.extensions.get::<RequestId>() {
            Some(RequestId(id)) => ctx.with_request_id(id.clone()),
            None => ctx,
        })
    }
}
