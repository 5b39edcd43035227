//! `/signin`, `/signout` and `/send`.
//!
//! Only `/signin` validates its body here. The other two hand the raw
//! payload to the pipeline so an unauthenticated caller is refused before
//! any field is looked at.

use axum::{Json, Router, extract::State, routing::post};

use crate::api::dto::{SendRequest, SendResponse, SignInRequest, SignInResponse, SignOutRequest};
use crate::api::extract::{JsonBody, ValidatedJson};
use crate::api::middleware::ApiError;
use crate::auth::RequestContext;
use crate::services::pipeline::MailerService;
use crate::state::AppState;

pub fn mail_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(sign_in))
        .route("/signout", post(sign_out))
        .route("/send", post(send))
}

async fn sign_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let token = state
        .pipeline
        .sign_in(&ctx, &payload.client_id, &payload.secret)
        .await
        .map_err(|e| ApiError::new(e, &ctx))?;

    Ok(Json(SignInResponse { token }))
}

async fn sign_out(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(payload): JsonBody<SignOutRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    state
        .pipeline
        .sign_out(&ctx, payload.id)
        .await
        .map_err(|e| ApiError::new(e, &ctx))?;

    Ok(Json(SendResponse {
        status: "signed_out".to_string(),
    }))
}

async fn send(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(payload): JsonBody<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    state
        .pipeline
        .send(&ctx, payload.into())
        .await
        .map_err(|e| ApiError::new(e, &ctx))?;

    Ok(Json(SendResponse::sent()))
}
