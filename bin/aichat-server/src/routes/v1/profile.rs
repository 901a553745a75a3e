//! Per-user profile routes.

use std::sync::Arc;

use aichat_types::{UpdateProfileRequest, UserProfile};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::ProfileStore;
use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::state::AppState;

use super::JsonBody;

#[derive(OpenApi)]
#[openapi(
    paths(get_profile, update_profile),
    components(schemas(UserProfile, UpdateProfileRequest))
)]
pub struct ProfileApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

/// Return the caller's profile, creating a default one on first access.
#[utoipa::path(
    get,
    path = "/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UserProfile>, ServerError> {
    let record = state.store.get_or_create_profile(&user.0).await?;
    Ok(Json(record.to_response()))
}

#[utoipa::path(
    put,
    path = "/v1/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ServerError> {
    req.validate()?;
    let record = state.store.update_profile(&user.0, &req).await?;
    Ok(Json(record.to_response()))
}
