use axum::{
    Json,
    extract::{OriginalUri, Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::{AuthUser, MaybeUser};
use super::validation::{parse_recipes_limit, query_pairs};
use super::{ApiError, AppState, Page, SetPasswordRequest, SubscriptionDto, UserDto};
use crate::services::UserError;

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::Validation(errors) => Self::Validation(errors),
            UserError::Rejected(msg) => Self::Rejected(msg),
            UserError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `GET /api/users/`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Page<UserDto>>, ApiError> {
    let pairs = query_pairs(uri.query());
    let api = state.config().read().await.api.clone();
    let params = super::page_params(&pairs, &api)?;

    let (users, count) = state
        .user_service()
        .list(viewer.id(), params.page, params.limit)
        .await?;

    Ok(Json(super::paginate(users, count, params, uri.path(), &pairs)?))
}

/// `GET /api/users/{id}/`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state.user_service().get(viewer.id(), id).await?;
    Ok(Json(user))
}

/// `GET /api/users/me/`
pub async fn me(AuthUser(user): AuthUser) -> Json<UserDto> {
    Json(UserDto::from_user(user, false))
}

/// `POST /api/users/set_password/`
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SetPasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    state.user_service().set_password(user.id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/users/subscriptions/`
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Page<SubscriptionDto>>, ApiError> {
    let pairs = query_pairs(uri.query());
    let api = state.config().read().await.api.clone();
    let params = super::page_params(&pairs, &api)?;
    let recipes_limit = parse_recipes_limit(&pairs)?;

    let (authors, count) = state
        .user_service()
        .subscriptions(user.id, params.page, params.limit, recipes_limit)
        .await?;

    Ok(Json(super::paginate(authors, count, params, uri.path(), &pairs)?))
}

/// `POST /api/users/{id}/subscribe/`
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(author_id): Path<i32>,
    OriginalUri(uri): OriginalUri,
) -> Result<(StatusCode, Json<SubscriptionDto>), ApiError> {
    let recipes_limit = parse_recipes_limit(&query_pairs(uri.query()))?;
    let subscription = state
        .user_service()
        .subscribe(user.id, author_id, recipes_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// `DELETE /api/users/{id}/subscribe/`
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(author_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.user_service().unsubscribe(user.id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
