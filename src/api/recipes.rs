use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::auth::{AuthUser, MaybeUser};
use super::validation::{parse_recipe_filter, query_pairs};
use super::{
    ApiError, AppState, Page, RecipeDto, RecipeShortDto, RecipeWriteRequest, ShoppingListQuery,
};
use crate::models::recipe::RecipeList;
use crate::services::RecipeError;
use crate::services::shopping_list::OutputFormat;

impl From<RecipeError> for ApiError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::NotFound(id) => Self::not_found("Recipe", id),
            RecipeError::Forbidden(_) => Self::permission_denied(),
            RecipeError::Validation(errors) => Self::Validation(errors),
            RecipeError::Rejected(msg) => Self::Rejected(msg),
            RecipeError::Conflict(msg) => Self::Conflict(msg),
            RecipeError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `GET /api/recipes/`
///
/// Supports `tags` (repeatable), `author`, `is_favorited`,
/// `is_in_shopping_cart`, `page` and `limit`.
pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Page<RecipeDto>>, ApiError> {
    let pairs = query_pairs(uri.query());
    let api = state.config().read().await.api.clone();

    let filter = parse_recipe_filter(&pairs)?;
    let params = super::page_params(&pairs, &api)?;

    let (recipes, count) = state
        .recipe_service()
        .list(viewer.id(), &filter, params.page, params.limit)
        .await?;

    Ok(Json(super::paginate(recipes, count, params, uri.path(), &pairs)?))
}

/// `GET /api/recipes/{id}/`
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<RecipeDto>, ApiError> {
    let recipe = state.recipe_service().get(viewer.id(), id).await?;
    Ok(Json(recipe))
}

/// `POST /api/recipes/`
pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<RecipeWriteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeDto>), ApiError> {
    let Json(request) = payload?;
    let recipe = state.recipe_service().create(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// `PATCH /api/recipes/{id}/`
pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<RecipeWriteRequest>, JsonRejection>,
) -> Result<Json<RecipeDto>, ApiError> {
    let Json(request) = payload?;
    let recipe = state.recipe_service().update(user.id, id, request).await?;
    Ok(Json(recipe))
}

/// `DELETE /api/recipes/{id}/`
pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.recipe_service().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/recipes/{id}/favorite/`
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShortDto>), ApiError> {
    add_to_list(&state, RecipeList::Favorites, user.id, id).await
}

/// `DELETE /api/recipes/{id}/favorite/`
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, RecipeList::Favorites, user.id, id).await
}

/// `POST /api/recipes/{id}/shopping_cart/`
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShortDto>), ApiError> {
    add_to_list(&state, RecipeList::ShoppingCart, user.id, id).await
}

/// `DELETE /api/recipes/{id}/shopping_cart/`
pub async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, RecipeList::ShoppingCart, user.id, id).await
}

async fn add_to_list(
    state: &AppState,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<(StatusCode, Json<RecipeShortDto>), ApiError> {
    let recipe = state
        .recipe_service()
        .add_to_list(list, user_id, recipe_id)
        .await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove_from_list(
    state: &AppState,
    list: RecipeList,
    user_id: i32,
    recipe_id: i32,
) -> Result<StatusCode, ApiError> {
    state
        .recipe_service()
        .remove_from_list(list, user_id, recipe_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/recipes/download_shopping_cart/?format=pdf|txt`
pub async fn download_shopping_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ShoppingListQuery>,
) -> Result<Response, ApiError> {
    let format = OutputFormat::parse(query.format.as_deref())
        .ok_or_else(|| ApiError::field("format", "Expected one of: pdf, txt."))?;

    let document = state.recipe_service().shopping_list(user.id, format).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.filename.replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.body,
    )
        .into_response())
}
