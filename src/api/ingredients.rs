use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{ApiError, AppState, IngredientDto, IngredientQuery};

/// `GET /api/ingredients/?name=<q>`
///
/// Case-insensitive containment match; names starting with `q` rank first.
pub async fn list_ingredients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<IngredientDto>>, ApiError> {
    let ingredients = state
        .store()
        .search_ingredients(query.name.as_deref())
        .await?;

    Ok(Json(
        ingredients.into_iter().map(IngredientDto::from).collect(),
    ))
}

/// `GET /api/ingredients/{id}/`
pub async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<IngredientDto>, ApiError> {
    let ingredient = state
        .store()
        .get_ingredient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient", id))?;

    Ok(Json(ingredient.into()))
}
