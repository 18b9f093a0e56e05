//! Domain service for recipes, the per-user recipe lists and the shopping list.

use crate::api::types::{RecipeDto, RecipeShortDto, RecipeWriteRequest};
use crate::api::validation::FieldErrors;
use crate::models::recipe::{RecipeFilter, RecipeList};
use crate::services::shopping_list::OutputFormat;
use thiserror::Error;

/// Errors specific to recipe operations.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Recipe not found: {0}")]
    NotFound(i32),

    #[error("Only the author may change recipe {0}")]
    Forbidden(i32),

    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// A list toggle that does not apply in the current state.
    #[error("{0}")]
    Rejected(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for RecipeError {
    fn from(err: anyhow::Error) -> Self {
        if crate::db::is_unique_violation(&err) {
            return Self::Conflict(err.root_cause().to_string());
        }
        Self::Internal(format!("{err:#}"))
    }
}

impl From<FieldErrors> for RecipeError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A rendered shopping list ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ShoppingDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Domain service trait for recipes.
///
/// `viewer` is the authenticated caller, if any; it only affects the
/// per-user flags of the representation and the list filters.
#[async_trait::async_trait]
pub trait RecipeService: Send + Sync {
    /// One page of recipes matching `filter`, plus the total count.
    async fn list(
        &self,
        viewer: Option<i32>,
        filter: &RecipeFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<RecipeDto>, u64), RecipeError>;

    async fn get(&self, viewer: Option<i32>, id: i32) -> Result<RecipeDto, RecipeError>;

    async fn create(
        &self,
        author_id: i32,
        request: RecipeWriteRequest,
    ) -> Result<RecipeDto, RecipeError>;

    /// Replace a recipe. Only its author may do this.
    async fn update(
        &self,
        user_id: i32,
        id: i32,
        request: RecipeWriteRequest,
    ) -> Result<RecipeDto, RecipeError>;

    /// Delete a recipe. Only its author may do this.
    async fn delete(&self, user_id: i32, id: i32) -> Result<(), RecipeError>;

    /// Put a recipe on one of the user's lists.
    async fn add_to_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<RecipeShortDto, RecipeError>;

    /// Take a recipe off one of the user's lists.
    async fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<(), RecipeError>;

    /// Aggregate the user's cart and render it.
    async fn shopping_list(
        &self,
        user_id: i32,
        format: OutputFormat,
    ) -> Result<ShoppingDocument, RecipeError>;
}
