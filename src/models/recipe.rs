use sea_orm::FromQueryResult;
use std::fmt;

/// Per-user recipe lists that share the add/remove toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    /// Name used in user-facing messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorites => "Favorite",
            Self::ShoppingCart => "ShoppingCart",
        }
    }
}

impl fmt::Display for RecipeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Narrowing applied to the recipe collection.
///
/// The boolean flags only apply when a viewer is known; for anonymous
/// callers they are ignored. `Some(false)` keeps recipes the viewer has
/// *not* put in that list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs, any of which must match.
    pub tags: Vec<String>,
    pub author: Option<i32>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

/// Validated input for creating or replacing a recipe.
#[derive(Debug, Clone)]
pub struct RecipeWrite {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub tag_ids: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct RecipeIngredientRow {
    pub recipe_id: i32,
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct RecipeTagRow {
    pub recipe_id: i32,
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}
