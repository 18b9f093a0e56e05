use crate::entities::{ingredients, prelude::*, recipe_ingredients, recipes, shopping_cart};
use crate::models::shopping::{ShoppingContributionRow, ShoppingTotalRow};
use anyhow::Result;
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait,
};

/// Read-only queries over a user's shopping cart
pub struct ShoppingRepository {
    conn: DatabaseConnection,
}

impl ShoppingRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Summed amounts per (ingredient name, unit) across the user's cart recipes.
    pub async fn totals(&self, user_id: i32) -> Result<Vec<ShoppingTotalRow>> {
        let rows = RecipeIngredients::find()
            .select_only()
            .column(ingredients::Column::Name)
            .column(ingredients::Column::MeasurementUnit)
            .column_as(recipe_ingredients::Column::Amount.sum(), "total")
            .join(
                JoinType::InnerJoin,
                recipe_ingredients::Relation::Ingredients.def(),
            )
            .filter(recipe_ingredients::Column::RecipeId.in_subquery(cart_recipes(user_id)))
            .group_by(ingredients::Column::Name)
            .group_by(ingredients::Column::MeasurementUnit)
            .order_by_asc(ingredients::Column::Name)
            .order_by_asc(ingredients::Column::MeasurementUnit)
            .into_model::<ShoppingTotalRow>()
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    /// Per-recipe amounts behind each total.
    pub async fn contributions(&self, user_id: i32) -> Result<Vec<ShoppingContributionRow>> {
        let rows = RecipeIngredients::find()
            .select_only()
            .column_as(ingredients::Column::Name, "name")
            .column(ingredients::Column::MeasurementUnit)
            .column_as(recipes::Column::Name, "recipe_name")
            .column(recipe_ingredients::Column::Amount)
            .join(
                JoinType::InnerJoin,
                recipe_ingredients::Relation::Ingredients.def(),
            )
            .join(JoinType::InnerJoin, recipe_ingredients::Relation::Recipes.def())
            .filter(recipe_ingredients::Column::RecipeId.in_subquery(cart_recipes(user_id)))
            .order_by_asc(ingredients::Column::Name)
            .order_by_asc(ingredients::Column::MeasurementUnit)
            .order_by_asc(recipes::Column::Name)
            .into_model::<ShoppingContributionRow>()
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}

fn cart_recipes(user_id: i32) -> SelectStatement {
    Query::select()
        .column(shopping_cart::Column::RecipeId)
        .from(ShoppingCart)
        .and_where(shopping_cart::Column::UserId.eq(user_id))
        .to_owned()
}
