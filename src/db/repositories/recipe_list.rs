use crate::entities::{favorites, prelude::*, shopping_cart};
use crate::models::recipe::RecipeList;
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect, Set, SqlErr,
};
use std::collections::HashSet;

/// Repository for the per-user favorite and shopping-cart lists
pub struct RecipeListRepository {
    conn: DatabaseConnection,
}

impl RecipeListRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn contains(&self, list: RecipeList, user_id: i32, recipe_id: i32) -> Result<bool> {
        let found = match list {
            RecipeList::Favorites => Favorites::find_by_id((user_id, recipe_id))
                .one(&self.conn)
                .await?
                .is_some(),
            RecipeList::ShoppingCart => ShoppingCart::find_by_id((user_id, recipe_id))
                .one(&self.conn)
                .await?
                .is_some(),
        };
        Ok(found)
    }

    /// Add a recipe to a list. Returns `false` when it was already there,
    /// including when a concurrent request inserted it first.
    pub async fn add(&self, list: RecipeList, user_id: i32, recipe_id: i32) -> Result<bool> {
        if self.contains(list, user_id, recipe_id).await? {
            return Ok(false);
        }

        let inserted = match list {
            RecipeList::Favorites => {
                Favorites::insert(favorites::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                })
                .exec_without_returning(&self.conn)
                .await
            }
            RecipeList::ShoppingCart => {
                ShoppingCart::insert(shopping_cart::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                })
                .exec_without_returning(&self.conn)
                .await
            }
        };

        match inserted {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).with_context(|| format!("Failed to add recipe to {list} list")),
        }
    }

    /// Remove a recipe from a list. Returns `false` when it was not there.
    pub async fn remove(&self, list: RecipeList, user_id: i32, recipe_id: i32) -> Result<bool> {
        let result = match list {
            RecipeList::Favorites => {
                Favorites::delete_by_id((user_id, recipe_id))
                    .exec(&self.conn)
                    .await?
            }
            RecipeList::ShoppingCart => {
                ShoppingCart::delete_by_id((user_id, recipe_id))
                    .exec(&self.conn)
                    .await?
            }
        };

        Ok(result.rows_affected > 0)
    }

    /// Which of `recipe_ids` are on the user's list.
    pub async fn recipe_ids_in(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<HashSet<i32>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<i32> = match list {
            RecipeList::Favorites => {
                Favorites::find()
                    .select_only()
                    .column(favorites::Column::RecipeId)
                    .filter(favorites::Column::UserId.eq(user_id))
                    .filter(favorites::Column::RecipeId.is_in(recipe_ids.to_vec()))
                    .into_tuple()
                    .all(&self.conn)
                    .await?
            }
            RecipeList::ShoppingCart => {
                ShoppingCart::find()
                    .select_only()
                    .column(shopping_cart::Column::RecipeId)
                    .filter(shopping_cart::Column::UserId.eq(user_id))
                    .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.to_vec()))
                    .into_tuple()
                    .all(&self.conn)
                    .await?
            }
        };

        Ok(found.into_iter().collect())
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
