use crate::entities::{
    favorites, ingredients, prelude::*, recipe_ingredients, recipe_tags, recipes, shopping_cart,
    tags,
};
use crate::models::recipe::{
    IngredientAmount, RecipeFilter, RecipeIngredientRow, RecipeTagRow, RecipeWrite,
};
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

/// Repository for recipes and their tag/ingredient associations
pub struct RecipeRepository {
    conn: DatabaseConnection,
}

impl RecipeRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a recipe together with its tags and ingredients in one transaction.
    pub async fn create(&self, author_id: i32, recipe: &RecipeWrite, image: &str) -> Result<i32> {
        let txn = self.conn.begin().await?;

        let res = Recipes::insert(recipes::ActiveModel {
            author_id: Set(author_id),
            name: Set(recipe.name.clone()),
            image: Set(image.to_string()),
            text: Set(recipe.text.clone()),
            cooking_time: Set(recipe.cooking_time),
            pub_date: Set(chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
            ..Default::default()
        })
        .exec(&txn)
        .await
        .context("Failed to insert recipe")?;

        let recipe_id = res.last_insert_id;
        insert_associations(&txn, recipe_id, &recipe.tag_ids, &recipe.ingredients).await?;

        txn.commit().await?;
        info!("Created recipe {} '{}' by user {}", recipe_id, recipe.name, author_id);
        Ok(recipe_id)
    }

    /// Replace a recipe's fields, tags and ingredients atomically.
    ///
    /// `image` of `None` keeps the stored image.
    pub async fn update(&self, id: i32, recipe: &RecipeWrite, image: Option<&str>) -> Result<()> {
        let txn = self.conn.begin().await?;

        let existing = Recipes::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Recipe not found: {id}"))?;

        RecipeTags::delete_many()
            .filter(recipe_tags::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;

        RecipeIngredients::delete_many()
            .filter(recipe_ingredients::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;

        let mut active: recipes::ActiveModel = existing.into();
        active.name = Set(recipe.name.clone());
        active.text = Set(recipe.text.clone());
        active.cooking_time = Set(recipe.cooking_time);
        if let Some(image) = image {
            active.image = Set(image.to_string());
        }
        active
            .update(&txn)
            .await
            .context("Failed to update recipe")?;

        insert_associations(&txn, id, &recipe.tag_ids, &recipe.ingredients).await?;

        txn.commit().await?;
        info!("Updated recipe {}", id);
        Ok(())
    }

    /// Delete a recipe and every row that references it.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        RecipeTags::delete_many()
            .filter(recipe_tags::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        RecipeIngredients::delete_many()
            .filter(recipe_ingredients::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        Favorites::delete_many()
            .filter(favorites::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        ShoppingCart::delete_many()
            .filter(shopping_cart::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;

        let result = Recipes::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get(&self, id: i32) -> Result<Option<recipes::Model>> {
        Ok(Recipes::find_by_id(id).one(&self.conn).await?)
    }

    /// Whether `author_id` already owns a recipe called `name`, ignoring `exclude_id`.
    pub async fn name_taken(
        &self,
        author_id: i32,
        name: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool> {
        let mut query = Recipes::find()
            .filter(recipes::Column::AuthorId.eq(author_id))
            .filter(recipes::Column::Name.eq(name));

        if let Some(id) = exclude_id {
            query = query.filter(recipes::Column::Id.ne(id));
        }

        Ok(query.count(&self.conn).await? > 0)
    }

    /// One page of recipes matching `filter`, newest first, plus the total count.
    pub async fn list_page(
        &self,
        filter: &RecipeFilter,
        viewer: Option<i32>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<recipes::Model>, u64)> {
        let index = super::page_index(page, page_size)?;
        let paginator = filtered_query(filter, viewer)
            .order_by_desc(recipes::Column::PubDate)
            .order_by_desc(recipes::Column::Id)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;

        Ok((items, total))
    }

    /// Newest recipes of one author, optionally capped at `limit`.
    pub async fn list_by_author(
        &self,
        author_id: i32,
        limit: Option<u64>,
    ) -> Result<Vec<recipes::Model>> {
        let mut query = Recipes::find()
            .filter(recipes::Column::AuthorId.eq(author_id))
            .order_by_desc(recipes::Column::PubDate)
            .order_by_desc(recipes::Column::Id);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        Ok(query.all(&self.conn).await?)
    }

    pub async fn count_by_authors(&self, author_ids: &[i32]) -> Result<HashMap<i32, u64>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let results: Vec<(i32, i64)> = Recipes::find()
            .select_only()
            .column(recipes::Column::AuthorId)
            .column_as(recipes::Column::Id.count(), "count")
            .filter(recipes::Column::AuthorId.is_in(author_ids.to_vec()))
            .group_by(recipes::Column::AuthorId)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(results
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or_default()))
            .collect())
    }

    pub async fn tags_for(&self, recipe_ids: &[i32]) -> Result<HashMap<i32, Vec<RecipeTagRow>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = RecipeTags::find()
            .select_only()
            .column(recipe_tags::Column::RecipeId)
            .column(tags::Column::Id)
            .column(tags::Column::Name)
            .column(tags::Column::Color)
            .column(tags::Column::Slug)
            .join(JoinType::InnerJoin, recipe_tags::Relation::Tags.def())
            .filter(recipe_tags::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .order_by_asc(tags::Column::Id)
            .into_model::<RecipeTagRow>()
            .all(&self.conn)
            .await?;

        let mut map: HashMap<i32, Vec<RecipeTagRow>> = HashMap::new();
        for row in rows {
            map.entry(row.recipe_id).or_default().push(row);
        }
        Ok(map)
    }

    pub async fn ingredients_for(
        &self,
        recipe_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<RecipeIngredientRow>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = RecipeIngredients::find()
            .select_only()
            .column(recipe_ingredients::Column::RecipeId)
            .column(ingredients::Column::Id)
            .column(ingredients::Column::Name)
            .column(ingredients::Column::MeasurementUnit)
            .column(recipe_ingredients::Column::Amount)
            .join(
                JoinType::InnerJoin,
                recipe_ingredients::Relation::Ingredients.def(),
            )
            .filter(recipe_ingredients::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .order_by_asc(ingredients::Column::Name)
            .into_model::<RecipeIngredientRow>()
            .all(&self.conn)
            .await?;

        let mut map: HashMap<i32, Vec<RecipeIngredientRow>> = HashMap::new();
        for row in rows {
            map.entry(row.recipe_id).or_default().push(row);
        }
        Ok(map)
    }
}

/// Build the filtered recipe query.
///
/// Every narrowing is an `IN`/`NOT IN` subquery, so filters compose with AND
/// and nothing is materialized in application memory.
pub(crate) fn filtered_query(filter: &RecipeFilter, viewer: Option<i32>) -> Select<Recipes> {
    let mut query = Recipes::find();

    if !filter.tags.is_empty() {
        let tagged = Query::select()
            .column((RecipeTags, recipe_tags::Column::RecipeId))
            .from(RecipeTags)
            .inner_join(
                Tags,
                sea_orm::sea_query::Expr::col((Tags, tags::Column::Id))
                    .equals((RecipeTags, recipe_tags::Column::TagId)),
            )
            .and_where(tags::Column::Slug.is_in(filter.tags.clone()))
            .to_owned();
        query = query.filter(recipes::Column::Id.in_subquery(tagged));
    }

    if let Some(author) = filter.author {
        query = query.filter(recipes::Column::AuthorId.eq(author));
    }

    let Some(user_id) = viewer else {
        return query;
    };

    if let Some(wanted) = filter.is_favorited {
        let favorited = Query::select()
            .column(favorites::Column::RecipeId)
            .from(Favorites)
            .and_where(favorites::Column::UserId.eq(user_id))
            .to_owned();
        query = query.filter(membership(wanted, favorited));
    }

    if let Some(wanted) = filter.is_in_shopping_cart {
        let in_cart = Query::select()
            .column(shopping_cart::Column::RecipeId)
            .from(ShoppingCart)
            .and_where(shopping_cart::Column::UserId.eq(user_id))
            .to_owned();
        query = query.filter(membership(wanted, in_cart));
    }

    query
}

fn membership(wanted: bool, ids: SelectStatement) -> sea_orm::sea_query::SimpleExpr {
    if wanted {
        recipes::Column::Id.in_subquery(ids)
    } else {
        recipes::Column::Id.not_in_subquery(ids)
    }
}

async fn insert_associations<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    tag_ids: &[i32],
    ingredient_amounts: &[IngredientAmount],
) -> Result<()> {
    if !tag_ids.is_empty() {
        let tag_models: Vec<recipe_tags::ActiveModel> = tag_ids
            .iter()
            .map(|tag_id| recipe_tags::ActiveModel {
                recipe_id: Set(recipe_id),
                tag_id: Set(*tag_id),
            })
            .collect();

        RecipeTags::insert_many(tag_models)
            .exec_without_returning(db)
            .await
            .context("Failed to insert recipe tags")?;
    }

    if !ingredient_amounts.is_empty() {
        let ingredient_models: Vec<recipe_ingredients::ActiveModel> = ingredient_amounts
            .iter()
            .map(|item| recipe_ingredients::ActiveModel {
                recipe_id: Set(recipe_id),
                ingredient_id: Set(item.id),
                amount: Set(item.amount),
            })
            .collect();

        RecipeIngredients::insert_many(ingredient_models)
            .exec_without_returning(db)
            .await
            .context("Failed to insert recipe ingredients")?;
    }

    Ok(())
}
