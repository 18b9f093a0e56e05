use crate::entities::{ingredients, prelude::*};
use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use tracing::info;

const LIKE_ESCAPE: char = '\\';

/// Repository for ingredient reference data
pub struct IngredientRepository {
    conn: DatabaseConnection,
}

impl IngredientRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, name: &str, measurement_unit: &str) -> Result<ingredients::Model> {
        let active_model = ingredients::ActiveModel {
            name: Set(name.to_string()),
            measurement_unit: Set(measurement_unit.to_string()),
            search_name: Set(name.to_lowercase()),
            ..Default::default()
        };

        let res = Ingredients::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert ingredient")?;

        info!("Added ingredient {} ({})", name, measurement_unit);

        Ingredients::find_by_id(res.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created ingredient"))
    }

    pub async fn get(&self, id: i32) -> Result<Option<ingredients::Model>> {
        Ok(Ingredients::find_by_id(id).one(&self.conn).await?)
    }

    /// Ingredients whose name contains `name`, case-insensitively.
    ///
    /// Names starting with the query rank first; ties keep ID order. An
    /// empty or missing query returns every ingredient.
    pub async fn search(&self, name: Option<&str>) -> Result<Vec<ingredients::Model>> {
        let mut query = Ingredients::find();

        if let Some(needle) = name.filter(|n| !n.is_empty()) {
            let needle = escape_like(&needle.to_lowercase());
            let starts_with = LikeExpr::new(format!("{needle}%")).escape(LIKE_ESCAPE);
            let contains = LikeExpr::new(format!("%{needle}%")).escape(LIKE_ESCAPE);

            query = query
                .filter(ingredients::Column::SearchName.like(contains))
                .order_by(
                    Expr::col((Ingredients, ingredients::Column::SearchName)).like(starts_with),
                    Order::Desc,
                );
        }

        let rows = query
            .order_by_asc(ingredients::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    /// Subset of `ids` that exist.
    pub async fn existing_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<i32> = Ingredients::find()
            .select_only()
            .column(ingredients::Column::Id)
            .filter(ingredients::Column::Id.is_in(ids.to_vec()))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(found.into_iter().collect())
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("salt"), "salt");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }
}
