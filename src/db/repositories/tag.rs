use crate::entities::{prelude::*, tags};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use tracing::info;

/// Repository for tag reference data
pub struct TagRepository {
    conn: DatabaseConnection,
}

impl TagRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, name: &str, color: &str, slug: &str) -> Result<tags::Model> {
        let active_model = tags::ActiveModel {
            name: Set(name.to_string()),
            color: Set(color.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let res = Tags::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert tag")?;

        info!("Added tag {} ({})", name, slug);

        Tags::find_by_id(res.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created tag"))
    }

    pub async fn get(&self, id: i32) -> Result<Option<tags::Model>> {
        Ok(Tags::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<tags::Model>> {
        let rows = Tags::find()
            .order_by_asc(tags::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    /// Subset of `ids` that exist.
    pub async fn existing_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<i32> = Tags::find()
            .select_only()
            .column(tags::Column::Id)
            .filter(tags::Column::Id.is_in(ids.to_vec()))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(found.into_iter().collect())
    }
}
