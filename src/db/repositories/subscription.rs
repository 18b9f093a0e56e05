use super::recipe_list::is_unique_violation;
use crate::entities::{prelude::*, subscriptions, users};
use anyhow::{Context, Result};
use sea_orm::sea_query::Query;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::collections::HashSet;
use tracing::info;

/// Repository for follower relationships between users
pub struct SubscriptionRepository {
    conn: DatabaseConnection,
}

impl SubscriptionRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn exists(&self, user_id: i32, author_id: i32) -> Result<bool> {
        let count = Subscriptions::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::AuthorId.eq(author_id))
            .count(&self.conn)
            .await?;

        Ok(count > 0)
    }

    /// Returns `false` when the subscription already existed.
    pub async fn add(&self, user_id: i32, author_id: i32) -> Result<bool> {
        let inserted = Subscriptions::insert(subscriptions::ActiveModel {
            user_id: Set(user_id),
            author_id: Set(author_id),
            ..Default::default()
        })
        .exec(&self.conn)
        .await;

        match inserted {
            Ok(_) => {
                info!("User {} subscribed to {}", user_id, author_id);
                Ok(true)
            }
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).context("Failed to insert subscription"),
        }
    }

    pub async fn remove(&self, user_id: i32, author_id: i32) -> Result<bool> {
        let result = Subscriptions::delete_many()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::AuthorId.eq(author_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Which of `author_ids` the user follows.
    pub async fn followed_among(&self, user_id: i32, author_ids: &[i32]) -> Result<HashSet<i32>> {
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<i32> = Subscriptions::find()
            .select_only()
            .column(subscriptions::Column::AuthorId)
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::AuthorId.is_in(author_ids.to_vec()))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(found.into_iter().collect())
    }

    /// One page of the authors a user follows, ordered by ID, plus the total count.
    pub async fn followed_page(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<users::Model>, u64)> {
        let followed = Query::select()
            .column(subscriptions::Column::AuthorId)
            .from(Subscriptions)
            .and_where(subscriptions::Column::UserId.eq(user_id))
            .to_owned();

        let index = super::page_index(page, page_size)?;

        let paginator = Users::find()
            .filter(users::Column::Id.in_subquery(followed))
            .order_by_asc(users::Column::Id)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;

        Ok((items, total))
    }
}
