use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{ingredients, recipes, tags, users};
use crate::models::recipe::{
    RecipeFilter, RecipeIngredientRow, RecipeList, RecipeTagRow, RecipeWrite,
};
use crate::models::shopping::{ShoppingContributionRow, ShoppingTotalRow};

pub mod migrator;
pub mod repositories;

pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        conn.execute_unprepared("PRAGMA foreign_keys = ON").await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn tag_repo(&self) -> repositories::tag::TagRepository {
        repositories::tag::TagRepository::new(self.conn.clone())
    }

    fn ingredient_repo(&self) -> repositories::ingredient::IngredientRepository {
        repositories::ingredient::IngredientRepository::new(self.conn.clone())
    }

    fn recipe_repo(&self) -> repositories::recipe::RecipeRepository {
        repositories::recipe::RecipeRepository::new(self.conn.clone())
    }

    fn recipe_list_repo(&self) -> repositories::recipe_list::RecipeListRepository {
        repositories::recipe_list::RecipeListRepository::new(self.conn.clone())
    }

    fn subscription_repo(&self) -> repositories::subscription::SubscriptionRepository {
        repositories::subscription::SubscriptionRepository::new(self.conn.clone())
    }

    fn shopping_repo(&self) -> repositories::shopping::ShoppingRepository {
        repositories::shopping::ShoppingRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn create_user(&self, user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(user, config).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_users(&self, ids: &[i32]) -> Result<Vec<User>> {
        self.user_repo().get_many(ids).await
    }

    pub async fn list_users(&self, page: u64, page_size: u64) -> Result<(Vec<User>, u64)> {
        self.user_repo().list_page(page, page_size).await
    }

    pub async fn verify_auth_token(&self, token: &str) -> Result<Option<User>> {
        self.user_repo().verify_token(token).await
    }

    pub async fn verify_user_password(&self, user_id: i32, password: &str) -> Result<bool> {
        self.user_repo().verify_password(user_id, password).await
    }

    pub async fn update_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(user_id, new_password, config)
            .await
    }

    pub async fn regenerate_auth_token(&self, email: &str) -> Result<String> {
        self.user_repo().regenerate_token(email).await
    }

    // ========== Tags & ingredients ==========

    pub async fn add_tag(&self, name: &str, color: &str, slug: &str) -> Result<tags::Model> {
        self.tag_repo().add(name, color, slug).await
    }

    pub async fn get_tag(&self, id: i32) -> Result<Option<tags::Model>> {
        self.tag_repo().get(id).await
    }

    pub async fn list_tags(&self) -> Result<Vec<tags::Model>> {
        self.tag_repo().list_all().await
    }

    pub async fn existing_tag_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        self.tag_repo().existing_ids(ids).await
    }

    pub async fn add_ingredient(&self, name: &str, unit: &str) -> Result<ingredients::Model> {
        self.ingredient_repo().add(name, unit).await
    }

    pub async fn get_ingredient(&self, id: i32) -> Result<Option<ingredients::Model>> {
        self.ingredient_repo().get(id).await
    }

    pub async fn search_ingredients(&self, name: Option<&str>) -> Result<Vec<ingredients::Model>> {
        self.ingredient_repo().search(name).await
    }

    pub async fn existing_ingredient_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        self.ingredient_repo().existing_ids(ids).await
    }

    // ========== Recipes ==========

    pub async fn create_recipe(
        &self,
        author_id: i32,
        recipe: &RecipeWrite,
        image: &str,
    ) -> Result<i32> {
        self.recipe_repo().create(author_id, recipe, image).await
    }

    pub async fn update_recipe(
        &self,
        id: i32,
        recipe: &RecipeWrite,
        image: Option<&str>,
    ) -> Result<()> {
        self.recipe_repo().update(id, recipe, image).await
    }

    pub async fn delete_recipe(&self, id: i32) -> Result<bool> {
        self.recipe_repo().delete(id).await
    }

    pub async fn get_recipe(&self, id: i32) -> Result<Option<recipes::Model>> {
        self.recipe_repo().get(id).await
    }

    pub async fn recipe_name_taken(
        &self,
        author_id: i32,
        name: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool> {
        self.recipe_repo()
            .name_taken(author_id, name, exclude_id)
            .await
    }

    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<i32>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<recipes::Model>, u64)> {
        self.recipe_repo()
            .list_page(filter, viewer, page, page_size)
            .await
    }

    pub async fn list_recipes_by_author(
        &self,
        author_id: i32,
        limit: Option<u64>,
    ) -> Result<Vec<recipes::Model>> {
        self.recipe_repo().list_by_author(author_id, limit).await
    }

    pub async fn count_recipes_by_authors(&self, author_ids: &[i32]) -> Result<HashMap<i32, u64>> {
        self.recipe_repo().count_by_authors(author_ids).await
    }

    pub async fn get_recipe_tags(
        &self,
        recipe_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<RecipeTagRow>>> {
        self.recipe_repo().tags_for(recipe_ids).await
    }

    pub async fn get_recipe_ingredients(
        &self,
        recipe_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<RecipeIngredientRow>>> {
        self.recipe_repo().ingredients_for(recipe_ids).await
    }

    // ========== Favorites & shopping cart ==========

    pub async fn add_to_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool> {
        self.recipe_list_repo().add(list, user_id, recipe_id).await
    }

    pub async fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool> {
        self.recipe_list_repo().remove(list, user_id, recipe_id).await
    }

    pub async fn recipes_on_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<HashSet<i32>> {
        self.recipe_list_repo()
            .recipe_ids_in(list, user_id, recipe_ids)
            .await
    }

    // ========== Subscriptions ==========

    pub async fn subscribe(&self, user_id: i32, author_id: i32) -> Result<bool> {
        self.subscription_repo().add(user_id, author_id).await
    }

    pub async fn unsubscribe(&self, user_id: i32, author_id: i32) -> Result<bool> {
        self.subscription_repo().remove(user_id, author_id).await
    }

    pub async fn is_subscribed(&self, user_id: i32, author_id: i32) -> Result<bool> {
        self.subscription_repo().exists(user_id, author_id).await
    }

    pub async fn followed_among(&self, user_id: i32, author_ids: &[i32]) -> Result<HashSet<i32>> {
        self.subscription_repo()
            .followed_among(user_id, author_ids)
            .await
    }

    pub async fn list_followed(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<users::Model>, u64)> {
        self.subscription_repo()
            .followed_page(user_id, page, page_size)
            .await
    }

    // ========== Shopping list ==========

    pub async fn shopping_totals(&self, user_id: i32) -> Result<Vec<ShoppingTotalRow>> {
        self.shopping_repo().totals(user_id).await
    }

    pub async fn shopping_contributions(
        &self,
        user_id: i32,
    ) -> Result<Vec<ShoppingContributionRow>> {
        self.shopping_repo().contributions(user_id).await
    }
}

/// Whether an error chain bottoms out in a unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<DbErr>()
            .is_some_and(|db| matches!(db.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))))
    })
}
