use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_recipes_author_name ON recipes(author_id, name)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_recipes_pub_date ON recipes(pub_date)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_subscriptions_user_author ON subscriptions(user_id, author_id)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_ingredients_search_name ON ingredients(search_name)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_ingredients_search_name")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_subscriptions_user_author")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_recipes_pub_date")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_recipes_author_name")
            .await?;

        Ok(())
    }
}
