use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    ImageService, RecipeService, SeaOrmRecipeService, SeaOrmUserService, UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub recipe_service: Arc<dyn RecipeService>,

    pub user_service: Arc<dyn UserService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wire services around an already-open store.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let image_service = Arc::new(ImageService::new(&config.media));
        let config = Arc::new(RwLock::new(config));

        let recipe_service = Arc::new(SeaOrmRecipeService::new(
            store.clone(),
            config.clone(),
            image_service.clone(),
        )) as Arc<dyn RecipeService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            config.clone(),
            image_service,
        )) as Arc<dyn UserService + Send + Sync + 'static>;

        Self {
            config,
            store,
            recipe_service,
            user_service,
        }
    }
}
