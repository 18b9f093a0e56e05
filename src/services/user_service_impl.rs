//! `SeaORM` implementation of the `UserService` trait.

use crate::api::types::{RecipeShortDto, SetPasswordRequest, SubscriptionDto, UserDto};
use crate::api::validation::{FieldErrors, REQUIRED, validate_password};
use crate::config::Config;
use crate::db::{Store, User};
use crate::services::image::ImageService;
use crate::services::user_service::{UserError, UserService};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct SeaOrmUserService {
    store: Store,
    config: Arc<RwLock<Config>>,
    images: Arc<ImageService>,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>, images: Arc<ImageService>) -> Self {
        Self {
            store,
            config,
            images,
        }
    }

    async fn subscription_dto(
        &self,
        author: User,
        recipes_limit: Option<u64>,
        recipes_count: u64,
    ) -> Result<SubscriptionDto, UserError> {
        let recipes = self
            .store
            .list_recipes_by_author(author.id, recipes_limit)
            .await?
            .into_iter()
            .map(|recipe| RecipeShortDto {
                id: recipe.id,
                name: recipe.name,
                image: self.images.url_for(&recipe.image),
                cooking_time: recipe.cooking_time,
            })
            .collect();

        Ok(SubscriptionDto {
            user: UserDto::from_user(author, true),
            recipes,
            recipes_count,
        })
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list(
        &self,
        viewer: Option<i32>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<UserDto>, u64), UserError> {
        let (users, total) = self.store.list_users(page, page_size).await?;

        let followed = match viewer {
            Some(viewer) => {
                let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
                self.store.followed_among(viewer, &ids).await?
            }
            None => Default::default(),
        };

        let dtos = users
            .into_iter()
            .map(|user| {
                let subscribed = followed.contains(&user.id);
                UserDto::from_user(user, subscribed)
            })
            .collect();

        Ok((dtos, total))
    }

    async fn get(&self, viewer: Option<i32>, id: i32) -> Result<UserDto, UserError> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let subscribed = match viewer {
            Some(viewer) => self.store.is_subscribed(viewer, id).await?,
            None => false,
        };

        Ok(UserDto::from_user(user, subscribed))
    }

    async fn set_password(
        &self,
        user_id: i32,
        request: SetPasswordRequest,
    ) -> Result<(), UserError> {
        let mut errors = FieldErrors::new();

        let new_password = match request.new_password {
            Some(pw) if !pw.is_empty() => match validate_password(&pw) {
                Ok(()) => Some(pw),
                Err(msg) => {
                    errors.add("new_password", msg);
                    None
                }
            },
            _ => {
                errors.add("new_password", REQUIRED);
                None
            }
        };

        let current_password = match request.current_password {
            Some(pw) if !pw.is_empty() => Some(pw),
            _ => {
                errors.add("current_password", REQUIRED);
                None
            }
        };

        if let Some(current) = &current_password
            && !self.store.verify_user_password(user_id, current).await?
        {
            errors.add("current_password", "Invalid password.");
        }

        errors.into_result()?;

        let Some(new_password) = new_password else {
            return Err(FieldErrors::single("new_password", REQUIRED).into());
        };

        let security = self.config.read().await.security.clone();
        self.store
            .update_user_password(user_id, &new_password, &security)
            .await?;

        info!("Password changed for user {}", user_id);
        Ok(())
    }

    async fn subscriptions(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
        recipes_limit: Option<u64>,
    ) -> Result<(Vec<SubscriptionDto>, u64), UserError> {
        let (authors, total) = self.store.list_followed(user_id, page, page_size).await?;

        let author_ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
        let counts = self.store.count_recipes_by_authors(&author_ids).await?;

        let mut dtos = Vec::with_capacity(authors.len());
        for author in authors {
            let count = counts.get(&author.id).copied().unwrap_or(0);
            dtos.push(
                self.subscription_dto(User::from(author), recipes_limit, count)
                    .await?,
            );
        }

        Ok((dtos, total))
    }

    async fn subscribe(
        &self,
        user_id: i32,
        author_id: i32,
        recipes_limit: Option<u64>,
    ) -> Result<SubscriptionDto, UserError> {
        let author = self
            .store
            .get_user(author_id)
            .await?
            .ok_or(UserError::NotFound(author_id))?;

        if user_id == author_id {
            return Err(UserError::Rejected(
                "Unable to subscribe to yourself.".to_string(),
            ));
        }

        if !self.store.subscribe(user_id, author_id).await? {
            return Err(UserError::Rejected(
                "You are already following this user.".to_string(),
            ));
        }

        let count = self
            .store
            .count_recipes_by_authors(&[author_id])
            .await?
            .get(&author_id)
            .copied()
            .unwrap_or(0);

        self.subscription_dto(author, recipes_limit, count).await
    }

    async fn unsubscribe(&self, user_id: i32, author_id: i32) -> Result<(), UserError> {
        if self.store.get_user(author_id).await?.is_none() {
            return Err(UserError::NotFound(author_id));
        }

        if !self.store.unsubscribe(user_id, author_id).await? {
            return Err(UserError::Rejected(
                "Unable to delete non-existent subscription.".to_string(),
            ));
        }

        info!("User {} unsubscribed from {}", user_id, author_id);
        Ok(())
    }
}
