//! Domain service for user profiles, passwords and subscriptions.

use crate::api::types::{SetPasswordRequest, SubscriptionDto, UserDto};
use crate::api::validation::FieldErrors;
use thiserror::Error;

/// Errors specific to user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(i32),

    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// A subscription toggle that does not apply in the current state.
    #[error("{0}")]
    Rejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<FieldErrors> for UserError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Domain service trait for users.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// One page of users ordered by ID, plus the total count.
    async fn list(
        &self,
        viewer: Option<i32>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<UserDto>, u64), UserError>;

    async fn get(&self, viewer: Option<i32>, id: i32) -> Result<UserDto, UserError>;

    /// Changes the password after verifying the current one.
    async fn set_password(
        &self,
        user_id: i32,
        request: SetPasswordRequest,
    ) -> Result<(), UserError>;

    /// Authors the user follows, each with up to `recipes_limit` recipes.
    async fn subscriptions(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
        recipes_limit: Option<u64>,
    ) -> Result<(Vec<SubscriptionDto>, u64), UserError>;

    async fn subscribe(
        &self,
        user_id: i32,
        author_id: i32,
        recipes_limit: Option<u64>,
    ) -> Result<SubscriptionDto, UserError>;

    async fn unsubscribe(&self, user_id: i32, author_id: i32) -> Result<(), UserError>;
}
