use anyhow::bail;

use crate::api::validation::{validate_password, validate_username};
use crate::config::Config;
use crate::db::{NewUser, Store};

pub async fn cmd_create_user(config: &Config, new_user: NewUser) -> anyhow::Result<()> {
    if let Err(msg) = validate_username(&new_user.username) {
        bail!("Invalid username: {msg}");
    }
    if let Err(msg) = validate_password(&new_user.password) {
        bail!("Invalid password: {msg}");
    }

    let store = Store::new(&config.general.database_path).await?;

    if store.get_user_by_email(&new_user.email).await?.is_some() {
        bail!("A user with email '{}' already exists", new_user.email);
    }

    let user = store.create_user(new_user, &config.security).await?;

    println!("✓ Created user {} (id {})", user.username, user.id);
    println!("  Token: {}", user.auth_token);
    Ok(())
}

pub async fn cmd_token(config: &Config, email: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if store.get_user_by_email(email).await?.is_none() {
        bail!("No user with email '{email}'");
    }

    let token = store.regenerate_auth_token(email).await?;
    println!("{token}");
    Ok(())
}
