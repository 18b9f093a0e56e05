use anyhow::bail;

use crate::api::validation::{validate_color, validate_slug};
use crate::config::Config;
use crate::db::Store;

pub async fn cmd_add_tag(
    config: &Config,
    name: &str,
    color: &str,
    slug: &str,
) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        bail!("Tag name must not be empty");
    }
    if let Err(msg) = validate_color(color) {
        bail!("Invalid color: {msg}");
    }
    if let Err(msg) = validate_slug(slug) {
        bail!("Invalid slug: {msg}");
    }

    let store = Store::new(&config.general.database_path).await?;
    let tag = store.add_tag(name.trim(), color, slug).await?;

    println!("✓ Added tag '{}' ({}, {}) with id {}", tag.name, tag.color, tag.slug, tag.id);
    Ok(())
}

pub async fn cmd_add_ingredient(config: &Config, name: &str, unit: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() || unit.trim().is_empty() {
        bail!("Ingredient name and unit must not be empty");
    }

    let store = Store::new(&config.general.database_path).await?;
    let ingredient = store.add_ingredient(name.trim(), unit.trim()).await?;

    println!(
        "✓ Added ingredient '{}' ({}) with id {}",
        ingredient.name, ingredient.measurement_unit, ingredient.id
    );
    Ok(())
}
