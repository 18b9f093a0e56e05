//! `SeaORM` implementation of the `RecipeService` trait.

use crate::api::types::{
    RecipeDto, RecipeIngredientDto, RecipeShortDto, RecipeWriteRequest, TagDto, UserDto,
};
use crate::api::validation::{FieldErrors, INVALID_INTEGER, REQUIRED};
use crate::config::Config;
use crate::db::Store;
use crate::entities::recipes;
use crate::models::recipe::{IngredientAmount, RecipeFilter, RecipeList, RecipeWrite};
use crate::services::image::{DecodedImage, ImageService};
use crate::services::recipe_service::{RecipeError, RecipeService, ShoppingDocument};
use crate::services::shopping_list::{self, OutputFormat};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

const NAME_MAX_CHARS: usize = 200;
const NON_FIELD: &str = "non_field_errors";

pub struct SeaOrmRecipeService {
    store: Store,
    config: Arc<RwLock<Config>>,
    images: Arc<ImageService>,
}

impl SeaOrmRecipeService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>, images: Arc<ImageService>) -> Self {
        Self {
            store,
            config,
            images,
        }
    }

    /// Build full representations for a batch of recipes with a fixed number
    /// of queries, independent of the batch size.
    async fn represent(
        &self,
        viewer: Option<i32>,
        recipes: Vec<recipes::Model>,
    ) -> Result<Vec<RecipeDto>, RecipeError> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
        let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let mut tags = self.store.get_recipe_tags(&recipe_ids).await?;
        let mut ingredients = self.store.get_recipe_ingredients(&recipe_ids).await?;
        let authors: HashMap<i32, _> = self
            .store
            .get_users(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let (followed, favorited, in_cart) = match viewer {
            Some(user_id) => (
                self.store.followed_among(user_id, &author_ids).await?,
                self.store
                    .recipes_on_list(RecipeList::Favorites, user_id, &recipe_ids)
                    .await?,
                self.store
                    .recipes_on_list(RecipeList::ShoppingCart, user_id, &recipe_ids)
                    .await?,
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                    RecipeError::Internal(format!(
                        "Author {} of recipe {} is missing",
                        recipe.author_id, recipe.id
                    ))
                })?;

                Ok(RecipeDto {
                    id: recipe.id,
                    tags: tags
                        .remove(&recipe.id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|t| TagDto {
                            id: t.id,
                            name: t.name,
                            color: t.color,
                            slug: t.slug,
                        })
                        .collect(),
                    author: UserDto::from_user(author, followed.contains(&recipe.author_id)),
                    ingredients: ingredients
                        .remove(&recipe.id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|i| RecipeIngredientDto {
                            id: i.id,
                            name: i.name,
                            measurement_unit: i.measurement_unit,
                            amount: i.amount,
                        })
                        .collect(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    name: recipe.name,
                    image: self.images.url_for(&recipe.image),
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                })
            })
            .collect()
    }

    async fn represent_one(
        &self,
        viewer: Option<i32>,
        recipe: recipes::Model,
    ) -> Result<RecipeDto, RecipeError> {
        let id = recipe.id;
        self.represent(viewer, vec![recipe])
            .await?
            .pop()
            .ok_or(RecipeError::NotFound(id))
    }

    async fn find_owned(&self, user_id: i32, id: i32) -> Result<recipes::Model, RecipeError> {
        let recipe = self
            .store
            .get_recipe(id)
            .await?
            .ok_or(RecipeError::NotFound(id))?;

        if recipe.author_id != user_id {
            return Err(RecipeError::Forbidden(id));
        }
        Ok(recipe)
    }

    /// Full validation of a write request, including the database checks.
    /// Nothing is written until every check passed.
    async fn validate(
        &self,
        author_id: i32,
        request: &RecipeWriteRequest,
        existing_id: Option<i32>,
    ) -> Result<ValidRecipe, RecipeError> {
        let (draft, mut errors) = parse_write_request(request, existing_id.is_none());

        if let Some(ids) = &draft.tag_ids {
            let known = self.store.existing_tag_ids(ids).await?;
            for id in ids.iter().filter(|id| !known.contains(id)) {
                errors.add("tags", format!("Invalid pk \"{id}\" - object does not exist."));
            }
        }

        if let Some(items) = &draft.ingredients {
            let ids: Vec<i32> = items.iter().map(|i| i.id).collect();
            let known = self.store.existing_ingredient_ids(&ids).await?;
            for id in ids.iter().filter(|id| !known.contains(id)) {
                errors.add(
                    "ingredients",
                    format!("Invalid pk \"{id}\" - object does not exist."),
                );
            }
        }

        let image = match &draft.image {
            Some(data_uri) => match self.images.decode(data_uri) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    errors.add("image", e.to_string());
                    None
                }
            },
            None => None,
        };

        errors.into_result()?;

        let (Some(name), Some(text), Some(cooking_time), Some(tag_ids), Some(ingredients)) = (
            draft.name,
            draft.text,
            draft.cooking_time,
            draft.tag_ids,
            draft.ingredients,
        ) else {
            return Err(RecipeError::Internal(
                "Recipe draft incomplete after validation".to_string(),
            ));
        };

        if self
            .store
            .recipe_name_taken(author_id, &name, existing_id)
            .await?
        {
            return Err(FieldErrors::single(
                NON_FIELD,
                "You already have a recipe with that name.",
            )
            .into());
        }

        Ok(ValidRecipe {
            write: RecipeWrite {
                name,
                text,
                cooking_time,
                tag_ids,
                ingredients,
            },
            image,
        })
    }

    /// A unique-index race on `(author, name)` surfaces as the same field error
    /// as the pre-check.
    fn map_write_error(err: anyhow::Error) -> RecipeError {
        if crate::db::is_unique_violation(&err) {
            return FieldErrors::single(NON_FIELD, "You already have a recipe with that name.")
                .into();
        }
        err.into()
    }
}

struct ValidRecipe {
    write: RecipeWrite,
    image: Option<DecodedImage>,
}

/// Structurally parsed request. Fields that failed parsing are `None` and
/// have a matching entry in the returned errors.
#[derive(Debug, Default)]
struct RecipeDraft {
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i32>,
    tag_ids: Option<Vec<i32>>,
    ingredients: Option<Vec<IngredientAmount>>,
    image: Option<String>,
}

fn parse_write_request(
    request: &RecipeWriteRequest,
    require_image: bool,
) -> (RecipeDraft, FieldErrors) {
    let mut errors = FieldErrors::new();
    let mut draft = RecipeDraft::default();

    draft.name = parse_string(request.name.as_ref(), "name", &mut errors).and_then(|name| {
        if name.chars().count() > NAME_MAX_CHARS {
            errors.add(
                "name",
                format!("Ensure this field has no more than {NAME_MAX_CHARS} characters."),
            );
            None
        } else {
            Some(name)
        }
    });

    draft.text = parse_string(request.text.as_ref(), "text", &mut errors);

    draft.cooking_time = match request.cooking_time.as_ref() {
        None | Some(Value::Null) => {
            errors.add("cooking_time", REQUIRED);
            None
        }
        Some(value) => parse_positive_i32(value, "cooking_time", &mut errors),
    };

    draft.tag_ids = parse_tags(request.tags.as_ref(), &mut errors);
    draft.ingredients = parse_ingredients(request.ingredients.as_ref(), &mut errors);

    draft.image = match request.image.as_ref() {
        None | Some(Value::Null) => {
            if require_image {
                errors.add("image", REQUIRED);
            }
            None
        }
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.add("image", "The submitted file is empty.");
            None
        }
        Some(_) => {
            errors.add(
                "image",
                "The submitted data was not a file. Check the encoding type on the form.",
            );
            None
        }
    };

    (draft, errors)
}

fn parse_string(value: Option<&Value>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            None
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                errors.add(field, "This field may not be blank.");
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            errors.add(field, "Not a valid string.");
            None
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_positive_i32(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<i32> {
    let Some(number) = as_integer(value) else {
        errors.add(field, INVALID_INTEGER);
        return None;
    };
    if number < 1 {
        errors.add(field, "Ensure this value is greater than or equal to 1.");
        return None;
    }
    match i32::try_from(number) {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(
                field,
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
    }
}

fn parse_tags(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Vec<i32>> {
    let items = match value {
        None | Some(Value::Null) => {
            errors.add("tags", REQUIRED);
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("tags", "Expected a list of items.");
            return None;
        }
    };

    if items.is_empty() {
        errors.add("tags", "This list may not be empty.");
        return None;
    }

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match as_integer(item).and_then(|n| i32::try_from(n).ok()) {
            Some(id) => ids.push(id),
            None => {
                errors.add(
                    "tags",
                    format!("Incorrect type. Expected pk value, received {item}."),
                );
                return None;
            }
        }
    }

    if has_duplicates(&ids) {
        errors.add("tags", "Unable to add the same tag multiple times.");
        return None;
    }

    Some(ids)
}

fn parse_ingredients(
    value: Option<&Value>,
    errors: &mut FieldErrors,
) -> Option<Vec<IngredientAmount>> {
    let items = match value {
        None | Some(Value::Null) => {
            errors.add("ingredients", REQUIRED);
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("ingredients", "Expected a list of items.");
            return None;
        }
    };

    if items.is_empty() {
        errors.add("ingredients", "This list may not be empty.");
        return None;
    }

    let mut parsed = Vec::with_capacity(items.len());
    let mut valid = true;
    for item in items {
        let Some(object) = item.as_object() else {
            errors.add("ingredients", "Each ingredient must be an object with id and amount.");
            valid = false;
            continue;
        };

        let id = match object.get("id") {
            None | Some(Value::Null) => {
                errors.add("ingredients", "Ingredient id: This field is required.");
                None
            }
            Some(v) => as_integer(v).and_then(|n| i32::try_from(n).ok()).or_else(|| {
                errors.add(
                    "ingredients",
                    format!("Incorrect type. Expected pk value, received {v}."),
                );
                None
            }),
        };

        let amount = match object.get("amount") {
            None | Some(Value::Null) => {
                errors.add("ingredients", "Ingredient amount: This field is required.");
                None
            }
            Some(v) => match as_integer(v) {
                None => {
                    errors.add("ingredients", format!("Ingredient amount: {INVALID_INTEGER}"));
                    None
                }
                Some(n) if n < 1 => {
                    errors.add(
                        "ingredients",
                        "Ingredient amount: Ensure this value is greater than or equal to 1.",
                    );
                    None
                }
                Some(n) => i32::try_from(n).ok().or_else(|| {
                    errors.add(
                        "ingredients",
                        format!(
                            "Ingredient amount: Ensure this value is less than or equal to {}.",
                            i32::MAX
                        ),
                    );
                    None
                }),
            },
        };

        match (id, amount) {
            (Some(id), Some(amount)) => parsed.push(IngredientAmount { id, amount }),
            _ => valid = false,
        }
    }

    if !valid {
        return None;
    }

    let ids: Vec<i32> = parsed.iter().map(|i| i.id).collect();
    if has_duplicates(&ids) {
        errors.add(
            "ingredients",
            "Unable to add the same ingredient multiple times.",
        );
        return None;
    }

    Some(parsed)
}

fn has_duplicates(ids: &[i32]) -> bool {
    let mut seen = HashSet::with_capacity(ids.len());
    !ids.iter().all(|id| seen.insert(*id))
}

#[async_trait]
impl RecipeService for SeaOrmRecipeService {
    async fn list(
        &self,
        viewer: Option<i32>,
        filter: &RecipeFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<RecipeDto>, u64), RecipeError> {
        let (recipes, total) = self
            .store
            .list_recipes(filter, viewer, page, page_size)
            .await?;
        let dtos = self.represent(viewer, recipes).await?;
        Ok((dtos, total))
    }

    async fn get(&self, viewer: Option<i32>, id: i32) -> Result<RecipeDto, RecipeError> {
        let recipe = self
            .store
            .get_recipe(id)
            .await?
            .ok_or(RecipeError::NotFound(id))?;
        self.represent_one(viewer, recipe).await
    }

    async fn create(
        &self,
        author_id: i32,
        request: RecipeWriteRequest,
    ) -> Result<RecipeDto, RecipeError> {
        let valid = self.validate(author_id, &request, None).await?;
        let image = valid.image.ok_or_else(|| FieldErrors::single("image", REQUIRED))?;

        let image_path = self.images.save(&image).await?;

        let id = match self
            .store
            .create_recipe(author_id, &valid.write, &image_path)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.images.remove(&image_path).await;
                return Err(Self::map_write_error(e));
            }
        };

        self.get(Some(author_id), id).await
    }

    async fn update(
        &self,
        user_id: i32,
        id: i32,
        request: RecipeWriteRequest,
    ) -> Result<RecipeDto, RecipeError> {
        let existing = self.find_owned(user_id, id).await?;
        let valid = self.validate(user_id, &request, Some(id)).await?;

        let new_image = match &valid.image {
            Some(image) => Some(self.images.save(image).await?),
            None => None,
        };

        if let Err(e) = self
            .store
            .update_recipe(id, &valid.write, new_image.as_deref())
            .await
        {
            if let Some(path) = &new_image {
                self.images.remove(path).await;
            }
            return Err(Self::map_write_error(e));
        }

        if new_image.is_some() {
            self.images.remove(&existing.image).await;
        }

        self.get(Some(user_id), id).await
    }

    async fn delete(&self, user_id: i32, id: i32) -> Result<(), RecipeError> {
        let existing = self.find_owned(user_id, id).await?;

        if !self.store.delete_recipe(id).await? {
            return Err(RecipeError::NotFound(id));
        }
        self.images.remove(&existing.image).await;

        info!("Deleted recipe {} '{}'", id, existing.name);
        Ok(())
    }

    async fn add_to_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<RecipeShortDto, RecipeError> {
        let recipe = self
            .store
            .get_recipe(recipe_id)
            .await?
            .ok_or(RecipeError::NotFound(recipe_id))?;

        if !self.store.add_to_list(list, user_id, recipe_id).await? {
            return Err(RecipeError::Rejected(format!(
                "This recipe was already on your {list} list."
            )));
        }

        Ok(RecipeShortDto {
            id: recipe.id,
            name: recipe.name,
            image: self.images.url_for(&recipe.image),
            cooking_time: recipe.cooking_time,
        })
    }

    async fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<(), RecipeError> {
        if self.store.get_recipe(recipe_id).await?.is_none() {
            return Err(RecipeError::NotFound(recipe_id));
        }

        if !self
            .store
            .remove_from_list(list, user_id, recipe_id)
            .await?
        {
            return Err(RecipeError::Rejected(format!(
                "This recipe was not on your {list} list."
            )));
        }

        Ok(())
    }

    async fn shopping_list(
        &self,
        user_id: i32,
        format: OutputFormat,
    ) -> Result<ShoppingDocument, RecipeError> {
        let settings = self.config.read().await.shopping_list.clone();

        let totals = self.store.shopping_totals(user_id).await?;
        let contributions = if settings.show_recipe_breakdown {
            self.store.shopping_contributions(user_id).await?
        } else {
            Vec::new()
        };
        let items = shopping_list::assemble(totals, contributions);
        let pages =
            shopping_list::layout(&settings.title, &items, settings.show_recipe_breakdown);

        let format = if format == OutputFormat::Pdf
            && settings.font_path.is_none()
            && !shopping_list::fits_builtin_font(&settings.title, &pages)
        {
            warn!(
                user_id,
                "Shopping list needs an embedded font; set shopping_list.font_path for PDF output, \
                 serving plain text"
            );
            OutputFormat::Text
        } else {
            format
        };

        let (filename, body) = match format {
            OutputFormat::Text => {
                let stem = settings
                    .filename
                    .rsplit_once('.')
                    .map_or(settings.filename.as_str(), |(stem, _)| stem);
                (
                    format!("{stem}.txt"),
                    shopping_list::render_text(&pages).into_bytes(),
                )
            }
            OutputFormat::Pdf => {
                let title = settings.title.clone();
                let font_path = settings.font_path.as_ref().map(PathBuf::from);
                let body = tokio::task::spawn_blocking(move || {
                    shopping_list::render_pdf(&title, &pages, font_path.as_deref())
                })
                .await
                .map_err(|e| RecipeError::Internal(format!("PDF task failed: {e}")))??;
                (settings.filename.clone(), body)
            }
        };

        if items.is_empty() {
            warn!(user_id, "Shopping list requested with an empty cart");
        }
        info!(user_id, lines = items.len(), "Rendered shopping list");

        Ok(ShoppingDocument {
            filename,
            content_type: format.content_type(),
            body,
        })
    }
}
