use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::User;
use crate::entities::{ingredients, tags};

// ============================================================================
// Representations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagDto {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tags::Model> for TagDto {
    fn from(tag: tags::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientDto {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredients::Model> for IngredientDto {
    fn from(ingredient: ingredients::Model) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserDto {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserDto {
    #[must_use]
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredientDto {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeDto {
    pub id: i32,
    pub tags: Vec<TagDto>,
    pub author: UserDto,
    pub ingredients: Vec<RecipeIngredientDto>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact recipe used by list toggles and subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeShortDto {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionDto {
    #[serde(flatten)]
    pub user: UserDto,
    pub recipes: Vec<RecipeShortDto>,
    pub recipes_count: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

// ============================================================================
// Requests
// ============================================================================

/// Recipe create/update body. Fields stay loosely typed so that type errors
/// surface as field errors rather than body rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeWriteRequest {
    pub tags: Option<Value>,
    pub ingredients: Option<Value>,
    pub image: Option<Value>,
    pub name: Option<Value>,
    pub text: Option<Value>,
    pub cooking_time: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShoppingListQuery {
    pub format: Option<String>,
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap one page of results, deriving `next`/`previous` from the request
    /// path and query with only the `page` parameter replaced.
    #[must_use]
    pub fn new(
        results: Vec<T>,
        count: u64,
        page: u64,
        limit: u64,
        path: &str,
        query: &[(String, String)],
    ) -> Self {
        let has_next = page.saturating_mul(limit) < count;
        let next = has_next.then(|| page_link(path, query, Some(page + 1)));
        let previous = (page > 1).then(|| {
            let target = page - 1;
            page_link(path, query, (target > 1).then_some(target))
        });

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(path: &str, query: &[(String, String)], page: Option<u64>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in query.iter().filter(|(k, _)| k != "page") {
        serializer.append_pair(key, value);
    }
    if let Some(page) = page {
        serializer.append_pair("page", &page.to_string());
    }
    let encoded = serializer.finish();

    if encoded.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_first_page_links() {
        let page = Page::new(vec![1, 2], 5, 1, 2, "/api/recipes/", &[]);
        assert_eq!(page.next.as_deref(), Some("/api/recipes/?page=2"));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn test_last_page_links_keep_filters() {
        let q = query(&[("tags", "lunch"), ("page", "3"), ("limit", "2")]);
        let page = Page::new(vec![5], 5, 3, 2, "/api/recipes/", &q);
        assert_eq!(page.next, None);
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/recipes/?tags=lunch&limit=2&page=2")
        );
    }

    #[test]
    fn test_previous_to_first_page_drops_page_param() {
        let q = query(&[("page", "2")]);
        let page = Page::new(vec![3], 3, 2, 2, "/api/users/", &q);
        assert_eq!(page.previous.as_deref(), Some("/api/users/"));
    }

    #[test]
    fn test_subscription_flattens_user() {
        let dto = SubscriptionDto {
            user: UserDto {
                email: "a@b.c".to_string(),
                id: 1,
                username: "anna".to_string(),
                first_name: "Anna".to_string(),
                last_name: "K".to_string(),
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 0,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["username"], "anna");
        assert_eq!(json["recipes_count"], 0);
    }
}
