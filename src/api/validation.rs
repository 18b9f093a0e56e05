use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ApiConfig;
use crate::models::recipe::RecipeFilter;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const INVALID_BOOLEAN: &str = "Must be a valid boolean.";

/// Per-field validation messages, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// 1-based page number plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    /// Row offset of the first result, `None` when it cannot be expressed as
    /// a SQL offset.
    #[must_use]
    pub fn offset(self) -> Option<u64> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

/// Raw `key=value` pairs of a query string, in order, repeats kept.
#[must_use]
pub fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn parse_bool_flag(value: &str) -> Result<bool, &'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(INVALID_BOOLEAN),
    }
}

fn parse_positive(
    pairs: &[(String, String)],
    key: &str,
    errors: &mut FieldErrors,
) -> Option<u64> {
    let raw = last_value(pairs, key)?;
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) => {
            errors.add(key, "Ensure this value is greater than or equal to 1.");
            None
        }
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(key, INVALID_INTEGER);
            None
        }
    }
}

/// `page` and `limit`, with `limit` clamped to the configured maximum.
pub fn parse_page_params(
    pairs: &[(String, String)],
    api: &ApiConfig,
) -> Result<PageParams, FieldErrors> {
    let mut errors = FieldErrors::new();
    let page = parse_positive(pairs, "page", &mut errors).unwrap_or(1);
    let limit = parse_positive(pairs, "limit", &mut errors)
        .unwrap_or(api.default_page_size)
        .min(api.max_page_size);
    errors.into_result()?;
    Ok(PageParams { page, limit })
}

pub fn parse_recipe_filter(pairs: &[(String, String)]) -> Result<RecipeFilter, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut filter = RecipeFilter::default();

    for (key, value) in pairs {
        match key.as_str() {
            "tags" if !value.is_empty() => {
                if !filter.tags.contains(value) {
                    filter.tags.push(value.clone());
                }
            }
            "author" if !value.is_empty() => match value.parse::<i32>() {
                Ok(id) => filter.author = Some(id),
                Err(_) => errors.add("author", INVALID_INTEGER),
            },
            "is_favorited" if !value.is_empty() => match parse_bool_flag(value) {
                Ok(flag) => filter.is_favorited = Some(flag),
                Err(msg) => errors.add("is_favorited", msg),
            },
            "is_in_shopping_cart" if !value.is_empty() => match parse_bool_flag(value) {
                Ok(flag) => filter.is_in_shopping_cart = Some(flag),
                Err(msg) => errors.add("is_in_shopping_cart", msg),
            },
            _ => {}
        }
    }

    errors.into_result()?;
    Ok(filter)
}

/// Optional `recipes_limit` used by subscription representations. Zero means
/// no limit.
pub fn parse_recipes_limit(pairs: &[(String, String)]) -> Result<Option<u64>, FieldErrors> {
    match last_value(pairs, "recipes_limit") {
        None | Some("" | "0") => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| FieldErrors::single("recipes_limit", INVALID_INTEGER)),
    }
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() || username.chars().count() > 150 {
        return Err("Username must be between 1 and 150 characters.".to_string());
    }
    if username.eq_ignore_ascii_case("me") {
        return Err("Username \"me\" is not allowed.".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(concat!(
            "Enter a valid username. This value may contain only letters, ",
            "numbers, and @/./+/-/_ characters."
        )
        .to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Ensure this field has at least 8 characters.".to_string());
    }
    Ok(())
}

/// `#RRGGBB` hex color.
pub fn validate_color(color: &str) -> Result<(), String> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(format!("Invalid color '{color}', expected #RRGGBB"))
    }
}

pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty()
        || slug.len() > 200
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!(
            "Invalid slug '{slug}', use letters, numbers, hyphens and underscores"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &str) -> Vec<(String, String)> {
        query_pairs(Some(query))
    }

    #[test]
    fn test_parse_bool_flag() {
        assert_eq!(parse_bool_flag("1"), Ok(true));
        assert_eq!(parse_bool_flag("True"), Ok(true));
        assert_eq!(parse_bool_flag("0"), Ok(false));
        assert_eq!(parse_bool_flag("false"), Ok(false));
        assert!(parse_bool_flag("yes").is_err());
    }

    #[test]
    fn test_recipe_filter_collects_repeated_tags() {
        let query = pairs("tags=breakfast&tags=lunch&tags=breakfast&author=3");
        let filter = parse_recipe_filter(&query).unwrap();
        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.is_favorited, None);
    }

    #[test]
    fn test_recipe_filter_rejects_bad_values() {
        let errors = parse_recipe_filter(&pairs("author=abc&is_favorited=maybe")).unwrap_err();
        assert!(errors.contains("author"));
        assert!(errors.contains("is_favorited"));
        assert!(!errors.contains("is_in_shopping_cart"));
    }

    #[test]
    fn test_page_params_defaults_and_clamp() {
        let api = ApiConfig::default();
        let params = parse_page_params(&[], &api).unwrap();
        assert_eq!(params, PageParams { page: 1, limit: 6 });

        let params = parse_page_params(&pairs("page=3&limit=1000"), &api).unwrap();
        assert_eq!(params, PageParams { page: 3, limit: 100 });

        assert!(parse_page_params(&pairs("page=0"), &api).is_err());
        assert!(parse_page_params(&pairs("limit=x"), &api).is_err());
    }

    #[test]
    fn test_page_offset_bounds() {
        assert_eq!(PageParams { page: 1, limit: 6 }.offset(), Some(0));
        assert_eq!(PageParams { page: 3, limit: 6 }.offset(), Some(12));
        assert_eq!(PageParams { page: u64::MAX, limit: 6 }.offset(), None);
        assert_eq!(
            PageParams {
                page: u64::MAX / 2 + 2,
                limit: 1
            }
            .offset(),
            None
        );
    }

    #[test]
    fn test_recipes_limit_zero_means_all() {
        assert_eq!(parse_recipes_limit(&pairs("recipes_limit=0")), Ok(None));
        assert_eq!(parse_recipes_limit(&pairs("")), Ok(None));
        assert_eq!(parse_recipes_limit(&pairs("recipes_limit=3")), Ok(Some(3)));
        assert!(parse_recipes_limit(&pairs("recipes_limit=-1")).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("chef.anna+1@home").is_ok());
        assert!(validate_username("me").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_validate_color_and_slug() {
        assert!(validate_color("#E26C2D").is_ok());
        assert!(validate_color("E26C2D").is_err());
        assert!(validate_color("#GGGGGG").is_err());
        assert!(validate_slug("breakfast").is_ok());
        assert!(validate_slug("has space").is_err());
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let mut errors = FieldErrors::new();
        errors.add("name", REQUIRED);
        errors.add("name", "second");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"name": [REQUIRED, "second"]}));
    }
}
