mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ids, recipe_body};
use foodgram::models::recipe::{IngredientAmount, RecipeWrite};
use serde_json::json;

struct Kitchen {
    app: TestApp,
    breakfast: i32,
    lunch: i32,
    flour: i32,
    milk: i32,
    eggs: i32,
}

async fn kitchen() -> Kitchen {
    kitchen_with(|_| {}).await
}

async fn kitchen_with(adjust: impl FnOnce(&mut foodgram::Config)) -> Kitchen {
    let app = TestApp::with_config(adjust).await;
    let breakfast = app.tag("Breakfast", "#E26C2D", "breakfast").await;
    let lunch = app.tag("Lunch", "#49B64E", "lunch").await;
    let flour = app.ingredient("flour", "g").await;
    let milk = app.ingredient("milk", "ml").await;
    let eggs = app.ingredient("eggs", "pcs").await;
    Kitchen {
        app,
        breakfast,
        lunch,
        flour,
        milk,
        eggs,
    }
}

#[tokio::test]
async fn test_create_and_get_recipe() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;

    let (status, body) = k
        .app
        .post(
            "/api/recipes/",
            &alice.auth_token,
            Some(recipe_body(
                "Pancakes",
                &[k.breakfast],
                &[(k.flour, 150), (k.milk, 200)],
            )),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["name"], "Pancakes");
    assert_eq!(body["author"]["username"], "alice");
    assert_eq!(body["tags"][0]["slug"], "breakfast");
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(body["is_favorited"], false);
    assert_eq!(body["is_in_shopping_cart"], false);
    let image = body["image"].as_str().unwrap();
    assert!(image.starts_with("/media/recipes/"), "{image}");
    assert!(image.ends_with(".png"), "{image}");

    let id = body["id"].as_i64().unwrap();
    let (status, body) = k.app.get(&format!("/api/recipes/{id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Mix everything.");
    assert_eq!(body["cooking_time"], 10);

    let (status, _) = k.app.get("/api/recipes/9999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_requires_authentication() {
    let k = kitchen().await;

    let (status, body) = k
        .app
        .json(
            Method::POST,
            "/api/recipes/",
            None,
            Some(recipe_body("Pancakes", &[k.breakfast], &[(k.flour, 1)])),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_recipe_validation_errors() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;

    let (status, body) = k
        .app
        .post("/api/recipes/", &alice.auth_token, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["tags", "ingredients", "image", "name", "text", "cooking_time"] {
        assert_eq!(body[field], json!(["This field is required."]), "{field}");
    }

    let mut request = recipe_body(
        "Pancakes",
        &[k.breakfast, k.breakfast],
        &[(k.flour, 10), (k.flour, 20)],
    );
    request["cooking_time"] = json!(0);
    let (status, body) = k
        .app
        .post("/api/recipes/", &alice.auth_token, Some(request))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["tags"],
        json!(["Unable to add the same tag multiple times."])
    );
    assert_eq!(
        body["ingredients"],
        json!(["Unable to add the same ingredient multiple times."])
    );
    assert!(body["cooking_time"].is_array());

    let (status, body) = k
        .app
        .post(
            "/api/recipes/",
            &alice.auth_token,
            Some(recipe_body("Pancakes", &[k.breakfast], &[(999, 10)])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["ingredients"],
        json!(["Invalid pk \"999\" - object does not exist."])
    );

    let mut request = recipe_body("Pancakes", &[k.breakfast], &[(k.flour, 10)]);
    request["image"] = json!("not an image");
    let (status, body) = k
        .app
        .post("/api/recipes/", &alice.auth_token, Some(request))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["image"].is_array());

    let (_, body) = k.app.get("/api/recipes/", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_recipe_names_are_unique_per_author() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let bob = k.app.user("bob").await;

    k.app
        .recipe(&alice.auth_token, "Pancakes", &[k.breakfast], &[(k.flour, 1)])
        .await;

    let (status, body) = k
        .app
        .post(
            "/api/recipes/",
            &alice.auth_token,
            Some(recipe_body("Pancakes", &[k.lunch], &[(k.milk, 1)])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["non_field_errors"],
        json!(["You already have a recipe with that name."])
    );

    k.app
        .recipe(&bob.auth_token, "Pancakes", &[k.breakfast], &[(k.flour, 1)])
        .await;
}

#[tokio::test]
async fn test_only_author_may_modify() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let bob = k.app.user("bob").await;
    let id = k
        .app
        .recipe(&alice.auth_token, "Pancakes", &[k.breakfast], &[(k.flour, 100)])
        .await;
    let uri = format!("/api/recipes/{id}/");

    let mut update = recipe_body("Crepes", &[k.lunch], &[(k.milk, 300), (k.eggs, 2)]);
    update.as_object_mut().unwrap().remove("image");

    let (status, _) = k
        .app
        .json(Method::PATCH, &uri, Some(bob.auth_token.as_str()), Some(update.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = k.app.delete(&uri, &bob.auth_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, before) = k.app.get(&uri, None).await;

    let (status, body) = k
        .app
        .json(Method::PATCH, &uri, Some(alice.auth_token.as_str()), Some(update))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Crepes");
    assert_eq!(body["tags"].as_array().unwrap().len(), 1);
    assert_eq!(body["tags"][0]["slug"], "lunch");
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(body["image"], before["image"]);

    let (status, _) = k.app.delete(&uri, &alice.auth_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = k.app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejected_update_keeps_recipe_intact() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let id = k
        .app
        .recipe(
            &alice.auth_token,
            "Pancakes",
            &[k.breakfast, k.lunch],
            &[(k.flour, 5)],
        )
        .await;
    let uri = format!("/api/recipes/{id}/");

    let mut update = recipe_body("Crepes", &[k.lunch], &[(k.milk, 300), (999, 1)]);
    update.as_object_mut().unwrap().remove("image");
    let (status, body) = k
        .app
        .json(Method::PATCH, &uri, Some(alice.auth_token.as_str()), Some(update))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["ingredients"].is_array(), "{body}");

    let broken = RecipeWrite {
        name: "Crepes".to_string(),
        text: "Mix everything.".to_string(),
        cooking_time: 10,
        tag_ids: vec![k.lunch],
        ingredients: vec![
            IngredientAmount {
                id: k.milk,
                amount: 300,
            },
            IngredientAmount {
                id: k.eggs,
                amount: 0,
            },
        ],
    };
    let recipe_id = i32::try_from(id).unwrap();
    assert!(k.app.store.update_recipe(recipe_id, &broken, None).await.is_err());

    let (status, body) = k.app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pancakes");
    assert_eq!(body["tags"].as_array().unwrap().len(), 2);
    let ingredients = body["ingredients"].as_array().unwrap();
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0]["name"], "flour");
    assert_eq!(ingredients[0]["amount"], 5);
}

#[tokio::test]
async fn test_filter_by_tags_and_author() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let bob = k.app.user("bob").await;

    let porridge = k
        .app
        .recipe(&alice.auth_token, "Porridge", &[k.breakfast], &[(k.milk, 1)])
        .await;
    let soup = k
        .app
        .recipe(&alice.auth_token, "Soup", &[k.lunch], &[(k.eggs, 1)])
        .await;
    let omelette = k
        .app
        .recipe(
            &bob.auth_token,
            "Omelette",
            &[k.breakfast, k.lunch],
            &[(k.eggs, 3)],
        )
        .await;

    let (_, body) = k.app.get("/api/recipes/", None).await;
    assert_eq!(ids(&body), vec![omelette, soup, porridge]);

    let (_, body) = k.app.get("/api/recipes/?tags=breakfast", None).await;
    assert_eq!(ids(&body), vec![omelette, porridge]);

    let (_, body) = k
        .app
        .get("/api/recipes/?tags=breakfast&tags=lunch", None)
        .await;
    assert_eq!(body["count"], 3);

    let (_, body) = k
        .app
        .get(&format!("/api/recipes/?author={}&tags=lunch", alice.id), None)
        .await;
    assert_eq!(ids(&body), vec![soup]);

    let (status, body) = k.app.get("/api/recipes/?author=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["author"].is_array());
}

#[tokio::test]
async fn test_list_flags_and_membership_filters() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let bob = k.app.user("bob").await;
    let token = alice.auth_token.as_str();

    let first = k
        .app
        .recipe(&bob.auth_token, "Bread", &[k.breakfast], &[(k.flour, 1)])
        .await;
    let second = k
        .app
        .recipe(&bob.auth_token, "Pie", &[k.lunch], &[(k.flour, 1)])
        .await;

    let (status, body) = k
        .app
        .post(&format!("/api/recipes/{first}/favorite/"), token, None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Bread");
    assert!(body.get("author").is_none());

    let (_, body) = k.app.get("/api/recipes/?is_favorited=1", Some(token)).await;
    assert_eq!(ids(&body), vec![first]);
    assert_eq!(body["results"][0]["is_favorited"], true);

    let (_, body) = k.app.get("/api/recipes/?is_favorited=0", Some(token)).await;
    assert_eq!(ids(&body), vec![second]);

    let (_, body) = k.app.get("/api/recipes/?is_favorited=1", None).await;
    assert_eq!(body["count"], 2);
    assert!(
        body["results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["is_favorited"] == false)
    );

    let (_, body) = k
        .app
        .get("/api/recipes/?is_in_shopping_cart=1", Some(token))
        .await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_favorite_and_cart_filters_combine() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let token = alice.auth_token.as_str();

    let favorite_only = k
        .app
        .recipe(token, "Bread", &[k.breakfast], &[(k.flour, 1)])
        .await;
    let both = k
        .app
        .recipe(token, "Pie", &[k.lunch], &[(k.flour, 1)])
        .await;
    let neither = k
        .app
        .recipe(token, "Soup", &[k.lunch], &[(k.milk, 1)])
        .await;

    for uri in [
        format!("/api/recipes/{favorite_only}/favorite/"),
        format!("/api/recipes/{both}/favorite/"),
        format!("/api/recipes/{both}/shopping_cart/"),
    ] {
        let (status, _) = k.app.post(&uri, token, None).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = k
        .app
        .get("/api/recipes/?is_favorited=1&is_in_shopping_cart=1", Some(token))
        .await;
    assert_eq!(ids(&body), vec![both]);
    assert_eq!(body["results"][0]["is_favorited"], true);
    assert_eq!(body["results"][0]["is_in_shopping_cart"], true);

    let (_, body) = k
        .app
        .get("/api/recipes/?is_favorited=1&is_in_shopping_cart=0", Some(token))
        .await;
    assert_eq!(ids(&body), vec![favorite_only]);

    let (_, body) = k
        .app
        .get("/api/recipes/?is_favorited=0&is_in_shopping_cart=0", Some(token))
        .await;
    assert_eq!(ids(&body), vec![neither]);
}

#[tokio::test]
async fn test_favorite_and_cart_toggles() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let token = alice.auth_token.as_str();
    let id = k
        .app
        .recipe(token, "Bread", &[k.breakfast], &[(k.flour, 500)])
        .await;

    for (list, label) in [("favorite", "Favorite"), ("shopping_cart", "ShoppingCart")] {
        let uri = format!("/api/recipes/{id}/{list}/");

        let (status, _) = k.app.post(&uri, token, None).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = k.app.post(&uri, token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"],
            format!("This recipe was already on your {label} list.")
        );

        let (status, _) = k.app.delete(&uri, token).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = k.app.delete(&uri, token).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"],
            format!("This recipe was not on your {label} list.")
        );

        let (status, _) = k
            .app
            .post(&format!("/api/recipes/9999/{list}/"), token, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = k
            .app
            .json(Method::POST, &uri, None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_recipe_list_pagination() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    for i in 0..8 {
        k.app
            .recipe(&alice.auth_token, &format!("Dish {i}"), &[k.lunch], &[(k.eggs, 1)])
            .await;
    }

    let (_, body) = k.app.get("/api/recipes/?tags=lunch", None).await;
    assert_eq!(body["count"], 8);
    assert_eq!(body["results"].as_array().unwrap().len(), 6);
    assert_eq!(body["next"], "/api/recipes/?tags=lunch&page=2");

    let (_, body) = k.app.get("/api/recipes/?tags=lunch&page=2", None).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["previous"], "/api/recipes/?tags=lunch");

    for page in ["3", "18446744073709551615", "9223372036854775807"] {
        let (status, body) = k
            .app
            .get(&format!("/api/recipes/?page={page}"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "page {page}");
        assert_eq!(body["detail"], "Invalid page.");
    }
}

#[tokio::test]
async fn test_shopping_list_aggregates_cart() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let token = alice.auth_token.as_str();

    let bread = k
        .app
        .recipe(token, "Bread", &[k.breakfast], &[(k.flour, 100), (k.eggs, 2)])
        .await;
    let cake = k
        .app
        .recipe(token, "Cake", &[k.lunch], &[(k.flour, 150), (k.milk, 200)])
        .await;
    k.app
        .recipe(token, "Soup", &[k.lunch], &[(k.milk, 999)])
        .await;

    for id in [bread, cake] {
        let (status, _) = k
            .app
            .post(&format!("/api/recipes/{id}/shopping_cart/"), token, None)
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, bytes) = k
        .app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart/?format=txt",
            Some(token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Shopping list",
            "• eggs - 2 pcs",
            "• flour - 250 g",
            "• milk - 200 ml",
        ]
    );

    let (status, bytes) = k
        .app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart/",
            Some(token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));

    let (status, _) = k
        .app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart/?format=docx",
            Some(token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = k
        .app
        .send(Method::GET, "/api/recipes/download_shopping_cart/", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shopping_list_breakdown() {
    let k = kitchen_with(|config| config.shopping_list.show_recipe_breakdown = true).await;
    let alice = k.app.user("alice").await;
    let token = alice.auth_token.as_str();

    for (name, amount) in [("Bread", 100), ("Cake", 150)] {
        let id = k
            .app
            .recipe(token, name, &[k.breakfast], &[(k.flour, amount)])
            .await;
        k.app
            .post(&format!("/api/recipes/{id}/shopping_cart/"), token, None)
            .await;
    }

    let (_, bytes) = k
        .app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart/?format=txt",
            Some(token),
            None,
        )
        .await;
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("• flour - 250 g\n    Bread (100), Cake (150)"), "{text}");
}

#[tokio::test]
async fn test_shopping_list_falls_back_to_text_for_non_latin_names() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let token = alice.auth_token.as_str();
    let flour = k.app.ingredient("Мука", "г").await;

    let id = k
        .app
        .recipe(token, "Блины", &[k.breakfast], &[(flour, 250)])
        .await;
    let (status, _) = k
        .app
        .post(&format!("/api/recipes/{id}/shopping_cart/"), token, None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, bytes) = k
        .app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart/",
            Some(token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!bytes.starts_with(b"%PDF"));
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("• Мука - 250 г"), "{text}");
}

#[tokio::test]
async fn test_deleting_recipe_clears_lists() {
    let k = kitchen().await;
    let alice = k.app.user("alice").await;
    let bob = k.app.user("bob").await;
    let id = k
        .app
        .recipe(&alice.auth_token, "Bread", &[k.breakfast], &[(k.flour, 100)])
        .await;

    k.app
        .post(&format!("/api/recipes/{id}/shopping_cart/"), &bob.auth_token, None)
        .await;

    let (status, _) = k
        .app
        .delete(&format!("/api/recipes/{id}/"), &alice.auth_token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, bytes) = k
        .app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart/?format=txt",
            Some(bob.auth_token.as_str()),
            None,
        )
        .await;
    assert_eq!(String::from_utf8(bytes).unwrap(), "Shopping list");
}
