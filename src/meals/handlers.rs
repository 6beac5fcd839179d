use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AddIngredientRequest, MealInput, PreviewRequest, WeightRequest},
    services::{
        ensure_finite, ensure_ingredients_acyclic, ensure_ingredients_owned, meal_error,
        resolve_ingredient, MealError,
    },
    Meal,
};
use crate::{
    auth::AuthUser,
    error::{store_error, ApiResult},
    live,
    nutrition::{aggregate, Aggregate},
    pagination::{Page, Pagination},
    state::AppState,
    store::Stored,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/subscribe", get(live::subscribe::<Meal>))
        .route("/meals/preview", post(preview_meal))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/meals/:id", put(replace_meal).delete(delete_meal))
        .route("/meals/:id/ingredients", post(add_ingredient))
        .route(
            "/meals/:id/ingredients/:index",
            put(set_ingredient_weight).delete(remove_ingredient),
        )
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Page<Stored<Meal>>>> {
    let meals = state.repo.list::<Meal>(user_id).await.map_err(store_error)?;
    Ok(Json(Page::from_all(meals, p)))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Stored<Meal>>> {
    let meal = state
        .repo
        .find_owned::<Meal>(id, user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(meal))
}

/// Totals for a draft ingredient list, without storing anything.
#[instrument(skip(body))]
pub async fn preview_meal(
    AuthUser(user_id): AuthUser,
    Json(body): Json<PreviewRequest>,
) -> ApiResult<Json<Aggregate>> {
    let totals = aggregate(&body.ingredients);
    if !totals.is_finite() {
        return Err(meal_error(MealError::NonFinite));
    }
    Ok(Json(totals))
}

#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<MealInput>,
) -> ApiResult<(StatusCode, Json<Stored<Meal>>)> {
    let meal = body.into_meal(user_id)?;
    ensure_finite(&meal).map_err(meal_error)?;
    ensure_ingredients_owned(&state.repo, user_id, &meal)
        .await
        .map_err(meal_error)?;
    let created = state.repo.create(meal).await.map_err(store_error)?;
    info!(%user_id, meal_id = %created.id, "meal created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, body))]
pub async fn replace_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MealInput>,
) -> ApiResult<Json<Stored<Meal>>> {
    let meal = body.into_meal(user_id)?;
    ensure_finite(&meal).map_err(meal_error)?;
    let current = state
        .repo
        .find_owned::<Meal>(id, user_id)
        .await
        .map_err(store_error)?;
    ensure_ingredients_owned(&state.repo, user_id, &meal)
        .await
        .map_err(meal_error)?;
    ensure_ingredients_acyclic(&state.repo, id, &meal)
        .await
        .map_err(meal_error)?;
    let replaced = state
        .repo
        .update(id, current.updated_at, meal)
        .await
        .map_err(store_error)?;
    info!(%user_id, meal_id = %id, "meal replaced");
    Ok(Json(replaced))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .repo
        .delete_owned::<Meal>(id, user_id)
        .await
        .map_err(store_error)?;
    info!(%user_id, meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn add_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddIngredientRequest>,
) -> ApiResult<Json<Stored<Meal>>> {
    let Stored {
        record: mut meal,
        updated_at,
        ..
    } = state
        .repo
        .find_owned::<Meal>(id, user_id)
        .await
        .map_err(store_error)?;

    let ingredient = resolve_ingredient(&state.repo, user_id, id, body)
        .await
        .map_err(meal_error)?;
    meal.push_ingredient(ingredient);
    ensure_finite(&meal).map_err(meal_error)?;

    let updated = state
        .repo
        .update(id, updated_at, meal)
        .await
        .map_err(store_error)?;
    info!(
        %user_id,
        meal_id = %id,
        ingredients = updated.record.ingredients().len(),
        "ingredient added"
    );
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn set_ingredient_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(body): Json<WeightRequest>,
) -> ApiResult<Json<Stored<Meal>>> {
    let Stored {
        record: mut meal,
        updated_at,
        ..
    } = state
        .repo
        .find_owned::<Meal>(id, user_id)
        .await
        .map_err(store_error)?;

    if !meal.set_ingredient_weight(index, body.weight) {
        return Err(meal_error(MealError::NoSuchIngredient(index)));
    }
    ensure_finite(&meal).map_err(meal_error)?;

    let updated = state
        .repo
        .update(id, updated_at, meal)
        .await
        .map_err(store_error)?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn remove_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<Stored<Meal>>> {
    let Stored {
        record: mut meal,
        updated_at,
        ..
    } = state
        .repo
        .find_owned::<Meal>(id, user_id)
        .await
        .map_err(store_error)?;

    meal.remove_ingredient(index)
        .ok_or_else(|| meal_error(MealError::NoSuchIngredient(index)))?;
    ensure_finite(&meal).map_err(meal_error)?;

    let updated = state
        .repo
        .update(id, updated_at, meal)
        .await
        .map_err(store_error)?;
    info!(%user_id, meal_id = %id, index, "ingredient removed");
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::{app, call, sign_up};

    async fn create_food(app: &Router, token: &str, name: &str, energy: f64, protein: f64) -> String {
        let (status, food) = call(
            app,
            Method::POST,
            "/api/v1/foods",
            Some(token),
            json!({ "name": name, "valuesPer100g": { "energy": energy, "protein": protein } }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        food["id"].as_str().unwrap().to_string()
    }

    async fn new_meal(app: &Router, token: &str, name: &str) -> String {
        let (status, meal) = call(
            app,
            Method::POST,
            "/api/v1/meals",
            Some(token),
            json!({ "name": name, "ingredients": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        meal["id"].as_str().unwrap().to_string()
    }

    async fn add(app: &Router, token: &str, meal_id: &str, body: Value) -> (StatusCode, Value) {
        call(
            app,
            Method::POST,
            &format!("/api/v1/meals/{meal_id}/ingredients"),
            Some(token),
            body,
        )
        .await
    }

    #[tokio::test]
    async fn adding_ingredients_recomputes_totals() {
        let app = app();
        let token = sign_up(&app, "cook@example.com").await;
        let oats = create_food(&app, &token, "Oats", 200.0, 10.0).await;
        let meal = new_meal(&app, &token, "Breakfast").await;

        let (status, body) = add(
            &app,
            &token,
            &meal,
            json!({ "source": "existing", "type": "food", "originalId": oats, "weight": 50 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["values"]["energy"], 100.0);

        let (status, body) = add(
            &app,
            &token,
            &meal,
            json!({
                "source": "new",
                "name": "Milk",
                "valuesPer100g": { "energy": 100.0, "protein": 5.0 },
                "weight": 200
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["values"], json!({ "energy": 300.0, "protein": 15.0 }));
        assert_eq!(body["valuesPer100g"], json!({ "energy": 120.0, "protein": 6.0 }));
        assert_eq!(body["ingredients"][1]["value"]["name"], "Milk");

        // The new ingredient also landed in the food catalog.
        let (_, foods) = call(&app, Method::GET, "/api/v1/foods", Some(&token), Value::Null).await;
        assert_eq!(foods["total"], 2);
    }

    #[tokio::test]
    async fn weight_edit_and_removal_keep_totals_consistent() {
        let app = app();
        let token = sign_up(&app, "cook@example.com").await;
        let rice = create_food(&app, &token, "Rice", 130.0, 2.5).await;
        let meal = new_meal(&app, &token, "Lunch").await;
        add(
            &app,
            &token,
            &meal,
            json!({ "source": "existing", "type": "food", "originalId": rice, "weight": 100 }),
        )
        .await;

        let uri = format!("/api/v1/meals/{meal}/ingredients/0");
        let (status, body) = call(&app, Method::PUT, &uri, Some(&token), json!({ "weight": 200 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["values"], json!({ "energy": 260.0, "protein": 5.0 }));
        assert_eq!(body["valuesPer100g"], json!({ "energy": 130.0, "protein": 2.5 }));

        let (status, body) = call(&app, Method::DELETE, &uri, Some(&token), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ingredients"], json!([]));
        assert_eq!(body["valuesPer100g"], json!({ "energy": 0.0, "protein": 0.0 }));

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&token), Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn meals_can_nest_but_not_loop() {
        let app = app();
        let token = sign_up(&app, "cook@example.com").await;
        let sauce = new_meal(&app, &token, "Sauce").await;
        let pasta = new_meal(&app, &token, "Pasta").await;

        let (status, _) = add(
            &app,
            &token,
            &sauce,
            json!({ "source": "existing", "type": "meal", "originalId": sauce, "weight": 10 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = add(
            &app,
            &token,
            &pasta,
            json!({ "source": "existing", "type": "meal", "originalId": sauce, "weight": 80 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ingredients"][0]["type"], "meal");

        let (status, _) = add(
            &app,
            &token,
            &sauce,
            json!({ "source": "existing", "type": "meal", "originalId": pasta, "weight": 10 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn full_replace_recomputes_and_rejects_cycles() {
        let app = app();
        let token = sign_up(&app, "cook@example.com").await;
        let beef = create_food(&app, &token, "Beef", 250.0, 26.0).await;
        let meal = new_meal(&app, &token, "Stew").await;
        let uri = format!("/api/v1/meals/{meal}");

        let (status, body) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            json!({
                "name": "Beef stew",
                "values": { "energy": 1.0, "protein": 1.0 },
                "ingredients": [{
                    "originalId": beef,
                    "type": "food",
                    "weight": 100,
                    "value": { "name": "Beef", "valuesPer100g": { "energy": 250.0, "protein": 26.0 } }
                }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Beef stew");
        assert_eq!(body["values"], json!({ "energy": 250.0, "protein": 26.0 }));

        let (status, _) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            json!({
                "name": "Stew",
                "ingredients": [{
                    "originalId": meal,
                    "type": "meal",
                    "weight": 100,
                    "value": { "name": "Stew", "valuesPer100g": { "energy": 250.0, "protein": 26.0 } }
                }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn full_replace_rejects_foreign_and_unknown_ingredients() {
        let app = app();
        let owner = sign_up(&app, "owner@example.com").await;
        let other = sign_up(&app, "other@example.com").await;
        let theirs = new_meal(&app, &other, "Their sauce").await;
        let meal = new_meal(&app, &owner, "Pasta").await;
        let uri = format!("/api/v1/meals/{meal}");

        let with = |id: &str, kind: &str| {
            json!({
                "name": "Pasta",
                "ingredients": [{
                    "originalId": id,
                    "type": kind,
                    "weight": 80,
                    "value": { "name": "Sauce", "valuesPer100g": { "energy": 90.0, "protein": 2.0 } }
                }]
            })
        };

        let (status, _) = call(&app, Method::PUT, &uri, Some(&owner), with(&theirs, "meal")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&owner),
            with("6f1c2f0e-8d5e-4a43-9a57-1d7c8a6a0b11", "food"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, stored) = call(&app, Method::GET, &uri, Some(&owner), Value::Null).await;
        assert_eq!(stored["ingredients"], json!([]));
    }

    #[tokio::test]
    async fn overflowing_totals_are_rejected_and_nothing_is_written() {
        let app = app();
        let token = sign_up(&app, "cook@example.com").await;
        let dense = create_food(&app, &token, "Dense", 1e308, 1.0).await;
        let meal = new_meal(&app, &token, "Feast").await;

        let (status, _) = add(
            &app,
            &token,
            &meal,
            json!({ "source": "existing", "type": "food", "originalId": dense, "weight": 1000 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, listed) = call(&app, Method::GET, "/api/v1/meals", Some(&token), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["total"], 1);
        let (status, stored) = call(
            &app,
            Method::GET,
            &format!("/api/v1/meals/{meal}"),
            Some(&token),
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["ingredients"], json!([]));

        // A smaller portion of the same food stays in range.
        let (status, _) = add(
            &app,
            &token,
            &meal,
            json!({ "source": "existing", "type": "food", "originalId": dense, "weight": 10 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn preview_runs_the_aggregator() {
        let app = app();
        let token = sign_up(&app, "cook@example.com").await;
        let ingredient = |weight: f64, energy: f64, protein: f64| {
            json!({
                "originalId": "6f1c2f0e-8d5e-4a43-9a57-1d7c8a6a0b11",
                "type": "food",
                "weight": weight,
                "value": { "name": "x", "valuesPer100g": { "energy": energy, "protein": protein } }
            })
        };
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/meals/preview",
            Some(&token),
            json!({ "ingredients": [ingredient(50.0, 200.0, 10.0), ingredient(200.0, 100.0, 5.0)] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalWeight"], 250.0);
        assert_eq!(body["values"], json!({ "energy": 300.0, "protein": 15.0 }));
        assert_eq!(body["valuesPer100g"], json!({ "energy": 120.0, "protein": 6.0 }));
    }

    #[tokio::test]
    async fn other_users_meals_are_invisible() {
        let app = app();
        let owner = sign_up(&app, "owner@example.com").await;
        let intruder = sign_up(&app, "intruder@example.com").await;
        let meal = new_meal(&app, &owner, "Private").await;

        let uri = format!("/api/v1/meals/{meal}");
        let (status, _) = call(&app, Method::GET, &uri, Some(&intruder), Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let intruder_meal = new_meal(&app, &intruder, "Mine").await;
        let (status, _) = add(
            &app,
            &intruder,
            &intruder_meal,
            json!({ "source": "existing", "type": "meal", "originalId": meal, "weight": 10 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
