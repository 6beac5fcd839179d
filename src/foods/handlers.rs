use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Food, FoodInput};
use crate::{
    auth::AuthUser,
    error::{store_error, ApiResult},
    live,
    pagination::{Page, Pagination},
    state::AppState,
    store::Stored,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/foods/subscribe", get(live::subscribe::<Food>))
        .route("/foods/:id", get(get_food))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", post(create_food))
        .route("/foods/:id", put(replace_food).delete(delete_food))
}

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Page<Stored<Food>>>> {
    let foods = state.repo.list::<Food>(user_id).await.map_err(store_error)?;
    Ok(Json(Page::from_all(foods, p)))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Stored<Food>>> {
    let food = state
        .repo
        .find_owned::<Food>(id, user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(food))
}

#[instrument(skip(state, body))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<FoodInput>,
) -> ApiResult<(StatusCode, Json<Stored<Food>>)> {
    let food = body.into_food(user_id)?;
    let created = state.repo.create(food).await.map_err(store_error)?;
    info!(%user_id, food_id = %created.id, "food created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Full replace; ingredients already referencing this food keep their snapshot.
#[instrument(skip(state, body))]
pub async fn replace_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<FoodInput>,
) -> ApiResult<Json<Stored<Food>>> {
    let food = body.into_food(user_id)?;
    state
        .repo
        .find_owned::<Food>(id, user_id)
        .await
        .map_err(store_error)?;
    let replaced = state.repo.replace(id, food).await.map_err(store_error)?;
    info!(%user_id, food_id = %id, "food replaced");
    Ok(Json(replaced))
}

#[instrument(skip(state))]
pub async fn delete_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .repo
        .delete_owned::<Food>(id, user_id)
        .await
        .map_err(store_error)?;
    info!(%user_id, food_id = %id, "food deleted");
    Ok(StatusCode::NO_CONTENT)
}
