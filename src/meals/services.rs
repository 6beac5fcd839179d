use std::collections::HashSet;

use axum::http::StatusCode;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::{AddIngredientRequest, IngredientSource},
    Meal,
};
use crate::error::{store_error, ApiError};
use crate::foods::Food;
use crate::nutrition::{Ingredient, IngredientKind, IngredientSnapshot};
use crate::store::{Repository, StoreError, Stored};

#[derive(Debug, thiserror::Error)]
pub enum MealError {
    #[error("a meal cannot be an ingredient of itself")]
    SelfReference,
    #[error("meal {0} already contains this meal")]
    Cycle(Uuid),
    #[error("{kind:?} {id} not found")]
    UnknownIngredient { kind: IngredientKind, id: Uuid },
    #[error("no ingredient at position {0}")]
    NoSuchIngredient(usize),
    #[error("name is required")]
    MissingName,
    #[error("meal totals are out of range")]
    NonFinite,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn meal_error(e: MealError) -> ApiError {
    match e {
        MealError::SelfReference
        | MealError::Cycle(_)
        | MealError::UnknownIngredient { .. }
        | MealError::NonFinite => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        MealError::NoSuchIngredient(_) => (StatusCode::NOT_FOUND, e.to_string()),
        MealError::MissingName => (StatusCode::BAD_REQUEST, e.to_string()),
        MealError::Store(inner) => store_error(inner),
    }
}

/// Fails if `candidate` is `target`, or if `target` is reachable from
/// `candidate` through meal ingredients. Walks the live documents, not the
/// snapshots, since snapshots do not carry nested ingredients.
pub async fn ensure_acyclic(
    repo: &Repository,
    target: Uuid,
    candidate: Uuid,
) -> Result<(), MealError> {
    if candidate == target {
        return Err(MealError::SelfReference);
    }

    let mut seen = HashSet::new();
    let mut pending = vec![candidate];
    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        // Deleted meals simply end the walk.
        let Some(meal) = repo.find::<Meal>(id).await? else {
            continue;
        };
        for next in meal.record.meal_references() {
            if next == target {
                debug!(%target, %candidate, via = %id, "ingredient cycle");
                return Err(MealError::Cycle(candidate));
            }
            pending.push(next);
        }
    }
    Ok(())
}

/// Checks every meal ingredient of `meal` against `meal_id`.
pub async fn ensure_ingredients_acyclic(
    repo: &Repository,
    meal_id: Uuid,
    meal: &Meal,
) -> Result<(), MealError> {
    for candidate in meal.meal_references() {
        ensure_acyclic(repo, meal_id, candidate).await?;
    }
    Ok(())
}

pub fn ensure_finite(meal: &Meal) -> Result<(), MealError> {
    if meal.is_finite() {
        Ok(())
    } else {
        debug!(name = %meal.name, "meal totals overflowed");
        Err(MealError::NonFinite)
    }
}

/// Every ingredient of a client-supplied meal must point at a food or meal
/// the caller owns.
pub async fn ensure_ingredients_owned(
    repo: &Repository,
    user_id: Uuid,
    meal: &Meal,
) -> Result<(), MealError> {
    for ingredient in meal.ingredients() {
        let id = ingredient.original_id;
        match ingredient.kind {
            IngredientKind::Food => {
                owned_or_unknown::<Food>(repo, id, user_id, IngredientKind::Food).await?;
            }
            IngredientKind::Meal => {
                owned_or_unknown::<Meal>(repo, id, user_id, IngredientKind::Meal).await?;
            }
        }
    }
    Ok(())
}

/// Turns an add-ingredient request into a snapshot ingredient. A `New`
/// source creates the food in the catalog first; that write stands even if
/// the meal update that follows fails.
pub async fn resolve_ingredient(
    repo: &Repository,
    user_id: Uuid,
    meal_id: Uuid,
    req: AddIngredientRequest,
) -> Result<Ingredient, MealError> {
    let (original_id, kind, value) = match req.source {
        IngredientSource::Existing {
            kind: IngredientKind::Food,
            original_id,
        } => {
            let food = owned_or_unknown::<Food>(repo, original_id, user_id, IngredientKind::Food)
                .await?;
            let snapshot = IngredientSnapshot {
                name: food.record.name,
                values_per_100g: food.record.values_per_100g,
            };
            (original_id, IngredientKind::Food, snapshot)
        }
        IngredientSource::Existing {
            kind: IngredientKind::Meal,
            original_id,
        } => {
            let meal = owned_or_unknown::<Meal>(repo, original_id, user_id, IngredientKind::Meal)
                .await?;
            ensure_acyclic(repo, meal_id, original_id).await?;
            (original_id, IngredientKind::Meal, meal.record.snapshot())
        }
        IngredientSource::New {
            name,
            values_per_100g,
        } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(MealError::MissingName);
            }
            let food = repo
                .create(Food {
                    creator: user_id,
                    name: name.to_string(),
                    values_per_100g,
                })
                .await?;
            info!(%user_id, food_id = %food.id, "food created from ingredient");
            let snapshot = IngredientSnapshot {
                name: food.record.name,
                values_per_100g: food.record.values_per_100g,
            };
            (food.id, IngredientKind::Food, snapshot)
        }
    };

    Ok(Ingredient {
        original_id,
        kind,
        weight: req.weight,
        value,
    })
}

async fn owned_or_unknown<T: crate::store::Record>(
    repo: &Repository,
    id: Uuid,
    user_id: Uuid,
    kind: IngredientKind,
) -> Result<Stored<T>, MealError> {
    repo.find_owned::<T>(id, user_id).await.map_err(|e| match e {
        StoreError::NotFound => MealError::UnknownIngredient { kind, id },
        other => MealError::Store(other),
    })
}
