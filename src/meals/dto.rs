use serde::Deserialize;
use uuid::Uuid;

use super::Meal;
use crate::error::{bad_request, ApiError};
use crate::nutrition::{Ingredient, IngredientKind, NutritionalValues};

/// Body of create and full replace. Derived values are never accepted from
/// the client; they are recomputed from `ingredients`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealInput {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl MealInput {
    pub fn into_meal(self, creator: Uuid) -> Result<Meal, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(bad_request("name is required"));
        }
        Ok(Meal::new(creator, name, self.ingredients))
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub ingredients: Vec<Ingredient>,
}

/// Where a new ingredient comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum IngredientSource {
    /// A food or meal already in the caller's catalog.
    Existing {
        #[serde(rename = "type")]
        kind: IngredientKind,
        #[serde(rename = "originalId")]
        original_id: Uuid,
    },
    /// A food that is created in the catalog first.
    New {
        name: String,
        #[serde(rename = "valuesPer100g")]
        values_per_100g: NutritionalValues,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddIngredientRequest {
    #[serde(flatten)]
    pub source: IngredientSource,
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeightRequest {
    pub weight: f64,
}
