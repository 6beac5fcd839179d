use serde::Deserialize;
use uuid::Uuid;

use super::Food;
use crate::error::{bad_request, ApiError};
use crate::nutrition::NutritionalValues;

/// Body of create and full replace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodInput {
    pub name: String,
    pub values_per_100g: NutritionalValues,
}

impl FoodInput {
    pub fn into_food(self, creator: Uuid) -> Result<Food, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(bad_request("name is required"));
        }
        Ok(Food {
            creator,
            name: name.to_string(),
            values_per_100g: self.values_per_100g,
        })
    }
}
