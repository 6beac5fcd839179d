use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nutrition::NutritionalValues;
use crate::state::AppState;
use crate::store::{Collection, Record};

mod dto;
pub mod handlers;

pub use dto::FoodInput;

/// Leaf entry of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub creator: Uuid,
    pub name: String,
    pub values_per_100g: NutritionalValues,
}

impl Record for Food {
    const COLLECTION: Collection = Collection::Foods;

    fn creator(&self) -> Uuid {
        self.creator
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
