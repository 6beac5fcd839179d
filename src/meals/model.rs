use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nutrition::{aggregate, Ingredient, IngredientKind, IngredientSnapshot, NutritionalValues};
use crate::store::{Collection, Record};

/// A composite of weighted ingredients.
///
/// `values` and `values_per_100g` are derived from `ingredients`. They are
/// private and recomputed by every mutation, so a `Meal` never carries totals
/// that disagree with its ingredient list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub creator: Uuid,
    pub name: String,
    ingredients: Vec<Ingredient>,
    values: NutritionalValues,
    values_per_100g: NutritionalValues,
}

impl Meal {
    pub fn new(creator: Uuid, name: impl Into<String>, ingredients: Vec<Ingredient>) -> Self {
        let mut meal = Self {
            creator,
            name: name.into(),
            ingredients,
            values: NutritionalValues::default(),
            values_per_100g: NutritionalValues::default(),
        };
        meal.recompute();
        meal
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn values(&self) -> NutritionalValues {
        self.values
    }

    pub fn values_per_100g(&self) -> NutritionalValues {
        self.values_per_100g
    }

    /// `false` if a total overflowed; such a meal cannot be stored.
    pub fn is_finite(&self) -> bool {
        self.values.is_finite() && self.values_per_100g.is_finite()
    }

    pub fn push_ingredient(&mut self, ingredient: Ingredient) {
        self.ingredients.push(ingredient);
        self.recompute();
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Option<Ingredient> {
        if index >= self.ingredients.len() {
            return None;
        }
        let removed = self.ingredients.remove(index);
        self.recompute();
        Some(removed)
    }

    /// Returns `false` when there is no ingredient at `index`.
    pub fn set_ingredient_weight(&mut self, index: usize, weight: f64) -> bool {
        let Some(ingredient) = self.ingredients.get_mut(index) else {
            return false;
        };
        ingredient.weight = weight;
        self.recompute();
        true
    }

    /// Ids of the meals this meal uses as ingredients.
    pub fn meal_references(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.ingredients
            .iter()
            .filter(|i| i.kind == IngredientKind::Meal)
            .map(|i| i.original_id)
    }

    /// What another meal stores when it adds this one as an ingredient.
    pub fn snapshot(&self) -> IngredientSnapshot {
        IngredientSnapshot {
            name: self.name.clone(),
            values_per_100g: self.values_per_100g,
        }
    }

    fn recompute(&mut self) {
        let totals = aggregate(&self.ingredients);
        self.values = totals.values;
        self.values_per_100g = totals.values_per_100g;
    }
}

impl Record for Meal {
    const COLLECTION: Collection = Collection::Meals;

    fn creator(&self) -> Uuid {
        self.creator
    }

    fn name(&self) -> &str {
        &self.name
    }
}
