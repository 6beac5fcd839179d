use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Nutritional values: energy in kcal, protein in grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionalValues {
    pub energy: f64,
    pub protein: f64,
}

impl NutritionalValues {
    pub const fn new(energy: f64, protein: f64) -> Self {
        Self { energy, protein }
    }

    /// Multiplies every field by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            energy: self.energy * factor,
            protein: self.protein * factor,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.energy.is_finite() && self.protein.is_finite()
    }

    /// Divides every field by `divisor`.
    pub fn divided_by(self, divisor: f64) -> Self {
        Self {
            energy: self.energy / divisor,
            protein: self.protein / divisor,
        }
    }
}

impl Add for NutritionalValues {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            energy: self.energy + rhs.energy,
            protein: self.protein + rhs.protein,
        }
    }
}

impl AddAssign for NutritionalValues {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// What an ingredient points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientKind {
    Food,
    Meal,
}

/// Copy of the referenced food or meal taken when the ingredient was added.
/// Later edits of the original are not reflected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientSnapshot {
    pub name: String,
    pub values_per_100g: NutritionalValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub original_id: Uuid,
    #[serde(rename = "type")]
    pub kind: IngredientKind,
    /// Grams. Negative weights are not rejected.
    pub weight: f64,
    pub value: IngredientSnapshot,
}

impl Ingredient {
    /// What this ingredient adds to the meal total.
    pub fn contribution(&self) -> NutritionalValues {
        self.value.values_per_100g.scaled(self.weight / 100.0)
    }
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub total_weight: f64,
    pub values: NutritionalValues,
    pub values_per_100g: NutritionalValues,
}

impl Aggregate {
    /// `false` once a sum or quotient overflowed to infinity or `NaN`. Such
    /// totals serialize as `null` and must not reach the store.
    pub fn is_finite(&self) -> bool {
        self.total_weight.is_finite() && self.values.is_finite() && self.values_per_100g.is_finite()
    }
}

/// Sums the weighted per-100g values of `ingredients` and derives the
/// per-100g values of the whole.
///
/// Summation runs in slice order. A total weight of exactly zero (no
/// ingredients, or weights cancelling out) yields zero per-100g values
/// instead of `NaN`, which the JSON document format cannot carry.
pub fn aggregate(ingredients: &[Ingredient]) -> Aggregate {
    let mut total_weight = 0.0;
    let mut values = NutritionalValues::default();

    for ingredient in ingredients {
        total_weight += ingredient.weight;
        values += ingredient.contribution();
    }

    let values_per_100g = if total_weight == 0.0 {
        NutritionalValues::default()
    } else {
        values.divided_by(total_weight / 100.0)
    };

    Aggregate {
        total_weight,
        values,
        values_per_100g,
    }
}
