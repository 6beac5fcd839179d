mod dto;
pub mod handlers;
mod model;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use model::Meal;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
