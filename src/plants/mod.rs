mod dto;
pub mod handlers;
pub mod image;
pub mod parse;
mod repo;
pub mod repo_types;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::plant_routes()
}
