pub mod api;
pub mod common;
pub mod completions;
pub mod health;
pub mod model_hub;
pub mod models;
pub mod providers;

pub use api::AppState;
