// --- File: crates/services/templi_backend/src/lib.rs ---

pub mod app;
pub mod app_state;
pub mod cors;

pub use app::build_app;
pub use app_state::AppState;
