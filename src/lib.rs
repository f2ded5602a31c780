pub mod actions;
pub mod app;
pub mod completions;
pub mod errors;
pub mod habits;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod streaks;
pub mod transfer;

pub use app::router;
pub use state::AppState;
pub use storage::{resolve_data_dir, Storage};
