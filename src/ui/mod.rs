pub mod actions;
pub mod app;
pub mod components;
pub mod input;
pub mod keys;
pub mod state;

pub use actions::{ActionContext, ActionOptions, Command};
pub use app::run_tui;
pub use state::{AppState, SharedState};
