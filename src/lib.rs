pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod present;
pub mod shell;
pub mod source;
pub mod state;
pub mod stats;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use source::{build_source, load_dataset};
pub use state::AppState;
