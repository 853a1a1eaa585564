pub mod achievements;
pub mod ai;
pub mod app;
pub mod coaching;
pub mod config;
pub mod dates;
pub mod errors;
pub mod handlers;
pub mod habits;
pub mod journal;
pub mod ledger;
pub mod milestone;
pub mod models;
pub mod schedule;
pub mod seed;
pub mod state;
pub mod stats;
pub mod storage;
pub mod streak;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_data, persist_all};
