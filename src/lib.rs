pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod routes;
pub mod store;

use config::AppConfig;
use registry::Registry;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub registry: Registry,
    pub config: AppConfig,
}
