//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each component,
//! `AppPaths` for the cross-platform config directory, and TOML persistence
//! via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ApiConfig, AppConfig, AudioConfig, SearchConfig, UploadConfig, API_URL_ENV};
