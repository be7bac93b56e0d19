//! Lending Server
//!
//! REST JSON API for a small school library: accounts with student and
//! teacher roles, a book catalog, and loans with per-book exclusivity and
//! a per-user limit on open loans.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire services over the given storage
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, &config.auth);

        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
