//! GreenLife Tracker - tree-planting records over a JSON API
//!
//! Owners record plantings; anyone can browse them. Read-heavy endpoints are
//! cached, with the parameterized list invalidated through a version counter.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ApiError, Result};
pub use tasks::spawn_cleanup_task;
