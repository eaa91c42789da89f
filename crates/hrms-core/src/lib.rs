//! Core library for the HRMS client.
//!
//! - [`api`]: REST client with transparent access-token refresh
//! - [`auth`]: Persisted session store and the refresh coordinator
//! - [`models`]: Request and response types for the HR resources
//! - [`config`]: Backend URL and local file locations

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, RefreshError};
pub use auth::{SessionData, SessionEvent, SessionStore};
pub use config::Config;
