//! REST API client module for the HRMS backend.
//!
//! This module provides the `ApiClient` for the employee, department, leave,
//! holiday and payroll endpoints.
//!
//! The API uses bearer token authentication. Expired access tokens are
//! refreshed transparently through `/auth/refresh`, with one exchange
//! shared by every request that was rejected while it ran.

pub mod client;
pub mod error;
pub mod transport;

#[cfg(test)]
mod fake;

pub use client::ApiClient;
pub use error::{ApiError, RefreshError};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
