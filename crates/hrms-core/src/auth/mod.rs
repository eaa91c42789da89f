//! Authentication module for managing user sessions and token refresh.
//!
//! This module provides:
//! - `SessionStore`: The persisted session (tokens plus user)
//! - `RefreshCoordinator`: At most one refresh-token exchange at a time
//!
//! Sessions are persisted to disk and survive restarts as long as either
//! token is still present.

pub mod refresh;
pub mod session;

pub use refresh::{LeadTicket, RefreshCoordinator, RefreshOutcome, RefreshWaiter, Ticket};
pub use session::{SessionData, SessionEvent, SessionStore};
