//! Single-flight coordination of refresh-token exchanges.
//!
//! The first request that needs a new access token gets a [`LeadTicket`] and
//! performs the exchange. Everyone arriving while it is in flight gets a
//! [`RefreshWaiter`] and is resolved with the same outcome when the lead
//! settles. No second exchange can start until the first one has settled.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::api::RefreshError;

/// Result of one exchange: the new access token or why there is none.
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    // Only non-empty while `in_flight` is set
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// What a caller holds after asking for a fresh token.
pub enum Ticket<'a> {
    /// No exchange was running; this caller must perform it and settle.
    Lead(LeadTicket<'a>),
    /// An exchange is already running; wait for its outcome.
    Wait(RefreshWaiter),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn acquire(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(queued = state.waiters.len(), "Refresh in flight, queueing request");
            Ticket::Wait(RefreshWaiter { rx })
        } else {
            state.in_flight = true;
            Ticket::Lead(LeadTicket {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of requests currently waiting on the in-flight exchange.
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    fn settle(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose caller went away has nobody left to tell
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Exclusive right to run the current exchange.
///
/// Dropping it unsettled rejects every waiter with [`RefreshError::Abandoned`].
pub struct LeadTicket<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeadTicket<'_> {
    /// Publish the outcome to every queued waiter and reopen the coordinator.
    /// Returns how many waiters were resolved.
    pub fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.settle(outcome)
    }
}

impl Drop for LeadTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let count = self.coordinator.settle(&Err(RefreshError::Abandoned));
            warn!(rejected = count, "Token refresh dropped before completion");
        }
    }
}

/// A queued request's handle on the in-flight exchange. Resolves exactly once.
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_lead(ticket: Ticket<'_>) -> LeadTicket<'_> {
        match ticket {
            Ticket::Lead(lead) => lead,
            Ticket::Wait(_) => panic!("expected to lead the refresh"),
        }
    }

    fn expect_wait(ticket: Ticket<'_>) -> RefreshWaiter {
        match ticket {
            Ticket::Wait(waiter) => waiter,
            Ticket::Lead(_) => panic!("expected to wait on the refresh"),
        }
    }

    #[tokio::test]
    async fn test_first_caller_leads_others_wait() {
        let coordinator = RefreshCoordinator::new();
        let lead = expect_lead(coordinator.acquire());
        assert!(coordinator.is_refreshing());

        let first = expect_wait(coordinator.acquire());
        let second = expect_wait(coordinator.acquire());
        assert_eq!(coordinator.queued(), 2);

        assert_eq!(lead.settle(&Ok("B".to_string())), 2);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.queued(), 0);

        assert_eq!(first.wait().await, Ok("B".to_string()));
        assert_eq!(second.wait().await, Ok("B".to_string()));
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let lead = expect_lead(coordinator.acquire());
        let waiters: Vec<_> = (0..3).map(|_| expect_wait(coordinator.acquire())).collect();

        let outcome = Err(RefreshError::Rejected("Invalid refresh token".to_string()));
        assert_eq!(lead.settle(&outcome), 3);

        for waiter in waiters {
            assert_eq!(waiter.wait().await, outcome);
        }
    }

    #[tokio::test]
    async fn test_dropped_lead_rejects_waiters() {
        let coordinator = RefreshCoordinator::new();
        let lead = expect_lead(coordinator.acquire());
        let waiter = expect_wait(coordinator.acquire());

        drop(lead);

        assert_eq!(waiter.wait().await, Err(RefreshError::Abandoned));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_next_exchange_after_settle_leads_again() {
        let coordinator = RefreshCoordinator::new();
        let lead = expect_lead(coordinator.acquire());
        assert_eq!(lead.settle(&Err(RefreshError::NoRefreshToken)), 0);

        let again = expect_lead(coordinator.acquire());
        assert!(coordinator.is_refreshing());
        again.settle(&Ok("C".to_string()));
    }
}
