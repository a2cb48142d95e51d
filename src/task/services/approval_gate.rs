//! Bounded-time, single-decision approval gate.

use crate::task::domain::{ActorId, ApprovalChoice, ApprovalDecision, GateState};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// Errors returned when a decision cannot be recorded. Neither changes the
/// gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApprovalError {
    /// Someone other than the requester tried to decide.
    #[error("only the requester can decide this task; {0} is not allowed")]
    Unauthorized(ActorId),

    /// The gate had already resolved.
    #[error("decision arrived after the gate resolved as {0}")]
    Stale(ApprovalDecision),
}

/// Collects exactly one decision from the requester, or expires.
///
/// The decision lives in a set-once cell behind a mutex: whichever of a
/// valid [`ApprovalGate::submit`] or the timeout in
/// [`ApprovalGate::wait_for_decision`] writes first wins, and every later
/// writer observes the stored decision instead of overwriting it.
#[derive(Debug)]
pub struct ApprovalGate {
    requester: ActorId,
    timeout: Duration,
    review_url: Option<String>,
    decision: Mutex<Option<ApprovalDecision>>,
    resolved: Notify,
}

impl ApprovalGate {
    /// Creates a waiting gate bound to `requester`.
    #[must_use]
    pub fn new(requester: ActorId, timeout: Duration) -> Self {
        Self {
            requester,
            timeout,
            review_url: None,
            decision: Mutex::new(None),
            resolved: Notify::new(),
        }
    }

    /// Attaches the link the requester opens to review the branch.
    #[must_use]
    pub fn with_review_url(mut self, review_url: impl Into<String>) -> Self {
        self.review_url = Some(review_url.into());
        self
    }

    /// Returns the review link, if one was attached.
    #[must_use]
    pub fn review_url(&self) -> Option<&str> {
        self.review_url.as_deref()
    }

    /// Returns the only actor allowed to decide.
    #[must_use]
    pub const fn requester(&self) -> &ActorId {
        &self.requester
    }

    /// Returns the approval window.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a snapshot of the gate state.
    #[must_use]
    pub fn state(&self) -> GateState {
        (*self.cell()).map_or(GateState::Waiting, GateState::Resolved)
    }

    /// Records `choice` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Unauthorized`] when `actor` is not the
    /// requester (the gate keeps waiting), or [`ApprovalError::Stale`] when
    /// the gate already resolved.
    pub fn submit(
        &self,
        actor: &ActorId,
        choice: ApprovalChoice,
    ) -> Result<ApprovalDecision, ApprovalError> {
        if actor != &self.requester {
            return Err(ApprovalError::Unauthorized(actor.clone()));
        }
        self.resolve(ApprovalDecision::from(choice))
            .map_err(ApprovalError::Stale)
    }

    /// Suspends until the gate resolves and returns the decision.
    ///
    /// When the window elapses first the gate resolves itself as
    /// [`ApprovalDecision::Expired`]. Calling this again after resolution
    /// returns the stored decision immediately.
    pub async fn wait_for_decision(&self) -> ApprovalDecision {
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            let notified = self.resolved.notified();
            tokio::pin!(notified);
            // Register before checking so a decision landing in between is
            // not missed.
            notified.as_mut().enable();

            let current = *self.cell();
            if let Some(decision) = current {
                return decision;
            }

            tokio::select! {
                () = &mut deadline => {
                    return self
                        .resolve(ApprovalDecision::Expired)
                        .unwrap_or_else(|existing| existing);
                }
                () = &mut notified => {}
            }
        }
    }

    /// Stores `decision` if the gate is still waiting.
    ///
    /// Returns the stored decision on success, or the earlier decision as
    /// the error when another writer won.
    fn resolve(&self, decision: ApprovalDecision) -> Result<ApprovalDecision, ApprovalDecision> {
        {
            let mut cell = self.cell();
            if let Some(existing) = *cell {
                return Err(existing);
            }
            *cell = Some(decision);
        }
        self.resolved.notify_waiters();
        Ok(decision)
    }

    fn cell(&self) -> MutexGuard<'_, Option<ApprovalDecision>> {
        self.decision.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
