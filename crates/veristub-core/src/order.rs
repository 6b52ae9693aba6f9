//! In-order consumption tracking.
//!
//! One [`InOrderContext`] spans however many stand-ins participate in an
//! ordered verification chain. It remembers which invocations earlier
//! in-order verifications already claimed, keyed by the global sequence
//! number, so a later verification never re-considers them.
//!
//! Because participating stand-ins keep separate logs, membership alone is
//! not enough: a claim made while verifying one log must also rule out every
//! older invocation sitting in the other logs. The context therefore tracks
//! the highest-sequence claim as a horizon; anything at or below it is out
//! of scope for the chain, whichever log it was recorded in.

use std::collections::HashSet;

use crate::invocation::{Invocation, Location};

/// Consumed-set tracker for ordered verification.
#[derive(Debug, Default)]
pub struct InOrderContext {
    consumed: HashSet<u64>,
    latest: Option<(u64, Location)>,
}

impl InOrderContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an earlier ordered verification already claimed this
    /// invocation.
    pub fn is_verified(&self, invocation: &Invocation) -> bool {
        self.consumed.contains(&invocation.seq())
    }

    /// Whether this invocation is claimed, or happened before the chain's
    /// latest claim. Ordered verification never looks at such invocations
    /// again, whichever stand-in's log they sit in.
    pub fn is_consumed_or_earlier(&self, invocation: &Invocation) -> bool {
        self.latest.is_some_and(|(seq, _)| invocation.seq() <= seq)
    }

    /// Claim an invocation for this ordering chain. Idempotent.
    pub fn mark_verified(&mut self, invocation: &Invocation) {
        self.consumed.insert(invocation.seq());
        if self.latest.is_none_or(|(seq, _)| invocation.seq() > seq) {
            self.latest = Some((invocation.seq(), invocation.location()));
        }
    }

    /// Capture site of the highest-sequence claim, for diagnostics.
    pub fn last_claimed_location(&self) -> Option<Location> {
        self.latest.map(|(_, location)| location)
    }

    /// Number of claimed invocations.
    pub fn claimed(&self) -> usize {
        self.consumed.len()
    }
}
