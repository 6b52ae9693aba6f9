//! Verification modes and their state machines.
//!
//! A [`VerificationMode`] is the user-facing selection; a [`ModeState`] is
//! the single-use machine one verification call drives with it. The machine
//! is fed invocation-by-invocation (`on_match` / `on_mismatch`) and asked
//! for its verdict at end-of-log (`finish`), which makes the same machine
//! serve both the batch driver in [`crate::verify`] and the streaming,
//! deadline-bounded driver in [`crate::within`].
//!
//! `Step::Satisfied` means the condition can no longer be un-met by *waiting*
//! (more input may still violate it). The streaming driver returns success
//! at that point; the batch driver keeps feeding so an excess invocation
//! still fails an exactness mode.

use std::sync::Arc;

use crate::{
    error::{UsageError, VerificationError},
    finder,
    invocation::Invocation,
};

/// Strategy selecting how many matching invocations are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Exactly `n` matching invocations.
    Times(usize),
    /// At least `n` matching invocations.
    AtLeast(usize),
    /// At most `n` matching invocations.
    AtMost(usize),
    /// Between `min` and `max` matching invocations, inclusive.
    ///
    /// [`VerificationMode::at_least_and_at_most`] is the sanctioned
    /// constructor and validates the bounds. A hand-built variant with
    /// `min > max` is not unsound, merely unsatisfiable: `finish` checks
    /// both bounds, so no count passes.
    AtLeastAndAtMost {
        /// Lower bound, inclusive.
        min: usize,
        /// Upper bound, inclusive.
        max: usize,
    },
    /// Exactly one matching invocation and no other interaction at all.
    Only,
}

impl VerificationMode {
    /// Ranged mode with validated bounds: requires `max > 1` and `min < max`.
    pub fn at_least_and_at_most(min: usize, max: usize) -> Result<Self, UsageError> {
        if max > 1 && min < max {
            Ok(Self::AtLeastAndAtMost { min, max })
        } else {
            Err(UsageError::InvalidBounds { min, max })
        }
    }

    /// Build the single-use state machine for one verification call.
    pub(crate) fn state(self, method: String) -> ModeState {
        ModeState { mode: self, method, matched: Vec::new() }
    }
}

/// What the driver should do after feeding one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Keep feeding.
    Continue,
    /// The condition is met; a streaming driver may stop and succeed.
    Satisfied,
}

/// Single-use verification state machine. Created fresh per verification
/// call and discarded after use.
#[derive(Debug)]
pub(crate) struct ModeState {
    mode: VerificationMode,
    method: String,
    matched: Vec<Arc<Invocation>>,
}

impl ModeState {
    /// Feed one invocation that matched the wanted template.
    pub(crate) fn on_match(
        &mut self,
        invocation: &Arc<Invocation>,
    ) -> Result<Step, VerificationError> {
        match self.mode {
            VerificationMode::Times(0) | VerificationMode::AtMost(0) => {
                Err(VerificationError::NeverWantedButInvoked {
                    method: self.method.clone(),
                    location: invocation.location(),
                })
            },
            VerificationMode::Times(n) => {
                self.matched.push(Arc::clone(invocation));
                if self.matched.len() > n {
                    return Err(VerificationError::TooManyInvocations {
                        method: self.method.clone(),
                        wanted_count: n,
                        actual_count: self.matched.len(),
                        first_undesired: Some(invocation.location()),
                    });
                }
                Ok(if self.matched.len() == n { Step::Satisfied } else { Step::Continue })
            },
            VerificationMode::AtLeast(n) => {
                self.matched.push(Arc::clone(invocation));
                Ok(if self.matched.len() >= n { Step::Satisfied } else { Step::Continue })
            },
            VerificationMode::AtMost(_) => {
                // Excess is judged at end-of-log; waiting can still succeed.
                self.matched.push(Arc::clone(invocation));
                Ok(Step::Continue)
            },
            VerificationMode::AtLeastAndAtMost { max, .. } => {
                self.matched.push(Arc::clone(invocation));
                Ok(if self.matched.len() == max { Step::Satisfied } else { Step::Continue })
            },
            VerificationMode::Only => {
                self.matched.push(Arc::clone(invocation));
                if self.matched.len() > 1 {
                    return Err(VerificationError::NoMoreInteractionsWanted {
                        method: invocation.method().name().to_string(),
                        location: invocation.location(),
                        seq: invocation.seq(),
                    });
                }
                Ok(Step::Continue)
            },
        }
    }

    /// Feed one invocation that did not match. Only the `Only` mode cares.
    pub(crate) fn on_mismatch(
        &mut self,
        invocation: &Arc<Invocation>,
    ) -> Result<(), VerificationError> {
        match self.mode {
            VerificationMode::Only => Err(VerificationError::NoMoreInteractionsWanted {
                method: invocation.method().name().to_string(),
                location: invocation.location(),
                seq: invocation.seq(),
            }),
            _ => Ok(()),
        }
    }

    /// End-of-log verdict. On success, yields the counted invocations for
    /// the caller's marking pass.
    pub(crate) fn finish(self) -> Result<Vec<Arc<Invocation>>, VerificationError> {
        let Self { mode, method, matched } = self;
        match mode {
            VerificationMode::Times(n) | VerificationMode::AtLeast(n) => {
                if matched.len() < n {
                    return Err(VerificationError::TooFewInvocations {
                        method,
                        wanted_count: n,
                        actual_count: matched.len(),
                        last_match: finder::last_location(&matched),
                    });
                }
                Ok(matched)
            },
            VerificationMode::AtMost(n) => {
                if matched.len() > n {
                    return Err(VerificationError::TooManyInvocations {
                        method,
                        wanted_count: n,
                        actual_count: matched.len(),
                        first_undesired: matched.get(n).map(|inv| inv.location()),
                    });
                }
                Ok(matched)
            },
            VerificationMode::AtLeastAndAtMost { min, max } => {
                if matched.len() < min {
                    return Err(VerificationError::TooFewInvocations {
                        method,
                        wanted_count: min,
                        actual_count: matched.len(),
                        last_match: finder::last_location(&matched),
                    });
                }
                if matched.len() > max {
                    return Err(VerificationError::TooManyInvocations {
                        method,
                        wanted_count: max,
                        actual_count: matched.len(),
                        first_undesired: matched.get(max).map(|inv| inv.location()),
                    });
                }
                Ok(matched)
            },
            VerificationMode::Only => {
                if matched.is_empty() {
                    return Err(VerificationError::WantedButNotInvoked {
                        method,
                        similar: None,
                    });
                }
                Ok(matched)
            },
        }
    }

    /// The invocations counted so far, for the early-success path.
    pub(crate) fn into_matched(self) -> Vec<Arc<Invocation>> {
        self.matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arg::ArgValue,
        invocation::{Location, MethodId, MockId},
    };

    fn call(seq: u64) -> Arc<Invocation> {
        Arc::new(Invocation::fixed(
            MockId::new(1),
            MethodId::new("f", 1),
            vec![ArgValue::of(seq)],
            seq,
            Location::new(seq),
        ))
    }

    #[test]
    fn ranged_bounds_are_validated_at_construction() {
        assert!(VerificationMode::at_least_and_at_most(1, 3).is_ok());
        assert!(matches!(
            VerificationMode::at_least_and_at_most(2, 2),
            Err(UsageError::InvalidBounds { min: 2, max: 2 })
        ));
        assert!(VerificationMode::at_least_and_at_most(0, 1).is_err());
    }

    #[test]
    fn times_zero_fails_on_first_match() {
        let mut state = VerificationMode::Times(0).state("f".into());
        let err = state.on_match(&call(1)).unwrap_err();
        assert!(matches!(err, VerificationError::NeverWantedButInvoked { .. }));
    }

    #[test]
    fn times_fails_immediately_past_the_count() {
        let mut state = VerificationMode::Times(1).state("f".into());
        assert_eq!(state.on_match(&call(1)).unwrap(), Step::Satisfied);
        let err = state.on_match(&call(2)).unwrap_err();
        match err {
            VerificationError::TooManyInvocations { actual_count, first_undesired, .. } => {
                assert_eq!(actual_count, 2);
                assert_eq!(first_undesired, Some(Location::new(2)));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn times_reports_too_few_with_last_match_location() {
        let mut state = VerificationMode::Times(3).state("f".into());
        state.on_match(&call(1)).unwrap();
        state.on_match(&call(2)).unwrap();
        let err = state.finish().unwrap_err();
        match err {
            VerificationError::TooFewInvocations { wanted_count, actual_count, last_match, .. } => {
                assert_eq!((wanted_count, actual_count), (3, 2));
                assert_eq!(last_match, Some(Location::new(2)));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn at_least_is_satisfied_at_the_nth_match() {
        let mut state = VerificationMode::AtLeast(2).state("f".into());
        assert_eq!(state.on_match(&call(1)).unwrap(), Step::Continue);
        assert_eq!(state.on_match(&call(2)).unwrap(), Step::Satisfied);
        // Still accumulates beyond the bound.
        assert_eq!(state.on_match(&call(3)).unwrap(), Step::Satisfied);
        assert_eq!(state.finish().unwrap().len(), 3);
    }

    #[test]
    fn at_most_zero_fails_on_first_match() {
        let mut state = VerificationMode::AtMost(0).state("f".into());
        assert!(matches!(
            state.on_match(&call(1)),
            Err(VerificationError::NeverWantedButInvoked { .. })
        ));
    }

    #[test]
    fn at_most_judges_excess_at_end_of_log() {
        let mut state = VerificationMode::AtMost(1).state("f".into());
        assert_eq!(state.on_match(&call(1)).unwrap(), Step::Continue);
        assert_eq!(state.on_match(&call(2)).unwrap(), Step::Continue);
        let err = state.finish().unwrap_err();
        assert!(matches!(
            err,
            VerificationError::TooManyInvocations { wanted_count: 1, actual_count: 2, .. }
        ));
    }

    #[test]
    fn only_rejects_any_second_interaction() {
        let mut state = VerificationMode::Only.state("f".into());
        state.on_match(&call(1)).unwrap();
        assert!(matches!(
            state.on_mismatch(&call(2)),
            Err(VerificationError::NoMoreInteractionsWanted { seq: 2, .. })
        ));
    }

    #[test]
    fn only_with_no_match_wants_but_was_not_invoked() {
        let state = VerificationMode::Only.state("f".into());
        assert!(matches!(
            state.finish(),
            Err(VerificationError::WantedButNotInvoked { .. })
        ));
    }

    #[test]
    fn hand_built_degenerate_bounds_never_pass() {
        // min > max bypasses the constructor; every count must still fail.
        let mode = VerificationMode::AtLeastAndAtMost { min: 3, max: 1 };

        let mut state = mode.state("f".into());
        state.on_match(&call(1)).unwrap();
        state.on_match(&call(2)).unwrap();
        assert!(matches!(
            state.finish(),
            Err(VerificationError::TooFewInvocations { wanted_count: 3, actual_count: 2, .. })
        ));

        let mut state = mode.state("f".into());
        for seq in 1..=4 {
            state.on_match(&call(seq)).unwrap();
        }
        assert!(matches!(
            state.finish(),
            Err(VerificationError::TooManyInvocations { wanted_count: 1, actual_count: 4, .. })
        ));
    }

    #[test]
    fn range_checks_both_bounds_at_end_of_log() {
        let mode = VerificationMode::at_least_and_at_most(1, 2).unwrap();

        let state = mode.state("f".into());
        assert!(matches!(
            state.finish(),
            Err(VerificationError::TooFewInvocations { wanted_count: 1, actual_count: 0, .. })
        ));

        let mut state = mode.state("f".into());
        state.on_match(&call(1)).unwrap();
        assert_eq!(state.on_match(&call(2)).unwrap(), Step::Satisfied);
        state.on_match(&call(3)).unwrap();
        assert!(matches!(
            state.finish(),
            Err(VerificationError::TooManyInvocations { wanted_count: 2, actual_count: 3, .. })
        ));
    }
}
