//! Error types for the verification engine.
//!
//! Two distinct families, mirroring how callers must treat them:
//!
//! - [`UsageError`]: malformed use of the engine itself (combinator stack
//!   misuse, invalid mode bounds, an unfinished verification). Fatal, raised
//!   synchronously, never retried.
//! - [`VerificationError`]: an expectation that did not hold. This is the
//!   expected signaling mechanism for "expectation not met", not a
//!   programming error. Each variant carries the structured data (counts,
//!   locations, sequence numbers) a reporting layer needs to render a
//!   message; this crate never formats prose beyond minimal `Display`
//!   strings.

use thiserror::Error;

use crate::{invocation::Location, matcher::Matcher};

/// Malformed use of the engine. Fatal and never retried.
#[derive(Error, Debug, Clone)]
pub enum UsageError {
    /// A combinator was requested with too few matchers on the stack.
    #[error("'{combinator}' requires {required} matchers on the stack, found {present}")]
    InsufficientMatchers {
        /// Name of the attempted combinator.
        combinator: &'static str,
        /// Matchers the combinator pops.
        required: usize,
        /// Matchers actually present.
        present: usize,
    },

    /// Leftover matchers were found when a call was finalized.
    ///
    /// Carries the stale matchers so the reporting layer can point at them.
    #[error("{} misplaced argument matchers detected", matchers.len())]
    MisplacedMatchers {
        /// The matchers drained from the stack.
        matchers: Vec<Matcher>,
    },

    /// A verification was started but never completed before the next call.
    #[error("previous verification was never completed")]
    UnfinishedVerification,

    /// Invalid bounds for a ranged verification mode.
    #[error("invalid verification bounds: min {min}, max {max} (requires max > 1 and min < max)")]
    InvalidBounds {
        /// Lower bound supplied.
        min: usize,
        /// Upper bound supplied.
        max: usize,
    },

    /// Reported matchers do not line up with the invocation's arguments.
    #[error("{reported} matchers were reported for {expected} arguments")]
    MatcherArityMismatch {
        /// Matchers drained from the stack.
        reported: usize,
        /// Logical arguments of the invocation.
        expected: usize,
    },
}

/// A structured verification discrepancy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Fewer matching invocations than required.
    #[error("{method}: wanted {wanted_count} invocations but recorded {actual_count}")]
    TooFewInvocations {
        /// Method name of the wanted invocation.
        method: String,
        /// Required count.
        wanted_count: usize,
        /// Matching invocations actually recorded.
        actual_count: usize,
        /// Capture site of the last matching invocation, if any.
        last_match: Option<Location>,
    },

    /// More matching invocations than allowed.
    #[error("{method}: wanted at most {wanted_count} invocations but recorded {actual_count}")]
    TooManyInvocations {
        /// Method name of the wanted invocation.
        method: String,
        /// Allowed count.
        wanted_count: usize,
        /// Matching invocations actually recorded.
        actual_count: usize,
        /// Capture site of the first invocation past the allowance.
        first_undesired: Option<Location>,
    },

    /// A zero-count expectation was violated.
    #[error("{method}: never wanted but invoked at {location:?}")]
    NeverWantedButInvoked {
        /// Method name of the wanted invocation.
        method: String,
        /// Capture site of the offending invocation.
        location: Location,
    },

    /// The wanted invocation never happened.
    #[error("{method}: wanted but not invoked")]
    WantedButNotInvoked {
        /// Method name of the wanted invocation.
        method: String,
        /// Capture site of an invocation of the same method with different
        /// arguments, when one exists ("arguments differ" diagnostics).
        similar: Option<Location>,
    },

    /// The wanted invocation never happened after the in-order point.
    #[error("{method}: wanted anywhere after the last in-order verification")]
    WantedButNotInvokedInOrder {
        /// Method name of the wanted invocation.
        method: String,
        /// Capture site of the most recent invocation the ordering context
        /// already consumed.
        after: Option<Location>,
    },

    /// `Only` verification observed an interaction it did not want.
    #[error("no more interactions wanted but {method} was invoked at {location:?}")]
    NoMoreInteractionsWanted {
        /// Method name of the offending invocation.
        method: String,
        /// Capture site of the offending invocation.
        location: Location,
        /// Global sequence number of the offending invocation.
        seq: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_matchers_names_the_combinator() {
        let err =
            UsageError::InsufficientMatchers { combinator: "and", required: 2, present: 1 };
        assert!(err.to_string().contains("'and'"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn misplaced_matchers_carry_the_stale_matchers() {
        let err = UsageError::MisplacedMatchers {
            matchers: vec![Matcher::any(), Matcher::eq(1_i32)],
        };
        match err {
            UsageError::MisplacedMatchers { matchers } => assert_eq!(matchers.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn discrepancies_compare_structurally() {
        let a = VerificationError::TooFewInvocations {
            method: "f".into(),
            wanted_count: 2,
            actual_count: 1,
            last_match: Some(Location::new(4)),
        };
        assert_eq!(a.clone(), a);
    }
}
