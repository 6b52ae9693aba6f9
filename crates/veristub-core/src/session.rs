//! Per-thread expectation-building session.
//!
//! A [`Session`] is the explicit context object that holds everything one
//! thread accumulates between "the user started describing an expectation"
//! and "the expectation was finalized": the matcher stack and the pending
//! verification mode. Callers own their session; the engine keeps no global
//! or thread-local state, so tests can run isolated sessions side by side.
//!
//! Only one expectation is under construction at a time per session. The
//! state transitions validate that discipline: starting a verification while
//! a previous one was never pulled is a usage error, as are matchers left on
//! the stack when a call is finalized.

use crate::{
    error::UsageError,
    invocation::Invocation,
    matcher::Matcher,
    mode::VerificationMode,
    stack::MatcherStack,
};

/// Thread-confined expectation-building state.
#[derive(Debug, Default)]
pub struct Session {
    matchers: MatcherStack,
    pending_verification: Option<VerificationMode>,
}

impl Session {
    /// Create a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a leaf matcher for the expectation under construction.
    pub fn report_matcher(&mut self, matcher: Matcher) {
        self.matchers.push(matcher);
    }

    /// Combine the two topmost matchers with AND.
    pub fn report_and(&mut self) -> Result<(), UsageError> {
        self.matchers.combine_and()
    }

    /// Combine the two topmost matchers with OR.
    pub fn report_or(&mut self) -> Result<(), UsageError> {
        self.matchers.combine_or()
    }

    /// Negate the topmost matcher.
    pub fn report_not(&mut self) -> Result<(), UsageError> {
        self.matchers.combine_not()
    }

    /// Begin a verification. Validates that the previous expectation was
    /// finished first.
    pub fn verification_started(&mut self, mode: VerificationMode) -> Result<(), UsageError> {
        self.validate()?;
        self.pending_verification = Some(mode);
        Ok(())
    }

    /// Take the pending verification mode, if one was started.
    pub fn pull_verification_mode(&mut self) -> Option<VerificationMode> {
        self.pending_verification.take()
    }

    /// Validate that no expectation is half-built: no pending verification,
    /// no stale matchers. Clears the offending state so the next expectation
    /// starts clean.
    pub fn validate(&mut self) -> Result<(), UsageError> {
        if self.pending_verification.take().is_some() {
            // Drop stale matchers too; they belong to the abandoned call.
            let _ = self.matchers.drain();
            return Err(UsageError::UnfinishedVerification);
        }
        self.matchers.validate_empty()
    }

    /// Bind the reported matchers to a just-finalized invocation template.
    ///
    /// When no matchers were reported the concrete arguments stand in for
    /// themselves: each becomes an equality matcher. When matchers were
    /// reported their count must cover the logical arguments, or, for a
    /// variadic method, the physical arguments (one matcher for the whole
    /// trailing group).
    pub fn bind_matchers(&mut self, template: &Invocation) -> Result<Vec<Matcher>, UsageError> {
        let reported = self.matchers.drain();
        if reported.is_empty() {
            return Ok(template
                .args()
                .iter()
                .map(|arg| Matcher::eq_value(arg.clone()))
                .collect());
        }

        let expanded = template.args().len();
        let physical = template.raw_args().len();
        let fits = reported.len() == expanded
            || (template.method().is_variadic() && reported.len() == physical);
        if !fits {
            return Err(UsageError::MatcherArityMismatch {
                reported: reported.len(),
                expected: expanded,
            });
        }
        Ok(reported)
    }

    /// Direct access to the matcher stack, for the fluent layer.
    pub fn matcher_stack(&mut self) -> &mut MatcherStack {
        &mut self.matchers
    }
}
