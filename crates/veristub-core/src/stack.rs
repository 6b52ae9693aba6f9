//! Matcher combinator stack.
//!
//! Leaf matchers reported while an expectation is being built accumulate on
//! this last-in-first-out stack; `and`/`or`/`not` pop their operands and push
//! the wrapper. The stack is thread-confined by construction: it lives
//! inside a [`crate::session::Session`] owned by the calling thread, never
//! in process-wide state.
//!
//! Invariant: when a stubbing or verification call is finalized the stack
//! must be empty. Leftovers mean matchers were used outside an expectation
//! and are surfaced as [`UsageError::MisplacedMatchers`] carrying the stale
//! matchers.

use crate::{error::UsageError, matcher::Matcher};

/// Thread-confined LIFO of matchers awaiting combination.
#[derive(Debug, Default)]
pub struct MatcherStack {
    stack: Vec<Matcher>,
}

impl MatcherStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a leaf matcher.
    pub fn push(&mut self, matcher: Matcher) {
        self.stack.push(matcher);
    }

    /// Pop two matchers and push their conjunction.
    pub fn combine_and(&mut self) -> Result<(), UsageError> {
        let (left, right) = self.pop_two("and")?;
        self.stack.push(Matcher::and(left, right));
        Ok(())
    }

    /// Pop two matchers and push their disjunction.
    pub fn combine_or(&mut self) -> Result<(), UsageError> {
        let (left, right) = self.pop_two("or")?;
        self.stack.push(Matcher::or(left, right));
        Ok(())
    }

    /// Pop one matcher and push its negation.
    pub fn combine_not(&mut self) -> Result<(), UsageError> {
        let Some(inner) = self.stack.pop() else {
            return Err(UsageError::InsufficientMatchers {
                combinator: "not",
                required: 1,
                present: 0,
            });
        };
        self.stack.push(Matcher::negate(inner));
        Ok(())
    }

    /// Return and clear all accumulated matchers, oldest first.
    pub fn drain(&mut self) -> Vec<Matcher> {
        std::mem::take(&mut self.stack)
    }

    /// Fail with the stale matchers if any are still present, clearing the
    /// stack either way so one misuse does not poison the next expectation.
    pub fn validate_empty(&mut self) -> Result<(), UsageError> {
        if self.stack.is_empty() {
            return Ok(());
        }
        Err(UsageError::MisplacedMatchers { matchers: self.drain() })
    }

    /// Matchers currently on the stack.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn pop_two(&mut self, combinator: &'static str) -> Result<(Matcher, Matcher), UsageError> {
        if self.stack.len() < 2 {
            return Err(UsageError::InsufficientMatchers {
                combinator,
                required: 2,
                present: self.stack.len(),
            });
        }
        // Pushed left-to-right, so the right operand is on top.
        let right = self.stack.pop();
        let left = self.stack.pop();
        match (left, right) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(UsageError::InsufficientMatchers { combinator, required: 2, present: 0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::ArgValue;

    #[test]
    fn combine_and_pops_two_pushes_one() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::eq(1_i32));
        stack.push(Matcher::eq(2_i32));
        stack.combine_and().unwrap();
        assert_eq!(stack.len(), 1);

        let combined = stack.drain().pop().unwrap();
        assert!(!combined.matches(&ArgValue::of(1_i32)));
        assert!(!combined.matches(&ArgValue::of(2_i32)));
    }

    #[test]
    fn operand_order_is_preserved() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::instance_of::<i32>());
        stack.push(Matcher::eq(5_i32));
        stack.combine_or().unwrap();

        let combined = stack.drain().pop().unwrap();
        assert!(combined.matches(&ArgValue::of(7_i32)));
        assert!(!combined.matches(&ArgValue::of("s")));
    }

    #[test]
    fn and_with_one_matcher_names_the_combinator() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::any());
        let err = stack.combine_and().unwrap_err();
        match err {
            UsageError::InsufficientMatchers { combinator, required, present } => {
                assert_eq!(combinator, "and");
                assert_eq!(required, 2);
                assert_eq!(present, 1);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn not_requires_one_matcher() {
        let mut stack = MatcherStack::new();
        let err = stack.combine_not().unwrap_err();
        assert!(matches!(
            err,
            UsageError::InsufficientMatchers { combinator: "not", required: 1, present: 0 }
        ));

        stack.push(Matcher::eq(3_i32));
        stack.combine_not().unwrap();
        let negated = stack.drain().pop().unwrap();
        assert!(negated.matches(&ArgValue::of(4_i32)));
        assert!(!negated.matches(&ArgValue::of(3_i32)));
    }

    #[test]
    fn validate_empty_drains_and_reports_leftovers() {
        let mut stack = MatcherStack::new();
        stack.push(Matcher::any());
        stack.push(Matcher::is_null());

        let err = stack.validate_empty().unwrap_err();
        match err {
            UsageError::MisplacedMatchers { matchers } => assert_eq!(matchers.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        // One misuse must not poison the next expectation.
        assert!(stack.is_empty());
        assert!(stack.validate_empty().is_ok());
    }
}
