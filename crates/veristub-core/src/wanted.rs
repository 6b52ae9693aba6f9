//! Wanted invocations and matcher application.
//!
//! A [`WantedInvocation`] pairs a template invocation (for stand-in and
//! method identity) with one matcher per logical argument position, or one
//! matcher covering an entire trailing variadic group.
//!
//! Matching an invocation is two decisions layered on one algorithm:
//!
//! 1. *Pairing*: does the matcher list line up with the invocation's
//!    arguments at all, and against which argument view? A variadic call has
//!    two views: the physical one (trailing pack as a single group value) and
//!    the logically expanded one. The group view is used exactly when the
//!    method is variable-arity and the last matcher declares the group type.
//! 2. *Application*: fold the supplied action position-wise with logical
//!    AND, short-circuiting on the first `false`.
//!
//! An arity mismatch is the only outcome where the action is never invoked,
//! and [`MatchOutcome`] keeps that distinction explicit.

use std::sync::Arc;

use crate::{
    arg::ArgValue,
    invocation::Invocation,
    matcher::Matcher,
};

/// Result of pairing matchers to one invocation's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The action returned `true` for every position.
    Matched,
    /// The action returned `false` for some position.
    Mismatched,
    /// The matcher list does not fit the invocation's arity; the action was
    /// never invoked.
    NotApplied,
}

impl MatchOutcome {
    /// Whether every position matched.
    pub fn is_match(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// Template describing an expected call: method identity plus matchers.
#[derive(Debug, Clone)]
pub struct WantedInvocation {
    template: Arc<Invocation>,
    matchers: Vec<Matcher>,
}

impl WantedInvocation {
    /// Pair a template invocation with its argument matchers.
    pub fn new(template: Arc<Invocation>, matchers: Vec<Matcher>) -> Self {
        Self { template, matchers }
    }

    /// The template invocation carrying the wanted identity.
    pub fn template(&self) -> &Arc<Invocation> {
        &self.template
    }

    /// The ordered argument matchers.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Method name, for diagnostics.
    pub fn method_name(&self) -> &str {
        self.template.method().name()
    }

    /// Full match: same stand-in, same method identity, and every argument
    /// position accepted under the type-safe action.
    pub fn matches(&self, invocation: &Invocation) -> bool {
        self.has_same_method(invocation)
            && apply_matchers(invocation, &self.matchers, type_safe_apply).is_match()
    }

    /// Same stand-in and exact method identity (name and parameter shape).
    pub fn has_same_method(&self, invocation: &Invocation) -> bool {
        self.template.mock() == invocation.mock()
            && self.template.method() == invocation.method()
    }

    /// Same stand-in and method name, shape notwithstanding. Used to tell
    /// "arguments differ" apart from "never invoked".
    pub fn has_similar_method(&self, invocation: &Invocation) -> bool {
        self.template.mock() == invocation.mock()
            && self.template.method().name() == invocation.method().name()
    }

    /// Replay the capturing side effects against a matched invocation.
    ///
    /// Uses the same pairing rules as matching, so a group matcher captures
    /// the group value and positional matchers capture their position.
    pub fn capture_arguments_from(&self, invocation: &Invocation) {
        let _ = apply_matchers(invocation, &self.matchers, |matcher, arg| {
            matcher.capture_from(arg);
            true
        });
    }
}

/// Pair each matcher with its argument and fold `action` with logical AND.
///
/// Returns [`MatchOutcome::NotApplied`] without invoking the action when the
/// matcher list fits neither argument view.
pub fn apply_matchers(
    invocation: &Invocation,
    matchers: &[Matcher],
    mut action: impl FnMut(&Matcher, &ArgValue) -> bool,
) -> MatchOutcome {
    if wants_raw_group(invocation, matchers)
        && invocation.raw_args().len() == matchers.len()
    {
        return pairwise(invocation.raw_args(), matchers, &mut action);
    }
    if invocation.args().len() == matchers.len() {
        return pairwise(invocation.args(), matchers, &mut action);
    }
    MatchOutcome::NotApplied
}

/// The reusable type-safe application action.
///
/// A null argument is passed through to the matcher, which owns null
/// handling. A non-null argument must carry the matcher's declared type, or
/// the matcher is never invoked and the position fails.
pub fn type_safe_apply(matcher: &Matcher, arg: &ArgValue) -> bool {
    compatible(matcher, arg) && matcher.matches(arg)
}

fn compatible(matcher: &Matcher, arg: &ArgValue) -> bool {
    if arg.is_null() {
        return true;
    }
    matcher.accepted_type().is_none_or(|accepted| arg.type_id() == Some(accepted))
}

/// True when the user supplied one matcher for the whole trailing variadic
/// group: the method is variable-arity and the last matcher declares the
/// type of the physical trailing pack.
fn wants_raw_group(invocation: &Invocation, matchers: &[Matcher]) -> bool {
    if !invocation.method().is_variadic() {
        return false;
    }
    let Some(last_matcher) = matchers.last() else {
        return false;
    };
    let Some(group) = invocation.raw_args().last() else {
        return false;
    };
    match (last_matcher.accepted_type(), group.type_id()) {
        (Some(accepted), Some(actual)) => accepted == actual,
        _ => false,
    }
}

fn pairwise(
    arguments: &[ArgValue],
    matchers: &[Matcher],
    action: &mut impl FnMut(&Matcher, &ArgValue) -> bool,
) -> MatchOutcome {
    for (matcher, argument) in matchers.iter().zip(arguments) {
        if !action(matcher, argument) {
            return MatchOutcome::Mismatched;
        }
    }
    MatchOutcome::Matched
}
