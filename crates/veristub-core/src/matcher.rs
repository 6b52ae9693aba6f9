//! Argument matchers and their combinators.
//!
//! [`Matcher`] is a closed tagged-variant type: leaf predicates (`Equals`,
//! `InstanceOf`, `Any`, `IsNull`, `Capturing`, `Custom`) plus the `And`, `Or`
//! and `Not` wrappers built by the matcher stack. Evaluation is a recursive
//! fold over the tree.
//!
//! Each matcher declares the argument type it accepts as an explicit
//! [`TypeId`] descriptor (`None` = accepts anything). The type-safe
//! application action in [`crate::wanted`] consults this descriptor before
//! invoking the predicate, so a matcher is never applied to an argument of an
//! incompatible type.

use std::{
    any::TypeId,
    fmt,
    sync::{Arc, Mutex},
};

use crate::arg::ArgValue;

/// Shared handle recording every argument a `Capturing` matcher consumed.
///
/// Cloning the handle shares the underlying storage, so the caller keeps one
/// clone and pushes the other into the matcher.
#[derive(Debug, Clone, Default)]
pub struct CaptureHandle {
    captured: Arc<Mutex<Vec<ArgValue>>>,
}

impl CaptureHandle {
    /// Create an empty capture handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured arguments, in capture order.
    pub fn captured(&self) -> Vec<ArgValue> {
        crate::lock(&self.captured).clone()
    }

    /// The most recently captured argument.
    pub fn last(&self) -> Option<ArgValue> {
        crate::lock(&self.captured).last().cloned()
    }

    pub(crate) fn record(&self, arg: &ArgValue) {
        crate::lock(&self.captured).push(arg.clone());
    }
}

/// Third-party leaf predicate with an explicitly declared accepted type.
#[derive(Clone)]
pub struct CustomMatcher {
    name: &'static str,
    accepted: Option<(TypeId, &'static str)>,
    predicate: Arc<dyn Fn(&ArgValue) -> bool + Send + Sync>,
}

impl CustomMatcher {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CustomMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("CustomMatcher");
        dbg.field("name", &self.name);
        if let Some((_, type_name)) = self.accepted {
            dbg.field("accepted", &type_name);
        }
        dbg.finish()
    }
}

/// Predicate over one argument value.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Matches arguments equal to the stored value.
    Equals(ArgValue),
    /// Matches any non-null argument of the declared type.
    InstanceOf {
        /// Accepted runtime type.
        type_id: TypeId,
        /// Human-readable name of the accepted type.
        type_name: &'static str,
    },
    /// Matches anything, including null.
    Any,
    /// Matches only the explicit null value.
    IsNull,
    /// Matches anything and records the argument on the success path.
    Capturing(CaptureHandle),
    /// Third-party predicate with a declared accepted type.
    Custom(CustomMatcher),
    /// Both operands must match.
    And(Box<Matcher>, Box<Matcher>),
    /// Either operand must match.
    Or(Box<Matcher>, Box<Matcher>),
    /// The operand must not match.
    Not(Box<Matcher>),
}

impl Matcher {
    /// Equality matcher against a concrete value.
    pub fn eq<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self::Equals(ArgValue::of(value))
    }

    /// Equality matcher against an already-wrapped value.
    pub fn eq_value(value: ArgValue) -> Self {
        Self::Equals(value)
    }

    /// Equality matcher against a whole variadic group.
    pub fn eq_group(elements: Vec<ArgValue>) -> Self {
        Self::Equals(ArgValue::group(elements))
    }

    /// Type-test matcher for `T`.
    pub fn instance_of<T: 'static>() -> Self {
        Self::InstanceOf { type_id: TypeId::of::<T>(), type_name: std::any::type_name::<T>() }
    }

    /// Matcher accepting any argument.
    pub fn any() -> Self {
        Self::Any
    }

    /// Matcher accepting only null.
    pub fn is_null() -> Self {
        Self::IsNull
    }

    /// Capturing matcher recording into the given handle.
    pub fn capturing(handle: &CaptureHandle) -> Self {
        Self::Capturing(handle.clone())
    }

    /// Untyped custom predicate. Accepts arguments of any type.
    pub fn custom<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&ArgValue) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomMatcher { name, accepted: None, predicate: Arc::new(predicate) })
    }

    /// Custom predicate over arguments of type `T`.
    ///
    /// The declared type doubles as the compatibility descriptor: the
    /// predicate is never invoked for arguments of a different type.
    pub fn custom_for<T, F>(name: &'static str, predicate: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomMatcher {
            name,
            accepted: Some((TypeId::of::<T>(), std::any::type_name::<T>())),
            predicate: Arc::new(move |arg| arg.downcast_ref::<T>().is_some_and(&predicate)),
        })
    }

    /// Custom predicate over a whole variadic group.
    ///
    /// Declaring the group type makes this matcher eligible for the
    /// one-matcher-per-group variadic application rule.
    pub fn group<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&[ArgValue]) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomMatcher {
            name,
            accepted: Some((ArgValue::group_type_id(), "variadic group")),
            predicate: Arc::new(move |arg| arg.as_group().is_some_and(&predicate)),
        })
    }

    /// Conjunction of two matchers.
    pub fn and(left: Matcher, right: Matcher) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// Disjunction of two matchers.
    pub fn or(left: Matcher, right: Matcher) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Negation of a matcher.
    pub fn negate(inner: Matcher) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Evaluate this matcher against one argument.
    pub fn matches(&self, arg: &ArgValue) -> bool {
        match self {
            Self::Equals(expected) => expected == arg,
            Self::InstanceOf { type_id, .. } => arg.type_id() == Some(*type_id),
            Self::Any | Self::Capturing(_) => true,
            Self::IsNull => arg.is_null(),
            Self::Custom(custom) => (custom.predicate)(arg),
            Self::And(left, right) => left.matches(arg) && right.matches(arg),
            Self::Or(left, right) => left.matches(arg) || right.matches(arg),
            Self::Not(inner) => !inner.matches(arg),
        }
    }

    /// The declared argument type this matcher expects. `None` accepts any.
    pub fn accepted_type(&self) -> Option<TypeId> {
        match self {
            Self::Equals(expected) => expected.type_id(),
            Self::InstanceOf { type_id, .. } => Some(*type_id),
            Self::Custom(custom) => custom.accepted.map(|(type_id, _)| type_id),
            Self::Any | Self::IsNull | Self::Capturing(_) => None,
            // Combinators defer compatibility to their children at match time.
            Self::And(..) | Self::Or(..) | Self::Not(_) => None,
        }
    }

    /// Record `arg` if this is a top-level capturing matcher.
    ///
    /// Runs only on the success path of a verification, so a failed check
    /// leaves no capture side effects.
    pub(crate) fn capture_from(&self, arg: &ArgValue) {
        if let Self::Capturing(handle) = self {
            handle.record(arg);
        }
    }
}
