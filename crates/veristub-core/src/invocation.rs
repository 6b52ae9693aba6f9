//! Recorded invocations.
//!
//! An [`Invocation`] is the immutable record of one call against a stand-in:
//! who was called, which method, with which arguments (both as physically
//! passed and logically expanded), where, and in what global order. The only
//! mutable state is the pair of set-once verification flags, which are atomic
//! because producer threads append invocations while the test thread
//! verifies.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::arg::ArgValue;

/// Logical identity of one stand-in object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockId(u64);

impl MockId {
    /// Wrap a raw stand-in identity.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identity.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Identity of a method: name plus parameter shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    name: String,
    param_count: usize,
    variadic: bool,
}

impl MethodId {
    /// Fixed-arity method identity.
    pub fn new(name: impl Into<String>, param_count: usize) -> Self {
        Self { name: name.into(), param_count, variadic: false }
    }

    /// Variable-arity method identity.
    ///
    /// `param_count` counts declared parameters, the trailing variadic pack
    /// being one of them.
    pub fn variadic(name: impl Into<String>, param_count: usize) -> Self {
        Self { name: name.into(), param_count, variadic: true }
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter count.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Whether the method was declared variable-arity.
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

/// Opaque capture-site token. Used only for reporting, never for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location(u64);

impl Location {
    /// Wrap a raw capture-site token.
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    /// The raw token.
    pub fn token(self) -> u64 {
        self.0
    }
}

/// Cloneable source of global monotone sequence numbers.
///
/// The interception layer holds one clock per test and stamps every
/// invocation it records, across all stand-ins it drives.
#[derive(Debug, Clone, Default)]
pub struct SequenceClock {
    next: Arc<AtomicU64>,
}

impl SequenceClock {
    /// Create a clock starting at sequence number 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next sequence number. Monotone across clones.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Immutable record of one call on a stand-in.
#[derive(Debug)]
pub struct Invocation {
    mock: MockId,
    method: MethodId,
    /// Arguments as physically passed; a variadic call carries its trailing
    /// pack as one group value here.
    raw_args: Vec<ArgValue>,
    /// Logically expanded arguments, one entry per variadic element.
    args: Vec<ArgValue>,
    seq: u64,
    location: Location,
    verified: AtomicBool,
    verified_in_order: AtomicBool,
}

impl Invocation {
    /// Record an invocation with distinct raw and expanded argument views.
    pub fn new(
        mock: MockId,
        method: MethodId,
        raw_args: Vec<ArgValue>,
        args: Vec<ArgValue>,
        seq: u64,
        location: Location,
    ) -> Self {
        Self {
            mock,
            method,
            raw_args,
            args,
            seq,
            location,
            verified: AtomicBool::new(false),
            verified_in_order: AtomicBool::new(false),
        }
    }

    /// Record a fixed-arity invocation, where both argument views coincide.
    pub fn fixed(
        mock: MockId,
        method: MethodId,
        args: Vec<ArgValue>,
        seq: u64,
        location: Location,
    ) -> Self {
        Self::new(mock, method, args.clone(), args, seq, location)
    }

    /// The stand-in this call was made on.
    pub fn mock(&self) -> MockId {
        self.mock
    }

    /// The invoked method's identity.
    pub fn method(&self) -> &MethodId {
        &self.method
    }

    /// Arguments as physically passed.
    pub fn raw_args(&self) -> &[ArgValue] {
        &self.raw_args
    }

    /// Logically expanded arguments.
    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    /// Global monotone sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Capture-site token for reporting.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Whether a non-ordered verification has consumed this invocation.
    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    /// Consume this invocation for non-ordered verification. Idempotent;
    /// once set the flag is never reset.
    pub fn mark_verified(&self) {
        self.verified.store(true, Ordering::Release);
    }

    /// Whether an in-order verification has consumed this invocation.
    pub fn is_verified_in_order(&self) -> bool {
        self.verified_in_order.load(Ordering::Acquire)
    }

    /// Consume this invocation for in-order verification. Idempotent; once
    /// set the flag is never reset.
    pub fn mark_verified_in_order(&self) {
        self.verified_in_order.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotone_across_clones() {
        let clock = SequenceClock::new();
        let other = clock.clone();
        let a = clock.next();
        let b = other.next();
        let c = clock.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn flags_start_clear_and_set_once() {
        let inv = Invocation::fixed(
            MockId::new(1),
            MethodId::new("f", 0),
            Vec::new(),
            1,
            Location::new(1),
        );
        assert!(!inv.is_verified());
        assert!(!inv.is_verified_in_order());

        inv.mark_verified();
        inv.mark_verified();
        assert!(inv.is_verified());
        assert!(!inv.is_verified_in_order());

        inv.mark_verified_in_order();
        assert!(inv.is_verified_in_order());
    }

    #[test]
    fn method_identity_distinguishes_shape() {
        assert_eq!(MethodId::new("f", 2), MethodId::new("f", 2));
        assert_ne!(MethodId::new("f", 2), MethodId::new("f", 3));
        assert_ne!(MethodId::new("f", 2), MethodId::variadic("f", 2));
    }
}
