//! Test harness for the verification engine.
//!
//! The engine treats stand-in generation and call interception as external
//! collaborators reachable only through narrow contracts: record an
//! invocation, expose the log, deliver to listeners. This crate plays that
//! role for tests: a [`Recorder`] mints [`StandIn`]s sharing one sequence
//! clock, and each stand-in turns scripted calls into properly stamped
//! [`Invocation`]s appended to its [`InvocationLog`].
//!
//! [`spawn_caller`] drives invocations from a producer thread after a
//! delay, which is what the deadline-bounded verification tests need.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use veristub_core::{
    ArgValue, Invocation, InvocationLog, Location, Matcher, MethodId, MockId, SequenceClock,
    WantedInvocation,
};

/// Factory for stand-ins sharing one global sequence clock.
#[derive(Debug, Default)]
pub struct Recorder {
    clock: SequenceClock,
    locations: Arc<AtomicU64>,
    next_mock: u64,
}

impl Recorder {
    /// Create a recorder with a fresh clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new stand-in with its own empty log.
    pub fn stand_in(&mut self) -> StandIn {
        self.next_mock += 1;
        StandIn {
            id: MockId::new(self.next_mock),
            log: Arc::new(InvocationLog::new()),
            clock: self.clock.clone(),
            locations: Arc::clone(&self.locations),
        }
    }
}

/// A scripted test double: calls are explicit method invocations.
///
/// Cloning shares the underlying log and clock, so clones can be moved into
/// producer threads.
#[derive(Debug, Clone)]
pub struct StandIn {
    id: MockId,
    log: Arc<InvocationLog>,
    clock: SequenceClock,
    locations: Arc<AtomicU64>,
}

impl StandIn {
    /// Logical identity of this stand-in.
    pub fn id(&self) -> MockId {
        self.id
    }

    /// The shared invocation log.
    pub fn log(&self) -> &Arc<InvocationLog> {
        &self.log
    }

    /// Ordered snapshot of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Arc<Invocation>> {
        self.log.snapshot()
    }

    /// Record a fixed-arity call.
    pub fn invoke(&self, method: &MethodId, args: Vec<ArgValue>) -> Arc<Invocation> {
        let seq = self.clock.next();
        let invocation = Arc::new(Invocation::fixed(
            self.id,
            method.clone(),
            args,
            seq,
            self.next_location(),
        ));
        tracing::trace!(mock = self.id.raw(), method = method.name(), seq, "recorded call");
        self.log.record(Arc::clone(&invocation));
        invocation
    }

    /// Record a variadic call: `fixed` leading arguments plus the trailing
    /// pack, which is kept as one physical group argument and expanded
    /// element-wise in the logical view.
    pub fn invoke_variadic(
        &self,
        method: &MethodId,
        fixed: Vec<ArgValue>,
        pack: Vec<ArgValue>,
    ) -> Arc<Invocation> {
        let mut raw = fixed.clone();
        raw.push(ArgValue::group(pack.clone()));
        let mut expanded = fixed;
        expanded.extend(pack);

        let seq = self.clock.next();
        let invocation = Arc::new(Invocation::new(
            self.id,
            method.clone(),
            raw,
            expanded,
            seq,
            self.next_location(),
        ));
        self.log.record(Arc::clone(&invocation));
        invocation
    }

    /// Build a wanted-invocation template against this stand-in.
    pub fn wanted(&self, method: &MethodId, matchers: Vec<Matcher>) -> WantedInvocation {
        let template = Arc::new(Invocation::fixed(
            self.id,
            method.clone(),
            Vec::new(),
            0,
            Location::new(0),
        ));
        WantedInvocation::new(template, matchers)
    }

    fn next_location(&self) -> Location {
        Location::new(self.locations.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Spawn a producer thread that records one call after `delay`.
pub fn spawn_caller(
    stand_in: StandIn,
    method: MethodId,
    args: Vec<ArgValue>,
    delay: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        stand_in.invoke(&method, args);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_global_across_stand_ins() {
        let mut recorder = Recorder::new();
        let a = recorder.stand_in();
        let b = recorder.stand_in();
        let method = MethodId::new("f", 0);

        let first = a.invoke(&method, Vec::new());
        let second = b.invoke(&method, Vec::new());
        let third = a.invoke(&method, Vec::new());

        assert!(first.seq() < second.seq());
        assert!(second.seq() < third.seq());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn variadic_invocations_carry_both_views() {
        let mut recorder = Recorder::new();
        let mock = recorder.stand_in();
        let method = MethodId::variadic("f", 2);

        let inv = mock.invoke_variadic(
            &method,
            vec![ArgValue::of("lead")],
            vec![ArgValue::of(1), ArgValue::of(2)],
        );
        assert_eq!(inv.raw_args().len(), 2);
        assert_eq!(inv.args().len(), 3);
        assert!(inv.raw_args()[1].as_group().is_some());
    }
}
