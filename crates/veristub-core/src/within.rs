//! Time-bounded, concurrent verification.
//!
//! [`verify_within`] lets a verification succeed the moment its condition is
//! met, or fail once a wall-clock deadline elapses, while invocations keep
//! arriving from other threads.
//!
//! The protocol: atomically snapshot the log and install a channel-backed
//! listener ([`crate::log::InvocationLog::subscribe`]); judge everything
//! already recorded as a batch, so an exactness mode fails on an excess
//! invocation that already happened instead of stopping at its count; then
//! drain an [`InvocationStream`] that blocks on the channel for the
//! *remaining* time until the deadline, stopping with success the instant
//! the machine is satisfied, or running its end-of-log evaluation when the
//! deadline elapses (which may still succeed, e.g. for `AtMost`). The
//! listener guard uninstalls on every exit path, including panics and error
//! returns.
//!
//! The in-order variant first discards — claiming them in the context — the
//! prefix of invocations that do not match and were not already claimed,
//! then re-injects the first match at the front of the stream so the main
//! loop sees a normal matching stream.

use std::{
    collections::VecDeque,
    sync::{Arc, mpsc},
    time::{Duration, Instant},
};

use crate::{
    error::VerificationError,
    invocation::Invocation,
    log::InvocationLog,
    mode::{Step, VerificationMode},
    order::InOrderContext,
    verify::{enrich_not_invoked, mark_success},
    wanted::WantedInvocation,
};

/// Verify `wanted` against a live log, bounded by `timeout` from now.
///
/// Blocks the calling thread. The deadline elapsing is not an error by
/// itself; it triggers the mode's final end-of-log evaluation.
pub fn verify_within(
    timeout: Duration,
    log: &InvocationLog,
    wanted: &WantedInvocation,
    mode: VerificationMode,
    mut context: Option<&mut InOrderContext>,
) -> Result<(), VerificationError> {
    let deadline = Instant::now() + timeout;
    let (snapshot, rx, _guard) = log.subscribe();
    let mut stream = InvocationStream { buffer: VecDeque::from(snapshot), rx };

    if let Some(context) = context.as_deref_mut() {
        discard_unordered_prefix(&mut stream, wanted, context, deadline);
    }

    let mut state = mode.state(wanted.method_name().to_string());

    // Invocations recorded before the verification started are judged as a
    // batch: the condition must hold over all of them, so early exit only
    // applies once the snapshot is exhausted.
    let mut satisfied = false;
    while let Some(invocation) = stream.next_buffered() {
        if let Some(context) = context.as_deref_mut()
            && context.is_consumed_or_earlier(&invocation)
        {
            continue;
        }
        if wanted.matches(&invocation) {
            let step = state
                .on_match(&invocation)
                .map_err(|err| enrich_stream(err, log, wanted, context.as_deref()))?;
            satisfied = step == Step::Satisfied;
        } else {
            state
                .on_mismatch(&invocation)
                .map_err(|err| enrich_stream(err, log, wanted, context.as_deref()))?;
        }
    }
    if satisfied {
        let matched = state.into_matched();
        tracing::debug!(
            method = wanted.method_name(),
            matched = matched.len(),
            "verification satisfied by recorded invocations"
        );
        mark_success(&matched, wanted, context);
        return Ok(());
    }

    while let Some(invocation) = stream.next_before(deadline) {
        if let Some(context) = context.as_deref_mut()
            && context.is_consumed_or_earlier(&invocation)
        {
            continue;
        }
        if wanted.matches(&invocation) {
            let step = state
                .on_match(&invocation)
                .map_err(|err| enrich_stream(err, log, wanted, context.as_deref()))?;
            if step == Step::Satisfied {
                let matched = state.into_matched();
                tracing::debug!(
                    method = wanted.method_name(),
                    matched = matched.len(),
                    "verification satisfied before deadline"
                );
                mark_success(&matched, wanted, context);
                return Ok(());
            }
        } else {
            state
                .on_mismatch(&invocation)
                .map_err(|err| enrich_stream(err, log, wanted, context.as_deref()))?;
        }
    }

    tracing::debug!(method = wanted.method_name(), "deadline elapsed, evaluating end of log");
    let matched = state
        .finish()
        .map_err(|err| enrich_stream(err, log, wanted, context.as_deref()))?;
    mark_success(&matched, wanted, context);
    Ok(())
}

/// Claim the non-matching, unclaimed prefix and re-inject the first match.
fn discard_unordered_prefix(
    stream: &mut InvocationStream,
    wanted: &WantedInvocation,
    context: &mut InOrderContext,
    deadline: Instant,
) {
    while let Some(invocation) = stream.next_before(deadline) {
        if !context.is_consumed_or_earlier(&invocation) && wanted.matches(&invocation) {
            stream.push_front(invocation);
            return;
        }
        context.mark_verified(&invocation);
    }
}

fn enrich_stream(
    err: VerificationError,
    log: &InvocationLog,
    wanted: &WantedInvocation,
    context: Option<&InOrderContext>,
) -> VerificationError {
    enrich_not_invoked(err, &log.snapshot(), wanted, context)
}

/// Re-buffer ahead of the listener channel.
///
/// Serves the snapshot (and anything pushed back to the front) before
/// blocking on the channel; the blocking receive always uses the time
/// remaining until the deadline, never a fixed per-iteration timeout.
struct InvocationStream {
    buffer: VecDeque<Arc<Invocation>>,
    rx: mpsc::Receiver<Arc<Invocation>>,
}

impl InvocationStream {
    fn next_buffered(&mut self) -> Option<Arc<Invocation>> {
        self.buffer.pop_front()
    }

    fn next_before(&mut self, deadline: Instant) -> Option<Arc<Invocation>> {
        if let Some(front) = self.buffer.pop_front() {
            return Some(front);
        }
        let remaining = deadline.checked_duration_since(Instant::now())?;
        self.rx.recv_timeout(remaining).ok()
    }

    fn push_front(&mut self, invocation: Arc<Invocation>) {
        self.buffer.push_front(invocation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arg::ArgValue,
        invocation::{Location, MethodId, MockId},
        matcher::Matcher,
    };

    fn call(arg: i32, seq: u64) -> Arc<Invocation> {
        Arc::new(Invocation::fixed(
            MockId::new(1),
            MethodId::new("f", 1),
            vec![ArgValue::of(arg)],
            seq,
            Location::new(seq),
        ))
    }

    fn wanted(arg: i32) -> WantedInvocation {
        WantedInvocation::new(call(arg, 0), vec![Matcher::eq(arg)])
    }

    #[test]
    fn snapshot_alone_can_satisfy_immediately() {
        let log = InvocationLog::new();
        log.record(call(1, 1));
        let started = Instant::now();
        verify_within(
            Duration::from_secs(5),
            &log,
            &wanted(1),
            VerificationMode::Times(1),
            None,
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1), "must not wait out the deadline");
        assert!(log.snapshot()[0].is_verified());
    }

    #[test]
    fn at_most_succeeds_only_after_the_deadline() {
        let log = InvocationLog::new();
        log.record(call(1, 1));
        let started = Instant::now();
        verify_within(
            Duration::from_millis(50),
            &log,
            &wanted(1),
            VerificationMode::AtMost(1),
            None,
        )
        .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn excess_already_recorded_fails_an_exact_count_immediately() {
        // Two matches are already in the log; times(1) must see both and
        // fail rather than stop at its count and succeed.
        let log = InvocationLog::new();
        log.record(call(1, 1));
        log.record(call(1, 2));
        let started = Instant::now();
        let err = verify_within(
            Duration::from_secs(5),
            &log,
            &wanted(1),
            VerificationMode::Times(1),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::TooManyInvocations { wanted_count: 1, actual_count: 2, .. }
        ));
        assert!(started.elapsed() < Duration::from_secs(1), "must not wait out the deadline");
        assert!(!log.snapshot()[0].is_verified());
    }

    #[test]
    fn missing_invocation_fails_no_earlier_than_the_deadline() {
        let log = InvocationLog::new();
        let started = Instant::now();
        let err = verify_within(
            Duration::from_millis(60),
            &log,
            &wanted(1),
            VerificationMode::Times(1),
            None,
        )
        .unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(matches!(err, VerificationError::WantedButNotInvoked { .. }));
    }

    #[test]
    fn listener_is_removed_on_failure_paths() {
        let log = InvocationLog::new();
        log.record(call(2, 1));
        let err = verify_within(
            Duration::from_millis(10),
            &log,
            &wanted(2),
            VerificationMode::Times(0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, VerificationError::NeverWantedButInvoked { .. }));

        // A subsequent verification subscribes cleanly and sees fresh state.
        log.record(call(2, 2));
        let err = verify_within(
            Duration::from_millis(10),
            &log,
            &wanted(2),
            VerificationMode::Times(1),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, VerificationError::TooManyInvocations { .. }));
    }

    #[test]
    fn ordered_prefix_is_discarded_and_claimed() {
        let log = InvocationLog::new();
        log.record(call(9, 1));
        log.record(call(1, 2));
        let mut ctx = InOrderContext::new();
        verify_within(
            Duration::from_millis(200),
            &log,
            &wanted(1),
            VerificationMode::Times(1),
            Some(&mut ctx),
        )
        .unwrap();

        let snapshot = log.snapshot();
        assert!(ctx.is_verified(&snapshot[0]), "non-matching prefix must be claimed");
        assert!(ctx.is_verified(&snapshot[1]));
        assert!(snapshot[1].is_verified_in_order());
    }
}
