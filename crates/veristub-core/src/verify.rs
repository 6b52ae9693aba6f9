//! Batch verification driver.
//!
//! [`verify`] interprets one expectation against a snapshot of the
//! invocation log: it selects the relevant invocations through the finder,
//! feeds them to the mode's state machine, and — only when the whole check
//! succeeded — performs the single marking pass that consumes the counted
//! invocations (`verified`, plus the ordering context and
//! `verified_in_order` when one is supplied) and replays argument capture.
//! A failed verification leaves no marks and no captures.

use std::sync::Arc;

use crate::{
    error::VerificationError,
    finder,
    invocation::Invocation,
    mode::VerificationMode,
    order::InOrderContext,
    wanted::WantedInvocation,
};

/// Verify `wanted` against the log under the given mode.
///
/// With an [`InOrderContext`], invocations consumed by earlier ordered
/// verifications are out of scope and exact counts are validated against the
/// first contiguous matching run, so repeated groups verify in order.
pub fn verify(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    mode: VerificationMode,
    context: Option<&mut InOrderContext>,
) -> Result<(), VerificationError> {
    match context {
        None => verify_unordered(log, wanted, mode),
        Some(context) => verify_in_order(log, wanted, mode, context),
    }
}

fn verify_unordered(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    mode: VerificationMode,
) -> Result<(), VerificationError> {
    let mut state = mode.state(wanted.method_name().to_string());
    for invocation in log {
        if wanted.matches(invocation) {
            let _ = state.on_match(invocation)?;
        } else {
            state.on_mismatch(invocation)?;
        }
    }
    let matched = state.finish().map_err(|err| enrich_not_invoked(err, log, wanted, None))?;
    tracing::trace!(method = wanted.method_name(), matched = matched.len(), "verified");
    mark_success(&matched, wanted, None);
    Ok(())
}

fn verify_in_order(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    mode: VerificationMode,
    context: &mut InOrderContext,
) -> Result<(), VerificationError> {
    let mut state = mode.state(wanted.method_name().to_string());

    match mode {
        // The whole-log discipline is orthogonal to ordering.
        VerificationMode::Only => {
            for invocation in log {
                if wanted.matches(invocation) {
                    let _ = state.on_match(invocation)?;
                } else {
                    state.on_mismatch(invocation)?;
                }
            }
        },
        // Exact counts validate the first contiguous matching run.
        VerificationMode::Times(n) => {
            for invocation in finder::find_matching_chunk(log, wanted, n, context) {
                let _ = state
                    .on_match(&invocation)
                    .map_err(|err| enrich_not_invoked(err, log, wanted, Some(context)))?;
            }
        },
        VerificationMode::AtLeastAndAtMost { max, .. } => {
            for invocation in finder::find_matching_chunk(log, wanted, max, context) {
                let _ = state.on_match(&invocation)?;
            }
        },
        VerificationMode::AtLeast(_) | VerificationMode::AtMost(_) => {
            for invocation in finder::find_all_matching_unverified(log, wanted, context) {
                let _ = state
                    .on_match(&invocation)
                    .map_err(|err| enrich_not_invoked(err, log, wanted, Some(context)))?;
            }
        },
    }

    let matched = state
        .finish()
        .map_err(|err| enrich_not_invoked(err, log, wanted, Some(context)))?;
    tracing::trace!(method = wanted.method_name(), matched = matched.len(), "verified in order");
    mark_success(&matched, wanted, Some(context));
    Ok(())
}

/// Consume the counted invocations after an overall success.
///
/// Idempotent with respect to invocations already consumed by a prior
/// verification; flags are set-once and the context is a set.
pub(crate) fn mark_success(
    matched: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    mut context: Option<&mut InOrderContext>,
) {
    for invocation in matched {
        invocation.mark_verified();
        if let Some(context) = context.as_deref_mut() {
            context.mark_verified(invocation);
            invocation.mark_verified_in_order();
        }
        wanted.capture_arguments_from(invocation);
    }
}

/// Replace a zero-count "too few" verdict with the dedicated
/// wanted-but-not-invoked discrepancy, enriched with finder diagnostics.
pub(crate) fn enrich_not_invoked(
    err: VerificationError,
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    context: Option<&InOrderContext>,
) -> VerificationError {
    match (err, context) {
        (
            VerificationError::TooFewInvocations { method, actual_count: 0, .. }
            | VerificationError::WantedButNotInvoked { method, similar: None },
            None,
        ) => VerificationError::WantedButNotInvoked {
            method,
            similar: finder::find_similar(log, wanted).map(|inv| inv.location()),
        },
        (
            VerificationError::TooFewInvocations { method, actual_count: 0, .. }
            | VerificationError::WantedButNotInvoked { method, similar: None },
            Some(context),
        ) => VerificationError::WantedButNotInvokedInOrder {
            method,
            // The latest claim may live in another stand-in's log.
            after: finder::find_previous_verified_in_order(log, context)
                .map(|inv| inv.location())
                .or_else(|| context.last_claimed_location()),
        },
        (other, _) => other,
    }
}
