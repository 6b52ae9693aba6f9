//! Query algorithms over the invocation log.
//!
//! Every function here is a pure, order-preserving read: input slices come
//! from [`crate::log::InvocationLog::snapshot`], results keep the original
//! sequence order, and nothing mutates the `verified` flags. Marking is a
//! separate explicit step performed by the verification driver after a
//! successful check, so a failed verification never leaves partial marks.

use std::sync::Arc;

use crate::{
    invocation::{Invocation, Location},
    order::InOrderContext,
    wanted::WantedInvocation,
};

/// All invocations matching `wanted`, in original order.
pub fn find_matching(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
) -> Vec<Arc<Invocation>> {
    log.iter().filter(|inv| wanted.matches(inv)).cloned().collect()
}

/// The suffix of the log strictly after the ordering chain's latest claim.
///
/// The context tracks claims by global sequence number, so a claim made
/// while verifying another stand-in's log still truncates this one: an
/// ordered verification may only look at what comes after the whole
/// consumed history, wherever it was recorded.
pub fn unconsumed_suffix(
    log: &[Arc<Invocation>],
    context: &InOrderContext,
) -> Vec<Arc<Invocation>> {
    log.iter().filter(|inv| !context.is_consumed_or_earlier(inv)).cloned().collect()
}

/// All matching invocations the context has not yet consumed.
pub fn find_all_matching_unverified(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    context: &InOrderContext,
) -> Vec<Arc<Invocation>> {
    unconsumed_suffix(log, context)
        .into_iter()
        .filter(|inv| wanted.matches(inv))
        .collect()
}

/// The chunk an ordered exact-count verification should validate.
///
/// First the contiguous run of matching invocations at the front of the
/// unconsumed suffix. If that run's length differs from `wanted_count`, fall
/// back to all matching unconsumed invocations, so the caller's count
/// comparison reports the real total.
pub fn find_matching_chunk(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    wanted_count: usize,
    context: &InOrderContext,
) -> Vec<Arc<Invocation>> {
    let suffix = unconsumed_suffix(log, context);
    let first_chunk = first_matching_run(&suffix, wanted);
    if first_chunk.len() == wanted_count {
        first_chunk
    } else {
        suffix.into_iter().filter(|inv| wanted.matches(inv)).collect()
    }
}

fn first_matching_run(
    suffix: &[Arc<Invocation>],
    wanted: &WantedInvocation,
) -> Vec<Arc<Invocation>> {
    let mut run = Vec::new();
    for invocation in suffix {
        if wanted.matches(invocation) {
            run.push(Arc::clone(invocation));
        } else if !run.is_empty() {
            break;
        }
    }
    run
}

/// The next matching invocation the context has not consumed.
pub fn find_first_matching_unverified(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
    context: &InOrderContext,
) -> Option<Arc<Invocation>> {
    unconsumed_suffix(log, context).into_iter().find(|inv| wanted.matches(inv))
}

/// Best-effort diagnostic: an invocation of the same method whose arguments
/// differ. Prefers an exact method-identity hit over a same-name one.
pub fn find_similar(
    log: &[Arc<Invocation>],
    wanted: &WantedInvocation,
) -> Option<Arc<Invocation>> {
    let mut first_similar = None;
    for invocation in log {
        if !wanted.has_similar_method(invocation) {
            continue;
        }
        if wanted.has_same_method(invocation) {
            return Some(Arc::clone(invocation));
        }
        if first_similar.is_none() {
            first_similar = Some(Arc::clone(invocation));
        }
    }
    first_similar
}

/// The first invocation no non-ordered verification has consumed yet.
pub fn find_first_unverified(log: &[Arc<Invocation>]) -> Option<Arc<Invocation>> {
    log.iter().find(|inv| !inv.is_verified()).cloned()
}

/// The most recent invocation the ordering context already consumed, used
/// for "wanted anywhere after X" error context.
pub fn find_previous_verified_in_order(
    log: &[Arc<Invocation>],
    context: &InOrderContext,
) -> Option<Arc<Invocation>> {
    log.iter().rev().find(|inv| context.is_verified(inv)).cloned()
}

/// Capture site of the last invocation in a list.
pub fn last_location(invocations: &[Arc<Invocation>]) -> Option<Location> {
    invocations.last().map(|inv| inv.location())
}
