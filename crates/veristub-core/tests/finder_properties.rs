//! Property-based tests for the log query algorithms and matcher algebra.
//!
//! Tests verify that the pure finder functions behave as order-preserving
//! filters under arbitrary logs, and that the matcher combinators fold the
//! way boolean algebra says they should.

use std::sync::Arc;

use proptest::prelude::*;
use veristub_core::{
    ArgValue, InOrderContext, Invocation, Location, Matcher, MethodId, MockId, WantedInvocation,
    finder,
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

fn log_strategy() -> impl Strategy<Value = Vec<Arc<Invocation>>> {
    prop::collection::vec(0i32..4, 0..24).prop_map(|args| {
        args.into_iter()
            .enumerate()
            .map(|(i, arg)| call(arg, i as u64 + 1))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_find_matching_is_an_order_preserving_subset(log in log_strategy(), target in 0i32..4) {
        let found = finder::find_matching(&log, &wanted(target));

        let expected: Vec<u64> = log
            .iter()
            .filter(|inv| inv.args()[0] == ArgValue::of(target))
            .map(|inv| inv.seq())
            .collect();
        let seqs: Vec<u64> = found.iter().map(|inv| inv.seq()).collect();
        prop_assert_eq!(seqs, expected);
    }

    #[test]
    fn prop_finders_never_mutate_the_log(log in log_strategy(), target in 0i32..4) {
        let ctx = InOrderContext::new();
        let w = wanted(target);
        let _ = finder::find_matching(&log, &w);
        let _ = finder::find_all_matching_unverified(&log, &w, &ctx);
        let _ = finder::find_matching_chunk(&log, &w, 2, &ctx);
        let _ = finder::find_similar(&log, &w);

        prop_assert!(log.iter().all(|inv| !inv.is_verified()));
        prop_assert!(log.iter().all(|inv| !inv.is_verified_in_order()));
        prop_assert_eq!(ctx.claimed(), 0);
    }

    #[test]
    fn prop_unconsumed_suffix_follows_the_last_claim(
        log in log_strategy(),
        claim_upto in 0usize..24,
    ) {
        let mut ctx = InOrderContext::new();
        let claimed = claim_upto.min(log.len());
        for invocation in &log[..claimed] {
            ctx.mark_verified(invocation);
        }

        let suffix = finder::unconsumed_suffix(&log, &ctx);
        let expected: Vec<u64> = log[claimed..].iter().map(|inv| inv.seq()).collect();
        let seqs: Vec<u64> = suffix.iter().map(|inv| inv.seq()).collect();
        prop_assert_eq!(seqs, expected);
    }

    #[test]
    fn prop_chunk_is_the_first_run_or_every_match(
        log in log_strategy(),
        target in 0i32..4,
        count in 0usize..8,
    ) {
        let ctx = InOrderContext::new();
        let w = wanted(target);
        let chunk = finder::find_matching_chunk(&log, &w, count, &ctx);
        let all = finder::find_matching(&log, &w);

        // Every chunk element matches and appears in log order.
        prop_assert!(chunk.iter().all(|inv| w.matches(inv)));
        prop_assert!(chunk.windows(2).all(|pair| pair[0].seq() < pair[1].seq()));

        // Either the contiguous first run of exactly `count`, or the full set.
        if chunk.len() != count {
            let chunk_seqs: Vec<u64> = chunk.iter().map(|inv| inv.seq()).collect();
            let all_seqs: Vec<u64> = all.iter().map(|inv| inv.seq()).collect();
            prop_assert_eq!(chunk_seqs, all_seqs);
        }
    }

    #[test]
    fn prop_marking_is_idempotent(log in log_strategy()) {
        for invocation in &log {
            invocation.mark_verified();
            invocation.mark_verified();
            prop_assert!(invocation.is_verified());
        }
    }

    #[test]
    fn prop_combinators_fold_like_boolean_algebra(
        value in 0i32..10,
        left in 0i32..10,
        right in 0i32..10,
    ) {
        let arg = ArgValue::of(value);
        let l = Matcher::eq(left);
        let r = Matcher::eq(right);

        let and = Matcher::and(l.clone(), r.clone());
        let or = Matcher::or(l.clone(), r.clone());
        let not = Matcher::negate(l.clone());

        prop_assert_eq!(and.matches(&arg), l.matches(&arg) && r.matches(&arg));
        prop_assert_eq!(or.matches(&arg), l.matches(&arg) || r.matches(&arg));
        prop_assert_eq!(not.matches(&arg), !l.matches(&arg));
    }

    #[test]
    fn prop_first_matching_unverified_is_the_head_of_the_filtered_suffix(
        log in log_strategy(),
        target in 0i32..4,
        claim_upto in 0usize..24,
    ) {
        let mut ctx = InOrderContext::new();
        let claimed = claim_upto.min(log.len());
        for invocation in &log[..claimed] {
            ctx.mark_verified(invocation);
        }

        let w = wanted(target);
        let first = finder::find_first_matching_unverified(&log, &w, &ctx);
        let all = finder::find_all_matching_unverified(&log, &w, &ctx);
        prop_assert_eq!(
            first.map(|inv| inv.seq()),
            all.first().map(|inv| inv.seq())
        );
    }
}
