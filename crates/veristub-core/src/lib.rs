//! Verification and matching engine for recorded test-double invocations.
//!
//! This crate is the decision core of a mocking framework: given the ordered
//! history of calls made on stand-in objects, it decides whether an
//! expectation holds. It owns matcher composition ([`MatcherStack`],
//! [`Session`]), argument matching across fixed and variable arity
//! ([`WantedInvocation`]), the query algorithms over the log
//! ([`finder`]), the count-based verification modes
//! ([`VerificationMode`]), cross-stand-in ordering ([`InOrderContext`]) and
//! deadline-bounded concurrent verification ([`verify_within`]).
//!
//! Producing the stand-ins, intercepting their calls, and rendering failure
//! prose are all out of scope: the interception layer feeds
//! [`InvocationLog`]s and installs listeners through the narrow contracts in
//! [`log`], and the structured discrepancies in [`error`] carry what a
//! reporting layer needs.

pub mod arg;
pub mod error;
pub mod finder;
pub mod invocation;
pub mod log;
pub mod matcher;
pub mod mode;
pub mod order;
pub mod session;
pub mod stack;
pub mod verify;
pub mod wanted;
pub mod within;

pub use arg::ArgValue;
pub use error::{UsageError, VerificationError};
pub use invocation::{Invocation, Location, MethodId, MockId, SequenceClock};
pub use log::{InvocationListener, InvocationLog, ListenerGuard};
pub use matcher::{CaptureHandle, Matcher};
pub use mode::VerificationMode;
pub use order::InOrderContext;
pub use session::Session;
pub use stack::MatcherStack;
pub use verify::verify;
pub use wanted::{MatchOutcome, WantedInvocation, apply_matchers, type_safe_apply};
pub use within::verify_within;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data on poisoning.
///
/// The structures guarded here (capture lists, the invocation log) stay
/// consistent under any interleaving of their individual operations, so a
/// panicked writer cannot leave them half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
