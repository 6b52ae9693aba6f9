//! Per-stand-in invocation log.
//!
//! The log is the one structure intentionally shared across threads:
//! producer threads append through [`InvocationLog::record`], the verifying
//! thread reads snapshots. Entries are never removed and never reordered;
//! consumers only ever flip the two set-once flags on the invocations
//! themselves.
//!
//! Time-bounded verification needs to observe invocations that arrive while
//! it runs. [`InvocationLog::subscribe`] installs a channel-backed listener
//! *and* snapshots the existing contents under one lock acquisition, so an
//! invocation racing the subscription is seen exactly once: either it was
//! appended before the snapshot, or the listener delivers it. The returned
//! guard removes the listener on drop, covering every exit path.

use std::sync::{Arc, Mutex, mpsc};

use crate::invocation::Invocation;

/// Observer of newly recorded invocations.
///
/// Delivery happens synchronously inside [`InvocationLog::record`] with the
/// log lock held, before the recording call returns to the interception
/// layer. Implementations must not call back into the log.
pub trait InvocationListener: Send + Sync {
    /// Called once per newly recorded invocation.
    fn invocation_reported(&self, invocation: &Arc<Invocation>);
}

struct LogInner {
    invocations: Vec<Arc<Invocation>>,
    listeners: Vec<(u64, Arc<dyn InvocationListener>)>,
    next_listener_id: u64,
}

/// Append-only, thread-shared log of one stand-in's invocations.
pub struct InvocationLog {
    inner: Mutex<LogInner>,
}

impl std::fmt::Debug for InvocationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = crate::lock(&self.inner);
        f.debug_struct("InvocationLog")
            .field("invocations", &inner.invocations.len())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Default for InvocationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LogInner {
                invocations: Vec::new(),
                listeners: Vec::new(),
                next_listener_id: 0,
            }),
        }
    }

    /// Append an invocation and deliver it to every installed listener
    /// before returning.
    ///
    /// Delivery happens while the log lock is held, so every listener
    /// observes invocations in append order even with racing producers.
    /// Listeners must not call back into the log.
    pub fn record(&self, invocation: Arc<Invocation>) {
        let mut inner = crate::lock(&self.inner);
        inner.invocations.push(Arc::clone(&invocation));
        for (_, listener) in &inner.listeners {
            listener.invocation_reported(&invocation);
        }
    }

    /// Ordered snapshot of all recorded invocations.
    pub fn snapshot(&self) -> Vec<Arc<Invocation>> {
        crate::lock(&self.inner).invocations.clone()
    }

    /// Number of recorded invocations.
    pub fn len(&self) -> usize {
        crate::lock(&self.inner).invocations.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install a listener. Prefer [`InvocationLog::subscribe`] unless the
    /// caller manages snapshot consistency itself.
    pub fn install_listener(&self, listener: Arc<dyn InvocationListener>) -> ListenerGuard<'_> {
        let id = {
            let mut inner = crate::lock(&self.inner);
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push((id, listener));
            id
        };
        tracing::debug!(listener = id, "invocation listener installed");
        ListenerGuard { log: self, id }
    }

    /// Atomically snapshot the log and install a channel-backed listener.
    ///
    /// Returns the snapshot, the receiving end of the channel, and the RAII
    /// guard that uninstalls the listener when dropped.
    pub fn subscribe(
        &self,
    ) -> (Vec<Arc<Invocation>>, mpsc::Receiver<Arc<Invocation>>, ListenerGuard<'_>) {
        let (tx, rx) = mpsc::channel();
        let (snapshot, id) = {
            let mut inner = crate::lock(&self.inner);
            let snapshot = inner.invocations.clone();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push((id, Arc::new(ChannelListener { tx })));
            (snapshot, id)
        };
        tracing::debug!(listener = id, seen = snapshot.len(), "subscribed to invocation log");
        (snapshot, rx, ListenerGuard { log: self, id })
    }
}

/// Removes its listener from the owning log on drop.
pub struct ListenerGuard<'log> {
    log: &'log InvocationLog,
    id: u64,
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        crate::lock(&self.log.inner).listeners.retain(|(id, _)| *id != self.id);
        tracing::debug!(listener = self.id, "invocation listener removed");
    }
}

struct ChannelListener {
    tx: mpsc::Sender<Arc<Invocation>>,
}

impl InvocationListener for ChannelListener {
    fn invocation_reported(&self, invocation: &Arc<Invocation>) {
        // The receiver may already be gone; a dead subscriber is not the
        // producer's problem.
        let _ = self.tx.send(Arc::clone(invocation));
    }
}
