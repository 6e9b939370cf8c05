//! Process-wide type registry.
//!
//! Readers load the current snapshot without locking; a schema rebuild swaps
//! in a whole new map. The graph becomes ready once per preload and signals
//! subscribers on every change.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use crossbeam::channel::{Receiver, Sender, unbounded};
use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};

use super::Type;

/// Types exported by a schema module, in declaration order.
pub type SchemaEnv = IndexMap<String, Arc<Type>>;

/// Broadcast after the registry changes. Carries no payload: re-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaEvent {
    Changed,
    Ready,
}

pub struct TypeGraph {
    types: ArcSwap<SchemaEnv>,
    revision: AtomicU64,
    ready: Mutex<bool>,
    ready_signal: Condvar,
    subscribers: Mutex<Vec<Sender<SchemaEvent>>>,
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeGraph {
    pub fn new() -> Self {
        Self {
            types: ArcSwap::from_pointee(SchemaEnv::new()),
            revision: AtomicU64::new(0),
            ready: Mutex::new(false),
            ready_signal: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Type>> {
        self.types.load().get(name).cloned()
    }

    /// Current registry contents.
    pub fn snapshot(&self) -> Arc<SchemaEnv> {
        self.types.load_full()
    }

    pub fn names(&self) -> Vec<String> {
        self.types.load().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.types.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.load().is_empty()
    }

    /// Number of rebuilds so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Replace every type at once.
    pub fn replace(&self, env: SchemaEnv) {
        self.types.store(Arc::new(env));
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.replace(SchemaEnv::new());
    }

    // ========================================================================
    // Readiness
    // ========================================================================

    pub fn mark_ready(&self) {
        *self.ready.lock() = true;
        self.ready_signal.notify_all();
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    /// Forget readiness (full reset only).
    pub fn unmark_ready(&self) {
        *self.ready.lock() = false;
    }

    /// Block until ready or `timeout` elapses. Returns readiness.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ready = self.ready.lock();
        while !*ready {
            if self.ready_signal.wait_until(&mut ready, deadline).timed_out() {
                return *ready;
            }
        }
        true
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn subscribe(&self) -> Receiver<SchemaEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send `event` to every live subscriber, dropping closed ones.
    pub fn notify(&self, event: SchemaEvent) {
        self.subscribers.lock().retain(|tx| tx.send(event).is_ok());
    }
}

impl fmt::Debug for TypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeGraph")
            .field("types", &self.names())
            .field("revision", &self.revision())
            .field("ready", &self.is_ready())
            .finish()
    }
}
