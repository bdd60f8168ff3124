//! Callback registry for in-flight read requests.
//!
//! Each [`ReadBridge`](super::ReadBridge) owns one registry mapping callback
//! names to completion channels. Entries are inserted when a request is
//! issued and removed by whichever completion arrives first; a second
//! completion for the same name finds nothing and is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::sync::Weak;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::identifiers::CallbackName;
use crate::protocol::ResponsePayload;

// ============================================================================
// Types
// ============================================================================

/// Result delivered through a registration: payload or load-failure reason.
pub(crate) type Outcome = StdResult<ResponsePayload, String>;

/// Map of callback names to completion channels.
type CallbackMap = FxHashMap<CallbackName, oneshot::Sender<Outcome>>;

// ============================================================================
// CallbackRegistry
// ============================================================================

/// Bridge-owned replacement for a global callback namespace.
#[derive(Default)]
pub(crate) struct CallbackRegistry {
    callbacks: Mutex<CallbackMap>,
}

impl CallbackRegistry {
    /// Registers `callback` and returns the receiving half of its completion.
    pub(crate) fn register(&self, callback: CallbackName) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();

        let replaced = self.callbacks.lock().insert(callback.clone(), tx);
        if replaced.is_some() {
            warn!(%callback, "Callback name reused; previous request orphaned");
        }

        rx
    }

    /// Completes `callback` with `outcome`.
    ///
    /// Returns `false` if the name is not registered (already settled or
    /// never issued).
    pub(crate) fn complete(&self, callback: &CallbackName, outcome: Outcome) -> bool {
        let tx = self.callbacks.lock().remove(callback);

        match tx {
            Some(tx) => {
                // Receiver may be gone if the caller dropped the request
                // between removal and send.
                let delivered = tx.send(outcome).is_ok();
                trace!(%callback, delivered, "Callback completed");
                delivered
            }
            None => {
                warn!(%callback, "Callback invoked for unknown or settled request");
                false
            }
        }
    }

    /// Removes `callback` without completing it. Idempotent.
    pub(crate) fn remove(&self, callback: &CallbackName) -> bool {
        self.callbacks.lock().remove(callback).is_some()
    }

    /// Returns `true` if `callback` is registered.
    pub(crate) fn contains(&self, callback: &CallbackName) -> bool {
        self.callbacks.lock().contains_key(callback)
    }

    /// Returns the number of registered callbacks.
    pub(crate) fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

// ============================================================================
// CallbackSink
// ============================================================================

/// Handle through which a script channel re-enters the bridge.
///
/// This plays the part of the named global function the remote script
/// calls. Holding a sink does not keep the bridge alive.
#[derive(Debug, Clone)]
pub struct CallbackSink {
    callback: CallbackName,
    registry: Weak<CallbackRegistry>,
}

impl CallbackSink {
    pub(crate) fn new(callback: CallbackName, registry: Weak<CallbackRegistry>) -> Self {
        Self { callback, registry }
    }

    /// Returns the callback name this sink answers to.
    #[inline]
    #[must_use]
    pub fn callback(&self) -> &CallbackName {
        &self.callback
    }

    /// Invokes the callback with the endpoint's payload.
    ///
    /// Returns `false` when the request has already settled; late
    /// invocations are ignored.
    pub fn invoke(&self, payload: ResponsePayload) -> bool {
        self.deliver(Ok(payload))
    }

    /// Reports that the transport element could not be loaded.
    ///
    /// Returns `false` when the request has already settled.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.deliver(Err(reason.into()))
    }

    /// Returns `true` while the request is still waiting for completion.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(&self.callback))
    }

    fn deliver(&self, outcome: Outcome) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.complete(&self.callback, outcome),
            None => {
                trace!(callback = %self.callback, "Bridge dropped before completion");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;

    fn sink_for(registry: &Arc<CallbackRegistry>, name: &str) -> CallbackSink {
        CallbackSink::new(CallbackName::from(name), Arc::downgrade(registry))
    }

    #[tokio::test]
    async fn test_invoke_delivers_payload() {
        let registry = Arc::new(CallbackRegistry::default());
        let rx = registry.register(CallbackName::from("cb"));
        let sink = sink_for(&registry, "cb");

        assert!(sink.is_pending());
        assert!(sink.invoke(ResponsePayload::new(json!({"ok": 1}))));

        let outcome = rx.await.expect("delivered");
        assert_eq!(outcome, Ok(ResponsePayload::new(json!({"ok": 1}))));
        assert_eq!(registry.len(), 0);
        assert!(!sink.is_pending());
    }

    #[tokio::test]
    async fn test_first_completion_wins() {
        let registry = Arc::new(CallbackRegistry::default());
        let rx = registry.register(CallbackName::from("cb"));
        let sink = sink_for(&registry, "cb");

        assert!(sink.fail("404"));
        assert!(!sink.invoke(ResponsePayload::new(json!(null))));

        assert_eq!(rx.await.expect("delivered"), Err("404".to_string()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = CallbackRegistry::default();
        let name = CallbackName::from("cb");
        let _rx = registry.register(name.clone());

        assert!(registry.remove(&name));
        assert!(!registry.remove(&name));
        assert!(!registry.contains(&name));
    }

    #[test]
    fn test_sink_after_registry_dropped() {
        let registry = Arc::new(CallbackRegistry::default());
        let _rx = registry.register(CallbackName::from("cb"));
        let sink = sink_for(&registry, "cb");
        drop(registry);

        assert!(!sink.invoke(ResponsePayload::new(json!(1))));
        assert!(!sink.is_pending());
    }
}
