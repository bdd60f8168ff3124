//! Read bridge: one-shot cross-origin reads through injected scripts.
//!
//! # Request Lifecycle
//!
//! 1. Generate a unique [`CallbackName`]
//! 2. Register it in the bridge's [`CallbackRegistry`]
//! 3. Attach a script whose URL carries the params and `callback=<name>`
//! 4. Wait for the callback, bounded by the read timeout
//! 5. Release the registration and the element, exactly once
//!
//! Whichever of {callback, load error, timeout} arrives first settles the
//! request; the others find no registration and are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{CallbackName, ElementId};
use crate::protocol::{RequestParameters, ResponsePayload};
use crate::transport::{ScriptChannel, ScriptTag};

use super::config::BridgeConfig;
use super::registry::{CallbackRegistry, CallbackSink};
use super::state::RequestState;

// ============================================================================
// Constants
// ============================================================================

/// Query parameter naming the response callback.
pub const CALLBACK_KEY: &str = "callback";

// ============================================================================
// ReadBridge
// ============================================================================

/// Issues JSONP-style reads through a [`ScriptChannel`].
///
/// Concurrent calls are independent: each has its own callback name, timer
/// and script element. There is no ordering between them.
///
/// Clones share the same registry and channel.
#[derive(Clone)]
pub struct ReadBridge {
    config: Arc<BridgeConfig>,
    channel: Arc<dyn ScriptChannel>,
    registry: Arc<CallbackRegistry>,
}

impl ReadBridge {
    /// Creates a bridge over `channel`.
    #[must_use]
    pub fn new(config: BridgeConfig, channel: Arc<dyn ScriptChannel>) -> Self {
        Self {
            config: Arc::new(config),
            channel,
            registry: Arc::new(CallbackRegistry::default()),
        }
    }

    /// Returns the bridge configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the number of requests awaiting their callback.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if `callback` is still registered.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, callback: &CallbackName) -> bool {
        self.registry.contains(callback)
    }

    /// Issues a read and waits for the endpoint's payload.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `params` contains `callback`
    /// - [`Error::TransportLoad`] if the script cannot be attached or loaded
    /// - [`Error::ReadTimeout`] if the callback is not invoked in time
    pub async fn request(&self, params: RequestParameters) -> Result<ResponsePayload> {
        if params.contains_key(CALLBACK_KEY) {
            return Err(Error::invalid_argument(format!(
                "'{CALLBACK_KEY}' is reserved for the read bridge"
            )));
        }

        let callback = CallbackName::generate();
        let src = self.script_url(&params, &callback);

        // Registration precedes the transport call.
        let completion = self.registry.register(callback.clone());
        let mut pending = PendingRequest::new(
            callback.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.channel),
        );

        let sink = CallbackSink::new(callback.clone(), Arc::downgrade(&self.registry));
        let script = ScriptTag {
            src,
            callback: callback.clone(),
        };

        let element = match self.channel.attach(script, sink) {
            Ok(element) => element,
            Err(e) => {
                pending.settle(RequestState::Rejected);
                return Err(e);
            }
        };
        pending.issue(element.clone());

        debug!(%callback, action = params.get("action"), "Read request issued");

        let read_timeout = self.config.read_timeout;
        let outcome = match timeout(read_timeout, completion).await {
            Ok(Ok(Ok(payload))) => Ok(payload),
            Ok(Ok(Err(reason))) => Err(Error::transport_load(element, reason)),
            Ok(Err(e)) => Err(Error::from(e)),
            Err(_) => Err(Error::read_timeout(
                callback.clone(),
                self.config.read_timeout_ms(),
            )),
        };

        match &outcome {
            Ok(_) => pending.settle(RequestState::Resolved),
            Err(e) => {
                debug!(%callback, error = %e, "Read request failed");
                pending.settle(RequestState::Rejected);
            }
        }

        outcome
    }

    /// Builds `endpoint?<existing>&<params>&callback=<name>`.
    fn script_url(&self, params: &RequestParameters, callback: &CallbackName) -> Url {
        let mut url = self.config.endpoint.clone();
        params.append_to(&mut url);
        url.query_pairs_mut()
            .append_pair(CALLBACK_KEY, callback.as_str());
        url
    }
}

// ============================================================================
// PendingRequest
// ============================================================================

/// Resources held by one in-flight read.
///
/// Released exactly once: explicitly when the request settles, or on drop
/// if the caller abandons the future.
struct PendingRequest {
    callback: CallbackName,
    created: Instant,
    state: RequestState,
    element: Option<ElementId>,
    registry: Arc<CallbackRegistry>,
    channel: Arc<dyn ScriptChannel>,
    released: bool,
}

impl PendingRequest {
    fn new(
        callback: CallbackName,
        registry: Arc<CallbackRegistry>,
        channel: Arc<dyn ScriptChannel>,
    ) -> Self {
        Self {
            callback,
            created: Instant::now(),
            state: RequestState::Idle,
            element: None,
            registry,
            channel,
            released: false,
        }
    }

    /// Records the attached element and enters `Pending`.
    fn issue(&mut self, element: ElementId) {
        self.element = Some(element);
        self.transition(RequestState::Pending);
    }

    /// Enters a terminal state and releases resources.
    fn settle(&mut self, terminal: RequestState) {
        self.transition(terminal);
        self.release();
    }

    fn transition(&mut self, next: RequestState) {
        match self.state.advance(next) {
            Ok(state) => self.state = state,
            Err(e) => warn!(callback = %self.callback, error = %e, "Ignored transition"),
        }
    }

    /// Removes the registration and detaches the element. Idempotent.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.registry.remove(&self.callback);

        if let Some(element) = self.element.take()
            && let Err(e) = self.channel.detach(&element)
        {
            warn!(%element, error = %e, "Failed to detach script");
        }

        trace!(
            callback = %self.callback,
            state = %self.state,
            elapsed_ms = self.created.elapsed().as_millis() as u64,
            "Read request released"
        );
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if !self.released {
            debug!(callback = %self.callback, "Read request abandoned before completion");
            self.settle(RequestState::Rejected);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
