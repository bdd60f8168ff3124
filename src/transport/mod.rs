//! Transport channels carrying bridge requests to the endpoint.
//!
//! The bridges own timeouts, cleanup and the request state machine. Channels
//! only attach and detach transport elements, which keeps the bridge logic
//! independent of the environment.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ScriptTag + CallbackSink   ┌───────────────┐
//! │  ReadBridge  │ ──────────────────────────► │ ScriptChannel │ ──GET──►  endpoint
//! │              │ ◄──── sink.invoke/fail ──── │               │ ◄─ cb(json)
//! └──────────────┘                             └───────────────┘
//! ┌──────────────┐  HiddenFrame + HiddenForm   ┌───────────────┐
//! │ WriteBridge  │ ──────────────────────────► │ FrameChannel  │ ──POST─►  endpoint
//! │              │ ◄──────── LoadSignal ────── │               │ (body unreadable)
//! └──────────────┘                             └───────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | Native emulation over `reqwest` |
//! | `jsonp` | Parsing `callback(json)` script bodies |
//! | `memory` | In-memory document with a stub endpoint |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use tokio::sync::oneshot;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{CallbackName, ElementId, FrameName};
use crate::protocol::RequestParameters;

// ============================================================================
// Submodules
// ============================================================================

/// Native channels over HTTP.
pub mod http;

/// JSONP script body parsing.
pub mod jsonp;

/// In-memory document for tests and demos.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use crate::bridge::CallbackSink;
pub use http::{HttpFrameChannel, HttpScriptChannel};
pub use memory::{FrameReply, MemoryDocument, ScriptReply, StubRequest};

// ============================================================================
// Channel Traits
// ============================================================================

/// Attaches script elements whose load re-enters the bridge by name.
pub trait ScriptChannel: Send + Sync {
    /// Attaches `script`.
    ///
    /// The remote side completes the request through `sink`: by invoking it
    /// with a payload, or by reporting a load failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportLoad`] if the element cannot be attached.
    fn attach(&self, script: ScriptTag, sink: CallbackSink) -> Result<ElementId>;

    /// Removes an attached element. Removing an absent element is a no-op.
    fn detach(&self, element: &ElementId) -> Result<()>;
}

/// Attaches hidden frames and forms for optimistic writes.
pub trait FrameChannel: Send + Sync {
    /// Attaches `frame` and returns a signal that fires when it loads.
    fn attach_frame(&self, frame: &HiddenFrame) -> Result<(ElementId, LoadSignal)>;

    /// Attaches `form`, which targets an already attached frame.
    fn attach_form(&self, form: &HiddenForm) -> Result<ElementId>;

    /// Submits an attached form into its target frame.
    fn submit(&self, form: &ElementId) -> Result<()>;

    /// Removes an attached frame or form.
    ///
    /// # Errors
    ///
    /// May fail if the element cannot be removed; the write bridge reports
    /// this as [`Error::Processing`].
    fn detach(&self, element: &ElementId) -> Result<()>;
}

// ============================================================================
// ScriptTag
// ============================================================================

/// A script element to inject for one read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    /// Fully built URL, including the `callback` parameter.
    pub src: Url,

    /// Callback the loaded script is expected to invoke.
    pub callback: CallbackName,
}

// ============================================================================
// HiddenFrame / HiddenForm
// ============================================================================

/// A hidden frame that receives one form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenFrame {
    /// Frame name, used as the form target.
    pub name: FrameName,
}

impl HiddenFrame {
    /// Creates a frame with the given name.
    #[inline]
    #[must_use]
    pub fn new(name: FrameName) -> Self {
        Self { name }
    }
}

/// A hidden POST form with one hidden input per parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenForm {
    /// Name of the frame the form submits into.
    pub target: FrameName,

    /// Endpoint URL the form posts to.
    pub action: Url,

    /// Hidden input fields, in order.
    pub fields: RequestParameters,
}

impl HiddenForm {
    /// HTTP method used by every hidden form.
    pub const METHOD: &'static str = "POST";

    /// Creates a form posting `fields` to `action` inside `target`.
    #[inline]
    #[must_use]
    pub fn new(target: FrameName, action: Url, fields: RequestParameters) -> Self {
        Self {
            target,
            action,
            fields,
        }
    }
}

// ============================================================================
// LoadSignal
// ============================================================================

/// Creates a connected frame-load notifier and signal.
#[must_use]
pub fn load_signal() -> (LoadNotifier, LoadSignal) {
    let (tx, rx) = oneshot::channel();
    (LoadNotifier(tx), LoadSignal(rx))
}

/// Channel-side half: reports the frame's load event.
#[derive(Debug)]
pub struct LoadNotifier(oneshot::Sender<StdResult<(), String>>);

impl LoadNotifier {
    /// Reports that the frame finished loading.
    pub fn loaded(self) {
        let _ = self.0.send(Ok(()));
    }

    /// Reports that the frame could not load.
    pub fn failed(self, reason: impl Into<String>) {
        let _ = self.0.send(Err(reason.into()));
    }
}

/// Bridge-side half: resolves when the frame loads.
#[derive(Debug)]
pub struct LoadSignal(oneshot::Receiver<StdResult<(), String>>);

impl LoadSignal {
    /// Waits for the load event of `frame`. There is no timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportLoad`] if the channel reported a failure
    /// or discarded the notifier.
    pub async fn wait(self, frame: &ElementId) -> Result<()> {
        match self.0.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(Error::transport_load(frame.clone(), reason)),
            Err(_) => Err(Error::transport_load(
                frame.clone(),
                "frame discarded before loading",
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_signal_loaded() {
        let (notifier, signal) = load_signal();
        notifier.loaded();
        assert!(signal.wait(&ElementId::from("f")).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_signal_failed() {
        let (notifier, signal) = load_signal();
        notifier.failed("connection refused");

        let err = signal.wait(&ElementId::from("f")).await.unwrap_err();
        assert!(err.is_transport_error());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_load_signal_discarded() {
        let (notifier, signal) = load_signal();
        drop(notifier);
        assert!(signal.wait(&ElementId::from("f")).await.is_err());
    }

    #[test]
    fn test_hidden_form_method() {
        assert_eq!(HiddenForm::METHOD, "POST");
    }
}
