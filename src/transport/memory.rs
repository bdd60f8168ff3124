//! In-memory document with a stub endpoint.
//!
//! [`MemoryDocument`] implements both channel traits without any network.
//! A stub closure decides how the "remote side" reacts to each script or
//! form, and the document records what was attached and detached so tests
//! can check for leaks.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use checkin_bridge::transport::{MemoryDocument, ScriptReply};
//! use serde_json::json;
//!
//! let document = Arc::new(MemoryDocument::new().with_script_stub(|request| {
//!     match request.params.get("action") {
//!         Some("getStats") => ScriptReply::Invoke(json!({"success": true, "data": {"total": 1}})),
//!         _ => ScriptReply::Silent,
//!     }
//! }));
//! # let _ = document;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ElementId, FrameName};
use crate::protocol::{RequestParameters, ResponsePayload};

use super::{
    CallbackSink, FrameChannel, HiddenForm, HiddenFrame, LoadNotifier, LoadSignal, ScriptChannel,
    ScriptTag, load_signal,
};

// ============================================================================
// Types
// ============================================================================

/// Stub deciding the remote reaction to a script.
type ScriptStub = Box<dyn Fn(&StubRequest) -> ScriptReply + Send + Sync>;

/// Stub deciding the remote reaction to a form submission.
type FrameStub = Box<dyn Fn(&StubRequest) -> FrameReply + Send + Sync>;

// ============================================================================
// Stub Types
// ============================================================================

/// What the stub endpoint sees for one script load or form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubRequest {
    /// Element carrying the request.
    pub element: ElementId,

    /// Script `src` or form `action`.
    pub url: Url,

    /// Query parameters (script) or form fields (form).
    pub params: RequestParameters,
}

/// How the stub endpoint answers a script load.
#[derive(Debug, Clone)]
pub enum ScriptReply {
    /// Invoke the callback with this payload as soon as the script loads.
    Invoke(Value),
    /// Invoke the callback after a delay.
    InvokeAfter(Duration, Value),
    /// Fail to load the script.
    LoadError(String),
    /// Load a script that never invokes the callback.
    Silent,
}

/// How the stub endpoint answers a form submission.
#[derive(Debug, Clone)]
pub enum FrameReply {
    /// Frame loads right away.
    Load,
    /// Frame loads after a delay.
    LoadAfter(Duration),
    /// Frame fails to load.
    Fail(String),
    /// Frame never loads.
    Stall,
}

// ============================================================================
// Document State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Script,
    Frame,
    Form,
}

#[derive(Default)]
struct DocumentState {
    /// Elements currently in the document.
    attached: FxHashMap<ElementId, ElementKind>,
    /// Every detach call, present or not.
    detach_calls: FxHashMap<ElementId, usize>,
    /// Scripts loaded, in order.
    scripts: Vec<StubRequest>,
    /// Forms submitted, in order.
    submissions: Vec<StubRequest>,
    /// Load notifiers of frames that have not loaded yet.
    frames: FxHashMap<FrameName, LoadNotifier>,
    /// Attached forms.
    forms: FxHashMap<ElementId, HiddenForm>,
    /// Callback invocations that arrived after the request settled.
    late_invocations: usize,
    /// Refuse to attach scripts.
    refuse_scripts: bool,
    /// Make form removal fail.
    fail_form_removal: bool,
}

// ============================================================================
// MemoryDocument
// ============================================================================

/// Fake document implementing [`ScriptChannel`] and [`FrameChannel`].
///
/// Scripts default to [`ScriptReply::Silent`], frames to [`FrameReply::Load`].
pub struct MemoryDocument {
    state: Arc<Mutex<DocumentState>>,
    script_stub: ScriptStub,
    frame_stub: FrameStub,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryDocument - Constructor
// ============================================================================

impl MemoryDocument {
    /// Creates an empty document with default stubs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DocumentState::default())),
            script_stub: Box::new(|_| ScriptReply::Silent),
            frame_stub: Box::new(|_| FrameReply::Load),
        }
    }

    /// Sets the stub answering script loads.
    #[must_use]
    pub fn with_script_stub<F>(mut self, stub: F) -> Self
    where
        F: Fn(&StubRequest) -> ScriptReply + Send + Sync + 'static,
    {
        self.script_stub = Box::new(stub);
        self
    }

    /// Sets the stub answering form submissions.
    #[must_use]
    pub fn with_frame_stub<F>(mut self, stub: F) -> Self
    where
        F: Fn(&StubRequest) -> FrameReply + Send + Sync + 'static,
    {
        self.frame_stub = Box::new(stub);
        self
    }

    /// Makes every script attach fail.
    #[must_use]
    pub fn refusing_scripts(self) -> Self {
        self.state.lock().refuse_scripts = true;
        self
    }

    /// Makes every form removal fail.
    #[must_use]
    pub fn failing_form_removal(self) -> Self {
        self.state.lock().fail_form_removal = true;
        self
    }
}

// ============================================================================
// MemoryDocument - Inspection
// ============================================================================

impl MemoryDocument {
    /// Returns `true` if `element` is in the document.
    #[must_use]
    pub fn is_attached(&self, element: &ElementId) -> bool {
        self.state.lock().attached.contains_key(element)
    }

    /// Returns the number of elements in the document.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.state.lock().attached.len()
    }

    /// Returns how many times `element` was detached.
    #[must_use]
    pub fn detach_count(&self, element: &ElementId) -> usize {
        self.state
            .lock()
            .detach_calls
            .get(element)
            .copied()
            .unwrap_or_default()
    }

    /// Returns every script loaded so far.
    #[must_use]
    pub fn scripts(&self) -> Vec<StubRequest> {
        self.state.lock().scripts.clone()
    }

    /// Returns every form submitted so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<StubRequest> {
        self.state.lock().submissions.clone()
    }

    /// Returns how many callback invocations arrived too late.
    #[must_use]
    pub fn late_invocations(&self) -> usize {
        self.state.lock().late_invocations
    }
}

// ============================================================================
// MemoryDocument - Internals
// ============================================================================

impl MemoryDocument {
    fn remove_element(&self, element: &ElementId) -> Result<()> {
        let mut state = self.state.lock();
        *state.detach_calls.entry(element.clone()).or_default() += 1;

        let kind = state.attached.get(element).copied();
        match kind {
            Some(ElementKind::Form) if state.fail_form_removal => {
                return Err(Error::processing(format!("cannot remove form {element}")));
            }
            Some(ElementKind::Form) => {
                state.forms.remove(element);
            }
            Some(ElementKind::Frame) => {
                state.frames.remove(&FrameName::from(element.as_str()));
            }
            Some(ElementKind::Script) | None => {}
        }

        let removed = state.attached.remove(element).is_some();
        trace!(%element, removed, "Element detached");
        Ok(())
    }

    /// Runs `sink` on the runtime, like a script executing after load.
    fn spawn_invoke(&self, sink: CallbackSink, delay: Option<Duration>, payload: Value) {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if !sink.invoke(ResponsePayload::new(payload)) {
                state.lock().late_invocations += 1;
            }
        });
    }
}

// ============================================================================
// ScriptChannel
// ============================================================================

impl ScriptChannel for MemoryDocument {
    fn attach(&self, script: ScriptTag, sink: CallbackSink) -> Result<ElementId> {
        let element = ElementId::from(&script.callback);

        let request = {
            let mut state = self.state.lock();
            if state.refuse_scripts {
                return Err(Error::transport_load(element, "document refused script"));
            }

            let params = script.src.query_pairs().into_owned().collect();
            let request = StubRequest {
                element: element.clone(),
                url: script.src,
                params,
            };

            state.attached.insert(element.clone(), ElementKind::Script);
            state.scripts.push(request.clone());
            request
        };

        match (self.script_stub)(&request) {
            ScriptReply::Invoke(payload) => self.spawn_invoke(sink, None, payload),
            ScriptReply::InvokeAfter(delay, payload) => {
                self.spawn_invoke(sink, Some(delay), payload);
            }
            ScriptReply::LoadError(reason) => {
                tokio::spawn(async move {
                    sink.fail(reason);
                });
            }
            ScriptReply::Silent => {}
        }

        Ok(element)
    }

    fn detach(&self, element: &ElementId) -> Result<()> {
        self.remove_element(element)
    }
}

// ============================================================================
// FrameChannel
// ============================================================================

impl FrameChannel for MemoryDocument {
    fn attach_frame(&self, frame: &HiddenFrame) -> Result<(ElementId, LoadSignal)> {
        let element = ElementId::from(&frame.name);
        let (notifier, signal) = load_signal();

        let mut state = self.state.lock();
        state.attached.insert(element.clone(), ElementKind::Frame);
        state.frames.insert(frame.name.clone(), notifier);

        Ok((element, signal))
    }

    fn attach_form(&self, form: &HiddenForm) -> Result<ElementId> {
        let element = ElementId::from(format!("form_{}", form.target));

        let mut state = self.state.lock();
        if !state.frames.contains_key(&form.target) {
            return Err(Error::transport_load(element, "target frame is not attached"));
        }

        state.attached.insert(element.clone(), ElementKind::Form);
        state.forms.insert(element.clone(), form.clone());

        Ok(element)
    }

    fn submit(&self, form: &ElementId) -> Result<()> {
        let (request, target) = {
            let mut state = self.state.lock();
            let hidden = state
                .forms
                .get(form)
                .cloned()
                .ok_or_else(|| Error::transport_load(form.clone(), "form is not attached"))?;

            let request = StubRequest {
                element: form.clone(),
                url: hidden.action,
                params: hidden.fields,
            };
            state.submissions.push(request.clone());
            (request, hidden.target)
        };

        let reply = (self.frame_stub)(&request);

        let Some(notifier) = self.state.lock().frames.remove(&target) else {
            return Ok(());
        };

        match reply {
            FrameReply::Load => {
                tokio::spawn(async move { notifier.loaded() });
            }
            FrameReply::LoadAfter(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    notifier.loaded();
                });
            }
            FrameReply::Fail(reason) => notifier.failed(reason),
            FrameReply::Stall => {
                self.state.lock().frames.insert(target, notifier);
            }
        }

        Ok(())
    }

    fn detach(&self, element: &ElementId) -> Result<()> {
        self.remove_element(element)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::CallbackName;

    #[test]
    fn test_script_attach_and_detach() {
        let document = MemoryDocument::new();
        let callback = CallbackName::from("cb");
        let registry = Arc::new(crate::bridge::registry::CallbackRegistry::default());
        let sink = CallbackSink::new(callback.clone(), Arc::downgrade(&registry));

        let src = Url::parse("https://example.com/exec?action=getStats&callback=cb").expect("url");
        let element = ScriptChannel::attach(&document, ScriptTag { src, callback }, sink)
            .expect("attach");

        assert!(document.is_attached(&element));
        assert_eq!(document.scripts()[0].params.get("action"), Some("getStats"));

        ScriptChannel::detach(&document, &element).expect("detach");
        ScriptChannel::detach(&document, &element).expect("detach again");

        assert!(!document.is_attached(&element));
        assert_eq!(document.detach_count(&element), 2);
    }

    #[test]
    fn test_form_requires_frame() {
        let document = MemoryDocument::new();
        let form = HiddenForm::new(
            FrameName::from("missing"),
            Url::parse("https://example.com/exec").expect("url"),
            RequestParameters::new(),
        );

        assert!(document.attach_form(&form).is_err());
        assert_eq!(document.attached_count(), 0);
    }

    #[test]
    fn test_failing_form_removal_keeps_form() {
        let document = MemoryDocument::new().failing_form_removal();
        let frame = HiddenFrame::new(FrameName::from("f"));
        let (_frame_el, _signal) = document.attach_frame(&frame).expect("frame");
        let form = HiddenForm::new(
            frame.name.clone(),
            Url::parse("https://example.com/exec").expect("url"),
            RequestParameters::new(),
        );
        let form_el = document.attach_form(&form).expect("form");

        assert!(FrameChannel::detach(&document, &form_el).is_err());
        assert!(document.is_attached(&form_el));
    }
}
