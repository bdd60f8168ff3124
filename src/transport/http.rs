//! Native channels emulating the browser transports over HTTP.
//!
//! - [`HttpScriptChannel`] fetches the script URL, evaluates the
//!   `callback(json)` body, and invokes the sink when the name matches.
//! - [`HttpFrameChannel`] POSTs the hidden form urlencoded. Any HTTP response
//!   counts as the frame loading, and the body is discarded unread.
//!
//! Detaching an element aborts its in-flight fetch, which is the native
//! counterpart of removing the element from the document.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use rustc_hash::FxHashMap;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ElementId, FrameName};
use crate::protocol::ResponsePayload;

use super::jsonp;
use super::{
    CallbackSink, FrameChannel, HiddenForm, HiddenFrame, LoadNotifier, LoadSignal, ScriptChannel,
    ScriptTag, load_signal,
};

// ============================================================================
// Constants
// ============================================================================

/// Content type of hidden form submissions.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// Types
// ============================================================================

/// In-flight fetches by element.
type TaskMap = FxHashMap<ElementId, AbortHandle>;

// ============================================================================
// HttpScriptChannel
// ============================================================================

/// [`ScriptChannel`] that loads scripts with an HTTP GET.
pub struct HttpScriptChannel {
    client: Client,
    tasks: Mutex<TaskMap>,
}

impl HttpScriptChannel {
    /// Creates a channel with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(Client::builder().build()?))
    }

    /// Creates a channel using an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            tasks: Mutex::new(TaskMap::default()),
        }
    }

    /// Returns the number of fetches not yet detached.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl ScriptChannel for HttpScriptChannel {
    fn attach(&self, script: ScriptTag, sink: CallbackSink) -> Result<ElementId> {
        let element = ElementId::from(&script.callback);
        let client = self.client.clone();

        trace!(%element, src = %script.src, "Loading script");

        let handle = tokio::spawn(async move {
            match fetch_script(&client, script.src).await {
                Ok(body) => evaluate_script(&body, &sink),
                Err(reason) => {
                    debug!(callback = %sink.callback(), %reason, "Script failed to load");
                    sink.fail(reason);
                }
            }
        });

        self.tasks
            .lock()
            .insert(element.clone(), handle.abort_handle());

        Ok(element)
    }

    fn detach(&self, element: &ElementId) -> Result<()> {
        if let Some(handle) = self.tasks.lock().remove(element) {
            handle.abort();
        }
        Ok(())
    }
}

/// GETs a script body. Non-2xx statuses count as load failures.
async fn fetch_script(client: &Client, src: Url) -> std::result::Result<String, String> {
    let response = client.get(src).send().await.map_err(|e| e.to_string())?;
    let response = response.error_for_status().map_err(|e| e.to_string())?;
    response.text().await.map_err(|e| e.to_string())
}

/// Runs a loaded script body against `sink`.
///
/// Bodies that do not call the expected callback leave the request pending.
fn evaluate_script(body: &str, sink: &CallbackSink) {
    match jsonp::parse(body) {
        Ok(Some(call)) if call.callback == sink.callback().as_str() => {
            sink.invoke(ResponsePayload::new(call.argument));
        }
        Ok(Some(call)) => {
            warn!(
                expected = %sink.callback(),
                invoked = %call.callback,
                "Script invoked a different callback"
            );
        }
        Ok(None) => {
            warn!(callback = %sink.callback(), "Script is not a callback invocation");
        }
        Err(e) => {
            warn!(callback = %sink.callback(), error = %e, "Script argument is not valid JSON");
        }
    }
}

// ============================================================================
// HttpFrameChannel
// ============================================================================

/// [`FrameChannel`] that submits hidden forms with an HTTP POST.
pub struct HttpFrameChannel {
    client: Client,
    frames: Mutex<FxHashMap<FrameName, LoadNotifier>>,
    forms: Mutex<FxHashMap<ElementId, HiddenForm>>,
    tasks: Mutex<TaskMap>,
}

impl HttpFrameChannel {
    /// Creates a channel with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(Client::builder().build()?))
    }

    /// Creates a channel using an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            frames: Mutex::new(FxHashMap::default()),
            forms: Mutex::new(FxHashMap::default()),
            tasks: Mutex::new(TaskMap::default()),
        }
    }
}

impl FrameChannel for HttpFrameChannel {
    fn attach_frame(&self, frame: &HiddenFrame) -> Result<(ElementId, LoadSignal)> {
        let (notifier, signal) = load_signal();
        self.frames.lock().insert(frame.name.clone(), notifier);
        Ok((ElementId::from(&frame.name), signal))
    }

    fn attach_form(&self, form: &HiddenForm) -> Result<ElementId> {
        let element = ElementId::from(format!("form_{}", form.target));

        if !self.frames.lock().contains_key(&form.target) {
            return Err(Error::transport_load(element, "target frame is not attached"));
        }

        self.forms.lock().insert(element.clone(), form.clone());
        Ok(element)
    }

    fn submit(&self, form: &ElementId) -> Result<()> {
        let hidden = self
            .forms
            .lock()
            .get(form)
            .cloned()
            .ok_or_else(|| Error::transport_load(form.clone(), "form is not attached"))?;

        let notifier = self.frames.lock().remove(&hidden.target).ok_or_else(|| {
            Error::transport_load(form.clone(), "target frame already received a submission")
        })?;

        let frame = ElementId::from(&hidden.target);
        let request = self
            .client
            .post(hidden.action)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(hidden.fields.to_form_body());

        trace!(%frame, "Submitting hidden form");

        let handle = tokio::spawn(async move {
            match request.send().await {
                Ok(response) => {
                    trace!(status = %response.status(), "Frame loaded");
                    notifier.loaded();
                }
                Err(e) => notifier.failed(e.to_string()),
            }
        });

        self.tasks.lock().insert(frame, handle.abort_handle());
        Ok(())
    }

    fn detach(&self, element: &ElementId) -> Result<()> {
        self.forms.lock().remove(element);
        self.frames.lock().remove(&FrameName::from(element.as_str()));

        if let Some(handle) = self.tasks.lock().remove(element) {
            handle.abort();
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
