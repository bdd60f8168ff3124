//! Write bridge: one-shot cross-origin writes through a hidden form.
//!
//! # Submission Flow
//!
//! 1. Attach a hidden frame with a unique name
//! 2. Attach a hidden POST form targeting it, one hidden input per field
//! 3. Submit the form
//! 4. Wait for the frame's load event, then the settle delay
//! 5. Detach form and frame, then resolve with [`Unconfirmed`]
//!
//! # Protocol Limitation
//!
//! The frame's content is cross-origin and unreadable. "The frame loaded" is
//! the only signal, so this bridge cannot tell an accepted write from a
//! rejected one. There is also no timeout: a frame that never loads leaves
//! the call pending.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ElementId, FrameName};
use crate::protocol::RequestParameters;
use crate::transport::{FrameChannel, HiddenForm, HiddenFrame};

use super::config::BridgeConfig;
use super::state::RequestState;

// ============================================================================
// Constants
// ============================================================================

/// Message carried by every optimistic acknowledgment.
const SENT_MESSAGE: &str = "Request has been sent.";

// ============================================================================
// Unconfirmed
// ============================================================================

/// Fire-and-hope acknowledgment of a write.
///
/// `success` only means the form was submitted and its frame loaded. The
/// endpoint's verdict is never observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unconfirmed {
    /// Always `true` for a completed submission.
    pub success: bool,

    /// Generic acknowledgment text.
    pub message: String,
}

impl Unconfirmed {
    fn sent() -> Self {
        Self {
            success: true,
            message: SENT_MESSAGE.to_string(),
        }
    }

    /// Always `false`: the write path has no readable response channel.
    #[inline]
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        false
    }
}

// ============================================================================
// WriteBridge
// ============================================================================

/// Issues hidden-form writes through a [`FrameChannel`].
#[derive(Clone)]
pub struct WriteBridge {
    config: Arc<BridgeConfig>,
    channel: Arc<dyn FrameChannel>,
}

impl WriteBridge {
    /// Creates a bridge over `channel`.
    #[must_use]
    pub fn new(config: BridgeConfig, channel: Arc<dyn FrameChannel>) -> Self {
        Self {
            config: Arc::new(config),
            channel,
        }
    }

    /// Returns the bridge configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Submits `data` and resolves optimistically once the frame settles.
    ///
    /// # Errors
    ///
    /// - [`Error::TransportLoad`] if the frame or form cannot be attached,
    ///   or the frame fails to load
    /// - [`Error::Processing`] if removing the form or frame fails
    pub async fn submit(&self, data: RequestParameters) -> Result<Unconfirmed> {
        let frame = HiddenFrame::new(FrameName::generate());
        let form = HiddenForm::new(frame.name.clone(), self.config.endpoint.clone(), data);

        let mut mounted = MountedForm::new(frame.name.clone(), Arc::clone(&self.channel));

        let delivered = self.deliver(&frame, &form, &mut mounted).await;
        let terminal = if delivered.is_ok() {
            RequestState::Resolved
        } else {
            RequestState::Rejected
        };
        let teardown = mounted.teardown(terminal);

        match (delivered, teardown) {
            (Ok(()), Ok(())) => {
                debug!(frame = %frame.name, "Write submitted");
                Ok(Unconfirmed::sent())
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), teardown) => {
                if let Err(cleanup) = teardown {
                    warn!(frame = %frame.name, error = %cleanup, "Cleanup failed after error");
                }
                debug!(frame = %frame.name, error = %e, "Write failed");
                Err(e)
            }
        }
    }

    /// Attaches, submits and waits for the frame to settle.
    async fn deliver(
        &self,
        frame: &HiddenFrame,
        form: &HiddenForm,
        mounted: &mut MountedForm,
    ) -> Result<()> {
        let (frame_element, loaded) = self.channel.attach_frame(frame)?;
        mounted.frame = Some(frame_element.clone());

        let form_element = self.channel.attach_form(form)?;
        mounted.form = Some(form_element.clone());

        self.channel.submit(&form_element)?;
        mounted.transition(RequestState::Pending);

        trace!(frame = %frame.name, fields = form.fields.len(), "Form submitted");

        loaded.wait(&frame_element).await?;
        sleep(self.config.write_settle).await;

        Ok(())
    }
}

// ============================================================================
// MountedForm
// ============================================================================

/// Form and frame attached for one write.
///
/// Torn down exactly once: explicitly by [`WriteBridge::submit`], or on drop
/// if the caller abandons the future.
struct MountedForm {
    name: FrameName,
    state: RequestState,
    frame: Option<ElementId>,
    form: Option<ElementId>,
    channel: Arc<dyn FrameChannel>,
    torn_down: bool,
}

impl MountedForm {
    fn new(name: FrameName, channel: Arc<dyn FrameChannel>) -> Self {
        Self {
            name,
            state: RequestState::Idle,
            frame: None,
            form: None,
            channel,
            torn_down: false,
        }
    }

    fn transition(&mut self, next: RequestState) {
        match self.state.advance(next) {
            Ok(state) => self.state = state,
            Err(e) => warn!(frame = %self.name, error = %e, "Ignored transition"),
        }
    }

    /// Removes the form, then the frame. Both removals are always attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] listing every removal that failed.
    fn teardown(&mut self, terminal: RequestState) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        let failures: Vec<String> = [self.form.take(), self.frame.take()]
            .into_iter()
            .flatten()
            .filter_map(|element| {
                self.channel
                    .detach(&element)
                    .err()
                    .map(|e| format!("{element}: {e}"))
            })
            .collect();

        self.transition(if failures.is_empty() {
            terminal
        } else {
            RequestState::Rejected
        });
        trace!(frame = %self.name, state = %self.state, "Write elements released");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::processing(format!(
                "failed to remove {}",
                failures.join("; ")
            )))
        }
    }
}

impl Drop for MountedForm {
    fn drop(&mut self) {
        if !self.torn_down {
            debug!(frame = %self.name, "Write abandoned before completion");
            if let Err(e) = self.teardown(RequestState::Rejected) {
                warn!(frame = %self.name, error = %e, "Cleanup failed on drop");
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

    use std::time::Duration;

    use tokio::time::{Instant, timeout};

    use crate::protocol::Action;
    use crate::transport::{FrameReply, MemoryDocument};

    const ENDPOINT: &str = "https://script.example.com/macros/s/abc/exec";

    fn bridge(document: &Arc<MemoryDocument>) -> WriteBridge {
        let config = BridgeConfig::builder().endpoint(ENDPOINT).build().expect("valid");
        WriteBridge::new(config, Arc::clone(document) as Arc<dyn FrameChannel>)
    }

    fn checkin() -> RequestParameters {
        RequestParameters::for_action(Action::Checkin)
            .with("name", "Kim")
            .with("phone", "010-0000-0000")
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_after_load_plus_settle() {
        let document = Arc::new(
            MemoryDocument::new()
                .with_frame_stub(|_| FrameReply::LoadAfter(Duration::from_millis(200))),
        );
        let bridge = bridge(&document);

        let started = Instant::now();
        let ack = bridge.submit(checkin()).await.expect("submitted");
        let elapsed = started.elapsed();

        assert!(ack.success);
        assert!(!ack.is_confirmed());
        assert_eq!(ack.message, SENT_MESSAGE);
        assert!(elapsed >= Duration::from_millis(1200));
        assert!(elapsed < Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_fields_and_cleanup() {
        let document = Arc::new(MemoryDocument::new());
        let bridge = bridge(&document);

        bridge.submit(checkin()).await.expect("submitted");

        let submission = &document.submissions()[0];
        assert_eq!(submission.url.as_str(), ENDPOINT);
        assert_eq!(submission.params, checkin());

        let frame = submission
            .element
            .as_str()
            .strip_prefix("form_")
            .map(ElementId::from)
            .expect("form id names its frame");

        assert_eq!(document.attached_count(), 0);
        assert_eq!(document.detach_count(&submission.element), 1);
        assert_eq!(document.detach_count(&frame), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_load_failure() {
        let document = Arc::new(
            MemoryDocument::new().with_frame_stub(|_| FrameReply::Fail("refused".into())),
        );
        let bridge = bridge(&document);

        let err = bridge.submit(checkin()).await.unwrap_err();

        assert!(err.is_transport_error());
        assert_eq!(document.attached_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_failure_is_processing_error() {
        let document = Arc::new(MemoryDocument::new().failing_form_removal());
        let bridge = bridge(&document);

        let err = bridge.submit(checkin()).await.unwrap_err();
        assert!(matches!(err, Error::Processing { .. }));

        // The frame is still removed even though the form was not.
        assert_eq!(document.attached_count(), 1);
        let form = &document.submissions()[0].element;
        assert!(document.is_attached(form));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_frame_stays_pending() {
        let document = Arc::new(MemoryDocument::new().with_frame_stub(|_| FrameReply::Stall));
        let bridge = bridge(&document);

        let result = timeout(Duration::from_secs(3600), bridge.submit(checkin())).await;
        assert!(result.is_err());

        // Abandoning the call still tears down form and frame.
        assert_eq!(document.attached_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_settle_delay() {
        let document = Arc::new(MemoryDocument::new());
        let config = BridgeConfig::builder()
            .endpoint(ENDPOINT)
            .write_settle(Duration::from_millis(50))
            .build()
            .expect("valid");
        let bridge = WriteBridge::new(config, document);

        let started = Instant::now();
        bridge.submit(checkin()).await.expect("submitted");
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
