//! Typed client for the check-in endpoint.
//!
//! Every query goes through the [`ReadBridge`]; [`CheckinClient::submit_check_in`]
//! is the one write and goes through the [`WriteBridge`].
//!
//! # Example
//!
//! ```no_run
//! use checkin_bridge::{BridgeConfig, CheckIn, CheckinClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let config = BridgeConfig::builder()
//!     .endpoint("https://script.example.com/macros/s/abc/exec")
//!     .build()?;
//! let client = CheckinClient::http(config)?;
//!
//! client.check_in(&CheckIn::named("Kim")).await?;
//! let stats = client.get_stats().await?;
//! println!("{} today", stats.today);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Check-in data types.
pub mod types;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::bridge::{BridgeConfig, ReadBridge, Unconfirmed, WriteBridge};
use crate::error::{Error, Result};
use crate::protocol::{Action, Envelope, RequestParameters};
use crate::transport::{FrameChannel, HttpFrameChannel, HttpScriptChannel, ScriptChannel};

pub use types::{CheckIn, ExportBundle, Record, Stats};

// ============================================================================
// Constants
// ============================================================================

/// Record count requested when the caller has no preference.
pub const DEFAULT_RECORD_LIMIT: u32 = 100;

// ============================================================================
// CheckinClient
// ============================================================================

/// Check-in operations on top of the read and write bridges.
#[derive(Clone)]
pub struct CheckinClient {
    read: ReadBridge,
    write: WriteBridge,
}

impl CheckinClient {
    /// Creates a client over explicit channels.
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        scripts: Arc<dyn ScriptChannel>,
        frames: Arc<dyn FrameChannel>,
    ) -> Self {
        Self {
            read: ReadBridge::new(config.clone(), scripts),
            write: WriteBridge::new(config, frames),
        }
    }

    /// Creates a client over the native HTTP channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if an HTTP client cannot
    /// be built.
    pub fn http(config: BridgeConfig) -> Result<Self> {
        Ok(Self::new(
            config,
            Arc::new(HttpScriptChannel::new()?),
            Arc::new(HttpFrameChannel::new()?),
        ))
    }

    /// Returns the read bridge.
    #[inline]
    #[must_use]
    pub fn read_bridge(&self) -> &ReadBridge {
        &self.read
    }

    /// Returns the write bridge.
    #[inline]
    #[must_use]
    pub fn write_bridge(&self) -> &WriteBridge {
        &self.write
    }
}

// ============================================================================
// CheckinClient - Operations
// ============================================================================

impl CheckinClient {
    /// Records a check-in through the read bridge.
    ///
    /// Returns the endpoint's `data`, or `Value::Null` if it sent none.
    ///
    /// # Errors
    ///
    /// Bridge errors, or [`Error::Remote`](crate::Error::Remote) if the
    /// endpoint rejected the check-in.
    pub async fn check_in(&self, checkin: &CheckIn) -> Result<Value> {
        let data = self.call::<Value>(Action::Checkin, checkin.to_params()).await?;
        Ok(data.unwrap_or_default())
    }

    /// Submits a check-in through the write bridge.
    ///
    /// The result is optimistic; see [`Unconfirmed`].
    ///
    /// # Errors
    ///
    /// Bridge errors from [`WriteBridge::submit`].
    pub async fn submit_check_in(&self, checkin: &CheckIn) -> Result<Unconfirmed> {
        let result = self.write.submit(checkin.to_params()).await;

        match &result {
            Ok(_) => debug!("Check-in submitted"),
            Err(e) => warn!(error = %e, "Check-in submission failed"),
        }

        result
    }

    /// Fetches up to `limit` records, optionally for one `date`.
    ///
    /// # Errors
    ///
    /// Bridge, decoding or remote errors.
    pub async fn get_records(&self, limit: u32, date: Option<&str>) -> Result<Vec<Record>> {
        let params = RequestParameters::for_action(Action::GetRecords)
            .with("limit", limit.to_string())
            .with_opt("date", date);

        let records: Vec<Record> = self.call_data(Action::GetRecords, params).await?;
        debug!(count = records.len(), "Records fetched");
        Ok(records)
    }

    /// Fetches aggregate statistics.
    ///
    /// # Errors
    ///
    /// Bridge, decoding or remote errors.
    pub async fn get_stats(&self) -> Result<Stats> {
        let params = RequestParameters::for_action(Action::GetStats);
        self.call_data(Action::GetStats, params).await
    }

    /// Requests the CSV export bundle.
    ///
    /// # Errors
    ///
    /// Bridge, decoding or remote errors.
    pub async fn export_data(&self) -> Result<ExportBundle> {
        let params = RequestParameters::for_action(Action::ExportData);
        self.call_data(Action::ExportData, params).await
    }

    /// Issues a read and returns the envelope's `data`.
    ///
    /// `success` is checked before `data` is decoded, so a failed envelope
    /// always surfaces as [`Error::Remote`].
    async fn call<T: DeserializeOwned>(
        &self,
        action: Action,
        params: RequestParameters,
    ) -> Result<Option<T>> {
        let result = match self.read.request(params).await {
            Ok(payload) => payload.decode::<Value>().and_then(Envelope::into_result),
            Err(e) => Err(e),
        };

        match &result {
            Ok(data) => debug!(%action, has_data = data.is_some(), "Response received"),
            Err(e) => warn!(%action, error = %e, "Request failed"),
        }

        match result? {
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    /// Like [`call`](Self::call), but `data` is required.
    async fn call_data<T: DeserializeOwned>(
        &self,
        action: Action,
        params: RequestParameters,
    ) -> Result<T> {
        self.call(action, params)
            .await?
            .ok_or_else(|| Error::remote("response carried no data"))
    }
}

// ============================================================================
// Tests
// ============================================================================
