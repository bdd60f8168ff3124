//! Parsing of JSONP script bodies.
//!
//! The endpoint answers a read with a script of the form
//! `callbackName({...});`. Only a single call to a plain identifier is
//! understood; anything else is treated as a script that never invokes the
//! callback.

// ============================================================================
// Imports
// ============================================================================

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Matches `[/**/] name ( args ) [;]` over the whole body.
static JSONP_CALL_RE: OnceLock<Regex> = OnceLock::new();

fn jsonp_call_re() -> &'static Regex {
    JSONP_CALL_RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*(?:/\*\*/\s*)?([A-Za-z_$][A-Za-z0-9_$]*)\s*\((.*)\)\s*;?\s*$")
            .expect("jsonp regex")
    })
}

// ============================================================================
// JsonpCall
// ============================================================================

/// A decoded `name(argument)` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonpCall {
    /// Function the script invokes.
    pub callback: String,

    /// JSON argument passed to it.
    pub argument: Value,
}

/// Parses a JSONP script body.
///
/// Returns `Ok(None)` if the body is not a single function call.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if the call's argument is not
/// valid JSON.
pub fn parse(body: &str) -> Result<Option<JsonpCall>> {
    let Some(captures) = jsonp_call_re().captures(body) else {
        return Ok(None);
    };

    let argument = serde_json::from_str(&captures[2])?;

    Ok(Some(JsonpCall {
        callback: captures[1].to_string(),
        argument,
    }))
}

// ============================================================================
// Tests
// ============================================================================
