//! Correlation data carried across the queue boundary.
//!
//! The queue and result store have no call-stack relationship with the
//! request that submitted a task, so the identifiers needed to stitch the
//! worker's span onto the originating trace travel inside the
//! [`TaskRecord`](crate::task::TaskRecord) as plain data.
//!
//! [`TraceParent`] implements the W3C Trace Context `traceparent` header:
//!
//! ```text
//! 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01
//! ^  ^                                ^                ^
//! |  trace-id (16 bytes hex)          parent-id        flags
//! version                             (8 bytes hex)
//! ```

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Name of the W3C propagation header.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Request id header assigned by the API middleware.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation identifiers captured from an inbound request.
///
/// Both fields are optional and carried verbatim; validation of
/// `trace_parent` happens only when the worker opens its span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl CorrelationContext {
    pub fn new(trace_parent: Option<String>, request_id: Option<String>) -> Self {
        Self {
            trace_parent: trace_parent.filter(|v| !v.trim().is_empty()),
            request_id: request_id.filter(|v| !v.trim().is_empty()),
        }
    }

    /// Parse the carried `traceparent`, if any.
    ///
    /// Returns `None` when absent or malformed; a malformed value is
    /// logged and otherwise ignored.
    pub fn parsed_trace_parent(&self) -> Option<TraceParent> {
        let raw = self.trace_parent.as_deref()?;
        match raw.parse::<TraceParent>() {
            Ok(parent) => Some(parent),
            Err(e) => {
                tracing::debug!(trace_parent = raw, error = %e, "Ignoring malformed traceparent");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TraceParent
// ---------------------------------------------------------------------------

/// A parsed W3C `traceparent` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceParent {
    trace_id: String,
    span_id: String,
    flags: u8,
}

/// Bit 0 of the flags field.
const FLAG_SAMPLED: u8 = 0x01;

impl TraceParent {
    /// Start a new trace with a random trace id and span id.
    pub fn new_root() -> Self {
        let mut rng = rand::rng();
        Self {
            trace_id: random_hex::<16>(&mut rng),
            span_id: random_hex::<8>(&mut rng),
            flags: FLAG_SAMPLED,
        }
    }

    /// A new span in the same trace, parented on `self`.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: random_hex::<8>(&mut rand::rng()),
            flags: self.flags,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn is_sampled(&self) -> bool {
        self.flags & FLAG_SAMPLED != 0
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "00-{}-{}-{:02x}", self.trace_id, self.span_id, self.flags)
    }
}

impl FromStr for TraceParent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| CoreError::Validation(format!("Invalid traceparent ({why}): {s:?}"));

        let parts: Vec<&str> = s.trim().split('-').collect();
        let [version, trace_id, span_id, flags] = parts.as_slice() else {
            return Err(invalid("expected 4 fields"));
        };

        if version.len() != 2 || !is_lower_hex(version) || *version == "ff" {
            return Err(invalid("version"));
        }
        // Version 00 has exactly four fields; future versions may append more,
        // which the slice pattern above already rejects.
        if trace_id.len() != 32 || !is_lower_hex(trace_id) || is_all_zero(trace_id) {
            return Err(invalid("trace-id"));
        }
        if span_id.len() != 16 || !is_lower_hex(span_id) || is_all_zero(span_id) {
            return Err(invalid("parent-id"));
        }
        if flags.len() != 2 || !is_lower_hex(flags) {
            return Err(invalid("flags"));
        }
        let flags = u8::from_str_radix(flags, 16).map_err(|_| invalid("flags"))?;

        Ok(Self {
            trace_id: (*trace_id).to_string(),
            span_id: (*span_id).to_string(),
            flags,
        })
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_all_zero(s: &str) -> bool {
    s.bytes().all(|b| b == b'0')
}

fn random_hex<const N: usize>(rng: &mut impl Rng) -> String {
    let mut bytes = [0u8; N];
    loop {
        rng.fill(&mut bytes[..]);
        if bytes.iter().any(|b| *b != 0) {
            break;
        }
    }
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
