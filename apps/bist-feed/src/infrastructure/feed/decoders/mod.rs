//! Per-Type Decoders
//!
//! Synchronous functions that validate one routed line, merge it into the
//! [`MarketStateStore`] and return the resulting domain change. Validation
//! happens before any mutation: a rejected line leaves the store untouched.
//!
//! Publishing the returned change is the worker's job, which keeps decoders
//! free of channel plumbing.

mod depth;
mod news;
mod security;
mod session;
mod update;

use std::sync::Arc;

use crate::application::ports::SharedClock;
use crate::domain::depth::{MAX_DEPTH_SIZE, SecurityDepth, Side};
use crate::domain::market::MarketStateStore;
use crate::domain::news::News;
use crate::domain::security::Security;
use crate::domain::session::BistTime;

use super::protocol::{FeedLine, MessageType, UnknownReason};

// =============================================================================
// Errors
// =============================================================================

/// A line failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Wrong number of fields.
    #[error("{message_type} expects {expected} fields, got {actual}")]
    FieldCount {
        /// Message type label.
        message_type: &'static str,
        /// Expected count.
        expected: usize,
        /// Actual count.
        actual: usize,
    },

    /// Fewer fields than the minimum.
    #[error("{message_type} expects at least {minimum} fields, got {actual}")]
    TooFewFields {
        /// Message type label.
        message_type: &'static str,
        /// Minimum count.
        minimum: usize,
        /// Actual count.
        actual: usize,
    },

    /// A required field is empty or too short.
    #[error("missing required field {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A required field does not parse.
    #[error("invalid {field}: {value:?}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// Session state code outside the known set.
    #[error("unknown session state code {0:?}")]
    UnknownSessionState(String),

    /// Session date from another year.
    #[error("session date {date:?} does not start with current year {year}")]
    StaleSessionDate {
        /// Date as received.
        date: String,
        /// Expected year.
        year: i32,
    },

    /// Leading field of a generic update looks like a type discriminator.
    #[error("malformed leading field {0:?}")]
    MalformedDiscriminator(String),
}

// =============================================================================
// Decoded Changes
// =============================================================================

/// Change produced by one decoded line.
#[derive(Debug, Clone)]
pub enum Decoded {
    /// Security created, updated or flagged deleted.
    Security(Box<Security>),
    /// One side of one depth row updated.
    Depth {
        /// Native symbol.
        org_security: String,
        /// Updated side.
        side: Side,
        /// Row snapshot.
        depth: SecurityDepth,
    },
    /// Session clock replaced.
    SessionTime(BistTime),
    /// Headline or body.
    News(News),
    /// Line kept for diagnostics only.
    Unknown(UnknownReason),
    /// Parsed but deliberately not propagated.
    Ignored,
}

// =============================================================================
// Context
// =============================================================================

/// What decoders need besides the line itself.
#[derive(Debug, Clone)]
pub struct DecoderContext {
    /// State store to merge into.
    pub store: Arc<MarketStateStore>,
    /// Time source for update stamps and the session-year check.
    pub clock: SharedClock,
}

impl DecoderContext {
    /// Create a context.
    #[must_use]
    pub fn new(store: Arc<MarketStateStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }
}

/// Decode one routed line.
///
/// # Errors
///
/// Returns [`DecodeError`] when the line fails validation; the store is not
/// mutated in that case.
pub fn decode(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
    if let Some(reason) = line.unknown_reason {
        return Ok(Decoded::Unknown(reason));
    }

    match line.message_type {
        MessageType::SecurityCreate => security::decode_create(ctx, line),
        MessageType::SecurityDelete => security::decode_delete(ctx, line),
        MessageType::SessionTime => session::decode_session_time(ctx, line),
        MessageType::NewsHeadline => news::decode_headline(ctx, line),
        MessageType::NewsBody => news::decode_body(ctx, line),
        MessageType::NewsDelete => news::decode_delete(line),
        MessageType::FieldUpdate | MessageType::FieldRefresh => update::decode_update(ctx, line),
        MessageType::DepthInsert | MessageType::DepthRefresh | MessageType::DepthUpdate => {
            depth::decode_depth(ctx, line)
        }
        MessageType::DepthDelete => Ok(Decoded::Unknown(UnknownReason::NotImplemented)),
        MessageType::Unknown => Ok(Decoded::Unknown(UnknownReason::UnrecognizedType)),
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

fn exact_fields(line: &FeedLine, expected: usize) -> Result<Vec<&str>, DecodeError> {
    let fields = line.fields();
    if fields.len() != expected {
        return Err(DecodeError::FieldCount {
            message_type: line.message_type.as_str(),
            expected,
            actual: fields.len(),
        });
    }
    Ok(fields)
}

fn min_fields(fields: &[&str], line: &FeedLine, minimum: usize) -> Result<(), DecodeError> {
    if fields.len() < minimum {
        return Err(DecodeError::TooFewFields {
            message_type: line.message_type.as_str(),
            minimum,
            actual: fields.len(),
        });
    }
    Ok(())
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, DecodeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DecodeError::MissingField { field });
    }
    Ok(value)
}

fn parse_required<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, DecodeError> {
    value.trim().parse().map_err(|_| DecodeError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Book size announced on the wire. Empty, zero or non-numeric means not
/// announced; a count above [`MAX_DEPTH_SIZE`] rejects the line.
fn announced_depth_size(value: &str) -> Result<Option<u32>, DecodeError> {
    let Ok(size) = value.trim().parse::<u64>() else {
        return Ok(None);
    };
    if size == 0 {
        return Ok(None);
    }
    u32::try_from(size)
        .ok()
        .filter(|&n| n <= MAX_DEPTH_SIZE)
        .map(Some)
        .ok_or_else(|| DecodeError::InvalidField {
            field: "depth_size",
            value: value.to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::test_support::{context, line};
    use super::*;

    #[test]
    fn unknown_lines_decode_to_unknown() {
        let ctx = context();
        let decoded = decode(&ctx, &FeedLine::classify("999whatever-this-is")).unwrap();
        assert!(matches!(
            decoded,
            Decoded::Unknown(UnknownReason::UnrecognizedType)
        ));

        let decoded = decode(&ctx, &FeedLine::classify("short")).unwrap();
        assert!(matches!(decoded, Decoded::Unknown(UnknownReason::TooShort)));
    }

    #[test]
    fn depth_delete_is_not_implemented() {
        let ctx = context();
        let decoded = decode(&ctx, &line("065", &["AKBNK", "0", "1", ""])).unwrap();
        assert!(matches!(
            decoded,
            Decoded::Unknown(UnknownReason::NotImplemented)
        ));
        assert_eq!(ctx.store.quote_count(), 0);
    }

    #[test]
    fn required_helpers() {
        assert_eq!(required(" X ", "f"), Ok("X"));
        assert_eq!(
            required("  ", "symbol"),
            Err(DecodeError::MissingField { field: "symbol" })
        );
        assert_eq!(parse_required::<u32>("7", "row"), Ok(7));
        assert!(matches!(
            parse_required::<u32>("-1", "row"),
            Err(DecodeError::InvalidField { field: "row", .. })
        ));
    }
}
