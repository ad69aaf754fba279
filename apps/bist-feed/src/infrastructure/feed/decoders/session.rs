//! Session time (`012`).

use chrono::Datelike;
use tracing::debug;

use super::{DecodeError, Decoded, DecoderContext, exact_fields, required};
use crate::domain::session::{BistTime, SessionState};
use crate::infrastructure::feed::protocol::FeedLine;

const SESSION_FIELDS: usize = 4;

/// Replace the session clock wholesale.
///
/// The date must start with the current year; anything else is treated as a
/// malformed line.
pub(super) fn decode_session_time(
    ctx: &DecoderContext,
    line: &FeedLine,
) -> Result<Decoded, DecodeError> {
    let fields = exact_fields(line, SESSION_FIELDS)?;
    let date = required(fields[0], "date")?;
    let time = fields[1].trim();

    let year = ctx.clock.now().year();
    if !date.starts_with(&year.to_string()) {
        return Err(DecodeError::StaleSessionDate {
            date: date.to_string(),
            year,
        });
    }

    let state = SessionState::from_code(fields[2])
        .ok_or_else(|| DecodeError::UnknownSessionState(fields[2].trim().to_string()))?;

    let bist_time = BistTime::new(date, time, state);
    ctx.store.set_session_time(bist_time.clone());

    debug!(date, time, state = state.code(), "Session time updated");
    Ok(Decoded::SessionTime(bist_time))
}
