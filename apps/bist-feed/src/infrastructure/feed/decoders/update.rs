//! Generic field update (`060`) and refresh (`061`).

use tracing::debug;

use super::{DecodeError, Decoded, DecoderContext, required};
use crate::infrastructure::feed::field_codes::{FieldOutcome, apply_field_code};
use crate::infrastructure::feed::protocol::{FeedLine, trim_trailing_empty};

/// Merge `(code, value)` pairs into one security.
///
/// Every pair is kept verbatim in the attribute map; mapped codes also
/// update the typed statistics. A value that does not parse leaves the
/// previous one in place. One change is returned per line.
pub(super) fn decode_update(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
    let mut fields = line.fields();
    trim_trailing_empty(&mut fields);

    let symbol = required(fields.first().copied().unwrap_or_default(), "symbol")?;
    if symbol.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(DecodeError::MalformedDiscriminator(symbol.to_string()));
    }

    let pairs = &fields[1..];
    let now = ctx.clock.now();

    let (security, applied) = ctx.store.merge_security(symbol, |security| {
        security.derive_display_symbol();

        let mut applied = 0usize;
        for pair in pairs.chunks(2) {
            let code = pair[0].trim();
            if code.is_empty() {
                continue;
            }
            let value = pair.get(1).copied().unwrap_or_default();
            security
                .attributes
                .insert(code.to_string(), value.to_string());

            match apply_field_code(security, code, value) {
                Ok(FieldOutcome::Applied(_)) => applied += 1,
                Ok(FieldOutcome::Ignored) => {}
                Err(e) => debug!(symbol, code, error = %e, "Field value skipped"),
            }
        }

        security.touch(now);
        (security.clone(), applied)
    });

    debug!(symbol, pairs = pairs.len().div_ceil(2), applied, "Security updated");
    Ok(Decoded::Security(Box::new(security)))
}
