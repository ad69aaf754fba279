//! Security create (`001`) and delete (`002`).

use tracing::debug;

use super::{
    DecodeError, Decoded, DecoderContext, announced_depth_size, exact_fields, required,
};
use crate::domain::reference::{Exchange, MarketSegment};
use crate::domain::security::IndexMembership;
use crate::infrastructure::feed::protocol::FeedLine;

const CREATE_FIELDS: usize = 12;
const DELETE_FIELDS: usize = 3;
const MIN_SYMBOL_LEN: usize = 3;

/// `001`: create or re-create a security.
///
/// Identity and classification are overwritten; the deletion flag and
/// trade statistics are kept.
pub(super) fn decode_create(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
    let fields = exact_fields(line, CREATE_FIELDS)?;
    let symbol = required(fields[0], "symbol")?;
    if symbol.chars().count() < MIN_SYMBOL_LEN {
        return Err(DecodeError::InvalidField {
            field: "symbol",
            value: symbol.to_string(),
        });
    }

    let market_segment = MarketSegment::from_code(fields[1]);
    let description = fields[2].trim();
    let exchange = Exchange::from_code(fields[3]);
    let security_class = fields[4].trim();
    let depth_size = announced_depth_size(fields[5])?;
    let sector_id = fields[6].trim().parse::<i32>().ok();
    let decimal_count = fields[7].trim().parse::<u32>().ok();
    let index_membership = IndexMembership::from_code(fields[8].trim());
    let underlying = fields[9].trim();
    let now = ctx.clock.now();

    let security = ctx.store.upsert_security(symbol, |security| {
        security.description = description.to_string();
        security.market_segment = market_segment;
        security.exchange = exchange;
        security.security_class = security_class.to_string();
        if depth_size.is_some() {
            security.depth_size = depth_size;
        }
        if sector_id.is_some() {
            security.sector_id = sector_id;
        }
        if decimal_count.is_some() {
            security.decimal_count = decimal_count;
        }
        security.index_membership = index_membership;
        security.underlying = underlying.to_string();
        security.derive_display_symbol();
        security.touch(now);
    });

    debug!(
        symbol = %security.org_security,
        display = %security.symbol,
        exchange = security.exchange.name(),
        "Security created"
    );
    Ok(Decoded::Security(Box::new(security)))
}

/// `002`: flag a security deleted. The record stays in the registry.
pub(super) fn decode_delete(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
    let fields = exact_fields(line, DELETE_FIELDS)?;
    let symbol = required(fields[0], "symbol")?;
    let now = ctx.clock.now();

    let security = ctx.store.upsert_security(symbol, |security| {
        security.mark_deleted();
        security.touch(now);
    });

    debug!(symbol = %security.org_security, "Security deleted");
    Ok(Decoded::Security(Box::new(security)))
}
