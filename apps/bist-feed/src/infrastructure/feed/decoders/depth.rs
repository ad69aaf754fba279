//! Depth insert (`062`), refresh (`063`) and update (`064`).
//!
//! All three carry the same layout and the same semantics: overwrite one
//! side of one row.

use rust_decimal::Decimal;
use tracing::debug;

use super::{
    DecodeError, Decoded, DecoderContext, announced_depth_size, exact_fields, parse_required,
    required,
};
use crate::domain::depth::{DepthLevel, Side, conventional_depth_size};
use crate::domain::security::FieldValue;
use crate::infrastructure::feed::protocol::FeedLine;

const DEPTH_FIELDS: usize = 9;

pub(super) fn decode_depth(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
    let fields = exact_fields(line, DEPTH_FIELDS)?;
    let symbol = required(fields[0], "symbol")?;

    let side = Side::from_code(fields[1]).ok_or_else(|| DecodeError::InvalidField {
        field: "side",
        value: fields[1].to_string(),
    })?;

    let row: u32 = parse_required(fields[2], "row")?;
    if row == 0 {
        return Err(DecodeError::InvalidField {
            field: "row",
            value: fields[2].to_string(),
        });
    }

    let price = Decimal::parse_field(fields[3]).ok_or_else(|| DecodeError::InvalidField {
        field: "price",
        value: fields[3].to_string(),
    })?;
    let lots: i64 = parse_required(fields[4], "lots")?;
    let orders: i64 = parse_required(fields[5], "orders")?;
    let stream_time = fields[6].trim();
    let depth_size = announced_depth_size(fields[7])?
        .or_else(|| ctx.store.security_depth_size(symbol))
        .unwrap_or_else(|| conventional_depth_size(symbol));

    let level = DepthLevel {
        price,
        lots,
        orders,
    };
    let depth = ctx.store.apply_depth(
        symbol,
        || depth_size,
        row - 1,
        side,
        level,
        stream_time,
        ctx.clock.now(),
    );

    debug!(symbol, ?side, row = depth.row_index, "Depth updated");
    Ok(Decoded::Depth {
        org_security: symbol.to_string(),
        side,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::super::decode;
    use super::super::test_support::{context, line};
    use super::*;
    use crate::domain::depth::{DEFAULT_DEPTH_SIZE, DERIVATIVE_DEPTH_SIZE};

    const BUY_ROW_1: [&str; 9] = ["AKBNK", "0", "1", "10.50", "100", "5", "09:30:00", "5", ""];

    #[test]
    fn update_sets_one_side_of_row() {
        let ctx = context();
        let decoded = decode(&ctx, &line("064", &BUY_ROW_1)).unwrap();

        let Decoded::Depth {
            org_security,
            side,
            depth,
        } = decoded
        else {
            panic!("expected depth");
        };
        assert_eq!(org_security, "AKBNK");
        assert_eq!(side, Side::Buy);
        assert_eq!(depth.row_index, 0);
        assert_eq!(depth.buy.price, Decimal::new(1050, 2));
        assert_eq!(depth.buy.lots, 100);
        assert_eq!(depth.buy.orders, 5);
        assert_eq!(depth.sell, DepthLevel::default());
        assert_eq!(depth.stream_time, "09:30:00");

        let quote = ctx.store.quote("AKBNK").unwrap();
        assert_eq!(quote.depth_size, 5);
        assert_eq!(quote.rows.len(), 5);
        assert!(quote.updated_at.is_some());
    }

    #[test]
    fn sell_update_leaves_buy_side() {
        let ctx = context();
        decode(&ctx, &line("062", &BUY_ROW_1)).unwrap();

        let mut sell = BUY_ROW_1;
        sell[1] = "1";
        sell[3] = "10,60";
        sell[4] = "250";
        decode(&ctx, &line("063", &sell)).unwrap();

        let row = ctx.store.depth_row("AKBNK", 0).unwrap();
        assert_eq!(row.buy.price, Decimal::new(1050, 2));
        assert_eq!(row.buy.lots, 100);
        assert_eq!(row.sell.price, Decimal::new(1060, 2));
        assert_eq!(row.sell.lots, 250);
    }

    #[test]
    fn book_size_falls_back_to_symbol_convention() {
        let ctx = context();
        let mut fields = BUY_ROW_1;
        fields[0] = "F_XU0301225";
        fields[7] = "0";
        decode(&ctx, &line("064", &fields)).unwrap();
        assert_eq!(
            ctx.store.quote("F_XU0301225").unwrap().depth_size,
            DERIVATIVE_DEPTH_SIZE
        );

        fields[0] = "GARAN";
        fields[7] = "";
        decode(&ctx, &line("064", &fields)).unwrap();
        assert_eq!(ctx.store.quote("GARAN").unwrap().depth_size, DEFAULT_DEPTH_SIZE);
    }

    #[test]
    fn book_size_comes_from_create_when_not_announced() {
        let ctx = context();
        let mut create = [
            "AKBNK", "1", "Akbank", "4", "N", "10", "12", "2", "101", "AKBNK", "", "",
        ];
        decode(&ctx, &line("001", &create)).unwrap();

        let mut fields = BUY_ROW_1;
        fields[7] = "";
        decode(&ctx, &line("064", &fields)).unwrap();

        let quote = ctx.store.quote("AKBNK").unwrap();
        assert_eq!(quote.depth_size, 10);
        assert_eq!(quote.rows.len(), 10);

        create[0] = "GARAN";
        decode(&ctx, &line("001", &create)).unwrap();
        fields[0] = "GARAN";
        fields[7] = "3";
        decode(&ctx, &line("064", &fields)).unwrap();
        assert_eq!(ctx.store.quote("GARAN").unwrap().depth_size, 3);
    }

    #[test]
    fn oversized_book_is_rejected() {
        let ctx = context();
        for size in ["3000000", "4294967295", "99999999999"] {
            let mut fields = BUY_ROW_1;
            fields[7] = size;
            assert!(matches!(
                decode(&ctx, &line("064", &fields)),
                Err(DecodeError::InvalidField { field: "depth_size", .. })
            ));
        }
        assert_eq!(ctx.store.quote_count(), 0);
    }

    #[test]
    fn row_number_is_one_based() {
        let ctx = context();
        let mut fields = BUY_ROW_1;
        fields[2] = "3";
        decode(&ctx, &line("064", &fields)).unwrap();

        assert_eq!(ctx.store.depth_row("AKBNK", 2).unwrap().buy.lots, 100);
        assert_eq!(ctx.store.depth_row("AKBNK", 0).unwrap().buy.lots, 0);
    }

    #[test]
    fn row_zero_is_rejected() {
        let ctx = context();
        let mut fields = BUY_ROW_1;
        fields[2] = "0";
        assert!(matches!(
            decode(&ctx, &line("064", &fields)),
            Err(DecodeError::InvalidField { field: "row", .. })
        ));
        assert_eq!(ctx.store.quote_count(), 0);
    }

    #[test]
    fn bad_side_is_rejected() {
        let ctx = context();
        let mut fields = BUY_ROW_1;
        fields[1] = "2";
        assert!(matches!(
            decode(&ctx, &line("064", &fields)),
            Err(DecodeError::InvalidField { field: "side", .. })
        ));
        assert_eq!(ctx.store.quote_count(), 0);
    }

    #[test]
    fn bad_price_is_rejected() {
        let ctx = context();
        let mut fields = BUY_ROW_1;
        fields[3] = "ten";
        assert!(matches!(
            decode(&ctx, &line("064", &fields)),
            Err(DecodeError::InvalidField { field: "price", .. })
        ));
        assert_eq!(ctx.store.quote_count(), 0);
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let ctx = context();
        assert!(matches!(
            decode(&ctx, &line("064", &BUY_ROW_1[..8])),
            Err(DecodeError::FieldCount { expected: 9, actual: 8, .. })
        ));
    }
}
