//! News headline (`020`), body (`021`) and delete (`022`).
//!
//! Headlines and bodies are published as they arrive; nothing here
//! correlates the two halves of a story.

use tracing::debug;

use super::{DecodeError, Decoded, DecoderContext, min_fields, required};
use crate::domain::news::{News, NewsKind};
use crate::infrastructure::feed::protocol::{FeedLine, trim_trailing_empty};

const HEADLINE_MIN_FIELDS: usize = 8;
const BODY_MIN_FIELDS: usize = 2;
const RELATED_START: usize = 7;

/// Headline with metadata and related symbols.
pub(super) fn decode_headline(
    ctx: &DecoderContext,
    line: &FeedLine,
) -> Result<Decoded, DecodeError> {
    let fields = line.fields();
    min_fields(&fields, line, HEADLINE_MIN_FIELDS)?;
    let news_id = required(fields[0], "news_id")?;

    let mut news = News::new(news_id, NewsKind::Headline, ctx.clock.now());
    news.date = fields[1].trim().to_string();
    news.time = fields[2].trim().to_string();
    news.source = fields[3].trim().to_string();
    news.category = fields[4].trim().to_string();
    news.priority = fields[5].trim().to_string();
    news.headline = fields[6].trim().to_string();
    news.related_symbols = related_symbols(&fields);

    debug!(
        news_id,
        related = news.related_symbols.len(),
        "News headline"
    );
    Ok(Decoded::News(news))
}

/// Single-stock headlines carry one symbol in field 7, optionally followed
/// by an empty 9th field. Multi-stock headlines spread the list over every
/// field from 7 onward.
fn related_symbols(fields: &[&str]) -> Vec<String> {
    let single = fields.len() == HEADLINE_MIN_FIELDS
        || (fields.len() == HEADLINE_MIN_FIELDS + 1 && fields[HEADLINE_MIN_FIELDS].is_empty());

    let joined = if single {
        fields[RELATED_START].trim().to_string()
    } else {
        let joined = fields[RELATED_START..].join(",");
        joined.trim_end_matches(',').to_string()
    };

    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body text: every field after the id and part-length fields.
pub(super) fn decode_body(ctx: &DecoderContext, line: &FeedLine) -> Result<Decoded, DecodeError> {
    let mut fields = line.fields();
    trim_trailing_empty(&mut fields);
    min_fields(&fields, line, BODY_MIN_FIELDS)?;
    let news_id = required(fields[0], "news_id")?;

    let mut news = News::new(news_id, NewsKind::Body, ctx.clock.now());
    news.content = fields[BODY_MIN_FIELDS..].concat();

    debug!(news_id, length = news.content.len(), "News body");
    Ok(Decoded::News(news))
}

/// Parsed for validation only; deletions are not propagated.
pub(super) fn decode_delete(line: &FeedLine) -> Result<Decoded, DecodeError> {
    let fields = line.fields();
    let news_id = required(fields.first().copied().unwrap_or_default(), "news_id")?;
    debug!(news_id, "News delete ignored");
    Ok(Decoded::Ignored)
}

#[cfg(test)]
mod tests {
    use super::super::decode;
    use super::super::test_support::{context, line};
    use super::*;

    fn news_of(decoded: Decoded) -> News {
        match decoded {
            Decoded::News(news) => news,
            other => panic!("expected news, got {other:?}"),
        }
    }

    const HEADER: [&str; 7] = [
        "N1001", "20261019", "10:00:00", "KAP", "ODA", "1", "Temettü dağıtımı",
    ];

    fn headline(related: &[&'static str]) -> Vec<&'static str> {
        let mut fields = HEADER.to_vec();
        fields.extend_from_slice(related);
        fields
    }

    #[test]
    fn single_stock_headline() {
        let ctx = context();
        let news = news_of(decode(&ctx, &line("020", &headline(&["AKBNK"]))).unwrap());

        assert_eq!(news.kind, NewsKind::Headline);
        assert_eq!(news.news_id, "N1001");
        assert_eq!(news.headline, "Temettü dağıtımı");
        assert_eq!(news.related_symbols, ["AKBNK"]);
        assert!(!news.is_multi_stock());
    }

    #[test]
    fn single_stock_headline_with_trailing_empty() {
        let ctx = context();
        let news = news_of(decode(&ctx, &line("020", &headline(&["AKBNK", ""]))).unwrap());
        assert_eq!(news.related_symbols, ["AKBNK"]);
    }

    #[test]
    fn multi_stock_headline() {
        let ctx = context();
        let news = news_of(
            decode(&ctx, &line("020", &headline(&["AKBNK", "GARAN", "YKBNK", ""]))).unwrap(),
        );
        assert_eq!(news.related_symbols, ["AKBNK", "GARAN", "YKBNK"]);
        assert!(news.is_multi_stock());
    }

    #[test]
    fn short_headline_is_rejected() {
        let ctx = context();
        let err = decode(&ctx, &line("020", &HEADER)).unwrap_err();
        assert!(matches!(err, DecodeError::TooFewFields { minimum: 8, actual: 7, .. }));
    }

    #[test]
    fn body_concatenates_parts() {
        let ctx = context();
        let news = news_of(
            decode(
                &ctx,
                &line("021", &["N1001", "42", "Şirket yönetim ", "kurulu kararı", ""]),
            )
            .unwrap(),
        );
        assert_eq!(news.kind, NewsKind::Body);
        assert_eq!(news.content, "Şirket yönetim kurulu kararı");
    }

    #[test]
    fn body_without_id_is_rejected() {
        let ctx = context();
        let err = decode(&ctx, &line("021", &["", "12", "some text"])).unwrap_err();
        assert_eq!(err, DecodeError::MissingField { field: "news_id" });
    }

    #[test]
    fn delete_is_ignored() {
        let ctx = context();
        let decoded = decode(&ctx, &line("022", &["N1001", "", "", ""])).unwrap();
        assert!(matches!(decoded, Decoded::Ignored));
    }
}
