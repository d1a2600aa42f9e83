use serde::Serialize;

use crate::core::SearchError;
use crate::query::ast::{Operator, Query, RewriteMethod};
use crate::query::parser::{ParserConfig, PhraseDetectingParser};

/// 用户一次搜索提交对应的解析结果
#[derive(Clone, Debug, Serialize)]
pub struct ParsedQuery {
    pub query: Query,
    pub is_phrase_query: bool,
}

/// 构建查询：允许前导通配符，通配展开保留打分，默认 AND（`use_or_default` 时为 OR）。
pub fn build_query(text: &str, use_or_default: bool) -> Result<ParsedQuery, SearchError> {
    build_query_in(text, use_or_default, "content")
}

/// 同 [`build_query`]，但指定默认字段
pub fn build_query_in(
    text: &str,
    use_or_default: bool,
    default_field: &str,
) -> Result<ParsedQuery, SearchError> {
    let mut parser = PhraseDetectingParser::new(ParserConfig {
        default_field: default_field.to_string(),
        default_operator: if use_or_default {
            Operator::Or
        } else {
            Operator::And
        },
        allow_leading_wildcard: true,
        rewrite: RewriteMethod::ScoringBoolean,
    });

    let query = parser.parse(text).map_err(|e| {
        tracing::debug!("Query rejected: {}", e.reason);
        e
    })?;
    Ok(ParsedQuery {
        query,
        is_phrase_query: parser.is_phrase_query(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::Occur;

    fn occurs(q: &ParsedQuery) -> Vec<Occur> {
        q.query.clauses().iter().map(|c| c.occur).collect()
    }

    #[test]
    fn quoted_words_are_phrase() {
        let q = build_query("\"hello world\"", false).unwrap();
        assert!(q.is_phrase_query);
        assert!(q.query.is_phrase());

        assert!(!build_query("hello world", false).unwrap().is_phrase_query);
    }

    #[test]
    fn default_operator_flag() {
        let and = build_query("foo bar", false).unwrap();
        assert_eq!(occurs(&and), vec![Occur::Must, Occur::Must]);

        let or = build_query("foo bar", true).unwrap();
        assert_eq!(occurs(&or), vec![Occur::Should, Occur::Should]);
    }

    #[test]
    fn negation_and_grouping() {
        let q = build_query("report -draft", true).unwrap();
        assert_eq!(occurs(&q), vec![Occur::Should, Occur::MustNot]);

        let q = build_query("(alpha OR beta) NOT gamma", false).unwrap();
        assert_eq!(q.query.to_string(), "+(content:alpha content:beta) -content:gamma");
    }

    #[test]
    fn leading_wildcard_uses_scoring_rewrite() {
        let q = build_query("*budget", false).unwrap();
        match q.query {
            Query::Wildcard { pattern, rewrite, .. } => {
                assert_eq!(pattern, "*budget");
                assert_eq!(rewrite, RewriteMethod::ScoringBoolean);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_query_keeps_original_text() {
        let err = build_query("\"unbalanced quote", false).unwrap_err();
        assert_eq!(err.query, "\"unbalanced quote");
        assert!(err.to_string().contains("\"unbalanced quote"));
    }

    #[test]
    fn custom_default_field() {
        let q = build_query_in("x", false, "title").unwrap();
        assert_eq!(q.query.to_string(), "title:x");
    }
}
