use std::fmt;

use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// 默认布尔运算符
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    And,
    Or,
}

/// 通配 / 前缀查询展开方式：打分（保留相关性排序）或常量分
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMethod {
    #[default]
    ScoringBoolean,
    ConstantScore,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub occur: Occur,
    pub query: Query,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    Term {
        field: String,
        text: String,
    },
    Phrase {
        field: String,
        terms: Vec<String>,
        slop: u32,
    },
    Prefix {
        field: String,
        prefix: String,
        rewrite: RewriteMethod,
    },
    Wildcard {
        field: String,
        pattern: String,
        rewrite: RewriteMethod,
    },
    Boolean {
        clauses: Vec<Clause>,
    },
}

impl Query {
    pub fn is_phrase(&self) -> bool {
        matches!(self, Query::Phrase { .. })
    }

    pub fn clauses(&self) -> &[Clause] {
        match self {
            Query::Boolean { clauses } => clauses,
            _ => &[],
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { field, text } => write!(f, "{field}:{text}"),
            Query::Phrase { field, terms, slop } => {
                write!(f, "{field}:\"{}\"", terms.join(" "))?;
                if *slop > 0 {
                    write!(f, "~{slop}")?;
                }
                Ok(())
            }
            Query::Prefix { field, prefix, .. } => write!(f, "{field}:{prefix}*"),
            Query::Wildcard { field, pattern, .. } => write!(f, "{field}:{pattern}"),
            Query::Boolean { clauses } => {
                for (i, c) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match c.occur {
                        Occur::Must => f.write_str("+")?,
                        Occur::MustNot => f.write_str("-")?,
                        Occur::Should => {}
                    }
                    if matches!(c.query, Query::Boolean { .. }) {
                        write!(f, "({})", c.query)?;
                    } else {
                        write!(f, "{}", c.query)?;
                    }
                }
                Ok(())
            }
        }
    }
}
