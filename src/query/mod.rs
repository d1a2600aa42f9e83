pub mod analyzer;
pub mod ast;
pub mod builder;
pub mod parser;

pub use ast::{Clause, Occur, Operator, Query, RewriteMethod};
pub use builder::{build_query, build_query_in, ParsedQuery};
pub use parser::{ParserConfig, PhraseDetectingParser};
