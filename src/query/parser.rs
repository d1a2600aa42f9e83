//! 短语感知的查询解析器（经典 Lucene 语法子集）。

use crate::core::SearchError;
use crate::query::analyzer::{analyze, normalize_expanded};
use crate::query::ast::{Clause, Occur, Operator, Query, RewriteMethod};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ParserConfig {
    pub default_field: String,
    pub default_operator: Operator,
    pub allow_leading_wildcard: bool,
    pub rewrite: RewriteMethod,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_field: "content".to_string(),
            default_operator: Operator::Or,
            allow_leading_wildcard: false,
            rewrite: RewriteMethod::ConstantScore,
        }
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Word { text: String, wildcard: bool },
    Phrase { text: String, slop: u32 },
    Field(String),
    LParen,
    RParen,
    Plus,
    Minus,
    Bang,
    And,
    Or,
    Not,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Conj {
    None,
    And,
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// 解析后可通过 `is_phrase_query` 得知是否出现过短语（带引号的多词，或切分成多词的单个词）。
pub struct PhraseDetectingParser {
    config: ParserConfig,
    tokens: Vec<Token>,
    index: usize,
    phrase_detected: bool,
}

impl PhraseDetectingParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            tokens: Vec::new(),
            index: 0,
            phrase_detected: false,
        }
    }

    /// 带 slop 的短语（`"a b"~3`）同样算作短语
    pub fn is_phrase_query(&self) -> bool {
        self.phrase_detected
    }

    pub fn parse(&mut self, input: &str) -> Result<Query, SearchError> {
        self.tokens = tokenize(input).map_err(|reason| SearchError::new(input, reason))?;
        self.index = 0;
        self.phrase_detected = false;

        if self.tokens.is_empty() {
            return Err(SearchError::new(input, "query is empty"));
        }

        let field = self.config.default_field.clone();
        let query = self
            .parse_query(&field)
            .map_err(|reason| SearchError::new(input, reason))?;
        if let Some(token) = self.peek() {
            return Err(SearchError::new(
                input,
                format!("unexpected token near byte {}", token.position),
            ));
        }
        Ok(query.unwrap_or(Query::Boolean {
            clauses: Vec::new(),
        }))
    }

    /// Query := Modifiers Clause (Conjunction Modifiers Clause)*
    fn parse_query(&mut self, field: &str) -> Result<Option<Query>, String> {
        let mut clauses = Vec::new();
        let mut first: Option<Query> = None;

        if let Some(token) = self.peek().filter(|t| matches!(t.kind, TokenKind::And | TokenKind::Or)) {
            return Err(format!("operator without left operand near byte {}", token.position));
        }

        let mods = self.parse_modifiers();
        let q = self.parse_clause(field)?;
        if mods == Modifier::None {
            first = q.clone();
        }
        self.add_clause(&mut clauses, Conj::None, mods, q);

        loop {
            if self.is_end() || self.peek_is(&TokenKind::RParen) {
                break;
            }
            let conj = self.parse_conjunction();
            let mods = self.parse_modifiers();
            let q = self.parse_clause(field)?;
            self.add_clause(&mut clauses, conj, mods, q);
        }

        if clauses.len() == 1 && first.is_some() {
            return Ok(first);
        }
        if clauses.is_empty() {
            return Ok(None);
        }
        Ok(Some(Query::Boolean { clauses }))
    }

    fn add_clause(&self, clauses: &mut Vec<Clause>, conj: Conj, mods: Modifier, q: Option<Query>) {
        if conj == Conj::And {
            if let Some(last) = clauses.last_mut() {
                if last.occur != Occur::MustNot {
                    last.occur = Occur::Must;
                }
            }
        }
        if self.config.default_operator == Operator::And && conj == Conj::Or {
            if let Some(last) = clauses.last_mut() {
                if last.occur != Occur::MustNot {
                    last.occur = Occur::Should;
                }
            }
        }

        // 被分析器过滤为空的子句只影响相邻子句，不加入结果
        let Some(query) = q else { return };

        let prohibited = mods == Modifier::Prohibited;
        let required = match self.config.default_operator {
            Operator::Or => mods == Modifier::Required || (conj == Conj::And && !prohibited),
            Operator::And => !prohibited && conj != Conj::Or,
        };
        let occur = if prohibited {
            Occur::MustNot
        } else if required {
            Occur::Must
        } else {
            Occur::Should
        };
        clauses.push(Clause { occur, query });
    }

    fn parse_conjunction(&mut self) -> Conj {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::And) => {
                self.index += 1;
                Conj::And
            }
            Some(TokenKind::Or) => {
                self.index += 1;
                Conj::Or
            }
            _ => Conj::None,
        }
    }

    fn parse_modifiers(&mut self) -> Modifier {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Plus) => {
                self.index += 1;
                Modifier::Required
            }
            Some(TokenKind::Minus | TokenKind::Bang | TokenKind::Not) => {
                self.index += 1;
                Modifier::Prohibited
            }
            _ => Modifier::None,
        }
    }

    /// Clause := [field ':'] (Term | Phrase | '(' Query ')')
    fn parse_clause(&mut self, default_field: &str) -> Result<Option<Query>, String> {
        let mut field = default_field.to_string();
        if let Some(TokenKind::Field(name)) = self.peek().map(|t| &t.kind) {
            field = name.clone();
            self.index += 1;
        }

        let Some(token) = self.next() else {
            return Err("expected query term but reached end of query".to_string());
        };

        match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_query(&field)?;
                if !self.peek_is(&TokenKind::RParen) {
                    return Err(format!("missing closing ')' for '(' at byte {}", token.position));
                }
                self.index += 1;
                Ok(inner)
            }
            TokenKind::Word { text, wildcard } => {
                if wildcard {
                    self.wildcard_query(&field, &text, token.position).map(Some)
                } else {
                    Ok(self.field_query(&field, &text, 0))
                }
            }
            TokenKind::Phrase { text, slop } => Ok(self.field_query(&field, &text, slop)),
            TokenKind::RParen => Err(format!("unexpected ')' near byte {}", token.position)),
            _ => Err(format!("expected query term near byte {}", token.position)),
        }
    }

    /// 分析后：0 个词 → None，1 个词 → Term，多个词 → Phrase
    fn field_query(&mut self, field: &str, text: &str, slop: u32) -> Option<Query> {
        let mut terms = analyze(text);
        match terms.len() {
            0 => None,
            1 => Some(Query::Term {
                field: field.to_string(),
                text: terms.remove(0),
            }),
            _ => {
                self.phrase_detected = true;
                Some(Query::Phrase {
                    field: field.to_string(),
                    terms,
                    slop,
                })
            }
        }
    }

    fn wildcard_query(&self, field: &str, text: &str, position: usize) -> Result<Query, String> {
        let pattern = normalize_expanded(text);
        if !self.config.allow_leading_wildcard && pattern.starts_with(['*', '?']) {
            return Err(format!(
                "leading wildcard not allowed near byte {position}: {text}"
            ));
        }

        // 只有末尾一个 `*`、其余无通配符时才是前缀查询
        if let Some(body) = pattern.strip_suffix('*') {
            if !body.is_empty() && !body.contains(['*', '?']) {
                return Ok(Query::Prefix {
                    field: field.to_string(),
                    prefix: body.to_string(),
                    rewrite: self.config.rewrite,
                });
            }
        }
        Ok(Query::Wildcard {
            field: field.to_string(),
            pattern,
            rewrite: self.config.rewrite,
        })
    }

    fn is_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        matches!(self.peek(), Some(t) if &t.kind == kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn char_at(input: &str, cursor: usize) -> Option<char> {
    input[cursor..].chars().next()
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;

    while let Some(ch) = char_at(input, cursor) {
        if ch.is_whitespace() {
            cursor += ch.len_utf8();
            continue;
        }

        let position = cursor;
        let simple = match ch {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '!' => Some(TokenKind::Bang),
            _ => None,
        };
        if let Some(kind) = simple {
            tokens.push(Token { kind, position });
            cursor += 1;
            continue;
        }

        if input[cursor..].starts_with("&&") || input[cursor..].starts_with("||") {
            let kind = if ch == '&' { TokenKind::And } else { TokenKind::Or };
            tokens.push(Token { kind, position });
            cursor += 2;
            continue;
        }

        if ch == '"' {
            let (text, mut next) = consume_quoted_phrase(input, cursor)?;
            let mut slop = 0u32;
            if input[next..].starts_with('~') {
                next += 1;
                let digits: String = input[next..].chars().take_while(|c| c.is_ascii_digit()).collect();
                next += digits.len();
                slop = digits.parse().unwrap_or(0);
            }
            tokens.push(Token {
                kind: TokenKind::Phrase { text, slop },
                position,
            });
            cursor = next;
            continue;
        }

        let (kind, next) = consume_word(input, cursor)?;
        tokens.push(Token { kind, position });
        cursor = next;
    }

    Ok(tokens)
}

fn consume_word(input: &str, start: usize) -> Result<(TokenKind, usize), String> {
    let mut cursor = start;
    let mut text = String::new();
    let mut wildcard = false;
    let mut escaped_any = false;

    while let Some(ch) = char_at(input, cursor) {
        if ch == '\\' {
            let Some(escaped) = char_at(input, cursor + 1) else {
                return Err(format!("dangling escape at byte {cursor}"));
            };
            text.push(escaped);
            escaped_any = true;
            cursor += 1 + escaped.len_utf8();
            continue;
        }
        if ch.is_whitespace() || matches!(ch, '(' | ')' | '"') {
            break;
        }
        if ch == ':' {
            if text.is_empty() {
                return Err(format!("missing field name before ':' at byte {cursor}"));
            }
            let after = cursor + 1;
            match char_at(input, after) {
                Some(c) if !c.is_whitespace() => return Ok((TokenKind::Field(text), after)),
                _ => return Err(format!("missing value after '{text}:' at byte {cursor}")),
            }
        }
        if matches!(ch, '*' | '?') {
            wildcard = true;
        }
        text.push(ch);
        cursor += ch.len_utf8();
    }

    let kind = match text.as_str() {
        "AND" if !escaped_any => TokenKind::And,
        "OR" if !escaped_any => TokenKind::Or,
        "NOT" if !escaped_any => TokenKind::Not,
        _ => TokenKind::Word { text, wildcard },
    };
    Ok((kind, cursor))
}

fn consume_quoted_phrase(input: &str, start: usize) -> Result<(String, usize), String> {
    let mut cursor = start + 1;
    let mut phrase = String::new();
    let mut escaped = false;

    while let Some(ch) = char_at(input, cursor) {
        cursor += ch.len_utf8();

        if escaped {
            phrase.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            return Ok((phrase, cursor));
        }
        phrase.push(ch);
    }

    Err(format!("missing closing quote for '\"' at byte {start}"))
}
