use crate::{
    error::TraverseError,
    expr::{Expression, FilterOp},
};

///
/// Tokens
///

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Name(String),
    Literal(String),
    Dot,
    LBracket,
    RBracket,
}

fn lex(input: &str) -> Result<Vec<Token>, TraverseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '"' => {
                chars.next();
                let mut escaped = false;
                let end = loop {
                    match chars.next() {
                        Some((i, '"')) if !escaped => break i,
                        Some((_, '\\')) if !escaped => escaped = true,
                        Some(_) => escaped = false,
                        None => {
                            return Err(TraverseError::invalid_path(
                                input,
                                "unterminated string literal",
                            ));
                        }
                    }
                };
                tokens.push(Token::Literal(input[start..=end].to_string()));
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                        end = i;
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(input[start..=end].to_string()));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut end = start;
                chars.next();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i;
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Literal(input[start..=end].to_string()));
            }
            other => {
                return Err(TraverseError::invalid_path(
                    input,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

///
/// Parser
///
/// Recursive descent over the token stream. Path segments and filter
/// predicates are collected flat in traversal order, then linked through
/// `next` back to front.
///

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

pub(crate) fn parse(input: &str) -> Result<Expression, TraverseError> {
    let tokens = lex(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };

    let nodes = parser.parse_query()?;
    link(nodes).ok_or_else(|| TraverseError::invalid_path(input, "empty path"))
}

// Fold the flat node list into a next-linked chain.
fn link(nodes: Vec<Expression>) -> Option<Expression> {
    nodes.into_iter().rev().fold(None, |tail, mut node| {
        node.set_next(tail);
        Some(node)
    })
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn path_err(&self, detail: impl Into<String>) -> TraverseError {
        TraverseError::invalid_path(self.input, detail)
    }

    fn filter_err(&self, detail: impl Into<String>) -> TraverseError {
        TraverseError::invalid_filter(self.input, detail)
    }

    fn expect_name(&mut self) -> Result<String, TraverseError> {
        match self.bump() {
            Some(Token::Name(name)) => Ok(name),
            _ => Err(self.path_err("expected an attribute name")),
        }
    }

    fn parse_query(&mut self) -> Result<Vec<Expression>, TraverseError> {
        let mut nodes = vec![Expression::path(self.expect_name()?)];
        let mut seen_filter = false;

        loop {
            match self.peek() {
                None => break,
                Some(Token::Dot) => {
                    self.bump();
                    nodes.push(Expression::path(self.expect_name()?));
                }
                Some(Token::LBracket) => {
                    if seen_filter {
                        return Err(self.filter_err("at most one filter segment is supported"));
                    }
                    self.bump();
                    self.parse_filter(&mut nodes)?;
                    seen_filter = true;
                }
                Some(_) => return Err(self.path_err("expected '.' or '['")),
            }
        }

        Ok(nodes)
    }

    // One predicate, or an and/or chain of predicates, up to the closing
    // bracket. Chained predicates are linked through `next`; only the
    // first carries the filter-root mark.
    fn parse_filter(&mut self, nodes: &mut Vec<Expression>) -> Result<(), TraverseError> {
        let mut first = true;

        loop {
            let mut predicate = self.parse_predicate()?;
            if first {
                predicate = predicate.mark_filter_root();
            }
            nodes.push(predicate);

            match self.bump() {
                Some(Token::RBracket) => return Ok(()),
                Some(Token::Name(word))
                    if matches!(
                        FilterOp::from_word(&word),
                        Some(FilterOp::And | FilterOp::Or)
                    ) =>
                {
                    first = false;
                }
                _ => return Err(self.filter_err("expected 'and', 'or' or ']'")),
            }
        }
    }

    fn parse_predicate(&mut self) -> Result<Expression, TraverseError> {
        let left = self.parse_attr_path()?;

        let word = match self.bump() {
            Some(Token::Name(word)) => word,
            _ => return Err(self.filter_err("expected a filter operator")),
        };
        let op = FilterOp::from_word(&word)
            .ok_or_else(|| self.filter_err(format!("unknown operator '{word}'")))?;

        match op {
            FilterOp::And | FilterOp::Or => {
                Err(self.filter_err(format!("'{op}' is not a comparison operator")))
            }
            FilterOp::Pr => Ok(Expression::operator(op, left, None)),
            _ => {
                let literal = self.parse_literal()?;
                Ok(Expression::operator(op, left, Some(literal)))
            }
        }
    }

    // Left operand: a dotted attribute path, linked through `next`.
    fn parse_attr_path(&mut self) -> Result<Expression, TraverseError> {
        let mut segments = vec![Expression::path(self.expect_name()?)];
        while self.peek() == Some(&Token::Dot) {
            self.bump();
            segments.push(Expression::path(self.expect_name()?));
        }

        link(segments).ok_or_else(|| self.filter_err("expected an attribute path"))
    }

    fn parse_literal(&mut self) -> Result<Expression, TraverseError> {
        match self.bump() {
            Some(Token::Literal(token)) => Ok(Expression::literal(token)),
            // bare words true/false/null are literals in value position
            Some(Token::Name(word))
                if matches!(word.as_str(), "true" | "false" | "null") =>
            {
                Ok(Expression::literal(word))
            }
            _ => Err(self.filter_err("expected a literal value")),
        }
    }
}
