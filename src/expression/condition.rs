//! Boolean conditions for `when` branches.
//!
//! Grammar:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | compare
//! compare := operand ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) operand )?
//! operand := "(" or ")" | literal | ${..} | @{..} | %{..}
//! literal := 'text' | "text" | number | true | false | null
//! ```
//!
//! Comparisons coerce numeric strings to numbers; everything else compares as text.

use std::cmp::Ordering;

use serde_json::Value;

use super::token::{scan_reference, Token};
use super::{value_to_text, TokenEvaluator};
use crate::error::{ActivityError, ActivityResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Reference(Token),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare(CompareOp, Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Op(CompareOp),
    Literal(Value),
    Reference(Token),
}

/// A parsed boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    root: Node,
}

impl Condition {
    pub fn parse(source: &str) -> ActivityResult<Self> {
        let lexemes = lex(source)?;
        let mut parser = Parser {
            lexemes: &lexemes,
            pos: 0,
            source,
        };
        let root = parser.parse_or()?;
        if parser.pos != lexemes.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, evaluator: &TokenEvaluator<'_>) -> bool {
        is_truthy(&eval(&self.root, evaluator))
    }
}

fn eval(node: &Node, evaluator: &TokenEvaluator<'_>) -> Value {
    match node {
        Node::Literal(value) => value.clone(),
        Node::Reference(token) => evaluator.resolve(token),
        Node::Not(inner) => Value::Bool(!is_truthy(&eval(inner, evaluator))),
        Node::And(left, right) => Value::Bool(
            is_truthy(&eval(left, evaluator)) && is_truthy(&eval(right, evaluator)),
        ),
        Node::Or(left, right) => Value::Bool(
            is_truthy(&eval(left, evaluator)) || is_truthy(&eval(right, evaluator)),
        ),
        Node::Compare(op, left, right) => {
            Value::Bool(compare(*op, &eval(left, evaluator), &eval(right, evaluator)))
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    if left.is_null() || right.is_null() {
        return false;
    }
    match (as_number(left), as_number(right)) {
        (Some(x), Some(y)) => x == y,
        _ => value_to_text(left) == value_to_text(right),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    let ordering = || -> Option<Ordering> {
        if left.is_null() || right.is_null() {
            return None;
        }
        match (as_number(left), as_number(right)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(value_to_text(left).cmp(&value_to_text(right))),
        }
    };
    match op {
        CompareOp::Eq => loosely_equal(left, right),
        CompareOp::Ne => !loosely_equal(left, right),
        CompareOp::Lt => ordering() == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering() == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn lex(source: &str) -> ActivityResult<Vec<Lexeme>> {
    let mut lexemes = Vec::new();
    let mut pos = 0;

    while let Some(ch) = source[pos..].chars().next() {
        let rest = &source[pos..];
        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }
        if let Some((token, end)) = scan_reference(source, pos) {
            lexemes.push(Lexeme::Reference(token));
            pos = end;
            continue;
        }

        let (lexeme, width) = match ch {
            '(' => (Lexeme::LParen, 1),
            ')' => (Lexeme::RParen, 1),
            '!' if rest.starts_with("!=") => (Lexeme::Op(CompareOp::Ne), 2),
            '!' => (Lexeme::Not, 1),
            '=' if rest.starts_with("==") => (Lexeme::Op(CompareOp::Eq), 2),
            '<' if rest.starts_with("<=") => (Lexeme::Op(CompareOp::Le), 2),
            '<' => (Lexeme::Op(CompareOp::Lt), 1),
            '>' if rest.starts_with(">=") => (Lexeme::Op(CompareOp::Ge), 2),
            '>' => (Lexeme::Op(CompareOp::Gt), 1),
            '&' if rest.starts_with("&&") => (Lexeme::And, 2),
            '|' if rest.starts_with("||") => (Lexeme::Or, 2),
            '\'' | '"' => lex_string(source, rest, ch)?,
            c if c.is_ascii_digit() || (c == '-' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) => {
                lex_number(source, rest)?
            }
            c if c.is_ascii_alphabetic() => {
                let word: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                let value = match word.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    other => {
                        return Err(ActivityError::Expression(format!(
                            "unexpected identifier '{other}' in condition '{source}'"
                        )))
                    }
                };
                let width = word.len();
                (Lexeme::Literal(value), width)
            }
            other => {
                return Err(ActivityError::Expression(format!(
                    "unexpected character '{other}' in condition '{source}'"
                )))
            }
        };
        lexemes.push(lexeme);
        pos += width;
    }
    Ok(lexemes)
}

fn lex_string(source: &str, rest: &str, quote: char) -> ActivityResult<(Lexeme, usize)> {
    let mut text = String::new();
    let mut escaped = false;
    for (offset, ch) in rest.char_indices().skip(1) {
        if escaped {
            text.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Ok((Lexeme::Literal(Value::String(text)), offset + 1));
        } else {
            text.push(ch);
        }
    }
    Err(ActivityError::Expression(format!(
        "unterminated string literal in condition '{source}'"
    )))
}

fn lex_number(source: &str, rest: &str) -> ActivityResult<(Lexeme, usize)> {
    let width = rest
        .char_indices()
        .skip(1)
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(offset, _)| offset)
        .unwrap_or(rest.len());
    let text = &rest[..width];
    let value = if text.contains('.') {
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    };
    value
        .map(|value| (Lexeme::Literal(value), width))
        .ok_or_else(|| {
            ActivityError::Expression(format!("invalid number '{text}' in condition '{source}'"))
        })
}

struct Parser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn error(&self, detail: &str) -> ActivityError {
        ActivityError::Expression(format!(
            "{detail} at position {} in condition '{}'",
            self.pos, self.source
        ))
    }

    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        self.pos += 1;
        lexeme
    }

    fn parse_or(&mut self) -> ActivityResult<Node> {
        let mut node = self.parse_and()?;
        while self.peek() == Some(&Lexeme::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            node = Node::Or(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> ActivityResult<Node> {
        let mut node = self.parse_unary()?;
        while self.peek() == Some(&Lexeme::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            node = Node::And(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> ActivityResult<Node> {
        if self.peek() == Some(&Lexeme::Not) {
            self.pos += 1;
            return Ok(Node::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> ActivityResult<Node> {
        let left = self.parse_operand()?;
        if let Some(Lexeme::Op(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_operand()?;
            return Ok(Node::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> ActivityResult<Node> {
        match self.advance() {
            Some(Lexeme::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Lexeme::RParen) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Some(Lexeme::Literal(value)) => Ok(Node::Literal(value)),
            Some(Lexeme::Reference(token)) => Ok(Node::Reference(token)),
            Some(_) => Err(self.error("expected an operand")),
            None => Err(self.error("unexpected end of condition")),
        }
    }
}
