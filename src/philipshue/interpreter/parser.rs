//! Recursive-descent parser for the command grammar.
//!
//! ```text
//! command  := postfix EOF
//! postfix  := primary ( '.' IDENT | '[' expr ']' | '(' args? ')' )*
//! primary  := IDENT | literal | '(' expr ')' | tuple | list | dict
//! literal  := INT | FLOAT | STRING | True | False | None | '-' number
//! args     := arg (',' arg)* ','?
//! arg      := IDENT '=' expr | '**' expr | expr
//! ```

use super::lexer::{tokenize, Token, TokenKind};
use serde_json::Value;

/// Deepest nesting of brackets and calls a command may use.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Literal(Value),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Arg>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
    Splat(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// 1-based character column.
    pub column: usize,
}

impl ParseError {
    fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let column = source[..offset.min(source.len())].chars().count() + 1;
        Self {
            message: message.into(),
            column,
        }
    }
}

/// Parses one command line into an expression.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source).map_err(|e| ParseError::at(source, e.offset, e.message))?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    parser.expect(&TokenKind::Eof)?;
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        // Token streams always end with Eof, and the parser never advances past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].start
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if kind != TokenKind::Eof {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {kind}")))
        }
    }

    fn unexpected(&self, hint: &str) -> ParseError {
        let found = self.peek();
        let message = if *found == TokenKind::Eof {
            format!("unexpected end of input, {hint}")
        } else {
            format!("unexpected {found}, {hint}")
        };
        ParseError::at(self.source, self.offset(), message)
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        if self.depth == MAX_DEPTH {
            return Err(ParseError::at(
                self.source,
                self.offset(),
                "expression nested too deeply",
            ));
        }
        self.depth += 1;
        let expr = self.postfix();
        self.depth -= 1;
        expr
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let TokenKind::Ident(name) = self.peek().clone() else {
                        return Err(self.unexpected("expected a name after '.'"));
                    };
                    self.advance();
                    expr = Expr::Attr(Box::new(expr), name);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.args()?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "True" | "true" => Expr::Literal(Value::Bool(true)),
                    "False" | "false" => Expr::Literal(Value::Bool(false)),
                    "None" | "null" => Expr::Literal(Value::Null),
                    _ => Expr::Name(name),
                })
            }
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Value::from(n)))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Literal(Value::from(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::Minus => {
                self.advance();
                let literal = match *self.peek() {
                    TokenKind::Int(n) => Value::from(-n),
                    TokenKind::Float(n) => Value::from(-n),
                    _ => return Err(self.unexpected("expected a number after '-'")),
                };
                self.advance();
                Ok(Expr::Literal(literal))
            }
            TokenKind::LParen => {
                self.advance();
                if self.eat(&TokenKind::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.expr()?;
                if self.eat(&TokenKind::RParen) {
                    return Ok(first);
                }
                self.expect(&TokenKind::Comma)?;
                let mut items = vec![first];
                items.extend(self.sequence(&TokenKind::RParen)?);
                Ok(Expr::Tuple(items))
            }
            TokenKind::LBracket => {
                self.advance();
                Ok(Expr::List(self.sequence(&TokenKind::RBracket)?))
            }
            TokenKind::LBrace => {
                self.advance();
                self.dict()
            }
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    /// Comma-separated expressions up to and including `close`, trailing comma allowed.
    fn sequence(&mut self, close: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expr()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn dict(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(&TokenKind::RBrace) {
                return Ok(Expr::Dict(entries));
            }
            let key = self.expr()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.expr()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace)?;
                return Ok(Expr::Dict(entries));
            }
        }
    }

    fn args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        let mut seen_keyword = false;
        loop {
            if self.eat(&TokenKind::RParen) {
                return Ok(args);
            }
            let start = self.offset();
            let keyword_follows = *self.peek_at(1) == TokenKind::Equals;
            let arg = match self.peek().clone() {
                TokenKind::Ident(name) if keyword_follows => {
                    self.advance();
                    self.advance();
                    let duplicate = args
                        .iter()
                        .any(|a| matches!(a, Arg::Keyword(k, _) if *k == name));
                    if duplicate {
                        return Err(ParseError::at(
                            self.source,
                            start,
                            format!("keyword argument repeated: {name}"),
                        ));
                    }
                    seen_keyword = true;
                    Arg::Keyword(name, self.expr()?)
                }
                TokenKind::DoubleStar => {
                    self.advance();
                    seen_keyword = true;
                    Arg::Splat(self.expr()?)
                }
                _ => {
                    let expr = self.expr()?;
                    if seen_keyword {
                        return Err(ParseError::at(
                            self.source,
                            start,
                            "positional argument follows keyword argument",
                        ));
                    }
                    Arg::Positional(expr)
                }
            };
            args.push(arg);
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen)?;
                return Ok(args);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    fn lit(v: Value) -> Expr {
        Expr::Literal(v)
    }

    #[test]
    fn test_chained_calls() {
        let expr = parse("lights(1)('on', True)").unwrap();
        assert_eq!(
            expr,
            Expr::Call(
                Box::new(Expr::Call(
                    Box::new(name("lights")),
                    vec![Arg::Positional(lit(json!(1)))]
                )),
                vec![
                    Arg::Positional(lit(json!("on"))),
                    Arg::Positional(lit(json!(true)))
                ]
            )
        );
    }

    #[test]
    fn test_attributes_index_and_keywords() {
        let expr = parse("bridge.lights[2].state(on=false, **rgb_to_xybri(1, 0, 0))").unwrap();
        let Expr::Call(target, args) = expr else {
            panic!("expected call");
        };
        assert_eq!(
            *target,
            Expr::Attr(
                Box::new(Expr::Index(
                    Box::new(Expr::Attr(Box::new(name("bridge")), "lights".into())),
                    Box::new(lit(json!(2)))
                )),
                "state".into()
            )
        );
        assert_eq!(args[0], Arg::Keyword("on".into(), lit(json!(false))));
        assert!(matches!(args[1], Arg::Splat(Expr::Call(_, _))));
    }

    #[test]
    fn test_containers() {
        assert_eq!(
            parse("[1, -2.5, None,]").unwrap(),
            Expr::List(vec![lit(json!(1)), lit(json!(-2.5)), lit(Value::Null)])
        );
        assert_eq!(
            parse("(1, 2)").unwrap(),
            Expr::Tuple(vec![lit(json!(1)), lit(json!(2))])
        );
        assert_eq!(parse("(lights)").unwrap(), name("lights"));
        assert_eq!(
            parse("{'a': 1}").unwrap(),
            Expr::Dict(vec![(lit(json!("a")), lit(json!(1)))])
        );
    }

    #[test]
    fn test_syntax_errors() {
        let err = parse("lights((").unwrap_err();
        assert!(err.message.contains("end of input"), "{}", err.message);
        assert_eq!(err.column, 9);

        assert!(parse("lights)").is_err());
        assert!(parse("lights.").is_err());
        assert!(parse("").is_err());
        assert!(parse("f(a=1, 2)").is_err());
        assert!(parse("f(a=1, a=2)").is_err());
        assert!(parse("-lights").is_err());
    }

    #[test]
    fn test_lex_errors_carry_column() {
        let err = parse("lights; x").unwrap_err();
        assert_eq!(err.column, 7);
    }

    fn nested(depth: usize) -> String {
        format!("lights({}1{})", "[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        // The command and its argument take two levels; each list adds one.
        assert!(parse(&nested(MAX_DEPTH - 2)).is_ok());

        let err = parse(&nested(MAX_DEPTH - 1)).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
        assert_eq!(err.column, MAX_DEPTH + 7);

        let err = parse(&nested(200_000)).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }
}
