//! Recursive descent parser for orgq queries.
//!
//! One function per precedence level, pipe loosest to postfix tightest:
//!
//! `pipe < sequence < assignment < as-binding < tuple < or < and <
//! comparison < additive < multiplicative < unary minus < power < postfix`
//!
//! `as $name` swallows the tail of the enclosing pipeline, and the `else`
//! branch of an if-expression extends to the end of the enclosing
//! expression; parentheses re-enter the full grammar anywhere.

use crate::ast::{Ast, BinOp};
use crate::lexer::{LexError, Lexer};
use crate::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected token {found} at line {line}, col {col}; expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        line: usize,
        col: usize,
    },
    #[error("unexpected end of input; expected {expected}")]
    UnexpectedEof { expected: String },
    #[error(
        "invalid assignment target at line {line}, col {col}; \
         only path.field and path[key] can be assigned"
    )]
    InvalidAssignTarget { line: usize, col: usize },
}

/// Parse a complete query.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let ast = parser.parse_pipe()?;
    parser.expect_eof()?;
    Ok(ast)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
        Self { tokens, pos: 0 }
    }

    // ── Token helpers ──

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_var(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Var(name) => {
                let token = self.advance();
                Ok((name, token.span))
            }
            _ => Err(self.unexpected("a $variable")),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek_kind(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of query"))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        if matches!(token.kind, TokenKind::Eof) {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            ParseError::Unexpected {
                found: token.kind.to_string(),
                expected: expected.to_string(),
                line: token.span.line,
                col: token.span.col,
            }
        }
    }

    // ── Precedence levels ──

    /// Level 1: `|`, right-associative.
    pub fn parse_pipe(&mut self) -> Result<Ast, ParseError> {
        let lhs = self.parse_sequence()?;
        if self.eat(&TokenKind::Pipe) {
            let rhs = self.parse_pipe()?;
            let span = lhs.span().merge(rhs.span());
            return Ok(Ast::Pipe(Box::new(lhs), Box::new(rhs), span));
        }
        Ok(lhs)
    }

    /// Level 2: `;`, left-associative.
    fn parse_sequence(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_assign()?;
        while self.eat(&TokenKind::Semicolon) {
            let rhs = self.parse_assign()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Ast::Sequence(Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    /// Level 3: `=`, right-associative. Only `path.field` and `path[key]`
    /// are valid targets.
    fn parse_assign(&mut self) -> Result<Ast, ParseError> {
        let lhs = self.parse_binding()?;
        if self.eat(&TokenKind::Assign) {
            let target_span = lhs.span();
            let value = self.parse_assign()?;
            let span = target_span.merge(value.span());
            return match lhs {
                Ast::FieldAccess(target, name, _) => {
                    Ok(Ast::AssignField(target, name, Box::new(value), span))
                }
                Ast::BracketAccess(target, key, _) | Ast::Index(target, key, _) => {
                    Ok(Ast::AssignBracket(target, key, Box::new(value), span))
                }
                _ => Err(ParseError::InvalidAssignTarget {
                    line: target_span.line,
                    col: target_span.col,
                }),
            };
        }
        Ok(lhs)
    }

    /// Level 4: `value as $name | body`. The body is the remainder of the
    /// enclosing pipeline.
    fn parse_binding(&mut self) -> Result<Ast, ParseError> {
        let value = self.parse_tuple()?;
        if self.eat(&TokenKind::As) {
            let (name, _) = self.expect_var()?;
            self.expect(&TokenKind::Pipe)?;
            let body = self.parse_pipe()?;
            let span = value.span().merge(body.span());
            return Ok(Ast::AsBinding(Box::new(value), name, Box::new(body), span));
        }
        Ok(value)
    }

    /// Level 5: `,`, flattened to N-ary.
    fn parse_tuple(&mut self) -> Result<Ast, ParseError> {
        let first = self.parse_or()?;
        if !matches!(self.peek_kind(), TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_or()?);
        }
        let span = items[0].span().merge(items[items.len() - 1].span());
        Ok(Ast::Tuple(items, span))
    }

    /// Level 6: `or`, left-associative.
    fn parse_or(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Ast::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    /// Level 6½: `and`, left-associative, tighter than `or`.
    fn parse_and(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_comparison()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_comparison()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Ast::Binary(BinOp::And, Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    /// Level 7: comparison, membership, regex match. Non-associative: at
    /// most one operator is consumed.
    fn parse_comparison(&mut self) -> Result<Ast, ParseError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek_kind() {
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::NotEq,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::GtEq => BinOp::GtEq,
            TokenKind::LtEq => BinOp::LtEq,
            TokenKind::In => BinOp::In,
            TokenKind::Matches => BinOp::Matches,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        let span = lhs.span().merge(rhs.span());
        Ok(Ast::Binary(op, Box::new(lhs), Box::new(rhs), span))
    }

    /// Level 8: `+` `-`, left-associative.
    fn parse_additive(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }
    }

    /// Level 9: `*` `/` `mod` `rem` `quot`, left-associative.
    fn parse_multiplicative(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Mod => BinOp::Mod,
                TokenKind::Rem => BinOp::Rem,
                TokenKind::Quot => BinOp::Quot,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }
    }

    /// Level 10: prefix `-`.
    fn parse_unary(&mut self) -> Result<Ast, ParseError> {
        if matches!(self.peek_kind(), TokenKind::Minus) {
            let minus_span = self.advance().span;
            let inner = self.parse_unary()?;
            let span = minus_span.merge(inner.span());
            return Ok(Ast::UnaryMinus(Box::new(inner), span));
        }
        self.parse_power()
    }

    /// Level 11: `**`, right-associative and tighter than unary minus
    /// (`-2 ** 2` negates the power; `2 ** -3` parses the negated exponent).
    fn parse_power(&mut self) -> Result<Ast, ParseError> {
        let lhs = self.parse_postfix()?;
        if self.eat(&TokenKind::StarStar) {
            let rhs = self.parse_unary()?;
            let span = lhs.span().merge(rhs.span());
            return Ok(Ast::Binary(BinOp::Pow, Box::new(lhs), Box::new(rhs), span));
        }
        Ok(lhs)
    }

    /// Level 12: postfix chains `.field`, `[]`, `[key]`, `[a:b]`.
    fn parse_postfix(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let (name, name_span) = self.expect_ident()?;
                    let span = expr.span().merge(name_span);
                    expr = Ast::FieldAccess(Box::new(expr), name, span);
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_bracket_suffix(expr)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    /// The suffix after a consumed `[`: iterate, index/bracket access, or
    /// slice.
    fn parse_bracket_suffix(&mut self, expr: Ast) -> Result<Ast, ParseError> {
        if matches!(self.peek_kind(), TokenKind::RBracket) {
            let close = self.advance();
            let span = expr.span().merge(close.span);
            return Ok(Ast::Iterate(Box::new(expr), span));
        }
        if self.eat(&TokenKind::Colon) {
            let end = if matches!(self.peek_kind(), TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_pipe()?))
            };
            let close = self.expect(&TokenKind::RBracket)?;
            let span = expr.span().merge(close.span);
            return Ok(Ast::Slice(Box::new(expr), None, end, span));
        }
        let first = self.parse_pipe()?;
        match self.peek_kind() {
            TokenKind::RBracket => {
                let close = self.advance();
                let span = expr.span().merge(close.span);
                // String-literal keys read as field access; everything else
                // dispatches at runtime.
                if matches!(first, Ast::Str(_, _)) {
                    Ok(Ast::BracketAccess(Box::new(expr), Box::new(first), span))
                } else {
                    Ok(Ast::Index(Box::new(expr), Box::new(first), span))
                }
            }
            TokenKind::Colon => {
                self.advance();
                let end = if matches!(self.peek_kind(), TokenKind::RBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_pipe()?))
                };
                let close = self.expect(&TokenKind::RBracket)?;
                let span = expr.span().merge(close.span);
                Ok(Ast::Slice(Box::new(expr), Some(Box::new(first)), end, span))
            }
            _ => Err(self.unexpected("']' or ':'")),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let token = self.advance();
                Ok((name, token.span))
            }
            _ => Err(self.unexpected("a field name")),
        }
    }

    /// Level 13: primaries.
    fn parse_primary(&mut self) -> Result<Ast, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::IntLit(n) => {
                let span = self.advance().span;
                Ok(Ast::Int(n, span))
            }
            TokenKind::FloatLit(f) => {
                let span = self.advance().span;
                Ok(Ast::Float(f, span))
            }
            TokenKind::StrLit(s) => {
                let span = self.advance().span;
                Ok(Ast::Str(s, span))
            }
            TokenKind::True => {
                let span = self.advance().span;
                Ok(Ast::Bool(true, span))
            }
            TokenKind::False => {
                let span = self.advance().span;
                Ok(Ast::Bool(false, span))
            }
            TokenKind::None_ => {
                let span = self.advance().span;
                Ok(Ast::NoneLit(span))
            }
            TokenKind::Var(name) => {
                let span = self.advance().span;
                Ok(Ast::Variable(name, span))
            }
            TokenKind::Dot => {
                let dot_span = self.advance().span;
                if let TokenKind::Ident(name) = self.peek_kind().clone() {
                    let name_span = self.advance().span;
                    let span = dot_span.merge(name_span);
                    return Ok(Ast::FieldAccess(
                        Box::new(Ast::Identity(dot_span)),
                        name,
                        span,
                    ));
                }
                Ok(Ast::Identity(dot_span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_pipe()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let open_span = self.advance().span;
                if matches!(self.peek_kind(), TokenKind::RBracket) {
                    let close = self.advance();
                    return Ok(Ast::Fold(None, open_span.merge(close.span)));
                }
                let inner = self.parse_pipe()?;
                let close = self.expect(&TokenKind::RBracket)?;
                Ok(Ast::Fold(
                    Some(Box::new(inner)),
                    open_span.merge(close.span),
                ))
            }
            TokenKind::Ident(name) => {
                let name_span = self.advance().span;
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    self.advance();
                    let (args, close_span) = self.parse_call_args()?;
                    return Ok(Ast::FunctionCall(name, args, name_span.merge(close_span)));
                }
                Ok(Ast::NullaryFunctionRef(name, name_span))
            }
            TokenKind::If => {
                let if_span = self.advance().span;
                self.parse_if_tail(if_span)
            }
            TokenKind::Let => {
                let let_span = self.advance().span;
                let value = self.parse_tuple()?;
                self.expect(&TokenKind::As)?;
                let (name, _) = self.expect_var()?;
                self.expect(&TokenKind::In)?;
                let body = self.parse_pipe()?;
                let span = let_span.merge(body.span());
                Ok(Ast::LetBinding(Box::new(value), name, Box::new(body), span))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Arguments of `name(...)`, comma-separated, each at the `or` level so
    /// that `,` stays the argument separator. The closing paren span is
    /// returned for the call node.
    fn parse_call_args(&mut self) -> Result<(Vec<Ast>, Span), ParseError> {
        if matches!(self.peek_kind(), TokenKind::RParen) {
            let close = self.advance();
            return Ok((Vec::new(), close.span));
        }
        let mut args = vec![self.parse_or()?];
        while self.eat(&TokenKind::Comma) {
            args.push(self.parse_or()?);
        }
        let close = self.expect(&TokenKind::RParen)?;
        Ok((args, close.span))
    }

    /// The remainder of an if-expression after `if`/`elif` has been
    /// consumed; elif chains desugar right-associatively.
    fn parse_if_tail(&mut self, if_span: Span) -> Result<Ast, ParseError> {
        let cond = self.parse_pipe()?;
        self.expect(&TokenKind::Then)?;
        let then_branch = self.parse_pipe()?;
        match self.peek_kind() {
            TokenKind::Elif => {
                let elif_span = self.advance().span;
                let else_branch = self.parse_if_tail(elif_span)?;
                let span = if_span.merge(else_branch.span());
                Ok(Ast::IfThenElse(
                    Box::new(cond),
                    Box::new(then_branch),
                    Box::new(else_branch),
                    span,
                ))
            }
            TokenKind::Else => {
                self.advance();
                let else_branch = self.parse_pipe()?;
                let span = if_span.merge(else_branch.span());
                Ok(Ast::IfThenElse(
                    Box::new(cond),
                    Box::new(then_branch),
                    Box::new(else_branch),
                    span,
                ))
            }
            _ => Err(self.unexpected("elif or else")),
        }
    }
}
