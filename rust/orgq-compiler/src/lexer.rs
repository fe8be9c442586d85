//! Lexer for orgq query text.

use crate::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("invalid number at line {line}, col {col}")]
    InvalidNumber { line: usize, col: usize },
    #[error("'$' must be followed by a variable name at line {line}, col {col}")]
    BareDollar { line: usize, col: usize },
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    byte_offset: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            byte_offset: 0,
        }
    }

    /// Lex the whole source, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn span_from(&self, so: usize, sl: usize, sc: usize) -> Span {
        Span::new(so, self.byte_offset, sl, sc)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let (so, sl, sc) = (self.byte_offset, self.line, self.col);
        let Some(ch) = self.current() else {
            return Ok(Token::new(TokenKind::Eof, self.span_from(so, sl, sc)));
        };

        if ch.is_ascii_digit() {
            return self.read_number(so, sl, sc);
        }
        if ch == '"' {
            return self.read_string(so, sl, sc);
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            let word = self.read_word();
            return Ok(Token::new(keyword_or_ident(word), self.span_from(so, sl, sc)));
        }
        if ch == '$' {
            self.advance();
            if !matches!(self.current(), Some(c) if c.is_ascii_alphabetic() || c == '_') {
                return Err(LexError::BareDollar { line: sl, col: sc });
            }
            let name = self.read_word();
            return Ok(Token::new(TokenKind::Var(name), self.span_from(so, sl, sc)));
        }

        // Two-character operators win over their one-character prefixes.
        let kind = match (ch, self.peek()) {
            ('=', Some('=')) => self.two(TokenKind::EqEq),
            ('!', Some('=')) => self.two(TokenKind::NotEq),
            ('>', Some('=')) => self.two(TokenKind::GtEq),
            ('<', Some('=')) => self.two(TokenKind::LtEq),
            ('*', Some('*')) => self.two(TokenKind::StarStar),
            ('=', _) => self.one(TokenKind::Assign),
            ('>', _) => self.one(TokenKind::Gt),
            ('<', _) => self.one(TokenKind::Lt),
            ('*', _) => self.one(TokenKind::Star),
            ('/', _) => self.one(TokenKind::Slash),
            ('+', _) => self.one(TokenKind::Plus),
            ('-', _) => self.one(TokenKind::Minus),
            ('.', _) => self.one(TokenKind::Dot),
            (',', _) => self.one(TokenKind::Comma),
            ('|', _) => self.one(TokenKind::Pipe),
            (';', _) => self.one(TokenKind::Semicolon),
            (':', _) => self.one(TokenKind::Colon),
            ('(', _) => self.one(TokenKind::LParen),
            (')', _) => self.one(TokenKind::RParen),
            ('[', _) => self.one(TokenKind::LBracket),
            (']', _) => self.one(TokenKind::RBracket),
            _ => {
                return Err(LexError::UnexpectedChar {
                    ch,
                    line: sl,
                    col: sc,
                })
            }
        };
        Ok(Token::new(kind, self.span_from(so, sl, sc)))
    }

    fn one(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn two(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        self.advance();
        kind
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn read_digits(&mut self, buf: &mut String) {
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self, so: usize, sl: usize, sc: usize) -> Result<Token, LexError> {
        let mut digits = String::new();
        self.read_digits(&mut digits);
        // A '.' only belongs to the number when a digit follows; otherwise it
        // is the field-access dot.
        let is_float = self.current() == Some('.')
            && matches!(self.peek(), Some(c) if c.is_ascii_digit());
        if is_float {
            digits.push('.');
            self.advance();
            self.read_digits(&mut digits);
            let value: f64 = digits
                .parse()
                .map_err(|_| LexError::InvalidNumber { line: sl, col: sc })?;
            return Ok(Token::new(
                TokenKind::FloatLit(value),
                self.span_from(so, sl, sc),
            ));
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| LexError::InvalidNumber { line: sl, col: sc })?;
        Ok(Token::new(
            TokenKind::IntLit(value),
            self.span_from(so, sl, sc),
        ))
    }

    fn read_string(&mut self, so: usize, sl: usize, sc: usize) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut buf = String::new();
        loop {
            match self.current() {
                None => return Err(LexError::UnterminatedString { line: sl, col: sc }),
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(
                        TokenKind::StrLit(buf),
                        self.span_from(so, sl, sc),
                    ));
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => buf.push('\n'),
                        Some('t') => buf.push('\t'),
                        Some('r') => buf.push('\r'),
                        Some('\\') => buf.push('\\'),
                        Some('"') => buf.push('"'),
                        Some(c) => {
                            buf.push('\\');
                            buf.push(c);
                        }
                        None => {
                            return Err(LexError::UnterminatedString { line: sl, col: sc })
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
    }
}

fn keyword_or_ident(word: String) -> TokenKind {
    match word.as_str() {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "none" => TokenKind::None_,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "in" => TokenKind::In,
        "matches" => TokenKind::Matches,
        "mod" => TokenKind::Mod,
        "rem" => TokenKind::Rem,
        "quot" => TokenKind::Quot,
        "as" => TokenKind::As,
        "let" => TokenKind::Let,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        _ => TokenKind::Ident(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_operators_greedily() {
        assert_eq!(
            kinds(">= > == = ** *"),
            vec![
                TokenKind::GtEq,
                TokenKind::Gt,
                TokenKind::EqEq,
                TokenKind::Assign,
                TokenKind::StarStar,
                TokenKind::Star,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers_and_trailing_dot() {
        assert_eq!(
            kinds("12 3.5 4.foo"),
            vec![
                TokenKind::IntLit(12),
                TokenKind::FloatLit(3.5),
                TokenKind::IntLit(4),
                TokenKind::Dot,
                TokenKind::Ident("foo".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_strings_with_escapes() {
        assert_eq!(
            kinds(r#""a\nb\"c""#),
            vec![TokenKind::StrLit("a\nb\"c".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_keywords_and_variables() {
        assert_eq!(
            kinds("none and $offset in foo"),
            vec![
                TokenKind::None_,
                TokenKind::And,
                TokenKind::Var("offset".to_string()),
                TokenKind::In,
                TokenKind::Ident("foo".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn rejects_unterminated_string_and_bare_dollar() {
        assert!(matches!(
            Lexer::new("\"abc").tokenize(),
            Err(LexError::UnterminatedString { .. })
        ));
        assert!(matches!(
            Lexer::new("$ x").tokenize(),
            Err(LexError::BareDollar { .. })
        ));
    }

    #[test]
    fn rejects_unknown_characters_with_position() {
        match Lexer::new(".a\n  @").tokenize() {
            Err(LexError::UnexpectedChar { ch, line, col }) => {
                assert_eq!(ch, '@');
                assert_eq!(line, 2);
                assert_eq!(col, 3);
            }
            other => panic!("expected UnexpectedChar, got {:?}", other),
        }
    }
}
