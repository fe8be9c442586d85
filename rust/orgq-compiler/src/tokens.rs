use serde::{Deserialize, Serialize};
use std::fmt;

/// A lexed token: what it is plus where it sits in the query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A region of query text. Byte offsets delimit the region; the line and
/// column of its first byte (both 1-based) feed error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    /// One past the last byte of the region
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, col: usize) -> Self {
        Self {
            start,
            end,
            line,
            col,
        }
    }

    /// The smallest span covering both operands. Line and column are taken
    /// from whichever span begins earlier in the source.
    pub fn merge(self, other: Span) -> Span {
        let anchor = if self.start <= other.start { self } else { other };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: anchor.line,
            col: anchor.col,
        }
    }
}

/// Token types for the orgq query grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    IntLit(i64),
    FloatLit(f64),
    StrLit(String),

    // Names
    Ident(String),
    /// `$name` variable reference
    Var(String),

    // Keywords
    True,
    False,
    None_,
    And,
    Or,
    In,
    Matches,
    Mod,
    Rem,
    Quot,
    As,
    Let,
    If,
    Then,
    Elif,
    Else,

    // Punctuation
    Dot,
    Comma,
    Pipe,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // Operators
    EqEq,     // ==
    NotEq,    // !=
    GtEq,     // >=
    LtEq,     // <=
    Gt,       // >
    Lt,       // <
    StarStar, // **
    Star,     // *
    Slash,    // /
    Plus,     // +
    Minus,    // -
    Assign,   // =

    // Special
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLit(n) => write!(f, "{}", n),
            TokenKind::FloatLit(n) => write!(f, "{}", n),
            TokenKind::StrLit(s) => write!(f, "\"{}\"", s),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Var(s) => write!(f, "${}", s),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::None_ => write!(f, "none"),
            TokenKind::And => write!(f, "and"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::In => write!(f, "in"),
            TokenKind::Matches => write!(f, "matches"),
            TokenKind::Mod => write!(f, "mod"),
            TokenKind::Rem => write!(f, "rem"),
            TokenKind::Quot => write!(f, "quot"),
            TokenKind::As => write!(f, "as"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Elif => write!(f, "elif"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::StarStar => write!(f, "**"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}
