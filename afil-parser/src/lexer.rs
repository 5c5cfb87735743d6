//! Tokenises afil source text with `logos`, the same lexer generator the teacher's own parser
//! crate depends on.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("let")]
    Let,
    #[token("mut")]
    Mut,
    #[token("struct")]
    Struct,
    #[token("fn")]
    Fn,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("precondition")]
    Precondition,
    #[token("compiles")]
    Compiles,
    #[token("typeof")]
    TypeOf,
    #[token("as")]
    As,
    #[token("where")]
    Where,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("xor")]
    Xor,
    #[token("not")]
    Not,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),
    #[regex(r"[0-9]+b", |lex| lex.slice()[..lex.slice().len() - 1].parse::<u8>().ok())]
    ByteLiteral(u8),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLiteral(i64),
    #[regex(r"'(\\.|[^'\\])'", |lex| {
        let inner = &lex.slice()[1..lex.slice().len() - 1];
        if let Some(escaped) = inner.strip_prefix('\\') {
            match escaped {
                "n" => Some('\n'),
                "t" => Some('\t'),
                "r" => Some('\r'),
                "0" => Some('\0'),
                "'" => Some('\''),
                "\\" => Some('\\'),
                _ => None,
            }
        } else {
            inner.chars().next()
        }
    })]
    CharLiteral(char),

    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("<=>")]
    Spaceship,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Equal,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
}

/// A token together with the byte span it was lexed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: afil_core::span::Span,
}

/// Runs the lexer to completion, collecting every token (logos reports lexer errors per-token via
/// `Err(())`; we surface the first one as [`crate::error::ParseError::InvalidToken`]).
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, crate::error::ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned { token, span: afil_core::span::Span::new(span.start as u32, span.end as u32) }),
            Err(()) => {
                return Err(crate::error::ParseError::InvalidToken { span: afil_core::span::Span::new(span.start as u32, span.end as u32) });
            }
        }
    }
    Ok(tokens)
}
