//! Lexer for candidate programs using logos

use logos::{Lexer as LogosLexer, Logos};
use std::ops::Range;

use crate::error::ParseError;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    // Keywords
    #[token("function", priority = 10)]
    Function,
    #[token("return", priority = 10)]
    Return,
    #[token("if", priority = 10)]
    If,
    #[token("else", priority = 10)]
    Else,
    #[token("for", priority = 10)]
    For,
    #[token("while", priority = 10)]
    While,
    #[token("do", priority = 10)]
    Do,
    #[token("break", priority = 10)]
    Break,
    #[token("continue", priority = 10)]
    Continue,
    #[token("var", priority = 10)]
    Var,
    #[token("let", priority = 10)]
    Let,
    #[token("const", priority = 10)]
    Const,
    #[token("true", priority = 10)]
    True,
    #[token("false", priority = 10)]
    False,
    #[token("null", priority = 10)]
    Null,
    #[token("new", priority = 10)]
    New,
    #[token("typeof", priority = 10)]
    TypeOf,
    #[token("void", priority = 10)]
    Void,
    #[token("delete", priority = 10)]
    Delete,
    #[token("in", priority = 10)]
    In,
    #[token("instanceof", priority = 10)]
    InstanceOf,
    #[token("throw", priority = 10)]
    Throw,
    #[token("try", priority = 10)]
    Try,
    #[token("catch", priority = 10)]
    Catch,
    #[token("finally", priority = 10)]
    Finally,
    #[token("switch", priority = 10)]
    Switch,
    #[token("case", priority = 10)]
    Case,
    #[token("default", priority = 10)]
    Default,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Member access
    #[token(".", priority = 9)]
    Dot,
    #[token("?.", priority = 9)]
    OptionalChain,
    #[token("...", priority = 8)]
    DotDotDot,

    // Operators - Arithmetic
    #[token("+", priority = 8)]
    Plus,
    #[token("-", priority = 8)]
    Minus,
    #[token("*", priority = 8)]
    Star,
    #[token("/", priority = 8)]
    Slash,
    #[token("%", priority = 8)]
    Percent,
    #[token("**", priority = 9)]
    StarStar,
    #[token("++", priority = 8)]
    PlusPlus,
    #[token("--", priority = 8)]
    MinusMinus,

    // Operators - Comparison
    #[token("==", priority = 8)]
    EqEq,
    #[token("!=", priority = 8)]
    NotEq,
    #[token("===", priority = 8)]
    EqEqEq,
    #[token("!==", priority = 8)]
    NotEqEq,
    #[token("<", priority = 8)]
    Less,
    #[token(">", priority = 8)]
    Greater,
    #[token("<=", priority = 8)]
    LessEq,
    #[token(">=", priority = 8)]
    GreaterEq,

    // Operators - Logical
    #[token("&&", priority = 8)]
    AndAnd,
    #[token("||", priority = 8)]
    OrOr,
    #[token("??", priority = 8)]
    QuestionQuestion,
    #[token("!", priority = 8)]
    Bang,

    // Operators - Bitwise
    #[token("&", priority = 7)]
    Amp,
    #[token("|", priority = 7)]
    Pipe,
    #[token("^", priority = 7)]
    Caret,
    #[token("~", priority = 7)]
    Tilde,
    #[token("<<", priority = 8)]
    Shl,
    #[token(">>", priority = 8)]
    Shr,
    #[token(">>>", priority = 8)]
    UShr,

    // Operators - Assignment
    #[token("=", priority = 8)]
    Eq,
    #[token("+=", priority = 8)]
    PlusEq,
    #[token("-=", priority = 8)]
    MinusEq,
    #[token("*=", priority = 8)]
    StarEq,
    #[token("/=", priority = 8)]
    SlashEq,
    #[token("%=", priority = 8)]
    PercentEq,
    #[token("**=", priority = 8)]
    StarStarEq,
    #[token("&&=", priority = 8)]
    AndAndEq,
    #[token("||=", priority = 8)]
    OrOrEq,
    #[token("??=", priority = 8)]
    QuestionQuestionEq,

    // Operators - Other
    #[token("=>", priority = 8)]
    FatArrow,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,

    // Literals
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", priority = 5, callback = |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", priority = 5, callback = |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"0[xX][0-9a-fA-F]+", priority = 6, callback = |lex| i64::from_str_radix(&lex.slice()[2..], 16).ok().map(|n| n as f64))]
    Number(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, priority = 5, callback = |lex| {
        let s = lex.slice();
        process_string_escapes(&s[1..s.len()-1])
    })]
    #[regex(r"'([^'\\\n]|\\.)*'", priority = 5, callback = |lex| {
        let s = lex.slice();
        process_string_escapes(&s[1..s.len()-1])
    })]
    String(String),

    // Raw template contents between the backticks; interpolations are
    // parsed later
    #[regex(r"`([^`\\]|\\.)*`", priority = 5, callback = |lex| {
        let s = lex.slice();
        &s[1..s.len()-1]
    })]
    Template(&'a str),

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", priority = 3)]
    Ident(&'a str),

    // Comments and whitespace (automatically skipped)
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    #[regex(r"[ \t\n\r\u{feff}\u{a0}]+", logos::skip)]
    Error,
}

/// Process escape sequences in string and template literals
pub fn process_string_escapes(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('v') => result.push('\u{b}'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    u32::from_str_radix(&hex, 16).ok()?
                } else {
                    let hex: String = chars.by_ref().take(4).collect();
                    if hex.len() != 4 {
                        return None;
                    }
                    u32::from_str_radix(&hex, 16).ok()?
                };
                result.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                result.push(char::from_u32(code)?);
            }
            // line continuation
            Some('\n') => {}
            Some(c) => result.push(c),
            None => result.push('\\'),
        }
    }

    Some(result)
}

/// A token together with its location
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'a> {
    pub token: Token<'a>,
    pub span: Range<usize>,
    /// Whether a line break separates this token from the previous one
    pub newline_before: bool,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    inner: LogosLexer<'a, Token<'a>>,
    last_end: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            last_end: 0,
        }
    }

    /// Next token, or an error for text that is not part of the language
    pub fn next_token(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        let result = self.inner.next()?;
        let span = self.inner.span();
        let gap = &self.source[self.last_end.min(span.start)..span.start];
        let newline_before = gap.contains('\n');
        self.last_end = span.end;

        Some(match result {
            Ok(token) => Ok(SpannedToken {
                token,
                span,
                newline_before,
            }),
            Err(()) => Err(ParseError::InvalidToken {
                position: span.start,
                text: self.inner.slice().to_string(),
            }),
        })
    }

    pub fn span(&self) -> Range<usize> {
        self.inner.span()
    }

    pub fn slice(&self) -> &'a str {
        self.inner.slice()
    }
}

/// Lex the whole source up front
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken<'_>>, ParseError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token?);
    }
    Ok(tokens)
}
