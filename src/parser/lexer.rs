//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser
//! and by the project directive loader. Preprocessor lines (`#include`,
//! `#define`, ...) are skipped rather than parsed.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// Token payloads. Locations live on the enclosing [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    CharLiteral(i8),
    StringLiteral(String),

    // Identifiers
    Ident(String),

    // Type keywords
    Int,
    Char,
    Short,
    Long,
    Signed,
    Unsigned,
    Void,
    Struct,
    Const,

    // Statement keywords
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    Return,
    Sizeof,
    Null,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    AndAnd,
    OrOr,
    Bang,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    LtLt,
    GtGt,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,

    PlusPlus,
    MinusMinus,

    // Member access
    Dot,
    Arrow,

    Question,
    Colon,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,

    Eof,
}

/// A token with the position of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::IntLiteral(n) => return write!(f, "int literal {}", n),
            TokenKind::CharLiteral(c) => {
                let byte = *c as u8;
                return if byte.is_ascii_graphic() || byte == b' ' {
                    write!(f, "char literal '{}'", byte as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", byte)
                };
            }
            TokenKind::StringLiteral(s) => return write!(f, "string literal \"{}\"", s),
            TokenKind::Ident(s) => return write!(f, "identifier '{}'", s),
            TokenKind::Eof => return write!(f, "end of file"),
            TokenKind::Int => "int",
            TokenKind::Char => "char",
            TokenKind::Short => "short",
            TokenKind::Long => "long",
            TokenKind::Signed => "signed",
            TokenKind::Unsigned => "unsigned",
            TokenKind::Void => "void",
            TokenKind::Struct => "struct",
            TokenKind::Const => "const",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::Sizeof => "sizeof",
            TokenKind::Null => "NULL",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::LtLt => "<<",
            TokenKind::GtGt => ">>",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
        };
        write!(f, "'{}'", text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("Lexer error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input; the last token is always [`TokenKind::Eof`]
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        match self.tokenize_until_error() {
            (tokens, None) => Ok(tokens),
            (_, Some(err)) => Err(err),
        }
    }

    /// Tokenize up to the first lexical error
    ///
    /// Returns every token read before the error. [`TokenKind::Eof`] is only
    /// pushed when the whole input was consumed.
    pub fn tokenize_until_error(&mut self) -> (Vec<Token>, Option<LexError>) {
        let mut tokens = Vec::new();

        loop {
            if let Err(err) = self.skip_whitespace_and_comments() {
                return (tokens, Some(err));
            }

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.current_location()));
                return (tokens, None);
            }

            if self.peek() == Some('#') {
                self.skip_preprocessor_directive();
                continue;
            }

            match self.next_token() {
                Ok(token) => tokens.push(token),
                Err(err) => return (tokens, Some(err)),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        let kind = match ch {
            '"' => self.string_literal(loc)?,
            '\'' => self.char_literal(loc)?,
            '0'..='9' => self.number_literal(ch, loc)?,
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(ch),

            '+' => self.one_of(&[('+', TokenKind::PlusPlus), ('=', TokenKind::PlusEq)], TokenKind::Plus),
            '-' => self.one_of(
                &[
                    ('-', TokenKind::MinusMinus),
                    ('=', TokenKind::MinusEq),
                    ('>', TokenKind::Arrow),
                ],
                TokenKind::Minus,
            ),
            '*' => self.one_of(&[('=', TokenKind::StarEq)], TokenKind::Star),
            '/' => self.one_of(&[('=', TokenKind::SlashEq)], TokenKind::Slash),
            '%' => self.one_of(&[('=', TokenKind::PercentEq)], TokenKind::Percent),
            '=' => self.one_of(&[('=', TokenKind::EqEq)], TokenKind::Eq),
            '!' => self.one_of(&[('=', TokenKind::NotEq)], TokenKind::Bang),
            '<' => self.one_of(&[('=', TokenKind::Le), ('<', TokenKind::LtLt)], TokenKind::Lt),
            '>' => self.one_of(&[('=', TokenKind::Ge), ('>', TokenKind::GtGt)], TokenKind::Gt),
            '&' => self.one_of(&[('&', TokenKind::AndAnd)], TokenKind::Amp),
            '|' => self.one_of(&[('|', TokenKind::OrOr)], TokenKind::Pipe),
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            _ => {
                return Err(LexError {
                    message: format!("Unexpected character: '{}'", ch),
                    location: loc,
                })
            }
        };

        Ok(Token::new(kind, loc))
    }

    /// Pick a two-character operator if the next character matches, else `single`
    fn one_of(&mut self, pairs: &[(char, TokenKind)], single: TokenKind) -> TokenKind {
        if let Some(next) = self.peek() {
            if let Some((_, kind)) = pairs.iter().find(|(c, _)| *c == next) {
                self.advance();
                return kind.clone();
            }
        }
        single
    }

    fn escape(&mut self, quote: char) -> Result<char, LexError> {
        let escaped = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in escape sequence".to_string(),
            location: self.current_location(),
        })?;

        match escaped {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '0' => Ok('\0'),
            '\\' => Ok('\\'),
            c if c == quote => Ok(c),
            'x' => {
                let mut hex = String::new();
                while let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit()) {
                    hex.push(c);
                    self.advance();
                }
                u8::from_str_radix(&hex, 16)
                    .map(char::from)
                    .map_err(|_| LexError {
                        message: format!("Invalid hex escape sequence: \\x{}", hex),
                        location: self.current_location(),
                    })
            }
            _ => Err(LexError {
                message: format!("Unknown escape sequence: \\{}", escaped),
                location: self.current_location(),
            }),
        }
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(TokenKind::StringLiteral(string)),
                '\\' => string.push(self.escape('"')?),
                _ => string.push(ch),
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    fn char_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in character literal".to_string(),
            location: loc,
        })?;

        let value = if ch == '\\' { self.escape('\'')? } else { ch };

        if self.advance() != Some('\'') {
            return Err(LexError {
                message: "Expected closing quote in character literal".to_string(),
                location: self.current_location(),
            });
        }

        Ok(TokenKind::CharLiteral(value as u32 as u8 as i8))
    }

    /// Decimal or `0x` hex integer, with any `u`/`l` suffixes dropped
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut num_str = String::new();
        num_str.push(first_digit);

        let radix = if first_digit == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            num_str.clear();
            16
        } else {
            10
        };

        while let Some(ch) = self.peek().filter(|c| c.is_digit(radix)) {
            num_str.push(ch);
            self.advance();
        }
        while matches!(self.peek(), Some('u' | 'U' | 'l' | 'L')) {
            self.advance();
        }

        let value = i64::from_str_radix(&num_str, radix).map_err(|_| LexError {
            message: format!("Invalid integer literal: {}", num_str),
            location: loc,
        })?;

        Ok(TokenKind::IntLiteral(value))
    }

    fn identifier_or_keyword(&mut self, first_char: char) -> TokenKind {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            ident.push(ch);
            self.advance();
        }

        match ident.as_str() {
            "int" => TokenKind::Int,
            "char" => TokenKind::Char,
            "short" => TokenKind::Short,
            "long" => TokenKind::Long,
            "signed" => TokenKind::Signed,
            "unsigned" => TokenKind::Unsigned,
            "void" => TokenKind::Void,
            "struct" => TokenKind::Struct,
            "const" => TokenKind::Const,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "sizeof" => TokenKind::Sizeof,
            "NULL" => TokenKind::Null,
            _ => TokenKind::Ident(ident),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => self.skip_line(),
                Some('/') if self.peek_ahead(1) == Some('*') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // '/'
        self.advance(); // '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Preprocessor lines, including backslash continuations
    fn skip_preprocessor_directive(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\\' && self.peek() == Some('\n') {
                self.advance();
                continue;
            }
            if ch == '\n' {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}
