//! Tokenizer for configuration source text.

use crate::diagnostics::{Pos, SourceRange};

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Equals,
    Colon,
    Comma,
    Dot,
    Minus,
    Newline,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Str(_) => "string literal".to_string(),
            Self::Number(_) => "number".to_string(),
            Self::LBrace => "`{`".to_string(),
            Self::RBrace => "`}`".to_string(),
            Self::LBracket => "`[`".to_string(),
            Self::RBracket => "`]`".to_string(),
            Self::LParen => "`(`".to_string(),
            Self::RParen => "`)`".to_string(),
            Self::Equals => "`=`".to_string(),
            Self::Colon => "`:`".to_string(),
            Self::Comma => "`,`".to_string(),
            Self::Dot => "`.`".to_string(),
            Self::Minus => "`-`".to_string(),
            Self::Newline => "newline".to_string(),
            Self::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) range: SourceRange,
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    filename: &'a str,
    pos: Pos,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(src: &'a str, filename: &'a str) -> Self {
        Self {
            src,
            filename,
            pos: Pos::START,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenizes the whole input. The token list always ends with `Eof`;
    /// lexical errors are collected and scanning continues past them.
    pub(crate) fn tokenize(mut self) -> (Vec<Token>, Vec<SyntaxError>) {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    self.push(TokenKind::Newline, start);
                }
                '#' => self.skip_line(),
                '/' if self.peek_nth(1) == Some('/') => self.skip_line(),
                '/' if self.peek_nth(1) == Some('*') => self.skip_block_comment(),
                '"' => self.string(),
                c if c.is_ascii_digit() => self.number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.ident(),
                _ => {
                    self.bump();
                    let kind = match c {
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        '=' => TokenKind::Equals,
                        ':' => TokenKind::Colon,
                        ',' => TokenKind::Comma,
                        '.' => TokenKind::Dot,
                        '-' => TokenKind::Minus,
                        other => {
                            let range = self.range_from(start);
                            self.errors.push(SyntaxError::InvalidCharacter { found: other, range });
                            continue;
                        }
                    };
                    self.push(kind, start);
                }
            }
        }
        let end = self.pos;
        self.push(TokenKind::Eof, end);
        (self.tokens, self.errors)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos.byte..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos.byte..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.byte += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    fn range_from(&self, start: Pos) -> SourceRange {
        SourceRange::new(self.filename, start, self.pos)
    }

    fn push(&mut self, kind: TokenKind, start: Pos) {
        let range = self.range_from(start);
        self.tokens.push(Token { kind, range });
    }

    fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.pos;
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return;
                }
                Some(_) => {}
                None => {
                    let range = self.range_from(start);
                    self.errors.push(SyntaxError::UnterminatedComment { range });
                    return;
                }
            }
        }
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        let text = self.src[start.byte..self.pos.byte].to_string();
        self.push(TokenKind::Ident(text), start);
    }

    fn number(&mut self) {
        let start = self.pos;
        self.eat_digits();
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let digit_at = match self.peek_nth(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                self.eat_digits();
            }
        }
        let src = self.src;
        let text = &src[start.byte..self.pos.byte];
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => self.push(TokenKind::Number(n), start),
            _ => {
                let range = self.range_from(start);
                self.errors.push(SyntaxError::InvalidNumber {
                    text: text.to_string(),
                    range,
                });
            }
        }
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn string(&mut self) {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            let escape_start = self.pos;
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('u') => match self.unicode_escape() {
                        Some(c) => value.push(c),
                        None => {
                            let range = self.range_from(escape_start);
                            let sequence = self.src[escape_start.byte..self.pos.byte].to_string();
                            self.errors.push(SyntaxError::InvalidEscape { sequence, range });
                        }
                    },
                    Some('\n') | None => {
                        let range = self.range_from(start);
                        self.errors.push(SyntaxError::UnterminatedString { range });
                        return;
                    }
                    Some(other) => {
                        let range = self.range_from(escape_start);
                        self.errors.push(SyntaxError::InvalidEscape {
                            sequence: format!("\\{other}"),
                            range,
                        });
                    }
                },
                Some('\n') | None => {
                    let range = self.range_from(start);
                    self.errors.push(SyntaxError::UnterminatedString { range });
                    return;
                }
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start);
    }

    fn unicode_escape(&mut self) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self.peek()?.to_digit(16)?;
            self.bump();
            code = code * 16 + digit;
        }
        char::from_u32(code)
    }
}
