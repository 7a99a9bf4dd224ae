use std::sync::Arc;

use log::trace;

use crate::error::LexError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Immediate,
    Identifier,
    /// One of `+ - * /`.
    Operator,
    LeftParen,
    RightParen,
    LeftCurly,
    RightCurly,
    Comma,
    /// Marks the offending text of a [`LexError`]; never part of a token stream.
    Invalid,
}

/// A byte range into the source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// A lexeme together with its position in the source it was read from.
///
/// Every token of one [`tokenize`] call shares the same immutable source buffer,
/// which keeps diagnostics renderable long after the borrowed `&str` is gone.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    kind: TokenKind,
    span: Span,
    source: Arc<str>,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span, source: &Arc<str>) -> Self {
        Self {
            kind,
            span,
            source: Arc::clone(source),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn offset(&self) -> usize {
        self.span.offset
    }

    pub fn text(&self) -> &str {
        &self.source[self.span.offset..self.span.end()]
    }

    /// The whole source text this token was read from.
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    pub(crate) fn is_operator(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Operator && self.text() == symbol
    }
}

/// Splits `source` into tokens, stopping at the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    trace!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}

struct Lexer {
    source: Arc<str>,
    i: usize,
}

impl Lexer {
    fn new(s: &str) -> Self {
        Self {
            source: Arc::from(s),
            i: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.source.as_bytes().get(self.i + n).copied()
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, Span::new(start, self.i - start), &self.source)
    }

    fn error(&self, start: usize, end: usize, message: impl Into<String>) -> LexError {
        let token = Token::new(TokenKind::Invalid, Span::new(start, end - start), &self.source);
        LexError::new(token, message)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_negligible()?;
        let start = self.i;
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let kind = match c {
            b'+' | b'-' | b'*' | b'/' => TokenKind::Operator,
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftCurly,
            b'}' => TokenKind::RightCurly,
            b',' => TokenKind::Comma,
            b'0'..=b'9' => return self.lex_number().map(Some),
            c if c.is_ascii_alphabetic() => return Ok(Some(self.lex_ident())),
            _ => {
                let ch = self.source[start..].chars().next().unwrap_or('\0');
                return Err(self.error(
                    start,
                    start + ch.len_utf8(),
                    format!("unexpected character `{}`", ch.escape_debug()),
                ));
            }
        };
        self.i += 1;
        Ok(Some(self.token(kind, start)))
    }

    fn skip_negligible(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b' ' | b'\t' | b'\n'), _) => self.i += 1,
                (Some(b'\r'), Some(b'\n')) => self.i += 2,
                (Some(b'/'), Some(b'/')) => self.skip_line_comment(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    // Consumes through the terminating `\n`, which also covers `\r\n`.
    fn skip_line_comment(&mut self) {
        self.i += 2;
        while let Some(c) = self.peek() {
            self.i += 1;
            if c == b'\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.i;
        self.i += 2;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'*'), Some(b'/')) => {
                    self.i += 2;
                    return Ok(());
                }
                (Some(_), _) => self.i += 1,
                (None, _) => {
                    return Err(self.error(start, start + 2, "unterminated block comment"));
                }
            }
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.i;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.i += 1;
        }
        self.i - start
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let start = self.i;
        // A leading zero is a complete integer part: `012` is `0` then `12`.
        if self.peek() == Some(b'0') {
            self.i += 1;
        } else {
            self.eat_digits();
        }
        if self.peek() == Some(b'.') {
            self.i += 1;
            if self.eat_digits() == 0 {
                return Err(self.error(start, self.i, "expected a digit after `.`"));
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.i += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.i += 1;
            }
            if self.eat_digits() == 0 {
                return Err(self.error(start, self.i, "expected a digit in the exponent"));
            }
        }
        Ok(self.token(TokenKind::Immediate, start))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.i;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.i += 1;
            } else {
                break;
            }
        }
        self.token(TokenKind::Identifier, start)
    }
}
