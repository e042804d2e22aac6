//! Hand-written lexer shared by the HDF and HFX front-ends.
//!
//! The lexer is a pull iterator over a source string: [`Lexer::next_token`]
//! classifies the next lexeme and numeric literals are mirrored into a
//! [`NumberBuffer`] side channel. Errors are sticky: the first
//! [`Lexer::expect_token`] mismatch latches an error flag and every later
//! expectation short-circuits to success so one drift produces one
//! diagnostic.

pub mod arena;
pub mod number;

pub use arena::{Span, StringArray, StringBuffer};
pub use number::{NumberBuffer, INVALID_NUMBER_INDEX};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Unknown,
    OpenParen,
    CloseParen,
    Colon,
    Semicolon,
    Asterisk,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenAngle,
    CloseAngle,
    Equals,
    Hash,
    Comma,
    String,
    Identifier,
    Number,
    EndOfStream,
}

/// A classified lexeme. `text` borrows from the source buffer; for `String`
/// tokens it covers the contents without the surrounding quotes.
#[derive(Copy, Clone, Debug)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: u32,
}

impl Token<'_> {
    pub const fn empty() -> Self {
        Self {
            kind: TokenKind::Unknown,
            text: "",
            line: 0,
        }
    }
}

/// Snapshot of the lexer cursor, used for one-token backtracking.
///
/// The number buffer is deliberately not part of the snapshot: values
/// appended during lookahead stay, matching the shared side-buffer
/// behavior the parsers rely on.
#[derive(Copy, Clone, Debug)]
pub struct LexerState {
    cursor: usize,
    line: u32,
    line_start: usize,
    error: bool,
    error_line: u32,
}

pub struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
    line: u32,
    line_start: usize,
    column: u32,
    error: bool,
    error_line: u32,
    error_detail: Option<(TokenKind, TokenKind)>,
    numbers: NumberBuffer,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            line: 1,
            line_start: 0,
            column: 0,
            error: false,
            error_line: 1,
            error_detail: None,
            numbers: NumberBuffer::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn numbers(&self) -> &NumberBuffer {
        &self.numbers
    }

    pub fn take_numbers(self) -> NumberBuffer {
        self.numbers
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn error_line(&self) -> u32 {
        self.error_line
    }

    /// `(expected, actual)` of the first mismatch, if any.
    pub fn error_detail(&self) -> Option<(TokenKind, TokenKind)> {
        self.error_detail
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn state(&self) -> LexerState {
        LexerState {
            cursor: self.cursor,
            line: self.line,
            line_start: self.line_start,
            error: self.error,
            error_line: self.error_line,
        }
    }

    pub fn restore(&mut self, state: LexerState) {
        self.cursor = state.cursor;
        self.line = state.line;
        self.line_start = state.line_start;
        self.error = state.error;
        self.error_line = state.error_line;
    }

    /// Byte offset of `token` inside the source buffer. Only meaningful for
    /// tokens produced by this lexer.
    pub fn source_offset(&self, token: &Token<'a>) -> usize {
        token.text.as_ptr() as usize - self.source.as_ptr() as usize
    }

    /// Advances past whitespace and comments, then classifies the next
    /// lexeme. Never fails: unrecognized bytes yield `Unknown` tokens and
    /// the end of input yields `EndOfStream` forever after.
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();

        let start = self.cursor;
        self.column = (start - self.line_start) as u32;
        let line = self.line;

        let Some(c) = self.peek(0) else {
            return Token {
                kind: TokenKind::EndOfStream,
                text: &self.source[self.source.len()..],
                line,
            };
        };

        self.cursor += 1;

        let kind = match c {
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'*' => TokenKind::Asterisk,
            b'[' => TokenKind::OpenBracket,
            b']' => TokenKind::CloseBracket,
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b'<' => TokenKind::OpenAngle,
            b'>' => TokenKind::CloseAngle,
            b'=' => TokenKind::Equals,
            b'#' => TokenKind::Hash,
            b',' => TokenKind::Comma,
            b'"' => {
                let text_start = self.cursor;

                while let Some(c) = self.peek(0) {
                    if c == b'"' {
                        break;
                    }
                    if c == b'\\' && self.peek(1).is_some() {
                        self.cursor += 1;
                    }
                    self.cursor += 1;
                }

                let text = &self.source[text_start..self.cursor];
                if self.peek(0) == Some(b'"') {
                    self.cursor += 1;
                }

                return Token {
                    kind: TokenKind::String,
                    text,
                    line,
                };
            }
            _ if is_alpha(c) => {
                while self
                    .peek(0)
                    .is_some_and(|c| is_alpha(c) || is_number(c) || c == b'_')
                {
                    self.cursor += 1;
                }

                return Token {
                    kind: TokenKind::Identifier,
                    text: &self.source[start..self.cursor],
                    line,
                };
            }
            _ if is_number(c) || c == b'-' => {
                // Backtrack so the literal is consumed as a whole.
                self.cursor = start;
                let value = self.parse_number();
                self.numbers.push(value);

                return Token {
                    kind: TokenKind::Number,
                    text: &self.source[start..self.cursor],
                    line,
                };
            }
            _ => {
                // Unknown byte; step over the whole UTF-8 scalar so token
                // text stays on a char boundary.
                let width = utf8_width(c);
                self.cursor = (start + width).min(self.source.len());

                return Token {
                    kind: TokenKind::Unknown,
                    text: &self.source[start..self.cursor],
                    line,
                };
            }
        };

        Token {
            kind,
            text: &self.source[start..self.cursor],
            line,
        }
    }

    /// Advances and requires `kind`. On mismatch the sticky error latches
    /// and the line of the failure is recorded. Once latched, every call
    /// reports success without touching the stream.
    pub fn expect_token(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        if self.error {
            return Some(Token::empty());
        }

        let token = self.next_token();
        if token.kind == kind {
            Some(token)
        } else {
            self.error = true;
            self.error_line = self.line;
            self.error_detail = Some((kind, token.kind));
            None
        }
    }

    /// Advances and reports whether the new token matches. Never latches
    /// the error.
    pub fn equals_token(&mut self, kind: TokenKind) -> bool {
        self.next_token().kind == kind
    }

    /// Checks a token already in hand without advancing; mismatches latch
    /// the sticky error like [`expect_token`](Self::expect_token).
    pub fn check_token(&mut self, token: &Token<'a>, kind: TokenKind) -> bool {
        if self.error {
            return true;
        }

        if token.kind == kind {
            true
        } else {
            self.error = true;
            self.error_line = self.line;
            self.error_detail = Some((kind, token.kind));
            false
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.cursor + ahead).copied()
    }

    fn skip_whitespace(&mut self) {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if is_whitespace(c) => {
                    if is_end_of_line(c) {
                        self.line += 1;
                        self.line_start = self.cursor + 1;
                    }
                    self.cursor += 1;
                }
                (Some(b'/'), Some(b'/')) => {
                    self.cursor += 2;
                    while self.peek(0).is_some_and(|c| !is_end_of_line(c)) {
                        self.cursor += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.cursor += 2;
                    loop {
                        match (self.peek(0), self.peek(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.cursor += 2;
                                break;
                            }
                            (Some(c), _) => {
                                if is_end_of_line(c) {
                                    self.line += 1;
                                    self.line_start = self.cursor + 1;
                                }
                                self.cursor += 1;
                            }
                            (None, _) => break,
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Consumes a literal of the grammar `-? 0* D* ('.' D*)? ([eE])?` and
    /// returns its value. The exponent character is consumed but never
    /// applied; the result is
    /// `sign * (integer_part + fractional_part / 10^fraction_digits)`.
    fn parse_number(&mut self) -> f64 {
        let mut sign = 1.0;
        if self.peek(0) == Some(b'-') {
            sign = -1.0;
            self.cursor += 1;
        }

        // Leading zeros carry no value.
        while self.peek(0) == Some(b'0') {
            self.cursor += 1;
        }

        let mut integer_part: i64 = 0;
        if self.peek(0).is_some_and(|c| (b'1'..=b'9').contains(&c)) {
            while let Some(c) = self.peek(0) {
                if c == b'.' || !is_number(c) {
                    break;
                }
                integer_part = integer_part * 10 + i64::from(c - b'0');
                self.cursor += 1;
            }
        }

        let mut fractional_part: i64 = 0;
        let mut fractional_divisor: i64 = 1;
        if self.peek(0) == Some(b'.') {
            self.cursor += 1;

            while let Some(c) = self.peek(0) {
                if !is_number(c) {
                    break;
                }
                fractional_part = fractional_part * 10 + i64::from(c - b'0');
                fractional_divisor *= 10;
                self.cursor += 1;
            }
        }

        if matches!(self.peek(0), Some(b'e') | Some(b'E')) {
            self.cursor += 1;
        }

        sign * (integer_part as f64 + fractional_part as f64 / fractional_divisor as f64)
    }
}

fn is_end_of_line(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == 0x0b || c == 0x0c || is_end_of_line(c)
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_uppercase()
}

fn is_number(c: u8) -> bool {
    c.is_ascii_digit()
}

fn utf8_width(leading: u8) -> usize {
    match leading {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}
