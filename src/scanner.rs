//! Module `scanner` implements a one‑pass, streaming lexer for the Demon language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, DemonError>` on each `.next()`. A lexing error does not
//!   stop the scanner; the following call resumes after the offending input.
//!
//! - `scan_tokens(src) -> (Vec<Token>, Vec<DemonError>)`
//!   Drains a scanner, separating tokens from errors. The token vector always
//!   ends with `EOF`, so it can be handed straight to the parser.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `;`, `:`, `+`, `-`, `*`, `%`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`, `=>`, `|>`, `&&`, `||`, `..`, `..<`.
//! - String literals: `"` … `"`, multi‑line, with `\n`, `\t`, `\"` and `\\` escapes.
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a perfect‑hash `KEYWORDS` map.
//! - Comments: `//` to end of line (bulk skipped with `memchr`) and `/* … */`.

use crate::error::{DemonError, Result};
use crate::token::{Literal, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"catch"    => TokenType::CATCH,
    b"class"    => TokenType::CLASS,
    b"const"    => TokenType::CONST,
    b"continue" => TokenType::CONTINUE,
    b"default"  => TokenType::DEFAULT,
    b"do"       => TokenType::DO,
    b"else"     => TokenType::ELSE,
    b"extends"  => TokenType::EXTENDS,
    b"false"    => TokenType::FALSE,
    b"finally"  => TokenType::FINALLY,
    b"for"      => TokenType::FOR,
    b"func"     => TokenType::FUNC,
    b"if"       => TokenType::IF,
    b"in"       => TokenType::IN,
    b"let"      => TokenType::LET,
    b"match"    => TokenType::MATCH,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"static"   => TokenType::STATIC,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"throw"    => TokenType::THROW,
    b"true"     => TokenType::TRUE,
    b"try"      => TokenType::TRY,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a str,               // entire source text
    bytes: &'a [u8],            // byte view of `src`
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
    literal: Option<Literal>,   // decoded value for the pending token
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
            literal: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn emit(&mut self, token_type: TokenType) {
        self.pending = Some(token_type);
    }

    /// Picks `long` if the next byte is `second`, else `short`.
    #[inline(always)]
    fn either(&mut self, second: u8, long: TokenType, short: TokenType) {
        let tt = if self.match_byte(second) { long } else { short };
        self.emit(tt);
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  Whitespace and comments
    /// return `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => self.emit(TokenType::LEFT_PAREN),
            b')' => self.emit(TokenType::RIGHT_PAREN),
            b'{' => self.emit(TokenType::LEFT_BRACE),
            b'}' => self.emit(TokenType::RIGHT_BRACE),
            b'[' => self.emit(TokenType::LEFT_BRACKET),
            b']' => self.emit(TokenType::RIGHT_BRACKET),
            b',' => self.emit(TokenType::COMMA),
            b'-' => self.emit(TokenType::MINUS),
            b'+' => self.emit(TokenType::PLUS),
            b';' => self.emit(TokenType::SEMICOLON),
            b':' => self.emit(TokenType::COLON),
            b'*' => self.emit(TokenType::STAR),
            b'%' => self.emit(TokenType::PERCENT),

            // ── dot, range operators ─────────────────────────────────────
            b'.' => {
                if self.match_byte(b'.') {
                    self.either(b'<', TokenType::DOT_DOT_LESS, TokenType::DOT_DOT);
                } else {
                    self.emit(TokenType::DOT);
                }
            }

            // ── two‑character operators ──────────────────────────────────
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'=' => {
                if self.match_byte(b'>') {
                    self.emit(TokenType::FAT_ARROW);
                } else {
                    self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL);
                }
            }

            b'|' => {
                if self.match_byte(b'>') {
                    self.emit(TokenType::PIPE_GREATER);
                } else if self.match_byte(b'|') {
                    self.emit(TokenType::OR);
                } else {
                    return Err(DemonError::lex(self.line, "Unexpected character: |"));
                }
            }

            b'&' => {
                if self.match_byte(b'&') {
                    self.emit(TokenType::AND);
                } else {
                    return Err(DemonError::lex(self.line, "Unexpected character: &"));
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(());
            }

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            // ── comments or slash ────────────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to the next newline; it is consumed by the
                    // next call so the line counter stays right.
                    if let Some(pos) = memchr(b'\n', &self.bytes[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                }

                if self.match_byte(b'*') {
                    return self.block_comment();
                }

                self.emit(TokenType::SLASH);
            }

            b'"' => {
                return self.parse_string();
            }

            b'0'..=b'9' => {
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Skip the whole UTF‑8 sequence so the next lexeme starts on a
                // character boundary.
                let ch = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + ch.len_utf8();

                return Err(DemonError::lex(
                    self.line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        }

        Ok(())
    }

    /// Skip a `/* … */` comment; nesting is not supported.
    fn block_comment(&mut self) -> Result<()> {
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.curr += 2;
                return Ok(());
            }

            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        Err(DemonError::lex(self.line, "Unterminated block comment."))
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        let mut value = String::new();
        let mut run_start = self.curr;

        while !self.is_at_end() && self.peek() != b'"' {
            match self.advance() {
                b'\n' => self.line += 1,

                b'\\' => {
                    value.push_str(&self.src[run_start..self.curr - 1]);

                    let escaped = match self.peek() {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'"' => '"',
                        b'\\' => '\\',
                        _ => '\\',
                    };

                    if escaped == '\\' && self.peek() != b'\\' {
                        // Unknown escape: keep the backslash, leave the next byte alone.
                        value.push('\\');
                    } else {
                        self.advance();
                        value.push(escaped);
                    }

                    run_start = self.curr;
                }

                _ => {}
            }
        }

        if self.is_at_end() {
            return Err(DemonError::lex(self.line, "Unterminated string."));
        }

        value.push_str(&self.src[run_start..self.curr]);
        self.advance(); // consume closing quote

        self.literal = Some(Literal::Str(value));
        self.emit(TokenType::STRING);

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A lone `.` followed by a digit is a fraction; `1..3` is a range.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: &str = &self.src[self.start..self.curr];
        let n: f64 = text.parse::<f64>().unwrap_or(0.0); // digits only, cannot fail

        self.literal = Some(Literal::Number(n));
        self.emit(TokenType::NUMBER);
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.bytes[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.emit(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", None, self.line)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.pending = None;
            self.literal = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lexeme, self.literal.take(), self.line)));
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan the whole of `src`, splitting the results into tokens and errors.
pub fn scan_tokens(src: &str) -> (Vec<Token>, Vec<DemonError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}
