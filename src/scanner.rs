//! Module `scanner` implements a one‑pass, streaming UTF‑8 lexer for the Rox language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LoxError>` on each `.next()`, where `Ok(token)` is a scanned token
//!   and `Err` reports a lexing error with line and column information.  An error never
//!   ends the scan: the following call resumes right after the offending lexeme.
//!
//! - `tokenize(src, &mut Diagnostics) -> Vec<Token>`
//!   Eager helper used by the pipeline; errors land in the diagnostics sink.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `.`, `:`, `-`, `+`, `;`, `*`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`, `&&`, `||`.
//! - String literals: `"…"` or `'…'`, multi‑line allowed, escapes decoded
//!   (`\n \t \r \b \f \\ \" \' \0 \xHH \uHHHH`).
//! - Numeric literals: integers, decimals, exponents (`1e3`) and hex (`0xFF`).
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a perfect‑hash `KEYWORDS` map.
//! - Comments: `// …` to end of line and `/* … */` blocks.
//!
//! # Performance Notes
//!
//! - Bulk line‑comment skipping via `memchr` for rapid new‑line search.
//! - `#[inline(always)]` on hot path helpers.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let mut scanner = Scanner::new("print 123; // example");
//! for result in &mut scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("Lex error: {}", err),
//!     }
//! }
//! ```

use crate::diagnostics::Diagnostics;
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts UTF‑8 source into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a str,               // entire source text
    bytes: &'a [u8],            // same buffer, byte view for the hot loop
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    column_mark: usize,         // byte index up to which `column` is counted
    column: usize,              // 1‑based character column at `column_mark`
    start_line: usize,          // line on which the current lexeme began
    start_column: usize,        // column on which the current lexeme began
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
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
            column_mark: 0,
            column: 1,
            start_line: 1,
            start_column: 1,
            pending: None,
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

    /// Peek `offset` bytes past the cursor.  Returns `0` past EOF.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.peek_at(1)
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

    /// Record that the byte just consumed was a newline.
    #[inline(always)]
    fn newline(&mut self) {
        self.line += 1;
        self.column_mark = self.curr;
        self.column = 1;
    }

    /// Character column of the cursor.  Counts only the bytes consumed since
    /// the previous call, so long lines stay linear.
    fn current_column(&mut self) -> usize {
        self.column += self.src[self.column_mark..self.curr].chars().count();
        self.column_mark = self.curr;
        self.column
    }

    fn error(&self, message: impl Into<String>) -> LoxError {
        LoxError::lex(self.start_line, self.start_column, message)
    }

    fn lexeme(&self) -> &'a str {
        &self.src[self.start..self.curr]
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  If it produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b'[' => TokenType::LEFT_BRACKET,
            b']' => TokenType::RIGHT_BRACKET,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b':' => TokenType::COLON,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            // ── two‑character operators ──────────────────────────────────
            b'!' if self.match_byte(b'=') => TokenType::BANG_EQUAL,
            b'!' => TokenType::BANG,
            b'=' if self.match_byte(b'=') => TokenType::EQUAL_EQUAL,
            b'=' => TokenType::EQUAL,
            b'<' if self.match_byte(b'=') => TokenType::LESS_EQUAL,
            b'<' => TokenType::LESS,
            b'>' if self.match_byte(b'=') => TokenType::GREATER_EQUAL,
            b'>' => TokenType::GREATER,
            b'&' if self.match_byte(b'&') => TokenType::AND,
            b'|' if self.match_byte(b'|') => TokenType::OR,

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.newline();
                return Ok(());
            }

            // ── comments and slash ───────────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to next newline; the newline itself is
                    // left for the main loop so line tracking stays in one place.
                    match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.len(),
                    }

                    return Ok(());
                }

                if self.match_byte(b'*') {
                    return self.block_comment();
                }

                TokenType::SLASH
            }

            b'"' | b'\'' => return self.parse_string(b),

            b'0'..=b'9' => return self.parse_number(b),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
                return Ok(());
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Swallow the rest of a multi‑byte UTF‑8 sequence so the
                // error names the whole character.
                while self.peek() & 0b1100_0000 == 0b1000_0000 {
                    self.advance();
                }

                return Err(self.error(format!("Unexpected character: {}", self.lexeme())));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Skip a `/* … */` comment.  The opening delimiter is already consumed.
    fn block_comment(&mut self) -> Result<()> {
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.curr += 2;
                return Ok(());
            }

            if self.advance() == b'\n' {
                self.newline();
            }
        }

        Err(self.error("Unterminated block comment."))
    }

    /// Parse a quoted string literal, decoding escape sequences.
    ///
    /// * `self.start` still points to the opening quote.
    /// * When we return, `self.curr` points **past** the closing quote.
    fn parse_string(&mut self, quote: u8) -> Result<()> {
        let mut value = String::new();
        let mut run_start = self.curr;
        let mut escape_error: Option<LoxError> = None;

        while !self.is_at_end() && self.peek() != quote {
            match self.peek() {
                b'\\' => {
                    value.push_str(&self.src[run_start..self.curr]);
                    self.advance();

                    match self.escape() {
                        Ok(Some(c)) => value.push(c),
                        Ok(None) => {}
                        Err(e) => {
                            escape_error.get_or_insert(e);
                        }
                    }

                    run_start = self.curr;
                }

                b'\n' => {
                    self.advance();
                    self.newline();
                }

                _ => {
                    self.advance();
                }
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string."));
        }

        value.push_str(&self.src[run_start..self.curr]);
        self.advance(); // consume closing quote

        if let Some(e) = escape_error {
            return Err(e);
        }

        self.pending = Some(TokenType::STRING(value));

        Ok(())
    }

    /// Decode one escape sequence; the backslash is already consumed.
    fn escape(&mut self) -> Result<Option<char>> {
        if self.is_at_end() {
            return Ok(None);
        }

        let c = match self.advance() {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'\\' => '\\',
            b'\'' => '\'',
            b'"' => '"',
            b'0' => '\0',
            b'x' => return self.hex_escape(2).map(Some),
            b'u' => return self.hex_escape(4).map(Some),
            b'\n' => {
                self.newline();
                '\n'
            }
            _ => {
                // Unknown escape: keep the character itself (whole UTF‑8 sequence).
                let from = self.curr - 1;
                while self.peek() & 0b1100_0000 == 0b1000_0000 {
                    self.advance();
                }
                return Ok(self.src[from..self.curr].chars().next());
            }
        };

        Ok(Some(c))
    }

    /// Fixed‑width `\xHH` / `\uHHHH` escape.
    fn hex_escape(&mut self, width: usize) -> Result<char> {
        let from = self.curr;

        for _ in 0..width {
            if !self.peek().is_ascii_hexdigit() {
                return Err(self.error("Invalid escape sequence."));
            }
            self.advance();
        }

        u32::from_str_radix(&self.src[from..self.curr], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("Invalid escape sequence."))
    }

    /// Parse a numeric literal: `123`, `3.14`, `1e3`, `2.5E-2`, `0xFF`.
    fn parse_number(&mut self, first: u8) -> Result<()> {
        if first == b'0' && matches!(self.peek(), b'x' | b'X') {
            self.advance(); // consume "x"

            if !self.peek().is_ascii_hexdigit() {
                return Err(self.error("Invalid hexadecimal number."));
            }

            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }

            let digits: &str = &self.src[self.start + 2..self.curr];
            let n: u64 = u64::from_str_radix(digits, 16).map_err(|_| {
                self.error(format!("Invalid hexadecimal number: {}", self.lexeme()))
            })?;

            self.pending = Some(TokenType::NUMBER(n as f64));
            return Ok(());
        }

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Optional exponent.
        if matches!(self.peek(), b'e' | b'E') {
            self.advance();

            if matches!(self.peek(), b'+' | b'-') {
                self.advance();
            }

            if !self.peek().is_ascii_digit() {
                return Err(self.error("Invalid number: expected digit after exponent."));
            }

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self
            .lexeme()
            .parse::<f64>()
            .map_err(|_| self.error(format!("Invalid number: {}", self.lexeme())))?;

        self.pending = Some(TokenType::NUMBER(n));

        Ok(())
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

        let tt: TokenType = KEYWORDS
            .get(self.lexeme().as_bytes())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                let column = self.current_column();
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line, column)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.start_line = self.line;
            self.start_column = self.current_column();
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                debug!("Lexing error on line {}: {}", self.start_line, e);
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                debug!("Scanned token ({:?}) on line {}", tt, self.start_line);

                return Some(Ok(Token::new(
                    tt,
                    self.lexeme(),
                    self.start_line,
                    self.start_column,
                )));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan `src` eagerly.  Every lexing error is pushed to `diagnostics`; the
/// returned sequence always ends with `EOF`.
pub fn tokenize(src: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => diagnostics.push(e),
        }
    }

    info!("Tokenized {} token(s)", tokens.len());

    tokens
}
