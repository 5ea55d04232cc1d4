//! Lexer for Lox source text.
//!
//! [`Scanner`] walks the source once, byte by byte, and yields one
//! `Result<Token>` per lexeme.  Whitespace and `//` comments produce nothing;
//! the final item is always a single `EOF` token, after which the iterator
//! is exhausted for good ([`FusedIterator`]).
//!
//! Lexical errors come out of the iterator in line with the tokens and the
//! scanner carries on, so a caller sees every bad character in one pass.
//! [`scan`] is the convenience driver that splits the two streams apart.
//!
//! Tokens borrow their lexeme from the source; only string and number
//! literals allocate (the unquoted text, the parsed `f64`).
//!
//! ```rust
//! use rlox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("Lex error: {}", err),
//!     }
//! }
//! ```

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};

/// Reserved words, as a compile‑time perfect hash over the raw bytes.
static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"for"    => TokenType::FOR,
    b"fun"    => TokenType::FUN,
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

pub struct Scanner<'a> {
    src: &'a str,
    start: usize, // first byte of the lexeme being scanned
    curr: usize,  // next byte to look at
    line: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            done: false,
        }
    }

    // ── cursor ──────────────────────────────────────────────────────────

    #[inline(always)]
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Current byte, or `0` past the end.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.bytes().get(self.curr).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.bytes().get(self.curr + 1).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b: u8 = self.peek();
        self.curr += 1;
        b
    }

    /// Picks `then` and consumes the byte if the next one is `expected`,
    /// otherwise `otherwise`.
    #[inline(always)]
    fn either(&mut self, expected: u8, then: TokenType, otherwise: TokenType) -> TokenType {
        if self.peek() == expected {
            self.curr += 1;
            then
        } else {
            otherwise
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.src[self.start..self.curr]
    }

    // ── lexing ──────────────────────────────────────────────────────────

    /// Scans from `start`.  `Ok(None)` means the bytes were insignificant
    /// (whitespace, newline, comment).
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind: TokenType = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.peek() == b'/' => {
                // Leave the newline itself for the next call so it bumps `line`.
                self.curr = match memchr(b'\n', &self.bytes()[self.curr..]) {
                    Some(offset) => self.curr + offset,
                    None => self.src.len(),
                };
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),
            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            other => {
                // Report (and skip) the whole character, not just its first byte.
                let c: char = self.src[self.start..]
                    .chars()
                    .next()
                    .unwrap_or(other as char);
                self.curr = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Body of a `"…"` literal; newlines inside are allowed and counted.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.curr += 1; // closing quote

        let text: &str = &self.src[self.start + 1..self.curr - 1];
        Ok(TokenType::STRING(text.to_owned()))
    }

    /// `123` or `12.5`; a trailing `.` with no digit after it is left alone.
    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.curr += 1;
            while self.peek().is_ascii_digit() {
                self.curr += 1;
            }
        }

        // Only ASCII digits and at most one interior dot were consumed.
        TokenType::NUMBER(self.lexeme().parse::<f64>().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(self.lexeme().as_bytes())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned {:?} on line {}", kind, self.line);
                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan `src` to completion.
///
/// Lexical errors are pushed into `diagnostics` and scanning continues, so
/// the returned vector always ends with exactly one `EOF` token.
pub fn scan<'a>(src: &'a str, diagnostics: &mut Diagnostics) -> Vec<Token<'a>> {
    let mut tokens: Vec<Token<'a>> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => {
                debug!("Lex error collected: {}", e);

                diagnostics.report(e);
            }
        }
    }

    info!(
        "Scanned {} token(s), {} lexical error(s)",
        tokens.len(),
        diagnostics.len()
    );

    tokens
}
