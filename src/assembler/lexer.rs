//! This lexer tokenizes uFork assembly.
//!
//! The tokenizer is a one-shot, left-to-right cursor: every call to `next`
//! scans exactly one token from where the previous one ended. The first
//! unrecognized character (or an integer outside the safe range) produces a
//! single `Error` token, after which the stream is over.
use std::fmt;

use regex::Regex;

/// The largest integer a fixnum literal may hold, 2^53 - 1.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

// One alternative per capturing group, in priority order:
//  [1] Newline
//  [2] Space run
//  [3] Comment
//  [4] Name
//  [5] Literal symbol
//  [6] Number
//  [7] String
//  [8] Punctuator
const TOKEN_PATTERN: &str = r#"(?x)
    ^(?:
        ( \n | \r\n? )
      | ( \x20+ )
      | ( ;[^\r\n]* )
      | ( [a-zA-Z] (?: [\-_]? [0-9a-zA-Z] )* \?? )
      | ( \x23 [a-z_?]+ )
      | ( -? [1-9] [0-9]* | 0 )
      | ( "[^"]*" )
      | ( [.:?\x23] )
    )"#;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Newline,
    Space,
    Comment,
    Name,
    Literal,
    Number(i64),
    Str,
    Punct,
    Error,
}

/// A lexical unit. `text` is the matched source text, `line` and `column`
/// are 0-based and `column_to` is one past the last column of the token.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub column_to: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, line: usize, column: usize, column_to: usize) -> Self {
        Token { kind, text: text.to_owned(), line, column, column_to }
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }

    /// Name of a literal symbol, without its leading `#`.
    pub fn literal_name(&self) -> &str {
        self.text.get(1..).unwrap_or_default()
    }

    /// Contents of a string token, without the quotes.
    pub fn string_value(&self) -> &str {
        let end = self.text.len().saturating_sub(1);
        self.text.get(1..end).unwrap_or_default()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            TokenKind::Newline => return write!(f, "{}:{} newline", self.line, self.column),
            TokenKind::Error => return write!(f, "{}:{} error", self.line, self.column),
            TokenKind::Space => "space",
            TokenKind::Comment => "comment",
            TokenKind::Name => "name",
            TokenKind::Literal => "literal",
            TokenKind::Number(_) => "number",
            TokenKind::Str => "string",
            TokenKind::Punct => "punct",
        };
        write!(f, "{}:{}-{} {} {:?}", self.line, self.column, self.column_to, kind, self.text)
    }
}

pub struct Tokenizer<'src> {
    source: &'src str,
    pattern: Regex,
    offset: usize,
    line: usize,
    column_to: usize,
    halted: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Tokenizer {
            source,
            pattern: Regex::new(TOKEN_PATTERN).expect("the token pattern is a valid regex"),
            offset: 0,
            line: 0,
            column_to: 0,
            halted: false,
        }
    }

    /// Produces the error token and stops the stream.
    fn error(&mut self) -> Token {
        self.halted = true;
        Token::new(TokenKind::Error, "", self.line, self.column_to, self.column_to)
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.halted || self.offset >= self.source.len() {
            return None;
        }

        let source = self.source;
        let rest = &source[self.offset..];
        let captures = match self.pattern.captures(rest) {
            Some(captures) => captures,
            None => return Some(self.error()),
        };
        let text = captures.get(0).map_or("", |m| m.as_str());
        self.offset += text.len();

        let column = self.column_to;
        self.column_to = column + text.encode_utf16().count();

        let kind = if captures.get(1).is_some() {
            let token = Token::new(TokenKind::Newline, text, self.line, column, self.column_to);
            self.line += 1;
            self.column_to = 0;
            return Some(token);
        } else if captures.get(2).is_some() {
            TokenKind::Space
        } else if captures.get(3).is_some() {
            TokenKind::Comment
        } else if captures.get(4).is_some() {
            TokenKind::Name
        } else if captures.get(5).is_some() {
            TokenKind::Literal
        } else if captures.get(6).is_some() {
            match text.parse::<i64>() {
                Ok(number) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&number) => {
                    TokenKind::Number(number)
                }
                _ => return Some(self.error()),
            }
        } else if captures.get(7).is_some() {
            TokenKind::Str
        } else {
            TokenKind::Punct
        };

        Some(Token::new(kind, text, self.line, column, self.column_to))
    }
}
