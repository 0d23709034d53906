//! Tokenizer for the inside of a `<chr>...</chr>` block (§6.1).
//!
//! A single pass over the block's characters, tracking line/column the way
//! every position-carrying node downstream expects. Host-language syntax
//! itself is out of scope (§1); this only needs to recognize CHR's own
//! punctuation plus a conservative C-like token set (identifiers, numbers,
//! strings, operators) so host expressions can be captured as text where
//! the grammar calls for `Expression::Literal`/`HostCall` args.

use crate::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),
    /// Punctuation or operator, kept as its exact source text (`==>`, `%=`,
    /// `(`, `#`, ...). The parser matches on the text rather than a fixed
    /// enum of operators, since the host expression grammar is
    /// intentionally open-ended (§1, §9).
    Sym(String),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Ident(s) | TokenKind::Number(s) | TokenKind::Str(s) | TokenKind::Sym(s) => s.clone(),
            TokenKind::Eof => "<eof>".to_string(),
        }
    }
}

/// Multi-character operators, longest first so the scanner never splits one
/// into two shorter symbols it also recognizes.
const MULTI_CHAR_SYMS: &[&str] = &[
    "==>", "=>>", "<=>", ";;", "%=", "==", "!=", "<=", ">=", "&&", "||", "::", "->",
];

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    file: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: &'a str, start_line: u32, start_column: u32) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: start_line,
            column: start_column,
            file,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn position(&self) -> Position {
        Position::new(self.file, self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    while self.peek().is_some() && !(self.peek() == Some('*') && self.peek_at(1) == Some('/')) {
                        self.bump();
                    }
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn scan_one(&mut self) -> Option<Token> {
        self.skip_trivia();
        let position = self.position();
        let c = self.peek()?;

        if c.is_ascii_digit() {
            let mut text = String::new();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.bump().unwrap());
            }
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.bump().unwrap());
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    text.push(self.bump().unwrap());
                }
            }
            return Some(Token {
                kind: TokenKind::Number(text),
                position,
            });
        }

        if c.is_alphabetic() || c == '_' {
            let mut text = String::new();
            while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                text.push(self.bump().unwrap());
            }
            return Some(Token {
                kind: TokenKind::Ident(text),
                position,
            });
        }

        if c == '"' {
            self.bump();
            let mut text = String::new();
            while let Some(c) = self.peek() {
                if c == '"' {
                    break;
                }
                if c == '\\' {
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                    continue;
                }
                text.push(self.bump().unwrap());
            }
            self.bump();
            return Some(Token {
                kind: TokenKind::Str(text),
                position,
            });
        }

        for sym in MULTI_CHAR_SYMS {
            if self.chars[self.pos..].iter().take(sym.len()).collect::<String>() == *sym {
                for _ in 0..sym.len() {
                    self.bump();
                }
                return Some(Token {
                    kind: TokenKind::Sym((*sym).to_string()),
                    position,
                });
            }
        }

        self.bump();
        Some(Token {
            kind: TokenKind::Sym(c.to_string()),
            position,
        })
    }
}

/// Tokenizes `source` (the text strictly between a `<chr ...>` open tag and
/// its matching `</chr>`), attributing positions as if `source` started at
/// `start_line`/`start_column` of `file`.
pub fn tokenize(source: &str, file: &str, start_line: u32, start_column: u32) -> Vec<Token> {
    let mut lexer = Lexer::new(source, file, start_line, start_column);
    let mut tokens = Vec::new();
    while let Some(tok) = lexer.scan_one() {
        tokens.push(tok);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        position: lexer.position(),
    });
    tokens
}
