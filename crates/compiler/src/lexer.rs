//! Lexer: character stream to tokens
//!
//! ASCII source only. Newlines are tokens; `#` starts a single-line comment
//! (terminated by newline or end of input; a comment at EOF is not an
//! error) and `##` starts a multi-line comment ended by the next `#`, which
//! must exist.
//!
//! The keyword table is a [`SymbolMap`] keyed by keyword text, the same
//! structure the VM uses for its variable environment.
//!
//! The lexer is restartable: recreate it on the same source to rewind.

use crate::error::CompileError;
use crate::token::{Token, TokenKind};
use tinct_runtime::SymbolMap;

/// The 23 reserved words and their token kinds.
const KEYWORDS: [(&str, TokenKind); 23] = [
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("case", TokenKind::Case),
    ("class", TokenKind::Class),
    ("do", TokenKind::Do),
    ("default", TokenKind::Default),
    ("else", TokenKind::Else),
    ("enum", TokenKind::Enum),
    ("false", TokenKind::False),
    ("for", TokenKind::For),
    ("func", TokenKind::Func),
    ("goto", TokenKind::Goto),
    ("if", TokenKind::If),
    ("in", TokenKind::In),
    ("namespace", TokenKind::Namespace),
    ("null", TokenKind::Null),
    ("return", TokenKind::Return),
    ("super", TokenKind::Super),
    ("switch", TokenKind::Switch),
    ("true", TokenKind::True),
    ("use", TokenKind::Use),
    ("var", TokenKind::Var),
    ("while", TokenKind::While),
];

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    keywords: SymbolMap<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut keywords = SymbolMap::with_buckets(48);
        for (text, kind) in KEYWORDS {
            keywords.set(text, kind);
        }
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            keywords,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        // Skip whitespace and comments, repeatedly; newlines are tokens.
        loop {
            match self.peek() {
                Some(b'\n') => {
                    self.pos += 1;
                    let token = Token::new(TokenKind::Newline, "", self.line);
                    self.line += 1;
                    return Ok(token);
                }
                Some(ch) if ch.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'#') => self.skip_comment()?,
                _ => break,
            }
        }

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", self.line));
        };

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.lex_word());
        }
        if ch.is_ascii_digit() {
            return Ok(self.lex_number());
        }
        if ch == b'"' {
            return self.lex_string();
        }
        if ch == b'\'' {
            return self.lex_char();
        }
        self.lex_operator()
    }

    /// Collect every token through EOF. Convenience for the parser.
    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), CompileError> {
        self.pos += 1;
        if self.peek() == Some(b'#') {
            // Multi-line comment: ended by the next '#'. Unterminated is an
            // error.
            self.pos += 1;
            loop {
                match self.bump() {
                    Some(b'#') => return Ok(()),
                    Some(b'\n') => self.line += 1,
                    Some(_) => {}
                    None => {
                        return Err(CompileError::UnterminatedComment { line: self.line });
                    }
                }
            }
        }
        // Single-line comment: runs to the newline (kept for the newline
        // token) or to EOF, which is fine.
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.pos += 1;
        }
        Ok(())
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == b'_')
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .expect("ASCII word")
            .to_string();
        let kind = self
            .keywords
            .get(&text)
            .copied()
            .unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, self.line)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        // A '.' makes it a float
        let mut kind = TokenKind::Int;
        if self.peek() == Some(b'.') {
            kind = TokenKind::Float;
            self.pos += 1;
            while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .expect("ASCII number")
            .to_string();
        Token::new(kind, text, self.line)
    }

    fn lex_string(&mut self) -> Result<Token, CompileError> {
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek() {
                Some(b'"') => break,
                Some(b'\n') | None => {
                    return Err(CompileError::UnterminatedString { line: self.line });
                }
                Some(_) => self.pos += 1,
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .expect("ASCII string")
            .to_string();
        self.pos += 1;
        Ok(Token::new(TokenKind::String, text, self.line))
    }

    fn lex_char(&mut self) -> Result<Token, CompileError> {
        self.pos += 1;
        let ch = match self.peek() {
            Some(b'\'') => return Err(CompileError::EmptyChar { line: self.line }),
            Some(b'\n') | None => {
                return Err(CompileError::UnterminatedChar { line: self.line });
            }
            Some(ch) => ch,
        };
        self.pos += 1;
        if self.peek() != Some(b'\'') {
            return Err(CompileError::UnterminatedChar { line: self.line });
        }
        self.pos += 1;
        Ok(Token::new(
            TokenKind::Char,
            (ch as char).to_string(),
            self.line,
        ))
    }

    fn lex_operator(&mut self) -> Result<Token, CompileError> {
        let line = self.line;
        let ch = self.bump().expect("caller checked non-EOF");
        let token = |kind: TokenKind| Token::new(kind, "", line);

        // Depending on the following character, an operator may become a
        // different operator.
        let kind = match ch {
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::Equal
                } else {
                    TokenKind::Assign
                }
            }
            b'$' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    TokenKind::StrlenEqual
                }
                Some(b'!') => {
                    self.pos += 1;
                    TokenKind::StrlenNotEqual
                }
                _ => {
                    return Err(CompileError::UnexpectedCharacter { ch: '$', line });
                }
            },
            b'+' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    TokenKind::AddAssign
                }
                Some(b'+') => {
                    self.pos += 1;
                    TokenKind::Inc
                }
                _ => TokenKind::Add,
            },
            b'-' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    TokenKind::SubAssign
                }
                Some(b'-') => {
                    self.pos += 1;
                    TokenKind::Dec
                }
                _ => TokenKind::Sub,
            },
            b'*' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    TokenKind::MulAssign
                }
                Some(b'*') => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        TokenKind::ExpAssign
                    } else {
                        TokenKind::Exp
                    }
                }
                _ => TokenKind::Mul,
            },
            b'/' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::DivAssign
                } else {
                    TokenKind::Div
                }
            }
            b'%' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::ModAssign
                } else {
                    TokenKind::Mod
                }
            }
            b'>' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    TokenKind::GreaterEqual
                }
                Some(b'>') => {
                    self.pos += 1;
                    TokenKind::Shr
                }
                _ => TokenKind::Greater,
            },
            b'<' => match self.peek() {
                Some(b'=') => {
                    self.pos += 1;
                    TokenKind::LessEqual
                }
                Some(b'<') => {
                    self.pos += 1;
                    TokenKind::Shl
                }
                _ => TokenKind::Less,
            },
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.pos += 1;
                    TokenKind::And
                } else {
                    TokenKind::BinAnd
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.pos += 1;
                    TokenKind::Or
                } else {
                    TokenKind::BinOr
                }
            }
            b'^' => TokenKind::BinXor,
            b'~' => TokenKind::BinNot,
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b'[' => TokenKind::LeftBracket,
            b']' => TokenKind::RightBracket,
            other => {
                return Err(CompileError::UnexpectedCharacter {
                    ch: other as char,
                    line,
                });
            }
        };
        Ok(token(kind))
    }
}
