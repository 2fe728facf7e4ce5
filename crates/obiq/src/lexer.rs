//! State-machine tokenizer over UTF-8 source text.
//!
//! Produces `(kind, lexeme, line, column)` tokens; positions are 1-based and
//! the parser propagates them onto every AST node. Newlines are tokens
//! (statement separators tolerated but not required); `#` starts a comment
//! running to end of line.

use strum::{Display, IntoStaticStr};

use crate::exception::{ErrorKind, Exception, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum TokenKind {
    // Literals
    Identifier,
    Number,
    Str,
    CharLit,
    True,
    False,

    // Keywords
    Object,
    Protocol,
    Record,
    Enum,
    Method,
    Constructor,
    Property,
    Const,
    If,
    Else,
    While,
    Break,
    Return,
    New,
    This,
    Import,
    AtImport,
    AtExternal,
    Namespace,
    Throw,
    Try,
    Catch,
    Finally,
    ResultKw,
    ErrorKw,

    // Punctuation and operators
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Assign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    Bang,
    Dollar,

    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded content for strings/chars, raw text otherwise.
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
    Some(match word {
        "Object" => TokenKind::Object,
        "Protocol" => TokenKind::Protocol,
        "Record" => TokenKind::Record,
        "Enum" => TokenKind::Enum,
        "method" => TokenKind::Method,
        "constructor" => TokenKind::Constructor,
        "property" => TokenKind::Property,
        "const" => TokenKind::Const,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "break" => TokenKind::Break,
        "return" => TokenKind::Return,
        "new" => TokenKind::New,
        "this" => TokenKind::This,
        "import" => TokenKind::Import,
        "namespace" => TokenKind::Namespace,
        "throw" => TokenKind::Throw,
        "try" => TokenKind::Try,
        "catch" => TokenKind::Catch,
        "finally" => TokenKind::Finally,
        "Result" => TokenKind::ResultKw,
        "Error" => TokenKind::ErrorKw,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Exception {
        Exception::new(ErrorKind::Syntax, message)
    }

    /// Tokenizes the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> RunResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        while let Some(c) = self.peek() {
            let line = self.line;
            let column = self.column;
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                '\n' => {
                    self.advance();
                    // Collapse runs of blank lines into a single separator.
                    if tokens.last().is_none_or(|t| t.kind != TokenKind::Newline) {
                        tokens.push(Token {
                            kind: TokenKind::Newline,
                            lexeme: "\n".to_owned(),
                            line,
                            column,
                        });
                    }
                }
                '"' => tokens.push(self.string_literal(line, column)?),
                '\'' => tokens.push(self.char_literal(line, column)?),
                c if c.is_ascii_digit() => tokens.push(self.number(line, column)?),
                c if is_ident_start(c) => {
                    let word = self.identifier();
                    let kind = keyword_kind(&word).unwrap_or(TokenKind::Identifier);
                    tokens.push(Token {
                        kind,
                        lexeme: word,
                        line,
                        column,
                    });
                }
                '@' => {
                    self.advance();
                    let word = self.identifier();
                    let kind = match word.as_str() {
                        "import" => TokenKind::AtImport,
                        "external" => TokenKind::AtExternal,
                        _ => {
                            return Err(self.error(format!(
                                "Unknown annotation '@{word}' at line {line}"
                            )));
                        }
                    };
                    tokens.push(Token {
                        kind,
                        lexeme: format!("@{word}"),
                        line,
                        column,
                    });
                }
                _ => tokens.push(self.punctuation(line, column)?),
            }
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line: self.line,
            column: self.column,
        });
        Ok(tokens)
    }

    fn identifier(&mut self) -> String {
        let mut word = String::new();
        while self.peek().is_some_and(is_ident_continue) {
            word.push(self.advance().expect("peeked"));
        }
        word
    }

    fn number(&mut self, line: u32, column: u32) -> RunResult<Token> {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().expect("peeked"));
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().expect("peeked"));
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().expect("peeked"));
            }
        }
        if let Some(suffix) = self.peek()
            && matches!(suffix, 'f' | 'F' | 'd' | 'D' | 'l' | 'L')
        {
            text.push(self.advance().expect("peeked"));
        }
        if self.peek().is_some_and(is_ident_continue) {
            return Err(self.error(format!("Invalid numeric literal '{text}' at line {line}")));
        }
        Ok(Token {
            kind: TokenKind::Number,
            lexeme: text,
            line,
            column,
        })
    }

    fn escape_char(&mut self, line: u32) -> RunResult<char> {
        match self.advance() {
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self
                        .advance()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| {
                            self.error(format!(
                                "Expected four hex digits after \\u at line {line}"
                            ))
                        })?;
                    code = code * 16 + digit;
                }
                char::from_u32(code).ok_or_else(|| {
                    self.error(format!("Invalid \\u escape codepoint at line {line}"))
                })
            }
            Some(c) => Err(self.error(format!("Unknown escape sequence '\\{c}' at line {line}"))),
            None => Err(self.error(format!("Unterminated escape sequence at line {line}"))),
        }
    }

    fn string_literal(&mut self, line: u32, column: u32) -> RunResult<Token> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => text.push(self.escape_char(line)?),
                Some('\n') | None => {
                    return Err(self.error(format!("Unterminated string literal at line {line}")));
                }
                Some(c) => text.push(c),
            }
        }
        Ok(Token {
            kind: TokenKind::Str,
            lexeme: text,
            line,
            column,
        })
    }

    fn char_literal(&mut self, line: u32, column: u32) -> RunResult<Token> {
        self.advance(); // opening quote
        let c = match self.advance() {
            Some('\\') => self.escape_char(line)?,
            Some('\'') | None => {
                return Err(self.error(format!("Empty character literal at line {line}")));
            }
            Some(c) => c,
        };
        if self.advance() != Some('\'') {
            return Err(self.error(format!(
                "Character literal must contain exactly one codepoint at line {line}"
            )));
        }
        Ok(Token {
            kind: TokenKind::CharLit,
            lexeme: c.to_string(),
            line,
            column,
        })
    }

    fn punctuation(&mut self, line: u32, column: u32) -> RunResult<Token> {
        let c = self.advance().expect("caller peeked");
        let two = |lexer: &mut Self, kind, text: &str| {
            lexer.advance();
            Ok(Token {
                kind,
                lexeme: text.to_owned(),
                line,
                column,
            })
        };
        let kind = match c {
            '=' if self.peek() == Some('=') => return two(self, TokenKind::Eq, "=="),
            '!' if self.peek() == Some('=') => return two(self, TokenKind::NotEq, "!="),
            '<' if self.peek() == Some('=') => return two(self, TokenKind::LtEq, "<="),
            '>' if self.peek() == Some('=') => return two(self, TokenKind::GtEq, ">="),
            '&' if self.peek() == Some('&') => return two(self, TokenKind::AndAnd, "&&"),
            '|' if self.peek() == Some('|') => return two(self, TokenKind::OrOr, "||"),
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Assign,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '$' => TokenKind::Dollar,
            c => {
                return Err(self.error(format!("Unexpected character '{c}' at line {line}")));
            }
        };
        Ok(Token {
            kind,
            lexeme: c.to_string(),
            line,
            column,
        })
    }
}
