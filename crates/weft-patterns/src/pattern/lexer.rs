//! Split expression patterns into literal runs and placeholders.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::{PatternError, placeholder_error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(String),
    Placeholder {
        start: usize,
        name: String,
        hint: Option<String>,
    },
    OpenBrace {
        index: usize,
    },
    CloseBrace {
        index: usize,
    },
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    literal: String,
}

impl<'a> Lexer<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            chars: pattern.char_indices().peekable(),
            tokens: Vec::new(),
            literal: String::new(),
        }
    }

    fn flush(&mut self) {
        if !self.literal.is_empty() {
            self.tokens
                .push(Token::Literal(std::mem::take(&mut self.literal)));
        }
    }

    fn next_is(&mut self, expected: char) -> bool {
        self.chars.peek().is_some_and(|&(_, ch)| ch == expected)
    }

    fn run(mut self) -> Result<Vec<Token>, PatternError> {
        while let Some((pos, ch)) = self.chars.next() {
            match ch {
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => self.literal.push(escaped),
                    None => self.literal.push('\\'),
                },
                '{' if self.next_is('{') => {
                    self.chars.next();
                    self.literal.push('{');
                }
                '}' if self.next_is('}') => {
                    self.chars.next();
                    self.literal.push('}');
                }
                '{' if self.chars.peek().is_some_and(|&(_, c)| is_name_start(c)) => {
                    self.flush();
                    let token = self.placeholder(pos)?;
                    self.tokens.push(token);
                }
                '{' => {
                    self.flush();
                    self.tokens.push(Token::OpenBrace { index: pos });
                }
                '}' => {
                    self.flush();
                    self.tokens.push(Token::CloseBrace { index: pos });
                }
                other => self.literal.push(other),
            }
        }
        self.flush();
        Ok(self.tokens)
    }

    /// Read `name[:hint]}` after an opening brace at `start`.
    fn placeholder(&mut self, start: usize) -> Result<Token, PatternError> {
        let mut name = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !is_name_char(ch) {
                break;
            }
            name.push(ch);
            self.chars.next();
        }

        let mut hint = None;
        match self.chars.next() {
            Some((_, '}')) => {}
            Some((_, ':')) => {
                let mut raw = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) if ch.is_whitespace() || ch == '{' => {
                            return Err(placeholder_error(
                                "invalid type hint for placeholder",
                                start,
                                Some(name),
                            ));
                        }
                        Some((_, ch)) => raw.push(ch),
                        None => {
                            return Err(placeholder_error(
                                "missing closing '}' for placeholder",
                                start,
                                Some(name),
                            ));
                        }
                    }
                }
                if raw.is_empty() {
                    return Err(placeholder_error(
                        "empty type hint for placeholder",
                        start,
                        Some(name),
                    ));
                }
                hint = Some(raw);
            }
            Some(_) => {
                return Err(placeholder_error(
                    "invalid placeholder in step pattern",
                    start,
                    Some(name),
                ));
            }
            None => {
                return Err(placeholder_error(
                    "missing closing '}' for placeholder",
                    start,
                    Some(name),
                ));
            }
        }

        Ok(Token::Placeholder { start, name, hint })
    }
}

pub(crate) fn lex_pattern(pattern: &str) -> Result<Vec<Token>, PatternError> {
    Lexer::new(pattern).run()
}
