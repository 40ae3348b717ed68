// zz: The build system and package manager for the zz language.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

use std::{cell::Cell, fmt, ops::Range};

use indexmap::IndexMap;

use super::lexer::{self, Token, TokenKind};

/// A descriptor value. Tables keep positional entries and keyed entries
/// apart; both preserve source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub array: Vec<Value>,
    pub map: IndexMap<String, Value>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Table(_) => "table",
        }
    }
}

#[derive(Debug)]
pub enum ParseError {
    UnexpectedToken(Token),
    LexingError(Range<usize>),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken(token) => {
                let loc = token.range();
                write!(
                    f,
                    "unexpected token {} at line {}, column {}",
                    token, loc.start.line, loc.start.column
                )
            }
            ParseError::LexingError(range) => {
                write!(
                    f,
                    "lexing error at byte range {}..{}",
                    range.start, range.end
                )
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parser for the descriptor literal: `return { ... }`.
pub struct Parser {
    /// The whole token stream, including EOF
    tokens: Vec<Token>,
    /// Index of the next unconsumed token
    index: Cell<usize>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser {
            tokens,
            index: Cell::new(0),
        }
    }

    fn peek(&self) -> &Token {
        if self.index.get() >= self.tokens.len() {
            return &self.tokens[self.tokens.len() - 1];
        }
        &self.tokens[self.index.get()]
    }

    fn skip(&self) {
        self.index.set(self.index.get() + 1)
    }

    fn expect(&self, kind: TokenKind) -> Result<(), ParseError> {
        if self.peek().kind() == kind {
            self.skip();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(self.peek().clone()))
        }
    }

    /// Parse the whole descriptor: `return <table> <eof>`.
    pub fn parse(&self) -> Result<Value, ParseError> {
        self.expect(TokenKind::RETURN)?;
        let value = self.parse_value()?;
        self.expect(TokenKind::EOF)?;
        Ok(value)
    }

    fn parse_value(&self) -> Result<Value, ParseError> {
        match self.peek() {
            Token::STRING((_, s)) => {
                let v = Value::Str(s.clone());
                self.skip();
                Ok(v)
            }
            Token::INT((_, i)) => {
                let v = Value::Int(*i);
                self.skip();
                Ok(v)
            }
            Token::TRUE(_) => {
                self.skip();
                Ok(Value::Bool(true))
            }
            Token::FALSE(_) => {
                self.skip();
                Ok(Value::Bool(false))
            }
            Token::LBRACE(_) => self.parse_table(),
            other => Err(ParseError::UnexpectedToken(other.clone())),
        }
    }

    /// Parse a table constructor. Entries are `ident = value`,
    /// `["key"] = value` or a bare positional value, separated by `,` or
    /// `;` with an optional trailing separator.
    fn parse_table(&self) -> Result<Value, ParseError> {
        self.expect(TokenKind::LBRACE)?;
        let mut table = Table::default();
        loop {
            match self.peek().kind() {
                TokenKind::RBRACE => {
                    self.skip();
                    break;
                }
                TokenKind::LBRACKET => {
                    self.skip();
                    let key = match self.peek() {
                        Token::STRING((_, s)) => {
                            let key = s.clone();
                            self.skip();
                            key
                        }
                        other => return Err(ParseError::UnexpectedToken(other.clone())),
                    };
                    self.expect(TokenKind::RBRACKET)?;
                    self.expect(TokenKind::EQUAL)?;
                    let value = self.parse_value()?;
                    table.map.insert(key, value);
                }
                TokenKind::LIDENT if self.peek_nth(1).kind() == TokenKind::EQUAL => {
                    let key = match self.peek() {
                        Token::LIDENT((_, s)) => s.clone(),
                        _ => unreachable!(),
                    };
                    self.skip();
                    self.skip();
                    let value = self.parse_value()?;
                    table.map.insert(key, value);
                }
                _ => {
                    table.array.push(self.parse_value()?);
                }
            }
            match self.peek().kind() {
                TokenKind::COMMA | TokenKind::SEMI => self.skip(),
                TokenKind::RBRACE => {
                    self.skip();
                    break;
                }
                _ => return Err(ParseError::UnexpectedToken(self.peek().clone())),
            }
        }
        Ok(Value::Table(table))
    }

    fn peek_nth(&self, n: usize) -> &Token {
        if self.index.get() + n >= self.tokens.len() {
            return &self.tokens[self.tokens.len() - 1];
        }
        &self.tokens[self.index.get() + n]
    }
}

/// Tokenize and parse a descriptor source text.
pub fn parse_descriptor_text(input: &str) -> anyhow::Result<Value> {
    let tokens = lexer::tokenize(input)?;
    let parser = Parser::new(tokens);
    parser.parse().map_err(anyhow::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flat_descriptor() {
        let v = parse_descriptor_text(
            r#"
return {
  package = "example.org/demo",
  exports = { "util", "codec" },
  quiet = false,
  jobs = 4,
}
"#,
        )
        .unwrap();
        expect_test::expect![[r#"
            Table(
                Table {
                    array: [],
                    map: {
                        "package": Str(
                            "example.org/demo",
                        ),
                        "exports": Table(
                            Table {
                                array: [
                                    Str(
                                        "util",
                                    ),
                                    Str(
                                        "codec",
                                    ),
                                ],
                                map: {},
                            },
                        ),
                        "quiet": Bool(
                            false,
                        ),
                        "jobs": Int(
                            4,
                        ),
                    },
                },
            )
        "#]]
        .assert_debug_eq(&v);
    }

    #[test]
    fn parse_bracketed_keys_and_nesting() {
        let v = parse_descriptor_text(
            r#"
return {
  mounts = { ["www"] = "static"; ["data"] = "share/data" },
}
"#,
        )
        .unwrap();
        let Value::Table(t) = v else { panic!() };
        let Some(Value::Table(mounts)) = t.map.get("mounts") else {
            panic!()
        };
        assert_eq!(mounts.map.get("www"), Some(&Value::Str("static".into())));
        assert_eq!(
            mounts.map.get("data"),
            Some(&Value::Str("share/data".into()))
        );
    }

    #[test]
    fn parse_rejects_junk() {
        assert!(parse_descriptor_text("{}").is_err());
        assert!(parse_descriptor_text("return {").is_err());
        assert!(parse_descriptor_text("return { a = }").is_err());
        assert!(parse_descriptor_text("return {} extra").is_err());
        let err = parse_descriptor_text("return { a = } ").unwrap_err();
        assert!(err.to_string().contains("unexpected token"));
    }
}
