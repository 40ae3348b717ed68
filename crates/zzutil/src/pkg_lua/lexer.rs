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

use anyhow::anyhow;
use logos::{Lexer, Logos, Skip};
use std::{fmt::Display, ops::Range};

#[derive(Debug, PartialEq, Clone)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

pub type Loc = Range<Pos>;

/// Tokens of the descriptor literal: a `return` statement yielding a table
/// of strings, integers, booleans and nested tables.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(extras = (usize, usize))]
#[logos(skip(r"(\n|\r\n)", newline_callback))]
#[logos(skip(r"[ \t\f]+"))]
#[logos(skip(r"--[^\n\r]*"))]
pub enum Token {
    #[token("{", with_span)]
    LBRACE(Loc),
    #[token("}", with_span)]
    RBRACE(Loc),
    #[token("[", with_span)]
    LBRACKET(Loc),
    #[token("]", with_span)]
    RBRACKET(Loc),
    #[token(",", with_span)]
    COMMA(Loc),
    #[token(";", with_span)]
    SEMI(Loc),
    #[token("=", with_span)]
    EQUAL(Loc),
    #[token("return", with_span)]
    RETURN(Loc),
    #[token("true", with_span)]
    TRUE(Loc),
    #[token("false", with_span)]
    FALSE(Loc),
    #[regex(r#""([^"\\\n]|\\.)*""#, with_string)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, with_string)]
    STRING((Loc, String)),
    #[regex(r"-?[0-9]+", with_int)]
    INT((Loc, i64)),
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", with_lexeme)]
    LIDENT((Loc, String)),
    EOF(Loc),
}

fn newline_callback(lex: &mut Lexer<Token>) -> Skip {
    lex.extras.0 += 1;
    lex.extras.1 = lex.span().end;
    Skip
}

fn get_loc(lex: &mut Lexer<'_, Token>) -> Loc {
    let span = lex.span();
    let start = Pos {
        line: lex.extras.0,
        column: span.start - lex.extras.1,
    };
    let end = Pos {
        line: lex.extras.0,
        column: span.end - lex.extras.1,
    };
    start..end
}

fn with_span(lex: &mut Lexer<'_, Token>) -> Loc {
    get_loc(lex)
}

fn with_lexeme(lex: &mut Lexer<'_, Token>) -> (Loc, String) {
    let s = lex.slice();
    let loc = get_loc(lex);
    (loc, s.to_string())
}

fn with_int(lex: &mut Lexer<'_, Token>) -> (Loc, i64) {
    let s = lex.slice();
    let loc = get_loc(lex);
    let i = s.parse::<i64>().unwrap(); // Safe because regex ensures valid integer
    (loc, i)
}

fn with_string(lex: &mut Lexer<'_, Token>) -> (Loc, String) {
    let s = lex.slice();
    let loc = get_loc(lex);
    (loc, unescape(&s[1..s.len() - 1]))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug, PartialEq)]
pub enum TokenKind {
    LBRACE,
    RBRACE,
    LBRACKET,
    RBRACKET,
    COMMA,
    SEMI,
    EQUAL,
    RETURN,
    TRUE,
    FALSE,
    STRING,
    INT,
    LIDENT,
    EOF,
}

impl Token {
    pub fn range(&self) -> &Loc {
        match self {
            Token::LBRACE(r)
            | Token::RBRACE(r)
            | Token::LBRACKET(r)
            | Token::RBRACKET(r)
            | Token::COMMA(r)
            | Token::SEMI(r)
            | Token::EQUAL(r)
            | Token::RETURN(r)
            | Token::TRUE(r)
            | Token::FALSE(r)
            | Token::EOF(r)
            | Token::STRING((r, _))
            | Token::INT((r, _))
            | Token::LIDENT((r, _)) => r,
        }
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Token::LBRACE(_) => TokenKind::LBRACE,
            Token::RBRACE(_) => TokenKind::RBRACE,
            Token::LBRACKET(_) => TokenKind::LBRACKET,
            Token::RBRACKET(_) => TokenKind::RBRACKET,
            Token::COMMA(_) => TokenKind::COMMA,
            Token::SEMI(_) => TokenKind::SEMI,
            Token::EQUAL(_) => TokenKind::EQUAL,
            Token::RETURN(_) => TokenKind::RETURN,
            Token::TRUE(_) => TokenKind::TRUE,
            Token::FALSE(_) => TokenKind::FALSE,
            Token::STRING(_) => TokenKind::STRING,
            Token::INT(_) => TokenKind::INT,
            Token::LIDENT(_) => TokenKind::LIDENT,
            Token::EOF(_) => TokenKind::EOF,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LBRACE(_) => write!(f, "{{"),
            Token::RBRACE(_) => write!(f, "}}"),
            Token::LBRACKET(_) => write!(f, "["),
            Token::RBRACKET(_) => write!(f, "]"),
            Token::COMMA(_) => write!(f, ","),
            Token::SEMI(_) => write!(f, ";"),
            Token::EQUAL(_) => write!(f, "="),
            Token::RETURN(_) => write!(f, "return"),
            Token::TRUE(_) => write!(f, "true"),
            Token::FALSE(_) => write!(f, "false"),
            Token::STRING((_, s)) => write!(f, "\"{s}\""),
            Token::INT((_, i)) => write!(f, "{i}"),
            Token::LIDENT((_, s)) => write!(f, "{s}"),
            Token::EOF(_) => write!(f, "<eof>"),
        }
    }
}

pub fn tokenize(input: &str) -> anyhow::Result<Vec<Token>> {
    let mut lexer = Token::lexer(input);
    lexer.extras.0 = 1; // Initialize line counter to 1 (first line is line 1, not 0)
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(t) => tokens.push(t),
            Err(_) => return Err(anyhow!("Lexing error at {:?}", lexer.span())),
        }
    }
    let pos = Pos {
        line: lexer.extras.0,
        column: lexer.span().end - lexer.extras.1,
    };
    tokens.push(Token::EOF(pos.clone()..pos));
    Ok(tokens)
}

#[test]
fn tokenize_test() {
    let input = r#"
-- demo package
return {
  package = "example.org/demo",
  exports = { "util", 'codec', },
  limit = -3,
}
"#;
    let tokens = tokenize(input).unwrap();
    let kinds = tokens.iter().map(|t| t.kind()).collect::<Vec<_>>();
    expect_test::expect![[r#"
        [
            RETURN,
            LBRACE,
            LIDENT,
            EQUAL,
            STRING,
            COMMA,
            LIDENT,
            EQUAL,
            LBRACE,
            STRING,
            COMMA,
            STRING,
            COMMA,
            RBRACE,
            COMMA,
            LIDENT,
            EQUAL,
            INT,
            COMMA,
            RBRACE,
            EOF,
        ]
    "#]]
    .assert_debug_eq(&kinds);
}

#[test]
fn tokenize_tracks_lines() {
    let tokens = tokenize("return\n{\n}").unwrap();
    assert_eq!(tokens[1].range().start.line, 2);
    assert_eq!(tokens[2].range().start.line, 3);
}

#[test]
fn tokenize_unescapes_strings() {
    let tokens = tokenize(r#"return "a\nb\"c""#).unwrap();
    match &tokens[1] {
        Token::STRING((_, s)) => assert_eq!(s, "a\nb\"c"),
        other => panic!("expected string, got {other:?}"),
    }
}
