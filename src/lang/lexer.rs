// Copyright 2026 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

use thiserror::Error;

use super::token::{Location, Token, TokenKind, KEYWORDS};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    #[error("{loc}: unterminated string literal")]
    UnterminatedString { loc: Location },
    #[error("{loc}: unexpected character '{ch}'")]
    UnknownCharacter { ch: char, loc: Location },
    #[error("{loc}: unindent does not match any outer indentation level")]
    BadDedent { loc: Location },
}

/// Tokenize a source string, synthesizing `Newline`, `Indent`,
/// `Dedent` and a final `Eof`. Newlines inside balanced `()[]{}` are
/// suppressed, as is indentation tracking; blank and comment-only
/// lines never change the indent stack. Tabs count as 8 columns.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(source).run()
}

const TAB_WIDTH: usize = 8;

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    indents: Vec<usize>,
    depth: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            indents: vec![0],
            depth: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexerError> {
        self.line_start()?;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        self.emit_marker(TokenKind::Newline);
                        self.line_start()?;
                    }
                }
                '#' => self.skip_comment(),
                '/' if self.peek_at(1) == Some('/') => self.skip_comment(),
                '\'' | '"' => self.string(c)?,
                c if c.is_ascii_digit() => self.number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.word(),
                _ => self.operator()?,
            }
        }
        self.emit_marker(TokenKind::Newline);
        while self.indents.len() > 1 {
            self.indents.pop();
            let loc = self.here(0);
            self.tokens.push(Token::new(TokenKind::Dedent, "", loc));
        }
        let loc = self.here(0);
        self.tokens.push(Token::new(TokenKind::Eof, "", loc));
        Ok(self.tokens)
    }

    /// Measure indentation at the start of a logical line, skipping
    /// blank and comment-only lines, and emit Indent/Dedent tokens.
    fn line_start(&mut self) -> Result<(), LexerError> {
        loop {
            let mut width = 0usize;
            loop {
                match self.peek() {
                    Some(' ') => {
                        width += 1;
                        self.bump();
                    }
                    Some('\t') => {
                        width = width / TAB_WIDTH * TAB_WIDTH + TAB_WIDTH;
                        self.bump();
                    }
                    Some('\r') => {
                        self.bump();
                    }
                    _ => break,
                }
            }
            match self.peek() {
                None => return Ok(()),
                Some('\n') => {
                    self.bump();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {
                    let top = *self.indents.last().unwrap();
                    if width > top {
                        self.indents.push(width);
                        let loc = self.here(0);
                        self.tokens.push(Token::new(TokenKind::Indent, "", loc));
                    } else if width < top {
                        while *self.indents.last().unwrap() > width {
                            self.indents.pop();
                            let loc = self.here(0);
                            self.tokens.push(Token::new(TokenKind::Dedent, "", loc));
                        }
                        if *self.indents.last().unwrap() != width {
                            return Err(LexerError::BadDedent { loc: self.here(0) });
                        }
                    }
                    return Ok(());
                }
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<(), LexerError> {
        let start = self.here(0);
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LexerError::UnterminatedString { loc: start })
                }
                Some('\\') => {
                    self.bump();
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c @ ('\'' | '"' | '\\')) => c,
                        Some(c) => c,
                        None => return Err(LexerError::UnterminatedString { loc: start }),
                    };
                    value.push(escaped);
                    self.bump();
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        let length = self.pos as u32 - start.offset;
        let loc = Location { length, ..start };
        self.tokens
            .push(Token::new(TokenKind::Str(value.clone()), value, loc));
        Ok(())
    }

    fn number(&mut self) {
        let start = self.here(0);
        let begin = self.pos;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.bump();
        }
        if self.peek() == Some('.')
            && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.bump();
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.bump();
            }
        }
        let text: String = self.chars[begin..self.pos].iter().collect();
        let value: f64 = text.parse().unwrap_or(0.0);
        let loc = Location {
            length: (self.pos - begin) as u32,
            ..start
        };
        self.tokens.push(Token::new(TokenKind::Number(value), text, loc));
    }

    fn word(&mut self) {
        let start = self.here(0);
        let begin = self.pos;
        while self
            .peek()
            .map(|c| c.is_ascii_alphanumeric() || c == '_')
            .unwrap_or(false)
        {
            self.bump();
        }
        let text: String = self.chars[begin..self.pos].iter().collect();
        let loc = Location {
            length: (self.pos - begin) as u32,
            ..start
        };
        let kind = if is_square_literal(&text) {
            TokenKind::SquareLit
        } else if let Some(keyword) = KEYWORDS.get(text.as_str()) {
            keyword.clone()
        } else {
            TokenKind::Ident
        };
        self.tokens.push(Token::new(kind, text, loc));
    }

    fn operator(&mut self) -> Result<(), LexerError> {
        use TokenKind::*;
        let start = self.here(0);
        let c = self.bump().unwrap();
        let (kind, extra) = match c {
            ':' => (Colon, 0),
            ',' => (Comma, 0),
            '.' => (Dot, 0),
            ';' => (Semicolon, 0),
            '?' => (Question, 0),
            '%' => (Percent, 0),
            '(' => {
                self.depth += 1;
                (LParen, 0)
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                (RParen, 0)
            }
            '[' => {
                self.depth += 1;
                (LBracket, 0)
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                (RBracket, 0)
            }
            '{' => {
                self.depth += 1;
                (LBrace, 0)
            }
            '}' => {
                self.depth = self.depth.saturating_sub(1);
                (RBrace, 0)
            }
            '=' => match (self.peek(), self.peek_at(1)) {
                (Some('='), Some('=')) => (EqEqEq, 2),
                (Some('='), _) => (EqEq, 1),
                (Some('>'), _) => (FatArrow, 1),
                _ => (Assign, 0),
            },
            '!' => match (self.peek(), self.peek_at(1)) {
                (Some('='), Some('=')) => (NotEqEq, 2),
                (Some('='), _) => (NotEq, 1),
                _ => (Bang, 0),
            },
            '<' => match self.peek() {
                Some('=') => (LtEq, 1),
                _ => (Lt, 0),
            },
            '>' => match self.peek() {
                Some('=') => (GtEq, 1),
                _ => (Gt, 0),
            },
            '&' => match self.peek() {
                Some('&') => (AndAnd, 1),
                _ => (Amp, 0),
            },
            '|' => match self.peek() {
                Some('|') => (OrOr, 1),
                _ => (Pipe, 0),
            },
            '+' => match self.peek() {
                Some('=') => (PlusEq, 1),
                _ => (Plus, 0),
            },
            '-' => match self.peek() {
                Some('=') => (MinusEq, 1),
                Some('>') => (Arrow, 1),
                _ => (Minus, 0),
            },
            '*' => match self.peek() {
                Some('=') => (StarEq, 1),
                _ => (Star, 0),
            },
            '/' => match self.peek() {
                Some('=') => (SlashEq, 1),
                _ => (Slash, 0),
            },
            other => {
                return Err(LexerError::UnknownCharacter {
                    ch: other,
                    loc: start,
                })
            }
        };
        for _ in 0..extra {
            self.bump();
        }
        let length = 1 + extra as u32;
        let loc = Location { length, ..start };
        let begin = start.offset as usize;
        let text: String = self.chars[begin..begin + length as usize].iter().collect();
        self.tokens.push(Token::new(kind, text, loc));
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Emit a structure marker unless the previous token already is
    /// one (keeps blank regions from stacking Newlines).
    fn emit_marker(&mut self, kind: TokenKind) {
        let redundant = matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Indent) | Some(TokenKind::Dedent)
        );
        if !redundant {
            let loc = self.here(0);
            self.tokens.push(Token::new(kind, "", loc));
        }
    }

    fn here(&self, length: u32) -> Location {
        Location::new(self.line, self.col, self.pos as u32, length)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }
}

fn is_square_literal(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    let rest: Vec<char> = chars.collect();
    !rest.is_empty() && rest.len() <= 2 && rest.iter().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_header() {
        assert_eq!(
            kinds("game: \"Test\"\n"),
            vec![Game, Colon, Str("Test".to_string()), Newline, Eof]
        );
    }

    #[test]
    fn test_indent_dedent() {
        // "8x8" lexes as a number then a word; "x8" happens to have
        // square shape, which the size parser reinterprets.
        let source = "board:\n    size: 8x8\npiece Knight:\n";
        assert_eq!(
            kinds(source),
            vec![
                Board, Colon, Newline, Indent, Size, Colon, Number(8.0), SquareLit, Newline,
                Dedent, Piece, Ident, Colon, Newline, Eof,
            ]
        );
    }

    #[test]
    fn test_nested_blocks_close_at_eof() {
        let source = "a:\n  b:\n    c: 1";
        assert_eq!(
            kinds(source),
            vec![
                Ident, Colon, Newline, Indent, Ident, Colon, Newline, Indent, Ident, Colon,
                Number(1.0), Newline, Dedent, Dedent, Eof,
            ]
        );
    }

    #[test]
    fn test_square_literal_vs_identifier() {
        assert_eq!(kinds("e4\n")[0], SquareLit);
        assert_eq!(kinds("e4x\n")[0], Ident);
        assert_eq!(kinds("c10\n")[0], SquareLit);
        assert_eq!(kinds("c100\n")[0], Ident);
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "# leading comment\npiece Knight: # trailing\n// whole line\n";
        assert_eq!(kinds(source), vec![Piece, Ident, Colon, Newline, Eof]);
    }

    #[test]
    fn test_blank_lines_keep_indent() {
        let source = "a:\n    b: 1\n\n    c: 2\n";
        assert_eq!(
            kinds(source),
            vec![
                Ident, Colon, Newline, Indent, Ident, Colon, Number(1.0), Newline, Ident, Colon,
                Number(2.0), Newline, Dedent, Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_suppressed_in_brackets() {
        let source = "traits: [royal,\n    phase]\n";
        assert_eq!(
            kinds(source),
            vec![
                Traits, Colon, LBracket, Ident, Comma, Ident, RBracket, Newline, Eof,
            ]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("a == b != c === d <= e >= f && g || h += i -> j => k\n")
                .into_iter()
                .filter(|k| !matches!(k, Ident | Newline | Eof))
                .collect::<Vec<_>>(),
            vec![EqEq, NotEq, EqEqEq, LtEq, GtEq, AndAnd, OrOr, PlusEq, Arrow, FatArrow]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize("description: \"a \\\"b\\\" \\n c\"\n").unwrap();
        assert_eq!(tokens[2].kind, Str("a \"b\" \n c".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("name: \"oops\n"),
            Err(LexerError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_unknown_character() {
        assert!(matches!(
            tokenize("piece ` Knight\n"),
            Err(LexerError::UnknownCharacter { ch: '`', .. })
        ));
    }

    #[test]
    fn test_bad_dedent() {
        let source = "a:\n        b: 1\n    c: 2\n";
        assert!(matches!(
            tokenize(source),
            Err(LexerError::BadDedent { .. })
        ));
    }

    #[test]
    fn test_locations() {
        let tokens = tokenize("game: \"X\"\npiece Y:\n").unwrap();
        let piece = tokens.iter().find(|t| t.kind == Piece).unwrap();
        assert_eq!(piece.loc.line, 2);
        assert_eq!(piece.loc.column, 1);
        assert_eq!(piece.loc.length, 5);
    }
}
