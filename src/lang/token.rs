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

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A half-open source range. `line` and `column` are 1-based for
/// display; `offset` and `length` count characters.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
    pub length: u32,
}

impl Location {
    pub const fn new(line: u32, column: u32, offset: u32, length: u32) -> Self {
        Self {
            line,
            column,
            offset,
            length,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Section and declaration keywords
    Game,
    Extends,
    Board,
    Piece,
    Effect,
    Trigger,
    Pattern,
    Move,
    Capture,
    Traits,
    State,
    On,
    When,
    Do,
    Script,
    Setup,
    Victory,
    Draw,
    Rules,
    Add,
    Remove,
    Replace,
    Size,
    Zones,
    Optional,
    Description,
    Blocks,
    Visual,

    // Statement keywords (reserved for script-flavored blocks)
    Let,
    Const,
    Var,
    If,
    Else,
    For,
    While,
    Return,
    Of,
    In,

    // Pattern primitives and directions
    Step,
    Slide,
    Leap,
    Hop,
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Orthogonal,
    Diagonal,
    Any,
    Forward,
    Backward,

    // Condition keywords
    Empty,
    Enemy,
    Friend,
    Clear,
    Check,
    FirstMove,
    Rank,
    File,
    Captured,
    Checks,
    Opponent,

    // Action keywords
    Set,
    Create,
    Transform,
    Mark,
    Win,
    Lose,
    Cancel,
    Apply,

    // Operators-as-words
    And,
    Or,
    Not,
    Where,

    // Colors and literal words
    White,
    Black,
    True,
    False,
    Null,

    // Literals
    Number(f64),
    Str(String),
    Ident,
    /// `[a-z][0-9]{1,2}` at a word boundary; reinterpreted as an
    /// identifier by the parser where context demands.
    SquareLit,

    // Punctuation
    Colon,
    Comma,
    Dot,
    Semicolon,
    Question,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pipe,
    Amp,
    Bang,
    Assign,
    Lt,
    Gt,

    // Compound operators
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    Arrow,
    FatArrow,

    // Synthesized structure
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Whether this kind is a reserved word (usable as a property name
    /// or identifier in the positions the grammar allows).
    pub fn is_keyword(&self) -> bool {
        KEYWORDS.values().any(|kind| kind == self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: Location,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, loc: Location) -> Self {
        Self {
            kind,
            text: text.into(),
            loc,
        }
    }
}

pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    HashMap::from([
        ("game", Game),
        ("extends", Extends),
        ("board", Board),
        ("piece", Piece),
        ("effect", Effect),
        ("trigger", Trigger),
        ("pattern", Pattern),
        ("move", Move),
        ("capture", Capture),
        ("traits", Traits),
        ("state", State),
        ("on", On),
        ("when", When),
        ("do", Do),
        ("script", Script),
        ("setup", Setup),
        ("victory", Victory),
        ("draw", Draw),
        ("rules", Rules),
        ("add", Add),
        ("remove", Remove),
        ("replace", Replace),
        ("size", Size),
        ("zones", Zones),
        ("optional", Optional),
        ("description", Description),
        ("blocks", Blocks),
        ("visual", Visual),
        ("let", Let),
        ("const", Const),
        ("var", Var),
        ("if", If),
        ("else", Else),
        ("for", For),
        ("while", While),
        ("return", Return),
        ("of", Of),
        ("in", In),
        ("step", Step),
        ("slide", Slide),
        ("leap", Leap),
        ("hop", Hop),
        ("north", North),
        ("south", South),
        ("east", East),
        ("west", West),
        ("northeast", NorthEast),
        ("northwest", NorthWest),
        ("southeast", SouthEast),
        ("southwest", SouthWest),
        ("orthogonal", Orthogonal),
        ("diagonal", Diagonal),
        ("any", Any),
        ("forward", Forward),
        ("backward", Backward),
        ("empty", Empty),
        ("enemy", Enemy),
        ("friend", Friend),
        ("clear", Clear),
        ("check", Check),
        ("first_move", FirstMove),
        ("rank", Rank),
        ("file", File),
        ("captured", Captured),
        ("checks", Checks),
        ("opponent", Opponent),
        ("set", Set),
        ("create", Create),
        ("transform", Transform),
        ("mark", Mark),
        ("win", Win),
        ("lose", Lose),
        ("cancel", Cancel),
        ("apply", Apply),
        ("and", And),
        ("or", Or),
        ("not", Not),
        ("where", Where),
        ("White", White),
        ("Black", Black),
        ("true", True),
        ("false", False),
        ("null", Null),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(KEYWORDS.get("piece"), Some(&TokenKind::Piece));
        assert_eq!(KEYWORDS.get("first_move"), Some(&TokenKind::FirstMove));
        assert_eq!(KEYWORDS.get("White"), Some(&TokenKind::White));
        assert_eq!(KEYWORDS.get("knight"), None);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new(3, 7, 42, 1).to_string(), "3:7");
    }
}
