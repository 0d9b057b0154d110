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

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut, Not};
use strum_macros::Display;
use strum_macros::EnumIter;

use super::square::Position;
use crate::rules::Value;

use Color::{Black, White};

#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const fn to_index(&self) -> usize {
        *self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "White" => Some(White),
            "Black" => Some(Black),
            _ => None,
        }
    }
}

impl Not for Color {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        match self {
            White => Black,
            Black => White,
        }
    }
}

/// A pair of values indexed by color.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pair<T>((T, T));

impl<T> Pair<T> {
    pub const fn new(white: T, black: T) -> Self {
        Self((white, black))
    }

    pub fn white(&self) -> &T {
        &self.0 .0
    }
    pub fn white_mut(&mut self) -> &mut T {
        &mut self.0 .0
    }
    pub fn black(&self) -> &T {
        &self.0 .1
    }
    pub fn black_mut(&mut self) -> &mut T {
        &mut self.0 .1
    }
}

impl<T: Hash> Hash for Pair<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.white().hash(state);
        self.black().hash(state);
    }
}

impl<T> Index<Color> for Pair<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: Color) -> &Self::Output {
        match index {
            White => self.white(),
            Black => self.black(),
        }
    }
}

impl<T> IndexMut<Color> for Pair<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: Color) -> &mut Self::Output {
        match index {
            White => self.white_mut(),
            Black => self.black_mut(),
        }
    }
}

/// Stable identity of a piece for the lifetime of one board. Ids are
/// allocated by the owning board's counter and never reused.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A piece on the board. The type is an open name resolved against the
/// game's piece definitions; `traits` and `state` are likewise open,
/// with a handful of trait names carrying engine semantics.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Piece {
    pub id: PieceId,
    pub type_name: String,
    pub owner: Color,
    pub pos: Position,
    pub traits: BTreeSet<String>,
    pub state: BTreeMap<String, Value>,
}

impl Piece {
    #[inline]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.contains(name)
    }

    #[inline]
    pub fn is_royal(&self) -> bool {
        self.has_trait("royal")
    }

    /// Numeric state entry, or `None` when absent or non-numeric.
    pub fn state_num(&self, key: &str) -> Option<f64> {
        self.state.get(key).and_then(Value::as_number)
    }

    pub fn state_flag(&self, key: &str) -> bool {
        self.state.get(key).map(Value::truthy).unwrap_or(false)
    }

    pub fn has_moved(&self) -> bool {
        self.state_flag("moved")
    }

    /// A piece sits out while its cooldown counter is positive.
    pub fn on_cooldown(&self) -> bool {
        self.state_num("cooldown").unwrap_or(0.0) > 0.0
    }
}

/// The six standard piece types, used for FEN codes, the default
/// starting position and attack-shape lookups.
#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum StandardPiece {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

use StandardPiece::*;

impl StandardPiece {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "King" => Some(King),
            "Queen" => Some(Queen),
            "Rook" => Some(Rook),
            "Bishop" => Some(Bishop),
            "Knight" => Some(Knight),
            "Pawn" => Some(Pawn),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            King => "King",
            Queen => "Queen",
            Rook => "Rook",
            Bishop => "Bishop",
            Knight => "Knight",
            Pawn => "Pawn",
        }
    }

    pub const fn code(&self) -> char {
        match self {
            King => 'K',
            Queen => 'Q',
            Rook => 'R',
            Bishop => 'B',
            Knight => 'N',
            Pawn => 'P',
        }
    }

    pub fn fen_char(&self, color: Color) -> char {
        match color {
            White => self.code(),
            Black => self.code().to_ascii_lowercase(),
        }
    }

    pub fn from_fen_char(c: char) -> Option<(Color, Self)> {
        let color = if c.is_ascii_uppercase() { White } else { Black };
        let piece = match c.to_ascii_uppercase() {
            'K' => King,
            'Q' => Queen,
            'R' => Rook,
            'B' => Bishop,
            'N' => Knight,
            'P' => Pawn,
            _ => return None,
        };
        Some((color, piece))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_not() {
        assert_eq!(!White, Black);
        assert_eq!(!Black, White);
    }

    #[test]
    fn test_pair_indexing() {
        let mut pair = Pair::new(0u32, 0u32);
        pair[White] += 2;
        pair[Black] += 1;
        assert_eq!(pair[White], 2);
        assert_eq!(pair[Black], 1);
    }

    #[test]
    fn test_fen_char_round_trip() {
        use strum::IntoEnumIterator;
        for piece in StandardPiece::iter() {
            for color in Color::iter() {
                let c = piece.fen_char(color);
                assert_eq!(StandardPiece::from_fen_char(c), Some((color, piece)));
            }
        }
        assert_eq!(StandardPiece::from_fen_char('x'), None);
    }

    #[test]
    fn test_piece_state_helpers() {
        let mut piece = Piece {
            id: PieceId(1),
            type_name: "Pawn".to_string(),
            owner: White,
            pos: Position::new(4, 1),
            traits: BTreeSet::new(),
            state: BTreeMap::new(),
        };
        assert!(!piece.has_moved());
        assert!(!piece.on_cooldown());
        piece.state.insert("moved".to_string(), Value::Bool(true));
        piece.state.insert("cooldown".to_string(), Value::Number(2.0));
        assert!(piece.has_moved());
        assert!(piece.on_cooldown());
    }
}
