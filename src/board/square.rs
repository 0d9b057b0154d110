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
use std::fmt;
use std::ops::{Add, Sub};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use super::piece::Color;

use Color::*;

/// Boards are at most 26 files wide (`a`..`z`) and 99 ranks tall.
pub const MAX_FILES: u8 = 26;
pub const MAX_RANKS: u8 = 99;

/// A square coordinate. Both components are zero-based; rank 0 is
/// White's home rank and prints as `1`.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Position {
    pub file: u8,
    pub rank: u8,
}

impl Position {
    #[inline]
    pub const fn new(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    /// Parse square notation: one lowercase file letter followed by a
    /// 1- or 2-digit rank, e.g. `e4` or `c10`.
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let f = chars.next()?;
        if !f.is_ascii_lowercase() {
            return None;
        }
        let digits: String = chars.collect();
        if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let rank: u8 = digits.parse().ok()?;
        if rank == 0 {
            return None;
        }
        Some(Self::new(f as u8 - b'a', rank - 1))
    }

    #[inline]
    pub fn file_char(&self) -> char {
        (b'a' + self.file) as char
    }

    /// Step by a signed offset, returning `None` when the result would
    /// leave the addressable range. Board bounds are checked separately.
    pub fn step(self, offset: Offset) -> Option<Self> {
        let file = (self.file as i16).checked_add(offset.dx)?;
        let rank = (self.rank as i16).checked_add(offset.dy)?;
        if file < 0 || rank < 0 || file >= MAX_FILES as i16 || rank >= MAX_RANKS as i16 {
            return None;
        }
        Some(Self::new(file as u8, rank as u8))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank + 1)
    }
}

impl Add<Offset> for Position {
    type Output = Option<Position>;
    fn add(self, rhs: Offset) -> Self::Output {
        self.step(rhs)
    }
}

impl Sub for Position {
    type Output = Offset;
    fn sub(self, rhs: Self) -> Self::Output {
        Offset::new(
            self.file as i16 - rhs.file as i16,
            self.rank as i16 - rhs.rank as i16,
        )
    }
}

/// A signed square delta. `dy` is positive toward higher ranks, which
/// is White's forward direction.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Offset {
    pub dx: i16,
    pub dy: i16,
}

impl Offset {
    pub const fn new(dx: i16, dy: i16) -> Self {
        Self { dx, dy }
    }

    /// Reduce to a unit step when the offset lies on a file, rank or
    /// diagonal. Returns `None` otherwise (and for the zero offset).
    pub fn to_unit(self) -> Option<Self> {
        let (dx, dy) = match (self.dx, self.dy) {
            (0, 0) => return None,
            (dx, dy) if dx == 0 || dy == 0 || dx.abs() == dy.abs() => (dx.signum(), dy.signum()),
            _ => return None,
        };
        Some(Self { dx, dy })
    }
}

/// The eight compass directions, named from White's point of view.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Compass {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

use Compass::*;

impl Compass {
    #[inline]
    pub const fn vector(&self) -> Offset {
        match self {
            North => Offset::new(0, 1),
            NorthEast => Offset::new(1, 1),
            East => Offset::new(1, 0),
            SouthEast => Offset::new(1, -1),
            South => Offset::new(0, -1),
            SouthWest => Offset::new(-1, -1),
            West => Offset::new(-1, 0),
            NorthWest => Offset::new(-1, 1),
        }
    }

    pub fn orthogonals() -> impl Iterator<Item = Self> {
        [North, East, South, West].into_iter()
    }

    pub fn diagonals() -> impl Iterator<Item = Self> {
        [NorthEast, SouthEast, SouthWest, NorthWest].into_iter()
    }
}

/// A movement direction as written in piece patterns: a single compass
/// point, a compound set, or an owner-relative forward/backward.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Compass(Compass),
    Orthogonal,
    Diagonal,
    Any,
    Forward,
    Backward,
}

impl Direction {
    /// The concrete step vectors this direction denotes for a piece
    /// owned by `owner`.
    pub fn vectors(&self, owner: Color) -> Vec<Offset> {
        match self {
            Direction::Compass(c) => vec![c.vector()],
            Direction::Orthogonal => Compass::orthogonals().map(|c| c.vector()).collect(),
            Direction::Diagonal => Compass::diagonals().map(|c| c.vector()).collect(),
            Direction::Any => Compass::iter().map(|c| c.vector()).collect(),
            Direction::Forward => vec![forward(owner)],
            Direction::Backward => vec![Offset::new(0, -forward(owner).dy)],
        }
    }
}

#[inline]
pub const fn forward(owner: Color) -> Offset {
    match owner {
        White => Offset::new(0, 1),
        Black => Offset::new(0, -1),
    }
}

/// Expand a leap shape to its distinct sign/swap symmetries: 8 offsets
/// in general, 4 when `dx == dy`, fewer when a component is zero.
pub fn leap_offsets(dx: u8, dy: u8) -> Vec<Offset> {
    let (dx, dy) = (dx as i16, dy as i16);
    let mut offsets = Vec::with_capacity(8);
    for (x, y) in [(dx, dy), (dy, dx)] {
        for sx in [1, -1] {
            for sy in [1, -1] {
                let candidate = Offset::new(x * sx, y * sy);
                if !offsets.contains(&candidate) {
                    offsets.push(candidate);
                }
            }
        }
    }
    offsets
}

#[inline]
pub fn chebyshev(a: Position, b: Position) -> u16 {
    let d = a - b;
    d.dx.abs().max(d.dy.abs()) as u16
}

#[inline]
pub fn manhattan(a: Position, b: Position) -> u16 {
    let d = a - b;
    (d.dx.abs() + d.dy.abs()) as u16
}

/// The squares strictly between `a` and `b`, walking a unit step.
/// Empty when the two squares do not share a file, rank or diagonal.
pub fn between(a: Position, b: Position) -> Vec<Position> {
    let mut squares = Vec::new();
    if let Some(step) = (b - a).to_unit() {
        let mut current = a.step(step);
        while let Some(pos) = current {
            if pos == b {
                break;
            }
            squares.push(pos);
            current = pos.step(step);
        }
    }
    squares
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for name in ["a1", "e4", "h8", "z99", "c10"] {
            let pos = Position::parse(name).unwrap();
            assert_eq!(pos.to_string(), name, "round-trip failed for {}", name);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Position::parse("").is_none());
        assert!(Position::parse("e").is_none());
        assert!(Position::parse("4e").is_none());
        assert!(Position::parse("E4").is_none());
        assert!(Position::parse("e0").is_none());
        assert!(Position::parse("e100").is_none());
    }

    #[test]
    fn test_parse_zero_based() {
        assert_eq!(Position::parse("a1").unwrap(), Position::new(0, 0));
        assert_eq!(Position::parse("e4").unwrap(), Position::new(4, 3));
    }

    #[test]
    fn test_step_off_edge() {
        let a1 = Position::new(0, 0);
        assert_eq!(a1.step(Offset::new(-1, 0)), None);
        assert_eq!(a1.step(Offset::new(0, -1)), None);
        assert_eq!(a1.step(Offset::new(1, 1)), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_direction_vectors() {
        assert_eq!(Direction::Orthogonal.vectors(White).len(), 4);
        assert_eq!(Direction::Diagonal.vectors(White).len(), 4);
        assert_eq!(Direction::Any.vectors(White).len(), 8);
        assert_eq!(Direction::Forward.vectors(White), vec![Offset::new(0, 1)]);
        assert_eq!(Direction::Forward.vectors(Black), vec![Offset::new(0, -1)]);
        assert_eq!(Direction::Backward.vectors(Black), vec![Offset::new(0, 1)]);
    }

    #[test]
    fn test_leap_offsets_knight() {
        let offsets = leap_offsets(1, 2);
        assert_eq!(offsets.len(), 8);
    }

    #[test]
    fn test_leap_offsets_symmetric_shape() {
        let offsets = leap_offsets(2, 2);
        assert_eq!(offsets.len(), 4);
    }

    #[test]
    fn test_between_on_rank() {
        let squares = between(Position::parse("a3").unwrap(), Position::parse("e3").unwrap());
        assert_eq!(squares.len(), 3);
        assert!(squares.contains(&Position::parse("c3").unwrap()));
    }

    #[test]
    fn test_between_on_diagonal() {
        let squares = between(Position::parse("a1").unwrap(), Position::parse("d4").unwrap());
        assert_eq!(squares.len(), 2);
        assert!(squares.contains(&Position::parse("b2").unwrap()));
        assert!(squares.contains(&Position::parse("c3").unwrap()));
    }

    #[test]
    fn test_between_not_linear() {
        let squares = between(Position::parse("a1").unwrap(), Position::parse("c2").unwrap());
        assert!(squares.is_empty());
    }

    #[test]
    fn test_distances() {
        let a = Position::parse("a1").unwrap();
        let b = Position::parse("d3").unwrap();
        assert_eq!(chebyshev(a, b), 3);
        assert_eq!(manhattan(a, b), 5);
    }
}
