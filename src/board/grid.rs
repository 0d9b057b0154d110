// Copyright 2023 Tobin Edwards
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

use super::piece::{Color, Piece, PieceId, StandardPiece};
use super::square::{Offset, Position};
use crate::rules::{BlockKind, Value};

/// A marker attached to a square: a visual tag, a wall, a trap. The
/// optional `source` links back to the piece that created it by id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Effect {
    pub kind: String,
    pub owner: Option<Color>,
    pub blocks: BlockKind,
    pub visual: Option<String>,
    pub source: Option<PieceId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SquareContent {
    pub piece: Option<PieceId>,
    pub effects: Vec<Effect>,
}

/// A rectangular board. Pieces live in one owning map keyed by id; the
/// square grid stores ids only, and every mutation goes through the
/// board so the two stay consistent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Board {
    width: u8,
    height: u8,
    squares: Vec<SquareContent>,
    pieces: BTreeMap<PieceId, Piece>,
    zones: BTreeMap<String, BTreeSet<Position>>,
    next_piece_id: u32,
}

impl Board {
    pub fn new(width: u8, height: u8) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            squares: vec![SquareContent::default(); count],
            pieces: BTreeMap::new(),
            zones: BTreeMap::new(),
            next_piece_id: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u8 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.file < self.width && pos.rank < self.height
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        pos.rank as usize * self.width as usize + pos.file as usize
    }

    pub fn square(&self, pos: Position) -> Option<&SquareContent> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(&self.squares[self.index(pos)])
    }

    /// The piece occupying `pos`, if any.
    pub fn at(&self, pos: Position) -> Option<&Piece> {
        let id = self.square(pos)?.piece?;
        self.pieces.get(&id)
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(&id)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = &Piece> {
        self.pieces.values().filter(move |p| p.owner == color)
    }

    pub fn count_of_type(&self, color: Color, type_name: &str) -> usize {
        self.pieces_of(color)
            .filter(|p| p.type_name == type_name)
            .count()
    }

    /// The first royal piece of `color` by id order.
    pub fn find_royal(&self, color: Color) -> Option<&Piece> {
        self.pieces_of(color).find(|p| p.is_royal())
    }

    #[inline]
    pub fn is_empty(&self, pos: Position) -> bool {
        self.square(pos).map(|sq| sq.piece.is_none()).unwrap_or(false)
    }

    #[inline]
    pub fn has_friend(&self, pos: Position, color: Color) -> bool {
        self.at(pos).map(|p| p.owner == color).unwrap_or(false)
    }

    #[inline]
    pub fn has_enemy(&self, pos: Position, color: Color) -> bool {
        self.at(pos).map(|p| p.owner != color).unwrap_or(false)
    }

    /// Spawn a new piece, allocating its id. Any occupant of the
    /// target square is removed and returned.
    pub fn spawn(
        &mut self,
        type_name: &str,
        owner: Color,
        pos: Position,
        traits: BTreeSet<String>,
        state: BTreeMap<String, Value>,
    ) -> (PieceId, Option<Piece>) {
        debug_assert!(self.in_bounds(pos));
        let captured = self.remove_at(pos);
        let id = PieceId(self.next_piece_id);
        self.next_piece_id += 1;
        let piece = Piece {
            id,
            type_name: type_name.to_string(),
            owner,
            pos,
            traits,
            state,
        };
        let index = self.index(pos);
        self.squares[index].piece = Some(id);
        self.pieces.insert(id, piece);
        (id, captured)
    }

    /// Put a previously removed piece back, keeping its id. Used by
    /// undo; the id counter is advanced past it if necessary.
    pub fn restore(&mut self, piece: Piece) {
        debug_assert!(self.in_bounds(piece.pos));
        self.next_piece_id = self.next_piece_id.max(piece.id.0 + 1);
        let index = self.index(piece.pos);
        self.squares[index].piece = Some(piece.id);
        self.pieces.insert(piece.id, piece);
    }

    pub fn remove_piece(&mut self, id: PieceId) -> Option<Piece> {
        let piece = self.pieces.remove(&id)?;
        let index = self.index(piece.pos);
        if self.squares[index].piece == Some(id) {
            self.squares[index].piece = None;
        }
        Some(piece)
    }

    pub fn remove_at(&mut self, pos: Position) -> Option<Piece> {
        let id = self.square(pos)?.piece?;
        self.remove_piece(id)
    }

    /// Relocate a piece, returning any captured occupant.
    pub fn move_piece(&mut self, id: PieceId, to: Position) -> Option<Piece> {
        debug_assert!(self.in_bounds(to));
        let from = match self.pieces.get(&id) {
            Some(piece) => piece.pos,
            None => return None,
        };
        let captured = if self.square(to).and_then(|sq| sq.piece) != Some(id) {
            self.remove_at(to)
        } else {
            None
        };
        let from_index = self.index(from);
        let to_index = self.index(to);
        self.squares[from_index].piece = None;
        self.squares[to_index].piece = Some(id);
        if let Some(piece) = self.pieces.get_mut(&id) {
            piece.pos = to;
        }
        captured
    }

    /// Whether the straight line from `a` to `b` is free of pieces,
    /// endpoints excluded. Non-linear pairs have no squares between
    /// them and so report clear.
    pub fn is_path_clear(&self, a: Position, b: Position) -> bool {
        super::square::between(a, b)
            .into_iter()
            .all(|pos| self.is_empty(pos))
    }

    /// All in-bounds squares from `from` along `step`, nearest first.
    pub fn ray(&self, from: Position, step: Offset) -> Vec<Position> {
        let mut squares = Vec::new();
        let mut current = from.step(step);
        while let Some(pos) = current {
            if !self.in_bounds(pos) {
                break;
            }
            squares.push(pos);
            current = pos.step(step);
        }
        squares
    }

    pub fn set_zone(&mut self, name: &str, squares: BTreeSet<Position>) {
        self.zones.insert(name.to_string(), squares);
    }

    pub fn zone(&self, name: &str) -> Option<&BTreeSet<Position>> {
        self.zones.get(name)
    }

    pub fn in_zone(&self, name: &str, pos: Position) -> bool {
        self.zones
            .get(name)
            .map(|squares| squares.contains(&pos))
            .unwrap_or(false)
    }

    pub fn zones(&self) -> &BTreeMap<String, BTreeSet<Position>> {
        &self.zones
    }

    pub fn effects_at(&self, pos: Position) -> &[Effect] {
        self.square(pos).map(|sq| sq.effects.as_slice()).unwrap_or(&[])
    }

    pub fn add_effect(&mut self, pos: Position, effect: Effect) {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            self.squares[index].effects.push(effect);
        }
    }

    /// Remove effects at `pos`; with a kind, only that kind.
    pub fn clear_effects(&mut self, pos: Position, kind: Option<&str>) {
        if !self.in_bounds(pos) {
            return;
        }
        let index = self.index(pos);
        match kind {
            Some(kind) => self.squares[index].effects.retain(|e| e.kind != kind),
            None => self.squares[index].effects.clear(),
        }
    }

    /// Whether an effect on `pos` keeps a piece of `color` out.
    pub fn blocks_entry(&self, pos: Position, color: Color) -> bool {
        self.effects_at(pos).iter().any(|effect| match effect.blocks {
            BlockKind::None => false,
            BlockKind::All => true,
            BlockKind::Enemy => effect.owner.map(|owner| owner != color).unwrap_or(true),
            BlockKind::Friend => effect.owner.map(|owner| owner == color).unwrap_or(false),
        })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..self.height).rev() {
            for file in 0..self.width {
                let pos = Position::new(file, rank);
                let c = match self.at(pos) {
                    Some(piece) => match StandardPiece::from_name(&piece.type_name) {
                        Some(std) => std.fen_char(piece.owner),
                        None => '?',
                    },
                    None => '.',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_pawn() -> (Board, PieceId) {
        let mut board = Board::new(8, 8);
        let (id, _) = board.spawn(
            "Pawn",
            Color::White,
            Position::parse("e2").unwrap(),
            BTreeSet::new(),
            BTreeMap::new(),
        );
        (board, id)
    }

    #[test]
    fn test_spawn_and_lookup() {
        let (board, id) = board_with_pawn();
        let pos = Position::parse("e2").unwrap();
        let piece = board.at(pos).unwrap();
        assert_eq!(piece.id, id);
        assert_eq!(piece.pos, pos);
        assert_eq!(board.piece(id).unwrap().pos, pos);
    }

    #[test]
    fn test_move_keeps_grid_consistent() {
        let (mut board, id) = board_with_pawn();
        let from = Position::parse("e2").unwrap();
        let to = Position::parse("e4").unwrap();
        let captured = board.move_piece(id, to);
        assert!(captured.is_none());
        assert!(board.at(from).is_none());
        assert_eq!(board.at(to).unwrap().id, id);
        assert_eq!(board.piece(id).unwrap().pos, to);
    }

    #[test]
    fn test_move_captures_occupant() {
        let (mut board, id) = board_with_pawn();
        let target = Position::parse("d3").unwrap();
        board.spawn("Pawn", Color::Black, target, BTreeSet::new(), BTreeMap::new());
        let captured = board.move_piece(id, target).unwrap();
        assert_eq!(captured.owner, Color::Black);
        assert_eq!(board.at(target).unwrap().id, id);
        assert_eq!(board.pieces().count(), 1);
    }

    #[test]
    fn test_restore_preserves_id() {
        let (mut board, id) = board_with_pawn();
        let removed = board.remove_piece(id).unwrap();
        assert!(board.at(removed.pos).is_none());
        board.restore(removed);
        assert_eq!(board.at(Position::parse("e2").unwrap()).unwrap().id, id);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let (mut board, id) = board_with_pawn();
        board.remove_piece(id);
        let (next, _) = board.spawn(
            "Pawn",
            Color::White,
            Position::parse("a2").unwrap(),
            BTreeSet::new(),
            BTreeMap::new(),
        );
        assert!(next > id);
    }

    #[test]
    fn test_path_clear() {
        let (board, _) = board_with_pawn();
        let a1 = Position::parse("a1").unwrap();
        assert!(board.is_path_clear(a1, Position::parse("a8").unwrap()));
        assert!(!board.is_path_clear(
            Position::parse("e1").unwrap(),
            Position::parse("e4").unwrap()
        ));
        // Non-linear pairs have nothing between them.
        assert!(board.is_path_clear(a1, Position::parse("c2").unwrap()));
    }

    #[test]
    fn test_zone_membership() {
        let mut board = Board::new(8, 8);
        let squares: BTreeSet<_> = ["d4", "d5", "e4", "e5"]
            .iter()
            .map(|s| Position::parse(s).unwrap())
            .collect();
        board.set_zone("hill", squares);
        assert!(board.in_zone("hill", Position::parse("d4").unwrap()));
        assert!(!board.in_zone("hill", Position::parse("a1").unwrap()));
        assert!(!board.in_zone("valley", Position::parse("d4").unwrap()));
    }

    #[test]
    fn test_blocking_effects() {
        let mut board = Board::new(8, 8);
        let pos = Position::parse("d4").unwrap();
        board.add_effect(
            pos,
            Effect {
                kind: "Wall".to_string(),
                owner: Some(Color::White),
                blocks: BlockKind::Enemy,
                visual: None,
                source: None,
            },
        );
        assert!(!board.blocks_entry(pos, Color::White));
        assert!(board.blocks_entry(pos, Color::Black));
        board.clear_effects(pos, Some("Wall"));
        assert!(!board.blocks_entry(pos, Color::Black));
    }
}
