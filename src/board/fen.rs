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

use anyhow::{anyhow, bail, Result};

use super::grid::Board;
use super::piece::{Color, StandardPiece};
use super::square::Position;

/// Placement field of the standard chess starting position.
pub const STANDARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

/// Parse a placement-only FEN string into `(square, color, piece)`
/// triples for a board of the given dimensions. Ranks are listed from
/// the top; short ranks are padded (left-aligned) and boards taller
/// than the rank count leave the extra ranks empty.
pub fn parse_placements(
    fen: &str,
    width: u8,
    height: u8,
) -> Result<Vec<(Position, Color, StandardPiece)>> {
    let ranks: Vec<&str> = fen.trim().split('/').collect();
    if ranks.len() > height as usize {
        bail!("FEN has {} ranks but the board is {} tall", ranks.len(), height);
    }
    let mut placements = Vec::new();
    for (i, rank_text) in ranks.iter().enumerate() {
        let rank = height - 1 - i as u8;
        let mut file: u16 = 0;
        let mut digits = String::new();
        for c in rank_text.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            if !digits.is_empty() {
                file += digits.parse::<u16>().unwrap();
                digits.clear();
            }
            let (color, piece) = StandardPiece::from_fen_char(c)
                .ok_or_else(|| anyhow!("unknown FEN piece code '{}'", c))?;
            if file >= width as u16 {
                bail!("FEN rank '{}' overflows a {}-wide board", rank_text, width);
            }
            placements.push((Position::new(file as u8, rank), color, piece));
            file += 1;
        }
        if !digits.is_empty() {
            file += digits.parse::<u16>().unwrap();
        }
        if file > width as u16 {
            bail!("FEN rank '{}' overflows a {}-wide board", rank_text, width);
        }
    }
    Ok(placements)
}

/// Placement-only FEN for the standard pieces on `board`. Custom-typed
/// pieces count as empty squares here; `position_key` appends them
/// separately.
pub fn placement_fen(board: &Board) -> String {
    let mut out = String::new();
    for rank in (0..board.height()).rev() {
        if rank != board.height() - 1 {
            out.push('/');
        }
        let mut empty: u16 = 0;
        for file in 0..board.width() {
            let pos = Position::new(file, rank);
            let code = board
                .at(pos)
                .and_then(|p| StandardPiece::from_name(&p.type_name).map(|s| s.fen_char(p.owner)));
            match code {
                Some(c) => {
                    if empty > 0 {
                        out.push_str(&empty.to_string());
                        empty = 0;
                    }
                    out.push(c);
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push_str(&empty.to_string());
        }
    }
    out
}

/// A stable key for repetition detection: the placement FEN plus one
/// `|{W|B}:<type>@<square>` segment per custom piece, ordered by
/// square. Equal positions always produce equal keys, and custom
/// placements never collapse into the standard-letter encoding.
pub fn position_key(board: &Board) -> String {
    let mut key = placement_fen(board);
    let mut customs: Vec<&super::piece::Piece> = board
        .pieces()
        .filter(|p| StandardPiece::from_name(&p.type_name).is_none())
        .collect();
    customs.sort_by_key(|p| (p.pos.rank, p.pos.file));
    for piece in customs {
        let side = match piece.owner {
            Color::White => 'W',
            Color::Black => 'B',
        };
        key.push_str(&format!("|{}:{}@{}", side, piece.type_name, piece.pos));
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn test_parse_standard_position() {
        let placements = parse_placements(STANDARD_FEN, 8, 8).unwrap();
        assert_eq!(placements.len(), 32);
        let (pos, color, piece) = placements
            .iter()
            .find(|(p, _, _)| *p == Position::parse("e1").unwrap())
            .copied()
            .unwrap();
        assert_eq!(pos.rank, 0);
        assert_eq!(color, Color::White);
        assert_eq!(piece, StandardPiece::King);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_placements("rnbqkbnr/ppppppppp", 8, 8).is_err());
        assert!(parse_placements("xyz", 8, 8).is_err());
        assert!(parse_placements("8/8/8/8/8/8/8/8/8", 8, 8).is_err());
    }

    #[test]
    fn test_placement_round_trip() {
        let mut board = Board::new(8, 8);
        for (pos, color, piece) in parse_placements(STANDARD_FEN, 8, 8).unwrap() {
            board.spawn(piece.name(), color, pos, BTreeSet::new(), BTreeMap::new());
        }
        assert_eq!(placement_fen(&board), STANDARD_FEN);
    }

    #[test]
    fn test_position_key_includes_custom_pieces() {
        let mut board = Board::new(8, 8);
        board.spawn(
            "Amazon",
            Color::White,
            Position::parse("d4").unwrap(),
            BTreeSet::new(),
            BTreeMap::new(),
        );
        let key = position_key(&board);
        assert!(key.ends_with("|W:Amazon@d4"));

        let mut other = Board::new(8, 8);
        other.spawn(
            "Amazon",
            Color::White,
            Position::parse("d5").unwrap(),
            BTreeSet::new(),
            BTreeMap::new(),
        );
        assert_ne!(key, position_key(&other));
    }
}
