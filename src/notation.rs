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

//! Coordinate move notation.
//!
//! Moves print as origin and destination squares (`e2e4`), castling
//! as `O-O`/`O-O-O`, promotions with an `=` suffix (`e7e8=Q`, or the
//! full type name for custom pieces). Parsing goes the other way:
//! match the text against the current legal move set.

use anyhow::{anyhow, Result};

use crate::board::{Position, StandardPiece};
use crate::engine::{Engine, Move, MoveKind, MoveOutcome};

pub fn format_move(mv: &Move) -> String {
    match &mv.kind {
        MoveKind::CastleKingside => "O-O".to_string(),
        MoveKind::CastleQueenside => "O-O-O".to_string(),
        MoveKind::Promotion(target) => {
            let suffix = StandardPiece::from_name(target)
                .map(|p| p.code().to_string())
                .unwrap_or_else(|| target.clone());
            format!("{}{}={}", mv.from, mv.to, suffix)
        }
        _ => format!("{}{}", mv.from, mv.to),
    }
}

/// Parse coordinate notation against a legal move list. Accepts an
/// optional `-`/`x` separator and both `O` and `0` castling forms.
pub fn parse_move(legal: &[Move], text: &str) -> Result<Move> {
    let text = text.trim().trim_end_matches(['+', '#']);
    if text.eq_ignore_ascii_case("O-O") || text == "0-0" {
        return legal
            .iter()
            .find(|m| m.kind == MoveKind::CastleKingside)
            .cloned()
            .ok_or_else(|| anyhow!("castling kingside is not legal here"));
    }
    if text.eq_ignore_ascii_case("O-O-O") || text == "0-0-0" {
        return legal
            .iter()
            .find(|m| m.kind == MoveKind::CastleQueenside)
            .cloned()
            .ok_or_else(|| anyhow!("castling queenside is not legal here"));
    }

    let (from, to, promotion) = split_coords(text)
        .ok_or_else(|| anyhow!("malformed move '{}'", text))?;
    let found = legal
        .iter()
        .find(|m| m.from == from && m.to == to)
        .cloned()
        .ok_or_else(|| anyhow!("'{}' is not a legal move", text))?;
    match promotion {
        Some(target) => {
            if !matches!(found.kind, MoveKind::Promotion(_)) {
                return Err(anyhow!("'{}' is not a promotion", text));
            }
            Ok(Move {
                kind: MoveKind::Promotion(target),
                ..found
            })
        }
        None => Ok(found),
    }
}

fn split_coords(text: &str) -> Option<(Position, Position, Option<String>)> {
    let (body, promotion) = match text.split_once('=') {
        Some((body, suffix)) => {
            let target = match suffix.len() {
                1 => expand_code(suffix.chars().next().unwrap())?,
                _ => suffix.to_string(),
            };
            (body, Some(target))
        }
        None => (text, None),
    };
    let chars: Vec<char> = body.chars().collect();
    let (from, used) = take_square(&chars, 0)?;
    let rest = if matches!(chars.get(used), Some('-') | Some('x')) {
        used + 1
    } else {
        used
    };
    let (to, end) = take_square(&chars, rest)?;
    if end != chars.len() {
        return None;
    }
    Some((from, to, promotion))
}

/// Scan one square name starting at `start`: a file letter then one
/// or two digits. Squares never start with a digit, so the greedy
/// digit read cannot eat into the following square.
fn take_square(chars: &[char], start: usize) -> Option<(Position, usize)> {
    let letter = *chars.get(start)?;
    if !letter.is_ascii_lowercase() {
        return None;
    }
    let mut digits = String::new();
    let mut end = start + 1;
    while end < chars.len() && chars[end].is_ascii_digit() && digits.len() < 2 {
        digits.push(chars[end]);
        end += 1;
    }
    let name = format!("{}{}", letter, digits);
    Position::parse(&name).map(|pos| (pos, end))
}

fn expand_code(code: char) -> Option<String> {
    StandardPiece::from_fen_char(code.to_ascii_uppercase())
        .map(|(_, piece)| piece.name().to_string())
}

impl Engine {
    /// Convenience wrapper: parse coordinate notation and execute it.
    pub fn make_move_coords(&mut self, text: &str) -> MoveOutcome {
        let legal = self.legal_moves();
        match parse_move(&legal, text) {
            Ok(mv) => self.make_move(&mv),
            Err(err) => MoveOutcome::failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang;

    fn standard_engine() -> Engine {
        Engine::new(lang::compile("game: \"Standard\"\n").unwrap())
    }

    #[test]
    fn test_format_simple() {
        let engine = standard_engine();
        let legal = engine.legal_moves();
        let e2e4 = legal
            .iter()
            .find(|m| m.from == Position::parse("e2").unwrap() && m.to == Position::parse("e4").unwrap())
            .unwrap();
        assert_eq!(format_move(e2e4), "e2e4");
    }

    #[test]
    fn test_parse_simple_and_separators() {
        let engine = standard_engine();
        let legal = engine.legal_moves();
        let plain = parse_move(&legal, "e2e4").unwrap();
        assert_eq!(plain.to, Position::parse("e4").unwrap());
        assert_eq!(parse_move(&legal, "e2-e4").unwrap(), plain);
        assert_eq!(parse_move(&legal, "g1f3").unwrap().to, Position::parse("f3").unwrap());
    }

    #[test]
    fn test_parse_rejects_illegal() {
        let engine = standard_engine();
        let legal = engine.legal_moves();
        assert!(parse_move(&legal, "e2e5").is_err());
        assert!(parse_move(&legal, "zz9").is_err());
        assert!(parse_move(&legal, "O-O").is_err());
    }

    #[test]
    fn test_round_trip_legal_moves() {
        let engine = standard_engine();
        let legal = engine.legal_moves();
        for mv in &legal {
            let text = format_move(mv);
            let parsed = parse_move(&legal, &text).unwrap();
            assert_eq!(&parsed, mv, "round-trip failed for {}", text);
        }
    }

    #[test]
    fn test_make_move_coords() {
        let mut engine = standard_engine();
        assert!(engine.make_move_coords("e2e4").success);
        assert!(!engine.make_move_coords("e2e4").success);
        assert!(engine.make_move_coords("e7e5").success);
    }
}
