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

//! Move generation.
//!
//! Pieces generate moves from their compiled [`Pattern`]s; the six
//! standard piece types fall back to their classic shapes when a game
//! leaves them undefined, with the pawn using a dedicated generator
//! (push, double push, diagonal capture, promotion). Castling and en
//! passant are appended at the side level, and when check detection is
//! on every candidate is simulated and rejected if it leaves the
//! mover's royal piece attacked.
//!
//! Attack detection (check, castling-through-check, square-attacked
//! queries) uses the classic attack shapes of the six standard piece
//! names only. Custom piece types do not contribute to attack sets.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::eval::{eval_condition, EvalContext};
use super::state::{GameState, Move, MoveKind};
use crate::board::{
    between, forward, leap_offsets, Board, Color, Direction, Offset, Piece, PieceId, Position,
    StandardPiece,
};
use crate::rules::{CaptureRule, CompiledGame, Condition, Pattern, PatternOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenMode {
    Both,
    MovesOnly,
    CapturesOnly,
}

/// Classic shapes for standard pieces left undefined by a game. The
/// pawn is handled by its own generator.
static DEFAULT_PATTERNS: Lazy<HashMap<&'static str, Pattern>> = Lazy::new(|| {
    HashMap::from([
        (
            "King",
            Pattern::Step {
                dir: Direction::Any,
                dist: 1,
            },
        ),
        (
            "Queen",
            Pattern::Slide {
                dir: Direction::Any,
            },
        ),
        (
            "Rook",
            Pattern::Slide {
                dir: Direction::Orthogonal,
            },
        ),
        (
            "Bishop",
            Pattern::Slide {
                dir: Direction::Diagonal,
            },
        ),
        ("Knight", Pattern::Leap { dx: 1, dy: 2 }),
    ])
});

/// All legal moves for `color`.
pub fn legal_moves(game: &CompiledGame, state: &GameState, color: Color) -> Vec<Move> {
    let mut moves = Vec::new();
    let ids: Vec<PieceId> = state.board.pieces_of(color).map(|p| p.id).collect();
    for id in ids {
        piece_moves(game, state, id, &mut moves);
    }
    castling_moves(game, state, color, &mut moves);
    en_passant_moves(game, state, color, &mut moves);
    filter_legal(game, state, moves)
}

/// Legal moves for one piece.
pub fn legal_moves_for_piece(game: &CompiledGame, state: &GameState, id: PieceId) -> Vec<Move> {
    let color = match state.board.piece(id) {
        Some(piece) => piece.owner,
        None => return Vec::new(),
    };
    legal_moves(game, state, color)
        .into_iter()
        .filter(|mv| mv.piece == id)
        .collect()
}

fn filter_legal(game: &CompiledGame, state: &GameState, moves: Vec<Move>) -> Vec<Move> {
    let mut unique: Vec<Move> = Vec::with_capacity(moves.len());
    for mv in moves {
        if !unique.iter().any(|m| m == &mv) {
            unique.push(mv);
        }
    }
    if !game.rules.check_detection {
        return unique;
    }
    unique
        .into_iter()
        .filter(|mv| !leaves_in_check(state, mv))
        .collect()
}

fn piece_moves(game: &CompiledGame, state: &GameState, id: PieceId, out: &mut Vec<Move>) {
    let piece = match state.board.piece(id) {
        Some(piece) => piece,
        None => return,
    };
    // A positive cooldown counter silences the piece entirely.
    if piece.on_cooldown() {
        return;
    }
    let def = game.piece_def(&piece.type_name);
    let moves_pattern = def.and_then(|d| d.moves.clone());
    let capture_rule = def.map(|d| d.capture.clone()).unwrap_or_default();

    let mut generated = Vec::new();
    match moves_pattern {
        Some(pattern) => {
            let mode = match capture_rule {
                CaptureRule::Same => GenMode::Both,
                _ => GenMode::MovesOnly,
            };
            pattern_moves(game, state, piece, &pattern, mode, &mut generated);
            if let CaptureRule::Pattern(capture_pattern) = &capture_rule {
                pattern_moves(
                    game,
                    state,
                    piece,
                    capture_pattern,
                    GenMode::CapturesOnly,
                    &mut generated,
                );
            }
        }
        None => {
            if piece.type_name == "Pawn" {
                pawn_moves(state, piece, &mut generated);
            } else if let Some(pattern) = DEFAULT_PATTERNS.get(piece.type_name.as_str()) {
                pattern_moves(game, state, piece, pattern, GenMode::Both, &mut generated);
            }
            // A custom type without a pattern generates nothing.
        }
    }
    promote_on_last_rank(game, piece, &mut generated);
    out.append(&mut generated);
}

fn pattern_moves(
    game: &CompiledGame,
    state: &GameState,
    piece: &Piece,
    pattern: &Pattern,
    mode: GenMode,
    out: &mut Vec<Move>,
) {
    let board = &state.board;
    match pattern {
        Pattern::Step { dir, dist } => {
            for v in dir.vectors(piece.owner) {
                let offset = Offset::new(v.dx * *dist as i16, v.dy * *dist as i16);
                if let Some(to) = piece.pos.step(offset) {
                    push_destination(board, piece, to, mode, out);
                }
            }
        }
        Pattern::Slide { dir } => {
            for v in dir.vectors(piece.owner) {
                slide_along(board, piece, v, mode, out);
            }
        }
        Pattern::Leap { dx, dy } => {
            for offset in leap_offsets(*dx, *dy) {
                if let Some(to) = piece.pos.step(offset) {
                    push_destination(board, piece, to, mode, out);
                }
            }
        }
        Pattern::Hop { dir } => {
            for v in dir.vectors(piece.owner) {
                hop_along(board, piece, v, mode, out);
            }
        }
        Pattern::Composite { op, parts } => match op {
            PatternOp::Or => {
                for part in parts {
                    pattern_moves(game, state, piece, part, mode, out);
                }
            }
            // Sequential composition is not expanded beyond its first
            // leg; later legs are parsed and carried but contribute no
            // destinations.
            PatternOp::Then => {
                if let Some(first) = parts.first() {
                    pattern_moves(game, state, piece, first, mode, out);
                }
            }
        },
        Pattern::Conditional { pattern, condition } => {
            let mut candidates = Vec::new();
            pattern_moves(game, state, piece, pattern, mode, &mut candidates);
            for mv in candidates {
                if move_condition_holds(game, state, piece, &mv, condition) {
                    out.push(mv);
                }
            }
        }
        Pattern::Reference(name) => {
            // Late binding; an unresolvable name contributes nothing.
            if let Some(resolved) = game.pattern(name) {
                pattern_moves(game, state, piece, resolved, mode, out);
            }
        }
    }
}

fn move_condition_holds(
    game: &CompiledGame,
    state: &GameState,
    piece: &Piece,
    mv: &Move,
    condition: &Condition,
) -> bool {
    let mut ctx = EvalContext::new(game, &state.board, piece.owner);
    ctx.piece = Some(piece.id);
    ctx.from = Some(mv.from);
    ctx.to = Some(mv.to);
    ctx.check_count = state.check_count;
    ctx.custom_state = &state.custom_state;
    eval_condition(&ctx, condition)
}

fn push_destination(board: &Board, piece: &Piece, to: Position, mode: GenMode, out: &mut Vec<Move>) {
    if !board.in_bounds(to) || board.blocks_entry(to, piece.owner) {
        return;
    }
    match board.at(to) {
        None => {
            if mode != GenMode::CapturesOnly {
                out.push(Move::standard(piece.id, piece.pos, to));
            }
        }
        Some(occupant) => {
            if occupant.owner == piece.owner {
                return;
            }
            if piece.has_trait("phase") {
                // Phase steps and leaps land on enemy squares as
                // plain moves, never as captures.
                if mode != GenMode::CapturesOnly {
                    out.push(Move::standard(piece.id, piece.pos, to));
                }
            } else if mode != GenMode::MovesOnly && !occupant.has_trait("immune") {
                out.push(Move::standard(piece.id, piece.pos, to));
            }
        }
    }
}

fn slide_along(board: &Board, piece: &Piece, step: Offset, mode: GenMode, out: &mut Vec<Move>) {
    let phase = piece.has_trait("phase");
    let mut current = piece.pos.step(step);
    while let Some(pos) = current {
        if !board.in_bounds(pos) || board.blocks_entry(pos, piece.owner) {
            break;
        }
        match board.at(pos) {
            None => {
                if mode != GenMode::CapturesOnly {
                    out.push(Move::standard(piece.id, piece.pos, pos));
                }
            }
            Some(occupant) => {
                if phase {
                    // Phase traversal: keep sliding, never capture.
                    current = pos.step(step);
                    continue;
                }
                if occupant.owner != piece.owner
                    && mode != GenMode::MovesOnly
                    && !occupant.has_trait("immune")
                {
                    out.push(Move::standard(piece.id, piece.pos, pos));
                }
                break;
            }
        }
        current = pos.step(step);
    }
}

fn hop_along(board: &Board, piece: &Piece, step: Offset, mode: GenMode, out: &mut Vec<Move>) {
    let mut current = piece.pos.step(step);
    // Find the hurdle.
    while let Some(pos) = current {
        if !board.in_bounds(pos) {
            return;
        }
        if board.at(pos).is_some() {
            break;
        }
        current = pos.step(step);
    }
    let hurdle = match current {
        Some(pos) => pos,
        None => return,
    };
    // Land exactly one square beyond it.
    if let Some(landing) = hurdle.step(step) {
        push_destination(board, piece, landing, mode, out);
    }
}

/// Push, double push from the starting rank, diagonal captures, and
/// promotion typing on the far rank.
fn pawn_moves(state: &GameState, piece: &Piece, out: &mut Vec<Move>) {
    let board = &state.board;
    let fwd = forward(piece.owner);
    let start_rank = match piece.owner {
        Color::White => 1,
        Color::Black => board.height().saturating_sub(2),
    };

    if let Some(push) = piece.pos.step(fwd) {
        if board.in_bounds(push) && board.is_empty(push) && !board.blocks_entry(push, piece.owner) {
            out.push(Move::standard(piece.id, piece.pos, push));
            if piece.pos.rank == start_rank {
                if let Some(double) = push.step(fwd) {
                    if board.in_bounds(double)
                        && board.is_empty(double)
                        && !board.blocks_entry(double, piece.owner)
                    {
                        out.push(Move {
                            piece: piece.id,
                            from: piece.pos,
                            to: double,
                            kind: MoveKind::DoubleAdvance,
                        });
                    }
                }
            }
        }
    }

    for dx in [-1i16, 1] {
        if let Some(target) = piece.pos.step(Offset::new(dx, fwd.dy)) {
            if board.in_bounds(target)
                && board.has_enemy(target, piece.owner)
                && !board.blocks_entry(target, piece.owner)
                && !board.at(target).map(|p| p.has_trait("immune")).unwrap_or(false)
            {
                out.push(Move::standard(piece.id, piece.pos, target));
            }
        }
    }
}

/// Retype far-rank arrivals of promotion-eligible pieces. Pawns carry
/// the `promote` trait in their standard definition.
fn promote_on_last_rank(game: &CompiledGame, piece: &Piece, moves: &mut Vec<Move>) {
    if !game.rules.promotion {
        return;
    }
    let eligible = piece.has_trait("promote") || piece.type_name == "Pawn";
    if !eligible {
        return;
    }
    let last_rank = match piece.owner {
        Color::White => game.board.height - 1,
        Color::Black => 0,
    };
    for mv in moves.iter_mut() {
        if mv.to.rank == last_rank && !matches!(mv.kind, MoveKind::Promotion(_)) {
            mv.kind = MoveKind::Promotion("Queen".to_string());
        }
    }
}

/// Classic castling, generalized to the piece layout: an unmoved King
/// and an unmoved Rook on the same rank with nothing between them, the
/// king travelling two files, no square on its path attacked.
fn castling_moves(game: &CompiledGame, state: &GameState, color: Color, out: &mut Vec<Move>) {
    if !game.rules.castling {
        return;
    }
    let board = &state.board;
    let king = match board
        .pieces_of(color)
        .find(|p| p.type_name == "King" && !p.has_moved())
    {
        Some(king) => king,
        None => return,
    };
    if is_square_attacked(board, king.pos, !color) {
        return;
    }
    let rooks: Vec<&Piece> = board
        .pieces_of(color)
        .filter(|p| p.type_name == "Rook" && !p.has_moved() && p.pos.rank == king.pos.rank)
        .collect();
    for rook in rooks {
        let kingside = rook.pos.file > king.pos.file;
        let dx: i16 = if kingside { 1 } else { -1 };
        let king_to = match king.pos.step(Offset::new(2 * dx, 0)) {
            Some(pos) if board.in_bounds(pos) => pos,
            _ => continue,
        };
        let clear = between(king.pos, rook.pos)
            .into_iter()
            .all(|pos| board.is_empty(pos));
        if !clear {
            continue;
        }
        let transit = king.pos.step(Offset::new(dx, 0)).unwrap();
        if is_square_attacked(board, transit, !color) || is_square_attacked(board, king_to, !color)
        {
            continue;
        }
        out.push(Move {
            piece: king.id,
            from: king.pos,
            to: king_to,
            kind: if kingside {
                MoveKind::CastleKingside
            } else {
                MoveKind::CastleQueenside
            },
        });
    }
}

fn en_passant_moves(game: &CompiledGame, state: &GameState, color: Color, out: &mut Vec<Move>) {
    if !game.rules.en_passant {
        return;
    }
    let board = &state.board;
    let last = match state.last_move() {
        Some(mv) if mv.kind == MoveKind::DoubleAdvance => mv,
        _ => return,
    };
    match board.at(last.to) {
        Some(piece) if piece.type_name == "Pawn" && piece.owner != color => {}
        _ => return,
    }
    let passed = Position::new(last.to.file, (last.from.rank + last.to.rank) / 2);
    for dx in [-1i16, 1] {
        let origin = match last.to.step(Offset::new(dx, 0)) {
            Some(pos) => pos,
            None => continue,
        };
        if let Some(pawn) = board.at(origin) {
            if pawn.owner == color && pawn.type_name == "Pawn" && !pawn.on_cooldown() {
                out.push(Move {
                    piece: pawn.id,
                    from: origin,
                    to: passed,
                    kind: MoveKind::EnPassant,
                });
            }
        }
    }
}

/// Simulate `mv` on a cloned board and test the mover's royal piece.
fn leaves_in_check(state: &GameState, mv: &Move) -> bool {
    let color = match state.board.piece(mv.piece) {
        Some(piece) => piece.owner,
        None => return true,
    };
    let mut board = state.board.clone();
    apply_raw(&mut board, mv);
    is_in_check(&board, color)
}

/// The minimal board mutation for a move, used for legality
/// simulation. No triggers, no state flags, no promotion retyping.
pub(crate) fn apply_raw(board: &mut Board, mv: &Move) {
    match &mv.kind {
        MoveKind::EnPassant => {
            board.remove_at(Position::new(mv.to.file, mv.from.rank));
            board.move_piece(mv.piece, mv.to);
        }
        MoveKind::CastleKingside | MoveKind::CastleQueenside => {
            let rook = castle_rook(board, mv);
            board.move_piece(mv.piece, mv.to);
            if let Some((rook_id, rook_to)) = rook {
                board.move_piece(rook_id, rook_to);
            }
        }
        _ => {
            board.move_piece(mv.piece, mv.to);
        }
    }
}

/// The rook taking part in a castling move and its destination.
pub(crate) fn castle_rook(board: &Board, mv: &Move) -> Option<(PieceId, Position)> {
    let color = board.piece(mv.piece)?.owner;
    let kingside = mv.kind == MoveKind::CastleKingside;
    let rook = board
        .pieces_of(color)
        .filter(|p| p.type_name == "Rook" && p.pos.rank == mv.from.rank && !p.has_moved())
        .find(|p| {
            if kingside {
                p.pos.file > mv.from.file
            } else {
                p.pos.file < mv.from.file
            }
        })?;
    let dx: i16 = if kingside { 1 } else { -1 };
    let rook_to = mv.from.step(Offset::new(dx, 0))?;
    Some((rook.id, rook_to))
}

/// Whether `by` attacks `target`, using the classic shapes of the six
/// standard piece names. Custom types never attack.
pub fn is_square_attacked(board: &Board, target: Position, by: Color) -> bool {
    for piece in board.pieces_of(by) {
        let standard = match StandardPiece::from_name(&piece.type_name) {
            Some(standard) => standard,
            None => continue,
        };
        let delta = target - piece.pos;
        let attacks = match standard {
            StandardPiece::Pawn => {
                let fwd = forward(by);
                delta.dy == fwd.dy && delta.dx.abs() == 1
            }
            StandardPiece::Knight => {
                (delta.dx.abs() == 1 && delta.dy.abs() == 2)
                    || (delta.dx.abs() == 2 && delta.dy.abs() == 1)
            }
            StandardPiece::King => delta.dx.abs().max(delta.dy.abs()) == 1,
            StandardPiece::Rook => {
                (delta.dx == 0 || delta.dy == 0)
                    && delta != Offset::new(0, 0)
                    && board.is_path_clear(piece.pos, target)
            }
            StandardPiece::Bishop => {
                delta.dx.abs() == delta.dy.abs()
                    && delta.dx != 0
                    && board.is_path_clear(piece.pos, target)
            }
            StandardPiece::Queen => {
                let linear =
                    delta.dx == 0 || delta.dy == 0 || delta.dx.abs() == delta.dy.abs();
                linear && delta != Offset::new(0, 0) && board.is_path_clear(piece.pos, target)
            }
        };
        if attacks {
            return true;
        }
    }
    false
}

/// Whether `color`'s royal piece is attacked. A side with no royal
/// piece is never in check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    match board.find_royal(color) {
        Some(royal) => is_square_attacked(board, royal.pos, !color),
        None => false,
    }
}

pub fn is_checkmate(game: &CompiledGame, state: &GameState, color: Color) -> bool {
    if !game.rules.check_detection {
        return false;
    }
    is_in_check(&state.board, color) && legal_moves(game, state, color).is_empty()
}

pub fn is_stalemate(game: &CompiledGame, state: &GameState, color: Color) -> bool {
    !is_in_check(&state.board, color) && legal_moves(game, state, color).is_empty()
}
