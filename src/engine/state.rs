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
use std::collections::BTreeMap;

use crate::board::{Board, Color, Pair, Piece, PieceId, Position};
use crate::game::GameResult;
use crate::rules::{EventType, Value};

/// A move as validated and executed by the engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Move {
    pub piece: PieceId,
    pub from: Position,
    pub to: Position,
    pub kind: MoveKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum MoveKind {
    Standard,
    DoubleAdvance,
    EnPassant,
    CastleKingside,
    CastleQueenside,
    /// Carries the promotion target type, `Queen` by default.
    Promotion(String),
}

impl Move {
    pub fn standard(piece: PieceId, from: Position, to: Position) -> Self {
        Self {
            piece,
            from,
            to,
            kind: MoveKind::Standard,
        }
    }

    pub fn is_castle(&self) -> bool {
        matches!(
            self.kind,
            MoveKind::CastleKingside | MoveKind::CastleQueenside
        )
    }
}

/// What `make_move` reports. Failures leave the engine untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MoveOutcome {
    pub success: bool,
    pub error: Option<String>,
    /// Type name of the captured piece, when the move captured.
    pub captured: Option<String>,
    pub events: Vec<EventType>,
}

impl MoveOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            captured: None,
            events: Vec::new(),
        }
    }
}

/// Where a trigger definition lives, for re-resolution when a pending
/// optional trigger is executed later.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum TriggerSource {
    /// Index into the game-level trigger list.
    Game(usize),
    /// Index into a piece definition's trigger list.
    Piece { piece_type: String, index: usize },
}

/// An optional trigger waiting for the host to execute or skip it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PendingOptionalTrigger {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    /// The move that raised the trigger; its context is rebuilt when
    /// the trigger is executed.
    pub mv: Move,
    /// The side the move belonged to.
    pub player: Color,
    pub source: TriggerSource,
}

/// The complete mutable game state. [`crate::engine::Engine::state`]
/// returns a deep copy; the engine owns the live one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameState {
    pub board: Board,
    pub current_player: Color,
    pub move_history: Vec<Move>,
    pub half_move_clock: u32,
    pub full_move_number: u32,
    /// Repetition keys: the startup snapshot followed by one entry
    /// per executed move.
    pub position_history: Vec<String>,
    pub custom_state: BTreeMap<String, Value>,
    pub result: Option<GameResult>,
    /// Times each side has been put in check.
    pub check_count: Pair<u32>,
    pub pending_optional_triggers: Vec<PendingOptionalTrigger>,
}

impl GameState {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            current_player: Color::White,
            move_history: Vec::new(),
            half_move_clock: 0,
            full_move_number: 1,
            position_history: Vec::new(),
            custom_state: BTreeMap::new(),
            result: None,
            check_count: Pair::new(0, 0),
            pending_optional_triggers: Vec::new(),
        }
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.move_history.last()
    }
}

/// Everything needed to surgically revert one executed move. Trigger
/// side effects on third pieces are not recorded; undo after triggers
/// is best-effort, exact for trigger-free games.
#[derive(Debug, Clone)]
pub(crate) struct MoveRecord {
    pub mv: Move,
    /// The moving piece as it was before the move (covers state flags
    /// and promotion).
    pub mover_before: Piece,
    pub captured: Option<Piece>,
    /// The castling rook before it moved.
    pub rook_before: Option<Piece>,
    /// Pieces removed by an explosive capture.
    pub exploded: Vec<Piece>,
    /// Pawns whose double-push flag this move cleared.
    pub cleared_double_push: Vec<PieceId>,
    pub prev_half_move_clock: u32,
    pub prev_full_move_number: u32,
    pub prev_check_count: Pair<u32>,
    pub prev_result: Option<GameResult>,
}
