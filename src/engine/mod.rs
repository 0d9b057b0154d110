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

//! The rule engine.
//!
//! An [`Engine`] owns one game: it is constructed from a
//! [`CompiledGame`], runs setup (standard seeding, placements, the
//! `replace` map), and then executes moves through a fixed procedure:
//!
//! 1. `move` triggers fire (a `cancel` here rejects the move);
//! 2. the board mutates: capture, castling rook, en passant pawn,
//!    promotion, explosive blasts;
//! 3. piece state flags update (`moved`, `justDoublePushed`);
//! 4. history and clocks advance and the position key is recorded;
//! 5. `capture`/`captured` triggers fire (a `cancel` rolls the board
//!    back and fails the move);
//! 6. the script runtime hears about it and may declare a winner;
//! 7. the turn switches (unless the scripts control turn flow);
//! 8. `turn_end` triggers, custom victory/draw conditions, checkmate,
//!    stalemate, the fifty-move rule and threefold repetition;
//! 9. `check` triggers when the new side to move stands in check,
//!    then the new side's turn begins (cooldowns tick down).
//!
//! All operations are synchronous and total: failures come back as
//! structured results, never panics. One engine is one game; there is
//! no shared state between instances.

mod actions;
mod eval;
pub mod movegen;
mod script;
mod state;
mod triggers;

pub use eval::{eval_condition, eval_expr, EvalContext};
pub use script::{HostCallbacks, NoopScriptRuntime, ScriptEvent, ScriptRuntime};
pub use state::{GameState, Move, MoveKind, MoveOutcome, PendingOptionalTrigger, TriggerSource};

use thiserror::Error;

use crate::board::{chebyshev, fen, Board, Color, PieceId, Position};
use crate::game::{DrawReason, GameResult, WinReason};
use crate::rules::{CompiledGame, EventType, Value};
use actions::piece_blueprint;
use state::MoveRecord;

/// Engine-level failures, reported as `MoveOutcome.error` strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Game is over")]
    GameOver,
    #[error("Move cancelled")]
    MoveCancelled,
    #[error("Capture cancelled")]
    CaptureCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEventKind {
    GameStart,
    Move,
    Capture,
    Check,
    TurnStart,
    TurnEnd,
    OptionalTrigger,
    GameEnd,
}

/// Payload delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub kind: EngineEventKind,
    pub mv: Option<Move>,
    pub color: Option<Color>,
    pub captured: Option<String>,
    pub trigger: Option<PendingOptionalTrigger>,
    pub result: Option<GameResult>,
}

impl EngineEvent {
    fn simple(kind: EngineEventKind, mv: Option<Move>, color: Option<Color>) -> Self {
        Self {
            kind,
            mv,
            color,
            captured: None,
            trigger: None,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observer {
    id: ObserverId,
    kind: EngineEventKind,
    handler: Box<dyn FnMut(&EngineEvent)>,
}

pub struct Engine {
    game: CompiledGame,
    state: GameState,
    records: Vec<MoveRecord>,
    script: Box<dyn ScriptRuntime>,
    observers: Vec<Observer>,
    next_trigger_id: u64,
    next_observer_id: u64,
}

impl Engine {
    pub fn new(game: CompiledGame) -> Self {
        Self::with_script(game, Box::new(NoopScriptRuntime))
    }

    pub fn with_script(game: CompiledGame, script: Box<dyn ScriptRuntime>) -> Self {
        let mut engine = Self {
            state: GameState::new(Board::new(game.board.width, game.board.height)),
            game,
            records: Vec::new(),
            script,
            observers: Vec::new(),
            next_trigger_id: 1,
            next_observer_id: 1,
        };
        engine.setup();
        engine
    }

    /// Rebuild the initial position: standard seeding when placements
    /// are empty or additive, then declared placements, then the
    /// global `replace` substitution.
    fn setup(&mut self) {
        let mut board = Board::new(self.game.board.width, self.game.board.height);
        for (name, squares) in &self.game.board.zones {
            board.set_zone(name, squares.clone());
        }
        if self.game.setup.placements.is_empty() || self.game.setup.additive {
            let placements = fen::parse_placements(
                fen::STANDARD_FEN,
                board.width(),
                board.height(),
            )
            .unwrap_or_default();
            for (pos, color, piece) in placements {
                let (traits, state) = piece_blueprint(&self.game, piece.name());
                board.spawn(piece.name(), color, pos, traits, state);
            }
        }
        for placement in self.game.setup.placements.clone() {
            let (traits, state) = piece_blueprint(&self.game, &placement.piece);
            // In additive mode this replaces whatever the standard
            // seeding put there.
            board.spawn(&placement.piece, placement.owner, placement.pos, traits, state);
        }
        if !self.game.setup.replace.is_empty() {
            let targets: Vec<(PieceId, String)> = board
                .pieces()
                .filter_map(|p| {
                    self.game
                        .setup
                        .replace
                        .get(&p.type_name)
                        .map(|new_type| (p.id, new_type.clone()))
                })
                .collect();
            for (id, new_type) in targets {
                let (traits, state) = piece_blueprint(&self.game, &new_type);
                if let Some(piece) = board.piece_mut(id) {
                    piece.type_name = new_type;
                    piece.traits = traits;
                    piece.state = state;
                }
            }
        }
        self.state = GameState::new(board);
        // Startup snapshot: the initial position counts toward
        // repetition detection.
        self.state
            .position_history
            .push(fen::position_key(&self.state.board));
        self.records.clear();
        self.next_trigger_id = 1;
        self.script.reset();
        self.script.register_callbacks(HostCallbacks {
            is_in_check: movegen::is_in_check,
            is_checkmate: movegen::is_checkmate,
        });
        let scripts = self.game.scripts.clone();
        self.script.execute_scripts(&scripts);
        self.fire_event(EventType::GameStart, None, None, None);
        self.emit(EngineEvent::simple(EngineEventKind::GameStart, None, None));
    }

    /// Tear down and rebuild the initial state.
    pub fn reset(&mut self) {
        self.setup();
    }

    pub fn game(&self) -> &CompiledGame {
        &self.game
    }

    /// A deep-copy snapshot of the current state.
    pub fn state(&self) -> GameState {
        self.state.clone()
    }

    pub fn current_player(&self) -> Color {
        self.state.current_player
    }

    pub fn is_game_over(&self) -> bool {
        self.state.result.is_some()
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.state.result.as_ref()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        if self.state.result.is_some() {
            return Vec::new();
        }
        movegen::legal_moves(&self.game, &self.state, self.state.current_player)
    }

    pub fn legal_moves_for(&self, piece: PieceId) -> Vec<Move> {
        if self.state.result.is_some() {
            return Vec::new();
        }
        movegen::legal_moves_for_piece(&self.game, &self.state, piece)
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.game.rules.check_detection && movegen::is_in_check(&self.state.board, color)
    }

    pub fn is_checkmate(&self, color: Color) -> bool {
        movegen::is_checkmate(&self.game, &self.state, color)
    }

    pub fn is_stalemate(&self, color: Color) -> bool {
        movegen::is_stalemate(&self.game, &self.state, color)
    }

    pub fn make_move(&mut self, mv: &Move) -> MoveOutcome {
        if self.state.result.is_some() {
            return MoveOutcome::failure(RuntimeError::GameOver.to_string());
        }
        let color = self.state.current_player;
        match self.state.board.piece(mv.piece) {
            Some(piece) if piece.owner == color => {}
            _ => return MoveOutcome::failure(RuntimeError::IllegalMove.to_string()),
        }
        let legal = movegen::legal_moves(&self.game, &self.state, color);
        let mv = match find_matching(&legal, mv) {
            Some(mv) => mv,
            None => return MoveOutcome::failure(RuntimeError::IllegalMove.to_string()),
        };

        let mut events = vec![EventType::Move];

        // 1. Move triggers, before any mutation. A trigger may cancel
        // the move or even remove the mover outright.
        if self.fire_event(EventType::Move, Some(&mv), Some(mv.piece), None) {
            return MoveOutcome::failure(RuntimeError::MoveCancelled.to_string());
        }
        if self.state.board.piece(mv.piece).is_none() {
            return MoveOutcome::failure(RuntimeError::MoveCancelled.to_string());
        }

        // 2-3. Board mutation and state flags.
        let from = self
            .state
            .board
            .piece(mv.piece)
            .map(|p| p.pos)
            .unwrap_or(mv.from);
        let record = self.apply_move(&mv);
        let captured_type = record.captured.as_ref().map(|p| p.type_name.clone());

        // 4. History and clocks.
        self.state.move_history.push(mv.clone());
        let progress = captured_type.is_some() || record.mover_before.type_name == "Pawn";
        if progress {
            self.state.half_move_clock = 0;
        } else {
            self.state.half_move_clock += 1;
        }
        if color == Color::Black {
            self.state.full_move_number += 1;
        }
        self.state
            .position_history
            .push(fen::position_key(&self.state.board));

        // 5. Capture triggers; a cancel here rolls everything back.
        if let Some(captured) = record.captured.clone() {
            events.push(EventType::Capture);
            if self.fire_event(
                EventType::Capture,
                Some(&mv),
                Some(mv.piece),
                Some(captured.type_name.clone()),
            ) {
                self.rollback(record);
                return MoveOutcome::failure(RuntimeError::CaptureCancelled.to_string());
            }
            self.fire_event_for_type(
                &captured.type_name,
                EventType::Captured,
                Some(&mv),
                Some(captured.type_name.clone()),
            );
        }
        self.records.push(record);

        self.emit(EngineEvent {
            kind: EngineEventKind::Move,
            mv: Some(mv.clone()),
            color: Some(color),
            captured: captured_type.clone(),
            trigger: None,
            result: None,
        });
        if captured_type.is_some() {
            self.emit(EngineEvent {
                kind: EngineEventKind::Capture,
                mv: Some(mv.clone()),
                color: Some(color),
                captured: captured_type.clone(),
                trigger: None,
                result: None,
            });
        }

        self.fire_zone_events(&mv, from);

        // 6. Scripts hear the event and may end the game outright.
        let script_kind = if captured_type.is_some() {
            EventType::Capture
        } else {
            EventType::Move
        };
        self.script.emit_event(&ScriptEvent {
            kind: script_kind,
            mv: Some(mv.clone()),
            player: color,
        });
        if let Some(winner) = self.script.winner() {
            self.set_result(GameResult::Win(winner, WinReason::Script));
            return MoveOutcome {
                success: true,
                error: None,
                captured: captured_type,
                events,
            };
        }

        // 7. Turn switch, unless the scripts own turn flow.
        if self.script.controls_turn_flow() {
            if self.script.is_turn_ended() {
                self.script.reset_turn_ended();
                self.state.current_player = !color;
            }
        } else {
            self.state.current_player = !color;
        }

        // 8. Turn-end triggers, then every way the game can end.
        self.fire_event(EventType::TurnEnd, Some(&mv), Some(mv.piece), None);
        self.emit(EngineEvent::simple(
            EngineEventKind::TurnEnd,
            Some(mv.clone()),
            Some(color),
        ));
        if self.state.result.is_none() {
            self.evaluate_end_conditions(color, Some(&mv));
        }
        if self.state.result.is_none() {
            self.check_standard_endings(color);
        }

        // 9. Check triggers against the new side to move.
        let next = self.state.current_player;
        if self.state.result.is_none()
            && next != color
            && self.game.rules.check_detection
            && movegen::is_in_check(&self.state.board, next)
        {
            self.state.check_count[next] += 1;
            events.push(EventType::Check);
            self.fire_event(EventType::Check, Some(&mv), None, None);
            self.emit(EngineEvent::simple(EngineEventKind::Check, None, Some(next)));
        }

        if self.state.result.is_none() && next != color {
            self.begin_turn();
        }

        MoveOutcome {
            success: true,
            error: None,
            captured: captured_type,
            events,
        }
    }

    /// Revert the last move: piece back to its origin, captured piece
    /// restored, castling rook reversed, histories popped, side and
    /// clocks switched back, result cleared. Trigger side effects on
    /// third pieces are not tracked and stay applied.
    pub fn undo_move(&mut self) -> bool {
        let record = match self.records.pop() {
            Some(record) => record,
            None => return false,
        };
        let undone = record.mv.clone();
        let mover = record.mover_before.owner;
        let check_count = record.prev_check_count;
        let prev_result = record.prev_result.clone();
        self.rollback(record);
        self.state.current_player = mover;
        self.state.check_count = check_count;
        self.state.result = prev_result;
        self.state
            .pending_optional_triggers
            .retain(|p| p.mv != undone);
        true
    }

    /// Inverse of steps 2-4: board, flags, histories, clocks.
    fn rollback(&mut self, record: MoveRecord) {
        let board = &mut self.state.board;
        board.remove_piece(record.mv.piece);
        for piece in record.exploded {
            if piece.id != record.mv.piece {
                board.restore(piece);
            }
        }
        if let Some(captured) = record.captured {
            board.restore(captured);
        }
        if let Some(rook) = record.rook_before {
            board.remove_piece(rook.id);
            board.restore(rook);
        }
        board.restore(record.mover_before);
        for id in record.cleared_double_push {
            if let Some(piece) = board.piece_mut(id) {
                piece
                    .state
                    .insert("justDoublePushed".to_string(), Value::Bool(true));
            }
        }
        self.state.move_history.pop();
        self.state.position_history.pop();
        self.state.half_move_clock = record.prev_half_move_clock;
        self.state.full_move_number = record.prev_full_move_number;
    }

    /// Steps 2-3 of the procedure, captured in a reversible record.
    fn apply_move(&mut self, mv: &Move) -> MoveRecord {
        let mover_before = self
            .state
            .board
            .piece(mv.piece)
            .cloned()
            .expect("apply_move: validated piece exists");
        let mut record = MoveRecord {
            mv: mv.clone(),
            mover_before: mover_before.clone(),
            captured: None,
            rook_before: None,
            exploded: Vec::new(),
            cleared_double_push: Vec::new(),
            prev_half_move_clock: self.state.half_move_clock,
            prev_full_move_number: self.state.full_move_number,
            prev_check_count: self.state.check_count,
            prev_result: self.state.result.clone(),
        };
        let board = &mut self.state.board;
        match &mv.kind {
            MoveKind::EnPassant => {
                record.captured = board.remove_at(Position::new(mv.to.file, mv.from.rank));
                board.move_piece(mv.piece, mv.to);
            }
            MoveKind::CastleKingside | MoveKind::CastleQueenside => {
                let rook = movegen::castle_rook(board, mv);
                record.captured = board.move_piece(mv.piece, mv.to);
                if let Some((rook_id, rook_to)) = rook {
                    record.rook_before = board.piece(rook_id).cloned();
                    board.move_piece(rook_id, rook_to);
                    if let Some(rook) = board.piece_mut(rook_id) {
                        rook.state.insert("moved".to_string(), Value::Bool(true));
                    }
                }
            }
            MoveKind::Promotion(new_type) => {
                record.captured = board.move_piece(mv.piece, mv.to);
                let (traits, state) = piece_blueprint(&self.game, new_type);
                if let Some(piece) = board.piece_mut(mv.piece) {
                    piece.type_name = new_type.clone();
                    piece.traits = traits;
                    piece.state = state;
                }
            }
            _ => {
                record.captured = board.move_piece(mv.piece, mv.to);
            }
        }
        if let Some(piece) = board.piece_mut(mv.piece) {
            piece.state.insert("moved".to_string(), Value::Bool(true));
            if mv.kind == MoveKind::DoubleAdvance {
                piece
                    .state
                    .insert("justDoublePushed".to_string(), Value::Bool(true));
            }
        }
        let stale: Vec<PieceId> = board
            .pieces()
            .filter(|p| p.id != mv.piece && p.state_flag("justDoublePushed"))
            .map(|p| p.id)
            .collect();
        for id in stale {
            if let Some(piece) = board.piece_mut(id) {
                piece
                    .state
                    .insert("justDoublePushed".to_string(), Value::Bool(false));
                record.cleared_double_push.push(id);
            }
        }
        // An explosive capture clears the blast radius, capturer
        // included; immune pieces shrug it off.
        if record.captured.is_some() && mover_before.has_trait("explosive") {
            let victims: Vec<PieceId> = board
                .pieces()
                .filter(|p| chebyshev(p.pos, mv.to) <= 1 && !p.has_trait("immune"))
                .map(|p| p.id)
                .collect();
            for id in victims {
                if let Some(piece) = board.remove_piece(id) {
                    record.exploded.push(piece);
                }
            }
        }
        record
    }

    /// Custom victory/draw conditions, evaluated for the player who
    /// just moved. Lists are disjunctive: the first satisfied
    /// condition ends the game.
    pub(crate) fn evaluate_end_conditions(&mut self, mover: Color, mv: Option<&Move>) {
        let piece = mv.and_then(|m| self.state.board.piece(m.piece)).map(|p| p.id);
        let mut outcome: Option<GameResult> = None;
        {
            let mut ctx = EvalContext::new(&self.game, &self.state.board, mover);
            ctx.piece = piece;
            ctx.from = mv.map(|m| m.from);
            ctx.to = mv.map(|m| m.to);
            ctx.check_count = self.state.check_count;
            ctx.custom_state = &self.state.custom_state;
            for entry in &self.game.victory {
                if eval_condition(&ctx, &entry.condition) {
                    outcome = Some(GameResult::Win(
                        mover,
                        WinReason::Custom(entry.name.clone()),
                    ));
                    break;
                }
            }
            if outcome.is_none() {
                for entry in &self.game.draw {
                    if eval_condition(&ctx, &entry.condition) {
                        outcome = Some(GameResult::Draw(DrawReason::Custom(entry.name.clone())));
                        break;
                    }
                }
            }
        }
        if let Some(result) = outcome {
            self.set_result(result);
        }
    }

    fn check_standard_endings(&mut self, mover: Color) {
        let next = self.state.current_player;
        if next != mover {
            if movegen::is_checkmate(&self.game, &self.state, next) {
                self.set_result(GameResult::Win(mover, WinReason::Checkmate));
                return;
            }
            if movegen::is_stalemate(&self.game, &self.state, next) {
                self.set_result(GameResult::Draw(DrawReason::Stalemate));
                return;
            }
        }
        if self.game.rules.fifty_move_rule && self.state.half_move_clock >= 100 {
            self.set_result(GameResult::Draw(DrawReason::FiftyMoves));
            return;
        }
        if self.game.rules.threefold_repetition {
            if let Some(current) = self.state.position_history.last() {
                let repeats = self
                    .state
                    .position_history
                    .iter()
                    .filter(|key| *key == current)
                    .count();
                if repeats >= 3 {
                    self.set_result(GameResult::Draw(DrawReason::Repetition));
                }
            }
        }
    }

    fn set_result(&mut self, result: GameResult) {
        if self.state.result.is_none() {
            self.state.result = Some(result.clone());
        }
        self.fire_event(EventType::GameEnd, None, None, None);
        self.emit(EngineEvent {
            kind: EngineEventKind::GameEnd,
            mv: None,
            color: result.winner(),
            captured: None,
            trigger: None,
            result: Some(result),
        });
    }

    /// Start of the new side's turn: cooldown counters tick down,
    /// then `turn_start` triggers fire.
    fn begin_turn(&mut self) {
        let color = self.state.current_player;
        let cooling: Vec<(PieceId, f64)> = self
            .state
            .board
            .pieces_of(color)
            .filter_map(|p| p.state_num("cooldown").filter(|n| *n > 0.0).map(|n| (p.id, n)))
            .collect();
        for (id, n) in cooling {
            if let Some(piece) = self.state.board.piece_mut(id) {
                piece
                    .state
                    .insert("cooldown".to_string(), Value::Number((n - 1.0).max(0.0)));
            }
        }
        self.fire_event(EventType::TurnStart, None, None, None);
        self.emit(EngineEvent::simple(
            EngineEventKind::TurnStart,
            None,
            Some(color),
        ));
    }

    // ---- observers ----

    pub fn on(
        &mut self,
        kind: EngineEventKind,
        handler: Box<dyn FnMut(&EngineEvent)>,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push(Observer { id, kind, handler });
        id
    }

    pub fn off(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|obs| obs.id != id);
        self.observers.len() != before
    }

    /// Deliver an event to matching observers.
    pub fn emit(&mut self, event: EngineEvent) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            if observer.kind == event.kind {
                (observer.handler)(&event);
            }
        }
        observers.append(&mut self.observers);
        self.observers = observers;
    }
}

/// Locate the legal move matching the request; a promotion request
/// matches the generated move regardless of the chosen type.
fn find_matching(legal: &[Move], mv: &Move) -> Option<Move> {
    if let Some(found) = legal.iter().find(|m| *m == mv) {
        return Some(found.clone());
    }
    legal
        .iter()
        .find(|m| m.piece == mv.piece && m.from == mv.from && m.to == mv.to)
        .map(|found| {
            let mut found = found.clone();
            if let MoveKind::Promotion(target) = &mv.kind {
                found.kind = MoveKind::Promotion(target.clone());
            }
            found
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang;

    fn engine_from(source: &str) -> Engine {
        Engine::new(lang::compile(source).unwrap())
    }

    fn standard() -> Engine {
        engine_from("game: \"Standard\"\n")
    }

    fn find_move(engine: &Engine, from: &str, to: &str) -> Option<Move> {
        let from = Position::parse(from).unwrap();
        let to = Position::parse(to).unwrap();
        engine
            .legal_moves()
            .into_iter()
            .find(|m| m.from == from && m.to == to)
    }

    #[test]
    fn test_standard_opening_has_twenty_moves() {
        let mut engine = standard();
        assert_eq!(engine.legal_moves().len(), 20);
        let outcome = engine.make_move_coords("e2e4");
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(engine.current_player(), Color::Black);
        assert_eq!(engine.state().move_history.len(), 1);
    }

    #[test]
    fn test_illegal_move_leaves_state_unchanged() {
        let mut engine = standard();
        let before = engine.state();
        let outcome = engine.make_move_coords("e2e5");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("'e2e5' is not a legal move"));
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn test_double_push_sets_flag_and_en_passant() {
        let mut engine = standard();
        assert!(engine.make_move_coords("e2e4").success);
        assert!(engine.make_move_coords("a7a6").success);
        assert!(engine.make_move_coords("e4e5").success);
        assert!(engine.make_move_coords("d7d5").success);
        let ep = find_move(&engine, "e5", "d6").expect("en passant should be legal");
        assert_eq!(ep.kind, MoveKind::EnPassant);
        let outcome = engine.make_move(&ep);
        assert!(outcome.success);
        assert_eq!(outcome.captured.as_deref(), Some("Pawn"));
        assert!(engine
            .state()
            .board
            .at(Position::parse("d5").unwrap())
            .is_none());
    }

    #[test]
    fn test_back_rank_mate() {
        let source = "\
game: \"BackRank\"
setup:
    White:
        a1: King
        a7: Rook
        b6: Rook
    Black:
        h8: King
";
        let mut engine = engine_from(source);
        assert!(engine.make_move_coords("b6b7").success);
        assert!(engine.make_move_coords("h8g8").success);
        let outcome = engine.make_move_coords("a7a8");
        assert!(outcome.success, "{:?}", outcome.error);
        assert!(engine.is_game_over());
        assert_eq!(
            engine.result(),
            Some(&GameResult::Win(Color::White, WinReason::Checkmate))
        );
        assert!(engine.legal_moves().is_empty());
    }

    #[test]
    fn test_castling_blocked_through_attack() {
        let source = "\
game: \"CastleCheck\"
setup:
    White:
        e1: King
        h1: Rook
    Black:
        e8: King
        f8: Rook
";
        let engine = engine_from(source);
        assert!(!engine
            .legal_moves()
            .iter()
            .any(|m| m.kind == MoveKind::CastleKingside));
    }

    #[test]
    fn test_castling_when_path_is_safe() {
        let source = "\
game: \"Castle\"
setup:
    White:
        e1: King
        h1: Rook
    Black:
        e8: King
";
        let mut engine = engine_from(source);
        let castle = engine
            .legal_moves()
            .into_iter()
            .find(|m| m.kind == MoveKind::CastleKingside)
            .expect("kingside castling should be legal");
        assert!(engine.make_move(&castle).success);
        let state = engine.state();
        assert_eq!(
            state.board.at(Position::parse("g1").unwrap()).unwrap().type_name,
            "King"
        );
        assert_eq!(
            state.board.at(Position::parse("f1").unwrap()).unwrap().type_name,
            "Rook"
        );
    }

    #[test]
    fn test_king_of_the_hill_victory() {
        let source = "\
game: \"KotH\"
board:
    size: 8x8
    zones:
        hill: [d4, d5, e4, e5]
victory:
    hill: King in zone.hill
setup:
    White:
        e3: King
    Black:
        a8: King
";
        let mut engine = engine_from(source);
        let outcome = engine.make_move_coords("e3d4");
        assert!(outcome.success, "{:?}", outcome.error);
        let result = engine.result().unwrap();
        assert_eq!(result.winner(), Some(Color::White));
        assert_eq!(result.reason(), "hill");
    }

    #[test]
    fn test_cooldown_gates_move_generation() {
        let source = "\
game: \"Cooldown\"
piece Freezer:
    move: step(any)
    state:
        cooldown: 0
    on move do: set piece.state.cooldown = 2
setup:
    White:
        d4: Freezer
        e1: King
    Black:
        e8: King
";
        let mut engine = engine_from(source);
        let freezer = engine
            .state()
            .board
            .at(Position::parse("d4").unwrap())
            .unwrap()
            .id;
        assert!(!engine.legal_moves_for(freezer).is_empty());
        assert!(engine.make_move_coords("d4d5").success);
        // The move trigger put it on cooldown.
        assert!(engine.legal_moves_for(freezer).is_empty());
        assert!(engine.make_move_coords("e8e7").success);
        // White's turn began: cooldown ticked 2 -> 1, still inert.
        assert!(engine.legal_moves_for(freezer).is_empty());
        assert!(engine.make_move_coords("e1e2").success);
        assert!(engine.make_move_coords("e7e8").success);
        // Ticked to 0: free again.
        assert!(!engine.legal_moves_for(freezer).is_empty());
    }

    #[test]
    fn test_optional_trigger_skip_and_execute() {
        let source = "\
game: \"Bounty\"
trigger bounty:
    on: capture
    optional: true
    description: \"Collect the bounty\"
    do: set game.customState.bounty = 1
setup:
    White:
        e4: Pawn
        e1: King
    Black:
        d5: Pawn
        e8: King
";
        let mut engine = engine_from(source);
        assert!(engine.make_move_coords("e4d5").success);
        let pending = engine.pending_optional_triggers().to_vec();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "bounty");
        assert_eq!(pending[0].description.as_deref(), Some("Collect the bounty"));

        // Skipping leaves no trace.
        let id = pending[0].id;
        assert!(engine.skip_optional_trigger(id));
        assert!(engine.pending_optional_triggers().is_empty());
        assert!(engine.state().custom_state.get("bounty").is_none());
        assert!(!engine.skip_optional_trigger(id));

        // Executing applies the actions.
        let mut engine = engine_from(source);
        assert!(engine.make_move_coords("e4d5").success);
        let id = engine.pending_optional_triggers()[0].id;
        assert!(engine.execute_optional_trigger(id));
        assert!(engine.pending_optional_triggers().is_empty());
        assert_eq!(
            engine.state().custom_state.get("bounty"),
            Some(&Value::Number(1.0))
        );
    }

    #[test]
    fn test_capture_cancel_rejects_move() {
        let source = "\
game: \"Pacifist\"
trigger no_captures:
    on: capture
    do: cancel
setup:
    White:
        e4: Pawn
        e1: King
    Black:
        d5: Pawn
        e8: King
";
        let mut engine = engine_from(source);
        let before = engine.state();
        let outcome = engine.make_move_coords("e4d5");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Capture cancelled"));
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn test_undo_restores_exact_state() {
        let mut engine = standard();
        let initial = engine.state();
        assert!(engine.make_move_coords("e2e4").success);
        assert!(engine.undo_move());
        assert_eq!(engine.state(), initial);

        assert!(engine.make_move_coords("e2e4").success);
        assert!(engine.make_move_coords("e7e5").success);
        let after_two = engine.state();
        assert!(engine.make_move_coords("g1f3").success);
        assert!(engine.undo_move());
        assert_eq!(engine.state(), after_two);
    }

    #[test]
    fn test_undo_capture_and_castle() {
        let source = "\
game: \"Castle\"
setup:
    White:
        e1: King
        h1: Rook
    Black:
        e8: King
        h4: Rook
";
        let mut engine = engine_from(source);
        let before = engine.state();
        let castle = engine
            .legal_moves()
            .into_iter()
            .find(|m| m.kind == MoveKind::CastleKingside)
            .unwrap();
        assert!(engine.make_move(&castle).success);
        assert!(engine.undo_move());
        assert_eq!(engine.state(), before);

        // A rook capture, then undo.
        let capture = find_move(&engine, "h1", "h4").unwrap();
        assert!(engine.make_move(&capture).success);
        assert!(engine.undo_move());
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn test_undo_empty_history() {
        let mut engine = standard();
        assert!(!engine.undo_move());
    }

    #[test]
    fn test_determinism_across_instances() {
        let game = lang::compile("game: \"Standard\"\n").unwrap();
        let mut a = Engine::new(game.clone());
        let mut b = Engine::new(game);
        for mv in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"] {
            assert!(a.make_move_coords(mv).success);
            assert!(b.make_move_coords(mv).success);
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let source = "\
game: \"Promote\"
setup:
    White:
        e7: Pawn
        a1: King
    Black:
        a8: King
";
        let mut engine = engine_from(source);
        let promo = find_move(&engine, "e7", "e8").unwrap();
        assert_eq!(promo.kind, MoveKind::Promotion("Queen".to_string()));
        assert!(engine.make_move(&promo).success);
        let piece = engine
            .state()
            .board
            .at(Position::parse("e8").unwrap())
            .unwrap()
            .clone();
        assert_eq!(piece.type_name, "Queen");
    }

    #[test]
    fn test_promotion_honors_requested_type() {
        let source = "\
game: \"Promote\"
setup:
    White:
        e7: Pawn
        a1: King
    Black:
        a8: King
";
        let mut engine = engine_from(source);
        let outcome = engine.make_move_coords("e7e8=N");
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(
            engine
                .state()
                .board
                .at(Position::parse("e8").unwrap())
                .unwrap()
                .type_name,
            "Knight"
        );
    }

    #[test]
    fn test_fifty_move_rule() {
        let mut engine = standard();
        engine.state.half_move_clock = 99;
        assert!(engine.make_move_coords("g1f3").success);
        assert_eq!(
            engine.result(),
            Some(&GameResult::Draw(DrawReason::FiftyMoves))
        );
    }

    #[test]
    fn test_threefold_repetition() {
        let mut engine = standard();
        for _ in 0..2 {
            assert!(engine.make_move_coords("g1f3").success);
            assert!(engine.make_move_coords("g8f6").success);
            assert!(engine.make_move_coords("f3g1").success);
            assert!(engine.make_move_coords("f6g8").success);
        }
        assert!(
            engine.is_game_over(),
            "the start position repeated three times"
        );
        assert_eq!(
            engine.result(),
            Some(&GameResult::Draw(DrawReason::Repetition))
        );
    }

    #[test]
    fn test_custom_piece_pattern_and_reference() {
        let source = "\
game: \"Patterns\"
pattern lance: slide(forward)
piece Lancer:
    move: lance
    capture: same
setup:
    White:
        e2: Lancer
        a1: King
    Black:
        e7: Pawn
        a8: King
";
        let engine = engine_from(source);
        let lancer = engine
            .state()
            .board
            .at(Position::parse("e2").unwrap())
            .unwrap()
            .id;
        let moves = engine.legal_moves_for(lancer);
        let destinations: Vec<String> = moves.iter().map(|m| m.to.to_string()).collect();
        assert!(destinations.contains(&"e3".to_string()));
        assert!(destinations.contains(&"e7".to_string()), "capture at the blocker");
        assert!(!destinations.contains(&"e8".to_string()), "cannot slide past it");
    }

    #[test]
    fn test_conditional_pattern_filters_moves() {
        let source = "\
game: \"Conditional\"
piece Sneak:
    move: step(any) where empty
    capture: none
setup:
    White:
        d4: Sneak
        a1: King
    Black:
        d5: Pawn
        a8: King
";
        let engine = engine_from(source);
        let sneak = engine
            .state()
            .board
            .at(Position::parse("d4").unwrap())
            .unwrap()
            .id;
        let moves = engine.legal_moves_for(sneak);
        assert!(moves.iter().all(|m| m.to != Position::parse("d5").unwrap()));
        assert_eq!(moves.len(), 7);
    }

    #[test]
    fn test_hop_pattern() {
        let source = "\
game: \"Hopper\"
piece Grasshopper:
    move: hop(any)
    capture: same
setup:
    White:
        d1: Grasshopper
        a1: King
    Black:
        d4: Pawn
        d6: Pawn
        a8: King
";
        let engine = engine_from(source);
        let hopper = engine
            .state()
            .board
            .at(Position::parse("d1").unwrap())
            .unwrap()
            .id;
        let moves = engine.legal_moves_for(hopper);
        let destinations: Vec<Position> = moves.iter().map(|m| m.to).collect();
        // Hop over d4 lands on d5; hopping d6 is out of reach because
        // iteration stops at the first post-hurdle square.
        assert!(destinations.contains(&Position::parse("d5").unwrap()));
        assert!(!destinations.contains(&Position::parse("d7").unwrap()));
    }

    #[test]
    fn test_explosive_capture_clears_radius() {
        let source = "\
game: \"Atomic\"
piece Bomber:
    move: step(any)
    capture: same
    traits: [explosive]
setup:
    White:
        d4: Bomber
        a1: King
    Black:
        d5: Pawn
        e5: Pawn
        e6: Knight
        a8: King
";
        let mut engine = engine_from(source);
        let outcome = engine.make_move_coords("d4d5");
        assert!(outcome.success, "{:?}", outcome.error);
        let state = engine.state();
        // Blast at d5 removes the bomber, both pawns... the knight at
        // e6 is adjacent to d5 and goes too.
        assert!(state.board.at(Position::parse("d5").unwrap()).is_none());
        assert!(state.board.at(Position::parse("e5").unwrap()).is_none());
        assert!(state.board.at(Position::parse("e6").unwrap()).is_none());
        assert!(state.board.at(Position::parse("a8").unwrap()).is_some());
    }

    #[test]
    fn test_phase_trait_slides_through_pieces() {
        let source = "\
game: \"Ghosts\"
piece Ghost:
    move: slide(north)
    traits: [phase]
setup:
    White:
        e1: Ghost
        a1: King
    Black:
        e4: Pawn
        a8: King
";
        let engine = engine_from(source);
        let ghost = engine
            .state()
            .board
            .at(Position::parse("e1").unwrap())
            .unwrap()
            .id;
        let destinations: Vec<Position> = engine
            .legal_moves_for(ghost)
            .iter()
            .map(|m| m.to)
            .collect();
        assert!(destinations.contains(&Position::parse("e3").unwrap()));
        // Passes through the pawn without capturing it.
        assert!(!destinations.contains(&Position::parse("e4").unwrap()));
        assert!(destinations.contains(&Position::parse("e5").unwrap()));
        assert!(destinations.contains(&Position::parse("e8").unwrap()));
    }

    #[test]
    fn test_phase_trait_leaps_onto_enemies() {
        let source = "\
game: \"Phantoms\"
piece Phantom:
    move: leap(1, 2)
    traits: [phase]
setup:
    White:
        d4: Phantom
        b5: Pawn
        a1: King
    Black:
        e6: Pawn
        a8: King
";
        let engine = engine_from(source);
        let phantom = engine
            .state()
            .board
            .at(Position::parse("d4").unwrap())
            .unwrap()
            .id;
        let destinations: Vec<Position> = engine
            .legal_moves_for(phantom)
            .iter()
            .map(|m| m.to)
            .collect();
        // Lands on the enemy pawn's square without it being a capture.
        assert!(destinations.contains(&Position::parse("e6").unwrap()));
        // A friendly occupant still blocks the landing.
        assert!(!destinations.contains(&Position::parse("b5").unwrap()));
        assert!(destinations.contains(&Position::parse("f5").unwrap()));
    }

    #[test]
    fn test_immune_trait_blocks_capture() {
        let source = "\
game: \"Immortal\"
piece Immortal:
    move: step(any)
    traits: [immune]
setup:
    White:
        d4: Rook
        a1: King
    Black:
        d8: Immortal
        h8: King
";
        let engine = engine_from(source);
        let rook = engine
            .state()
            .board
            .at(Position::parse("d4").unwrap())
            .unwrap()
            .id;
        let destinations: Vec<Position> = engine
            .legal_moves_for(rook)
            .iter()
            .map(|m| m.to)
            .collect();
        assert!(destinations.contains(&Position::parse("d7").unwrap()));
        assert!(!destinations.contains(&Position::parse("d8").unwrap()));
    }

    #[test]
    fn test_blocking_effect_stops_movement() {
        let source = "\
game: \"Walls\"
effect Wall:
    blocks: all
trigger build:
    on: game_start
    do: mark d4 with Wall
setup:
    White:
        d1: Rook
        a1: King
    Black:
        h8: King
";
        let engine = engine_from(source);
        let rook = engine
            .state()
            .board
            .at(Position::parse("d1").unwrap())
            .unwrap()
            .id;
        let destinations: Vec<Position> = engine
            .legal_moves_for(rook)
            .iter()
            .map(|m| m.to)
            .collect();
        assert!(destinations.contains(&Position::parse("d3").unwrap()));
        assert!(!destinations.contains(&Position::parse("d4").unwrap()));
        assert!(!destinations.contains(&Position::parse("d5").unwrap()));
    }

    #[test]
    fn test_replace_map_substitutes_types() {
        let source = "\
game: \"Guards\"
piece Guard:
    move: step(orthogonal)
setup:
    add:
        White:
            e4: Guard
    replace:
        Knight: Guard
";
        let engine = engine_from(source);
        let state = engine.state();
        // Standard seeding plus the explicit guard, knights replaced.
        assert_eq!(state.board.count_of_type(Color::White, "Guard"), 3);
        assert_eq!(state.board.count_of_type(Color::White, "Knight"), 0);
        assert_eq!(state.board.count_of_type(Color::Black, "Guard"), 2);
    }

    #[test]
    fn test_check_counting() {
        let source = "\
game: \"Checks\"
setup:
    White:
        a1: King
        h4: Rook
    Black:
        e8: King
";
        let mut engine = engine_from(source);
        assert!(engine.make_move_coords("h4e4").success);
        assert_eq!(engine.state().check_count[Color::Black], 1);
        assert!(engine.is_in_check(Color::Black));
    }

    #[test]
    fn test_turn_start_trigger_mutates_state() {
        let source = "\
game: \"Ticker\"
trigger tick:
    on: turn_start
    do: set game.customState.turns += 1
setup:
    White:
        e1: King
    Black:
        e8: King
";
        let mut engine = engine_from(source);
        assert!(engine.make_move_coords("e1e2").success);
        assert_eq!(
            engine.state().custom_state.get("turns"),
            Some(&Value::Number(1.0))
        );
    }

    #[test]
    fn test_observer_events() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<EngineEventKind>>> = Rc::new(RefCell::new(Vec::new()));
        let mut engine = standard();
        let sink = seen.clone();
        let id = engine.on(
            EngineEventKind::Move,
            Box::new(move |event| sink.borrow_mut().push(event.kind)),
        );
        assert!(engine.make_move_coords("e2e4").success);
        assert_eq!(seen.borrow().len(), 1);
        assert!(engine.off(id));
        assert!(engine.make_move_coords("e7e5").success);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_reset_rebuilds_initial_position() {
        let mut engine = standard();
        assert!(engine.make_move_coords("e2e4").success);
        let after = engine.state();
        engine.reset();
        let fresh = engine.state();
        assert_ne!(after.board, fresh.board);
        assert_eq!(fresh.move_history.len(), 0);
        assert_eq!(fresh.current_player, Color::White);
        assert_eq!(fen::placement_fen(&fresh.board), fen::STANDARD_FEN);
    }

    #[test]
    fn test_serde_round_trip_of_game_and_state() {
        let source = "\
game: \"Persisted\"
board:
    size: 8x8
    zones:
        hill: [d4, d5, e4, e5]
effect Wall:
    blocks: all
piece Guard:
    move: step(orthogonal)
    traits: [immune]
    state:
        stamina: 2
trigger build:
    on: game_start
    do: mark d4 with Wall
setup:
    add:
        White Guard: [c3]
victory:
    hill: King in zone.hill
";
        let game = lang::compile(source).unwrap();
        let json = serde_json::to_string(&game).unwrap();
        let restored: CompiledGame = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, game);

        let mut engine = Engine::new(game);
        assert!(engine.make_move_coords("e2e4").success);
        let state = engine.state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_round_trip_fixture_programs() {
        let fixtures = [
            "game: \"Standard\"\n",
            "\
game: \"KingOfTheHill\"
board:
    size: 8x8
    zones:
        hill: [d4, d5, e4, e5]
victory:
    hill: King in zone.hill
",
            "\
game: \"DoubleMoveChess\"
piece Jumper:
    move: leap(1, 3) | leap(2, 3)
    capture: same
setup:
    add:
        White Jumper: [c3]
",
            "\
game: \"Scripted\"
script {
    let total = 0 ;
}
",
        ];
        for source in fixtures {
            let game = lang::compile(source).unwrap_or_else(|e| panic!("{}: {}", source, e));
            let engine = Engine::new(game);
            assert!(
                !engine.legal_moves().is_empty(),
                "no legal moves for fixture:\n{}",
                source
            );
        }
    }
}
