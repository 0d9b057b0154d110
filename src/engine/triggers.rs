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

//! Trigger dispatch.
//!
//! For each event the engine collects the acting piece definition's
//! triggers followed by the game-level triggers, in declaration order,
//! and runs those whose `on` matches and whose `when` holds. Optional
//! triggers are queued as [`PendingOptionalTrigger`]s for the host to
//! execute or skip; a `cancel` action aborts dispatch and reports the
//! event cancelled.

use std::collections::BTreeMap;

use super::actions::{execute_trigger, ActionContext};
use super::eval::{eval_condition, EvalContext};
use super::state::{Move, PendingOptionalTrigger, TriggerSource};
use super::{Engine, EngineEvent, EngineEventKind};
use crate::board::{PieceId, Position};
use crate::rules::{EventType, TriggerDefinition};

impl Engine {
    /// Fire all triggers bound to `event`. Returns true when a trigger
    /// cancelled the event.
    pub(crate) fn fire_event(
        &mut self,
        event: EventType,
        mv: Option<&Move>,
        piece: Option<PieceId>,
        captured: Option<String>,
    ) -> bool {
        let subject_type = piece
            .and_then(|id| self.state.board.piece(id))
            .map(|p| p.type_name.clone());
        self.dispatch(event, mv, piece, subject_type, captured)
    }

    /// Fire `event` against a piece type's triggers when the piece
    /// itself is gone (the `captured` perspective).
    pub(crate) fn fire_event_for_type(
        &mut self,
        piece_type: &str,
        event: EventType,
        mv: Option<&Move>,
        captured: Option<String>,
    ) -> bool {
        self.dispatch(event, mv, None, Some(piece_type.to_string()), captured)
    }

    fn dispatch(
        &mut self,
        event: EventType,
        mv: Option<&Move>,
        piece: Option<PieceId>,
        subject_type: Option<String>,
        captured: Option<String>,
    ) -> bool {
        let mut list: Vec<(TriggerSource, TriggerDefinition)> = Vec::new();
        if let Some(type_name) = &subject_type {
            if let Some(def) = self.game.piece_def(type_name) {
                for (index, trigger) in def.triggers.iter().enumerate() {
                    if trigger.on == event {
                        list.push((
                            TriggerSource::Piece {
                                piece_type: type_name.clone(),
                                index,
                            },
                            trigger.clone(),
                        ));
                    }
                }
            }
        }
        for (index, trigger) in self.game.triggers.iter().enumerate() {
            if trigger.on == event {
                list.push((TriggerSource::Game(index), trigger.clone()));
            }
        }
        if list.is_empty() {
            return false;
        }

        let mover = piece
            .and_then(|id| self.state.board.piece(id))
            .map(|p| p.owner)
            .unwrap_or(self.state.current_player);

        let mut cancelled = false;
        for (source, trigger) in list {
            let holds = match &trigger.when {
                None => true,
                Some(condition) => {
                    let mut ctx = EvalContext::new(&self.game, &self.state.board, mover);
                    ctx.piece = piece;
                    ctx.from = mv.map(|m| m.from);
                    ctx.to = mv.map(|m| m.to);
                    ctx.captured = captured.clone();
                    ctx.check_count = self.state.check_count;
                    ctx.custom_state = &self.state.custom_state;
                    eval_condition(&ctx, condition)
                }
            };
            if !holds {
                continue;
            }
            if trigger.optional {
                // Optional triggers need a move to rebuild their
                // context from later; events without one are skipped.
                let mv = match mv.or(self.state.last_move()) {
                    Some(mv) => mv.clone(),
                    None => continue,
                };
                let id = self.next_trigger_id;
                self.next_trigger_id += 1;
                let pending = PendingOptionalTrigger {
                    id,
                    name: trigger.name.clone(),
                    description: trigger.description.clone(),
                    mv,
                    player: mover,
                    source,
                };
                self.state.pending_optional_triggers.push(pending.clone());
                self.emit(EngineEvent {
                    kind: EngineEventKind::OptionalTrigger,
                    mv: Some(pending.mv.clone()),
                    color: Some(mover),
                    captured: captured.clone(),
                    trigger: Some(pending),
                    result: None,
                });
                continue;
            }
            let mut ctx = ActionContext {
                game: &self.game,
                board: &mut self.state.board,
                custom_state: &mut self.state.custom_state,
                result: &mut self.state.result,
                mover,
                piece,
                from: mv.map(|m| m.from),
                to: mv.map(|m| m.to),
                captured: captured.clone(),
                check_count: self.state.check_count,
                origin: trigger.name.clone(),
                vars: BTreeMap::new(),
                cancelled: false,
            };
            execute_trigger(&mut ctx, &trigger);
            if ctx.cancelled {
                cancelled = true;
                break;
            }
        }
        cancelled
    }

    pub fn pending_optional_triggers(&self) -> &[PendingOptionalTrigger] {
        &self.state.pending_optional_triggers
    }

    /// Run a queued optional trigger's actions in a context rebuilt
    /// from its recorded move, then re-evaluate end conditions.
    pub fn execute_optional_trigger(&mut self, id: u64) -> bool {
        let index = match self
            .state
            .pending_optional_triggers
            .iter()
            .position(|p| p.id == id)
        {
            Some(index) => index,
            None => return false,
        };
        let pending = self.state.pending_optional_triggers.remove(index);
        let trigger = match self.resolve_trigger(&pending.source) {
            Some(trigger) => trigger,
            None => return false,
        };
        let piece = self
            .state
            .board
            .piece(pending.mv.piece)
            .map(|p| p.id);
        let mut ctx = ActionContext {
            game: &self.game,
            board: &mut self.state.board,
            custom_state: &mut self.state.custom_state,
            result: &mut self.state.result,
            mover: pending.player,
            piece,
            from: Some(pending.mv.from),
            to: Some(pending.mv.to),
            captured: None,
            check_count: self.state.check_count,
            origin: trigger.name.clone(),
            vars: BTreeMap::new(),
            cancelled: false,
        };
        execute_trigger(&mut ctx, &trigger);
        self.evaluate_end_conditions(pending.player, Some(&pending.mv));
        if let Some(result) = self.state.result.clone() {
            self.emit(EngineEvent {
                kind: EngineEventKind::GameEnd,
                mv: None,
                color: result.winner(),
                captured: None,
                trigger: None,
                result: Some(result),
            });
        }
        true
    }

    /// Drop a queued optional trigger without running it.
    pub fn skip_optional_trigger(&mut self, id: u64) -> bool {
        let before = self.state.pending_optional_triggers.len();
        self.state.pending_optional_triggers.retain(|p| p.id != id);
        self.state.pending_optional_triggers.len() != before
    }

    fn resolve_trigger(&self, source: &TriggerSource) -> Option<TriggerDefinition> {
        match source {
            TriggerSource::Game(index) => self.game.triggers.get(*index).cloned(),
            TriggerSource::Piece { piece_type, index } => self
                .game
                .piece_def(piece_type)
                .and_then(|def| def.triggers.get(*index))
                .cloned(),
        }
    }

    pub(crate) fn fire_zone_events(&mut self, mv: &Move, from: Position) {
        let zones: Vec<String> = self.state.board.zones().keys().cloned().collect();
        for zone in zones {
            let was_in = self.state.board.in_zone(&zone, from);
            let now_in = self.state.board.in_zone(&zone, mv.to);
            if now_in && !was_in {
                self.fire_event(EventType::EnterZone, Some(mv), Some(mv.piece), None);
            } else if was_in && !now_in {
                self.fire_event(EventType::ExitZone, Some(mv), Some(mv.piece), None);
            }
        }
    }
}
