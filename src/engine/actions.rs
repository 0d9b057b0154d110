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

use std::collections::{BTreeMap, BTreeSet};

use super::eval::{eval_condition, eval_expr, EvalContext};
use crate::board::{chebyshev, Board, Color, Effect, Pair, PieceId, Position, StandardPiece};
use crate::game::{DrawReason, GameResult, WinReason};
use crate::rules::{
    Action, CompiledGame, Condition, Expr, RemoveFilter, SetOp, TriggerDefinition, Value,
};

/// Mutable surroundings for one trigger's actions. The borrowed parts
/// come from the engine; `cancelled` is read back by the caller.
pub(crate) struct ActionContext<'a> {
    pub game: &'a CompiledGame,
    pub board: &'a mut Board,
    pub custom_state: &'a mut BTreeMap<String, Value>,
    pub result: &'a mut Option<GameResult>,
    pub mover: Color,
    pub piece: Option<PieceId>,
    pub from: Option<Position>,
    pub to: Option<Position>,
    pub captured: Option<String>,
    pub check_count: Pair<u32>,
    /// The trigger being executed, used as the reason for win/lose/
    /// draw results it declares.
    pub origin: String,
    pub vars: BTreeMap<String, Value>,
    pub cancelled: bool,
}

impl<'a> ActionContext<'a> {
    fn eval(&self, expr: &Expr) -> Value {
        let ctx = self.eval_context();
        eval_expr(&ctx, expr)
    }

    fn holds(&self, condition: &Condition) -> bool {
        let ctx = self.eval_context();
        eval_condition(&ctx, condition)
    }

    fn eval_context(&self) -> EvalContext<'_> {
        let mut ctx = EvalContext::new(self.game, &*self.board, self.mover);
        ctx.piece = self.piece;
        ctx.from = self.from;
        ctx.to = self.to;
        ctx.captured = self.captured.clone();
        ctx.check_count = self.check_count;
        ctx.custom_state = &*self.custom_state;
        ctx.vars = self.vars.clone();
        ctx
    }
}

pub(crate) fn execute_trigger(ctx: &mut ActionContext, trigger: &TriggerDefinition) {
    execute_actions(ctx, &trigger.actions);
}

pub(crate) fn execute_actions(ctx: &mut ActionContext, actions: &[Action]) {
    for action in actions {
        if ctx.cancelled {
            break;
        }
        execute_action(ctx, action);
    }
}

fn execute_action(ctx: &mut ActionContext, action: &Action) {
    match action {
        Action::Set { target, op, value } => {
            let value = ctx.eval(value);
            apply_set(ctx, target, *op, value);
        }
        Action::Create { piece, pos, owner } => {
            let pos = match square_of(ctx, pos) {
                Some(pos) if ctx.board.in_bounds(pos) => pos,
                _ => return,
            };
            let owner = owner
                .as_ref()
                .and_then(|expr| color_of(&ctx.eval(expr)))
                .unwrap_or(ctx.mover);
            let (traits, state) = piece_blueprint(ctx.game, piece);
            ctx.board.spawn(piece, owner, pos, traits, state);
        }
        Action::Remove {
            target,
            range,
            filter,
        } => execute_remove(ctx, target.as_ref(), range.as_ref(), filter.as_ref()),
        Action::Transform { target, into } => {
            let id = match piece_of(ctx, target) {
                Some(id) => id,
                None => return,
            };
            let (traits, state) = piece_blueprint(ctx.game, into);
            if let Some(piece) = ctx.board.piece_mut(id) {
                piece.type_name = into.clone();
                piece.traits = traits;
                piece.state = state;
            }
        }
        Action::Mark { pos, effect } => {
            if let Some(pos) = square_of(ctx, pos) {
                mark_square(ctx, pos, effect);
            }
        }
        Action::MovePiece { target, to } => {
            let id = match piece_of(ctx, target) {
                Some(id) => id,
                None => return,
            };
            if let Some(to) = square_of(ctx, to) {
                if ctx.board.in_bounds(to) {
                    ctx.board.move_piece(id, to);
                }
            }
        }
        Action::Win(color) => {
            if let Some(color) = color_of(&ctx.eval(color)) {
                *ctx.result = Some(GameResult::Win(
                    color,
                    WinReason::Custom(ctx.origin.clone()),
                ));
            }
        }
        Action::Lose(color) => {
            if let Some(color) = color_of(&ctx.eval(color)) {
                *ctx.result = Some(GameResult::Win(
                    !color,
                    WinReason::Custom(ctx.origin.clone()),
                ));
            }
        }
        Action::Draw { reason } => {
            let reason = reason.clone().unwrap_or_else(|| ctx.origin.clone());
            *ctx.result = Some(GameResult::Draw(DrawReason::Custom(reason)));
        }
        Action::Cancel => ctx.cancelled = true,
        Action::Apply { effect, target } => {
            if let Some(pos) = square_of(ctx, target) {
                mark_square(ctx, pos, effect);
            }
        }
        Action::ForEach {
            var,
            iterable,
            actions,
        } => {
            let items = match ctx.eval(iterable) {
                Value::List(items) => items,
                Value::Null => return,
                single => vec![single],
            };
            let shadowed = ctx.vars.get(var).cloned();
            for item in items {
                ctx.vars.insert(var.clone(), item);
                execute_actions(ctx, actions);
                if ctx.cancelled {
                    break;
                }
            }
            match shadowed {
                Some(value) => {
                    ctx.vars.insert(var.clone(), value);
                }
                None => {
                    ctx.vars.remove(var);
                }
            }
        }
        Action::If {
            condition,
            then_actions,
            else_actions,
        } => {
            if ctx.holds(condition) {
                execute_actions(ctx, then_actions);
            } else {
                execute_actions(ctx, else_actions);
            }
        }
        // Unknown actions are ignored for forward compatibility.
        Action::Custom { .. } => {}
    }
}

/// `set` targets resolve syntactically: `piece.state.X` (or a loop
/// variable's state), `game.customState.X`, or a bare name into the
/// game's custom state.
fn apply_set(ctx: &mut ActionContext, target: &Expr, op: SetOp, value: Value) {
    enum Slot {
        PieceState(PieceId, String),
        Custom(String),
    }
    let slot = match target {
        Expr::Member { object, property } => match object.as_ref() {
            Expr::Member {
                object: root,
                property: middle,
            } if middle == "state" => match root_piece(ctx, root) {
                Some(id) => Some(Slot::PieceState(id, property.clone())),
                None => None,
            },
            Expr::Member {
                object: root,
                property: middle,
            } if middle == "customState" && matches!(root.as_ref(), Expr::Identifier(n) if n == "game") =>
            {
                Some(Slot::Custom(property.clone()))
            }
            Expr::Identifier(name) if name == "game" => Some(Slot::Custom(property.clone())),
            _ => None,
        },
        Expr::Identifier(name) => Some(Slot::Custom(name.clone())),
        _ => None,
    };
    let slot = match slot {
        Some(slot) => slot,
        None => return,
    };
    match slot {
        Slot::PieceState(id, key) => {
            let current = ctx
                .board
                .piece(id)
                .and_then(|p| p.state.get(&key).cloned())
                .unwrap_or(Value::Null);
            let next = combine(op, &current, value);
            if let Some(piece) = ctx.board.piece_mut(id) {
                piece.state.insert(key, next);
            }
        }
        Slot::Custom(key) => {
            let current = ctx.custom_state.get(&key).cloned().unwrap_or(Value::Null);
            let next = combine(op, &current, value);
            ctx.custom_state.insert(key, next);
        }
    }
}

fn root_piece(ctx: &ActionContext, root: &Expr) -> Option<PieceId> {
    match root {
        Expr::Identifier(name) if name == "piece" => ctx.piece,
        Expr::Identifier(name) => match ctx.vars.get(name) {
            Some(Value::Piece(id)) => Some(*id),
            _ => None,
        },
        _ => None,
    }
}

fn combine(op: SetOp, current: &Value, value: Value) -> Value {
    match op {
        SetOp::Assign => value,
        SetOp::Add | SetOp::Sub => {
            let a = current.as_number().unwrap_or(0.0);
            let b = value.as_number().unwrap_or(0.0);
            Value::Number(if op == SetOp::Add { a + b } else { a - b })
        }
    }
}

fn execute_remove(
    ctx: &mut ActionContext,
    target: Option<&Expr>,
    range: Option<&crate::rules::RemoveRange>,
    filter: Option<&RemoveFilter>,
) {
    match range {
        Some(range) => {
            let center = match square_of(ctx, &range.from) {
                Some(pos) => pos,
                None => return,
            };
            let victims: Vec<PieceId> = ctx
                .board
                .pieces()
                .filter(|p| chebyshev(p.pos, center) <= range.radius)
                .filter(|p| !p.has_trait("immune"))
                .filter(|p| filter_allows(filter, &p.type_name))
                .map(|p| p.id)
                .collect();
            for id in victims {
                ctx.board.remove_piece(id);
            }
        }
        None => {
            let target = match target {
                Some(target) => target,
                None => return,
            };
            match ctx.eval(target) {
                Value::Piece(id) => {
                    ctx.board.remove_piece(id);
                }
                Value::Square(pos) => {
                    ctx.board.remove_at(pos);
                }
                _ => {}
            }
        }
    }
}

fn filter_allows(filter: Option<&RemoveFilter>, type_name: &str) -> bool {
    match filter {
        None => true,
        Some(filter) => {
            let included =
                filter.include.is_empty() || filter.include.iter().any(|n| n == type_name);
            let excluded = filter.exclude.iter().any(|n| n == type_name);
            included && !excluded
        }
    }
}

fn mark_square(ctx: &mut ActionContext, pos: Position, effect_name: &str) {
    if !ctx.board.in_bounds(pos) {
        return;
    }
    let def = ctx.game.effect_def(effect_name);
    let effect = Effect {
        kind: effect_name.to_string(),
        owner: Some(ctx.mover),
        blocks: def.map(|d| d.blocks).unwrap_or_default(),
        visual: def.and_then(|d| d.visual.clone()),
        source: ctx.piece,
    };
    ctx.board.add_effect(pos, effect);
}

fn square_of(ctx: &ActionContext, expr: &Expr) -> Option<Position> {
    match ctx.eval(expr) {
        Value::Square(pos) => Some(pos),
        Value::Piece(id) => ctx.board.piece(id).map(|p| p.pos),
        Value::Str(name) => Position::parse(&name),
        _ => None,
    }
}

fn piece_of(ctx: &ActionContext, expr: &Expr) -> Option<PieceId> {
    match ctx.eval(expr) {
        Value::Piece(id) => Some(id),
        Value::Square(pos) => ctx.board.at(pos).map(|p| p.id),
        _ => None,
    }
}

fn color_of(value: &Value) -> Option<Color> {
    match value {
        Value::Str(name) => Color::from_name(name),
        _ => None,
    }
}

/// Traits and initial state for a freshly created or transformed
/// piece: the game definition when present, else the standard
/// built-in defaults.
pub(crate) fn piece_blueprint(
    game: &CompiledGame,
    type_name: &str,
) -> (BTreeSet<String>, BTreeMap<String, Value>) {
    if let Some(def) = game.piece_def(type_name) {
        return (
            def.traits.iter().cloned().collect(),
            def.initial_state.clone(),
        );
    }
    let mut traits = BTreeSet::new();
    match StandardPiece::from_name(type_name) {
        Some(StandardPiece::King) => {
            traits.insert("royal".to_string());
        }
        Some(StandardPiece::Pawn) => {
            traits.insert("promote".to_string());
        }
        _ => {}
    }
    (traits, BTreeMap::new())
}
