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

//! Condition and expression evaluation.
//!
//! Evaluation is side-effect free and total: unknown identifiers and
//! ill-typed operations produce `Null`/`false` rather than errors. The
//! environment is rebuilt per evaluation from a move context:
//!
//! | identifier | value |
//! |---|---|
//! | `piece` | the acting piece |
//! | `from` / `origin`, `to` / `destination` | the move's squares |
//! | `board` | `{width, height}` |
//! | `White` / `Black` | color name strings |
//! | `checks` | checks the mover has delivered |
//! | `pieces` | the mover's pieces (a list; numeric contexts see its length) |
//! | `opponent.pieces`, `opponent.<Type>` | opposing piece counts |
//! | `captured` | type name of the captured piece, in capture events |
//! | `game.customState.*` | the game's custom state map |
//!
//! Member access on squares yields 1-based `file`/`rank` numbers.

use std::collections::BTreeMap;

use super::movegen;
use crate::board::{Board, Color, Pair, Piece, PieceId, Position};
use crate::rules::{
    BinaryOp, CompareOp, CompiledGame, Condition, Expr, LogicalOp, UnaryOp, Value,
};

pub struct EvalContext<'a> {
    pub game: &'a CompiledGame,
    pub board: &'a Board,
    /// The side the evaluation is for (the acting piece's owner).
    pub mover: Color,
    pub piece: Option<PieceId>,
    pub from: Option<Position>,
    pub to: Option<Position>,
    /// Type name of the piece captured by the surrounding event.
    pub captured: Option<String>,
    pub check_count: Pair<u32>,
    pub custom_state: &'a BTreeMap<String, Value>,
    /// Loop-variable bindings from `for` actions.
    pub vars: BTreeMap<String, Value>,
}

impl<'a> EvalContext<'a> {
    pub fn new(game: &'a CompiledGame, board: &'a Board, mover: Color) -> Self {
        static EMPTY: once_cell::sync::Lazy<BTreeMap<String, Value>> =
            once_cell::sync::Lazy::new(BTreeMap::new);
        let empty: &'static BTreeMap<String, Value> = &EMPTY;
        Self {
            game,
            board,
            mover,
            piece: None,
            from: None,
            to: None,
            captured: None,
            check_count: Pair::new(0, 0),
            custom_state: empty,
            vars: BTreeMap::new(),
        }
    }

    fn piece_ref(&self) -> Option<&Piece> {
        self.board.piece(self.piece?)
    }
}

pub fn eval_condition(ctx: &EvalContext, condition: &Condition) -> bool {
    match condition {
        Condition::Empty => ctx
            .to
            .map(|to| ctx.board.is_empty(to))
            .unwrap_or(false),
        Condition::Enemy => ctx
            .to
            .map(|to| ctx.board.has_enemy(to, ctx.mover))
            .unwrap_or(false),
        Condition::Friend => ctx
            .to
            .map(|to| ctx.board.has_friend(to, ctx.mover))
            .unwrap_or(false),
        Condition::Clear => match (ctx.from, ctx.to) {
            (Some(from), Some(to)) => ctx.board.is_path_clear(from, to),
            _ => false,
        },
        Condition::Check => movegen::is_in_check(ctx.board, ctx.mover),
        Condition::FirstMove => ctx.piece_ref().map(|p| !p.has_moved()).unwrap_or(false),
        Condition::InZone { piece, zone } => in_zone(ctx, piece.as_deref(), zone),
        Condition::OnRank { piece, rank } => {
            locate(ctx, piece.as_deref(), |pos| pos.rank + 1 == *rank)
        }
        Condition::OnFile { piece, file } => {
            locate(ctx, piece.as_deref(), |pos| pos.file + 1 == *file)
        }
        Condition::PieceCaptured { piece } => {
            ctx.board.count_of_type(!ctx.mover, piece) == 0
        }
        Condition::Comparison { lhs, op, rhs } => {
            let lhs = eval_expr(ctx, lhs);
            let rhs = eval_expr(ctx, rhs);
            compare(*op, &lhs, &rhs)
        }
        Condition::Logical { op, lhs, rhs } => match op {
            LogicalOp::And => eval_condition(ctx, lhs) && eval_condition(ctx, rhs),
            LogicalOp::Or => eval_condition(ctx, lhs) || eval_condition(ctx, rhs),
        },
        Condition::Not(inner) => !eval_condition(ctx, inner),
        Condition::Expr(expr) => eval_expr(ctx, expr).truthy(),
        // Custom predicates belong to the script runtime; absent one,
        // they never hold.
        Condition::Custom { .. } => false,
    }
}

/// Zone membership: with a type name, any of the mover's pieces of
/// that type counts; context words (`to`, `from`, `piece`) and the
/// bare form test the move's own squares.
fn in_zone(ctx: &EvalContext, piece: Option<&str>, zone: &str) -> bool {
    match piece {
        None | Some("piece") => context_square(ctx, piece)
            .map(|pos| ctx.board.in_zone(zone, pos))
            .unwrap_or(false),
        Some(name @ ("to" | "destination" | "from" | "origin")) => context_square(ctx, Some(name))
            .map(|pos| ctx.board.in_zone(zone, pos))
            .unwrap_or(false),
        Some(type_name) => ctx
            .board
            .pieces_of(ctx.mover)
            .filter(|p| p.type_name == type_name)
            .any(|p| ctx.board.in_zone(zone, p.pos)),
    }
}

fn locate(ctx: &EvalContext, piece: Option<&str>, pred: impl Fn(Position) -> bool) -> bool {
    match piece {
        None => context_square(ctx, None).map(pred).unwrap_or(false),
        Some(type_name) => ctx
            .board
            .pieces_of(ctx.mover)
            .filter(|p| p.type_name == type_name)
            .any(|p| pred(p.pos)),
    }
}

fn context_square(ctx: &EvalContext, name: Option<&str>) -> Option<Position> {
    match name {
        Some("from" | "origin") => ctx.from,
        Some("piece") => ctx.piece_ref().map(|p| p.pos),
        _ => ctx.to.or_else(|| ctx.piece_ref().map(|p| p.pos)),
    }
}

pub fn eval_expr(ctx: &EvalContext, expr: &Expr) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::SquareRef(pos) => Value::Square(*pos),
        Expr::Identifier(name) => eval_identifier(ctx, name),
        Expr::Member { object, property } => eval_member(ctx, object, property),
        Expr::Index { object, index } => {
            let object = eval_expr(ctx, object);
            let index = eval_expr(ctx, index);
            match (object, index) {
                (Value::List(items), Value::Number(n)) => {
                    items.get(n as usize).cloned().unwrap_or(Value::Null)
                }
                (Value::Map(entries), Value::Str(key)) => {
                    entries.get(&key).cloned().unwrap_or(Value::Null)
                }
                _ => Value::Null,
            }
        }
        // Host function calls are the script runtime's business.
        Expr::Call { .. } => Value::Null,
        Expr::Binary { op, lhs, rhs } => eval_binary(ctx, *op, lhs, rhs),
        Expr::Unary { op, expr } => {
            let value = eval_expr(ctx, expr);
            match op {
                UnaryOp::Neg => match value.as_number() {
                    Some(n) => Value::Number(-n),
                    None => Value::Null,
                },
                UnaryOp::Not => Value::Bool(!value.truthy()),
            }
        }
        Expr::Array(items) => Value::List(items.iter().map(|e| eval_expr(ctx, e)).collect()),
        Expr::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), eval_expr(ctx, value)))
                .collect(),
        ),
    }
}

fn eval_identifier(ctx: &EvalContext, name: &str) -> Value {
    if let Some(value) = ctx.vars.get(name) {
        return value.clone();
    }
    match name {
        "piece" => ctx.piece.map(Value::Piece).unwrap_or(Value::Null),
        "from" | "origin" => ctx.from.map(Value::Square).unwrap_or(Value::Null),
        "to" | "destination" => ctx.to.map(Value::Square).unwrap_or(Value::Null),
        "board" => Value::Map(BTreeMap::from([
            ("width".to_string(), Value::Number(ctx.board.width() as f64)),
            (
                "height".to_string(),
                Value::Number(ctx.board.height() as f64),
            ),
        ])),
        "White" => Value::Str("White".to_string()),
        "Black" => Value::Str("Black".to_string()),
        // Checks the mover has delivered to the opponent.
        "checks" => Value::Number(ctx.check_count[!ctx.mover] as f64),
        "pieces" => Value::List(
            ctx.board
                .pieces_of(ctx.mover)
                .map(|p| Value::Piece(p.id))
                .collect(),
        ),
        "captured" => ctx
            .captured
            .clone()
            .map(Value::Str)
            .unwrap_or(Value::Null),
        _ => ctx
            .custom_state
            .get(name)
            .cloned()
            .unwrap_or(Value::Null),
    }
}

fn eval_member(ctx: &EvalContext, object: &Expr, property: &str) -> Value {
    // `opponent.*` and `game.customState.*` never materialize their
    // object; they are resolved as whole paths.
    if let Expr::Identifier(name) = object {
        match name.as_str() {
            "opponent" => {
                return match property {
                    "pieces" => {
                        Value::Number(ctx.board.pieces_of(!ctx.mover).count() as f64)
                    }
                    type_name => {
                        Value::Number(ctx.board.count_of_type(!ctx.mover, type_name) as f64)
                    }
                };
            }
            "game" => {
                return match property {
                    "customState" => Value::Map(ctx.custom_state.clone()),
                    key => ctx.custom_state.get(key).cloned().unwrap_or(Value::Null),
                };
            }
            _ => {}
        }
    }
    let object = eval_expr(ctx, object);
    match object {
        Value::Piece(id) => match ctx.board.piece(id) {
            Some(piece) => piece_property(piece, property),
            None => Value::Null,
        },
        Value::Square(pos) => square_property(pos, property),
        Value::Map(entries) => entries.get(property).cloned().unwrap_or(Value::Null),
        Value::List(items) => match property {
            "length" => Value::Number(items.len() as f64),
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

fn piece_property(piece: &Piece, property: &str) -> Value {
    match property {
        "type" => Value::Str(piece.type_name.clone()),
        "owner" => Value::Str(piece.owner.to_string()),
        "pos" | "position" => Value::Square(piece.pos),
        "file" => Value::Number(piece.pos.file as f64 + 1.0),
        "rank" => Value::Number(piece.pos.rank as f64 + 1.0),
        "state" => Value::Map(piece.state.clone()),
        "id" => Value::Number(piece.id.0 as f64),
        _ => Value::Null,
    }
}

fn square_property(pos: Position, property: &str) -> Value {
    match property {
        "file" => Value::Number(pos.file as f64 + 1.0),
        "rank" => Value::Number(pos.rank as f64 + 1.0),
        "name" => Value::Str(pos.to_string()),
        _ => Value::Null,
    }
}

fn eval_binary(ctx: &EvalContext, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Value {
    // Short-circuit logic first.
    match op {
        BinaryOp::And => {
            let lhs = eval_expr(ctx, lhs);
            if !lhs.truthy() {
                return Value::Bool(false);
            }
            return Value::Bool(eval_expr(ctx, rhs).truthy());
        }
        BinaryOp::Or => {
            let lhs = eval_expr(ctx, lhs);
            if lhs.truthy() {
                return Value::Bool(true);
            }
            return Value::Bool(eval_expr(ctx, rhs).truthy());
        }
        _ => {}
    }
    let lhs = eval_expr(ctx, lhs);
    let rhs = eval_expr(ctx, rhs);
    match op {
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Str(a), b) => Value::Str(format!("{}{}", a, b)),
            (a, Value::Str(b)) => Value::Str(format!("{}{}", a, b)),
            _ => numeric(op, &lhs, &rhs),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => numeric(op, &lhs, &rhs),
        BinaryOp::Eq | BinaryOp::StrictEq => Value::Bool(eq_values(&lhs, &rhs)),
        BinaryOp::Ne | BinaryOp::StrictNe => Value::Bool(!eq_values(&lhs, &rhs)),
        BinaryOp::Lt => Value::Bool(compare(CompareOp::Lt, &lhs, &rhs)),
        BinaryOp::Le => Value::Bool(compare(CompareOp::Le, &lhs, &rhs)),
        BinaryOp::Gt => Value::Bool(compare(CompareOp::Gt, &lhs, &rhs)),
        BinaryOp::Ge => Value::Bool(compare(CompareOp::Ge, &lhs, &rhs)),
        BinaryOp::In => Value::Bool(compare(CompareOp::In, &lhs, &rhs)),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn numeric(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    let (a, b) = match (to_number(lhs), to_number(rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Value::Null,
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Value::Null;
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Value::Null;
            }
            a % b
        }
        _ => return Value::Null,
    };
    Value::Number(result)
}

/// Numeric coercion: lists count as their length so `pieces >= 3`
/// reads naturally.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::List(items) => Some(items.len() as f64),
        other => other.as_number(),
    }
}

fn eq_values(lhs: &Value, rhs: &Value) -> bool {
    if lhs.loose_eq(rhs) {
        return true;
    }
    match (to_number(lhs), to_number(rhs)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub(crate) fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    match op {
        CompareOp::Eq | CompareOp::StrictEq => eq_values(lhs, rhs),
        CompareOp::Ne | CompareOp::StrictNe => !eq_values(lhs, rhs),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let (a, b) = match (to_number(lhs), to_number(rhs)) {
                (Some(a), Some(b)) => (a, b),
                _ => return false,
            };
            match op {
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
                _ => unreachable!(),
            }
        }
        CompareOp::In => match rhs {
            Value::List(items) => items.iter().any(|item| eq_values(lhs, item)),
            Value::Map(entries) => lhs
                .as_str()
                .map(|key| entries.contains_key(key))
                .unwrap_or(false),
            Value::Str(haystack) => lhs
                .as_str()
                .map(|needle| haystack.contains(needle))
                .unwrap_or(false),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang;
    use std::collections::{BTreeMap, BTreeSet};

    fn empty_game() -> CompiledGame {
        lang::compile("game: \"Eval\"\n").unwrap()
    }

    fn board_with(pieces: &[(&str, Color, &str)]) -> Board {
        let mut board = Board::new(8, 8);
        for (type_name, owner, square) in pieces {
            board.spawn(
                type_name,
                *owner,
                Position::parse(square).unwrap(),
                BTreeSet::new(),
                BTreeMap::new(),
            );
        }
        board
    }

    #[test]
    fn test_destination_conditions() {
        let game = empty_game();
        let board = board_with(&[("Pawn", Color::White, "e2"), ("Pawn", Color::Black, "d3")]);
        let mut ctx = EvalContext::new(&game, &board, Color::White);
        ctx.to = Position::parse("d3");
        assert!(eval_condition(&ctx, &Condition::Enemy));
        assert!(!eval_condition(&ctx, &Condition::Friend));
        ctx.to = Position::parse("e4");
        assert!(eval_condition(&ctx, &Condition::Empty));
    }

    #[test]
    fn test_comparison_with_member_access() {
        let game = empty_game();
        let mut board = board_with(&[("Knight", Color::White, "c3")]);
        let id = board.at(Position::parse("c3").unwrap()).unwrap().id;
        board
            .piece_mut(id)
            .unwrap()
            .state
            .insert("charges".to_string(), Value::Number(2.0));
        let mut ctx = EvalContext::new(&game, &board, Color::White);
        ctx.piece = Some(id);
        let condition = Condition::Comparison {
            lhs: Expr::Member {
                object: Box::new(Expr::Member {
                    object: Box::new(Expr::ident("piece")),
                    property: "state".to_string(),
                }),
                property: "charges".to_string(),
            },
            op: CompareOp::Ge,
            rhs: Expr::number(2.0),
        };
        assert!(eval_condition(&ctx, &condition));
    }

    #[test]
    fn test_opponent_counts() {
        let game = empty_game();
        let board = board_with(&[
            ("Queen", Color::Black, "d8"),
            ("Pawn", Color::Black, "a7"),
            ("King", Color::White, "e1"),
        ]);
        let ctx = EvalContext::new(&game, &board, Color::White);
        let count = eval_expr(
            &ctx,
            &Expr::Member {
                object: Box::new(Expr::ident("opponent")),
                property: "Queen".to_string(),
            },
        );
        assert_eq!(count, Value::Number(1.0));
        let total = eval_expr(
            &ctx,
            &Expr::Member {
                object: Box::new(Expr::ident("opponent")),
                property: "pieces".to_string(),
            },
        );
        assert_eq!(total, Value::Number(2.0));
    }

    #[test]
    fn test_piece_captured_condition() {
        let game = empty_game();
        let board = board_with(&[("King", Color::Black, "e8"), ("King", Color::White, "e1")]);
        let ctx = EvalContext::new(&game, &board, Color::White);
        assert!(eval_condition(
            &ctx,
            &Condition::PieceCaptured {
                piece: "Queen".to_string()
            }
        ));
        assert!(!eval_condition(
            &ctx,
            &Condition::PieceCaptured {
                piece: "King".to_string()
            }
        ));
    }

    #[test]
    fn test_in_zone_by_type() {
        let game = empty_game();
        let mut board = board_with(&[("King", Color::White, "d4")]);
        board.set_zone(
            "hill",
            [Position::parse("d4").unwrap()].into_iter().collect(),
        );
        let ctx = EvalContext::new(&game, &board, Color::White);
        assert!(eval_condition(
            &ctx,
            &Condition::InZone {
                piece: Some("King".to_string()),
                zone: "hill".to_string()
            }
        ));
        assert!(!eval_condition(
            &ctx,
            &Condition::InZone {
                piece: Some("Queen".to_string()),
                zone: "hill".to_string()
            }
        ));
    }

    #[test]
    fn test_pieces_list_coerces_to_count() {
        let game = empty_game();
        let board = board_with(&[
            ("Pawn", Color::White, "a2"),
            ("Pawn", Color::White, "b2"),
            ("King", Color::Black, "e8"),
        ]);
        let ctx = EvalContext::new(&game, &board, Color::White);
        let condition = Condition::Comparison {
            lhs: Expr::ident("pieces"),
            op: CompareOp::Eq,
            rhs: Expr::number(2.0),
        };
        assert!(eval_condition(&ctx, &condition));
    }

    #[test]
    fn test_arithmetic_and_null_propagation() {
        let game = empty_game();
        let board = Board::new(8, 8);
        let ctx = EvalContext::new(&game, &board, Color::White);
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::number(2.0)),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::number(3.0)),
                rhs: Box::new(Expr::number(4.0)),
            }),
        };
        assert_eq!(eval_expr(&ctx, &expr), Value::Number(14.0));
        let bad = Expr::Binary {
            op: BinaryOp::Div,
            lhs: Box::new(Expr::number(1.0)),
            rhs: Box::new(Expr::number(0.0)),
        };
        assert_eq!(eval_expr(&ctx, &bad), Value::Null);
        assert_eq!(eval_expr(&ctx, &Expr::ident("no_such_name")), Value::Null);
    }

    #[test]
    fn test_membership() {
        assert!(compare(
            CompareOp::In,
            &Value::Number(2.0),
            &Value::List(vec![Value::Number(1.0), Value::Number(2.0)])
        ));
        assert!(!compare(CompareOp::In, &Value::Number(5.0), &Value::List(vec![])));
    }
}
