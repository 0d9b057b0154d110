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

use super::expr::Expr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

/// A predicate gating a move, trigger or end-of-game rule. Evaluation
/// is side-effect free; see the engine's evaluator for the semantics
/// of each variant against a move context.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Condition {
    /// The destination square is empty.
    Empty,
    /// The destination holds an enemy piece.
    Enemy,
    /// The destination holds a friendly piece.
    Friend,
    /// The path from origin to destination is clear.
    Clear,
    /// The mover's side is in check.
    Check,
    /// The piece has not moved yet.
    FirstMove,
    InZone {
        piece: Option<String>,
        zone: String,
    },
    OnRank {
        piece: Option<String>,
        rank: u8,
    },
    OnFile {
        piece: Option<String>,
        file: u8,
    },
    /// The opponent has no pieces of the named type left.
    PieceCaptured {
        piece: String,
    },
    Comparison {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Condition>,
        rhs: Box<Condition>,
    },
    Not(Box<Condition>),
    /// An arbitrary expression used as a truthiness test.
    Expr(Expr),
    Custom {
        name: String,
        args: Vec<Expr>,
    },
}
