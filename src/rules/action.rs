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

use super::condition::Condition;
use super::expr::Expr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    Assign,
    Add,
    Sub,
}

/// A Chebyshev disc for area removals: every piece within `radius` of
/// the evaluated center.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RemoveRange {
    pub radius: u16,
    pub from: Expr,
}

/// Piece-type filters applied to an area removal. An empty `include`
/// list means all types.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RemoveFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// One trigger side effect. Unknown `Custom` actions are ignored by
/// the engine for forward compatibility.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Action {
    Set {
        target: Expr,
        op: SetOp,
        value: Expr,
    },
    Create {
        piece: String,
        pos: Expr,
        owner: Option<Expr>,
    },
    Remove {
        target: Option<Expr>,
        range: Option<RemoveRange>,
        filter: Option<RemoveFilter>,
    },
    Transform {
        target: Expr,
        into: String,
    },
    Mark {
        pos: Expr,
        effect: String,
    },
    MovePiece {
        target: Expr,
        to: Expr,
    },
    Win(Expr),
    Lose(Expr),
    Draw {
        reason: Option<String>,
    },
    /// Abort the surrounding event; a cancelled capture leaves the
    /// board untouched and the move reported as failed.
    Cancel,
    Apply {
        effect: String,
        target: Expr,
    },
    ForEach {
        var: String,
        iterable: Expr,
        actions: Vec<Action>,
    },
    If {
        condition: Condition,
        then_actions: Vec<Action>,
        else_actions: Vec<Action>,
    },
    Custom {
        name: String,
        args: Vec<Expr>,
    },
}
