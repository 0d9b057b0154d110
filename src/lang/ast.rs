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

//! The abstract syntax tree.
//!
//! Section nodes keep what the compiler still has to resolve (square
//! names, zone lists, merge actions) as written, while pattern,
//! condition, expression and action syntax lowers directly to the
//! [`crate::rules`] sum types during parsing. Every node carries the
//! source [`Location`] of its head token.

use serde::{Deserialize, Serialize};

use super::token::Location;
use crate::board::Color;
use crate::rules::{
    Action, BlockKind, CaptureRule, Condition, EventType, MergeAction, Pattern, Value,
};

/// One parsed program: optional header, optional sections, any number
/// of top-level definitions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GameNode {
    pub name: Option<String>,
    pub extends: Option<String>,
    pub board: Option<BoardNode>,
    pub pieces: Vec<PieceNode>,
    pub effects: Vec<EffectNode>,
    pub triggers: Vec<TriggerNode>,
    pub patterns: Vec<PatternDefNode>,
    pub setup: Option<SetupNode>,
    pub victory: Vec<EndConditionNode>,
    pub draw: Vec<EndConditionNode>,
    pub rules: Vec<RuleEntryNode>,
    pub scripts: Vec<ScriptNode>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BoardNode {
    pub width: u16,
    pub height: u16,
    pub zones: Vec<ZoneNode>,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ZoneNode {
    pub name: String,
    pub squares: Vec<(String, Location)>,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PieceNode {
    pub name: String,
    pub moves: Option<Pattern>,
    pub capture: Option<CaptureRule>,
    pub traits: Vec<String>,
    pub state: Vec<(String, Value)>,
    pub triggers: Vec<TriggerNode>,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EffectNode {
    pub name: String,
    pub blocks: Option<BlockKind>,
    pub visual: Option<String>,
    pub description: Option<String>,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TriggerNode {
    pub name: String,
    pub on: EventType,
    pub when: Option<Condition>,
    pub actions: Vec<Action>,
    pub optional: bool,
    pub description: Option<String>,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PatternDefNode {
    pub name: String,
    pub pattern: Pattern,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SetupNode {
    pub placements: Vec<PlacementNode>,
    pub replace: Vec<ReplaceNode>,
    pub additive: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlacementNode {
    pub square: String,
    pub piece: String,
    pub owner: Color,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReplaceNode {
    pub old: String,
    pub new: String,
    pub loc: Location,
}

/// A victory/draw entry. `condition` is absent only for `Remove`
/// entries, which strip an inherited condition by name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EndConditionNode {
    pub name: String,
    pub condition: Option<Condition>,
    pub merge: MergeAction,
    pub loc: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RuleEntryNode {
    pub key: String,
    pub value: Value,
    pub loc: Location,
}

/// A script block, captured verbatim for an external runtime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScriptNode {
    pub code: String,
    pub loc: Location,
}
