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
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use super::action::Action;
use super::condition::Condition;
use super::expr::Value;
use super::pattern::{CaptureRule, Pattern};
use crate::board::{Color, Position};

/// The game events a trigger can bind to.
#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    Move,
    Capture,
    Captured,
    TurnStart,
    TurnEnd,
    Check,
    EnterZone,
    ExitZone,
    GameStart,
    GameEnd,
}

impl EventType {
    pub fn from_name(name: &str) -> Option<Self> {
        EventType::iter().find(|event| event.to_string() == name)
    }
}

/// An event-driven rule. Optional triggers are queued for the host to
/// confirm instead of running immediately.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TriggerDefinition {
    pub name: String,
    pub on: EventType,
    pub when: Option<Condition>,
    pub actions: Vec<Action>,
    pub optional: bool,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PieceDefinition {
    pub name: String,
    /// Absent means the engine's default pattern for the type name
    /// (standard pieces have one; other types then generate nothing).
    pub moves: Option<Pattern>,
    pub capture: CaptureRule,
    pub traits: Vec<String>,
    pub initial_state: BTreeMap<String, Value>,
    pub triggers: Vec<TriggerDefinition>,
}

/// Which pieces a square effect keeps out.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
    #[default]
    None,
    Enemy,
    Friend,
    All,
}

impl BlockKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(BlockKind::None),
            "enemy" => Some(BlockKind::Enemy),
            "friend" => Some(BlockKind::Friend),
            "all" => Some(BlockKind::All),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EffectDefinition {
    pub name: String,
    pub blocks: BlockKind,
    pub visual: Option<String>,
    pub description: Option<String>,
}

/// Traits with engine-enforced semantics. All other trait names are
/// carried opaquely.
#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BuiltinTrait {
    /// The target of check and checkmate.
    Royal,
    /// Slides pass through pieces; steps and leaps land on enemies
    /// without capturing. Phase movement never captures.
    Phase,
    /// Leaps ignore blockers (implicit for every leap).
    Jump,
    /// Eligible for promotion on the far rank.
    Promote,
    /// Cannot be captured.
    Immune,
    /// Capturing with this piece removes everything adjacent to the
    /// destination.
    Explosive,
}

impl BuiltinTrait {
    pub fn from_name(name: &str) -> Option<Self> {
        BuiltinTrait::iter().find(|t| t.to_string() == name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TraitDefinition {
    pub name: String,
    pub builtin: Option<BuiltinTrait>,
}

pub type TraitTable = BTreeMap<String, TraitDefinition>;

/// Seed a trait table with the built-ins.
pub fn builtin_traits() -> TraitTable {
    BuiltinTrait::iter()
        .map(|t| {
            let name = t.to_string();
            (
                name.clone(),
                TraitDefinition {
                    name,
                    builtin: Some(t),
                },
            )
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Placement {
    pub pos: Position,
    pub piece: String,
    pub owner: Color,
}

/// The starting material. With no placements, or with `additive` set,
/// the standard chess position is laid down first.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Setup {
    pub placements: Vec<Placement>,
    pub replace: BTreeMap<String, String>,
    pub additive: bool,
}

/// Feature switches, defaulted on and overlaid by the `rules` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameRules {
    pub check_detection: bool,
    pub castling: bool,
    pub en_passant: bool,
    pub promotion: bool,
    pub fifty_move_rule: bool,
    pub threefold_repetition: bool,
    pub custom: BTreeMap<String, Value>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            check_detection: true,
            castling: true,
            en_passant: true,
            promotion: true,
            fifty_move_rule: true,
            threefold_repetition: true,
            custom: BTreeMap::new(),
        }
    }
}

impl GameRules {
    /// Overlay one user setting by its source-level key. Unknown keys
    /// are preserved in `custom`.
    pub fn apply(&mut self, key: &str, value: Value) {
        let flag = value.truthy();
        match key {
            "checkDetection" => self.check_detection = flag,
            "castling" => self.castling = flag,
            "enPassant" => self.en_passant = flag,
            "promotion" => self.promotion = flag,
            "fiftyMoveRule" => self.fifty_move_rule = flag,
            "threefoldRepetition" => self.threefold_repetition = flag,
            _ => {
                self.custom.insert(key.to_string(), value);
            }
        }
    }
}

/// How a victory or draw entry combines with an inherited list.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeAction {
    #[default]
    Add,
    Replace,
    Remove,
}

/// A named end-of-game rule. Multiple conditions combine with OR: the
/// game ends as soon as any of them holds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EndCondition {
    pub name: String,
    pub condition: Condition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::TurnStart.to_string(), "turn_start");
        assert_eq!(EventType::from_name("enter_zone"), Some(EventType::EnterZone));
        assert_eq!(EventType::from_name("bogus"), None);
    }

    #[test]
    fn test_builtin_trait_table() {
        let table = builtin_traits();
        assert_eq!(table.len(), 6);
        assert_eq!(table["royal"].builtin, Some(BuiltinTrait::Royal));
        assert_eq!(table["explosive"].builtin, Some(BuiltinTrait::Explosive));
    }

    #[test]
    fn test_rules_overlay() {
        let mut rules = GameRules::default();
        assert!(rules.castling);
        rules.apply("castling", Value::Bool(false));
        rules.apply("gravity", Value::Bool(true));
        assert!(!rules.castling);
        assert!(rules.check_detection);
        assert_eq!(rules.custom["gravity"], Value::Bool(true));
    }
}
