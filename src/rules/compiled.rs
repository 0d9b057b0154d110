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
use std::collections::{BTreeMap, BTreeSet};

use super::definition::{
    EffectDefinition, EndCondition, GameRules, PieceDefinition, Setup, TraitTable,
    TriggerDefinition,
};
use super::pattern::Pattern;
use crate::board::Position;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BoardConfig {
    pub width: u8,
    pub height: u8,
    pub zones: BTreeMap<String, BTreeSet<Position>>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            zones: BTreeMap::new(),
        }
    }
}

/// A fully resolved game description, immutable once compiled. The
/// engine executes against this and nothing else.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompiledGame {
    pub name: String,
    pub extends: Option<String>,
    pub board: BoardConfig,
    pub pieces: Vec<PieceDefinition>,
    pub effects: Vec<EffectDefinition>,
    pub triggers: Vec<TriggerDefinition>,
    pub traits: TraitTable,
    pub patterns: BTreeMap<String, Pattern>,
    pub setup: Setup,
    pub victory: Vec<EndCondition>,
    pub draw: Vec<EndCondition>,
    pub rules: GameRules,
    pub scripts: Vec<String>,
}

impl CompiledGame {
    pub fn piece_def(&self, name: &str) -> Option<&PieceDefinition> {
        self.pieces.iter().find(|def| def.name == name)
    }

    pub fn effect_def(&self, name: &str) -> Option<&EffectDefinition> {
        self.effects.iter().find(|def| def.name == name)
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }
}
