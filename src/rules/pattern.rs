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
use crate::board::Direction;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternOp {
    /// Union of the child move sets.
    Or,
    /// Sequential composition. Only the first child contributes moves;
    /// the remaining children are carried but not yet expanded.
    Then,
}

/// A movement rule, reduced to four primitives plus combinators.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Pattern {
    /// A single jump of `dist` times the direction vector.
    Step { dir: Direction, dist: u16 },
    /// Repeated unit steps until blocked or off the board.
    Slide { dir: Direction },
    /// A fixed-shape jump, expanded to all sign/swap symmetries.
    Leap { dx: u8, dy: u8 },
    /// Slide to the first piece, then land exactly one square beyond.
    Hop { dir: Direction },
    Composite { op: PatternOp, parts: Vec<Pattern> },
    Conditional {
        pattern: Box<Pattern>,
        condition: Box<Condition>,
    },
    /// A named pattern resolved at compile time when possible, else at
    /// move generation time.
    Reference(String),
}

impl Pattern {
    /// Substitute every `Reference` found in `table`, leaving unknown
    /// names in place for late binding.
    pub fn resolve<'a, F>(&self, lookup: &F) -> Pattern
    where
        F: Fn(&str) -> Option<&'a Pattern>,
    {
        match self {
            Pattern::Reference(name) => match lookup(name) {
                Some(resolved) => resolved.clone(),
                None => self.clone(),
            },
            Pattern::Composite { op, parts } => Pattern::Composite {
                op: *op,
                parts: parts.iter().map(|p| p.resolve(lookup)).collect(),
            },
            Pattern::Conditional { pattern, condition } => Pattern::Conditional {
                pattern: Box::new(pattern.resolve(lookup)),
                condition: condition.clone(),
            },
            other => other.clone(),
        }
    }
}

/// How a piece captures: with a dedicated pattern, with its move
/// pattern (`same`), or not at all (`none`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub enum CaptureRule {
    Pattern(Pattern),
    #[default]
    Same,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_resolve_replaces_known_references() {
        let mut table = BTreeMap::new();
        table.insert(
            "lance".to_string(),
            Pattern::Slide {
                dir: Direction::Forward,
            },
        );
        let pattern = Pattern::Composite {
            op: PatternOp::Or,
            parts: vec![
                Pattern::Reference("lance".to_string()),
                Pattern::Reference("unknown".to_string()),
            ],
        };
        let resolved = pattern.resolve(&|name| table.get(name));
        match resolved {
            Pattern::Composite { parts, .. } => {
                assert_eq!(
                    parts[0],
                    Pattern::Slide {
                        dir: Direction::Forward
                    }
                );
                assert_eq!(parts[1], Pattern::Reference("unknown".to_string()));
            }
            other => panic!("unexpected pattern: {:?}", other),
        }
    }
}
