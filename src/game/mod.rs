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

use crate::board::Color;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum GameResult {
    Win(Color, WinReason),
    Draw(DrawReason),
}

impl GameResult {
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameResult::Win(color, _) => Some(*color),
            GameResult::Draw(_) => None,
        }
    }

    /// The name the result is reported under: the custom condition
    /// name when one ended the game, a fixed name otherwise.
    pub fn reason(&self) -> &str {
        match self {
            GameResult::Win(_, WinReason::Checkmate) => "checkmate",
            GameResult::Win(_, WinReason::Script) => "script",
            GameResult::Win(_, WinReason::Custom(name)) => name,
            GameResult::Draw(DrawReason::Stalemate) => "stalemate",
            GameResult::Draw(DrawReason::Repetition) => "threefold_repetition",
            GameResult::Draw(DrawReason::FiftyMoves) => "fifty_move_rule",
            GameResult::Draw(DrawReason::Custom(name)) => name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum WinReason {
    Checkmate,
    /// Declared by the embedded script runtime.
    Script,
    /// A named victory condition from the game definition.
    Custom(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum DrawReason {
    Stalemate,
    Repetition,
    FiftyMoves,
    /// A named draw condition from the game definition.
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner() {
        let result = GameResult::Win(Color::White, WinReason::Checkmate);
        assert_eq!(result.winner(), Some(Color::White));
        assert_eq!(GameResult::Draw(DrawReason::Stalemate).winner(), None);
    }

    #[test]
    fn test_custom_reason_name() {
        let result = GameResult::Win(Color::White, WinReason::Custom("hill".to_string()));
        assert_eq!(result.reason(), "hill");
    }
}
