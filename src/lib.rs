// Copyright 2023 Tobin Edwards
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

//! A domain-specific language for chess variants and the engine that
//! plays them.
//!
//! Source programs declare boards, pieces with movement patterns,
//! square effects, event triggers and victory conditions. The
//! [`lang`] toolchain compiles them into an immutable
//! [`CompiledGame`](rules::CompiledGame); an [`Engine`](engine::Engine)
//! then maintains board state, generates legal moves (castling, en
//! passant, promotion, cooldowns and custom patterns included),
//! dispatches triggers, detects check, checkmate, stalemate and
//! custom endings, and supports undo.
//!
//! ```no_run
//! use chesslang::{engine::Engine, lang};
//!
//! let game = lang::compile("game: \"Standard\"\n").unwrap();
//! let mut engine = Engine::new(game);
//! let outcome = engine.make_move_coords("e2e4");
//! assert!(outcome.success);
//! ```

pub mod board;
pub mod engine;
pub mod game;
pub mod lang;
pub mod notation;
pub mod rules;

pub use engine::Engine;
pub use game::{DrawReason, GameResult, WinReason};
pub use lang::{compile, CompileError};
pub use rules::CompiledGame;
