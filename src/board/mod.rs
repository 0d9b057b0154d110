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

//! Board geometry and state for variant chess.
//!
//! Unlike a fixed 8x8 board, a variant board is any `width x height`
//! rectangle up to 26 files and 99 ranks. The key abstractions:
//!
//! * A [`Position`] is a zero-based `(file, rank)` pair printed in
//!   algebraic notation (`e4`). [`Offset`], [`Compass`] and
//!   [`Direction`] describe movement deltas; `Direction` additionally
//!   covers the compound forms (`orthogonal`, `any`, ...) and the
//!   owner-relative `forward`/`backward`.
//!
//! * A [`Piece`] has an open-ended type name, owner, trait set and
//!   state map. Pieces are owned by the [`Board`] in a single map
//!   keyed by stable [`PieceId`]s; squares reference pieces by id and
//!   all mutation goes through board methods so grid and piece
//!   positions never diverge.
//!
//! * [`Effect`]s are square markers with optional blocking semantics;
//!   zones are named square sets used by conditions and victory rules.
//!
//! * The [`fen`] module reads and writes placement-only FEN for the
//!   standard pieces and derives repetition keys that also cover
//!   custom piece types.

pub mod fen;
mod grid;
mod piece;
mod square;

pub use grid::*;
pub use piece::*;
pub use square::*;
