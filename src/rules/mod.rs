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

//! The compiled rule model.
//!
//! Everything the parser and compiler produce is expressed with the
//! sum types in this module: movement [`Pattern`]s, gating
//! [`Condition`]s, [`Expr`]essions, trigger [`Action`]s, and the
//! definition records they hang off. A [`CompiledGame`] bundles the
//! lot into the immutable description the engine executes.

mod action;
mod compiled;
mod condition;
mod definition;
mod expr;
mod pattern;

pub use action::*;
pub use compiled::*;
pub use condition::*;
pub use definition::*;
pub use expr::*;
pub use pattern::*;
