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

use super::state::{GameState, Move};
use crate::board::{Board, Color};
use crate::rules::{CompiledGame, EventType};

/// Engine queries handed to the script runtime at startup.
#[derive(Clone, Copy)]
pub struct HostCallbacks {
    pub is_in_check: fn(&Board, Color) -> bool,
    pub is_checkmate: fn(&CompiledGame, &GameState, Color) -> bool,
}

/// An engine event forwarded to the script runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub kind: EventType,
    pub mv: Option<Move>,
    pub player: Color,
}

/// Seam to the embedded script subsystem, which lives outside this
/// core. The engine drives it through this trait only; the no-op
/// implementation runs standard chess unmodified.
pub trait ScriptRuntime {
    fn register_callbacks(&mut self, callbacks: HostCallbacks);
    fn execute_scripts(&mut self, scripts: &[String]);
    fn emit_event(&mut self, event: &ScriptEvent);
    /// A winner the scripts declared, if any.
    fn winner(&self) -> Option<Color>;
    /// When true, the engine only switches sides once the runtime
    /// reports the turn ended.
    fn controls_turn_flow(&self) -> bool;
    fn is_turn_ended(&self) -> bool;
    fn reset_turn_ended(&mut self);
    fn reset(&mut self);
}

#[derive(Debug, Default)]
pub struct NoopScriptRuntime;

impl ScriptRuntime for NoopScriptRuntime {
    fn register_callbacks(&mut self, _callbacks: HostCallbacks) {}
    fn execute_scripts(&mut self, _scripts: &[String]) {}
    fn emit_event(&mut self, _event: &ScriptEvent) {}
    fn winner(&self) -> Option<Color> {
        None
    }
    fn controls_turn_flow(&self) -> bool {
        false
    }
    fn is_turn_ended(&self) -> bool {
        true
    }
    fn reset_turn_ended(&mut self) {}
    fn reset(&mut self) {}
}
