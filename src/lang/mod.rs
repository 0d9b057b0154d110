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

//! The language toolchain: source text to [`CompiledGame`].
//!
//! The pipeline is three pure stages, each failing fast with a located
//! error:
//!
//! ```text
//! source --lexer--> tokens --parser--> GameNode --compiler--> CompiledGame
//! ```
//!
//! The lexer is indentation-aware (synthesizing `Indent`/`Dedent`
//! tokens the way Python's does), the parser is hand-written recursive
//! descent, and the compiler resolves names, squares and inheritance
//! into an executable description. [`compile`] runs all three.

pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod token;

use thiserror::Error;

pub use compiler::CompilerError;
pub use lexer::LexerError;
pub use parser::ParserError;
pub use token::Location;

use crate::rules::CompiledGame;

/// Any front-end failure, tagged by stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Compiler(#[from] CompilerError),
}

/// Compile a source string end to end.
pub fn compile(source: &str) -> Result<CompiledGame, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let ast = parser::parse(tokens)?;
    Ok(compiler::compile(&ast)?)
}

/// Compile a source string on top of an already-compiled base game.
pub fn compile_on(source: &str, base: &CompiledGame) -> Result<CompiledGame, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let ast = parser::parse(tokens)?;
    Ok(compiler::compile_with_base(&ast, Some(base))?)
}
