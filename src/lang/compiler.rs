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

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::ast::*;
use super::token::Location;
use crate::board::{Position, StandardPiece, MAX_FILES, MAX_RANKS};
use crate::rules::{
    builtin_traits, BoardConfig, CaptureRule, CompiledGame, EffectDefinition, EndCondition,
    MergeAction, Pattern, PieceDefinition, Placement, Setup, TraitDefinition, TriggerDefinition,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("{loc}: board size {width}x{height} is out of range (max {max_w}x{max_h})")]
    BadBoardSize {
        width: u16,
        height: u16,
        max_w: u8,
        max_h: u8,
        loc: Location,
    },
    #[error("{loc}: malformed square '{square}' in {context}")]
    BadSquare {
        square: String,
        context: String,
        loc: Location,
    },
    #[error("{loc}: square '{square}' is outside the {width}x{height} board")]
    SquareOutOfBounds {
        square: String,
        width: u8,
        height: u8,
        loc: Location,
    },
    #[error("{loc}: unknown piece type '{name}' in {context}")]
    UnknownPiece {
        name: String,
        context: String,
        loc: Location,
    },
    #[error("{loc}: victory/draw entry '{name}' needs a condition")]
    MissingCondition { name: String, loc: Location },
}

/// Lower a parsed [`GameNode`] into a [`CompiledGame`].
pub fn compile(ast: &GameNode) -> Result<CompiledGame, CompilerError> {
    compile_with_base(ast, None)
}

/// Lower a game on top of an already-compiled base (the `extends`
/// target, resolved by the host). Pieces override by name; victory
/// and draw lists merge by each entry's action; setup placements
/// layer when additive.
pub fn compile_with_base(
    ast: &GameNode,
    base: Option<&CompiledGame>,
) -> Result<CompiledGame, CompilerError> {
    let board = compile_board(ast, base)?;
    let patterns = compile_patterns(ast, base);
    let pieces = compile_pieces(ast, base, &patterns);
    let effects = compile_effects(ast, base);
    let triggers = compile_triggers(ast, base);
    let traits = compile_traits(&pieces);
    let setup = compile_setup(ast, base, &board, &pieces)?;
    let victory = merge_end_conditions(
        base.map(|b| b.victory.clone()).unwrap_or_default(),
        &ast.victory,
    )?;
    let draw = merge_end_conditions(
        base.map(|b| b.draw.clone()).unwrap_or_default(),
        &ast.draw,
    )?;
    let mut rules = base.map(|b| b.rules.clone()).unwrap_or_default();
    for entry in &ast.rules {
        rules.apply(&entry.key, entry.value.clone());
    }
    let mut scripts = base.map(|b| b.scripts.clone()).unwrap_or_default();
    scripts.extend(ast.scripts.iter().map(|s| s.code.clone()));

    let name = ast
        .name
        .clone()
        .or_else(|| base.map(|b| b.name.clone()))
        .unwrap_or_else(|| "Untitled".to_string());

    Ok(CompiledGame {
        name,
        extends: ast.extends.clone(),
        board,
        pieces,
        effects,
        triggers,
        traits,
        patterns,
        setup,
        victory,
        draw,
        rules,
        scripts,
    })
}

fn compile_board(
    ast: &GameNode,
    base: Option<&CompiledGame>,
) -> Result<BoardConfig, CompilerError> {
    let mut config = match (&ast.board, base) {
        (None, Some(base)) => return Ok(base.board.clone()),
        (None, None) => return Ok(BoardConfig::default()),
        (Some(_), _) => BoardConfig::default(),
    };
    let node = ast.board.as_ref().unwrap();
    if node.width == 0
        || node.height == 0
        || node.width > MAX_FILES as u16
        || node.height > MAX_RANKS as u16
    {
        return Err(CompilerError::BadBoardSize {
            width: node.width,
            height: node.height,
            max_w: MAX_FILES,
            max_h: MAX_RANKS,
            loc: node.loc,
        });
    }
    config.width = node.width as u8;
    config.height = node.height as u8;
    for zone in &node.zones {
        let mut squares = BTreeSet::new();
        for (text, loc) in &zone.squares {
            let pos = parse_square(text, &format!("zone '{}'", zone.name), *loc)?;
            check_bounds(pos, text, config.width, config.height, *loc)?;
            squares.insert(pos);
        }
        config.zones.insert(zone.name.clone(), squares);
    }
    Ok(config)
}

/// The pattern pre-pass: collect every named pattern, then resolve
/// references between them. Unknown names stay as references for late
/// binding at move generation.
fn compile_patterns(ast: &GameNode, base: Option<&CompiledGame>) -> BTreeMap<String, Pattern> {
    let mut table: BTreeMap<String, Pattern> =
        base.map(|b| b.patterns.clone()).unwrap_or_default();
    for def in &ast.patterns {
        table.insert(def.name.clone(), def.pattern.clone());
    }
    let snapshot = table.clone();
    for pattern in table.values_mut() {
        *pattern = pattern.resolve(&|name| snapshot.get(name));
    }
    table
}

fn compile_pieces(
    ast: &GameNode,
    base: Option<&CompiledGame>,
    patterns: &BTreeMap<String, Pattern>,
) -> Vec<PieceDefinition> {
    let mut pieces: Vec<PieceDefinition> = base.map(|b| b.pieces.clone()).unwrap_or_default();
    for node in &ast.pieces {
        let moves = node
            .moves
            .clone()
            .map(|p| p.resolve(&|name| patterns.get(name)));
        let capture = match node.capture.clone() {
            Some(CaptureRule::Pattern(p)) => {
                CaptureRule::Pattern(p.resolve(&|name| patterns.get(name)))
            }
            Some(other) => other,
            None => CaptureRule::Same,
        };
        let def = PieceDefinition {
            name: node.name.clone(),
            moves,
            capture,
            traits: node.traits.clone(),
            initial_state: node.state.iter().cloned().collect(),
            triggers: node.triggers.iter().map(lower_trigger).collect(),
        };
        match pieces.iter_mut().find(|p| p.name == def.name) {
            Some(existing) => *existing = def,
            None => pieces.push(def),
        }
    }
    pieces
}

fn compile_effects(ast: &GameNode, base: Option<&CompiledGame>) -> Vec<EffectDefinition> {
    let mut effects: Vec<EffectDefinition> = base.map(|b| b.effects.clone()).unwrap_or_default();
    for node in &ast.effects {
        let def = EffectDefinition {
            name: node.name.clone(),
            blocks: node.blocks.unwrap_or_default(),
            visual: node.visual.clone(),
            description: node.description.clone(),
        };
        match effects.iter_mut().find(|e| e.name == def.name) {
            Some(existing) => *existing = def,
            None => effects.push(def),
        }
    }
    effects
}

fn compile_triggers(ast: &GameNode, base: Option<&CompiledGame>) -> Vec<TriggerDefinition> {
    let mut triggers: Vec<TriggerDefinition> =
        base.map(|b| b.triggers.clone()).unwrap_or_default();
    triggers.extend(ast.triggers.iter().map(lower_trigger));
    triggers
}

fn lower_trigger(node: &TriggerNode) -> TriggerDefinition {
    TriggerDefinition {
        name: node.name.clone(),
        on: node.on,
        when: node.when.clone(),
        actions: node.actions.clone(),
        optional: node.optional,
        description: node.description.clone(),
    }
}

/// Seed with the built-ins, then register every unknown trait named by
/// a piece as a custom trait with no attached behavior.
fn compile_traits(pieces: &[PieceDefinition]) -> BTreeMap<String, TraitDefinition> {
    let mut table = builtin_traits();
    for piece in pieces {
        for name in &piece.traits {
            table.entry(name.clone()).or_insert_with(|| TraitDefinition {
                name: name.clone(),
                builtin: None,
            });
        }
    }
    table
}

fn compile_setup(
    ast: &GameNode,
    base: Option<&CompiledGame>,
    board: &BoardConfig,
    pieces: &[PieceDefinition],
) -> Result<Setup, CompilerError> {
    let node = match &ast.setup {
        Some(node) => node,
        None => return Ok(base.map(|b| b.setup.clone()).unwrap_or_default()),
    };
    let mut setup = Setup {
        placements: Vec::new(),
        replace: BTreeMap::new(),
        additive: node.additive,
    };
    if node.additive {
        if let Some(base) = base {
            setup.placements = base.setup.placements.clone();
        }
    }
    for placement in &node.placements {
        let pos = parse_square(&placement.square, "setup", placement.loc)?;
        check_bounds(pos, &placement.square, board.width, board.height, placement.loc)?;
        known_piece(&placement.piece, pieces, "setup", placement.loc)?;
        setup.placements.push(Placement {
            pos,
            piece: placement.piece.clone(),
            owner: placement.owner,
        });
    }
    for replace in &node.replace {
        known_piece(&replace.old, pieces, "replace", replace.loc)?;
        known_piece(&replace.new, pieces, "replace", replace.loc)?;
        setup
            .replace
            .insert(replace.old.clone(), replace.new.clone());
    }
    Ok(setup)
}

/// Merge victory/draw entries onto an inherited list in three passes:
/// removes strip by name, replaces substitute by name (add when the
/// name is absent), adds append unique-by-name. The resulting list is
/// evaluated disjunctively.
fn merge_end_conditions(
    mut merged: Vec<EndCondition>,
    nodes: &[EndConditionNode],
) -> Result<Vec<EndCondition>, CompilerError> {
    for node in nodes {
        if node.merge == MergeAction::Remove {
            merged.retain(|entry| entry.name != node.name);
        }
    }
    for node in nodes {
        if node.merge != MergeAction::Replace {
            continue;
        }
        let condition = node.condition.clone().ok_or(CompilerError::MissingCondition {
            name: node.name.clone(),
            loc: node.loc,
        })?;
        let entry = EndCondition {
            name: node.name.clone(),
            condition,
        };
        match merged.iter_mut().find(|e| e.name == node.name) {
            Some(existing) => *existing = entry,
            None => merged.push(entry),
        }
    }
    for node in nodes {
        if node.merge != MergeAction::Add {
            continue;
        }
        if merged.iter().any(|e| e.name == node.name) {
            continue;
        }
        let condition = node.condition.clone().ok_or(CompilerError::MissingCondition {
            name: node.name.clone(),
            loc: node.loc,
        })?;
        merged.push(EndCondition {
            name: node.name.clone(),
            condition,
        });
    }
    Ok(merged)
}

fn parse_square(text: &str, context: &str, loc: Location) -> Result<Position, CompilerError> {
    Position::parse(text).ok_or_else(|| CompilerError::BadSquare {
        square: text.to_string(),
        context: context.to_string(),
        loc,
    })
}

fn check_bounds(
    pos: Position,
    text: &str,
    width: u8,
    height: u8,
    loc: Location,
) -> Result<(), CompilerError> {
    if pos.file >= width || pos.rank >= height {
        return Err(CompilerError::SquareOutOfBounds {
            square: text.to_string(),
            width,
            height,
            loc,
        });
    }
    Ok(())
}

/// A type name is known when a definition exists or it is one of the
/// six standard pieces (which carry implicit definitions).
fn known_piece(
    name: &str,
    pieces: &[PieceDefinition],
    context: &str,
    loc: Location,
) -> Result<(), CompilerError> {
    let known = pieces.iter().any(|p| p.name == name) || StandardPiece::from_name(name).is_some();
    if known {
        Ok(())
    } else {
        Err(CompilerError::UnknownPiece {
            name: name.to_string(),
            context: context.to_string(),
            loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::lexer::tokenize;
    use crate::lang::parser::parse;
    use crate::rules::Condition;

    fn compile_source(source: &str) -> CompiledGame {
        compile(&parse(tokenize(source).unwrap()).unwrap()).unwrap()
    }

    fn compile_error(source: &str) -> CompilerError {
        compile(&parse(tokenize(source).unwrap()).unwrap()).unwrap_err()
    }

    #[test]
    fn test_defaults() {
        let game = compile_source("game: \"Plain\"\n");
        assert_eq!(game.name, "Plain");
        assert_eq!((game.board.width, game.board.height), (8, 8));
        assert!(game.rules.check_detection);
        assert!(game.setup.placements.is_empty());
    }

    #[test]
    fn test_zone_lowering() {
        let source = "\
board:
    size: 8x8
    zones:
        hill: [d4, e5]
";
        let game = compile_source(source);
        let hill = &game.board.zones["hill"];
        assert!(hill.contains(&Position::parse("d4").unwrap()));
        assert!(hill.contains(&Position::parse("e5").unwrap()));
    }

    #[test]
    fn test_zone_out_of_bounds() {
        let source = "\
board:
    size: 6x6
    zones:
        far: [h8]
";
        assert!(matches!(
            compile_error(source),
            CompilerError::SquareOutOfBounds { .. }
        ));
    }

    #[test]
    fn test_pattern_pre_pass_resolves_references() {
        let source = "\
pattern lance: slide(forward)
piece Lancer:
    move: lance
";
        let game = compile_source(source);
        let lancer = game.piece_def("Lancer").unwrap();
        assert_eq!(
            lancer.moves,
            Some(Pattern::Slide {
                dir: crate::board::Direction::Forward
            })
        );
    }

    #[test]
    fn test_unknown_reference_is_preserved() {
        let source = "\
piece Mystery:
    move: undefined_shape
";
        let game = compile_source(source);
        assert_eq!(
            game.piece_def("Mystery").unwrap().moves,
            Some(Pattern::Reference("undefined_shape".to_string()))
        );
    }

    #[test]
    fn test_unknown_trait_registered_as_custom() {
        let source = "\
piece Ghost:
    move: step(any)
    traits: [phase, spooky]
";
        let game = compile_source(source);
        assert!(game.traits["phase"].builtin.is_some());
        assert!(game.traits["spooky"].builtin.is_none());
    }

    #[test]
    fn test_setup_unknown_piece() {
        let source = "\
setup:
    White Dragon: [e4]
";
        assert!(matches!(
            compile_error(source),
            CompilerError::UnknownPiece { .. }
        ));
    }

    #[test]
    fn test_setup_standard_piece_is_known() {
        let source = "\
setup:
    White Rook: [a1]
";
        let game = compile_source(source);
        assert_eq!(game.setup.placements.len(), 1);
        assert_eq!(game.setup.placements[0].piece, "Rook");
    }

    #[test]
    fn test_rules_overlay() {
        let source = "\
rules:
    enPassant: false
";
        let game = compile_source(source);
        assert!(!game.rules.en_passant);
        assert!(game.rules.castling);
    }

    #[test]
    fn test_victory_merge_over_base() {
        let base_source = "\
victory:
    hill: King in zone.hill
    race: King on rank 8
";
        let base = compile_source(base_source);
        let child_source = "\
victory:
    add:
        extinction: Queen captured
    replace:
        hill: King in zone.summit
    remove: [race]
";
        let ast = parse(tokenize(child_source).unwrap()).unwrap();
        let game = compile_with_base(&ast, Some(&base)).unwrap();
        let names: Vec<&str> = game.victory.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["hill", "extinction"]);
        assert_eq!(
            game.victory[0].condition,
            Condition::InZone {
                piece: Some("King".to_string()),
                zone: "summit".to_string()
            }
        );
    }

    #[test]
    fn test_additive_setup_layers_base_placements() {
        let base = compile_source("setup:\n    White Rook: [a1]\n");
        let child_source = "\
setup:
    add:
        Black Rook: [a8]
";
        let ast = parse(tokenize(child_source).unwrap()).unwrap();
        let game = compile_with_base(&ast, Some(&base)).unwrap();
        assert!(game.setup.additive);
        assert_eq!(game.setup.placements.len(), 2);
    }

    #[test]
    fn test_piece_override_by_name() {
        let base = compile_source("piece Guard:\n    move: step(any)\n");
        let child_source = "\
piece Guard:
    move: step(orthogonal)
";
        let ast = parse(tokenize(child_source).unwrap()).unwrap();
        let game = compile_with_base(&ast, Some(&base)).unwrap();
        assert_eq!(game.pieces.len(), 1);
        assert_eq!(
            game.pieces[0].moves,
            Some(Pattern::Step {
                dir: crate::board::Direction::Orthogonal,
                dist: 1
            })
        );
    }
}
