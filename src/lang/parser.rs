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

use thiserror::Error;

use super::ast::*;
use super::token::{Location, Token, TokenKind};
use crate::board::{Color, Compass, Direction, Position};
use crate::rules::{
    Action, BinaryOp, BlockKind, CaptureRule, CompareOp, Condition, EventType, Expr, LogicalOp,
    MergeAction, Pattern, PatternOp, RemoveFilter, RemoveRange, SetOp, UnaryOp, Value,
};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{loc}: {message}")]
pub struct ParserError {
    pub message: String,
    pub loc: Location,
}

/// Parse a token stream into a [`GameNode`]. Fails fast: the first
/// unexpected token aborts with its location.
pub fn parse(tokens: Vec<Token>) -> Result<GameNode, ParserError> {
    Parser::new(tokens).parse_game()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        // The lexer always terminates with Eof; guarantee it for
        // hand-built streams too.
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let loc = tokens.last().map(|t| t.loc).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", loc));
        }
        Self { tokens, pos: 0 }
    }

    // ---- token plumbing ----

    fn peek(&self) -> &Token {
        // Safety: the constructor guarantees a trailing Eof and
        // `advance` never steps past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn loc(&self) -> Location {
        self.peek().loc
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParserError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.err(format!("expected {}, found '{}'", what, self.describe())))
        }
    }

    fn describe(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => token.text.clone(),
        }
    }

    fn err(&self, message: String) -> ParserError {
        ParserError {
            message,
            loc: self.loc(),
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn end_of_line(&mut self) -> Result<(), ParserError> {
        if self.check(&TokenKind::Dedent) || self.check(&TokenKind::Eof) {
            return Ok(());
        }
        self.expect(TokenKind::Newline, "end of line")?;
        Ok(())
    }

    fn enter_block(&mut self) -> Result<(), ParserError> {
        self.expect(TokenKind::Colon, "':'")?;
        self.expect(TokenKind::Newline, "a newline")?;
        self.expect(TokenKind::Indent, "an indented block")?;
        Ok(())
    }

    fn exit_block(&mut self) -> Result<(), ParserError> {
        self.expect(TokenKind::Dedent, "end of block")?;
        Ok(())
    }

    /// Any word-shaped token: identifier, square literal or keyword.
    /// Used for property names, rule keys and similar spots where the
    /// grammar allows reserved words.
    fn word(&mut self, what: &str) -> Result<Token, ParserError> {
        let token = self.peek().clone();
        let word_like = matches!(token.kind, TokenKind::Ident | TokenKind::SquareLit)
            || token.kind.is_keyword();
        if word_like {
            self.advance();
            Ok(token)
        } else {
            Err(self.err(format!("expected {}, found '{}'", what, self.describe())))
        }
    }

    fn ident(&mut self, what: &str) -> Result<Token, ParserError> {
        self.expect(TokenKind::Ident, what)
    }

    fn number(&mut self, what: &str) -> Result<f64, ParserError> {
        match self.kind() {
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.err(format!("expected {}, found '{}'", what, self.describe()))),
        }
    }

    fn string(&mut self, what: &str) -> Result<String, ParserError> {
        match self.kind() {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.err(format!("expected {}, found '{}'", what, self.describe()))),
        }
    }

    /// A square name: a square literal, or an identifier that happens
    /// to parse as one (contextual disambiguation).
    fn square_name(&mut self) -> Result<(String, Location), ParserError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::SquareLit => {
                self.advance();
                Ok((token.text, token.loc))
            }
            TokenKind::Ident if Position::parse(&token.text).is_some() => {
                self.advance();
                Ok((token.text, token.loc))
            }
            _ => Err(self.err(format!("expected a square, found '{}'", self.describe()))),
        }
    }

    fn at_word(&self, text: &str) -> bool {
        matches!(self.kind(), TokenKind::Ident) && self.peek().text == text
    }

    fn expect_word(&mut self, text: &str) -> Result<(), ParserError> {
        if self.at_word(text) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', found '{}'", text, self.describe())))
        }
    }

    // ---- top level ----

    fn parse_game(&mut self) -> Result<GameNode, ParserError> {
        let mut game = GameNode::default();
        self.skip_newlines();
        while !self.check(&TokenKind::Eof) {
            match self.kind() {
                TokenKind::Game => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    game.name = Some(self.string("the game name")?);
                    self.end_of_line()?;
                }
                TokenKind::Extends => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    game.extends = Some(self.string("the base game name")?);
                    self.end_of_line()?;
                }
                TokenKind::Board => game.board = Some(self.parse_board()?),
                TokenKind::Piece => game.pieces.push(self.parse_piece()?),
                TokenKind::Effect => game.effects.push(self.parse_effect()?),
                TokenKind::Trigger => game.triggers.push(self.parse_trigger()?),
                TokenKind::Pattern => game.patterns.push(self.parse_pattern_def()?),
                TokenKind::Setup => game.setup = Some(self.parse_setup()?),
                TokenKind::Victory => {
                    self.advance();
                    game.victory = self.parse_end_conditions()?;
                }
                TokenKind::Draw => {
                    self.advance();
                    game.draw = self.parse_end_conditions()?;
                }
                TokenKind::Rules => game.rules = self.parse_rules()?,
                TokenKind::Script => game.scripts.push(self.parse_script()?),
                _ => {
                    return Err(self.err(format!(
                        "expected a section or definition, found '{}'",
                        self.describe()
                    )))
                }
            }
            self.skip_newlines();
        }
        Ok(game)
    }

    // ---- board ----

    fn parse_board(&mut self) -> Result<BoardNode, ParserError> {
        let loc = self.loc();
        self.advance();
        self.enter_block()?;
        let mut width = 8u16;
        let mut height = 8u16;
        let mut zones = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            match self.kind() {
                TokenKind::Size => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    let (w, h) = self.parse_board_size()?;
                    width = w;
                    height = h;
                    self.end_of_line()?;
                }
                TokenKind::Zones => {
                    self.advance();
                    self.enter_block()?;
                    while !self.check(&TokenKind::Dedent) {
                        zones.push(self.parse_zone()?);
                    }
                    self.exit_block()?;
                }
                _ => {
                    return Err(self.err(format!(
                        "expected 'size' or 'zones', found '{}'",
                        self.describe()
                    )))
                }
            }
        }
        self.exit_block()?;
        Ok(BoardNode {
            width,
            height,
            zones,
            loc,
        })
    }

    /// A `WxH` size literal. The lexer splits it into a number and a
    /// word beginning with `x`.
    fn parse_board_size(&mut self) -> Result<(u16, u16), ParserError> {
        let width = self.number("the board width")? as u16;
        let token = self.word("the board height (as in '8x8')")?;
        let rest = token
            .text
            .strip_prefix('x')
            .and_then(|digits| digits.parse::<u16>().ok());
        match rest {
            Some(height) => Ok((width, height)),
            None => Err(ParserError {
                message: format!("malformed board size near '{}'", token.text),
                loc: token.loc,
            }),
        }
    }

    fn parse_zone(&mut self) -> Result<ZoneNode, ParserError> {
        let loc = self.loc();
        let name = self.word("a zone name")?.text;
        self.expect(TokenKind::Colon, "':'")?;
        self.expect(TokenKind::LBracket, "'['")?;
        let mut squares = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                squares.push(self.square_name()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        self.end_of_line()?;
        Ok(ZoneNode { name, squares, loc })
    }

    // ---- pieces ----

    fn parse_piece(&mut self) -> Result<PieceNode, ParserError> {
        let loc = self.loc();
        self.advance();
        let name = self.ident("a piece type name")?.text;
        self.enter_block()?;
        let mut node = PieceNode {
            name,
            moves: None,
            capture: None,
            traits: Vec::new(),
            state: Vec::new(),
            triggers: Vec::new(),
            loc,
        };
        while !self.check(&TokenKind::Dedent) {
            match self.kind() {
                TokenKind::Move => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    node.moves = Some(self.parse_pattern()?);
                    self.end_of_line()?;
                }
                TokenKind::Capture => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    node.capture = Some(self.parse_capture_rule()?);
                    self.end_of_line()?;
                }
                TokenKind::Traits => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    node.traits = self.parse_name_list()?;
                    self.end_of_line()?;
                }
                TokenKind::State => {
                    self.advance();
                    self.enter_block()?;
                    while !self.check(&TokenKind::Dedent) {
                        let key = self.word("a state key")?.text;
                        self.expect(TokenKind::Colon, "':'")?;
                        let value = self.parse_literal_value()?;
                        node.state.push((key, value));
                        self.end_of_line()?;
                    }
                    self.exit_block()?;
                }
                TokenKind::On => {
                    let index = node.triggers.len();
                    let trigger = self.parse_inline_trigger(&node.name, index)?;
                    node.triggers.push(trigger);
                }
                _ => {
                    return Err(self.err(format!(
                        "expected a piece property, found '{}'",
                        self.describe()
                    )))
                }
            }
        }
        self.exit_block()?;
        Ok(node)
    }

    fn parse_capture_rule(&mut self) -> Result<CaptureRule, ParserError> {
        if self.at_word("same") {
            self.advance();
            return Ok(CaptureRule::Same);
        }
        if self.at_word("none") {
            self.advance();
            return Ok(CaptureRule::None);
        }
        Ok(CaptureRule::Pattern(self.parse_pattern()?))
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParserError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut names = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                names.push(self.word("a name")?.text);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(names)
    }

    /// A literal used in state maps and rule settings: scalars and
    /// flat arrays only.
    fn parse_literal_value(&mut self) -> Result<Value, ParserError> {
        match self.kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Value::Number(n))
            }
            TokenKind::Minus => {
                self.advance();
                let n = self.number("a number")?;
                Ok(Value::Number(-n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Value::Str(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Value::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Value::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Value::Null)
            }
            TokenKind::SquareLit => {
                let token = self.advance();
                match Position::parse(&token.text) {
                    Some(pos) => Ok(Value::Square(pos)),
                    None => Ok(Value::Str(token.text)),
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_literal_value()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(Value::List(items))
            }
            _ => Err(self.err(format!("expected a literal, found '{}'", self.describe()))),
        }
    }

    // ---- effects ----

    fn parse_effect(&mut self) -> Result<EffectNode, ParserError> {
        let loc = self.loc();
        self.advance();
        let name = self.ident("an effect name")?.text;
        self.enter_block()?;
        let mut node = EffectNode {
            name,
            blocks: None,
            visual: None,
            description: None,
            loc,
        };
        while !self.check(&TokenKind::Dedent) {
            match self.kind() {
                TokenKind::Blocks => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    let word = self.word("'none', 'enemy', 'friend' or 'all'")?;
                    node.blocks = Some(BlockKind::from_name(&word.text).ok_or(ParserError {
                        message: format!("unknown blocking mode '{}'", word.text),
                        loc: word.loc,
                    })?);
                    self.end_of_line()?;
                }
                TokenKind::Visual => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    node.visual = Some(self.string("a visual tag")?);
                    self.end_of_line()?;
                }
                TokenKind::Description => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    node.description = Some(self.string("a description")?);
                    self.end_of_line()?;
                }
                _ => {
                    return Err(self.err(format!(
                        "expected an effect property, found '{}'",
                        self.describe()
                    )))
                }
            }
        }
        self.exit_block()?;
        Ok(node)
    }

    // ---- triggers ----

    fn parse_trigger(&mut self) -> Result<TriggerNode, ParserError> {
        let loc = self.loc();
        self.advance();
        let name = self.ident("a trigger name")?.text;
        self.enter_block()?;
        let mut on = None;
        let mut when = None;
        let mut actions = Vec::new();
        let mut optional = false;
        let mut description = None;
        while !self.check(&TokenKind::Dedent) {
            match self.kind() {
                TokenKind::On => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    on = Some(self.parse_event_type()?);
                    self.end_of_line()?;
                }
                TokenKind::When => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    when = Some(self.parse_condition()?);
                    self.end_of_line()?;
                }
                TokenKind::Optional => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    optional = matches!(self.parse_literal_value()?, Value::Bool(true));
                    self.end_of_line()?;
                }
                TokenKind::Description => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    description = Some(self.string("a description")?);
                    self.end_of_line()?;
                }
                TokenKind::Do => {
                    actions = self.parse_do()?;
                }
                _ => {
                    return Err(self.err(format!(
                        "expected a trigger property, found '{}'",
                        self.describe()
                    )))
                }
            }
        }
        self.exit_block()?;
        let on = on.ok_or(ParserError {
            message: format!("trigger '{}' is missing its 'on' event", name),
            loc,
        })?;
        Ok(TriggerNode {
            name,
            on,
            when,
            actions,
            optional,
            description,
            loc,
        })
    }

    /// `on EVENT [when CONDITION] do: ...` inside a piece body.
    fn parse_inline_trigger(
        &mut self,
        piece: &str,
        index: usize,
    ) -> Result<TriggerNode, ParserError> {
        let loc = self.loc();
        self.advance();
        let on = self.parse_event_type()?;
        let when = if self.eat(&TokenKind::When) {
            Some(self.parse_condition()?)
        } else {
            None
        };
        let actions = self.parse_do()?;
        Ok(TriggerNode {
            name: format!("{}_{}_{}", piece, on, index),
            on,
            when,
            actions,
            optional: false,
            description: None,
            loc,
        })
    }

    fn parse_event_type(&mut self) -> Result<EventType, ParserError> {
        let token = self.word("an event name")?;
        EventType::from_name(&token.text).ok_or(ParserError {
            message: format!("unknown event '{}'", token.text),
            loc: token.loc,
        })
    }

    // ---- patterns ----

    fn parse_pattern_def(&mut self) -> Result<PatternDefNode, ParserError> {
        let loc = self.loc();
        self.advance();
        let name = self.ident("a pattern name")?.text;
        self.expect(TokenKind::Colon, "':'")?;
        let pattern = self.parse_pattern()?;
        self.end_of_line()?;
        Ok(PatternDefNode { name, pattern, loc })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, ParserError> {
        let mut parts = vec![self.parse_pattern_then()?];
        while self.eat(&TokenKind::Pipe) {
            parts.push(self.parse_pattern_then()?);
        }
        if parts.len() == 1 {
            Ok(parts.pop().unwrap())
        } else {
            Ok(Pattern::Composite {
                op: PatternOp::Or,
                parts,
            })
        }
    }

    fn parse_pattern_then(&mut self) -> Result<Pattern, ParserError> {
        let mut parts = vec![self.parse_pattern_repeat()?];
        while self.eat(&TokenKind::Plus) {
            parts.push(self.parse_pattern_repeat()?);
        }
        if parts.len() == 1 {
            Ok(parts.pop().unwrap())
        } else {
            Ok(Pattern::Composite {
                op: PatternOp::Then,
                parts,
            })
        }
    }

    fn parse_pattern_repeat(&mut self) -> Result<Pattern, ParserError> {
        let pattern = self.parse_pattern_conditional()?;
        if self.eat(&TokenKind::Star) {
            let count = self.number("a repeat count")? as usize;
            let parts = vec![pattern; count.max(1)];
            if parts.len() == 1 {
                return Ok(parts.into_iter().next().unwrap());
            }
            return Ok(Pattern::Composite {
                op: PatternOp::Then,
                parts,
            });
        }
        Ok(pattern)
    }

    fn parse_pattern_conditional(&mut self) -> Result<Pattern, ParserError> {
        let pattern = self.parse_pattern_primary()?;
        if self.eat(&TokenKind::Where) {
            let condition = self.parse_condition()?;
            return Ok(Pattern::Conditional {
                pattern: Box::new(pattern),
                condition: Box::new(condition),
            });
        }
        Ok(pattern)
    }

    fn parse_pattern_primary(&mut self) -> Result<Pattern, ParserError> {
        match self.kind() {
            TokenKind::Step => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let dir = self.parse_direction()?;
                let dist = if self.eat(&TokenKind::Comma) {
                    self.number("a distance")? as u16
                } else {
                    1
                };
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Pattern::Step { dir, dist })
            }
            TokenKind::Slide => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let dir = self.parse_direction()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Pattern::Slide { dir })
            }
            TokenKind::Leap => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let dx = self.number("a file offset")? as u8;
                self.expect(TokenKind::Comma, "','")?;
                let dy = self.number("a rank offset")? as u8;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Pattern::Leap { dx, dy })
            }
            TokenKind::Hop => {
                self.advance();
                self.expect(TokenKind::LParen, "'('")?;
                let dir = self.parse_direction()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Pattern::Hop { dir })
            }
            TokenKind::LParen => {
                self.advance();
                let pattern = self.parse_pattern()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(pattern)
            }
            TokenKind::Ident => {
                let name = self.advance().text;
                Ok(Pattern::Reference(name))
            }
            _ => Err(self.err(format!(
                "expected a movement pattern, found '{}'",
                self.describe()
            ))),
        }
    }

    fn parse_direction(&mut self) -> Result<Direction, ParserError> {
        let dir = match self.kind() {
            TokenKind::North => Direction::Compass(Compass::North),
            TokenKind::NorthEast => Direction::Compass(Compass::NorthEast),
            TokenKind::East => Direction::Compass(Compass::East),
            TokenKind::SouthEast => Direction::Compass(Compass::SouthEast),
            TokenKind::South => Direction::Compass(Compass::South),
            TokenKind::SouthWest => Direction::Compass(Compass::SouthWest),
            TokenKind::West => Direction::Compass(Compass::West),
            TokenKind::NorthWest => Direction::Compass(Compass::NorthWest),
            TokenKind::Orthogonal => Direction::Orthogonal,
            TokenKind::Diagonal => Direction::Diagonal,
            TokenKind::Any => Direction::Any,
            TokenKind::Forward => Direction::Forward,
            TokenKind::Backward => Direction::Backward,
            _ => {
                return Err(self.err(format!(
                    "expected a direction, found '{}'",
                    self.describe()
                )))
            }
        };
        self.advance();
        Ok(dir)
    }

    // ---- setup ----

    fn parse_setup(&mut self) -> Result<SetupNode, ParserError> {
        self.advance();
        self.enter_block()?;
        let mut node = SetupNode::default();
        while !self.check(&TokenKind::Dedent) {
            match self.kind() {
                TokenKind::Add => {
                    self.advance();
                    self.enter_block()?;
                    while !self.check(&TokenKind::Dedent) {
                        self.parse_placement_group(&mut node.placements)?;
                    }
                    self.exit_block()?;
                    node.additive = true;
                }
                TokenKind::Replace => {
                    self.advance();
                    self.enter_block()?;
                    while !self.check(&TokenKind::Dedent) {
                        let loc = self.loc();
                        let old = self.ident("a piece type")?.text;
                        self.expect(TokenKind::Colon, "':'")?;
                        let new = self.ident("a piece type")?.text;
                        self.end_of_line()?;
                        node.replace.push(ReplaceNode { old, new, loc });
                    }
                    self.exit_block()?;
                }
                TokenKind::White | TokenKind::Black => {
                    self.parse_placement_group(&mut node.placements)?;
                }
                _ => {
                    return Err(self.err(format!(
                        "expected 'add', 'replace' or a color, found '{}'",
                        self.describe()
                    )))
                }
            }
        }
        self.exit_block()?;
        Ok(node)
    }

    /// Either `Color:` with a `square: Type` block or the inline
    /// `Color Type: [squares]` form.
    fn parse_placement_group(
        &mut self,
        placements: &mut Vec<PlacementNode>,
    ) -> Result<(), ParserError> {
        let owner = match self.kind() {
            TokenKind::White => Color::White,
            TokenKind::Black => Color::Black,
            _ => return Err(self.err(format!("expected a color, found '{}'", self.describe()))),
        };
        self.advance();
        if self.check(&TokenKind::Ident) {
            let piece = self.ident("a piece type")?.text;
            self.expect(TokenKind::Colon, "':'")?;
            self.expect(TokenKind::LBracket, "'['")?;
            if !self.check(&TokenKind::RBracket) {
                loop {
                    let (square, loc) = self.square_name()?;
                    placements.push(PlacementNode {
                        square,
                        piece: piece.clone(),
                        owner,
                        loc,
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RBracket, "']'")?;
            self.end_of_line()?;
            return Ok(());
        }
        self.enter_block()?;
        while !self.check(&TokenKind::Dedent) {
            let (square, loc) = self.square_name()?;
            self.expect(TokenKind::Colon, "':'")?;
            let piece = self.ident("a piece type")?.text;
            self.end_of_line()?;
            placements.push(PlacementNode {
                square,
                piece,
                owner,
                loc,
            });
        }
        self.exit_block()?;
        Ok(())
    }

    // ---- victory / draw ----

    fn parse_end_conditions(&mut self) -> Result<Vec<EndConditionNode>, ParserError> {
        self.enter_block()?;
        let mut entries = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            match self.kind() {
                TokenKind::Add => {
                    self.advance();
                    self.parse_end_condition_block(MergeAction::Add, &mut entries)?;
                }
                TokenKind::Replace => {
                    self.advance();
                    self.parse_end_condition_block(MergeAction::Replace, &mut entries)?;
                }
                TokenKind::Remove => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    let loc = self.loc();
                    for name in self.parse_name_list()? {
                        entries.push(EndConditionNode {
                            name,
                            condition: None,
                            merge: MergeAction::Remove,
                            loc,
                        });
                    }
                    self.end_of_line()?;
                }
                _ => {
                    entries.push(self.parse_end_condition_entry(MergeAction::Add)?);
                }
            }
        }
        self.exit_block()?;
        Ok(entries)
    }

    fn parse_end_condition_block(
        &mut self,
        merge: MergeAction,
        entries: &mut Vec<EndConditionNode>,
    ) -> Result<(), ParserError> {
        self.enter_block()?;
        while !self.check(&TokenKind::Dedent) {
            entries.push(self.parse_end_condition_entry(merge)?);
        }
        self.exit_block()?;
        Ok(())
    }

    fn parse_end_condition_entry(
        &mut self,
        merge: MergeAction,
    ) -> Result<EndConditionNode, ParserError> {
        let loc = self.loc();
        let name = self.word("a condition name")?.text;
        self.expect(TokenKind::Colon, "':'")?;
        let condition = self.parse_condition()?;
        self.end_of_line()?;
        Ok(EndConditionNode {
            name,
            condition: Some(condition),
            merge,
            loc,
        })
    }

    // ---- rules ----

    fn parse_rules(&mut self) -> Result<Vec<RuleEntryNode>, ParserError> {
        self.advance();
        self.enter_block()?;
        let mut entries = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            let loc = self.loc();
            let key = self.word("a rule name")?.text;
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_literal_value()?;
            self.end_of_line()?;
            entries.push(RuleEntryNode { key, value, loc });
        }
        self.exit_block()?;
        Ok(entries)
    }

    // ---- scripts ----

    /// `script { ... }`: the body is captured as an opaque string,
    /// token texts re-joined with spaces.
    fn parse_script(&mut self) -> Result<ScriptNode, ParserError> {
        let loc = self.loc();
        self.advance();
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut depth = 1usize;
        let mut parts: Vec<String> = Vec::new();
        loop {
            match self.kind() {
                TokenKind::Eof => {
                    return Err(self.err("unterminated script block".to_string()));
                }
                TokenKind::LBrace => {
                    depth += 1;
                    parts.push(self.advance().text);
                }
                TokenKind::RBrace => {
                    depth -= 1;
                    let token = self.advance();
                    if depth == 0 {
                        break;
                    }
                    parts.push(token.text);
                }
                TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent => {
                    self.advance();
                }
                TokenKind::Str(_) => {
                    let token = self.advance();
                    parts.push(format!("\"{}\"", token.text));
                }
                _ => parts.push(self.advance().text),
            }
        }
        Ok(ScriptNode {
            code: parts.join(" "),
            loc,
        })
    }

    // ---- actions ----

    /// `do:` with either a single inline action or an indented block.
    /// Consumes the whole construct including its line ending.
    fn parse_do(&mut self) -> Result<Vec<Action>, ParserError> {
        self.expect(TokenKind::Do, "'do'")?;
        self.expect(TokenKind::Colon, "':'")?;
        if self.check(&TokenKind::Newline) {
            return self.parse_action_block();
        }
        let action = self.parse_action()?;
        // An inline if/for carrying its own `do:` has already consumed
        // the line ending, so the newline here is optional.
        self.eat(&TokenKind::Newline);
        Ok(vec![action])
    }

    fn parse_action_block(&mut self) -> Result<Vec<Action>, ParserError> {
        self.expect(TokenKind::Newline, "a newline")?;
        self.expect(TokenKind::Indent, "an indented block")?;
        let mut actions = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            actions.push(self.parse_action()?);
            // Block-shaped actions (if/for) consume their own line
            // ending, so the newline here is optional.
            self.eat(&TokenKind::Newline);
        }
        self.exit_block()?;
        Ok(actions)
    }

    fn parse_action(&mut self) -> Result<Action, ParserError> {
        match self.kind() {
            TokenKind::Set => {
                self.advance();
                let target = self.parse_expr()?;
                let op = match self.kind() {
                    TokenKind::Assign => SetOp::Assign,
                    TokenKind::PlusEq => SetOp::Add,
                    TokenKind::MinusEq => SetOp::Sub,
                    _ => {
                        return Err(self.err(format!(
                            "expected '=', '+=' or '-=', found '{}'",
                            self.describe()
                        )))
                    }
                };
                self.advance();
                let value = self.parse_expr()?;
                Ok(Action::Set { target, op, value })
            }
            TokenKind::Create => {
                self.advance();
                let piece = self.ident("a piece type")?.text;
                self.expect_word("at")?;
                let pos = self.parse_expr()?;
                let owner = if self.eat(&TokenKind::For) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                Ok(Action::Create { piece, pos, owner })
            }
            TokenKind::Remove => {
                self.advance();
                let target = if self.at_word("radius") {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let range = if self.at_word("radius") {
                    self.advance();
                    let radius = self.number("a radius")? as u16;
                    self.expect_word("from")?;
                    let from = self.parse_expr()?;
                    Some(RemoveRange { radius, from })
                } else {
                    None
                };
                let mut filter = RemoveFilter::default();
                let mut filtered = false;
                loop {
                    if self.at_word("include") {
                        self.advance();
                        filter.include = self.parse_name_list()?;
                        filtered = true;
                    } else if self.at_word("exclude") {
                        self.advance();
                        filter.exclude = self.parse_name_list()?;
                        filtered = true;
                    } else {
                        break;
                    }
                }
                Ok(Action::Remove {
                    target,
                    range,
                    filter: filtered.then_some(filter),
                })
            }
            TokenKind::Transform => {
                self.advance();
                let target = self.parse_expr()?;
                self.expect_word("to")?;
                let into = self.ident("a piece type")?.text;
                Ok(Action::Transform { target, into })
            }
            TokenKind::Mark => {
                self.advance();
                let pos = self.parse_expr()?;
                self.expect_word("with")?;
                let effect = self.ident("an effect name")?.text;
                Ok(Action::Mark { pos, effect })
            }
            TokenKind::Move => {
                self.advance();
                let target = self.parse_expr()?;
                self.expect_word("to")?;
                let to = self.parse_expr()?;
                Ok(Action::MovePiece { target, to })
            }
            TokenKind::Win => {
                self.advance();
                Ok(Action::Win(self.parse_expr()?))
            }
            TokenKind::Lose => {
                self.advance();
                Ok(Action::Lose(self.parse_expr()?))
            }
            TokenKind::Draw => {
                self.advance();
                let reason = match self.kind() {
                    TokenKind::Str(s) => {
                        let s = s.clone();
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                Ok(Action::Draw { reason })
            }
            TokenKind::Cancel => {
                self.advance();
                Ok(Action::Cancel)
            }
            TokenKind::Apply => {
                self.advance();
                let effect = self.ident("an effect name")?.text;
                self.expect_word("to")?;
                let target = self.parse_expr()?;
                Ok(Action::Apply { effect, target })
            }
            TokenKind::For => {
                self.advance();
                let var = self.ident("a loop variable")?.text;
                self.expect(TokenKind::In, "'in'")?;
                let iterable = self.parse_expr()?;
                let actions = self.parse_do()?;
                Ok(Action::ForEach {
                    var,
                    iterable,
                    actions,
                })
            }
            TokenKind::If => {
                self.advance();
                let condition = self.parse_condition()?;
                let then_actions = self.parse_do()?;
                let else_actions = if self.check(&TokenKind::Else) {
                    self.advance();
                    self.parse_do()?
                } else {
                    Vec::new()
                };
                Ok(Action::If {
                    condition,
                    then_actions,
                    else_actions,
                })
            }
            TokenKind::Ident => {
                let name = self.advance().text;
                let mut args = Vec::new();
                if self.eat(&TokenKind::LParen) {
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "')'")?;
                }
                Ok(Action::Custom { name, args })
            }
            _ => Err(self.err(format!("expected an action, found '{}'", self.describe()))),
        }
    }

    // ---- conditions ----

    pub(crate) fn parse_condition(&mut self) -> Result<Condition, ParserError> {
        self.parse_condition_or()
    }

    fn parse_condition_or(&mut self) -> Result<Condition, ParserError> {
        let mut lhs = self.parse_condition_and()?;
        while self.check(&TokenKind::Or) || self.check(&TokenKind::OrOr) {
            self.advance();
            let rhs = self.parse_condition_and()?;
            lhs = Condition::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_condition_and(&mut self) -> Result<Condition, ParserError> {
        let mut lhs = self.parse_condition_not()?;
        while self.check(&TokenKind::And) || self.check(&TokenKind::AndAnd) {
            self.advance();
            let rhs = self.parse_condition_not()?;
            lhs = Condition::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_condition_not(&mut self) -> Result<Condition, ParserError> {
        if self.check(&TokenKind::Not) {
            self.advance();
            return Ok(Condition::Not(Box::new(self.parse_condition_not()?)));
        }
        self.parse_condition_primary()
    }

    fn parse_condition_primary(&mut self) -> Result<Condition, ParserError> {
        match self.kind() {
            TokenKind::Empty => {
                self.advance();
                return Ok(Condition::Empty);
            }
            TokenKind::Enemy => {
                self.advance();
                return Ok(Condition::Enemy);
            }
            TokenKind::Friend => {
                self.advance();
                return Ok(Condition::Friend);
            }
            TokenKind::Clear => {
                self.advance();
                return Ok(Condition::Clear);
            }
            TokenKind::Check => {
                self.advance();
                return Ok(Condition::Check);
            }
            TokenKind::FirstMove => {
                self.advance();
                return Ok(Condition::FirstMove);
            }
            TokenKind::LParen => {
                self.advance();
                let condition = self.parse_condition()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(condition);
            }
            _ => {}
        }
        // `Type in zone.x`, `Type on rank N`, `Type captured`:
        // an identifier heading one of the piece-locating forms.
        if self.check(&TokenKind::Ident) {
            match self.kind_at(1) {
                Some(TokenKind::In) => {
                    let piece = self.advance().text;
                    self.advance();
                    return self.parse_membership(Some(piece));
                }
                Some(TokenKind::On) => {
                    let piece = self.advance().text;
                    self.advance();
                    return self.parse_rank_or_file(Some(piece));
                }
                Some(TokenKind::Captured) => {
                    let piece = self.advance().text;
                    self.advance();
                    return Ok(Condition::PieceCaptured { piece });
                }
                _ => {}
            }
        }
        if self.check(&TokenKind::In) {
            self.advance();
            return self.parse_membership(None);
        }
        if self.check(&TokenKind::On) {
            self.advance();
            return self.parse_rank_or_file(None);
        }
        let lhs = self.parse_expr()?;
        let op = match self.kind() {
            TokenKind::EqEq => Some(CompareOp::Eq),
            TokenKind::NotEq => Some(CompareOp::Ne),
            TokenKind::EqEqEq => Some(CompareOp::StrictEq),
            TokenKind::NotEqEq => Some(CompareOp::StrictNe),
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::LtEq => Some(CompareOp::Le),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::GtEq => Some(CompareOp::Ge),
            TokenKind::In => Some(CompareOp::In),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let rhs = self.parse_expr()?;
                Ok(Condition::Comparison { lhs, op, rhs })
            }
            None => Ok(Condition::Expr(lhs)),
        }
    }

    /// After `in`: `zone.NAME` becomes the dedicated zone form, any
    /// other expression a membership comparison.
    fn parse_membership(&mut self, piece: Option<String>) -> Result<Condition, ParserError> {
        if self.at_word("zone") && self.kind_at(1) == Some(&TokenKind::Dot) {
            self.advance();
            self.advance();
            let zone = self.word("a zone name")?.text;
            return Ok(Condition::InZone { piece, zone });
        }
        let rhs = self.parse_expr()?;
        let lhs = match piece {
            Some(name) => Expr::Identifier(name),
            None => Expr::Identifier("to".to_string()),
        };
        Ok(Condition::Comparison {
            lhs,
            op: CompareOp::In,
            rhs,
        })
    }

    fn parse_rank_or_file(&mut self, piece: Option<String>) -> Result<Condition, ParserError> {
        match self.kind() {
            TokenKind::Rank => {
                self.advance();
                let rank = self.number("a rank number")? as u8;
                Ok(Condition::OnRank { piece, rank })
            }
            TokenKind::File => {
                self.advance();
                let token = self.word("a file letter or number")?;
                let file = match token.text.parse::<u8>() {
                    Ok(n) => n,
                    Err(_) => {
                        let c = token.text.chars().next().unwrap_or('a');
                        c as u8 - b'a' + 1
                    }
                };
                Ok(Condition::OnFile { piece, file })
            }
            _ => Err(self.err(format!(
                "expected 'rank' or 'file', found '{}'",
                self.describe()
            ))),
        }
    }

    // ---- expressions ----

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_level: u8) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let (op, level) = match self.kind() {
                TokenKind::OrOr => (BinaryOp::Or, 1),
                TokenKind::AndAnd => (BinaryOp::And, 2),
                TokenKind::EqEq => (BinaryOp::Eq, 3),
                TokenKind::NotEq => (BinaryOp::Ne, 3),
                TokenKind::EqEqEq => (BinaryOp::StrictEq, 3),
                TokenKind::NotEqEq => (BinaryOp::StrictNe, 3),
                TokenKind::Lt => (BinaryOp::Lt, 4),
                TokenKind::LtEq => (BinaryOp::Le, 4),
                TokenKind::Gt => (BinaryOp::Gt, 4),
                TokenKind::GtEq => (BinaryOp::Ge, 4),
                TokenKind::Plus => (BinaryOp::Add, 5),
                TokenKind::Minus => (BinaryOp::Sub, 5),
                TokenKind::Star => (BinaryOp::Mul, 6),
                TokenKind::Slash => (BinaryOp::Div, 6),
                TokenKind::Percent => (BinaryOp::Mod, 6),
                _ => break,
            };
            if level < min_level {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(level + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        match self.kind() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            TokenKind::Bang => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.word("a property name")?.text;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "')'")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        match self.kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Str(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::SquareLit => {
                let token = self.advance();
                match Position::parse(&token.text) {
                    Some(pos) => Ok(Expr::SquareRef(pos)),
                    None => Ok(Expr::Identifier(token.text)),
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                if !self.check(&TokenKind::RBrace) {
                    loop {
                        let key = self.word("an object key")?.text;
                        self.expect(TokenKind::Colon, "':'")?;
                        let value = self.parse_expr()?;
                        entries.push((key, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace, "'}'")?;
                Ok(Expr::Object(entries))
            }
            TokenKind::Ident => {
                let name = self.advance().text;
                Ok(Expr::Identifier(name))
            }
            // Keywords usable as identifiers in expression position.
            TokenKind::Piece
            | TokenKind::Board
            | TokenKind::Game
            | TokenKind::Checks
            | TokenKind::Opponent
            | TokenKind::White
            | TokenKind::Black
            | TokenKind::Captured
            | TokenKind::Rank
            | TokenKind::File
            | TokenKind::State
            | TokenKind::Move => {
                let name = self.advance().text;
                Ok(Expr::Identifier(name))
            }
            _ => Err(self.err(format!(
                "expected an expression, found '{}'",
                self.describe()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::lexer::tokenize;

    fn parse_source(source: &str) -> GameNode {
        parse(tokenize(source).unwrap()).unwrap()
    }

    fn parse_err(source: &str) -> ParserError {
        parse(tokenize(source).unwrap()).unwrap_err()
    }

    #[test]
    fn test_header() {
        let game = parse_source("game: \"Atomic\"\nextends: \"Standard\"\n");
        assert_eq!(game.name.as_deref(), Some("Atomic"));
        assert_eq!(game.extends.as_deref(), Some("Standard"));
    }

    #[test]
    fn test_board_section() {
        let source = "\
board:
    size: 10x8
    zones:
        hill: [d4, d5, e4, e5]
";
        let board = parse_source(source).board.unwrap();
        assert_eq!((board.width, board.height), (10, 8));
        assert_eq!(board.zones.len(), 1);
        assert_eq!(board.zones[0].name, "hill");
        assert_eq!(board.zones[0].squares.len(), 4);
    }

    #[test]
    fn test_piece_definition() {
        let source = "\
piece Ferz:
    move: step(diagonal)
    capture: same
    traits: [royal, phase]
    state:
        stamina: 3
";
        let piece = &parse_source(source).pieces[0];
        assert_eq!(piece.name, "Ferz");
        assert_eq!(
            piece.moves,
            Some(Pattern::Step {
                dir: Direction::Diagonal,
                dist: 1
            })
        );
        assert_eq!(piece.capture, Some(CaptureRule::Same));
        assert_eq!(piece.traits, vec!["royal", "phase"]);
        assert_eq!(piece.state[0], ("stamina".to_string(), Value::Number(3.0)));
    }

    #[test]
    fn test_pattern_combinators() {
        let source = "pattern zigzag: step(north) + step(northeast) | slide(east) where empty\n";
        let def = &parse_source(source).patterns[0];
        match &def.pattern {
            Pattern::Composite { op: PatternOp::Or, parts } => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(
                    parts[0],
                    Pattern::Composite {
                        op: PatternOp::Then,
                        ..
                    }
                ));
                assert!(matches!(parts[1], Pattern::Conditional { .. }));
            }
            other => panic!("unexpected pattern: {:?}", other),
        }
    }

    #[test]
    fn test_pattern_reference_and_repeat() {
        let source = "pattern charge: dash * 3\n";
        let def = &parse_source(source).patterns[0];
        match &def.pattern {
            Pattern::Composite { op: PatternOp::Then, parts } => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], Pattern::Reference("dash".to_string()));
            }
            other => panic!("unexpected pattern: {:?}", other),
        }
    }

    #[test]
    fn test_named_trigger() {
        let source = "\
trigger detonate:
    on: capture
    when: piece.type == \"Bomber\"
    optional: true
    description: \"Blow up the area\"
    do:
        remove radius 1 from to exclude [Pawn]
        cancel
";
        let trigger = &parse_source(source).triggers[0];
        assert_eq!(trigger.name, "detonate");
        assert_eq!(trigger.on, EventType::Capture);
        assert!(trigger.optional);
        assert!(trigger.when.is_some());
        assert_eq!(trigger.actions.len(), 2);
        match &trigger.actions[0] {
            Action::Remove { target, range, filter } => {
                assert!(target.is_none());
                assert_eq!(range.as_ref().unwrap().radius, 1);
                assert_eq!(filter.as_ref().unwrap().exclude, vec!["Pawn"]);
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert_eq!(trigger.actions[1], Action::Cancel);
    }

    #[test]
    fn test_inline_piece_trigger() {
        let source = "\
piece Freezer:
    move: step(any)
    on move do: set piece.state.cooldown = 2
";
        let piece = &parse_source(source).pieces[0];
        assert_eq!(piece.triggers.len(), 1);
        let trigger = &piece.triggers[0];
        assert_eq!(trigger.on, EventType::Move);
        match &trigger.actions[0] {
            Action::Set { op: SetOp::Assign, .. } => {}
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_setup_forms() {
        let source = "\
setup:
    add:
        White:
            e4: Guard
        Black Guard: [e5, d5]
    replace:
        Pawn: Guard
";
        let setup = parse_source(source).setup.unwrap();
        assert!(setup.additive);
        assert_eq!(setup.placements.len(), 3);
        assert_eq!(setup.placements[0].owner, Color::White);
        assert_eq!(setup.placements[1].owner, Color::Black);
        assert_eq!(setup.replace[0].old, "Pawn");
        assert_eq!(setup.replace[0].new, "Guard");
    }

    #[test]
    fn test_victory_section() {
        let source = "\
victory:
    hill: King in zone.hill
    add:
        extinction: Queen captured
    remove: [checkmate]
";
        let victory = parse_source(source).victory;
        assert_eq!(victory.len(), 3);
        assert_eq!(victory[0].merge, MergeAction::Add);
        assert_eq!(
            victory[0].condition,
            Some(Condition::InZone {
                piece: Some("King".to_string()),
                zone: "hill".to_string()
            })
        );
        assert_eq!(
            victory[1].condition,
            Some(Condition::PieceCaptured {
                piece: "Queen".to_string()
            })
        );
        assert_eq!(victory[2].merge, MergeAction::Remove);
        assert_eq!(victory[2].name, "checkmate");
    }

    #[test]
    fn test_condition_precedence() {
        let source = "\
trigger t:
    on: move
    when: empty or enemy and not check
    do: cancel
";
        let when = parse_source(source).triggers[0].when.clone().unwrap();
        match when {
            Condition::Logical { op: LogicalOp::Or, rhs, .. } => match *rhs {
                Condition::Logical { op: LogicalOp::And, rhs, .. } => {
                    assert!(matches!(*rhs, Condition::Not(_)));
                }
                other => panic!("unexpected rhs: {:?}", other),
            },
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_comparison_condition() {
        let source = "\
trigger t:
    on: turn_end
    when: checks >= 3
    do: win White
";
        let when = parse_source(source).triggers[0].when.clone().unwrap();
        assert_eq!(
            when,
            Condition::Comparison {
                lhs: Expr::Identifier("checks".to_string()),
                op: CompareOp::Ge,
                rhs: Expr::number(3.0),
            }
        );
    }

    #[test]
    fn test_expression_precedence() {
        let source = "\
trigger t:
    on: move
    when: 1 + 2 * 3 == 7
    do: cancel
";
        let when = parse_source(source).triggers[0].when.clone().unwrap();
        match when {
            Condition::Comparison { lhs: Expr::Binary { op: BinaryOp::Add, rhs, .. }, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_rules_section() {
        let source = "\
rules:
    castling: false
    checkDetection: true
";
        let rules = parse_source(source).rules;
        assert_eq!(rules[0].key, "castling");
        assert_eq!(rules[0].value, Value::Bool(false));
        assert_eq!(rules[1].key, "checkDetection");
    }

    #[test]
    fn test_script_capture() {
        let source = "script { let x = board . width ; }\n";
        let scripts = parse_source(source).scripts;
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].code, "let x = board . width ;");
    }

    #[test]
    fn test_for_and_if_actions() {
        let source = "\
trigger sweep:
    on: turn_start
    do:
        for p in pieces do:
            if p.state.cooldown > 0 do:
                set p.state.cooldown -= 1
";
        let trigger = &parse_source(source).triggers[0];
        match &trigger.actions[0] {
            Action::ForEach { var, actions, .. } => {
                assert_eq!(var, "p");
                assert!(matches!(actions[0], Action::If { .. }));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_nested_inline_do() {
        // The inner inline `do:` ends the line; properties may still
        // follow the statement.
        let source = "\
trigger foo:
    on: move
    do: if checks >= 3 do: cancel
    optional: true
";
        let trigger = &parse_source(source).triggers[0];
        assert!(trigger.optional);
        match &trigger.actions[0] {
            Action::If {
                then_actions,
                else_actions,
                ..
            } => {
                assert_eq!(then_actions[0], Action::Cancel);
                assert!(else_actions.is_empty());
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_error_carries_location() {
        let err = parse_err("piece :\n");
        assert_eq!(err.loc.line, 1);
        assert!(err.message.contains("piece type name"));
    }

    #[test]
    fn test_error_on_missing_event() {
        let err = parse_err("trigger t:\n    do: cancel\n");
        assert!(err.message.contains("missing its 'on' event"));
    }
}
