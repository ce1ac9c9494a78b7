//! # Parser
//!
//! Submodule of `compiler`, which is used to parse the source code into bytecode.
//!
//! This is a Pratt parser: a table maps every token type to an optional
//! prefix handler, an optional infix handler, and an infix precedence, and
//! [`Parser::parse_precedence`] climbs that table. Parse errors unwind as
//! `Err(CompileError)` up to the [`Parser::compile`] driver loop, which
//! reports them, synchronizes to a statement boundary, and keeps going, so
//! one run can surface several diagnostics.

use crate::{
  chunk::{Chunk, OpCode},
  compiler::Precedence,
  memory::Heap,
  scanner::{Scanner, Token, TokenType},
  value::Value,
  vm::InterpretError,
};

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::*;

pub type ParseFn = for<'src, 'heap> fn(&mut Parser<'src, 'heap>, bool) -> Result<(), InterpretError>;

pub mod compile_time_error_handlers;
pub mod emit_methods;
pub mod ops_after_get_parse_rule;
pub mod statement_methods;
pub mod variable_methods;

/// ## ParseRule
///
/// A struct which represents the parse rule, with:
///
/// - prefix: the prefix parse function
/// - infix: the infix parse function
/// - precedence: the precedence of the operator
#[derive(Default, Clone, Copy)]
pub struct ParseRule {
  pub prefix: Option<ParseFn>,
  pub infix: Option<ParseFn>,
  pub precedence: Precedence,
}

impl ParseRule {
  pub fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
    Self {
      prefix,
      infix,
      precedence,
    }
  }
}

/// ## RULES_VEC
///
/// A vec which contains the rules for the different tokens.
///
/// The handlers are capture-free closures so they coerce to the
/// higher-ranked [`ParseFn`] pointer over the parser's lifetimes.
static RULES_VEC: Lazy<Vec<(TokenType, ParseRule)>> = Lazy::new(|| {
  vec![
    (
      TokenType::LeftParen,
      ParseRule::new(Some(|parser, _| parser.grouping()), None, Precedence::None),
    ),
    (
      TokenType::RightParen,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::LeftBrace,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::RightBrace,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::Comma,
      ParseRule::new(None, None, Precedence::None),
    ),
    (TokenType::Dot, ParseRule::new(None, None, Precedence::None)),
    (
      TokenType::Minus,
      ParseRule::new(
        Some(|parser, _| parser.unary()),
        Some(|parser, _| parser.binary()),
        Precedence::Term,
      ),
    ),
    (
      TokenType::Plus,
      ParseRule::new(None, Some(|parser, _| parser.binary()), Precedence::Term),
    ),
    (
      TokenType::Semicolon,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::Slash,
      ParseRule::new(None, Some(|parser, _| parser.binary()), Precedence::Factor),
    ),
    (
      TokenType::Star,
      ParseRule::new(None, Some(|parser, _| parser.binary()), Precedence::Factor),
    ),
    (
      TokenType::Bang,
      ParseRule::new(Some(|parser, _| parser.unary()), None, Precedence::None),
    ),
    (
      TokenType::BangEqual,
      ParseRule::new(
        None,
        Some(|parser, _| parser.binary()),
        Precedence::Equality,
      ),
    ),
    (
      TokenType::Equal,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::EqualEqual,
      ParseRule::new(
        None,
        Some(|parser, _| parser.binary()),
        Precedence::Equality,
      ),
    ),
    (
      TokenType::Greater,
      ParseRule::new(
        None,
        Some(|parser, _| parser.binary()),
        Precedence::Comparison,
      ),
    ),
    (
      TokenType::GreaterEqual,
      ParseRule::new(
        None,
        Some(|parser, _| parser.binary()),
        Precedence::Comparison,
      ),
    ),
    (
      TokenType::Less,
      ParseRule::new(
        None,
        Some(|parser, _| parser.binary()),
        Precedence::Comparison,
      ),
    ),
    (
      TokenType::LessEqual,
      ParseRule::new(
        None,
        Some(|parser, _| parser.binary()),
        Precedence::Comparison,
      ),
    ),
    (
      TokenType::Identifier,
      ParseRule::new(
        Some(|parser, can_assign| parser.variable(can_assign)),
        None,
        Precedence::None,
      ),
    ),
    (
      TokenType::String,
      ParseRule::new(Some(|parser, _| parser.string()), None, Precedence::None),
    ),
    (
      TokenType::Number,
      ParseRule::new(Some(|parser, _| parser.number()), None, Precedence::None),
    ),
    (TokenType::And, ParseRule::new(None, None, Precedence::None)),
    (
      TokenType::Class,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::Else,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::False,
      ParseRule::new(Some(|parser, _| parser.literal()), None, Precedence::None),
    ),
    (TokenType::For, ParseRule::new(None, None, Precedence::None)),
    (TokenType::Fun, ParseRule::new(None, None, Precedence::None)),
    (TokenType::If, ParseRule::new(None, None, Precedence::None)),
    (
      TokenType::Nil,
      ParseRule::new(Some(|parser, _| parser.literal()), None, Precedence::None),
    ),
    (TokenType::Or, ParseRule::new(None, None, Precedence::None)),
    (
      TokenType::Print,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::Return,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::Super,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::This,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::True,
      ParseRule::new(Some(|parser, _| parser.literal()), None, Precedence::None),
    ),
    (TokenType::Var, ParseRule::new(None, None, Precedence::None)),
    (
      TokenType::While,
      ParseRule::new(None, None, Precedence::None),
    ),
    (
      TokenType::Error,
      ParseRule::new(None, None, Precedence::None),
    ),
    (TokenType::Eof, ParseRule::new(None, None, Precedence::None)),
  ]
});

/// ## RULES
///
/// HashMap form of `RULES_VEC`
static RULES: Lazy<HashMap<TokenType, ParseRule>> = Lazy::new(|| {
  let mut map = HashMap::new();
  for (token_type, rule) in RULES_VEC.iter() {
    map.insert(*token_type, *rule);
  }
  map
});

pub struct Parser<'src, 'heap> {
  /// Chunk used for compiling.
  pub(crate) chunk: Chunk,
  /// Scanner in parser
  pub(crate) scanner: Scanner<'src>,
  /// Heap shared with the VM; string literals intern through it.
  pub(crate) heap: &'heap mut Heap,
  /// Current token.
  pub(crate) current: Token<'src>,
  /// Previous token.
  pub(crate) previous: Token<'src>,
  /// If had error.
  pub(crate) had_error: bool,
  /// If in panic mode.
  pub(crate) panic_mode: bool,
  /// Every diagnostic reported so far, in order.
  pub(crate) diagnostics: Vec<String>,
  /// Compiler => handle local variables
  pub(crate) compiler: Compiler<'src>,
}

impl<'src, 'heap> Parser<'src, 'heap> {
  /// Bind a new parser to the source code, interning through `heap`.
  pub fn new(src: &'src str, heap: &'heap mut Heap) -> Self {
    Self {
      chunk: Chunk::default(),
      scanner: Scanner::bind(src),
      heap,
      current: Token::default(),
      previous: Token::default(),
      had_error: false,
      panic_mode: false,
      diagnostics: Vec::new(),
      compiler: Compiler::default(),
    }
  }

  /// Drive the whole compile: declarations until EOF, recovering at
  /// statement boundaries after each reported error.
  ///
  /// Returns the finished chunk iff no diagnostic was reported.
  pub fn compile(mut self) -> Result<Chunk, InterpretError> {
    let _ = self.advance_token();
    while !self.check_token(TokenType::Eof) {
      if self.declaration().is_err() {
        let _ = self.synchronize();
      }
    }
    let _ = self.end_compiler();

    if self.had_error {
      Err(InterpretError::CompileError(self.diagnostics.join("\n")))
    } else {
      Ok(self.chunk)
    }
  }
}

impl<'src, 'heap> Parser<'src, 'heap> {
  /// This function starts at the current token,
  /// then parses any expression at the given precedence level or higher.
  fn parse_precedence(&mut self, precedence: Precedence) -> Result<(), InterpretError> {
    // if it's valid to operate `assign`
    let can_assign = precedence <= Precedence::Assignment;

    // look up `prefix parser` for the `current` token
    self.advance_token()?;
    let prefix_rule = self.get_rule(self.previous.token_type).prefix;
    match prefix_rule {
      Some(prefix_rule) => prefix_rule(self, can_assign)?,
      None => return self.error("Expect expression.".to_owned()),
    }

    // look for `infix parser` for the `next` token.
    while precedence <= self.get_rule(self.current.token_type).precedence {
      self.advance_token()?;
      let infix_rule = self.get_rule(self.previous.token_type).infix;
      if infix_rule.is_none() {
        // no infix rule, so we are done
        break;
      }
      infix_rule.unwrap()(self, can_assign)?;
    }

    // Deal with invalid assignment.
    // (E.g. => {...}; a + b = c * d;)
    if can_assign && self.match_token(TokenType::Equal)? {
      return self.error("Invalid assignment target.".to_owned());
    }

    // done
    Ok(())
  }

  fn get_rule(&self, token_type: TokenType) -> ParseRule {
    *RULES.get(&token_type).unwrap()
  }
}

impl<'src, 'heap> Parser<'src, 'heap> {
  /// Activate parser, move to next token (one step).
  ///
  /// It asks the scanner for the next token and stores it for later use.
  ///
  /// Before doing that, it takes the old current token and stashes that in a previous field.
  pub(crate) fn advance_token(&mut self) -> Result<(), InterpretError> {
    self.previous = self.current;
    loop {
      self.current = self.scanner.scan_token();
      if self.current.token_type != TokenType::Error {
        break;
      }
      self.error_at_current(self.current.lexeme.to_owned())?;
    }
    Ok(())
  }

  /// Try consuming current(last) token, if can't, throw error.
  fn consume_token(
    &mut self,
    token_type: TokenType,
    message: String,
  ) -> Result<(), InterpretError> {
    if self.current.token_type == token_type {
      self.advance_token()?;
      Ok(())
    } else {
      self.error_at_current(message)
    }
  }

  /// Check if current token has the same type with expected.
  fn check_token(&mut self, expected_type: TokenType) -> bool {
    self.current.token_type == expected_type
  }

  /// Execute `check_token`.
  ///
  /// If true, advance token with true returned.
  ///
  /// Else, directly return false.
  pub(crate) fn match_token(&mut self, expected_type: TokenType) -> Result<bool, InterpretError> {
    if !self.check_token(expected_type) {
      Ok(false)
    } else {
      self.advance_token()?;
      Ok(true)
    }
  }

  /// Parse the expression.
  fn expression(&mut self) -> Result<(), InterpretError> {
    self.parse_precedence(Precedence::Assignment)
  }

  /// Step into a block
  fn begin_scope(&mut self) {
    self.compiler.scope_depth += 1;
  }

  /// Step out of a block
  fn end_scope(&mut self) -> Result<(), InterpretError> {
    self.compiler.scope_depth -= 1;
    while !self.compiler.locals.is_empty()
      && self.compiler.locals.last().unwrap().depth > self.compiler.scope_depth
    {
      // lifetime of local variable ends here, call pop instruction
      self.emit_byte(OpCode::Pop as u8)?;
      self.compiler.locals.pop();
    }
    Ok(())
  }

  /// Parse contents in a block
  fn block(&mut self) -> Result<(), InterpretError> {
    while !self.check_token(TokenType::RightBrace) && !self.check_token(TokenType::Eof) {
      self.declaration()?;
    }
    self.consume_token(TokenType::RightBrace, "Expect '}' after block.".to_owned())
  }

  /// Try matching current token as a declaration.
  pub(crate) fn declaration(&mut self) -> Result<(), InterpretError> {
    if self.match_token(TokenType::Var)? {
      self.var_declaration()?;
    } else {
      self.statement()?;
    }
    if self.panic_mode {
      self.synchronize()
    } else {
      Ok(())
    }
  }

  /// Try matching current token as a statement.
  fn statement(&mut self) -> Result<(), InterpretError> {
    if self.match_token(TokenType::Print)? {
      self.print_statement()
    } else if self.match_token(TokenType::LeftBrace)? {
      self.begin_scope();
      self.block()?;
      self.end_scope()?;
      Ok(())
    } else {
      self.expression_statement()
    }
  }
}

impl<'src, 'heap> Parser<'src, 'heap> {
  /// Add a constant to the chunk, bounds-checking its index.
  ///
  /// Constant operands are a single byte, so one chunk holds at most 256
  /// constants; the 257th reports and a placeholder index is returned.
  fn make_constant(&mut self, value: Value) -> Result<u8, InterpretError> {
    let index = self.chunk.add_constant(value);
    if index > u8::MAX as usize {
      self.error("Too many constants in one chunk.".to_owned())?;
      return Ok(0);
    }
    Ok(index as u8)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::Heap;

  fn compile(heap: &mut Heap, src: &str) -> Result<Chunk, InterpretError> {
    Parser::new(src, heap).compile()
  }

  fn compile_err(src: &str) -> String {
    let mut heap = Heap::default();
    match compile(&mut heap, src) {
      Err(InterpretError::CompileError(diagnostics)) => diagnostics,
      other => panic!("expected a compile error, got {other:?}"),
    }
  }

  fn ops(chunk: &Chunk) -> &[u8] {
    &chunk.code
  }

  #[test]
  fn arithmetic_respects_precedence() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "print 1 + 2 * 3;").unwrap();
    assert_eq!(
      ops(&chunk),
      &[
        OpCode::Constant as u8,
        0,
        OpCode::Constant as u8,
        1,
        OpCode::Constant as u8,
        2,
        OpCode::Multiply as u8,
        OpCode::Add as u8,
        OpCode::Print as u8,
        OpCode::Return as u8,
      ]
    );
    assert_eq!(chunk.constants.values[2], Value::number_val(3.0));
  }

  #[test]
  fn grouping_overrides_precedence() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "print (1 + 2) * 3;").unwrap();
    assert_eq!(
      ops(&chunk),
      &[
        OpCode::Constant as u8,
        0,
        OpCode::Constant as u8,
        1,
        OpCode::Add as u8,
        OpCode::Constant as u8,
        2,
        OpCode::Multiply as u8,
        OpCode::Print as u8,
        OpCode::Return as u8,
      ]
    );
  }

  #[test]
  fn negated_comparisons_lower_through_not() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "1 <= 2;").unwrap();
    assert_eq!(
      ops(&chunk)[4..],
      [
        OpCode::Greater as u8,
        OpCode::Not as u8,
        OpCode::Pop as u8,
        OpCode::Return as u8,
      ]
    );

    let chunk = compile(&mut heap, "1 >= 2;").unwrap();
    assert_eq!(ops(&chunk)[4..6], [OpCode::Less as u8, OpCode::Not as u8]);

    let chunk = compile(&mut heap, "1 != 2;").unwrap();
    assert_eq!(ops(&chunk)[4..6], [OpCode::Equal as u8, OpCode::Not as u8]);
  }

  #[test]
  fn literals_have_dedicated_opcodes() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "true; false; nil;").unwrap();
    assert_eq!(
      ops(&chunk),
      &[
        OpCode::True as u8,
        OpCode::Pop as u8,
        OpCode::False as u8,
        OpCode::Pop as u8,
        OpCode::Nil as u8,
        OpCode::Pop as u8,
        OpCode::Return as u8,
      ]
    );
  }

  #[test]
  fn equal_string_literals_share_one_constant_object() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "print \"x\" == \"x\";").unwrap();
    let first = chunk.constants.values[0].as_string().unwrap();
    let second = chunk.constants.values[1].as_string().unwrap();
    assert_eq!(first, second);
    // and the interned object is visible through the shared heap
    assert_eq!(heap.copy_string("x"), first);
  }

  #[test]
  fn string_literal_quotes_are_stripped() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "print \"hi\";").unwrap();
    assert_eq!(chunk.constants.values[0].as_rust_string().unwrap(), "hi");

    let chunk = compile(&mut heap, "print \"\";").unwrap();
    assert_eq!(chunk.constants.values[0].as_rust_string().unwrap(), "");
  }

  #[test]
  fn global_declaration_emits_define() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "var a = 1;").unwrap();
    assert_eq!(
      ops(&chunk),
      &[
        OpCode::Constant as u8,
        1,
        OpCode::DefineGlobal as u8,
        0,
        OpCode::Return as u8,
      ]
    );
    assert_eq!(chunk.constants.values[0].as_rust_string().unwrap(), "a");
  }

  #[test]
  fn global_declaration_without_initializer_defaults_to_nil() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "var a;").unwrap();
    assert_eq!(
      ops(&chunk),
      &[OpCode::Nil as u8, OpCode::DefineGlobal as u8, 0, OpCode::Return as u8]
    );
  }

  #[test]
  fn global_assignment_does_not_pop_inline() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "a = 1;").unwrap();
    assert_eq!(
      ops(&chunk),
      &[
        OpCode::Constant as u8,
        1,
        OpCode::SetGlobal as u8,
        0,
        OpCode::Pop as u8,
        OpCode::Return as u8,
      ]
    );
  }

  #[test]
  fn locals_compile_to_slots_not_names() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "{ var a = 1; print a; a = 2; }").unwrap();
    assert_eq!(
      ops(&chunk),
      &[
        OpCode::Constant as u8,
        0,
        OpCode::GetLocal as u8,
        0,
        OpCode::Print as u8,
        OpCode::Constant as u8,
        1,
        OpCode::SetLocal as u8,
        0,
        OpCode::Pop as u8,
        OpCode::Pop as u8,
        OpCode::Return as u8,
      ]
    );
    // no name constant was interned for the local
    assert!(chunk.constants.values.iter().all(|v| v.is_number()));
  }

  #[test]
  fn inner_scopes_resolve_innermost_shadow() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "{ var a = 1; { var a = 2; print a; } }").unwrap();
    let print_at = chunk
      .code
      .iter()
      .position(|&byte| byte == OpCode::Print as u8)
      .unwrap();
    // the printed slot is the inner `a` (slot 1)
    assert_eq!(
      chunk.code[print_at - 2..print_at],
      [OpCode::GetLocal as u8, 1]
    );
  }

  #[test]
  fn scope_round_trip_restores_compiler_state() {
    let mut heap = Heap::default();
    let mut parser = Parser::new("", &mut heap);
    parser.begin_scope();
    parser.compiler.locals.push(Local {
      name: Token::default(),
      depth: parser.compiler.scope_depth,
    });
    parser.end_scope().unwrap();
    assert_eq!(parser.compiler.scope_depth, 0);
    assert!(parser.compiler.locals.is_empty());
    assert_eq!(parser.chunk.code, vec![OpCode::Pop as u8]);
  }

  #[test]
  fn reading_local_in_its_own_initializer_is_an_error() {
    let diagnostics = compile_err("{ var a = a; }");
    assert!(diagnostics.contains("Can't read local variable in its own initializer."));
  }

  #[test]
  fn global_self_reference_compiles() {
    // at global scope the same shape defers to a runtime lookup
    let mut heap = Heap::default();
    assert!(compile(&mut heap, "var a = a;").is_ok());
  }

  #[test]
  fn duplicate_local_in_same_scope_is_an_error() {
    let diagnostics = compile_err("{ var a = 1; var a = 2; }");
    assert!(diagnostics.contains("Already a variable with this name in this scope."));
    // shadowing in an inner scope is fine
    let mut heap = Heap::default();
    assert!(compile(&mut heap, "{ var a = 1; { var a = 2; } }").is_ok());
  }

  #[test]
  fn invalid_assignment_target_is_reported() {
    let diagnostics = compile_err("var a; var b; var c; a + b = c;");
    assert!(diagnostics.contains("[line 1] Error at '=': Invalid assignment target."));
  }

  #[test]
  fn missing_expression_is_reported() {
    let diagnostics = compile_err("print +;");
    assert!(diagnostics.contains("Expect expression."));
  }

  #[test]
  fn error_at_end_formats_location() {
    let diagnostics = compile_err("print 1");
    assert!(diagnostics.contains("[line 1] Error at end:"));
  }

  #[test]
  fn scanner_errors_surface_without_location_suffix() {
    let diagnostics = compile_err("@");
    assert!(diagnostics.contains("[line 1] Error: Unexpected character."));
  }

  #[test]
  fn synchronize_allows_multiple_diagnostics() {
    let diagnostics = compile_err("print +; print -;\nvar 1 = 2;");
    assert!(diagnostics.contains("Expect expression."));
    assert!(diagnostics.contains("Expect variable name."));
    assert!(diagnostics.matches("Error").count() >= 2);
  }

  #[test]
  fn constant_pool_boundary_is_256() {
    let fits = (0..256).map(|i| format!("print {i};")).collect::<String>();
    let mut heap = Heap::default();
    assert!(compile(&mut heap, &fits).is_ok());

    let overflows = (0..257).map(|i| format!("print {i};")).collect::<String>();
    let diagnostics = compile_err(&overflows);
    assert!(diagnostics.contains("Too many constants in one chunk."));
  }

  #[test]
  fn local_slot_boundary_is_256() {
    let declarations = |n: usize| {
      let mut src = String::from("{");
      for i in 0..n {
        src.push_str(&format!("var l{i};"));
      }
      src.push('}');
      src
    };
    let mut heap = Heap::default();
    assert!(compile(&mut heap, &declarations(256)).is_ok());

    let diagnostics = compile_err(&declarations(257));
    assert!(diagnostics.contains("Too many local variables in function."));
  }

  #[test]
  fn lines_track_every_emitted_byte() {
    let mut heap = Heap::default();
    let chunk = compile(&mut heap, "print 1;\nprint 2;").unwrap();
    assert_eq!(chunk.code.len(), chunk.lines.len());
    assert_eq!(chunk.lines[0], 1);
    assert_eq!(chunk.lines[chunk.code.len() - 2], 2);
  }
}
