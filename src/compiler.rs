//! # Compiler
//!
//! The compiler is responsible for compiling source_code into bytecode,
//! in a single forward pass over the token stream (no AST).
//!
//! The Pratt-parsing machinery lives in the [`parser`] submodule; this
//! module holds the pieces it parses *with*: the precedence ladder and
//! the lexical-scope context (local slots, scope depth).

use crate::{
  chunk::Chunk,
  scanner::Token,
  vm::{InterpretError, VM},
};

pub mod parser;

use parser::Parser;

/// ## Precedence
///
/// Operator precedence levels, from lowest to highest. The discriminant
/// order is what `parse_precedence` climbs.
#[repr(u8)]
#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, enum_repr::EnumFromU8,
)]
pub enum Precedence {
  #[default]
  None = 0,
  Assignment, // =
  Or,         // or
  And,        // and
  Equality,   // == !=
  Comparison, // < > <= >=
  Term,       // + -
  Factor,     // * /
  Unary,      // ! -
  Call,       // . ()
  Primary,
}

impl Precedence {
  /// One level tighter. Used by left-associative binary operators.
  pub(crate) fn next(self) -> Self {
    (self as u8 + 1).into()
  }
}

/// ## Local
///
/// One compile-time local-variable slot.
///
/// `depth == -1` marks a local that is declared but not yet initialized,
/// so its own initializer cannot read it.
#[derive(Debug, Clone, Copy)]
pub struct Local<'src> {
  pub(crate) name: Token<'src>,
  pub(crate) depth: i32,
}

/// ## Compiler
///
/// The lexical-scope context threaded through the parser: the stack of
/// in-scope locals and the current block-nesting depth (0 is global).
#[derive(Debug, Default)]
pub struct Compiler<'src> {
  pub(crate) locals: Vec<Local<'src>>,
  pub(crate) scope_depth: i32,
}

impl VM {
  /// Compile the given source into a chunk, interning its string literals
  /// through this VM's heap.
  pub(crate) fn compile(&mut self, src: &str) -> Result<Chunk, InterpretError> {
    Parser::new(src, &mut self.heap).compile()
  }
}
