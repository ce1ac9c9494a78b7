//! # Chunk
//!
//! A module which represents a sequence of bytecode,
//! with it's dependent components.

use crate::{
  utils::Init,
  value::{Value, ValueArray},
};
use enum_repr::EnumFromU8;

/// ## OpCode
///
/// An enum which represents the different opcodes used in the
/// virtual machine.
///
/// One byte each; `Constant` and the variable opcodes carry one operand
/// byte (a constant-pool index or a stack slot). The derived `From<u8>`
/// panics on bytes the compiler never emits.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumFromU8)]
pub enum OpCode {
  Constant = 0,
  Nil,
  True,
  False,
  Pop,
  GetLocal,
  SetLocal,
  GetGlobal,
  DefineGlobal,
  SetGlobal,
  Equal,
  Greater,
  Less,
  Add,
  Subtract,
  Multiply,
  Divide,
  Not,
  Negate,
  Print,
  Return,
}

/// ## Chunk
///
/// A struct which represents a chunk/sequence of bytecode.
///
/// `lines` is parallel to `code`: it maps every byte offset to the source
/// line it came from, for diagnostics only.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
  pub(crate) code: Vec<u8>,
  pub(crate) lines: Vec<usize>,
  pub(crate) constants: ValueArray,
}

impl Chunk {
  /// Write a byte to the given chunk.
  pub fn write_chunk(&mut self, byte: u8, line: usize) {
    self.code.push(byte);
    self.lines.push(line);
  }

  /// Add a constant to the given chunk,
  /// then return it's index.
  pub fn add_constant(&mut self, value: Value) -> usize {
    self.constants.write(value);
    self.constants.values.len() - 1
  }

  /// Clear the given chunk.
  pub fn clear(&mut self) {
    self.code.clear();
    self.lines.clear();
    self.constants.clear();
  }
}

impl Init for Chunk {}
