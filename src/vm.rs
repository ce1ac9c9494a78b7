//! # VM
//!
//! ## Based on Stack
//!
//! The VM (aka. Virtual Machine) is the core of the interpreter.
//!
//! It is responsible for:
//!
//! - executing the bytecode
//!
//! Execution is strictly in-order: side effects (`print`, runtime errors)
//! observe program order, and a runtime error halts the machine after
//! resetting the value stack.

use std::ptr::NonNull;

#[cfg(feature = "debug_trace_execution")]
use crate::debug::Debug;
use crate::{
  chunk::{Chunk, OpCode},
  common::STACK_MAX,
  memory::Heap,
  object::ObjString,
  table::Table,
  utils::Init,
  value::Value,
};

/// ## InterpretError
///
/// An enum which represents the different errors that can occur
/// during the interpretation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InterpretError {
  /// One or more compile diagnostics, newline-separated.
  #[error("{0}")]
  CompileError(String),
  /// The message of the single error that halted execution.
  #[error("{0}")]
  RuntimeError(String),
}

/// ## VM
///
/// A struct which represents the virtual machine.
#[derive(Debug, Default)]
pub struct VM {
  /// The chunk currently being executed.
  pub(crate) chunk: Chunk,
  /// The instruction pointer (actually, the index).
  pub(crate) ip: usize,
  /// The stack of the virtual machine.
  pub(crate) stack: Vec<Value>,
  /// All globals.
  pub(crate) globals: Table,
  /// Owner of every object, plus the string-interning table.
  pub(crate) heap: Heap,
}

impl Init for VM {}

impl VM {
  /// Interpret from string.
  ///
  /// Compiles, then runs; the bytecode is never executed when any
  /// compile diagnostic was reported.
  pub fn interpret(&mut self, src: &str) -> Result<(), InterpretError> {
    let chunk = self.compile(src)?;
    self.rebind(chunk);
    self.run()
  }

  /// Interpret from file(path).
  pub fn interpret_file(&mut self, path: &str) -> Result<(), InterpretError> {
    use std::fs::read_to_string;
    if let Ok(content) = read_to_string(path) {
      self.interpret(&content)
    } else {
      Err(InterpretError::CompileError(
        "Failed to interpret from file.".to_owned(),
      ))
    }
  }

  /// Link the given chunk to the virtual machine, then interpret it.
  pub fn interpret_chunk(&mut self, chunk: Chunk) -> Result<(), InterpretError> {
    self.rebind(chunk);
    self.run()
  }
}

impl VM {
  fn unary_op<T>(&mut self, op: T) -> Result<(), InterpretError>
  where
    T: Fn(Value) -> Result<Value, InterpretError>,
  {
    let value = self.pop()?;
    let result = op(value)?;
    self.push(result)
  }

  fn binary_op<T>(&mut self, op: T) -> Result<(), InterpretError>
  where
    T: Fn(Value, Value) -> Result<Value, InterpretError>,
  {
    let rhs = self.pop()?;
    let lhs = self.pop()?;
    let result = op(lhs, rhs)?;
    self.push(result)
  }
}

impl VM {
  fn push(&mut self, value: Value) -> Result<(), InterpretError> {
    if self.stack.len() >= STACK_MAX {
      return Err(InterpretError::RuntimeError("Stack overflow.".to_owned()));
    }
    self.stack.push(value);
    Ok(())
  }

  fn pop(&mut self) -> Result<Value, InterpretError> {
    self.stack.pop().ok_or_else(|| {
      InterpretError::RuntimeError("Operate on an empty stack.".to_owned())
    })
  }

  fn peek(&self, distance: usize) -> Result<Value, InterpretError> {
    let len = self.stack.len();
    if distance >= len {
      return Err(InterpretError::RuntimeError(
        "Operate on an empty stack.".to_owned(),
      ));
    }
    Ok(self.stack[len - 1 - distance])
  }
}

impl VM {
  /// Read a byte from the chunk (update ip).
  fn read_byte(&mut self) -> u8 {
    let byte = self.chunk.code[self.ip];
    self.ip += 1;
    byte
  }

  /// Read a constant from the chunk (update ip).
  fn read_constant(&mut self) -> Value {
    let index = self.read_byte();
    self.chunk.constants.values[index as usize]
  }

  /// Read a constant that is known to be an interned name (update ip).
  fn read_string(&mut self) -> Result<NonNull<ObjString>, InterpretError> {
    self.read_constant().as_string()
  }
}

impl VM {
  /// Trace VM's stack.
  ///
  /// This function is only available when the feature
  /// `debug_trace_stack` is enabled.
  #[cfg(feature = "debug_trace_stack")]
  pub fn trace_stack(&self) {
    print!("        | ");
    print!("[");
    for (i, value) in self.stack.iter().enumerate() {
      print!("{}", value);
      if i != self.stack.len() - 1 {
        print!(", ");
      }
    }
    println!("]")
  }
}

impl VM {
  /// Run the virtual machine (with a valid chunk linked).
  pub fn run(&mut self) -> Result<(), InterpretError> {
    while self.ip < self.chunk.code.len() {
      #[cfg(feature = "debug_trace_stack")]
      self.trace_stack();
      #[cfg(feature = "debug_trace_execution")]
      self.chunk.disassemble_instruction(self.ip);
      if self.run_one_step()? {
        break;
      }
    }
    Ok(())
  }

  /// Dispatch a single instruction. Returns `true` on a halt.
  #[inline]
  fn run_one_step(&mut self) -> Result<bool, InterpretError> {
    let raw_result = match self.read_byte().into() {
      /* Constants */
      OpCode::Constant => {
        let constant = self.read_constant();
        self.push(constant)
      }
      OpCode::Nil => self.push(Value::nil_val()),
      OpCode::True => self.push(Value::bool_val(true)),
      OpCode::False => self.push(Value::bool_val(false)),
      /* Comparisons */
      OpCode::Equal => self.binary_op(|l, r| Ok(Value::bool_val(l == r))),
      OpCode::Greater => self.binary_op(|l, r| {
        if l.is_number() && r.is_number() {
          Ok(Value::bool_val(l.as_number() > r.as_number()))
        } else {
          Err(InterpretError::RuntimeError(
            "Operands must be numbers.".to_owned(),
          ))
        }
      }),
      OpCode::Less => self.binary_op(|l, r| {
        if l.is_number() && r.is_number() {
          Ok(Value::bool_val(l.as_number() < r.as_number()))
        } else {
          Err(InterpretError::RuntimeError(
            "Operands must be numbers.".to_owned(),
          ))
        }
      }),
      /* Binary Arith Opts */
      OpCode::Add => {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        if lhs.is_string() && rhs.is_string() {
          self.concatenate(lhs, rhs)
        } else if lhs.is_number() && rhs.is_number() {
          self.push(Value::number_val(lhs.as_number() + rhs.as_number()))
        } else {
          Err(InterpretError::RuntimeError(
            "Operands must be two numbers or two strings.".to_owned(),
          ))
        }
      }
      OpCode::Subtract => self.binary_op(|l, r| l - r),
      OpCode::Multiply => self.binary_op(|l, r| l * r),
      OpCode::Divide => self.binary_op(|l, r| l / r),
      /* Unary Arith Opts */
      OpCode::Not => self.unary_op(|v| !v),
      OpCode::Negate => self.unary_op(|v| -v),
      /* Helper Opts */
      OpCode::Print => {
        let value = self.pop()?;
        println!("{}", value);
        Ok(())
      }
      OpCode::Pop => self.pop().map(|_| ()),
      /* Variable Getters/Setters */
      OpCode::DefineGlobal => {
        let name = self.read_string()?;
        let value = self.peek(0)?;
        self.globals.set(name, value);
        self.pop().map(|_| ())
      }
      OpCode::GetGlobal => {
        let name = self.read_string()?;
        match self.globals.get(name) {
          Some(value) => self.push(value),
          None => Err(InterpretError::RuntimeError(format!(
            "Undefined variable '{}'.",
            unsafe { name.as_ref() }
          ))),
        }
      }
      OpCode::SetGlobal => {
        let name = self.read_string()?;
        let value = self.peek(0)?;
        if self.globals.set(name, value) {
          // the insert was only a probe; assignment must not create
          // an undeclared global
          self.globals.delete(name);
          Err(InterpretError::RuntimeError(format!(
            "Undefined variable '{}'.",
            unsafe { name.as_ref() }
          )))
        } else {
          Ok(())
        }
      }
      OpCode::GetLocal => {
        let slot = self.read_byte() as usize;
        match self.stack.get(slot).copied() {
          Some(value) => self.push(value),
          None => Err(InterpretError::RuntimeError(format!(
            "Undefined local variable at slot {}.",
            slot
          ))),
        }
      }
      OpCode::SetLocal => {
        let slot = self.read_byte() as usize;
        let top = self.peek(0)?;
        match self.stack.get_mut(slot) {
          Some(value) => {
            *value = top;
            Ok(())
          }
          None => Err(InterpretError::RuntimeError(format!(
            "Undefined local variable at slot {}.",
            slot
          ))),
        }
      }
      /* Return */
      OpCode::Return => {
        return Ok(true);
      }
    };
    match raw_result {
      Err(InterpretError::RuntimeError(message)) => self.runtime_error(message).map(|_| false),
      other => other.map(|_| false),
    }
  }

  /// Allocate the concatenation of two strings, interning the result.
  fn concatenate(&mut self, lhs: Value, rhs: Value) -> Result<(), InterpretError> {
    let lhs = lhs.as_rust_string()?;
    let rhs = rhs.as_rust_string()?;
    let mut buffer = String::with_capacity(lhs.len() + rhs.len());
    buffer.push_str(lhs);
    buffer.push_str(rhs);
    let obj_string = self.heap.take_string(buffer);
    self.push(Value::obj_val(obj_string.cast()))
  }
}

impl VM {
  /// Report a runtime error and reset the stack.
  pub fn runtime_error(&mut self, message: String) -> Result<(), InterpretError> {
    // Index should be `ip - 1`, as ip has increased before error occurred.
    let inst_index = self.ip - 1;
    let line = self.chunk.lines[inst_index];

    eprintln!("{}", message);
    eprintln!("[line {}] in script", line);

    self.stack.clear();

    Err(InterpretError::RuntimeError(message))
  }
}

impl VM {
  /// Release everything the machine owns.
  pub fn free(&mut self) {
    self.chunk.clear();
    self.ip = 0;
    self.stack.clear();
    self.globals.free();
    self.heap.strings.free();
    self.heap.free_objects();
  }

  /// Rebind the virtual machine to the given chunk.
  pub fn rebind(&mut self, chunk: Chunk) {
    self.chunk = chunk;
    self.ip = 0;
  }
}
