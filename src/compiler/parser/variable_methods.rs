use super::*;

impl<'src, 'heap> Parser<'src, 'heap> {
  /// Declare: bind a new variable.
  pub(crate) fn var_declaration(&mut self) -> Result<(), InterpretError> {
    let global_index = self.parse_variable("Expect variable name.".to_owned())?;

    if self.match_token(TokenType::Equal)? {
      self.expression()?;
    } else {
      self.emit_byte(OpCode::Nil as u8)?;
    }

    self.consume_token(
      TokenType::Semicolon,
      "Expect ';' after variable declaration.".to_owned(),
    )?;

    self.define_variable(global_index)
  }

  /// Consume the variable name and declare it.
  ///
  /// Returns the name's constant index for globals; locals live in stack
  /// slots, not the constant pool, so a placeholder is returned instead.
  fn parse_variable(&mut self, message: String) -> Result<u8, InterpretError> {
    self.consume_token(TokenType::Identifier, message)?;

    // record if it's a local variable (scope_depth > 0)
    self.declare_variable()?;

    // if in local scope, simply exit (with a fake index)
    if self.compiler.scope_depth > 0 {
      return Ok(0);
    }

    self.identifier_constant(self.previous)
  }

  /// The freshly declared local is now usable by later expressions.
  fn mark_initialized(&mut self) {
    if let Some(local) = self.compiler.locals.last_mut() {
      local.depth = self.compiler.scope_depth;
    }
  }

  fn define_variable(&mut self, global_index: u8) -> Result<(), InterpretError> {
    if self.compiler.scope_depth > 0 {
      self.mark_initialized();
      Ok(())
    } else {
      self.emit_bytes(&[OpCode::DefineGlobal as u8, global_index])
    }
  }

  /// Records the existence of variable (only for locals).
  fn declare_variable(&mut self) -> Result<(), InterpretError> {
    if self.compiler.scope_depth == 0 {
      return Ok(());
    }

    // Detect error => two variables with same name
    // in the same local scope.
    for local in self.compiler.locals.iter().rev() {
      if local.depth != -1 && local.depth < self.compiler.scope_depth {
        break;
      }
      if local.name.lexeme == self.previous.lexeme {
        return self.error("Already a variable with this name in this scope.".to_owned());
      }
    }

    self.add_local(self.previous)
  }

  /// Push a new local slot, declared but not yet initialized.
  fn add_local(&mut self, name: Token<'src>) -> Result<(), InterpretError> {
    if self.compiler.locals.len() >= crate::common::LOCALS_MAX {
      return self.error("Too many local variables in function.".to_owned());
    }
    self.compiler.locals.push(Local { name, depth: -1 });
    Ok(())
  }

  /// Intern the identifier's name and store it in the constant pool.
  pub(crate) fn identifier_constant(&mut self, name: Token<'src>) -> Result<u8, InterpretError> {
    let obj_string = self.heap.copy_string(name.lexeme);
    self.make_constant(Value::obj_val(obj_string.cast()))
  }

  /// Try to find the local variable with this name.
  ///
  /// Walks the slots from top to bottom so the innermost shadowing
  /// declaration wins. A hit on a slot still marked uninitialized means
  /// the variable appears in its own initializer.
  pub(crate) fn resolve_local(&mut self, name: Token<'src>) -> Result<Option<u8>, InterpretError> {
    let pos = self
      .compiler
      .locals
      .iter()
      .rposition(|local| local.name.lexeme == name.lexeme);
    if let Some(pos) = pos {
      if self.compiler.locals[pos].depth == -1 {
        self.error("Can't read local variable in its own initializer.".to_owned())?;
      }
      return Ok(Some(pos as u8));
    }
    Ok(None)
  }

  /// Emit the get or set form of a variable reference, resolving locals
  /// first and falling back to a global by name.
  pub(crate) fn named_variable(&mut self, can_assign: bool) -> Result<(), InterpretError> {
    let name = self.previous;
    let (arg, get_op, set_op) = match self.resolve_local(name)? {
      Some(slot) => (slot, OpCode::GetLocal, OpCode::SetLocal),
      None => (
        self.identifier_constant(name)?,
        OpCode::GetGlobal,
        OpCode::SetGlobal,
      ),
    };
    if can_assign && self.match_token(TokenType::Equal)? {
      self.expression()?;
      self.emit_bytes(&[set_op as u8, arg])
    } else {
      self.emit_bytes(&[get_op as u8, arg])
    }
  }
}
