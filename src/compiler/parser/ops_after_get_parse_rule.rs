use super::*;

impl<'src, 'heap> Parser<'src, 'heap> {
  pub(crate) fn number(&mut self) -> Result<(), InterpretError> {
    match self.previous.lexeme.parse::<f64>() {
      Ok(value) => self.emit_constant(value.into()),
      Err(_) => self.error("Failed to parse number literal.".to_owned()),
    }
  }

  /// Intern the literal's interior bytes (the lexeme still carries its
  /// quotes) and emit the interned object as a constant.
  pub(crate) fn string(&mut self) -> Result<(), InterpretError> {
    let lexeme = self.previous.lexeme;
    let contents = &lexeme[1..lexeme.len() - 1];
    let obj_string = self.heap.copy_string(contents);
    self.emit_constant(Value::obj_val(obj_string.cast()))
  }

  pub(crate) fn variable(&mut self, can_assign: bool) -> Result<(), InterpretError> {
    self.named_variable(can_assign)
  }

  pub(crate) fn unary(&mut self) -> Result<(), InterpretError> {
    let operator_type = self.previous.token_type;

    // Compile the operand
    self.parse_precedence(Precedence::Unary)?;

    // Emit the operator instruction
    match operator_type {
      TokenType::Bang => self.emit_byte(OpCode::Not as u8),
      TokenType::Minus => self.emit_byte(OpCode::Negate as u8),
      _ => self.error("Unknown unary operator.".to_owned()),
    }
  }

  /// Left-associative binary operator: parse the right operand one level
  /// tighter, then emit.
  ///
  /// `!= <= >=` have no opcode of their own; they lower to the
  /// complementary comparison plus `Not`, which keeps IEEE-754 semantics
  /// for NaN operands.
  pub(crate) fn binary(&mut self) -> Result<(), InterpretError> {
    let operator_type = self.previous.token_type;
    let rule = self.get_rule(operator_type);
    self.parse_precedence(rule.precedence.next())?;

    match operator_type {
      TokenType::BangEqual => self.emit_bytes(&[OpCode::Equal as u8, OpCode::Not as u8]),
      TokenType::EqualEqual => self.emit_byte(OpCode::Equal as u8),
      TokenType::Greater => self.emit_byte(OpCode::Greater as u8),
      TokenType::GreaterEqual => self.emit_bytes(&[OpCode::Less as u8, OpCode::Not as u8]),
      TokenType::Less => self.emit_byte(OpCode::Less as u8),
      TokenType::LessEqual => self.emit_bytes(&[OpCode::Greater as u8, OpCode::Not as u8]),
      TokenType::Plus => self.emit_byte(OpCode::Add as u8),
      TokenType::Minus => self.emit_byte(OpCode::Subtract as u8),
      TokenType::Star => self.emit_byte(OpCode::Multiply as u8),
      TokenType::Slash => self.emit_byte(OpCode::Divide as u8),
      _ => self.error("Unknown binary operator.".to_owned()),
    }
  }

  pub(crate) fn literal(&mut self) -> Result<(), InterpretError> {
    match self.previous.token_type {
      TokenType::False => self.emit_byte(OpCode::False as u8),
      TokenType::Nil => self.emit_byte(OpCode::Nil as u8),
      TokenType::True => self.emit_byte(OpCode::True as u8),
      _ => self.error("Unknown literal.".to_owned()),
    }
  }

  pub(crate) fn grouping(&mut self) -> Result<(), InterpretError> {
    self.expression()?;
    self.consume_token(
      TokenType::RightParen,
      "Expect ')' after expression.".to_owned(),
    )
  }
}
