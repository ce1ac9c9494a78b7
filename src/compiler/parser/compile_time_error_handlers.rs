use super::*;

impl<'src, 'heap> Parser<'src, 'heap> {
  /// Report error at current token.
  pub(crate) fn error_at_current(&mut self, message: String) -> Result<(), InterpretError> {
    self.error_at(true, message)
  }

  // Report error at previous token.
  pub(crate) fn error(&mut self, message: String) -> Result<(), InterpretError> {
    self.error_at(false, message)
  }

  /// Report error at selected token.
  ///
  /// The diagnostic goes to stderr immediately and is recorded for the
  /// final `CompileError`. While panic mode is set, further reports are
  /// suppressed until the driver synchronizes.
  pub(crate) fn error_at(
    &mut self,
    if_current: bool,
    message: String,
  ) -> Result<(), InterpretError> {
    if self.panic_mode {
      return Ok(());
    }
    self.panic_mode = true;
    let token = if if_current {
      &self.current
    } else {
      &self.previous
    };
    let mut error_str = String::new();
    error_str += &format!("[line {}] Error", token.line);
    match token.token_type {
      TokenType::Eof => error_str += " at end",
      // the message of an error token is the diagnostic itself
      TokenType::Error => {}
      _ => error_str += &format!(" at '{}'", token.lexeme),
    }
    error_str += &format!(": {}", message);
    eprintln!("{}", error_str);
    self.had_error = true;
    self.diagnostics.push(error_str.clone());
    Err(InterpretError::CompileError(error_str))
  }
}
