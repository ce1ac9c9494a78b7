//! # Common
//!
//! Common limits shared by the compiler and the virtual machine.

/// Number of distinct values a one-byte operand can hold.
pub const U8_COUNT: usize = u8::MAX as usize + 1;

/// Maximum depth of the VM's value stack.
pub const STACK_MAX: usize = 256;

/// Maximum number of local variables in scope at once.
///
/// Local slots are addressed by a one-byte operand.
pub const LOCALS_MAX: usize = U8_COUNT;
