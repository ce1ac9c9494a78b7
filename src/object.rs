//! # Object
//!
//! This module mainly defines the `Object` type, which is the type of the
//! heap-allocated values in the virtual machine.
//!
//! Every object starts with an [`Obj`] header, so a pointer to a concrete
//! object type can be cast to a pointer to `Obj` and back (both are
//! `#[repr(C)]` with the header first). The header also carries the
//! intrusive `next` link which threads every allocation onto the heap's
//! deallocation list.

use crate::{
  value::{ValUnion, Value, ValueType},
  vm::InterpretError,
};
use std::{fmt::Display, ptr::NonNull};

/// ## Object Type
///
/// An enum which represents the type of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
  String,
}

/// ## Object
///
/// The meta type of all `objects` in the virtual machine.
#[derive(Debug)]
pub struct Obj {
  pub(crate) obj_type: ObjType,
  /// Next object on the heap's intrusive list.
  pub(crate) next: Option<NonNull<Obj>>,
}

impl Obj {
  pub fn new(obj_type: ObjType, next: Option<NonNull<Obj>>) -> Self {
    Self { obj_type, next }
  }
}

/// ## Object Trait
///
/// A helper trait of meta type `Object`
pub trait ObjTrait {
  fn cast_to_obj_ptr(self) -> NonNull<Obj>;
}

/// FNV-1a over the raw bytes (32-bit wraparound).
pub fn hash_string(bytes: &[u8]) -> u32 {
  let mut hash: u32 = 2166136261;
  for &byte in bytes {
    hash ^= byte as u32;
    hash = hash.wrapping_mul(16777619);
  }
  hash
}

impl Value {
  pub(crate) fn format_object(&self) -> String {
    match self.obj_type() {
      Ok(ObjType::String) => self
        .as_rust_string()
        .map(str::to_owned)
        .unwrap_or_default(),
      Err(_) => String::new(),
    }
  }
}

impl Value {
  pub fn obj_val(value: NonNull<Obj>) -> Self {
    Self {
      value_type: ValueType::Obj,
      val_union: ValUnion { obj: value },
    }
  }

  pub fn is_obj(&self) -> bool {
    self.value_type == ValueType::Obj
  }

  pub fn as_obj(&self) -> NonNull<Obj> {
    unsafe { self.val_union.obj }
  }
}

impl Value {
  pub fn obj_type(&self) -> Result<ObjType, InterpretError> {
    match self.value_type {
      ValueType::Obj => Ok(unsafe { self.val_union.obj.as_ref() }.obj_type),
      _ => Err(InterpretError::RuntimeError(
        "Value is not an object.".into(),
      )),
    }
  }

  fn is_obj_type(&self, expect: ObjType) -> bool {
    self.is_obj() && unsafe { self.val_union.obj.as_ref() }.obj_type == expect
  }
}

/// ## Object String
///
/// The type of the string object. Carries its FNV-1a hash so table probes
/// never rehash the bytes.
#[repr(C)]
#[derive(Debug)]
pub struct ObjString {
  pub(crate) obj: Obj,
  pub(crate) hash: u32,
  pub(crate) data: String,
}

impl ObjTrait for ObjString {
  fn cast_to_obj_ptr(self) -> NonNull<Obj> {
    NonNull::new(Box::into_raw(Box::new(self))).unwrap().cast()
  }
}

impl Display for ObjString {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.data)
  }
}

impl Value {
  pub fn is_string(&self) -> bool {
    self.is_obj_type(ObjType::String)
  }

  pub fn as_string(&self) -> Result<NonNull<ObjString>, InterpretError> {
    if self.is_string() {
      Ok(self.as_obj().cast())
    } else {
      Err(InterpretError::RuntimeError(
        "Value is not a string.".into(),
      ))
    }
  }

  pub fn as_rust_string(&self) -> Result<&str, InterpretError> {
    let str_ref = &unsafe { self.as_string()?.as_ref() }.data;
    Ok(str_ref)
  }
}
