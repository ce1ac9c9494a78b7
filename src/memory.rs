//! # Memory
//!
//! This module is mainly about memory management.
//!
//! The [`Heap`] owns every object the compiler or the VM allocates: each
//! allocation is pushed onto an intrusive list rooted here, and the whole
//! list is walked and freed at teardown. String construction always goes
//! through the interning table, so two syntactically equal strings share
//! one allocation and compare equal by pointer.

use crate::{
  object::{hash_string, Obj, ObjString, ObjTrait, ObjType},
  table::Table,
  utils::Init,
  value::Value,
};
use std::ptr::NonNull;

/// ## Heap
///
/// Owner of all heap objects, plus the string-interning table.
#[derive(Debug, Default)]
pub struct Heap {
  /// Head of the intrusive list of every live object.
  pub(crate) objects: Option<NonNull<Obj>>,
  /// Interning table, used as a set: values are always `nil`.
  pub(crate) strings: Table,
}

impl Init for Heap {}

impl Heap {
  /// Intern the given slice, copying it only on an interning miss.
  pub fn copy_string(&mut self, chars: &str) -> NonNull<ObjString> {
    let hash = hash_string(chars.as_bytes());
    if let Some(interned) = self.strings.find_string(chars, hash) {
      return interned;
    }
    self.allocate_string(chars.to_owned(), hash)
  }

  /// Intern the given buffer, taking ownership of it.
  ///
  /// On an interning hit the buffer is freed and the existing object
  /// returned, so the caller must not assume its allocation survives.
  pub fn take_string(&mut self, chars: String) -> NonNull<ObjString> {
    let hash = hash_string(chars.as_bytes());
    if let Some(interned) = self.strings.find_string(&chars, hash) {
      drop(chars);
      return interned;
    }
    self.allocate_string(chars, hash)
  }

  fn allocate_string(&mut self, data: String, hash: u32) -> NonNull<ObjString> {
    let string = ObjString {
      obj: Obj::new(ObjType::String, self.objects),
      hash,
      data,
    };
    let obj_ptr = string.cast_to_obj_ptr();
    self.objects = Some(obj_ptr);
    let string_ptr = obj_ptr.cast::<ObjString>();
    self.strings.set(string_ptr, Value::nil_val());
    string_ptr
  }
}

impl Heap {
  /// Walk the object list and free every allocation.
  pub fn free_objects(&mut self) {
    let mut head = self.objects.take();
    while let Some(obj) = head {
      head = unsafe { obj.as_ref() }.next;
      match unsafe { obj.as_ref() }.obj_type {
        ObjType::String => drop(unsafe { Box::from_raw(obj.cast::<ObjString>().as_ptr()) }),
      }
    }
  }
}

impl Drop for Heap {
  fn drop(&mut self) {
    // the interning table holds no owning references to its keys,
    // so it goes first
    self.strings.free();
    self.free_objects();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn copy_string_interns() {
    let mut heap = Heap::init();
    let a = heap.copy_string("hello");
    let b = heap.copy_string("hello");
    let c = heap.copy_string("world");
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn take_string_frees_duplicate_buffers() {
    let mut heap = Heap::init();
    let first = heap.take_string("concat".to_owned());
    let second = heap.take_string("concat".to_owned());
    assert_eq!(first, second);
  }

  #[test]
  fn intern_is_idempotent() {
    let mut heap = Heap::init();
    let once = heap.copy_string("idem");
    let data = unsafe { once.as_ref() }.data.clone();
    let twice = heap.copy_string(&data);
    assert_eq!(once, twice);
  }

  #[test]
  fn empty_string_is_a_valid_interned_object() {
    let mut heap = Heap::init();
    let empty = heap.copy_string("");
    assert_eq!(unsafe { empty.as_ref() }.data, "");
    assert_eq!(heap.copy_string(""), empty);
  }

  #[test]
  fn free_objects_empties_the_list_and_allows_reuse() {
    let mut heap = Heap::init();
    heap.copy_string("one");
    heap.copy_string("two");
    assert!(heap.objects.is_some());
    heap.strings.free();
    heap.free_objects();
    assert!(heap.objects.is_none());
    heap.copy_string("three");
    assert!(heap.objects.is_some());
  }
}
