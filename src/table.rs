//! # Table
//!
//! An open-addressing hash table with linear probing and tombstones,
//! keyed by interned strings.
//!
//! Because every key is interned, key comparison is pointer comparison;
//! the stored hash is only used to pick the starting bucket. Deletion
//! leaves a tombstone (`key == None`, `value == true`) so probe chains
//! stay intact; insertion reuses the first tombstone it passed.

use std::ptr::NonNull;

use crate::{object::ObjString, utils::Init, value::Value};

const TABLE_MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
  pub(crate) key: Option<NonNull<ObjString>>,
  pub(crate) value: Value,
}

impl Default for Entry {
  fn default() -> Self {
    Self {
      key: None,
      value: Value::nil_val(),
    }
  }
}

impl Entry {
  fn is_tombstone(&self) -> bool {
    self.key.is_none() && !self.value.is_nil()
  }
}

/// ## Table
///
/// `{interned string: Value}` pairs. `count` includes tombstones; it is
/// rebuilt from live entries on every resize.
#[derive(Debug, Default)]
pub struct Table {
  pub(crate) count: usize,
  pub(crate) entries: Vec<Entry>,
}

impl Init for Table {}

impl Table {
  /// Index of the entry for `key`: its live slot if present, otherwise the
  /// first tombstone passed or, failing that, the first empty slot.
  fn find_entry(entries: &[Entry], key: NonNull<ObjString>) -> usize {
    let cap = entries.len();
    let mut idx = unsafe { key.as_ref() }.hash as usize % cap;
    let mut tombstone = None;

    loop {
      let entry = &entries[idx];
      match entry.key {
        Some(stored) if stored == key => return idx,
        Some(_) => {}
        None if entry.is_tombstone() => {
          if tombstone.is_none() {
            tombstone = Some(idx);
          }
        }
        // truly empty: a passed tombstone is preferred for insertion
        None => return tombstone.unwrap_or(idx),
      }
      idx = (idx + 1) % cap;
    }
  }

  fn adjust_capacity(&mut self, cap: usize) {
    let old = std::mem::replace(&mut self.entries, vec![Entry::default(); cap]);
    // tombstones are dropped here, so the count is rebuilt from live entries
    self.count = 0;
    for entry in old {
      if let Some(key) = entry.key {
        let idx = Self::find_entry(&self.entries, key);
        self.entries[idx] = entry;
        self.count += 1;
      }
    }
  }

  fn grow_capacity(cap: usize) -> usize {
    std::cmp::max(8, cap * 2)
  }
}

impl Table {
  pub fn get(&self, key: NonNull<ObjString>) -> Option<Value> {
    if self.count == 0 {
      return None;
    }
    let entry = &self.entries[Self::find_entry(&self.entries, key)];
    entry.key.map(|_| entry.value)
  }

  /// Insert or overwrite. Returns `true` iff `key` was not present.
  pub fn set(&mut self, key: NonNull<ObjString>, value: Value) -> bool {
    if (self.count + 1) as f64 > self.entries.len() as f64 * TABLE_MAX_LOAD {
      self.adjust_capacity(Self::grow_capacity(self.entries.len()));
    }

    let idx = Self::find_entry(&self.entries, key);
    let entry = &mut self.entries[idx];
    let is_new_key = entry.key.is_none();
    // a reused tombstone is already accounted for in `count`
    if is_new_key && entry.value.is_nil() {
      self.count += 1;
    }
    entry.key = Some(key);
    entry.value = value;
    is_new_key
  }

  /// Replace the entry with a tombstone. `count` is not decremented.
  pub fn delete(&mut self, key: NonNull<ObjString>) -> bool {
    if self.count == 0 {
      return false;
    }
    let idx = Self::find_entry(&self.entries, key);
    let entry = &mut self.entries[idx];
    if entry.key.is_none() {
      return false;
    }
    entry.key = None;
    entry.value = Value::bool_val(true);
    true
  }

  /// Copy every live entry of `from` into `to`.
  pub fn add_all(from: &Table, to: &mut Table) {
    for entry in &from.entries {
      if let Some(key) = entry.key {
        to.set(key, entry.value);
      }
    }
  }

  /// The interning probe: find a stored key equal to `chars` by content.
  ///
  /// This is the one place keys are compared by bytes instead of by
  /// pointer (the candidate is not interned yet).
  pub fn find_string(&self, chars: &str, hash: u32) -> Option<NonNull<ObjString>> {
    if self.count == 0 {
      return None;
    }
    let cap = self.entries.len();
    let mut idx = hash as usize % cap;

    loop {
      let entry = &self.entries[idx];
      match entry.key {
        // tombstones keep the probe chain alive
        None if entry.is_tombstone() => {}
        None => return None,
        Some(key) => {
          let stored = unsafe { key.as_ref() };
          if stored.data.len() == chars.len() && stored.hash == hash && stored.data == chars {
            return Some(key);
          }
        }
      }
      idx = (idx + 1) % cap;
    }
  }

  pub fn free(&mut self) {
    self.entries = Vec::new();
    self.count = 0;
  }
}

impl Table {
  /// Number of live (non-tombstone) entries.
  #[cfg(test)]
  pub(crate) fn live_count(&self) -> usize {
    self.entries.iter().filter(|e| e.key.is_some()).count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::Heap;

  #[test]
  fn set_get_overwrite() {
    let mut heap = Heap::init();
    let mut table = Table::init();
    let key = heap.copy_string("answer");

    assert!(table.set(key, Value::number_val(42.0)));
    assert_eq!(table.get(key), Some(Value::number_val(42.0)));

    assert!(!table.set(key, Value::number_val(43.0)));
    assert_eq!(table.get(key), Some(Value::number_val(43.0)));
  }

  #[test]
  fn get_on_empty_table_misses() {
    let mut heap = Heap::init();
    let table = Table::init();
    let key = heap.copy_string("ghost");
    assert_eq!(table.get(key), None);
  }

  #[test]
  fn delete_leaves_probe_chains_intact() {
    let mut heap = Heap::init();
    let mut table = Table::init();
    let keys = (0..24)
      .map(|i| heap.copy_string(&format!("key{i}")))
      .collect::<Vec<_>>();
    for (i, &key) in keys.iter().enumerate() {
      table.set(key, Value::number_val(i as f64));
    }

    for &key in keys.iter().step_by(2) {
      assert!(table.delete(key));
    }
    for (i, &key) in keys.iter().enumerate() {
      if i % 2 == 0 {
        assert_eq!(table.get(key), None);
      } else {
        assert_eq!(table.get(key), Some(Value::number_val(i as f64)));
      }
    }
  }

  #[test]
  fn delete_is_false_for_absent_keys() {
    let mut heap = Heap::init();
    let mut table = Table::init();
    let present = heap.copy_string("present");
    let absent = heap.copy_string("absent");
    table.set(present, Value::nil_val());
    assert!(!table.delete(absent));
    assert!(table.delete(present));
    assert!(!table.delete(present));
  }

  #[test]
  fn tombstones_keep_count_but_not_live_count() {
    let mut heap = Heap::init();
    let mut table = Table::init();
    let key = heap.copy_string("doomed");
    table.set(key, Value::bool_val(true));
    let count_before = table.count;

    table.delete(key);
    assert_eq!(table.count, count_before);
    assert_eq!(table.live_count(), 0);
    assert!(table.entries.iter().any(|entry| entry.is_tombstone()));

    // reusing the tombstone must not bump the count again
    table.set(key, Value::bool_val(false));
    assert_eq!(table.count, count_before);
    assert_eq!(table.live_count(), 1);
  }

  #[test]
  fn growth_preserves_entries() {
    let mut heap = Heap::init();
    let mut table = Table::init();
    let keys = (0..100)
      .map(|i| heap.copy_string(&format!("entry-{i}")))
      .collect::<Vec<_>>();
    for (i, &key) in keys.iter().enumerate() {
      table.set(key, Value::number_val(i as f64));
    }
    for &key in keys.iter().step_by(4) {
      table.delete(key);
    }
    for (i, &key) in keys.iter().enumerate().step_by(4) {
      table.set(key, Value::number_val((i + 1000) as f64));
    }
    for (i, &key) in keys.iter().enumerate() {
      let expected = if i % 4 == 0 { i + 1000 } else { i } as f64;
      assert_eq!(table.get(key), Some(Value::number_val(expected)));
    }
    assert_eq!(table.live_count(), keys.len());
  }

  #[test]
  fn add_all_copies_live_entries_only() {
    let mut heap = Heap::init();
    let mut from = Table::init();
    let mut to = Table::init();
    let kept = heap.copy_string("kept");
    let dropped = heap.copy_string("dropped");
    from.set(kept, Value::number_val(1.0));
    from.set(dropped, Value::number_val(2.0));
    from.delete(dropped);

    Table::add_all(&from, &mut to);
    assert_eq!(to.get(kept), Some(Value::number_val(1.0)));
    assert_eq!(to.get(dropped), None);
    assert_eq!(to.live_count(), 1);
  }

  #[test]
  fn find_string_compares_by_content() {
    let mut heap = Heap::init();
    // interning goes through heap.strings, itself a Table
    let stored = heap.copy_string("needle");
    let hash = unsafe { stored.as_ref() }.hash;
    assert_eq!(heap.strings.find_string("needle", hash), Some(stored));
    assert_eq!(
      heap.strings.find_string("haystack", crate::object::hash_string(b"haystack")),
      None
    );
  }
}
