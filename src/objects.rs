use crate::error::{OracleError, Result};

/// Live allocation behind a handle, in words from the start of the chunk
/// region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Object {
  pub offset: usize,
  pub len: usize,
}

impl Object {
  pub fn end(&self) -> usize {
    self.offset + self.len
  }
}

/// Fixed table of object handles `0..B`, each either empty or holding one
/// live allocation.
pub struct ObjectTable {
  slots: Vec<Option<Object>>,
}

impl ObjectTable {
  pub fn new(count: usize) -> Self {
    Self {
      slots: vec![None; count],
    }
  }

  fn slot(
    &self,
    handle: usize,
  ) -> Result<&Option<Object>> {
    self.slots.get(handle).ok_or(OracleError::HandleOutOfRange {
      handle,
      limit: self.slots.len(),
    })
  }

  /// Returns the live object behind `handle`.
  pub fn get(
    &self,
    handle: usize,
  ) -> Result<Object> {
    let slot = *self.slot(handle)?;

    slot.ok_or(OracleError::HandleNotAllocated { handle })
  }

  pub fn is_allocated(
    &self,
    handle: usize,
  ) -> bool {
    matches!(self.slots.get(handle), Some(Some(_)))
  }

  /// Fails unless `handle` exists and is currently empty.
  pub fn ensure_free(
    &self,
    handle: usize,
  ) -> Result<()> {
    match self.slot(handle)? {
      Some(_) => Err(OracleError::HandleAlreadyAllocated { handle }),
      None => Ok(()),
    }
  }

  /// Records a new allocation for an empty handle.
  pub fn insert(
    &mut self,
    handle: usize,
    object: Object,
  ) -> Result<()> {
    self.ensure_free(handle)?;
    self.slots[handle] = Some(object);

    Ok(())
  }

  /// Empties `handle` and returns what it held.
  pub fn remove(
    &mut self,
    handle: usize,
  ) -> Result<Object> {
    let object = self.get(handle)?;
    self.slots[handle] = None;

    Ok(object)
  }

  /// Handle whose payload starts at `offset`, if any.
  pub fn find_by_offset(
    &self,
    offset: usize,
  ) -> Option<usize> {
    self
      .slots
      .iter()
      .position(|slot| matches!(slot, Some(object) if object.offset == offset))
  }

  /// Lowest empty handle.
  pub fn first_free(&self) -> Option<usize> {
    self.slots.iter().position(Option::is_none)
  }

  /// Allocated handles with their objects, in handle order.
  pub fn live(&self) -> impl Iterator<Item = (usize, Object)> + '_ {
    self
      .slots
      .iter()
      .enumerate()
      .filter_map(|(handle, slot)| slot.map(|object| (handle, object)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lifecycle() {
    let mut table = ObjectTable::new(3);
    let object = Object { offset: 4, len: 2 };

    assert_eq!(table.first_free(), Some(0));
    table.insert(1, object).unwrap();
    assert!(table.is_allocated(1));
    assert_eq!(table.get(1).unwrap(), object);
    assert_eq!(table.find_by_offset(4), Some(1));

    assert_eq!(table.remove(1).unwrap(), object);
    assert!(!table.is_allocated(1));
    assert_eq!(table.find_by_offset(4), None);

    table.insert(1, Object { offset: 9, len: 1 }).unwrap();
    assert_eq!(table.get(1).unwrap().end(), 10);
  }

  #[test]
  fn test_handle_state_violations() {
    let mut table = ObjectTable::new(2);
    table.insert(0, Object { offset: 0, len: 1 }).unwrap();

    assert!(matches!(
      table.insert(0, Object { offset: 5, len: 1 }),
      Err(OracleError::HandleAlreadyAllocated { handle: 0 })
    ));
    assert!(matches!(table.get(1), Err(OracleError::HandleNotAllocated { handle: 1 })));
    assert!(matches!(table.remove(1), Err(OracleError::HandleNotAllocated { handle: 1 })));
    assert!(matches!(
      table.get(2),
      Err(OracleError::HandleOutOfRange { handle: 2, limit: 2 })
    ));
  }

  #[test]
  fn test_live_and_first_free() {
    let mut table = ObjectTable::new(3);
    table.insert(0, Object { offset: 1, len: 1 }).unwrap();
    table.insert(2, Object { offset: 3, len: 1 }).unwrap();

    assert_eq!(table.first_free(), Some(1));
    assert_eq!(table.live().map(|(h, _)| h).collect::<Vec<_>>(), vec![0, 2]);

    table.insert(1, Object { offset: 5, len: 1 }).unwrap();
    assert_eq!(table.first_free(), None);
  }
}
