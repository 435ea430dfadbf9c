//! Generational reference tables.
//!
//! Every local or global reference handed to the bridge is a slot in a
//! [`RefTable`]. Deleting a reference frees its slot and bumps the slot's
//! generation, so a stale handle (double delete, use after delete) is detected
//! instead of silently aliasing a newer reference.
//!
//! Handles are encoded into the address of a [`RawObject`]:
//!
//! ```text
//! | generation (32) | index (24) | kind (2) |
//! ```

use std::num::NonZeroUsize;

use safejni_core::RawObject;

use crate::heap::ObjId;

const KIND_BITS: u32 = 2;
const INDEX_BITS: u32 = 24;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Which table a reference lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefKind {
    Local = 1,
    Global = 2,
}

impl RefKind {
    /// The table kind encoded in a handle.
    pub fn of(obj: RawObject) -> Option<RefKind> {
        match obj.addr().get() as u64 & ((1 << KIND_BITS) - 1) {
            1 => Some(RefKind::Local),
            2 => Some(RefKind::Global),
            _ => None,
        }
    }
}

struct Slot {
    generation: u32,
    target: Option<ObjId>,
}

/// A table of live references of one kind.
pub struct RefTable {
    kind: RefKind,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl RefTable {
    pub fn new(kind: RefKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Create a reference to `target`.
    pub fn insert(&mut self, target: ObjId) -> RawObject {
        let index = if let Some(index) = self.free_list.pop() {
            self.slots[index as usize].target = Some(target);
            index
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                target: Some(target),
            });
            index
        };
        self.live += 1;
        self.encode(index, self.slots[index as usize].generation)
    }

    /// Resolve a reference. `None` for handles of another table or stale ones.
    pub fn get(&self, obj: RawObject) -> Option<ObjId> {
        let (index, generation) = self.decode(obj)?;
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.target
    }

    /// Delete a reference. Returns false if it was not live.
    pub fn remove(&mut self, obj: RawObject) -> bool {
        let Some((index, generation)) = self.decode(obj) else {
            return false;
        };
        if let Some(slot) = self.slots.get_mut(index as usize)
            && slot.generation == generation
            && slot.target.is_some()
        {
            slot.target = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(index);
            self.live -= 1;
            return true;
        }
        false
    }

    /// Number of live references.
    pub fn live(&self) -> usize {
        self.live
    }

    fn encode(&self, index: u32, generation: u32) -> RawObject {
        let addr = ((generation as u64) << (INDEX_BITS + KIND_BITS))
            | ((index as u64) << KIND_BITS)
            | self.kind as u64;
        // The kind tag is never zero.
        RawObject::from_addr(NonZeroUsize::new(addr as usize).unwrap_or(NonZeroUsize::MIN))
    }

    fn decode(&self, obj: RawObject) -> Option<(u32, u32)> {
        if RefKind::of(obj)? != self.kind {
            return None;
        }
        let addr = obj.addr().get() as u64;
        let index = ((addr >> KIND_BITS) & INDEX_MASK) as u32;
        let generation = (addr >> (INDEX_BITS + KIND_BITS)) as u32;
        Some((index, generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut table = RefTable::new(RefKind::Local);
        let r = table.insert(ObjId(5));
        assert_eq!(RefKind::of(r), Some(RefKind::Local));
        assert_eq!(table.get(r), Some(ObjId(5)));
        assert_eq!(table.live(), 1);
        assert!(table.remove(r));
        assert_eq!(table.live(), 0);
        assert_eq!(table.get(r), None);
    }

    #[test]
    fn double_remove_is_detected() {
        let mut table = RefTable::new(RefKind::Global);
        let r = table.insert(ObjId(1));
        assert!(table.remove(r));
        assert!(!table.remove(r));
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut table = RefTable::new(RefKind::Local);
        let old = table.insert(ObjId(1));
        table.remove(old);
        let new = table.insert(ObjId(2));
        assert_ne!(old, new);
        assert_eq!(table.get(old), None);
        assert_eq!(table.get(new), Some(ObjId(2)));
    }

    #[test]
    fn tables_reject_foreign_handles() {
        let mut locals = RefTable::new(RefKind::Local);
        let mut globals = RefTable::new(RefKind::Global);
        let l = locals.insert(ObjId(1));
        let g = globals.insert(ObjId(1));
        assert_eq!(globals.get(l), None);
        assert_eq!(locals.get(g), None);
        assert!(!globals.remove(l));
    }
}
