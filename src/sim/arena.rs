//! Generation-checked entity storage
//!
//! Entities live in a dense slot vector. A handle remembers the generation of
//! the slot it was issued for, so a handle to a destroyed entity resolves to
//! `None` instead of aliasing whatever reused the slot.

use serde::{Deserialize, Serialize};

use super::entity::Entity;

/// Handle to an entity owned by an [`EntityArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

#[derive(Debug, Default)]
pub struct EntityArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store an entity and hand back its handle
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            return EntityId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        EntityId {
            index,
            generation: 0,
        }
    }

    /// Take an entity out; the slot's generation advances so old handles expire
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_mut()
    }

    /// Borrow two distinct live entities mutably at once
    pub fn get_pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        if a.index == b.index || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (lo, hi, swapped) = if a.index < b.index {
            (a.index as usize, b.index as usize, false)
        } else {
            (b.index as usize, a.index as usize, true)
        };
        let (head, tail) = self.slots.split_at_mut(hi);
        let first = head[lo].entity.as_mut()?;
        let second = tail[0].entity.as_mut()?;
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    /// Live entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entity.as_ref().map(|entity| {
                (
                    EntityId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    entity,
                )
            })
        })
    }
}
