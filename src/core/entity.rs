//! Piece arena with simple integer IDs

use crate::{Result, SpellChessError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a piece for the whole game
///
/// IDs are never reused, so a piece keeps its identity (effects, history)
/// when it changes square, and a freshly summoned piece never inherits
/// anything from a previous occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    pub fn new(id: u32) -> Self {
        PieceId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Central storage for pieces keyed by `PieceId`
///
/// Uses FxHashMap for fast hashing of integer keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore<T> {
    entities: FxHashMap<PieceId, T>,
    next_id: u32,
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        EntityStore {
            entities: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Generate a new unique PieceId
    pub fn next_id(&mut self) -> PieceId {
        let id = PieceId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, id: PieceId, entity: T) {
        self.entities.insert(id, entity);
    }

    pub fn get(&self, id: PieceId) -> Result<&T> {
        self.entities
            .get(&id)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("piece {id} is not on the board")))
    }

    pub fn get_mut(&mut self, id: PieceId) -> Result<&mut T> {
        self.entities
            .get_mut(&id)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("piece {id} is not on the board")))
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn remove(&mut self, id: PieceId) -> Option<T> {
        self.entities.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PieceId, &T)> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_store() {
        let mut store = EntityStore::new();
        let id1 = store.next_id();
        let id2 = store.next_id();

        assert_eq!(id1.as_u32(), 0);
        assert_eq!(id2.as_u32(), 1);

        store.insert(id1, "knight");
        store.insert(id2, "bishop");

        assert_eq!(store.len(), 2);
        assert_eq!(*store.get(id1).unwrap(), "knight");
        assert!(store.get(PieceId::new(999)).is_err());

        store.remove(id1);
        assert!(!store.contains(id1));
        // IDs are never handed out twice
        assert_eq!(store.next_id().as_u32(), 2);
    }
}
