//! Undo records for optimistic mutations, one per item at most.

use std::collections::HashMap;

use shared::domain::ItemId;

use crate::error::ConflictError;

/// An inverse operation that undoes exactly one optimistic mutation on `S`.
pub trait Compensate<S> {
    fn compensate(self, target: &mut S);
}

#[derive(Debug)]
pub struct MutationLog<C> {
    pending: HashMap<ItemId, C>,
}

impl<C> Default for MutationLog<C> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<C> MutationLog<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, item_id: &ItemId) -> bool {
        self.pending.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Fails without touching the existing record if `item_id` already has one.
    pub fn record(&mut self, item_id: ItemId, inverse: C) -> Result<(), ConflictError> {
        if self.pending.contains_key(&item_id) {
            return Err(ConflictError { item_id });
        }
        self.pending.insert(item_id, inverse);
        Ok(())
    }

    /// Drops the inverse; the mutation is now server-confirmed.
    pub fn commit(&mut self, item_id: &ItemId) -> bool {
        self.pending.remove(item_id).is_some()
    }

    pub fn rollback<S>(&mut self, item_id: &ItemId, target: &mut S) -> bool
    where
        C: Compensate<S>,
    {
        match self.pending.remove(item_id) {
            Some(inverse) => {
                inverse.compensate(target);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/mutation_log_tests.rs"]
mod tests;
