use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::action::{Action, ErasedPlacement, Placement};
use crate::blocks::{AnyBlock, Block};
use crate::domino::DominoError;

/// Registry mapping each block type to its action and dependencies
///
/// Exactly one entry exists per type; placing a type again replaces the entry.
/// Reads happen on every fall down and never hold the lock across an await.
#[derive(Default)]
pub(crate) struct Placements {
    entries: RwLock<HashMap<TypeId, Arc<dyn ErasedPlacement>>>,
}

impl Placements {
    pub(crate) fn place<B: Block>(&self, action: Action<B>, deps: B::Deps) {
        let placement: Arc<dyn ErasedPlacement> = Arc::new(Placement::new(action, deps));
        let replaced = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<B>(), placement);

        if replaced.is_some() {
            tracing::debug!("Replaced placement for {}", B::type_name());
        } else {
            tracing::trace!("Placed {}", B::type_name());
        }
    }

    pub(crate) fn is_placed<B: Block>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<B>())
    }

    pub(crate) fn resolve(
        &self,
        block: &dyn AnyBlock,
    ) -> Result<Arc<dyn ErasedPlacement>, DominoError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&block.block_type_id())
            .cloned()
            .ok_or(DominoError::UnplacedBlock {
                type_name: block.block_type_name(),
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
