use std::any::TypeId;
use std::collections::HashMap;

use crate::blocks::AnyBlock;

/// Follow-up blocks harvested from one touch context
///
/// Behaves as a set: touching a block equal to one already present is a no-op.
/// Iteration order is insertion order, but the scheduler gives no ordering
/// guarantee between follow-ups once they are started.
///
/// Blocks are only required to be `PartialEq`, not `Hash`, so an insert
/// compares against every held block of the same type. Touching many blocks
/// of one type in a single scope is quadratic in their number.
#[derive(Clone, Debug, Default)]
pub struct TouchedBlocks {
    blocks: Vec<Box<dyn AnyBlock>>,
    // indices into `blocks`, per concrete type
    by_type: HashMap<TypeId, Vec<usize>>,
}

impl TouchedBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block, returning false if an equal block was already present
    pub fn insert(&mut self, block: Box<dyn AnyBlock>) -> bool {
        let same_type = self.by_type.entry(block.block_type_id()).or_default();
        if same_type
            .iter()
            .any(|&index| self.blocks[index].dyn_eq(&*block))
        {
            return false;
        }
        same_type.push(self.blocks.len());
        self.blocks.push(block);
        true
    }

    /// Number of held blocks of the given type
    pub fn count_of(&self, type_id: TypeId) -> usize {
        self.by_type.get(&type_id).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyBlock> {
        self.blocks.iter().map(|block| block.as_ref())
    }

    /// Short type names of the touched blocks, in insertion order
    pub fn type_names(&self) -> Vec<&'static str> {
        self.iter().map(|block| block.block_type_name()).collect()
    }
}

impl IntoIterator for TouchedBlocks {
    type Item = Box<dyn AnyBlock>;
    type IntoIter = std::vec::IntoIter<Box<dyn AnyBlock>>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl FromIterator<Box<dyn AnyBlock>> for TouchedBlocks {
    fn from_iter<I: IntoIterator<Item = Box<dyn AnyBlock>>>(iter: I) -> Self {
        let mut touched = Self::new();
        for block in iter {
            touched.insert(block);
        }
        touched
    }
}
