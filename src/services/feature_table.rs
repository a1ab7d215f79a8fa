//! Read-only tabular view over extracted blocks.
//!
//! Purely a query surface: filtering, grouping, and sum/mean/count over any
//! block attribute. No derived computation happens here; everything a block
//! carries was computed during extraction.

use std::collections::BTreeMap;

use crate::models::block::Block;

/// The analytical output artifact: an immutable collection of blocks
/// supporting the filter/group/aggregate operations the summary functions
/// are built on.
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    blocks: Vec<Block>,
}

impl BlockTable {
    pub fn new(blocks: Vec<Block>) -> Self {
        BlockTable { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Blocks satisfying `predicate`, in table order.
    pub fn filter<P: Fn(&Block) -> bool>(&self, predicate: P) -> Vec<&Block> {
        self.blocks.iter().filter(|b| predicate(b)).collect()
    }

    /// Group blocks by an arbitrary key. Keys come out in sorted order.
    pub fn group_by<K: Ord, F: Fn(&Block) -> K>(&self, key: F) -> BTreeMap<K, Vec<&Block>> {
        let mut groups: BTreeMap<K, Vec<&Block>> = BTreeMap::new();
        for block in &self.blocks {
            groups.entry(key(block)).or_default().push(block);
        }
        groups
    }

    /// Group blocks by proposal id.
    pub fn group_by_proposal(&self) -> BTreeMap<String, Vec<&Block>> {
        self.group_by(|b| b.proposal_id.clone())
    }

    /// Sum of `value` over all blocks.
    pub fn sum<F: Fn(&Block) -> f64>(&self, value: F) -> f64 {
        self.blocks.iter().map(value).sum()
    }

    /// Mean of `value` over all blocks, `None` when the table is empty.
    pub fn mean<F: Fn(&Block) -> f64>(&self, value: F) -> Option<f64> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(self.sum(value) / self.blocks.len() as f64)
        }
    }

    /// Count of blocks satisfying `predicate`.
    pub fn count<P: Fn(&Block) -> bool>(&self, predicate: P) -> usize {
        self.blocks.iter().filter(|b| predicate(b)).count()
    }
}

impl From<Vec<Block>> for BlockTable {
    fn from(blocks: Vec<Block>) -> Self {
        BlockTable::new(blocks)
    }
}

impl<'a> IntoIterator for &'a BlockTable {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
