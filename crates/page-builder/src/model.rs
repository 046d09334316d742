use crate::block::{Block, BlockId, StoredBlock, TYPE_FIELD};
use crate::error::Error;
use crate::schema::{FieldError, FieldErrorReason, ValidationError};

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// Ordered blocks of one page.
///
/// Every mutation either succeeds with ids unique, order gap-free and every
/// block valid, or fails leaving the list untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BlockList {
    blocks: Vec<Block>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for block in &blocks {
            if !seen.insert(block.id()) {
                return Err(ValidationError::single(FieldError::new(
                    "id",
                    FieldErrorReason::Duplicate,
                ))
                .into());
            }
        }
        Ok(BlockList { blocks })
    }

    /// Decodes every stored block, failing on the first one that does not decode.
    pub fn from_stored(stored: Vec<StoredBlock>) -> Result<Self, Error> {
        let blocks = stored
            .into_iter()
            .map(Block::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_blocks(blocks)
    }

    pub fn to_stored(&self) -> Vec<StoredBlock> {
        self.blocks.iter().map(Block::to_stored).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn position(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    fn position_or_not_found(&self, id: BlockId) -> Result<usize, Error> {
        self.position(id).ok_or(Error::NotFound { id })
    }

    /// Validates `initial_fields` and appends a block with a fresh id.
    pub fn add_block(
        &mut self,
        type_tag: &str,
        initial_fields: Map<String, Value>,
    ) -> Result<&Block, Error> {
        let mut id = Uuid::new_v4();
        while self.position(id).is_some() {
            id = Uuid::new_v4();
        }

        let block = Block::build(id, type_tag, initial_fields)?;
        self.blocks.push(block);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, Error> {
        match self.position(id) {
            Some(index) => Ok(self.blocks.remove(index)),
            None => {
                log::warn!("remove_block: no block {} on page, nothing removed", id);
                Err(Error::NotFound { id })
            }
        }
    }

    /// Moves a block so that it ends up at `new_index`, shifting the others.
    pub fn reorder(&mut self, id: BlockId, new_index: usize) -> Result<(), Error> {
        let from = self.position_or_not_found(id)?;
        if new_index >= self.blocks.len() {
            return Err(Error::IndexOutOfRange {
                index: new_index,
                len: self.blocks.len(),
            });
        }

        let block = self.blocks.remove(from);
        self.blocks.insert(new_index, block);
        Ok(())
    }

    /// Shallow-merges `patch` over the block's current fields and re-validates.
    /// A `null` in the patch clears an optional field.
    pub fn update_block(&mut self, id: BlockId, patch: Map<String, Value>) -> Result<&Block, Error> {
        let index = self.position_or_not_found(id)?;
        let current = &self.blocks[index];
        let block_type = current.block_type();

        let mut merged = current.fields();
        merged.insert(TYPE_FIELD.to_string(), block_type.as_str().into());
        merged.extend(patch);

        let updated = Block::build(id, block_type.as_str(), merged)?;
        self.blocks[index] = updated;
        Ok(&self.blocks[index])
    }
}

impl<'a> IntoIterator for &'a BlockList {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
