//! Handing out and reclaiming data blocks.
//!
//! Every precondition is checked before the first write, so a rejected
//! request leaves the directory and data blocks exactly as they were.

use tracing::debug;

use crate::chain;
use crate::directory::DirectoryTable;
use crate::error::{Error, Result};
use crate::filename::SaveFilename;
use crate::frame::{BlockState, DirectoryFrame};
use crate::layout::{BLOCK_SIZE, END_OF_CHAIN};
use crate::save::Save;

/// Mutable view over a card's directory and data area.
pub struct Allocator<'a> {
    directory: &'a mut DirectoryTable,
    blocks: &'a mut [u8],
}

impl<'a> Allocator<'a> {
    pub fn new(directory: &'a mut DirectoryTable, blocks: &'a mut [u8]) -> Self {
        Self { directory, blocks }
    }

    /// Write `save` into free blocks and link them into a chain.
    ///
    /// Blocks are taken in index order. Returns the slot of the first block.
    pub fn allocate(&mut self, save: &Save, name: &SaveFilename) -> Result<usize> {
        save.validate()?;

        let needed = save.blocks();
        let free = self.directory.free_indices();
        if free.len() < needed {
            return Err(Error::InsufficientSpace {
                needed,
                available: free.len(),
            });
        }

        let chain = &free[..needed];
        let frames = self.directory.frames_mut();
        for (position, &index) in chain.iter().enumerate() {
            let is_first = position == 0;
            let is_last = position + 1 == needed;

            let frame = &mut frames[index];
            *frame = DirectoryFrame::zeroed();
            frame.country_code = name.country_code;
            frame.product_code = name.product_code;
            frame.identifier = name.identifier;
            frame.block_state = if is_first {
                BlockState::First
            } else if is_last {
                BlockState::Last
            } else {
                BlockState::Middle
            };
            if is_first {
                frame.save_length = (needed * BLOCK_SIZE) as i32;
            }
            if is_last {
                frame.next_block = END_OF_CHAIN;
                frame.next_frame = END_OF_CHAIN;
            } else {
                frame.next_block = chain[position + 1] as u8;
                frame.next_frame = 0;
            }
            frame.fix_checksum();

            let chunk = &save.data()[position * BLOCK_SIZE..(position + 1) * BLOCK_SIZE];
            block_mut(self.blocks, index).copy_from_slice(chunk);
        }

        debug!("Allocated blocks {chain:?} for {}", save.filename());
        Ok(chain[0])
    }

    /// Free every block of the chain starting at `slot`, zeroing its data.
    /// Returns the freed block indexes in chain order.
    pub fn release(&mut self, slot: usize) -> Result<Vec<usize>> {
        match self.directory.frame(slot) {
            None => return Err(Error::InvalidSlot(slot)),
            Some(frame) if frame.block_state != BlockState::First => {
                return Err(Error::SaveNotFound(format!("slot {slot}")));
            }
            Some(_) => {}
        }

        let chain = chain::walk(self.directory, slot)?;
        let frames = self.directory.frames_mut();
        for &index in &chain {
            frames[index].reset();
            block_mut(self.blocks, index).fill(0);
        }

        debug!("Released blocks {chain:?}");
        Ok(chain)
    }
}

fn block_mut(blocks: &mut [u8], index: usize) -> &mut [u8] {
    &mut blocks[index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE]
}
