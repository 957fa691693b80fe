//! Traversal of the `next_block` links that tie a save's blocks together.

use tracing::warn;

use crate::directory::DirectoryTable;
use crate::error::{Error, Result};
use crate::frame::BlockState;
use crate::layout::BLOCK_COUNT;

/// Follow the chain rooted at `start` and return its block indexes in order.
///
/// Every index is visited at most once, so a corrupted card cannot send the
/// walk around a loop. Links past the last block fail the same way.
pub fn walk(directory: &DirectoryTable, start: usize) -> Result<Vec<usize>> {
    if start >= BLOCK_COUNT {
        return Err(Error::InvalidSlot(start));
    }

    let mut visited = [false; BLOCK_COUNT];
    let mut chain = Vec::with_capacity(BLOCK_COUNT);
    let mut index = start;

    loop {
        let Some(frame) = directory.frame(index) else {
            return Err(Error::CorruptChain { start, index });
        };
        if visited[index] {
            return Err(Error::CorruptChain { start, index });
        }
        visited[index] = true;

        if index != start && !matches!(frame.block_state, BlockState::Middle | BlockState::Last) {
            warn!(
                "Block {index} in chain from slot {start} is marked {}",
                frame.block_state.name()
            );
        }
        chain.push(index);

        match frame.next() {
            None => return Ok(chain),
            Some(next) => index = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::END_OF_CHAIN;

    fn link(directory: &mut DirectoryTable, from: usize, state: BlockState, to: u8) {
        let frame = directory.frame_mut(from).unwrap();
        frame.block_state = state;
        frame.next_block = to;
        frame.fix_checksum();
    }

    #[test]
    fn single_block_chain_ends_immediately() {
        let mut directory = DirectoryTable::format();
        link(&mut directory, 3, BlockState::First, END_OF_CHAIN);
        assert_eq!(walk(&directory, 3).unwrap(), vec![3]);
    }

    #[test]
    fn follows_links_in_order() {
        let mut directory = DirectoryTable::format();
        link(&mut directory, 5, BlockState::First, 7);
        link(&mut directory, 7, BlockState::Middle, 2);
        link(&mut directory, 2, BlockState::Last, END_OF_CHAIN);
        assert_eq!(walk(&directory, 5).unwrap(), vec![5, 7, 2]);
    }

    #[test]
    fn self_loop_is_corrupt() {
        let mut directory = DirectoryTable::format();
        link(&mut directory, 4, BlockState::First, 4);
        assert_eq!(
            walk(&directory, 4),
            Err(Error::CorruptChain { start: 4, index: 4 })
        );
    }

    #[test]
    fn longer_cycle_is_corrupt() {
        let mut directory = DirectoryTable::format();
        link(&mut directory, 0, BlockState::First, 1);
        link(&mut directory, 1, BlockState::Middle, 2);
        link(&mut directory, 2, BlockState::Middle, 1);
        assert_eq!(
            walk(&directory, 0),
            Err(Error::CorruptChain { start: 0, index: 1 })
        );
    }

    #[test]
    fn out_of_range_link_is_corrupt() {
        let mut directory = DirectoryTable::format();
        link(&mut directory, 0, BlockState::First, 15);
        assert_eq!(
            walk(&directory, 0),
            Err(Error::CorruptChain { start: 0, index: 15 })
        );
    }

    #[test]
    fn full_card_chain_has_fifteen_steps() {
        let mut directory = DirectoryTable::format();
        for i in 0..BLOCK_COUNT {
            let (state, next) = match i {
                0 => (BlockState::First, 1),
                14 => (BlockState::Last, END_OF_CHAIN),
                _ => (BlockState::Middle, i as u8 + 1),
            };
            link(&mut directory, i, state, next);
        }
        assert_eq!(walk(&directory, 0).unwrap().len(), BLOCK_COUNT);
    }

    #[test]
    fn start_outside_card_is_rejected() {
        let directory = DirectoryTable::format();
        assert_eq!(walk(&directory, 15), Err(Error::InvalidSlot(15)));
    }
}
