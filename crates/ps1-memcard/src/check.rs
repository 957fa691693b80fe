//! Read-only audit of a card's directory.

use std::fmt;

use serde::Serialize;

use crate::chain;
use crate::directory::DirectoryTable;
use crate::error::Error;
use crate::frame::BlockState;
use crate::layout::{BLOCK_COUNT, BLOCK_SIZE};

/// One problem found by [`CardReport::collect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    BadChecksum { frame: usize },
    BadReservedChecksum { frame: usize },
    UnknownState { frame: usize, value: u8 },
    CorruptChain { start: usize, index: usize },
    LengthMismatch { slot: usize, save_length: i32, blocks: usize },
    UnexpectedMember { slot: usize, frame: usize, state: String },
    Orphan { frame: usize, state: String },
    Accounting { used: usize, free: usize },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::BadChecksum { frame } => write!(f, "frame {frame}: checksum mismatch"),
            Finding::BadReservedChecksum { frame } => {
                write!(f, "reserved frame {frame}: checksum mismatch")
            }
            Finding::UnknownState { frame, value } => {
                write!(f, "frame {frame}: unknown block state {value:#04x}")
            }
            Finding::CorruptChain { start, index } => {
                write!(f, "slot {start}: chain breaks at block {index}")
            }
            Finding::LengthMismatch {
                slot,
                save_length,
                blocks,
            } => write!(
                f,
                "slot {slot}: save_length {save_length} but chain holds {} bytes",
                blocks * BLOCK_SIZE
            ),
            Finding::UnexpectedMember { slot, frame, state } => {
                write!(f, "slot {slot}: member block {frame} is {state}")
            }
            Finding::Orphan { frame, state } => {
                write!(f, "frame {frame}: {state} block not reachable from any save")
            }
            Finding::Accounting { used, free } => write!(
                f,
                "{used} used + {free} free blocks does not add up to {BLOCK_COUNT}"
            ),
        }
    }
}

/// Everything [`CardReport::collect`] found, in frame order per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardReport {
    pub findings: Vec<Finding>,
    /// Blocks held by readable saves.
    pub used_blocks: usize,
    pub free_blocks: usize,
}

impl CardReport {
    pub fn collect(directory: &DirectoryTable) -> Self {
        let mut findings = Vec::new();

        for (index, frame) in directory.frames().iter().enumerate() {
            if !frame.checksum_ok() {
                findings.push(Finding::BadChecksum { frame: index });
            }
            if let BlockState::Unknown(value) = frame.block_state {
                findings.push(Finding::UnknownState {
                    frame: index,
                    value,
                });
            }
        }
        for (index, frame) in directory.reserved_frames().iter().enumerate() {
            if !frame.checksum_ok() {
                findings.push(Finding::BadReservedChecksum { frame: index });
            }
        }

        let mut reached = [false; BLOCK_COUNT];
        let mut used_blocks = 0;
        for slot in directory.first_indices() {
            let members = match chain::walk(directory, slot) {
                Ok(members) => members,
                Err(Error::CorruptChain { start, index }) => {
                    findings.push(Finding::CorruptChain { start, index });
                    continue;
                }
                Err(_) => continue,
            };

            let save_length = directory.frames()[slot].save_length;
            if usize::try_from(save_length).ok() != Some(members.len() * BLOCK_SIZE) {
                findings.push(Finding::LengthMismatch {
                    slot,
                    save_length,
                    blocks: members.len(),
                });
            }
            for &index in &members[1..] {
                let state = directory.frames()[index].block_state;
                if !matches!(state, BlockState::Middle | BlockState::Last) {
                    findings.push(Finding::UnexpectedMember {
                        slot,
                        frame: index,
                        state: state.name().to_string(),
                    });
                }
            }
            for &index in &members {
                reached[index] = true;
            }
            used_blocks += members.len();
        }

        for (index, frame) in directory.frames().iter().enumerate() {
            if matches!(frame.block_state, BlockState::Middle | BlockState::Last) && !reached[index]
            {
                findings.push(Finding::Orphan {
                    frame: index,
                    state: frame.block_state.name().to_string(),
                });
            }
        }

        let free_blocks = directory.free_indices().len();
        if used_blocks + free_blocks != BLOCK_COUNT {
            findings.push(Finding::Accounting {
                used: used_blocks,
                free: free_blocks,
            });
        }

        Self {
            findings,
            used_blocks,
            free_blocks,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}
