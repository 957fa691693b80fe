//! Reading and writing PlayStation memory card images.
//!
//! A card is 128KB: one header block holding the allocation directory,
//! followed by fifteen 8KB data blocks. Saves occupy one or more blocks
//! linked through the directory. Raw images as well as DexDrive (`.gme`) and
//! PSP (`.vmp`) wrapped images are accepted; the wrapper is kept so the card
//! can be written back in the same form.
//!
//! ```no_run
//! use ps1_memcard::MemoryCard;
//!
//! let bytes = std::fs::read("card.mcr")?;
//! let card = MemoryCard::load(&bytes)?;
//! for save in card.get_saves() {
//!     println!("{} ({} blocks)", save.filename(), save.blocks());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alloc;
pub mod block;
pub mod card;
pub mod chain;
pub mod check;
pub mod checksum;
pub mod container;
pub mod directory;
pub mod error;
pub mod filename;
pub mod frame;
pub mod icon;
pub mod layout;
pub mod save;
pub mod tree;

pub use block::DataBlock;
pub use card::{CardOptions, MemoryCard};
pub use check::{CardReport, Finding};
pub use container::Container;
pub use error::{Error, Result};
pub use filename::{FilenamePolicy, SaveFilename};
pub use frame::{BlockState, DirectoryFrame};
pub use icon::Icon;
pub use save::{MetadataBlock, Save};
pub use tree::{SaveTree, TreeError};
