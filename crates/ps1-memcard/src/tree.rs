//! A read-only filesystem view of the saves on a card.
//!
//! ```text
//! /
//! ├── by-filename/<filename>
//! └── by-slot/<NN>/<filename>
//! ```
//!
//! The tree is a snapshot: it owns copies of the saves and does not follow
//! later changes to the card it was built from.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::card::MemoryCard;
use crate::layout::BLOCK_SIZE;
use crate::save::Save;

pub type Inode = u64;

pub const ROOT_INODE: Inode = 1;

const BY_FILENAME: &str = "by-filename";
const BY_SLOT: &str = "by-slot";
const FILE_MODE: u16 = 0o444;
const DIR_MODE: u16 = 0o555;
const STAT_BLOCK_SIZE: u64 = 512;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("no such file or directory")]
    NotFound,
    #[error("is a directory")]
    IsDirectory,
    #[error("not a directory")]
    NotDirectory,
}

/// Hands out inode numbers for one tree, starting at [`ROOT_INODE`].
#[derive(Debug, Clone)]
pub struct InodeAllocator {
    next: Inode,
}

impl InodeAllocator {
    pub fn new() -> Self {
        Self { next: ROOT_INODE }
    }

    pub fn allocate(&mut self) -> Inode {
        let inode = self.next;
        self.next += 1;
        inode
    }
}

impl Default for InodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttr {
    pub inode: Inode,
    pub kind: NodeKind,
    pub size: u64,
    /// Size in 512-byte units, rounded up.
    pub blocks: u64,
    pub mode: u16,
}

/// One `readdir` result. `offset` is where the next call should resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: Inode,
    pub offset: usize,
    pub kind: NodeKind,
    pub name: String,
}

#[derive(Debug, Clone)]
enum Node {
    Directory {
        parent: Inode,
        children: Vec<(String, Inode)>,
    },
    File {
        save: usize,
    },
}

#[derive(Debug, Clone)]
pub struct SaveTree {
    nodes: BTreeMap<Inode, Node>,
    saves: Vec<Save>,
}

impl SaveTree {
    pub fn new(card: &MemoryCard) -> Self {
        let mut tree = Self {
            nodes: BTreeMap::new(),
            saves: Vec::new(),
        };
        let mut inodes = InodeAllocator::new();

        let root = inodes.allocate();
        tree.insert_dir(root, root);
        let by_filename = inodes.allocate();
        tree.insert_dir(by_filename, root);
        tree.link(root, BY_FILENAME.to_string(), by_filename);
        let by_slot = inodes.allocate();
        tree.insert_dir(by_slot, root);
        tree.link(root, BY_SLOT.to_string(), by_slot);

        for (slot, save) in card.get_slot_saves() {
            let index = tree.saves.len();
            let filename = save.filename().to_string();
            tree.saves.push(save);

            let file = inodes.allocate();
            tree.nodes.insert(file, Node::File { save: index });
            let name = tree.unique_name(by_filename, &filename, slot);
            tree.link(by_filename, name, file);

            let slot_dir = inodes.allocate();
            tree.insert_dir(slot_dir, by_slot);
            tree.link(by_slot, format!("{slot:02}"), slot_dir);
            let slot_file = inodes.allocate();
            tree.nodes.insert(slot_file, Node::File { save: index });
            tree.link(slot_dir, filename, slot_file);
        }
        tree
    }

    pub fn root(&self) -> Inode {
        ROOT_INODE
    }

    pub fn lookup(&self, parent: Inode, name: &str) -> Result<Inode, TreeError> {
        match self.nodes.get(&parent) {
            None => Err(TreeError::NotFound),
            Some(Node::File { .. }) => Err(TreeError::NotDirectory),
            Some(Node::Directory {
                parent: up,
                children,
            }) => match name {
                "." => Ok(parent),
                ".." => Ok(*up),
                _ => children
                    .iter()
                    .find(|(child, _)| child == name)
                    .map(|(_, inode)| *inode)
                    .ok_or(TreeError::NotFound),
            },
        }
    }

    /// Walk a `/`-separated path from the root. Empty components are skipped.
    pub fn resolve(&self, path: &str) -> Result<Inode, TreeError> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(ROOT_INODE, |inode, part| self.lookup(inode, part))
    }

    /// Entries of directory `inode` from `offset` on, `.` and `..` first.
    pub fn readdir(&self, inode: Inode, offset: usize) -> Result<Vec<DirEntry>, TreeError> {
        let (parent, children) = match self.nodes.get(&inode) {
            None => return Err(TreeError::NotFound),
            Some(Node::File { .. }) => return Err(TreeError::NotDirectory),
            Some(Node::Directory { parent, children }) => (*parent, children),
        };

        let listing = [(".", inode), ("..", parent)]
            .into_iter()
            .chain(children.iter().map(|(name, child)| (name.as_str(), *child)));
        Ok(listing
            .enumerate()
            .skip(offset)
            .map(|(position, (name, child))| DirEntry {
                inode: child,
                offset: position + 1,
                kind: self.kind(child),
                name: name.to_string(),
            })
            .collect())
    }

    pub fn attr(&self, inode: Inode) -> Option<NodeAttr> {
        let (kind, size, mode) = match self.nodes.get(&inode)? {
            Node::Directory { .. } => (NodeKind::Directory, 0, DIR_MODE),
            Node::File { save } => (
                NodeKind::File,
                (self.saves[*save].blocks() * BLOCK_SIZE) as u64,
                FILE_MODE,
            ),
        };
        Some(NodeAttr {
            inode,
            kind,
            size,
            blocks: size.div_ceil(STAT_BLOCK_SIZE),
            mode,
        })
    }

    /// Up to `size` bytes of the file at `inode`, starting at `offset`.
    pub fn read(&self, inode: Inode, offset: usize, size: usize) -> Result<&[u8], TreeError> {
        match self.nodes.get(&inode) {
            None => Err(TreeError::NotFound),
            Some(Node::Directory { .. }) => Err(TreeError::IsDirectory),
            Some(Node::File { save }) => Ok(self.saves[*save].read(offset, size)),
        }
    }

    /// The save behind a file inode.
    pub fn save(&self, inode: Inode) -> Option<&Save> {
        match self.nodes.get(&inode)? {
            Node::File { save } => self.saves.get(*save),
            Node::Directory { .. } => None,
        }
    }

    fn kind(&self, inode: Inode) -> NodeKind {
        match self.nodes.get(&inode) {
            Some(Node::File { .. }) => NodeKind::File,
            _ => NodeKind::Directory,
        }
    }

    fn insert_dir(&mut self, inode: Inode, parent: Inode) {
        self.nodes.insert(
            inode,
            Node::Directory {
                parent,
                children: Vec::new(),
            },
        );
    }

    fn link(&mut self, parent: Inode, name: String, child: Inode) {
        if let Some(Node::Directory { children, .. }) = self.nodes.get_mut(&parent) {
            children.push((name, child));
        }
    }

    /// Two saves may share a filename; later ones get their slot appended.
    fn unique_name(&self, parent: Inode, filename: &str, slot: usize) -> String {
        if self.lookup(parent, filename).is_err() {
            filename.to_string()
        } else {
            format!("{filename}.{slot:02}")
        }
    }
}
