use std::mem::size_of;

use crate::config::{BLOCK_SIZE, MAX_FILE_BLOCKS};
use crate::typ::file_type::FileKind;
use crate::typ::owner::Owner;

/// On-disk inode, one per block.
///
/// `blocks[..size]` hold data blocks for a file and directory blocks for a
/// directory. The record fills its block exactly; anything past `size` is
/// garbage and never read.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct Inode {
    kind: u8,
    pub owner: Owner,
    pub size: u32,
    pub blocks: [u32; MAX_FILE_BLOCKS],
}

impl Inode {
    pub fn new(kind: FileKind, owner: Owner) -> Inode {
        Inode {
            kind: kind.as_byte(),
            owner,
            size: 0,
            blocks: [0u32; MAX_FILE_BLOCKS],
        }
    }

    /// None for a block that does not hold a live inode.
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_byte(self.kind)
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == Some(FileKind::Dir)
    }

    pub fn is_file(&self) -> bool {
        self.kind() == Some(FileKind::File)
    }
}

pub const INODE_SIZE: usize = size_of::<Inode>();

const _: () = assert!(INODE_SIZE == BLOCK_SIZE);
