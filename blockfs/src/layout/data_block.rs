use std::mem::size_of;

use crate::config::{BLOCK_SIZE, DIR_ENTRIES};
use crate::typ::file_name::FileName;

pub type DataBlock = [u8; BLOCK_SIZE];

/// Directory entry, 64 bytes. `inode_block == 0` marks a free slot: the
/// root inode lives in block 0 and can never appear as a child, so zero is
/// safe as the sentinel.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct DirEntry {
    pub name: FileName,
    pub inode_block: u32,
}

impl DirEntry {
    pub const FREE: DirEntry = DirEntry {
        name: FileName::EMPTY,
        inode_block: 0,
    };

    pub fn new(name: FileName, inode_block: u32) -> DirEntry {
        DirEntry { name, inode_block }
    }

    pub fn is_live(&self) -> bool {
        self.inode_block != 0
    }
}

pub type DirBlock = [DirEntry; DIR_ENTRIES];

pub const DIR_ENTRY_SIZE: usize = size_of::<DirEntry>();

const _: () = assert!(DIR_ENTRY_SIZE * DIR_ENTRIES == BLOCK_SIZE);

pub fn empty_dir_block() -> DirBlock {
    [DirEntry::FREE; DIR_ENTRIES]
}
