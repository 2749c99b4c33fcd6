use std::sync::Arc;

use log::{debug, info};

use crate::block_device::block_device::BlockDevice;
use crate::config::{BLOCK_SIZE, DISK_BLOCKS, MAX_FILE_BLOCKS, ROOT_BLOCK};
use crate::layout::data_block::{DataBlock, DirBlock};
use crate::layout::inode::Inode;
use crate::manager::error_code::{ErrorCode, EIO};
use crate::manager::free_list::FreeList;
use crate::sync::lock_table::LockTable;
use crate::typ::file_type::FileKind;
use crate::typ::owner::Owner;
use crate::utils::slice::{from_block, to_block};

/// The file-system engine: one disk, its free-block accounting, and one
/// reader/writer lock per live inode. All mutation of disk state funnels
/// through [`BlockFs::apply`].
pub struct BlockFs {
    device: Arc<dyn BlockDevice>,
    pub(crate) free: FreeList,
    pub(crate) locks: LockTable,
}

impl BlockFs {
    /// Write a fresh root directory to block 0. Everything else on the
    /// disk becomes free space at the next mount.
    pub fn format(device: &Arc<dyn BlockDevice>) {
        let root = Inode::new(FileKind::Dir, Owner::PUBLIC);
        device.write_block(ROOT_BLOCK, &to_block(&root));
        info!("formatted disk, {} blocks", DISK_BLOCKS);
    }

    pub fn is_formatted(device: &Arc<dyn BlockDevice>) -> bool {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(ROOT_BLOCK, &mut buf);
        from_block::<Inode>(&buf).is_dir()
    }

    /// Rebuild the in-memory state from the on-disk tree: every reachable
    /// block is claimed out of the free list and every reachable inode
    /// gets a lock. Fails with `EIO` on a corrupt tree (block referenced
    /// twice, bogus type byte, or an oversized `size` field).
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<BlockFs, ErrorCode> {
        let fs = BlockFs {
            device,
            free: FreeList::new_full(DISK_BLOCKS),
            locks: LockTable::new(),
        };
        fs.traverse(ROOT_BLOCK)?;
        debug!(
            "mounted: {} of {} blocks free",
            fs.free.remaining(),
            DISK_BLOCKS
        );
        Ok(fs)
    }

    fn traverse(&self, block: u32) -> Result<(), ErrorCode> {
        if !self.free.claim(block) {
            return Err(EIO);
        }
        self.locks.insert(block);

        let inode = self.read_inode(block);
        if inode.kind().is_none() || inode.size as usize > MAX_FILE_BLOCKS {
            return Err(EIO);
        }
        for i in 0..inode.size as usize {
            if !self.free.claim(inode.blocks[i]) {
                return Err(EIO);
            }
        }
        if inode.is_dir() {
            for i in 0..inode.size as usize {
                let entries = self.read_dir(inode.blocks[i]);
                for entry in entries.iter().filter(|e| e.is_live()) {
                    self.traverse(entry.inode_block)?;
                }
            }
        }
        Ok(())
    }

    /// Unallocated blocks left, for space accounting and tests.
    pub fn free_blocks(&self) -> usize {
        self.free.remaining()
    }
}

/// Typed single-block I/O.
impl BlockFs {
    pub(crate) fn read_inode(&self, block: u32) -> Inode {
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_block(block, &mut buf);
        from_block(&buf)
    }

    pub(crate) fn write_inode(&self, block: u32, inode: &Inode) {
        self.device.write_block(block, &to_block(inode));
    }

    pub(crate) fn read_dir(&self, block: u32) -> DirBlock {
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_block(block, &mut buf);
        from_block(&buf)
    }

    pub(crate) fn write_dir(&self, block: u32, entries: &DirBlock) {
        self.device.write_block(block, &to_block(entries));
    }

    pub(crate) fn read_data(&self, block: u32, buf: &mut DataBlock) {
        self.device.read_block(block, buf);
    }

    pub(crate) fn write_data(&self, block: u32, data: &DataBlock) {
        self.device.write_block(block, data);
    }
}
