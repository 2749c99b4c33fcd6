use std::sync::Mutex;

use crate::block_device::block_device::BlockDevice;
use crate::config::{BLOCK_SIZE, DISK_BLOCKS};
use crate::layout::data_block::DataBlock;

/// RAM-backed disk for tests and benchmarks.
pub struct MemDevice {
    blocks: Mutex<Vec<DataBlock>>,
}

impl MemDevice {
    pub fn new() -> MemDevice {
        MemDevice::with_blocks(DISK_BLOCKS)
    }

    pub fn with_blocks(count: usize) -> MemDevice {
        MemDevice {
            blocks: Mutex::new(vec![[0u8; BLOCK_SIZE]; count]),
        }
    }
}

impl Default for MemDevice {
    fn default() -> Self {
        MemDevice::new()
    }
}

impl BlockDevice for MemDevice {
    fn read_block(&self, block: u32, buf: &mut DataBlock) {
        let blocks = self.blocks.lock().unwrap();
        buf.copy_from_slice(&blocks[block as usize]);
    }

    fn write_block(&self, block: u32, data: &DataBlock) {
        let mut blocks = self.blocks.lock().unwrap();
        blocks[block as usize].copy_from_slice(data);
    }
}
