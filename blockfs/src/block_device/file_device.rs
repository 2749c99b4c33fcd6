use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use crate::block_device::block_device::BlockDevice;
use crate::config::{BLOCK_SIZE, DISK_BLOCKS};
use crate::layout::data_block::DataBlock;

/// Disk image backed by a host file. The mutex serializes seek+transfer
/// pairs, which is what makes per-block I/O atomic.
pub struct FileDevice {
    pub file: Arc<Mutex<File>>,
}

impl FileDevice {
    /// Open (or create) a disk image and size it to the full disk.
    pub fn open(path: &str) -> io::Result<FileDevice> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len((DISK_BLOCKS * BLOCK_SIZE) as u64)?;
        Ok(FileDevice {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl BlockDevice for FileDevice {
    fn read_block(&self, block: u32, buf: &mut DataBlock) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))
            .expect("Error when seeking!");
        file.read_exact(buf).expect("Not a complete block!");
    }

    fn write_block(&self, block: u32, data: &DataBlock) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))
            .expect("Error when seeking!");
        file.write_all(data).expect("Not a complete block!");
    }
}
