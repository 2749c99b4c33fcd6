use crate::layout::data_block::DataBlock;

/// Whole-block I/O over a fixed-size disk. Each call transfers exactly one
/// block and is atomic with respect to concurrent calls on the same block.
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block: u32, buf: &mut DataBlock);
    fn write_block(&self, block: u32, data: &DataBlock);
}
