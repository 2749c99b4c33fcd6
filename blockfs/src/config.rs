//! File-system geometry and protocol limits.
//!
//! The record sizes in `layout` are pinned to these numbers so that one
//! inode and one directory block each occupy exactly one disk block.

/// Bytes per disk block, the unit of all device I/O.
pub const BLOCK_SIZE: usize = 512;

/// Blocks per disk.
pub const DISK_BLOCKS: usize = 4096;

/// Capacity of the per-inode `blocks[]` vector.
pub const MAX_FILE_BLOCKS: usize = 124;

/// Directory entries per directory block.
pub const DIR_ENTRIES: usize = 8;

/// Name bytes, excluding the terminating NUL.
pub const MAX_FILENAME: usize = 59;

pub const MAX_USERNAME: usize = 10;
pub const MAX_PASSWORD: usize = 16;
pub const MAX_PATHNAME: usize = 128;

/// Decimal digits of a `u32`, the widest integer the wire carries.
pub const MAX_INT_DIGITS: usize = 10;

/// Block 0 permanently holds the root directory inode.
pub const ROOT_BLOCK: u32 = 0;
