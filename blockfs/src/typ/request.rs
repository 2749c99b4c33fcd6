use std::fmt;

use crate::layout::data_block::DataBlock;
use crate::typ::file_type::FileKind;

/// A fully parsed client request. The wire layer builds one; the engine
/// branches on `op` only after the target inode is locked.
#[derive(Debug)]
pub struct Request {
    pub user: String,
    pub session: u32,
    pub sequence: u32,
    pub op: Op,
}

pub enum Op {
    Session,
    ReadBlock { path: String, offset: u32 },
    WriteBlock { path: String, offset: u32, data: Box<DataBlock> },
    Create { path: String, kind: FileKind },
    Delete { path: String },
}

pub enum Reply {
    Done,
    Data(Box<DataBlock>),
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Session => write!(f, "Session"),
            Op::ReadBlock { path, offset } => write!(f, "ReadBlock({:?}, {})", path, offset),
            Op::WriteBlock { path, offset, .. } => write!(f, "WriteBlock({:?}, {})", path, offset),
            Op::Create { path, kind } => write!(f, "Create({:?}, {:?})", path, kind),
            Op::Delete { path } => write!(f, "Delete({:?})", path),
        }
    }
}
