use libc::c_int;

pub type ErrorCode = c_int;

// EPERM: Operation not permitted
pub const EPERM: ErrorCode = libc::EPERM;
// ENOENT: No such file or directory
pub const ENOENT: ErrorCode = libc::ENOENT;
// EIO: Input/output error
pub const EIO: ErrorCode = libc::EIO;
// EEXIST: File exists
pub const EEXIST: ErrorCode = libc::EEXIST;
// ENOTDIR: Not a directory
pub const ENOTDIR: ErrorCode = libc::ENOTDIR;
// EISDIR: Is a directory
pub const EISDIR: ErrorCode = libc::EISDIR;
// EINVAL: Invalid argument
pub const EINVAL: ErrorCode = libc::EINVAL;
// EFBIG: File too large
pub const EFBIG: ErrorCode = libc::EFBIG;
// ENOSPC: No space left on device
pub const ENOSPC: ErrorCode = libc::ENOSPC;
// ENOTEMPTY: Directory not empty
pub const ENOTEMPTY: ErrorCode = libc::ENOTEMPTY;
