use std::fmt;
use std::str;

use crate::config::MAX_USERNAME;
use crate::utils::slice::until_nul;

/// NUL-terminated owner field of an inode. The empty string means the
/// inode is public: any user may traverse or operate on it.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Owner([u8; MAX_USERNAME + 1]);

impl Owner {
    pub const PUBLIC: Owner = Owner([0u8; MAX_USERNAME + 1]);

    /// Caller guarantees `user` fits; the wire layer enforces the bound.
    pub fn new(user: &str) -> Owner {
        debug_assert!(user.len() <= MAX_USERNAME);
        let mut buf = [0u8; MAX_USERNAME + 1];
        let len = user.len().min(MAX_USERNAME);
        buf[..len].copy_from_slice(&user.as_bytes()[..len]);
        Owner(buf)
    }

    pub fn is_public(&self) -> bool {
        self.0[0] == 0
    }

    /// Strict ownership, the DELETE rule.
    pub fn is(&self, user: &str) -> bool {
        until_nul(&self.0) == user.as_bytes()
    }

    /// Traversal rule: public inodes admit everyone.
    pub fn permits(&self, user: &str) -> bool {
        self.is_public() || self.is(user)
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = str::from_utf8(until_nul(&self.0)).unwrap_or("?");
        write!(f, "Owner({:?})", name)
    }
}
