use std::fmt;
use std::str;

use crate::config::MAX_FILENAME;
use crate::utils::slice::until_nul;

/// NUL-terminated directory-entry name, at most [`MAX_FILENAME`] bytes.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct FileName([u8; MAX_FILENAME + 1]);

impl FileName {
    pub const EMPTY: FileName = FileName([0u8; MAX_FILENAME + 1]);

    /// None if the name is empty, oversized, or carries an embedded NUL.
    pub fn new(name: &str) -> Option<FileName> {
        if name.is_empty() || name.len() > MAX_FILENAME || name.bytes().any(|b| b == 0) {
            return None;
        }
        let mut buf = [0u8; MAX_FILENAME + 1];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Some(FileName(buf))
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    pub fn as_str(&self) -> &str {
        str::from_utf8(until_nul(&self.0)).unwrap_or("")
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(FileName::new("").is_none());
        assert!(FileName::new(&"x".repeat(MAX_FILENAME + 1)).is_none());
        assert!(FileName::new("a\0b").is_none());
        let name = FileName::new(&"y".repeat(MAX_FILENAME)).unwrap();
        assert_eq!(name.as_str().len(), MAX_FILENAME);
    }

    #[test]
    fn round_trip() {
        let name = FileName::new("report.txt").unwrap();
        assert_eq!(name.as_str(), "report.txt");
        assert!(!name.is_empty());
        assert!(FileName::EMPTY.is_empty());
    }
}
