use log::debug;

use crate::config::{BLOCK_SIZE, DIR_ENTRIES, MAX_FILENAME, MAX_FILE_BLOCKS, MAX_PATHNAME, MAX_USERNAME, ROOT_BLOCK};
use crate::layout::data_block::{DataBlock, DirBlock, DirEntry};
use crate::layout::inode::Inode;
use crate::manager::error_code::{
    ErrorCode, EEXIST, EFBIG, EINVAL, EISDIR, ENOENT, ENOSPC, ENOTDIR, ENOTEMPTY, EPERM,
};
use crate::manager::fs::BlockFs;
use crate::sync::lock_table::BlockGuard;
use crate::sync::rw_lock::Access;
use crate::typ::file_name::FileName;
use crate::typ::file_type::FileKind;
use crate::typ::owner::Owner;
use crate::typ::request::{Op, Reply, Request};

/// Split a path into its name components. Paths start with `/`, never end
/// with one, and every component is non-empty, free of whitespace, and at
/// most [`MAX_FILENAME`] bytes.
pub(crate) fn tokenize(path: &str) -> Result<Vec<&str>, ErrorCode> {
    if path.len() > MAX_PATHNAME || path.ends_with('/') {
        return Err(EINVAL);
    }
    let rest = path.strip_prefix('/').ok_or(EINVAL)?;
    let mut tokens = Vec::new();
    for token in rest.split('/') {
        if token.is_empty() || token.len() > MAX_FILENAME {
            return Err(EINVAL);
        }
        if token.bytes().any(|b| b == 0 || b.is_ascii_whitespace()) {
            return Err(EINVAL);
        }
        tokens.push(token);
    }
    Ok(tokens)
}

impl BlockFs {
    /// The single entry point for all client operations. SESSION is a
    /// no-op here; the server layer handles session issuance.
    pub fn apply(&self, request: &Request) -> Result<Reply, ErrorCode> {
        debug!("{}: {:?}", request.user, request.op);
        match &request.op {
            Op::Session => Ok(Reply::Done),
            Op::ReadBlock { path, offset } => self
                .read_op(&request.user, path, *offset)
                .map(Reply::Data),
            Op::WriteBlock { path, offset, data } => self
                .write_op(&request.user, path, *offset, data)
                .map(|_| Reply::Done),
            Op::Create { path, kind } => self
                .create_op(&request.user, path, *kind)
                .map(|_| Reply::Done),
            Op::Delete { path } => self.delete_op(&request.user, path).map(|_| Reply::Done),
        }
    }

    /// Hand-over-hand walk over the first `depth` tokens. Returns the
    /// block of the inode reached and the lock held on it: `last` access
    /// on the final step, read access on the way down. Every inode the
    /// walk passes through must be a directory that admits `user`.
    ///
    /// Locks are taken strictly root-to-leaf and the walk holds at most
    /// two at once, so opposing acquisition orders cannot arise.
    fn walk(
        &self,
        user: &str,
        tokens: &[&str],
        depth: usize,
        last: Access,
    ) -> Result<(u32, BlockGuard), ErrorCode> {
        let mut current = ROOT_BLOCK;
        // operations whose target is the root take its lock in final mode
        let first = if depth == 0 { last } else { Access::Read };
        let mut guard = self.locks.acquire(current, first);

        for (i, token) in tokens.iter().take(depth).enumerate() {
            let inode = self.read_inode(current);
            if !inode.is_dir() {
                return Err(ENOTDIR);
            }
            if !inode.owner.permits(user) {
                return Err(EPERM);
            }
            let child = self.find_entry(&inode, token).ok_or(ENOENT)?;
            let access = if i + 1 == depth { last } else { Access::Read };
            let child_guard = self.locks.acquire(child, access);
            // the assignment drops the parent guard, after the child lock
            // is already held
            guard = child_guard;
            current = child;
        }
        Ok((current, guard))
    }

    fn find_entry(&self, dir: &Inode, name: &str) -> Option<u32> {
        for i in 0..dir.size as usize {
            let entries = self.read_dir(dir.blocks[i]);
            for entry in entries.iter() {
                if entry.is_live() && entry.name.as_str() == name {
                    return Some(entry.inode_block);
                }
            }
        }
        None
    }

    fn read_op(&self, user: &str, path: &str, offset: u32) -> Result<Box<DataBlock>, ErrorCode> {
        let tokens = tokenize(path)?;
        let (target, _guard) = self.walk(user, &tokens, tokens.len(), Access::Read)?;

        let inode = self.read_inode(target);
        if !inode.owner.permits(user) {
            return Err(EPERM);
        }
        if !inode.is_file() {
            return Err(EISDIR);
        }
        if offset >= inode.size {
            return Err(EINVAL);
        }
        let mut buf = Box::new([0u8; BLOCK_SIZE]);
        self.read_data(inode.blocks[offset as usize], &mut buf);
        Ok(buf)
    }

    fn write_op(
        &self,
        user: &str,
        path: &str,
        offset: u32,
        data: &DataBlock,
    ) -> Result<(), ErrorCode> {
        let tokens = tokenize(path)?;
        let (target, _guard) = self.walk(user, &tokens, tokens.len(), Access::Write)?;

        let mut inode = self.read_inode(target);
        if !inode.owner.permits(user) {
            return Err(EPERM);
        }
        if !inode.is_file() {
            return Err(EISDIR);
        }
        if offset as usize >= MAX_FILE_BLOCKS {
            return Err(EFBIG);
        }
        if offset > inode.size {
            return Err(EINVAL);
        }

        if offset == inode.size {
            let block = self.free.allocate().ok_or(ENOSPC)?;
            // data first; the inode write publishes the block
            self.write_data(block, data);
            inode.blocks[offset as usize] = block;
            inode.size += 1;
            self.write_inode(target, &inode);
        } else {
            self.write_data(inode.blocks[offset as usize], data);
        }
        Ok(())
    }

    fn create_op(&self, user: &str, path: &str, kind: FileKind) -> Result<(), ErrorCode> {
        if user.len() > MAX_USERNAME {
            return Err(EINVAL);
        }
        let tokens = tokenize(path)?;
        let name = *tokens.last().ok_or(EINVAL)?;
        let depth = tokens.len() - 1;
        let (parent, _guard) = self.walk(user, &tokens, depth, Access::Write)?;

        let mut dir = self.read_inode(parent);
        if !dir.owner.permits(user) {
            return Err(EPERM);
        }
        if !dir.is_dir() {
            return Err(ENOTDIR);
        }

        // Full scan: a duplicate name anywhere aborts, and the first free
        // slot (if any) is where the entry will land.
        let mut slot: Option<(usize, usize, DirBlock)> = None;
        for i in 0..dir.size as usize {
            let entries = self.read_dir(dir.blocks[i]);
            for (j, entry) in entries.iter().enumerate() {
                if entry.is_live() {
                    if entry.name.as_str() == name {
                        return Err(EEXIST);
                    }
                } else if slot.is_none() {
                    slot = Some((i, j, entries));
                }
            }
        }

        let file_name = FileName::new(name).ok_or(EINVAL)?;
        match slot {
            Some((i, j, mut entries)) => {
                let inode_block = self.free.allocate().ok_or(ENOSPC)?;
                self.write_inode(inode_block, &Inode::new(kind, Owner::new(user)));
                self.locks.insert(inode_block);
                entries[j] = DirEntry::new(file_name, inode_block);
                self.write_dir(dir.blocks[i], &entries);
            }
            None => {
                if dir.size as usize == MAX_FILE_BLOCKS {
                    return Err(EFBIG);
                }
                // a fresh directory block and the inode, atomically
                let fresh = self.free.allocate_n(2).ok_or(ENOSPC)?;
                let (dir_block, inode_block) = (fresh[0], fresh[1]);
                self.write_inode(inode_block, &Inode::new(kind, Owner::new(user)));
                self.locks.insert(inode_block);

                let mut entries = [DirEntry::FREE; DIR_ENTRIES];
                entries[0] = DirEntry::new(file_name, inode_block);
                // the directory block goes to disk before the parent inode
                // publishes it, so every intermediate state stays reachable
                // or free
                self.write_dir(dir_block, &entries);
                dir.blocks[dir.size as usize] = dir_block;
                dir.size += 1;
                self.write_inode(parent, &dir);
            }
        }
        Ok(())
    }

    fn delete_op(&self, user: &str, path: &str) -> Result<(), ErrorCode> {
        let tokens = tokenize(path)?;
        let name = *tokens.last().ok_or(EINVAL)?;
        let depth = tokens.len() - 1;
        let (parent, _parent_guard) = self.walk(user, &tokens, depth, Access::Write)?;

        let mut dir = self.read_inode(parent);
        if !dir.owner.permits(user) {
            return Err(EPERM);
        }
        if !dir.is_dir() {
            return Err(ENOTDIR);
        }

        let mut found: Option<(usize, usize, DirBlock)> = None;
        'scan: for i in 0..dir.size as usize {
            let entries = self.read_dir(dir.blocks[i]);
            for (j, entry) in entries.iter().enumerate() {
                if entry.is_live() && entry.name.as_str() == name {
                    found = Some((i, j, entries));
                    break 'scan;
                }
            }
        }
        let (i, j, mut entries) = found.ok_or(ENOENT)?;
        let victim = entries[j].inode_block;

        // The parent write lock is held, so the child cannot vanish
        // between the scan and this acquire.
        let child_guard = self.locks.acquire(victim, Access::Write);
        let child = self.read_inode(victim);
        if child.is_dir() && child.size > 0 {
            return Err(ENOTEMPTY);
        }
        if !child.owner.is(user) {
            return Err(EPERM);
        }

        let live = entries.iter().filter(|e| e.is_live()).count();
        if live == 1 {
            // the victim's entry is the last one in this directory block:
            // evict the whole block from the parent
            let evicted = dir.blocks[i];
            for k in i..dir.size as usize - 1 {
                dir.blocks[k] = dir.blocks[k + 1];
            }
            dir.size -= 1;
            self.write_inode(parent, &dir);
            self.free.release(evicted);
        } else {
            entries[j] = DirEntry::FREE;
            self.write_dir(dir.blocks[i], &entries);
        }

        // Reclamation strictly after the parent's new image is on disk;
        // a crash in between only leaks blocks until the next mount.
        if child.is_file() {
            for k in 0..child.size as usize {
                self.free.release(child.blocks[k]);
            }
        }
        self.free.release(victim);

        drop(child_guard);
        self.locks.remove(victim);
        Ok(())
    }
}
