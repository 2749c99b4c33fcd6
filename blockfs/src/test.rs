#![cfg(test)]

//! Whole-engine tests over a RAM disk, including the structural
//! invariants every operation sequence must preserve.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use crate::block_device::block_device::BlockDevice;
use crate::block_device::mem_device::MemDevice;
use crate::config::{BLOCK_SIZE, DISK_BLOCKS, MAX_FILE_BLOCKS, ROOT_BLOCK};
use crate::layout::data_block::DataBlock;
use crate::manager::error_code::{
    ErrorCode, EEXIST, EFBIG, EINVAL, EISDIR, ENOENT, ENOSPC, ENOTDIR, ENOTEMPTY, EPERM,
};
use crate::manager::fs::BlockFs;
use crate::typ::file_type::FileKind;
use crate::typ::request::{Op, Reply, Request};

fn fresh_fs() -> BlockFs {
    let device: Arc<dyn BlockDevice> = Arc::new(MemDevice::new());
    BlockFs::format(&device);
    BlockFs::mount(device).unwrap()
}

fn block_of(byte: u8) -> DataBlock {
    [byte; BLOCK_SIZE]
}

fn request(user: &str, op: Op) -> Request {
    Request {
        user: user.into(),
        session: 0,
        sequence: 0,
        op,
    }
}

fn create(fs: &BlockFs, user: &str, path: &str, kind: FileKind) -> Result<(), ErrorCode> {
    let op = Op::Create {
        path: path.into(),
        kind,
    };
    fs.apply(&request(user, op)).map(|_| ())
}

fn delete(fs: &BlockFs, user: &str, path: &str) -> Result<(), ErrorCode> {
    let op = Op::Delete { path: path.into() };
    fs.apply(&request(user, op)).map(|_| ())
}

fn write(fs: &BlockFs, user: &str, path: &str, offset: u32, data: &DataBlock) -> Result<(), ErrorCode> {
    let op = Op::WriteBlock {
        path: path.into(),
        offset,
        data: Box::new(*data),
    };
    fs.apply(&request(user, op)).map(|_| ())
}

fn read(fs: &BlockFs, user: &str, path: &str, offset: u32) -> Result<DataBlock, ErrorCode> {
    let op = Op::ReadBlock {
        path: path.into(),
        offset,
    };
    fs.apply(&request(user, op)).map(|reply| match reply {
        Reply::Data(data) => *data,
        Reply::Done => panic!("read returned no data"),
    })
}

/// Walk the on-disk tree and check the structural invariants: the
/// free/reachable partition, per-directory name uniqueness, no empty
/// directory blocks inside `blocks[..size]`, and lock-table hygiene.
fn check_invariants(fs: &BlockFs) {
    let mut reachable = HashSet::new();
    let mut inodes = HashSet::new();
    visit(fs, ROOT_BLOCK, &mut reachable, &mut inodes);

    let free: HashSet<u32> = fs.free.snapshot().into_iter().collect();
    assert_eq!(free.len(), fs.free.remaining());
    for block in 0..DISK_BLOCKS as u32 {
        let is_free = free.contains(&block);
        let is_reachable = reachable.contains(&block);
        assert!(
            is_free != is_reachable,
            "block {} free={} reachable={}",
            block,
            is_free,
            is_reachable
        );
    }

    assert_eq!(fs.locks.len(), inodes.len());
    for &block in &inodes {
        assert!(fs.locks.contains(block), "no lock for inode {}", block);
    }
}

fn visit(fs: &BlockFs, block: u32, reachable: &mut HashSet<u32>, inodes: &mut HashSet<u32>) {
    assert!(reachable.insert(block), "block {} referenced twice", block);
    inodes.insert(block);
    let inode = fs.read_inode(block);
    assert!(inode.kind().is_some());
    for i in 0..inode.size as usize {
        assert!(reachable.insert(inode.blocks[i]));
    }
    if inode.is_dir() {
        let mut names = HashMap::new();
        for i in 0..inode.size as usize {
            let entries = fs.read_dir(inode.blocks[i]);
            let live = entries.iter().filter(|e| e.is_live()).count();
            assert!(live >= 1, "directory block {} is empty", inode.blocks[i]);
            for entry in entries.iter().filter(|e| e.is_live()) {
                let previous = names.insert(entry.name.as_str().to_string(), entry.inode_block);
                assert!(previous.is_none(), "duplicate name {:?}", entry.name);
                visit(fs, entry.inode_block, reachable, inodes);
            }
        }
    }
}

#[test]
fn fresh_disk_has_only_the_root() {
    let fs = fresh_fs();
    assert_eq!(fs.free_blocks(), DISK_BLOCKS - 1);
    assert_eq!(fs.locks.len(), 1);
    check_invariants(&fs);
}

#[test]
fn remount_rebuilds_the_same_state() {
    let device: Arc<dyn BlockDevice> = Arc::new(MemDevice::new());
    BlockFs::format(&device);
    let fs = BlockFs::mount(device.clone()).unwrap();
    create(&fs, "alice", "/dir", FileKind::Dir).unwrap();
    create(&fs, "alice", "/dir/f", FileKind::File).unwrap();
    write(&fs, "alice", "/dir/f", 0, &block_of(9)).unwrap();
    let free_before = fs.free_blocks();
    drop(fs);

    let fs = BlockFs::mount(device).unwrap();
    assert_eq!(fs.free_blocks(), free_before);
    assert_eq!(read(&fs, "alice", "/dir/f", 0).unwrap(), block_of(9));
    check_invariants(&fs);
}

#[test]
fn write_then_read_round_trip() {
    let fs = fresh_fs();
    create(&fs, "alice", "/f", FileKind::File).unwrap();
    write(&fs, "alice", "/f", 0, &block_of(0xAA)).unwrap();
    write(&fs, "alice", "/f", 1, &block_of(0xBB)).unwrap();
    assert_eq!(read(&fs, "alice", "/f", 0).unwrap(), block_of(0xAA));
    assert_eq!(read(&fs, "alice", "/f", 1).unwrap(), block_of(0xBB));

    // overwrite in place does not consume a block
    let free = fs.free_blocks();
    write(&fs, "alice", "/f", 0, &block_of(0xCC)).unwrap();
    assert_eq!(fs.free_blocks(), free);
    assert_eq!(read(&fs, "alice", "/f", 0).unwrap(), block_of(0xCC));
    check_invariants(&fs);
}

#[test]
fn read_and_write_offsets_are_bounded() {
    let fs = fresh_fs();
    create(&fs, "alice", "/f", FileKind::File).unwrap();
    assert_eq!(read(&fs, "alice", "/f", 0), Err(EINVAL));
    // appends go exactly at size; a gap is rejected
    assert_eq!(write(&fs, "alice", "/f", 1, &block_of(1)), Err(EINVAL));
    write(&fs, "alice", "/f", 0, &block_of(1)).unwrap();
    assert_eq!(read(&fs, "alice", "/f", 1), Err(EINVAL));
    check_invariants(&fs);
}

#[test]
fn file_stops_growing_at_the_block_limit() {
    let fs = fresh_fs();
    create(&fs, "alice", "/f", FileKind::File).unwrap();
    for offset in 0..MAX_FILE_BLOCKS as u32 {
        write(&fs, "alice", "/f", offset, &block_of(1)).unwrap();
    }
    assert_eq!(
        write(&fs, "alice", "/f", MAX_FILE_BLOCKS as u32, &block_of(1)),
        Err(EFBIG)
    );
    check_invariants(&fs);
}

#[test]
fn create_delete_restores_free_space() {
    let fs = fresh_fs();
    let free = fs.free_blocks();

    create(&fs, "alice", "/dir", FileKind::Dir).unwrap();
    create(&fs, "alice", "/dir/f", FileKind::File).unwrap();
    write(&fs, "alice", "/dir/f", 0, &block_of(7)).unwrap();
    check_invariants(&fs);

    delete(&fs, "alice", "/dir/f").unwrap();
    delete(&fs, "alice", "/dir").unwrap();
    assert_eq!(fs.free_blocks(), free);
    check_invariants(&fs);
}

#[test]
fn duplicate_names_are_rejected() {
    let fs = fresh_fs();
    create(&fs, "alice", "/x", FileKind::File).unwrap();
    assert_eq!(create(&fs, "alice", "/x", FileKind::File), Err(EEXIST));
    assert_eq!(create(&fs, "alice", "/x", FileKind::Dir), Err(EEXIST));
    check_invariants(&fs);
}

#[test]
fn missing_components_fail_cleanly() {
    let fs = fresh_fs();
    assert_eq!(create(&fs, "alice", "/no/f", FileKind::File), Err(ENOENT));
    assert_eq!(read(&fs, "alice", "/no", 0), Err(ENOENT));
    assert_eq!(delete(&fs, "alice", "/no"), Err(ENOENT));
    check_invariants(&fs);
}

#[test]
fn files_do_not_act_as_directories() {
    let fs = fresh_fs();
    create(&fs, "alice", "/f", FileKind::File).unwrap();
    assert_eq!(create(&fs, "alice", "/f/g", FileKind::File), Err(ENOTDIR));
    create(&fs, "alice", "/d", FileKind::Dir).unwrap();
    assert_eq!(read(&fs, "alice", "/d", 0), Err(EISDIR));
    assert_eq!(write(&fs, "alice", "/d", 0, &block_of(0)), Err(EISDIR));
    check_invariants(&fs);
}

#[test]
fn non_empty_directories_survive_delete() {
    let fs = fresh_fs();
    create(&fs, "alice", "/dir", FileKind::Dir).unwrap();
    create(&fs, "alice", "/dir/f", FileKind::File).unwrap();
    assert_eq!(delete(&fs, "alice", "/dir"), Err(ENOTEMPTY));
    // still intact
    write(&fs, "alice", "/dir/f", 0, &block_of(3)).unwrap();
    check_invariants(&fs);
}

#[test]
fn ownership_guards_every_level() {
    let fs = fresh_fs();
    create(&fs, "alice", "/private", FileKind::Dir).unwrap();
    create(&fs, "alice", "/private/f", FileKind::File).unwrap();
    write(&fs, "alice", "/private/f", 0, &block_of(1)).unwrap();

    // bob cannot cross alice's directory
    assert_eq!(read(&fs, "bob", "/private/f", 0), Err(EPERM));
    assert_eq!(create(&fs, "bob", "/private/g", FileKind::File), Err(EPERM));

    // in the public root bob still cannot delete what alice owns
    create(&fs, "alice", "/shared", FileKind::File).unwrap();
    assert_eq!(delete(&fs, "bob", "/shared"), Err(EPERM));
    delete(&fs, "alice", "/shared").unwrap();
    check_invariants(&fs);
}

#[test]
fn directory_grows_and_shrinks_by_whole_blocks() {
    let fs = fresh_fs();
    create(&fs, "alice", "/d", FileKind::Dir).unwrap();
    let base = fs.free_blocks();

    // first create inside an empty directory costs two blocks, the next
    // seven fill the same directory block for one block each
    create(&fs, "alice", "/d/f0", FileKind::File).unwrap();
    assert_eq!(fs.free_blocks(), base - 2);
    for n in 1..8 {
        create(&fs, "alice", &format!("/d/f{}", n), FileKind::File).unwrap();
    }
    assert_eq!(fs.free_blocks(), base - 9);

    // the ninth entry opens a second directory block
    create(&fs, "alice", "/d/f8", FileKind::File).unwrap();
    assert_eq!(fs.free_blocks(), base - 11);
    check_invariants(&fs);

    // deleting the lone occupant of the second block evicts that block
    delete(&fs, "alice", "/d/f8").unwrap();
    assert_eq!(fs.free_blocks(), base - 9);
    check_invariants(&fs);

    // a freed slot in the first block is reused without fresh blocks
    delete(&fs, "alice", "/d/f3").unwrap();
    create(&fs, "alice", "/d/again", FileKind::File).unwrap();
    assert_eq!(fs.free_blocks(), base - 9);
    check_invariants(&fs);
}

#[test]
fn full_disk_rejects_appends_without_growing() {
    let fs = fresh_fs();
    create(&fs, "alice", "/f", FileKind::File).unwrap();
    write(&fs, "alice", "/f", 0, &block_of(1)).unwrap();

    let drained = fs.free.allocate_n(fs.free_blocks()).unwrap();
    assert_eq!(fs.free_blocks(), 0);
    assert_eq!(write(&fs, "alice", "/f", 1, &block_of(2)), Err(ENOSPC));
    assert_eq!(read(&fs, "alice", "/f", 1), Err(EINVAL));

    for block in drained {
        fs.free.release(block);
    }
    write(&fs, "alice", "/f", 1, &block_of(2)).unwrap();
    check_invariants(&fs);
}

#[test]
fn disjoint_subtrees_run_in_parallel() {
    let fs = Arc::new(fresh_fs());
    create(&fs, "alice", "/a", FileKind::Dir).unwrap();
    create(&fs, "bob", "/b", FileKind::Dir).unwrap();

    let mut handles = Vec::new();
    for (user, top) in [("alice", "/a"), ("bob", "/b")] {
        let fs = fs.clone();
        handles.push(thread::spawn(move || {
            for n in 0..20 {
                let path = format!("{}/f{}", top, n);
                create(&fs, user, &path, FileKind::File).unwrap();
                write(&fs, user, &path, 0, &block_of(n as u8)).unwrap();
            }
            for n in 0..20 {
                let path = format!("{}/f{}", top, n);
                assert_eq!(read(&fs, user, &path, 0).unwrap(), block_of(n as u8));
                delete(&fs, user, &path).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let fs = Arc::try_unwrap(fs).ok().expect("threads joined");
    check_invariants(&fs);
}

#[test]
fn contended_directory_stays_consistent() {
    let fs = Arc::new(fresh_fs());
    create(&fs, "alice", "/shared", FileKind::Dir).unwrap();

    let mut handles = Vec::new();
    for t in 0..4 {
        let fs = fs.clone();
        handles.push(thread::spawn(move || {
            for n in 0..10 {
                let path = format!("/shared/t{}n{}", t, n);
                create(&fs, "alice", &path, FileKind::File).unwrap();
                write(&fs, "alice", &path, 0, &block_of(t)).unwrap();
                delete(&fs, "alice", &path).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let fs = Arc::try_unwrap(fs).ok().expect("threads joined");
    assert_eq!(fs.free_blocks(), DISK_BLOCKS - 2);
    check_invariants(&fs);
}
