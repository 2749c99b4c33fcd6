use std::sync::{Condvar, Mutex};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Access {
    Read,
    Write,
}

/// Reader/writer lock with the exact wake order the walk relies on: a
/// writer unlock wakes every waiting reader and at most one writer; the
/// last reader out wakes at most one writer. Readers wait while a writer
/// holds the lock, writers wait while anyone does.
pub struct RwMutex {
    state: Mutex<LockState>,
    readers: Condvar,
    writers: Condvar,
}

#[derive(Default)]
struct LockState {
    reading: u32,
    writing: u32,
}

impl RwMutex {
    pub fn new() -> RwMutex {
        RwMutex {
            state: Mutex::new(LockState::default()),
            readers: Condvar::new(),
            writers: Condvar::new(),
        }
    }

    pub fn lock(&self, access: Access) {
        match access {
            Access::Read => self.read_lock(),
            Access::Write => self.write_lock(),
        }
    }

    pub fn unlock(&self, access: Access) {
        match access {
            Access::Read => self.read_unlock(),
            Access::Write => self.write_unlock(),
        }
    }

    pub fn read_lock(&self) {
        let mut state = self.state.lock().unwrap();
        while state.writing > 0 {
            state = self.readers.wait(state).unwrap();
        }
        state.reading += 1;
    }

    pub fn read_unlock(&self) {
        let mut state = self.state.lock().unwrap();
        state.reading -= 1;
        if state.reading == 0 {
            self.writers.notify_one();
        }
    }

    pub fn write_lock(&self) {
        let mut state = self.state.lock().unwrap();
        while state.reading + state.writing > 0 {
            state = self.writers.wait(state).unwrap();
        }
        state.writing += 1;
    }

    pub fn write_unlock(&self) {
        let mut state = self.state.lock().unwrap();
        state.writing -= 1;
        self.readers.notify_all();
        self.writers.notify_one();
    }
}

impl Default for RwMutex {
    fn default() -> Self {
        RwMutex::new()
    }
}
