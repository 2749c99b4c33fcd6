//! Session issuance and replay protection.
//!
//! A session binds a user to a monotonic sequence space. Ids are handed
//! out from a single counter and never recycled; once the counter is
//! spent, no further sessions can be opened by anyone.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use log::debug;

pub struct SessionTable {
    inner: Mutex<Sessions>,
}

#[derive(Default)]
struct Sessions {
    next_id: u32,
    exhausted: bool,
    owned: HashMap<String, HashSet<u32>>,
    last_seq: HashMap<u32, u32>,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable {
            inner: Mutex::new(Sessions::default()),
        }
    }

    /// Allocate the next session id for `user`, seeding its sequence
    /// counter with the sequence of the SESSION request itself. None once
    /// the id space is exhausted.
    pub fn open(&self, user: &str, sequence: u32) -> Option<u32> {
        let mut sessions = self.inner.lock().unwrap();
        if sessions.exhausted {
            return None;
        }
        let id = sessions.next_id;
        if id == u32::MAX {
            sessions.exhausted = true;
        } else {
            sessions.next_id += 1;
        }
        sessions.owned.entry(user.to_string()).or_default().insert(id);
        sessions.last_seq.insert(id, sequence);
        debug!("session {} opened for {}", id, user);
        Some(id)
    }

    /// Check and advance in one critical section: the session must belong
    /// to `user` and the sequence must be strictly larger than anything
    /// seen on it. A replayed or reordered frame fails without side
    /// effects.
    pub fn validate(&self, user: &str, session: u32, sequence: u32) -> bool {
        let mut sessions = self.inner.lock().unwrap();
        let owned = sessions
            .owned
            .get(user)
            .map_or(false, |set| set.contains(&session));
        if !owned {
            return false;
        }
        match sessions.last_seq.get_mut(&session) {
            Some(last) if *last < sequence => {
                *last = sequence;
                true
            }
            _ => false,
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        SessionTable::new()
    }
}
