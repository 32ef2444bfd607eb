//! In-memory per-user conversation state.
//!
//! A session records which flow a user started (`/createzip`,
//! `/quickcreate`, `/createpdf`) and, for large structures, the entries
//! waiting for a "yes". Sessions expire after a TTL and the store is bounded;
//! when full the oldest session is evicted.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use {
    fsbot_structure::{ArchiveFormat, StructureEntry},
    tracing::debug,
};

/// Flow a user is in the middle of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `/createzip`: expects an uploaded file or text.
    Archive,
    /// `/quickcreate`: expects the path list as a message.
    QuickArchive,
    /// `/createpdf`: expects text or a text file.
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub action: Action,
    pub format: ArchiveFormat,
    /// Entries held back until the user confirms.
    pub pending: Option<Vec<StructureEntry>>,
}

impl Session {
    #[must_use]
    pub fn awaiting(action: Action, format: ArchiveFormat) -> Self {
        Self {
            action,
            format,
            pending: None,
        }
    }

    #[must_use]
    pub fn confirming(format: ArchiveFormat, entries: Vec<StructureEntry>) -> Self {
        Self {
            action: Action::Archive,
            format,
            pending: Some(entries),
        }
    }
}

struct Slot {
    session: Session,
    touched: Instant,
}

/// Sessions keyed by Telegram user id.
///
/// The lock is a `std::sync::Mutex`: every operation is a synchronous map
/// access and the guard never crosses an `.await`.
pub struct SessionStore {
    slots: Mutex<HashMap<u64, Slot>>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Store `session` for `user`, replacing any existing one.
    pub fn set(&self, user: u64, session: Session) {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        let ttl = self.ttl;
        slots.retain(|_, slot| now.duration_since(slot.touched) < ttl);

        if !slots.contains_key(&user)
            && slots.len() >= self.max_sessions
            && let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(id, _)| *id)
        {
            debug!(user = oldest, "session store full, evicting oldest");
            slots.remove(&oldest);
        }

        slots.insert(user, Slot {
            session,
            touched: now,
        });
    }

    /// Current session for `user`, if any and not expired.
    pub fn get(&self, user: u64) -> Option<Session> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(&user)
            .filter(|slot| slot.touched.elapsed() < self.ttl)
            .map(|slot| slot.session.clone())
    }

    /// Remove and return the session for `user`.
    pub fn take(&self, user: u64) -> Option<Session> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .remove(&user)
            .filter(|slot| slot.touched.elapsed() < self.ttl)
            .map(|slot| slot.session)
    }

    pub fn delete(&self, user: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&user);
    }

    /// Number of stored sessions, expired ones included until the next `set`.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
