use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::{sync::Notify, time::Instant};
use tracing::{debug, info};

use crate::{
    config::Config,
    entity::{Candidate, Role, Session},
    error::RelayError,
};

pub const OFFER: &str = "Offer";
pub const ANSWER: &str = "Answer";

/// Owns the `Store` and its purge task. The task is shut down when the guard
/// is dropped.
pub struct StoreDropGuard {
    store: Store,
}

/// Registry of negotiation sessions, keyed by the caller's session id.
///
/// Cloning is cheap and every clone sees the same sessions.
///
/// Two levels of locking: the map itself only guards get-or-insert of a
/// session slot, and each slot has its own mutex for the read-modify-write of
/// an operation. Operations on different ids never wait on each other's slot.
#[derive(Clone, Default)]
pub struct Store {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    sessions: DashMap<String, Arc<Mutex<Slot>>>,
    /// `None` means sessions live until deleted.
    ttl: Option<Duration>,
    /// Wakes the purge task so it can observe `shutdown`.
    background_task: Notify,
    shutdown: AtomicBool,
}

struct Slot {
    session: Session,
    /// Set once the slot has been removed from the map. A caller that fetched
    /// the slot before the removal must retry against the map.
    detached: bool,
}

impl StoreDropGuard {
    /// Create the store and, when expiry is enabled, spawn its purge task.
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config) -> StoreDropGuard {
        let store = Store::new(config.session_ttl());
        if let Some(ttl) = store.shared.ttl {
            let shared = store.shared.clone();
            let interval = config.purge_interval();
            debug!(?ttl, ?interval, "starting session purge task");
            tokio::spawn(purge_expired_tasks(shared, interval));
        }
        StoreDropGuard { store }
    }

    pub fn store(&self) -> Store {
        self.store.clone()
    }
}

impl Drop for StoreDropGuard {
    fn drop(&mut self) {
        self.store.shutdown_purge_task();
    }
}

impl Store {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(Shared {
                ttl,
                ..Default::default()
            }),
        }
    }

    /// Store the offer and drop both candidate lists.
    pub fn set_offer(&self, id: &str, sdp: impl Into<String>) {
        let sdp = sdp.into();
        self.update(id, move |session| session.set_offer(sdp));
    }

    pub fn get_offer(&self, id: &str) -> crate::Result<String> {
        self.read(id, |session| session.offer.clone())
            .flatten()
            .ok_or(RelayError::NotFound(OFFER))
    }

    pub fn set_answer(&self, id: &str, sdp: impl Into<String>) {
        let sdp = sdp.into();
        self.update(id, move |session| session.set_answer(sdp));
    }

    pub fn get_answer(&self, id: &str) -> crate::Result<String> {
        self.read(id, |session| session.answer.clone())
            .flatten()
            .ok_or(RelayError::NotFound(ANSWER))
    }

    /// Append to `role`'s candidates. Rejected input never creates a session.
    pub fn add_candidate(
        &self,
        id: &str,
        role: Role,
        candidate: &str,
        mid: &str,
    ) -> crate::Result<()> {
        let candidate = Candidate::new(candidate, mid)?;
        self.update(id, move |session| session.candidates_mut(role).push(candidate));
        Ok(())
    }

    /// Snapshot of `role`'s candidates in arrival order. Unknown sessions
    /// yield an empty list.
    pub fn list_candidates(&self, id: &str, role: Role) -> Vec<Candidate> {
        self.read(id, |session| session.candidates(role).clone())
            .unwrap_or_default()
    }

    /// Remove the session. Deleting an unknown id is a no-op.
    pub fn delete_session(&self, id: &str) {
        if let Some((_, slot)) = self.shared.sessions.remove(id) {
            slot.lock().detached = true;
        }
    }

    /// Remove every session idle for longer than the ttl as of `now`.
    /// Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        self.shared.purge_expired(now)
    }

    pub fn len(&self) -> usize {
        self.shared.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.sessions.is_empty()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.shared.ttl
    }

    fn update<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        loop {
            let now = Instant::now();
            // The shard guard is released at the end of this statement.
            let slot = self
                .shared
                .sessions
                .entry(id.to_string())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(Slot {
                        session: Session::new(now),
                        detached: false,
                    }))
                })
                .value()
                .clone();

            let mut slot = slot.lock();
            if slot.detached {
                continue;
            }
            slot.session.touch(now);
            return f(&mut slot.session);
        }
    }

    fn read<R>(&self, id: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let slot = self.shared.sessions.get(id).map(|s| s.value().clone())?;
        let mut slot = slot.lock();
        if slot.detached {
            return None;
        }
        slot.session.touch(Instant::now());
        Some(f(&slot.session))
    }

    fn shutdown_purge_task(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        // A stored permit wakes the task even if it is not waiting yet.
        self.shared.background_task.notify_one();
    }
}

impl Shared {
    fn purge_expired(&self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut purged = 0;
        self.sessions.retain(|id, slot| {
            let mut slot = slot.lock();
            if slot.session.is_expired(now, ttl) {
                debug!(session = %id, "session expired");
                slot.detached = true;
                purged += 1;
                false
            } else {
                true
            }
        });
        purged
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Sweep expired sessions every `interval` until the guard is dropped.
async fn purge_expired_tasks(shared: Arc<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    while !shared.is_shutdown() {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = shared.purge_expired(Instant::now());
                if purged > 0 {
                    info!(purged, remaining = shared.sessions.len(), "purged idle sessions");
                }
            }
            _ = shared.background_task.notified() => {}
        }
    }
    debug!("Purge background task shut down");
}
