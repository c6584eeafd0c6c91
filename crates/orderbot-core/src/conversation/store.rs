//! Bounded, per-user locked conversation store.
//!
//! Each user id maps to its own `tokio::sync::Mutex`, so different users
//! never contend while one user's turns are strictly serialized. The map
//! is bounded two ways:
//!
//! - capacity: admitting a new user at `max_conversations` evicts the least
//!   recently active conversation that nobody currently holds;
//! - idle TTL: [`ConversationStore::evict_idle`] drops conversations
//!   untouched for longer than `idle_ttl`.
//!
//! A conversation is "held" while any caller owns a clone of its slot
//! (waiting on, or holding, the lock). Held conversations are never evicted.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use orderbot_types::config::ConversationSettings;
use orderbot_types::conversation::{ConversationSnapshot, Turn};

use super::{Conversation, HISTORY_WINDOW};

/// Limits applied by [`ConversationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub max_conversations: usize,
    pub idle_ttl: Duration,
    pub max_history: usize,
}

impl StoreConfig {
    /// Clamp to usable values: at least one conversation, at least the window.
    fn normalized(self) -> Self {
        Self {
            max_conversations: self.max_conversations.max(1),
            idle_ttl: self.idle_ttl,
            max_history: self.max_history.max(HISTORY_WINDOW),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from(&ConversationSettings::default())
    }
}

impl From<&ConversationSettings> for StoreConfig {
    fn from(settings: &ConversationSettings) -> Self {
        Self {
            max_conversations: settings.max_conversations,
            idle_ttl: Duration::from_secs(settings.idle_ttl_secs),
            max_history: settings.max_history,
        }
    }
}

#[derive(Clone)]
struct Slot {
    conversation: Arc<Mutex<Conversation>>,
    last_active_ms: Arc<AtomicU64>,
}

impl Slot {
    fn new(user_id: &str, max_history: usize, now_ms: u64) -> Self {
        Self {
            conversation: Arc::new(Mutex::new(Conversation::new(user_id, max_history))),
            last_active_ms: Arc::new(AtomicU64::new(now_ms)),
        }
    }

    /// Only the map itself references this slot.
    fn is_free(&self) -> bool {
        Arc::strong_count(&self.conversation) == 1
    }

    fn last_active(&self) -> u64 {
        self.last_active_ms.load(Ordering::Relaxed)
    }
}

struct StoreInner {
    slots: DashMap<String, Slot>,
    config: StoreConfig,
    epoch: Instant,
}

impl StoreInner {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Shared handle to all conversations. Cloning is cheap.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<StoreInner>,
}

impl ConversationStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                slots: DashMap::new(),
                config: config.normalized(),
                epoch: Instant::now(),
            }),
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.inner.config
    }

    /// Acquire the user's conversation, creating it on first access.
    ///
    /// Waiters for the same user are served in FIFO order.
    pub async fn lock(&self, user_id: &str) -> ConversationGuard {
        let slot = self.slot(user_id);
        let guard = slot.conversation.clone().lock_owned().await;
        slot.last_active_ms.store(self.inner.now_ms(), Ordering::Relaxed);

        ConversationGuard {
            guard,
            last_active_ms: slot.last_active_ms,
            store: Arc::clone(&self.inner),
        }
    }

    /// Copy of the user's turns, oldest first. Creates an empty conversation
    /// on first access.
    pub async fn get(&self, user_id: &str) -> Vec<Turn> {
        self.lock(user_id).await.turns().cloned().collect()
    }

    pub async fn append(&self, user_id: &str, turn: Turn) {
        self.lock(user_id).await.push(turn);
    }

    /// Reset the user's conversation to an empty `Idle` one.
    pub async fn clear(&self, user_id: &str) {
        self.lock(user_id).await.reset();
        debug!(user_id, "Conversation cleared");
    }

    /// Snapshot of an existing conversation. Never creates one.
    pub async fn snapshot(&self, user_id: &str) -> Option<ConversationSnapshot> {
        let slot = self.inner.slots.get(user_id).map(|s| s.value().clone())?;
        let conversation = slot.conversation.lock().await;
        Some(conversation.snapshot())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.inner.slots.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Remove conversations idle for longer than the configured TTL.
    ///
    /// Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let now = self.inner.now_ms();
        let ttl = u64::try_from(self.inner.config.idle_ttl.as_millis()).unwrap_or(u64::MAX);
        let mut evicted = 0;

        self.inner.slots.retain(|_, slot| {
            let expired = slot.is_free() && now.saturating_sub(slot.last_active()) > ttl;
            if expired {
                evicted += 1;
            }
            !expired
        });

        if evicted > 0 {
            debug!(evicted, remaining = self.len(), "Evicted idle conversations");
        }
        evicted
    }

    fn slot(&self, user_id: &str) -> Slot {
        let existing = self.inner.slots.get(user_id).map(|s| s.value().clone());
        if let Some(slot) = existing {
            return slot;
        }

        self.make_room();
        let now = self.inner.now_ms();
        let max_history = self.inner.config.max_history;
        self.inner
            .slots
            .entry(user_id.to_string())
            .or_insert_with(|| Slot::new(user_id, max_history, now))
            .value()
            .clone()
    }

    /// Evict least-recently-active free conversations until a new one fits.
    fn make_room(&self) {
        while self.inner.slots.len() >= self.inner.config.max_conversations {
            let victim = self
                .inner
                .slots
                .iter()
                .filter(|entry| entry.value().is_free())
                .min_by_key(|entry| entry.value().last_active())
                .map(|entry| entry.key().clone());

            let Some(victim) = victim else {
                warn!(
                    capacity = self.inner.config.max_conversations,
                    active = self.len(),
                    "All conversations are in use; exceeding capacity"
                );
                return;
            };

            if self
                .inner
                .slots
                .remove_if(&victim, |_, slot| slot.is_free())
                .is_some()
            {
                debug!(user_id = %victim, "Evicted least recently active conversation");
            }
        }
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("conversations", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Exclusive access to one user's conversation.
///
/// Activity is recorded when the guard is acquired and again when it is
/// dropped, so a long provider call does not make the conversation look idle.
pub struct ConversationGuard {
    guard: OwnedMutexGuard<Conversation>,
    last_active_ms: Arc<AtomicU64>,
    store: Arc<StoreInner>,
}

impl Deref for ConversationGuard {
    type Target = Conversation;

    fn deref(&self) -> &Conversation {
        &self.guard
    }
}

impl DerefMut for ConversationGuard {
    fn deref_mut(&mut self) -> &mut Conversation {
        &mut self.guard
    }
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        self.last_active_ms.store(self.store.now_ms(), Ordering::Relaxed);
    }
}
