//! Per-user conversation history and lifecycle state.
//!
//! A [`Conversation`] is only reachable through a [`ConversationGuard`]
//! handed out by [`ConversationStore::lock`], so every mutation happens
//! while the user's mutex is held.

mod store;

pub use store::{ConversationGuard, ConversationStore, StoreConfig};

use std::collections::VecDeque;

use orderbot_types::conversation::{ConversationSnapshot, ConversationState, Turn};
use orderbot_types::order::OrderRecord;

/// Number of most recent turns sent to the provider on every call.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone)]
pub struct Conversation {
    user_id: String,
    turns: VecDeque<Turn>,
    state: ConversationState,
    pending_order: Option<OrderRecord>,
    max_history: usize,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>, max_history: usize) -> Self {
        Self {
            user_id: user_id.into(),
            turns: VecDeque::new(),
            state: ConversationState::Idle,
            pending_order: None,
            max_history: max_history.max(HISTORY_WINDOW),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn turns(&self) -> impl ExactSizeIterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn pending_order(&self) -> Option<&OrderRecord> {
        self.pending_order.as_ref()
    }

    /// Append a turn, dropping the oldest ones beyond `max_history`.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_history {
            self.turns.pop_front();
        }
    }

    /// The last `n` turns, oldest first.
    pub fn window(&self, n: usize) -> impl Iterator<Item = &Turn> {
        self.turns.iter().skip(self.turns.len().saturating_sub(n))
    }

    /// Record that a message arrived. A completed order stays completed.
    pub fn begin_collecting(&mut self) {
        if self.state == ConversationState::Idle {
            self.state = ConversationState::Collecting;
        }
    }

    /// Store an extracted order, replacing any earlier unpersisted one.
    pub fn complete(&mut self, order: OrderRecord) {
        self.pending_order = Some(order);
        self.state = ConversationState::Completed;
    }

    /// Drop history and any pending order, back to `Idle`.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.pending_order = None;
        self.state = ConversationState::Idle;
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            user_id: self.user_id.clone(),
            state: self.state,
            turns: self.turns.iter().cloned().collect(),
            pending_order: self.pending_order.clone(),
        }
    }
}
