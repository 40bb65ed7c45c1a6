//! Per-conversation turn serialization
//!
//! Conversation state lives in the transcript, so two requests carrying the
//! same transcript would each call the model. [`TurnGate`] runs turns for one
//! conversation key one at a time, and answers an identical resubmission
//! from a short-lived cache instead of running the turn again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::state::TranscriptMessage;

/// How long a completed response answers identical resubmissions
pub const DEFAULT_RESUBMIT_TTL: Duration = Duration::from_secs(30);

struct Cached<T> {
    fingerprint: String,
    stored_at: Instant,
    value: T,
}

type Slot<T> = Arc<AsyncMutex<Option<Cached<T>>>>;

/// Serializes turns per conversation key
pub struct TurnGate<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
    ttl: Duration,
}

impl<T: Clone> Default for TurnGate<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RESUBMIT_TTL)
    }
}

impl<T: Clone> TurnGate<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Run `turn` while holding the lock for `key`.
    ///
    /// If the last successful turn for `key` had the same `fingerprint` and
    /// is younger than the TTL, its value is returned without running `turn`.
    /// Errors are never cached.
    pub async fn run<F, Fut, E>(&self, key: &str, fingerprint: &str, turn: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.fingerprint == fingerprint && cached.stored_at.elapsed() < self.ttl {
                debug!(key = %short(key), "Answering resubmitted turn from cache");
                return Ok(cached.value.clone());
            }
        }

        let value = turn().await?;
        *guard = Some(Cached {
            fingerprint: fingerprint.to_string(),
            stored_at: Instant::now(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Number of conversations currently tracked
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Drop idle slots whose cache has expired
        let ttl = self.ttl;
        slots.retain(|k, slot| {
            k == key
                || Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .map(|c| c.as_ref().is_some_and(|c| c.stored_at.elapsed() < ttl))
                    .unwrap_or(true)
        });

        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }
}

/// Key for a conversation: the caller's id, or a hash of its transcript
pub fn conversation_key(conversation_id: Option<&str>, context: &[TranscriptMessage]) -> String {
    match conversation_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("id:{}", id),
        None => format!("tx:{}", transcript_digest(context)),
    }
}

/// Identifies one exact submission: transcript plus new user text
pub fn turn_fingerprint(context: &[TranscriptMessage], description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(transcript_digest(context).as_bytes());
    hasher.update([0u8]);
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

fn transcript_digest(context: &[TranscriptMessage]) -> String {
    let mut hasher = Sha256::new();
    for message in context {
        hasher.update(message.role.as_upper().as_bytes());
        hasher.update([0u8]);
        hasher.update(message.content.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

fn short(key: &str) -> &str {
    key.get(..19).unwrap_or(key)
}
