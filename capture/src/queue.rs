use anyhow::Result;
use crossai_types::Turn;
use xxhash_rust::xxh3::xxh3_64;

use crate::store::TurnStore;

/// Turns seen on screen but not yet saved by the user.
///
/// Invariant: no two queued turns are equal, and none equals a turn
/// already stored for the page. Both checks are repeated right before each
/// mutation, so interleaved callers cannot break it.
#[derive(Debug, Default)]
pub struct PendingQueue {
    queue: Vec<Turn>,
    last_signature: String,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every candidate that is neither stored for `url` nor queued.
    pub async fn add<I>(&mut self, store: &TurnStore, url: &str, candidates: I) -> Result<&[Turn]>
    where
        I: IntoIterator<Item = Turn>,
    {
        for candidate in candidates {
            let stored = store.contains(url, &candidate).await?;
            if !stored && !self.queue.contains(&candidate) {
                self.queue.push(candidate);
            }
        }
        Ok(&self.queue)
    }

    /// Save `turn` for `url`. Returns whether the store was written; a turn
    /// that was already stored is a no-op. Either way the turn leaves the
    /// queue, since it now lives in the store.
    pub async fn release_to_storage(
        &mut self,
        store: &TurnStore,
        url: &str,
        turn: &Turn,
    ) -> Result<bool> {
        let saved = store.insert(url, turn).await?;
        if let Some(pos) = self.queue.iter().position(|t| t == turn) {
            self.queue.remove(pos);
        }
        Ok(saved)
    }

    /// Release every queued turn in order; returns how many were written.
    pub async fn flush(&mut self, store: &TurnStore, url: &str) -> Result<usize> {
        let mut saved = 0;
        for turn in self.queue.clone() {
            if self.release_to_storage(store, url, &turn).await? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// True when the queue content differs from the last time this returned true.
    pub fn has_changed(&mut self) -> bool {
        let current = signature(&self.queue);
        if current != self.last_signature {
            self.last_signature = current;
            true
        } else {
            false
        }
    }

    pub fn queue(&self) -> &[Turn] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.last_signature.clear();
    }
}

fn signature(turns: &[Turn]) -> String {
    let canonical = serde_json::to_vec(turns).unwrap_or_default();
    format!("{:016x}", xxh3_64(&canonical))
}
