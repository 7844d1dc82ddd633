//! Command id allocation and result correlation.

use lru::LruCache;
use rand::Rng;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Upper bound (exclusive) for the random starting id. Keeps ids well inside the range a
/// JavaScript peer can represent exactly.
const SEED_RANGE: u64 = 1 << 31;

/// Identifier attached to an issued command and echoed by its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A command waiting for its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Command text as issued.
    pub text: String,
    /// When the id was allocated.
    pub issued_at: Instant,
}

/// Allocates command ids and remembers which text each id was issued for.
///
/// Ids advance by one per command from a random starting point. Pending entries are
/// bounded: the oldest entry is evicted when the table is full, and [`expire`] drops
/// entries older than the configured TTL.
///
/// [`expire`]: CommandCorrelator::expire
#[derive(Debug)]
pub struct CommandCorrelator {
    next_id: u64,
    pending: LruCache<CommandId, PendingCommand>,
    ttl: Option<Duration>,
}

impl CommandCorrelator {
    /// Correlator starting at a random id.
    pub fn new(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        let seed = rand::thread_rng().gen_range(0..SEED_RANGE);
        Self::starting_at(CommandId(seed), capacity, ttl)
    }

    /// Correlator starting at a fixed id.
    pub fn starting_at(first: CommandId, capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            next_id: first.0,
            pending: LruCache::new(capacity),
            ttl,
        }
    }

    /// Id the next [`issue`](Self::issue) call will return.
    pub fn peek_next_id(&self) -> CommandId {
        CommandId(self.next_id)
    }

    /// Allocate an id for `text` and record it as pending.
    pub fn issue(&mut self, text: impl Into<String>) -> CommandId {
        self.issue_at(text, Instant::now())
    }

    /// [`issue`](Self::issue) with an explicit clock reading.
    pub fn issue_at(&mut self, text: impl Into<String>, now: Instant) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let pending = PendingCommand {
            text: text.into(),
            issued_at: now,
        };
        if let Some((evicted, command)) = self.pending.push(id, pending) {
            if evicted != id {
                tracing::debug!(command_id = %evicted, text = %command.text, "Evicted pending command");
            }
        }
        id
    }

    /// Look up a pending command without resolving it.
    pub fn get(&self, id: CommandId) -> Option<&PendingCommand> {
        self.pending.peek(&id)
    }

    /// Remove and return a pending command once its result has arrived.
    pub fn resolve(&mut self, id: CommandId) -> Option<PendingCommand> {
        self.pending.pop(&id)
    }

    /// Stop waiting for a command. Returns whether it was pending.
    pub fn cancel(&mut self, id: CommandId) -> bool {
        self.pending.pop(&id).is_some()
    }

    /// Drop every pending entry older than the TTL, oldest first.
    pub fn expire(&mut self, now: Instant) -> Vec<(CommandId, PendingCommand)> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };
        let mut expired = Vec::new();
        while let Some((_, oldest)) = self.pending.peek_lru() {
            if now.saturating_duration_since(oldest.issued_at) < ttl {
                break;
            }
            if let Some(entry) = self.pending.pop_lru() {
                expired.push(entry);
            }
        }
        expired
    }

    /// Number of commands still waiting.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending commands, oldest first.
    pub fn pending(&self) -> Vec<(CommandId, &PendingCommand)> {
        let mut entries: Vec<_> = self.pending.iter().map(|(id, cmd)| (*id, cmd)).collect();
        entries.reverse();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlator(capacity: usize, ttl: Option<Duration>) -> CommandCorrelator {
        CommandCorrelator::starting_at(
            CommandId(100),
            NonZeroUsize::new(capacity).unwrap(),
            ttl,
        )
    }

    #[test]
    fn ids_increase_and_texts_are_kept() {
        let mut c = correlator(8, None);
        let hi = c.issue("say hi");
        let bye = c.issue("say bye");
        assert!(bye > hi);
        assert_eq!(bye.0, hi.0 + 1);
        assert_eq!(c.get(hi).unwrap().text, "say hi");
        assert_eq!(c.get(bye).unwrap().text, "say bye");
        assert_eq!(c.pending_len(), 2);
    }

    #[test]
    fn random_seed_stays_in_range() {
        let c = CommandCorrelator::new(NonZeroUsize::new(4).unwrap(), None);
        assert!(c.peek_next_id().0 < SEED_RANGE);
    }

    #[test]
    fn resolve_removes_entry() {
        let mut c = correlator(8, None);
        let id = c.issue("list");
        assert_eq!(c.resolve(id).unwrap().text, "list");
        assert!(c.resolve(id).is_none());
        assert!(!c.cancel(id));
    }

    #[test]
    fn full_table_evicts_oldest() {
        let mut c = correlator(2, None);
        let first = c.issue("a");
        let second = c.issue("b");
        let third = c.issue("c");
        assert!(c.get(first).is_none());
        assert!(c.get(second).is_some());
        assert!(c.get(third).is_some());
    }

    #[test]
    fn expire_drops_only_stale_entries() {
        let mut c = correlator(8, Some(Duration::from_secs(10)));
        let start = Instant::now();
        let old = c.issue_at("old", start);
        let fresh = c.issue_at("fresh", start + Duration::from_secs(8));

        let expired = c.expire(start + Duration::from_secs(12));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, old);
        assert!(c.get(fresh).is_some());
    }

    #[test]
    fn pending_lists_oldest_first() {
        let mut c = correlator(8, None);
        c.issue("a");
        c.issue("b");
        let texts: Vec<_> = c.pending().iter().map(|(_, p)| p.text.clone()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
