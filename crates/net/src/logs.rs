//! Bounded log storage for the admin session.

use crate::correlator::CommandId;
use std::collections::VecDeque;

/// One received log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Monotonic sequence number within the session, never reused after eviction.
    pub seq: u64,
    /// Line text, may contain markup.
    pub text: String,
    /// Command this line belongs to, if the server tagged it.
    pub command_id: Option<CommandId>,
    /// Text of that command, when it was still pending on arrival.
    pub command: Option<String>,
}

/// Ring buffer of log lines. When full, the oldest line is evicted.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    capacity: usize,
    next_seq: u64,
}

impl LogBuffer {
    /// Buffer holding at most `capacity` lines (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_seq: 0,
        }
    }

    /// Append a line and return a copy of the stored entry.
    pub fn push(
        &mut self,
        text: String,
        command_id: Option<CommandId>,
        command: Option<String>,
    ) -> LogLine {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        let line = LogLine {
            seq: self.next_seq,
            text,
            command_id,
            command,
        };
        self.next_seq += 1;
        self.lines.push_back(line.clone());
        line
    }

    /// Lines currently retained, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// Most recent line.
    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no lines are retained.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sequence number the next line will get; equals the total ever appended.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Lines tagged with `id`.
    pub fn for_command(&self, id: CommandId) -> impl Iterator<Item = &LogLine> {
        self.lines
            .iter()
            .filter(move |line| line.command_id == Some(id))
    }
}

/// Scroll position of a log view of fixed height.
///
/// A view that is showing the newest line keeps following as lines arrive; a view the
/// user scrolled up stays where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogViewport {
    /// Sequence number of the first visible line.
    pub top: u64,
    /// Number of visible rows.
    pub height: u64,
}

impl LogViewport {
    /// Viewport at the start of the log.
    pub fn new(height: u64) -> Self {
        Self {
            top: 0,
            height: height.max(1),
        }
    }

    /// Whether the newest of `total` lines is visible.
    pub fn is_at_bottom(&self, total: u64) -> bool {
        self.top + self.height >= total
    }

    /// Update after the log grew from `before` to `after` lines.
    ///
    /// Returns whether the view scrolled.
    pub fn on_append(&mut self, before: u64, after: u64) -> bool {
        if !self.is_at_bottom(before) {
            return false;
        }
        let top = after.saturating_sub(self.height);
        let moved = top != self.top;
        self.top = top;
        moved
    }

    /// Scroll by `delta` rows, clamped to the log.
    pub fn scroll(&mut self, delta: i64, total: u64) {
        let max_top = total.saturating_sub(self.height);
        let top = if delta.is_negative() {
            self.top.saturating_sub(delta.unsigned_abs())
        } else {
            self.top.saturating_add(delta.unsigned_abs())
        };
        self.top = top.min(max_top);
    }
}
