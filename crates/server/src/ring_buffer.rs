use std::collections::VecDeque;

use devtrack_protocol::LogLine;

/// Bounded most-recent-N log line history, replayed to newly attached
/// clients (§3, testable property 4). Additions beyond capacity evict
/// the oldest.
pub struct LogRingBuffer {
    capacity: usize,
    lines: VecDeque<LogLine>,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, lines: VecDeque::with_capacity(capacity.min(4096)) }
    }

    pub fn push(&mut self, line: LogLine) {
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
