use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Deterministic timer queue. Entries pop in (due time, insertion) order;
/// cancelled entries are dropped lazily.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(i64, u64)>>,
    payloads: HashMap<u64, T>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            payloads: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due_ms: i64, payload: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((due_ms, seq)));
        self.payloads.insert(seq, payload);
        TimerId(seq)
    }

    /// Remove a timer before it fires. Returns its payload if it was pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.payloads.remove(&id.0)
    }

    fn discard_cancelled(&mut self) {
        while let Some(Reverse((_, seq))) = self.heap.peek() {
            if self.payloads.contains_key(seq) {
                break;
            }
            self.heap.pop();
        }
    }

    pub fn next_due(&mut self) -> Option<i64> {
        self.discard_cancelled();
        self.heap.peek().map(|Reverse((due, _))| *due)
    }

    /// Pop the earliest timer due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: i64) -> Option<(i64, T)> {
        self.discard_cancelled();
        let Reverse((due, seq)) = *self.heap.peek()?;
        if due > now_ms {
            return None;
        }
        self.heap.pop();
        self.payloads.remove(&seq).map(|payload| (due, payload))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.payloads.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_due_then_insertion_order() {
        let mut q = TimerQueue::new();
        q.schedule(200, "c");
        q.schedule(100, "a");
        q.schedule(100, "b");

        assert_eq!(q.pop_due(50), None);
        assert_eq!(q.pop_due(1000), Some((100, "a")));
        assert_eq!(q.pop_due(1000), Some((100, "b")));
        assert_eq!(q.pop_due(1000), Some((200, "c")));
        assert_eq!(q.next_due(), None);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let id = q.schedule(100, 1);
        q.schedule(300, 2);
        assert_eq!(q.cancel(id), Some(1));
        assert_eq!(q.cancel(id), None);
        assert_eq!(q.next_due(), Some(300));
        assert_eq!(q.pop_due(200), None);
        assert_eq!(q.pop_due(300), Some((300, 2)));
    }
}
