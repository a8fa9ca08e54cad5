//! Byte queue used to decouple the word adapters from the serial framers.
//!
//! A circular buffer of `2^k` slots with one write side and one read side.
//! A single occupancy counter tracks fill level; `full` is raised one slot
//! early, so at most `2^k - 1` bytes are ever held and the counter alone
//! tells full from empty.
//!
//! The head byte is visible on the read side whenever the queue is not
//! empty (first-word fall-through), so a read on an edge consumes the byte
//! the consumer saw during that cycle.
//!
//! Misuse is not an error: a write while full is dropped and a read while
//! empty does nothing. Producers gate on `full`, consumers on `empty`.

use sim_core::{Clocked, Observable, Value};

/// Largest supported size exponent (4096 slots).
pub const MAX_DEPTH_LOG2: u8 = 12;

/// Position in the storage array. Only ever produced by masking, so it is
/// always a valid index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Slot(usize);

impl Slot {
    fn next(self, mask: usize) -> Self {
        Self((self.0 + 1) & mask)
    }
}

/// Signals sampled by the queue on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoInputs {
    /// Byte presented by the writer this cycle.
    pub write: Option<u8>,
    /// Reader consumes the head byte this cycle.
    pub read: bool,
}

/// Signals driven by the queue during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoOutputs {
    pub full: bool,
    pub empty: bool,
    /// Head byte, valid iff not empty.
    pub head: Option<u8>,
    pub count: usize,
}

impl FifoOutputs {
    /// Write side ready: a write on this edge will be accepted.
    #[must_use]
    pub const fn write_ready(&self) -> bool {
        !self.full
    }
}

/// Fixed-capacity byte queue.
pub struct ByteFifo {
    storage: Box<[u8]>,
    mask: usize,
    write_slot: Slot,
    read_slot: Slot,
    count: usize,
}

impl ByteFifo {
    /// Create an empty queue with `2^depth_log2` slots.
    ///
    /// # Panics
    ///
    /// Panics if `depth_log2` is zero or above [`MAX_DEPTH_LOG2`]; a
    /// one-slot queue could never hold a byte.
    #[must_use]
    pub fn new(depth_log2: u8) -> Self {
        assert!(
            (1..=MAX_DEPTH_LOG2).contains(&depth_log2),
            "queue depth exponent {depth_log2} out of range 1..={MAX_DEPTH_LOG2}"
        );
        let slots = 1usize << depth_log2;
        Self {
            storage: vec![0; slots].into_boxed_slice(),
            mask: slots - 1,
            write_slot: Slot::default(),
            read_slot: Slot::default(),
            count: 0,
        }
    }

    /// Bytes the queue can actually hold (`2^k - 1`).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len() - 1
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Oldest unread byte, if any.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.storage[self.read_slot.0])
        }
    }

    /// Bytes currently held, oldest first. Diagnostic only.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.count);
        let mut slot = self.read_slot;
        for _ in 0..self.count {
            out.push(self.storage[slot.0]);
            slot = slot.next(self.mask);
        }
        out
    }
}

impl Clocked for ByteFifo {
    type Inputs = FifoInputs;
    type Outputs = FifoOutputs;

    fn outputs(&self) -> FifoOutputs {
        FifoOutputs {
            full: self.is_full(),
            empty: self.is_empty(),
            head: self.peek(),
            count: self.count,
        }
    }

    fn tick(&mut self, inputs: &FifoInputs) {
        // Both sides judge against the pre-edge occupancy.
        let accept_write = inputs.write.is_some() && !self.is_full();
        let accept_read = inputs.read && !self.is_empty();

        if let (true, Some(byte)) = (accept_write, inputs.write) {
            self.storage[self.write_slot.0] = byte;
            self.write_slot = self.write_slot.next(self.mask);
        }
        if accept_read {
            self.read_slot = self.read_slot.next(self.mask);
        }

        match (accept_write, accept_read) {
            (true, false) => self.count += 1,
            (false, true) => self.count -= 1,
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.write_slot = Slot::default();
        self.read_slot = Slot::default();
        self.count = 0;
    }
}

impl Observable for ByteFifo {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "count" => Some(self.count.into()),
            "capacity" => Some(self.capacity().into()),
            "full" => Some(self.is_full().into()),
            "empty" => Some(self.is_empty().into()),
            "head" => self.peek().map(Value::from),
            "contents" => Some(Value::Array(
                self.contents().into_iter().map(Value::from).collect(),
            )),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["count", "capacity", "full", "empty", "head", "contents"]
    }
}
