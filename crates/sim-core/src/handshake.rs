//! Ready/valid handshake shared by every link between blocks.
//!
//! The producer drives `offer` (`Some(payload)` means valid) and the
//! consumer drives `ready`. A transfer happens on the edge where both are
//! true; both sides must then latch it on that same edge. Neither side may
//! make its signal depend on the other's within the cycle, so a link can
//! never form a combinational loop.

/// One cycle's view of a producer/consumer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<T> {
    offer: Option<T>,
    ready: bool,
}

impl<T: Copy> Link<T> {
    #[must_use]
    pub const fn new(offer: Option<T>, ready: bool) -> Self {
        Self { offer, ready }
    }

    /// The payload transferred on this edge, if any.
    #[must_use]
    pub fn fired(&self) -> Option<T> {
        if self.ready { self.offer } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_when_valid_and_ready() {
        assert_eq!(Link::new(Some(7u8), true).fired(), Some(7));
        assert_eq!(Link::new(Some(7u8), false).fired(), None);
        assert_eq!(Link::<u8>::new(None, true).fired(), None);
    }
}
