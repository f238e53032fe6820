//! Lock-free overwrite ring for received frames.
//!
//! One producer (the UART interrupt) and one consumer (the foreground poll
//! loop). `head` counts frames ever published and is written only by the
//! producer; `tail` counts frames ever consumed and is written only by the
//! consumer. Both are free-running and compared with wrapping arithmetic, so
//! the ring never needs an explicit "full" flag: a producer that laps the
//! consumer simply overwrites the oldest unread slot, and the consumer skips
//! ahead to the oldest slot that still holds a live frame.
//!
//! The producer is an interrupt that preempts the consumer, so a push is
//! always complete by the time the consumer re-reads `head`.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering, fence};

use crate::frame::{DmxFrame, RdmFrame};

/// Value every slot holds before its first publish
pub trait EmptySlot: Copy {
    /// The empty value
    const EMPTY: Self;
}

impl EmptySlot for DmxFrame {
    const EMPTY: Self = DmxFrame::EMPTY;
}

impl EmptySlot for RdmFrame {
    const EMPTY: Self = RdmFrame::EMPTY;
}

/// Fixed-capacity frame ring with wraparound index.
pub struct FrameRing<T, const N: usize> {
    /// Frame slots
    slots: [UnsafeCell<T>; N],
    /// Frames published (producer only)
    head: AtomicUsize,
    /// Frames consumed (consumer only)
    tail: AtomicUsize,
}

// SAFETY: slot access is partitioned by the head/tail protocol below; torn
// reads are detected and retried by the consumer.
unsafe impl<T: Send, const N: usize> Sync for FrameRing<T, N> {}

impl<T: EmptySlot, const N: usize> FrameRing<T, N> {
    const CHECK: () = assert!(N.is_power_of_two(), "frame store depth must be a power of two");
    const MASK: usize = N - 1;

    /// Create an empty ring (const, suitable for static initialization)
    pub const fn new() -> Self {
        let () = Self::CHECK;
        Self {
            slots: [const { UnsafeCell::new(T::EMPTY) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Number of slots in the ring
    #[cfg(test)]
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of frames a consumer could read right now
    #[inline]
    pub fn len(&self) -> usize {
        fence(Ordering::SeqCst);
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail).min(N)
    }

    /// Check if no unread frame is available
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total frames ever published (wrapping)
    #[cfg(test)]
    #[inline]
    pub fn published(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    /// Publish a frame. Producer context only.
    ///
    /// The slot at `head` is written in place and then `head` is advanced, so
    /// a consumer never sees the slot before it is complete.
    #[inline]
    pub fn push(&self, frame: &T) {
        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: only the producer writes slots. A consumer reading this same
        // slot (it was lapped) re-checks `head` after copying and retries.
        unsafe { core::ptr::write_volatile(self.slots[head & Self::MASK].get(), *frame) };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Copy the oldest unread frame into `out` and consume it. Consumer context only.
    ///
    /// Returns `false` without side effects when the ring is empty.
    #[inline]
    pub fn pop_into(&self, out: &mut T) -> bool {
        match self.read_oldest(out) {
            Some(tail) => {
                self.tail.store(tail.wrapping_add(1), Ordering::Release);
                fence(Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Copy the oldest unread frame into `out` without consuming it.
    #[inline]
    pub fn peek_into(&self, out: &mut T) -> bool {
        self.read_oldest(out).is_some()
    }

    /// Drop every unread frame. Consumer context only.
    pub fn clear(&self) {
        fence(Ordering::SeqCst);
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    /// Copy out the oldest live frame and return its sequence number.
    fn read_oldest(&self, out: &mut T) -> Option<usize> {
        loop {
            fence(Ordering::SeqCst);
            let head = self.head.load(Ordering::Acquire);
            let mut tail = self.tail.load(Ordering::Relaxed);

            let pending = head.wrapping_sub(tail);
            if pending == 0 {
                return None;
            }
            if pending > N {
                // Lapped: everything older than head - N was overwritten
                tail = head.wrapping_sub(N);
            }

            // SAFETY: the slot may be concurrently rewritten by the producer;
            // that case is detected below and the copy is discarded.
            *out = unsafe { core::ptr::read_volatile(self.slots[tail & Self::MASK].get()) };

            fence(Ordering::SeqCst);
            let head_after = self.head.load(Ordering::Acquire);
            if head_after.wrapping_sub(tail) <= N {
                return Some(tail);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
