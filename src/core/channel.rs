//! Bounded Byte Channel
//!
//! Fixed-capacity byte FIFO shared between the GATT write handler (producer,
//! SoftDevice context) and the control loop (consumer). Every operation runs
//! inside one short critical section and never waits.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

/// Default queue depth
pub const DEFAULT_CAPACITY: usize = 16;

/// Channel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError {
    /// Not enough free slots for the whole write
    InsufficientSpace { requested: usize, free: usize },
}

/// Bounded single-producer / single-consumer byte queue
pub struct ByteChannel<M: RawMutex, const N: usize> {
    queue: Mutex<M, RefCell<Deque<u8, N>>>,
}

impl<M: RawMutex, const N: usize> ByteChannel<M, N> {
    /// Create an empty channel (usable in `static` initializers)
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Total number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued bytes
    pub fn len(&self) -> usize {
        self.queue.lock(|q| q.borrow().len())
    }

    /// Check if the channel is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of free slots
    pub fn free(&self) -> usize {
        N - self.len()
    }

    /// Push a single byte, handing it back if the channel is full
    pub fn try_push(&self, byte: u8) -> Result<(), u8> {
        self.queue.lock(|q| q.borrow_mut().push_back(byte))
    }

    /// Enqueue all of `data` or none of it.
    ///
    /// The free space check and the enqueue share one critical section, so a
    /// concurrent pop can only make room, never cause a partial write.
    pub fn push_all(&self, data: &[u8]) -> Result<(), ChannelError> {
        self.queue.lock(|q| {
            let mut q = q.borrow_mut();
            let free = N - q.len();
            if data.len() > free {
                return Err(ChannelError::InsufficientSpace {
                    requested: data.len(),
                    free,
                });
            }

            for &byte in data {
                // Capacity was checked above
                let _ = q.push_back(byte);
            }
            Ok(())
        })
    }

    /// Pop the oldest byte
    pub fn try_pop(&self) -> Option<u8> {
        self.queue.lock(|q| q.borrow_mut().pop_front())
    }

    /// Pop bytes until the channel is empty, handing each to `f`.
    ///
    /// At most `N` bytes are taken per call so a producer that keeps writing
    /// cannot hold the consumer here. Returns the number of bytes drained.
    pub fn drain(&self, mut f: impl FnMut(u8)) -> usize {
        let mut drained = 0;
        while drained < N {
            match self.try_pop() {
                Some(byte) => {
                    f(byte);
                    drained += 1;
                }
                None => break,
            }
        }
        drained
    }
}

impl<M: RawMutex, const N: usize> Default for ByteChannel<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
