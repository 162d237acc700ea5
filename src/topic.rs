//! Inter-task message passing
//!
//! Commander, navigator and the link task exchange records only through
//! the primitives here, never through shared mutable state.
//!
//! - [`Topic`]: single slot holding the latest value and a generation
//!   counter. Publishing never blocks and always overwrites. A
//!   [`Subscriber`] notices when it skipped generations.
//! - [`Queue`]: bounded FIFO that drops the oldest entry when full, for
//!   records where every instance matters (command acknowledgments).
//!
//! Both are `const`-constructible so they can live in statics, and both
//! guard their state with a `critical_section::Mutex`.

use core::cell::RefCell;
use core::fmt;
use critical_section::Mutex;
use heapless::Deque;

/// Message passing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicError {
    /// The subscriber read a value after `generations` newer publishes
    /// overwrote the ones it never saw
    Missed { generations: u32 },
    /// A full queue dropped its oldest entry to make room
    Overflow { dropped: u32 },
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicError::Missed { generations } => {
                write!(f, "Missed {} generation(s)", generations)
            }
            TopicError::Overflow { dropped } => {
                write!(f, "Queue full, {} entries dropped", dropped)
            }
        }
    }
}

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// Latest-value topic
pub struct Topic<T: Copy> {
    slot: Mutex<RefCell<Slot<T>>>,
}

impl<T: Copy> Topic<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Slot {
                value: None,
                generation: 0,
            })),
        }
    }

    /// Replace the value and return its generation
    pub fn publish(&self, value: T) -> u32 {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            slot.value = Some(value);
            slot.generation = slot.generation.wrapping_add(1);
            slot.generation
        })
    }

    /// Latest value, regardless of what any subscriber has seen
    pub fn latest(&self) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow_ref(cs).value)
    }

    pub fn generation(&self) -> u32 {
        critical_section::with(|cs| self.slot.borrow_ref(cs).generation)
    }

    /// Subscriber that starts after the current generation
    pub fn subscribe(&self) -> Subscriber<'_, T> {
        Subscriber {
            topic: self,
            last_generation: self.generation(),
        }
    }

    fn read(&self) -> (Option<T>, u32) {
        critical_section::with(|cs| {
            let slot = self.slot.borrow_ref(cs);
            (slot.value, slot.generation)
        })
    }
}

impl<T: Copy> Default for Topic<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value taken from a topic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update<T> {
    pub value: T,
    /// Generations overwritten since the previous read
    pub missed: u32,
}

impl<T> Update<T> {
    pub fn gap(&self) -> Result<(), TopicError> {
        if self.missed == 0 {
            Ok(())
        } else {
            Err(TopicError::Missed {
                generations: self.missed,
            })
        }
    }
}

/// Per-reader cursor on a [`Topic`]
pub struct Subscriber<'a, T: Copy> {
    topic: &'a Topic<T>,
    last_generation: u32,
}

impl<'a, T: Copy> Subscriber<'a, T> {
    /// Whether a value newer than the last read is waiting
    pub fn updated(&self) -> bool {
        self.topic.generation() != self.last_generation
    }

    /// Take the latest value when it is newer than the last read
    pub fn poll(&mut self) -> Option<Update<T>> {
        let (value, generation) = self.topic.read();
        if generation == self.last_generation {
            return None;
        }
        let missed = generation.wrapping_sub(self.last_generation).saturating_sub(1);
        self.last_generation = generation;
        value.map(|value| Update { value, missed })
    }

    /// Latest value, whether or not it was already read
    pub fn latest(&self) -> Option<T> {
        self.topic.latest()
    }
}

struct QueueState<T, const N: usize> {
    items: Deque<T, N>,
    dropped: u32,
}

/// Bounded drop-oldest FIFO
pub struct Queue<T, const N: usize> {
    state: Mutex<RefCell<QueueState<T, N>>>,
}

impl<T, const N: usize> Queue<T, N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(QueueState {
                items: Deque::new(),
                dropped: 0,
            })),
        }
    }

    /// Append `item`. When full the oldest entry is dropped first and the
    /// total number of drops is reported.
    pub fn push(&self, item: T) -> Result<(), TopicError> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let mut result = Ok(());
            if state.items.is_full() {
                state.items.pop_front();
                state.dropped = state.dropped.saturating_add(1);
                result = Err(TopicError::Overflow {
                    dropped: state.dropped,
                });
            }
            // Room was made above
            let _ = state.items.push_back(item);
            result
        })
    }

    pub fn pop(&self) -> Option<T> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).items.pop_front())
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).dropped)
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_sees_each_new_generation_once() {
        let topic: Topic<u32> = Topic::new();
        let mut sub = topic.subscribe();
        assert!(sub.poll().is_none());

        topic.publish(7);
        assert!(sub.updated());
        let update = sub.poll().unwrap();
        assert_eq!(update.value, 7);
        assert_eq!(update.gap(), Ok(()));
        assert!(sub.poll().is_none());
        assert_eq!(sub.latest(), Some(7));
    }

    #[test]
    fn test_overwritten_generations_are_reported() {
        let topic: Topic<u32> = Topic::new();
        let mut sub = topic.subscribe();

        topic.publish(1);
        topic.publish(2);
        topic.publish(3);

        let update = sub.poll().unwrap();
        assert_eq!(update.value, 3);
        assert_eq!(update.missed, 2);
        assert_eq!(update.gap(), Err(TopicError::Missed { generations: 2 }));
    }

    #[test]
    fn test_late_subscriber_skips_history() {
        let topic: Topic<u32> = Topic::new();
        topic.publish(1);
        let mut sub = topic.subscribe();
        assert!(sub.poll().is_none());
        assert_eq!(sub.latest(), Some(1));
    }

    #[test]
    fn test_queue_drops_oldest() {
        let queue: Queue<u8, 2> = Queue::new();
        assert!(queue.push(1).is_ok());
        assert!(queue.push(2).is_ok());
        assert_eq!(queue.push(3), Err(TopicError::Overflow { dropped: 1 }));

        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = TopicError::Missed { generations: 3 };
        assert_eq!(err.to_string(), "Missed 3 generation(s)");
    }
}
