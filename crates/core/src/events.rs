//! Structured event log
//!
//! The decision core never logs directly. User-facing rejections, failsafe
//! escalations and one-shot warnings are appended here with a stable
//! identifier; the runtime drains the log each cycle into its log macros
//! and the STATUSTEXT queue.

use core::fmt::{self, Write};
use heapless::{Deque, String};

/// Maximum event text length (one STATUSTEXT payload)
pub const EVENT_TEXT_LEN: usize = 50;

/// Events buffered between two drains
pub const EVENT_CAPACITY: usize = 16;

/// Event severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Stable identifier, e.g. `commander_arm_denied_throttle_center`
    pub id: &'static str,
    pub severity: Severity,
    pub text: String<EVENT_TEXT_LEN>,
}

/// Bounded drop-oldest event queue
#[derive(Debug)]
pub struct EventLog {
    queue: Deque<Event, EVENT_CAPACITY>,
    dropped: u32,
}

impl EventLog {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            dropped: 0,
        }
    }

    pub fn push(&mut self, id: &'static str, severity: Severity, text: &str) {
        self.push_fmt(id, severity, format_args!("{}", text));
    }

    /// Append a formatted event. Text beyond `EVENT_TEXT_LEN` is cut.
    pub fn push_fmt(&mut self, id: &'static str, severity: Severity, args: fmt::Arguments<'_>) {
        let mut text = TruncatingString::default();
        let _ = text.write_fmt(args);

        if self.queue.is_full() {
            self.queue.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.queue.push_back(Event {
            id,
            severity,
            text: text.0,
        });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events discarded because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Number of buffered events with the given identifier
    pub fn count(&self, id: &str) -> usize {
        self.queue.iter().filter(|event| event.id == id).count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.count(id) > 0
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct TruncatingString(String<EVENT_TEXT_LEN>);

impl Write for TruncatingString {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop_in_order() {
        let mut log = EventLog::new();
        log.push("first", Severity::Info, "one");
        log.push_fmt("second", Severity::Warning, format_args!("value {}", 2));

        assert_eq!(log.len(), 2);
        let event = log.pop().unwrap();
        assert_eq!(event.id, "first");
        assert_eq!(event.text.as_str(), "one");

        let event = log.pop().unwrap();
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.text.as_str(), "value 2");
        assert!(log.is_empty());
    }

    #[test]
    fn test_drop_oldest_when_full() {
        let mut log = EventLog::new();
        for _ in 0..EVENT_CAPACITY {
            log.push("fill", Severity::Debug, "x");
        }
        log.push("newest", Severity::Info, "y");

        assert_eq!(log.len(), EVENT_CAPACITY);
        assert_eq!(log.dropped(), 1);
        assert!(log.contains("newest"));
    }

    #[test]
    fn test_long_text_truncated() {
        let mut log = EventLog::new();
        log.push(
            "long",
            Severity::Info,
            "0123456789012345678901234567890123456789012345678901234567890123456789",
        );
        assert_eq!(log.pop().unwrap().text.len(), EVENT_TEXT_LEN);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Emergency < Severity::Critical);
        assert!(Severity::Info < Severity::Debug);
    }
}
