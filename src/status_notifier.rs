//! STATUSTEXT notification queue
//!
//! Core events drained by the task drivers land here as operator-facing
//! messages. The link task takes them as chunked `STATUSTEXT_DATA` records.
//!
//! - Global queue behind a `critical_section::Mutex`
//! - Drop-oldest when full, with a dropped counter
//! - Messages longer than one STATUSTEXT payload are split into chunks
//!   sharing a non-zero id

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::{Deque, String, Vec};
use mavlink::common::{MavSeverity, STATUSTEXT_DATA};
use warden_core::events::{Event, Severity};

/// Maximum message length
const MAX_MESSAGE_LEN: usize = 200;

const QUEUE_CAPACITY: usize = 16;

/// STATUSTEXT payload size
const CHUNK_SIZE: usize = 50;

const MAX_CHUNKS: usize = MAX_MESSAGE_LEN / CHUNK_SIZE;

/// STATUSTEXT records returned by one drain
pub const MAX_PENDING_STATUSTEXT: usize = 32;

#[derive(Debug)]
pub(crate) struct QueuedMessage {
    pub(crate) severity: MavSeverity,
    pub(crate) text: String<MAX_MESSAGE_LEN>,
}

pub struct StatusNotifier {
    queue: Deque<QueuedMessage, QUEUE_CAPACITY>,
    next_chunk_id: u16,
    dropped_count: u32,
}

impl StatusNotifier {
    const fn new() -> Self {
        Self {
            queue: Deque::new(),
            // 0 marks an unchunked message
            next_chunk_id: 1,
            dropped_count: 0,
        }
    }

    fn enqueue(&mut self, severity: MavSeverity, text: &str) {
        let mut message = QueuedMessage {
            severity,
            text: String::new(),
        };
        for c in text.chars() {
            if message.text.push(c).is_err() {
                crate::log_warn!("STATUSTEXT truncated to {} chars", MAX_MESSAGE_LEN);
                break;
            }
        }

        if self.queue.is_full() {
            self.queue.pop_front();
            self.dropped_count = self.dropped_count.saturating_add(1);
            crate::log_warn!(
                "STATUSTEXT queue full, dropped {} messages",
                self.dropped_count
            );
        }
        // Room was made above
        let _ = self.queue.push_back(message);
    }

    fn allocate_chunk_id(&mut self) -> u16 {
        let id = self.next_chunk_id;
        self.next_chunk_id = match self.next_chunk_id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id
    }
}

static NOTIFIER: Mutex<RefCell<StatusNotifier>> = Mutex::new(RefCell::new(StatusNotifier::new()));

/// MAVLink severity for a core event severity
pub fn mav_severity(severity: Severity) -> MavSeverity {
    match severity {
        Severity::Emergency => MavSeverity::MAV_SEVERITY_EMERGENCY,
        Severity::Alert => MavSeverity::MAV_SEVERITY_ALERT,
        Severity::Critical => MavSeverity::MAV_SEVERITY_CRITICAL,
        Severity::Error => MavSeverity::MAV_SEVERITY_ERROR,
        Severity::Warning => MavSeverity::MAV_SEVERITY_WARNING,
        Severity::Notice => MavSeverity::MAV_SEVERITY_NOTICE,
        Severity::Info => MavSeverity::MAV_SEVERITY_INFO,
        Severity::Debug => MavSeverity::MAV_SEVERITY_DEBUG,
    }
}

/// Queue a core event for the operator. Debug events stay in the log.
pub fn notify_event(event: &Event) {
    if event.severity == Severity::Debug {
        return;
    }
    send_statustext(mav_severity(event.severity), event.text.as_str());
}

pub fn send_statustext(severity: MavSeverity, text: &str) {
    critical_section::with(|cs| NOTIFIER.borrow_ref_mut(cs).enqueue(severity, text));
}

/// Messages dropped because the queue was full
pub fn dropped_count() -> u32 {
    critical_section::with(|cs| NOTIFIER.borrow_ref(cs).dropped_count)
}

/// Drain queued messages into STATUSTEXT records
///
/// Messages that do not fit in the returned buffer stay queued for the
/// next call.
pub fn take_pending_statustext_messages() -> Vec<STATUSTEXT_DATA, MAX_PENDING_STATUSTEXT> {
    let mut result = Vec::new();

    critical_section::with(|cs| {
        let mut notifier = NOTIFIER.borrow_ref_mut(cs);
        loop {
            let Some(front) = notifier.queue.front() else {
                break;
            };
            let needed = chunk_count(front.text.len());
            if result.len() + needed > result.capacity() {
                break;
            }
            let Some(message) = notifier.queue.pop_front() else {
                break;
            };
            let id = if needed > 1 { notifier.allocate_chunk_id() } else { 0 };
            for chunk in chunk_message(message.severity, message.text.as_str(), id) {
                // Capacity checked above
                let _ = result.push(chunk);
            }
        }
    });

    result
}

fn chunk_count(len: usize) -> usize {
    len.div_ceil(CHUNK_SIZE).clamp(1, MAX_CHUNKS)
}

/// Split a message into STATUSTEXT records
///
/// A message that fits one payload gets id 0 and chunk_seq 0. Longer
/// messages get `id` and consecutive chunk sequence numbers.
pub(crate) fn chunk_message(
    severity: MavSeverity,
    text: &str,
    id: u16,
) -> Vec<STATUSTEXT_DATA, MAX_CHUNKS> {
    let bytes = text.as_bytes();
    let len = bytes.len().min(MAX_MESSAGE_LEN);
    let mut chunks = Vec::new();

    if len <= CHUNK_SIZE {
        let mut text_bytes = [0u8; CHUNK_SIZE];
        text_bytes[..len].copy_from_slice(&bytes[..len]);
        let _ = chunks.push(STATUSTEXT_DATA {
            severity,
            text: text_bytes.into(),
            id: 0,
            chunk_seq: 0,
        });
        return chunks;
    }

    for (seq, part) in bytes[..len].chunks(CHUNK_SIZE).enumerate() {
        let mut text_bytes = [0u8; CHUNK_SIZE];
        text_bytes[..part.len()].copy_from_slice(part);
        let _ = chunks.push(STATUSTEXT_DATA {
            severity,
            text: text_bytes.into(),
            id,
            chunk_seq: seq as u8,
        });
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use warden_core::events::EventLog;

    fn reset_notifier() {
        critical_section::with(|cs| {
            let mut n = NOTIFIER.borrow_ref_mut(cs);
            n.queue.clear();
            n.dropped_count = 0;
            n.next_chunk_id = 1;
        });
    }

    fn text_of(msg: &STATUSTEXT_DATA) -> std::string::String {
        let bytes: &[u8] = msg.text.as_ref();
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        std::string::String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    #[test]
    #[serial]
    fn test_event_becomes_statustext() {
        reset_notifier();
        let mut log = EventLog::new();
        log.push("commander_rc_lost", Severity::Critical, "Manual control lost");
        let event = log.pop().unwrap();

        notify_event(&event);
        let messages = take_pending_statustext_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, MavSeverity::MAV_SEVERITY_CRITICAL);
        assert_eq!(text_of(&messages[0]), "Manual control lost");
        assert_eq!(messages[0].id, 0);
    }

    #[test]
    #[serial]
    fn test_debug_events_stay_local() {
        reset_notifier();
        let mut log = EventLog::new();
        log.push("navigator_debug", Severity::Debug, "trace");
        notify_event(&log.pop().unwrap());
        assert!(take_pending_statustext_messages().is_empty());
    }

    #[test]
    #[serial]
    fn test_queue_overflow_drops_oldest() {
        reset_notifier();
        for i in 0..17 {
            send_statustext(MavSeverity::MAV_SEVERITY_INFO, &format!("Message {}", i));
        }
        assert_eq!(dropped_count(), 1);

        let messages = take_pending_statustext_messages();
        assert_eq!(messages.len(), 16);
        assert_eq!(text_of(&messages[0]), "Message 1");
        assert_eq!(text_of(&messages[15]), "Message 16");
    }

    #[test]
    #[serial]
    fn test_long_message_is_chunked() {
        reset_notifier();
        let long = "A".repeat(120);
        send_statustext(MavSeverity::MAV_SEVERITY_WARNING, &long);

        let messages = take_pending_statustext_messages();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.id == 1));
        assert_eq!(messages[2].chunk_seq, 2);
        assert_eq!(text_of(&messages[2]).len(), 20);
    }

    #[test]
    #[serial]
    fn test_truncation_at_max_length() {
        reset_notifier();
        send_statustext(MavSeverity::MAV_SEVERITY_INFO, &"B".repeat(300));
        let messages = take_pending_statustext_messages();
        assert_eq!(messages.len(), MAX_CHUNKS);
    }
}
