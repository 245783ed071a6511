//! Deferred attachment of custom 3D layers.
//!
//! A custom layer can only be attached once the engine's graphics context
//! exists. Scheduled attachments wait for a grace period, then fire as soon
//! as the engine reports readiness. While the engine is not ready they are
//! retried at a fixed interval, and give up after a bounded number of tries.

use web_time::{Duration, Instant};

/// Timing policy for deferred attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachPolicy {
    /// Minimum wait before the first readiness check
    pub grace: Duration,
    /// Wait between readiness checks after the first one
    pub retry_interval: Duration,
    /// Readiness checks allowed after the first before timing out
    pub max_retries: u32,
}

impl Default for AttachPolicy {
    fn default() -> Self {
        Self::for_device(false)
    }
}

impl AttachPolicy {
    /// Mobile-class devices get a longer grace period for slower context setup.
    pub fn for_device(is_mobile: bool) -> Self {
        Self {
            grace: Duration::from_millis(if is_mobile { 2000 } else { 500 }),
            retry_interval: Duration::from_millis(250),
            max_retries: 20,
        }
    }
}

/// Outcome of a scheduled attachment.
#[derive(Debug)]
pub enum AttachEvent<T> {
    /// The engine is ready; attach now.
    Ready { layer_id: String, payload: T },
    /// The engine never became ready within the retry bound.
    TimedOut { layer_id: String, payload: T },
}

#[derive(Debug)]
struct Scheduled<T> {
    layer_id: String,
    payload: T,
    /// Set on the first poll after scheduling
    due: Option<Instant>,
    attempts: u32,
}

/// Queue of pending attachments keyed by layer id.
#[derive(Debug)]
pub struct AttachScheduler<T> {
    policy: AttachPolicy,
    entries: Vec<Scheduled<T>>,
}

impl<T> AttachScheduler<T> {
    pub fn new(policy: AttachPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    pub fn set_policy(&mut self, policy: AttachPolicy) {
        self.policy = policy;
    }

    /// Schedules an attachment, replacing any earlier one for the same layer.
    pub fn schedule(&mut self, layer_id: impl Into<String>, payload: T) {
        let layer_id = layer_id.into();
        self.cancel(&layer_id);
        self.entries.push(Scheduled {
            layer_id,
            payload,
            due: None,
            attempts: 0,
        });
    }

    /// Drops a scheduled attachment. Returns true if one was pending.
    pub fn cancel(&mut self, layer_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.layer_id != layer_id);
        self.entries.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Ids of every layer with a pending attachment.
    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.layer_id.as_str())
    }

    pub fn is_scheduled(&self, layer_id: &str) -> bool {
        self.entries.iter().any(|e| e.layer_id == layer_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advances all scheduled attachments.
    ///
    /// `ready` reports whether the engine's graphics context exists right now.
    pub fn poll(&mut self, now: Instant, ready: bool) -> Vec<AttachEvent<T>> {
        let policy = self.policy;
        let mut events = Vec::new();
        let mut remaining = Vec::with_capacity(self.entries.len());

        for mut entry in self.entries.drain(..) {
            let Some(due) = entry.due else {
                entry.due = Some(now + policy.grace);
                remaining.push(entry);
                continue;
            };

            if now < due {
                remaining.push(entry);
            } else if ready {
                events.push(AttachEvent::Ready {
                    layer_id: entry.layer_id,
                    payload: entry.payload,
                });
            } else if entry.attempts >= policy.max_retries {
                events.push(AttachEvent::TimedOut {
                    layer_id: entry.layer_id,
                    payload: entry.payload,
                });
            } else {
                entry.attempts += 1;
                entry.due = Some(now + policy.retry_interval);
                log::debug!(
                    "Graphics context not ready for {}, retry {}/{}",
                    entry.layer_id,
                    entry.attempts,
                    policy.max_retries
                );
                remaining.push(entry);
            }
        }

        self.entries = remaining;
        events
    }
}
