//! Outbound send tracking.
//!
//! Every `message:send` gets a client-assigned sequence number and an ack
//! deadline. Acknowledgments resolve entries by sequence number; entries
//! whose deadline passes, and all entries at connection loss, resolve as
//! failed so the UI can offer retry. Nothing is dropped silently.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use hirewire_proto::ConversationId;

/// A send awaiting acknowledgment.
#[derive(Debug, Clone)]
pub(crate) struct PendingSend<I> {
    /// Client-assigned sequence number.
    pub local_seq: u64,
    /// Target conversation.
    #[allow(dead_code)]
    pub conversation_id: ConversationId,
    /// Message text (kept for retransmission on retry).
    #[allow(dead_code)]
    pub body: String,
    /// Client send timestamp, milliseconds since epoch.
    #[allow(dead_code)]
    pub sent_at: i64,
    /// When the ack is considered overdue.
    deadline: I,
}

/// Tracks in-flight sends and assigns the per-session sequence.
#[derive(Debug, Clone)]
pub(crate) struct SendTracker<I> {
    pending: Vec<PendingSend<I>>,
    next_seq: u64,
    ack_timeout: Duration,
}

impl<I> SendTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    pub fn new(ack_timeout: Duration) -> Self {
        Self { pending: Vec::new(), next_seq: 0, ack_timeout }
    }

    /// Assign the next sequence number. Monotonic for the session lifetime,
    /// whether or not the send ends up tracked.
    pub fn assign_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Track a send under an already-assigned sequence number.
    pub fn track(
        &mut self,
        local_seq: u64,
        conversation_id: ConversationId,
        body: String,
        sent_at: i64,
        now: I,
    ) {
        self.pending.push(PendingSend {
            local_seq,
            conversation_id,
            body,
            sent_at,
            deadline: now + self.ack_timeout,
        });
    }

    /// Resolve a tracked send by sequence number. `None` if unknown (late or
    /// duplicate ack).
    pub fn resolve(&mut self, local_seq: u64) -> Option<PendingSend<I>> {
        let index = self.pending.iter().position(|p| p.local_seq == local_seq)?;
        Some(self.pending.remove(index))
    }

    /// Remove and return every send whose deadline has passed.
    pub fn expired(&mut self, now: I) -> Vec<PendingSend<I>> {
        let mut overdue = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if now >= self.pending[index].deadline {
                overdue.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }
        overdue
    }

    /// Remove and return every tracked send (connection loss or teardown).
    pub fn drain_all(&mut self) -> Vec<PendingSend<I>> {
        std::mem::take(&mut self.pending)
    }

    /// Number of sends awaiting acknowledgment.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
