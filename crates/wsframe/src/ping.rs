//! Ping/pong liveness tracking.

/// Tracks the most recent ping sent and pong received.
///
/// Timestamps are caller-supplied milliseconds from any monotonic clock. The
/// result of [`PingPongHandler::is_alive`] is a heuristic: a peer that never
/// answers still counts as alive until the timeout after the last ping has
/// elapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingPongHandler {
    last_ping_time: Option<u64>,
    last_pong_time: Option<u64>,
}

impl PingPongHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_ping(&mut self, now: u64) {
        self.last_ping_time = Some(now);
    }

    pub fn receive_pong(&mut self, now: u64) {
        self.last_pong_time = Some(now);
    }

    pub fn last_ping_time(&self) -> Option<u64> {
        self.last_ping_time
    }

    pub fn last_pong_time(&self) -> Option<u64> {
        self.last_pong_time
    }

    /// Alive when no ping is outstanding, a pong arrived at or after the last
    /// ping, or fewer than `timeout` ms have passed since the last ping.
    pub fn is_alive(&self, now: u64, timeout: u64) -> bool {
        let Some(ping) = self.last_ping_time else {
            return true;
        };
        if matches!(self.last_pong_time, Some(pong) if pong >= ping) {
            return true;
        }
        now.saturating_sub(ping) < timeout
    }
}
