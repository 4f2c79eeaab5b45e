//! Per-connection liveness state machine
//!
//! `Alive` --ping sent--> `AwaitingPong` --pong--> `Alive`
//!
//! A connection still `AwaitingPong` once `pong_timeout` has elapsed since
//! the ping is dead. The monitor only records transitions; the writer pump
//! owns the clock and acts on [`LivenessMonitor::deadline`].

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// Last ping (if any) has been answered
    Alive,
    /// A ping is outstanding
    AwaitingPong { ping_sent_at: Instant },
}

#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    state: LivenessState,
    pong_timeout: Duration,
    last_pong_at: Option<Instant>,
}

impl LivenessMonitor {
    #[must_use]
    pub fn new(pong_timeout: Duration) -> Self {
        Self {
            state: LivenessState::Alive,
            pong_timeout,
            last_pong_at: None,
        }
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// A new ping is only sent while nothing is outstanding
    pub fn should_ping(&self) -> bool {
        matches!(self.state, LivenessState::Alive)
    }

    /// Record that a ping went out at `now`
    ///
    /// Has no effect while a ping is outstanding, so the deadline keeps
    /// counting from the first unanswered ping.
    pub fn ping_sent(&mut self, now: Instant) {
        if self.should_ping() {
            self.state = LivenessState::AwaitingPong { ping_sent_at: now };
        }
    }

    /// Record a pong (transport pong frame or application heartbeat)
    ///
    /// Returns `true` if it answered an outstanding ping.
    pub fn pong_received(&mut self, now: Instant) -> bool {
        let answered = matches!(self.state, LivenessState::AwaitingPong { .. });
        self.state = LivenessState::Alive;
        self.last_pong_at = Some(now);
        answered
    }

    /// Instant at which the outstanding ping expires
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            LivenessState::Alive => None,
            LivenessState::AwaitingPong { ping_sent_at } => Some(ping_sent_at + self.pong_timeout),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    pub fn last_pong_at(&self) -> Option<Instant> {
        self.last_pong_at
    }

    pub fn pong_timeout(&self) -> Duration {
        self.pong_timeout
    }
}
