use std::time::{Duration, Instant};

/// Decides how long a listener keeps waiting for replies.
///
/// The listener stops at `max_time` no matter what. After `min_time` it also
/// stops as soon as `max_silence` passes without a new reply.
#[derive(Debug, Clone)]
pub struct ScanTimer {
    started: Instant,
    last_seen: Instant,
    max_time: Duration,
    min_time: Duration,
    max_silence: Duration,
}

impl ScanTimer {
    pub fn new(max_time: Duration, min_time: Duration, max_silence: Duration) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_seen: now,
            max_time,
            min_time,
            max_silence,
        }
    }

    pub fn mark_seen(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.max_time
    }

    pub fn should_break_on_timeout(&self) -> bool {
        self.started.elapsed() >= self.min_time && self.last_seen.elapsed() >= self.max_silence
    }

    /// Time until the next decision point.
    pub fn next_wait(&self) -> Duration {
        let until_deadline = self.max_time.saturating_sub(self.started.elapsed());
        let until_silence = self.max_silence.saturating_sub(self.last_seen.elapsed());
        until_deadline.min(until_silence.max(Duration::from_millis(1)))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
