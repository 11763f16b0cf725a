/// Consecutive blocked tier-3 resolutions after which a channel scan stops.
pub const BLOCKED_ATTEMPT_THRESHOLD: u32 = 3;

/// Consecutive challenge/format download failures after which a channel's downloads stop.
pub const CHALLENGE_FORMAT_THRESHOLD: u32 = 3;

/// Counts consecutive failures and trips once a threshold is reached.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    /// Record a failure. Returns `true` when this failure trips the breaker.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive += 1;
        self.is_open()
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn is_open(&self) -> bool {
        self.consecutive >= self.threshold
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
