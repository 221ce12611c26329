/// Countdown length: 25 minutes.
pub const INITIAL_SECS: u32 = 25 * 60;

/// Tick-driven sleep timer.
///
/// The host delivers one `tick()` per elapsed second while the timer runs;
/// there are no threads here. Reaching zero stops the countdown and reports
/// it, and the mixer turns that into a stop-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    remaining: u32,
    running: bool,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            remaining: INITIAL_SECS,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    /// Flip between running and paused. Pausing keeps the remaining time.
    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    pub fn reset(&mut self) {
        self.remaining = INITIAL_SECS;
        self.running = false;
    }

    /// Advance one second. Returns true exactly once, on the tick that
    /// reaches zero.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.remaining == 0 {
            return false;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.running = false;
            return true;
        }
        false
    }

    /// `MM:SS` display string.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}
