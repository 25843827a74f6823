//! Wait-step countdown.

use serde::{Deserialize, Serialize};

/// Wait duration as authored on a STAY step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDuration {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl StayDuration {
    pub fn new(days: u32, hours: u32, minutes: u32) -> Self {
        Self {
            days,
            hours,
            minutes,
        }
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.days) * 86_400 + u64::from(self.hours) * 3_600 + u64::from(self.minutes) * 60
    }
}

/// Result of advancing a countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Running { remaining_secs: u64 },
    /// This tick brought the countdown to zero.
    Finished,
    /// The countdown was already at zero before this tick.
    AlreadyFinished,
}

/// Second-resolution countdown computed once from a [`StayDuration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u64,
}

impl Countdown {
    pub fn new(duration: StayDuration) -> Self {
        Self {
            remaining_secs: duration.total_secs(),
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn tick(&mut self) -> CountdownTick {
        match self.remaining_secs {
            0 => CountdownTick::AlreadyFinished,
            1 => {
                self.remaining_secs = 0;
                CountdownTick::Finished
            }
            n => {
                self.remaining_secs = n - 1;
                CountdownTick::Running {
                    remaining_secs: self.remaining_secs,
                }
            }
        }
    }

    /// Remaining time split for display as (days, hours, minutes, seconds).
    pub fn remaining_parts(&self) -> (u64, u64, u64, u64) {
        let s = self.remaining_secs;
        (s / 86_400, (s % 86_400) / 3_600, (s % 3_600) / 60, s % 60)
    }
}
