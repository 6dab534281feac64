use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const BREAK_MINUTES: u32 = 5;
pub const MIN_FOCUS_MINUTES: u32 = 5;
pub const FOCUS_STEP_MINUTES: i32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Focus,
    Break,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Break => "break",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SessionComplete {
    pub mode: TimerMode,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is already running")]
    AlreadyRunning,
    #[error("duration cannot change while the timer is running")]
    Running,
    #[error("break duration is fixed at 5 minutes")]
    BreakDurationFixed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub duration_minutes: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    pub clock: String,
}

/// Focus/break countdown. Advances only through [`PomodoroEngine::tick`]; the
/// caller owns the one-second schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroEngine {
    mode: TimerMode,
    duration_minutes: u32,
    remaining_seconds: u32,
    running: bool,
}

impl Default for PomodoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PomodoroEngine {
    pub fn new() -> Self {
        Self::entering(TimerMode::Focus, DEFAULT_FOCUS_MINUTES)
    }

    fn entering(mode: TimerMode, duration_minutes: u32) -> Self {
        Self {
            mode,
            duration_minutes,
            remaining_seconds: duration_minutes * 60,
            running: false,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.running {
            return Err(TimerError::AlreadyRunning);
        }
        if self.remaining_seconds == 0 {
            self.remaining_seconds = self.duration_minutes * 60;
        }
        self.running = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_seconds = self.duration_minutes * 60;
    }

    pub fn adjust_duration(&mut self, delta_minutes: i32) -> Result<u32, TimerError> {
        if self.running {
            return Err(TimerError::Running);
        }
        if self.mode == TimerMode::Break {
            return Err(TimerError::BreakDurationFixed);
        }
        let adjusted = i64::from(self.duration_minutes) + i64::from(delta_minutes);
        let clamped = adjusted.clamp(i64::from(MIN_FOCUS_MINUTES), i64::from(u32::MAX / 60));
        self.duration_minutes = clamped as u32;
        self.remaining_seconds = self.duration_minutes * 60;
        Ok(self.duration_minutes)
    }

    /// One second of countdown. Returns the completed session when the
    /// countdown reaches zero, after switching to the next mode.
    pub fn tick(&mut self) -> Option<SessionComplete> {
        if !self.running {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return None;
        }

        let completed = SessionComplete {
            mode: self.mode,
            duration_minutes: self.duration_minutes,
        };
        *self = match completed.mode {
            TimerMode::Focus => Self::entering(TimerMode::Break, BREAK_MINUTES),
            TimerMode::Break => Self::entering(TimerMode::Focus, DEFAULT_FOCUS_MINUTES),
        };
        Some(completed)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            duration_minutes: self.duration_minutes,
            remaining_seconds: self.remaining_seconds,
            running: self.running,
            clock: format_clock(self.remaining_seconds),
        }
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
