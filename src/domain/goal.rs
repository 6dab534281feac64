use serde::Serialize;

pub const GOAL_FLOOR_MINUTES: u32 = 30;
pub const GOAL_STEP_MINUTES: u32 = 30;

/// Share of the goal reached, in percent, capped at 100. A zero goal is
/// treated as one minute.
pub fn achievement_percent(total_minutes: u32, goal_minutes: u32) -> f64 {
    let goal = f64::from(goal_minutes.max(1));
    (100.0 * f64::from(total_minutes) / goal).min(100.0)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalProgress {
    pub total_minutes: u32,
    pub goal_minutes: u32,
    pub percent: f64,
    pub achieved: bool,
}

impl GoalProgress {
    pub fn new(total_minutes: u32, goal_minutes: u32) -> Self {
        let percent = achievement_percent(total_minutes, goal_minutes);
        Self {
            total_minutes,
            goal_minutes,
            percent,
            achieved: percent >= 100.0,
        }
    }
}

/// Goal value being edited before it is saved; the stored goal is untouched
/// until [`GoalDraft::mark_committed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalDraft {
    committed: u32,
    pending: u32,
}

impl GoalDraft {
    pub fn new(committed: u32) -> Self {
        Self {
            committed,
            pending: committed,
        }
    }

    pub fn committed(&self) -> u32 {
        self.committed
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn is_dirty(&self) -> bool {
        self.pending != self.committed
    }

    fn adjust(&mut self, delta_minutes: i64) -> u32 {
        let adjusted = i64::from(self.pending) + delta_minutes;
        self.pending = adjusted.clamp(i64::from(GOAL_FLOOR_MINUTES), i64::from(u32::MAX)) as u32;
        self.pending
    }

    pub fn increase(&mut self) -> u32 {
        self.adjust(i64::from(GOAL_STEP_MINUTES))
    }

    pub fn decrease(&mut self) -> u32 {
        self.adjust(-i64::from(GOAL_STEP_MINUTES))
    }

    /// Re-syncs with a stored value that changed elsewhere, dropping any
    /// pending edit.
    pub fn rebase(&mut self, committed: u32) {
        self.committed = committed;
        self.pending = committed;
    }

    pub fn mark_committed(&mut self) {
        self.committed = self.pending;
    }
}
