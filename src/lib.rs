pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::error::{MutationOutcome, SkipReason, StudyError};
pub use application::focus_timer::{FocusTimer, TimerEvent};
pub use application::session::{SessionSnapshot, StudySession};
pub use application::session_state::{SharedStudyState, SyncPhase};
pub use application::sync::SyncCoordinator;
pub use application::time_records::TimeRecordStore;
pub use domain::calendar::StudyClock;
pub use domain::goal::{achievement_percent, GoalDraft, GoalProgress};
pub use domain::models::{DailyLedger, StudyData, Subject, SubjectColor, SubjectDraft};
pub use domain::pomodoro::{PomodoroEngine, SessionComplete, TimerError, TimerMode, TimerSnapshot};
pub use domain::weekly::{weekly_minutes, DayMinutes};
pub use infrastructure::error::InfraError;
pub use infrastructure::identity::{AuthOutcome, Credentials, Identity, IdentityProvider, LocalIdentityProvider, Registration};
pub use infrastructure::logging::{init_logging, LoggingGuard};
