pub mod bootstrap;
pub mod error;
pub mod focus_timer;
pub mod session;
pub mod session_state;
pub mod sync;
pub mod time_records;
