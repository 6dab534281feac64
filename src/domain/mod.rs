pub mod calendar;
pub mod goal;
pub mod models;
pub mod notes;
pub mod pomodoro;
pub mod summary;
pub mod weekly;
