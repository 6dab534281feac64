use crate::domain::models::Subject;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StudySummary {
    pub subject_count: usize,
    pub total_minutes: u64,
    pub total_hours: f64,
}

impl StudySummary {
    pub fn from_subjects(subjects: &[Subject]) -> Self {
        let total_minutes = subjects
            .iter()
            .map(|subject| u64::from(subject.total_minutes))
            .sum::<u64>();
        Self {
            subject_count: subjects.len(),
            total_minutes,
            total_hours: (total_minutes as f64 / 60.0 * 10.0).round() / 10.0,
        }
    }
}
