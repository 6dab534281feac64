use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_GOAL_MINUTES: u32 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubjectColor {
    Red,
    Orange,
    Amber,
    Emerald,
    #[default]
    Blue,
    Violet,
    Pink,
    Custom(String),
}

impl SubjectColor {
    pub const PALETTE: [SubjectColor; 7] = [
        SubjectColor::Red,
        SubjectColor::Orange,
        SubjectColor::Amber,
        SubjectColor::Emerald,
        SubjectColor::Blue,
        SubjectColor::Violet,
        SubjectColor::Pink,
    ];

    pub fn hex(&self) -> &str {
        match self {
            Self::Red => "#ef4444",
            Self::Orange => "#f97316",
            Self::Amber => "#f59e0b",
            Self::Emerald => "#10b981",
            Self::Blue => "#3b82f6",
            Self::Violet => "#8b5cf6",
            Self::Pink => "#ec4899",
            Self::Custom(value) => value,
        }
    }
}

impl From<String> for SubjectColor {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Self::default();
        }
        Self::PALETTE
            .iter()
            .find(|token| token.hex() == normalized)
            .cloned()
            .unwrap_or(Self::Custom(value.trim().to_string()))
    }
}

impl From<SubjectColor> for String {
    fn from(value: SubjectColor) -> Self {
        value.hex().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "SubjectRecord")]
pub struct Subject {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub color: SubjectColor,
    #[serde(rename = "time")]
    pub total_minutes: u32,
    #[serde(rename = "goal")]
    pub goal_minutes: u32,
    #[serde(rename = "memo")]
    pub notes: Vec<String>,
}

impl Subject {
    pub fn from_draft(id: impl Into<String>, draft: &SubjectDraft) -> Self {
        Self {
            id: id.into(),
            display_name: draft.display_name.trim().to_string(),
            color: draft.color.clone(),
            total_minutes: 0,
            goal_minutes: DEFAULT_GOAL_MINUTES,
            notes: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "subject.id")?;
        validate_non_empty(&self.display_name, "subject.display_name")?;
        if self.goal_minutes == 0 {
            return Err("subject.goal_minutes must be > 0".to_string());
        }
        Ok(())
    }
}

/// Stored shape of a subject. Older documents carry `name` instead of
/// `displayName` and may omit the numeric fields entirely.
#[derive(Debug, Deserialize)]
struct SubjectRecord {
    #[serde(default)]
    id: String,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: SubjectColor,
    #[serde(default)]
    time: u32,
    #[serde(default)]
    goal: u32,
    #[serde(default)]
    memo: Option<Vec<String>>,
}

impl From<SubjectRecord> for Subject {
    fn from(record: SubjectRecord) -> Self {
        let display_name = record
            .display_name
            .filter(|value| !value.trim().is_empty())
            .or(record.name)
            .unwrap_or_default();
        Self {
            id: record.id,
            display_name,
            color: record.color,
            total_minutes: record.time,
            goal_minutes: if record.goal == 0 {
                DEFAULT_GOAL_MINUTES
            } else {
                record.goal
            },
            notes: record.memo.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub display_name: String,
    pub color: SubjectColor,
}

impl SubjectDraft {
    pub fn new(display_name: impl Into<String>, color: SubjectColor) -> Self {
        Self {
            display_name: display_name.into(),
            color,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.display_name, "subject.display_name")
    }
}

/// Minutes per subject per local calendar day, keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyLedger(BTreeMap<String, BTreeMap<String, u32>>);

impl DailyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minutes_on(&self, date_key: &str, subject_id: &str) -> u32 {
        self.0
            .get(date_key)
            .and_then(|day| day.get(subject_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn add_minutes(&mut self, date_key: &str, subject_id: &str, minutes: u32) -> u32 {
        let entry = self
            .0
            .entry(date_key.to_string())
            .or_default()
            .entry(subject_id.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(minutes);
        *entry
    }

    pub fn date_keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, BTreeMap<String, u32>>> for DailyLedger {
    fn from(value: BTreeMap<String, BTreeMap<String, u32>>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyData {
    pub subjects: Vec<Subject>,
    pub daily_ledger: DailyLedger,
}

impl StudyData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the aggregate from possibly incomplete stored fields. Subjects
    /// failing [`Subject::validate`] are dropped and duplicate ids keep their
    /// first entry.
    pub fn normalized(subjects: Option<Vec<Subject>>, daily_ledger: Option<DailyLedger>) -> Self {
        let mut seen = HashSet::new();
        let subjects = subjects
            .unwrap_or_default()
            .into_iter()
            .filter(|subject| subject.validate().is_ok())
            .filter(|subject| seen.insert(subject.id.clone()))
            .collect();
        Self {
            subjects,
            daily_ledger: daily_ledger.unwrap_or_default(),
        }
    }

    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id == subject_id)
    }

    pub fn contains_subject(&self, subject_id: &str) -> bool {
        self.subject(subject_id).is_some()
    }

    /// Returns a copy of the subject list with `update` applied to the single
    /// matching subject.
    pub fn subjects_with(&self, subject_id: &str, update: impl FnOnce(&mut Subject)) -> Vec<Subject> {
        let mut subjects = self.subjects.clone();
        if let Some(subject) = subjects.iter_mut().find(|subject| subject.id == subject_id) {
            update(subject);
        }
        subjects
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
