use crate::application::error::{SkipReason, StudyError};
use crate::domain::models::StudyData;
use crate::infrastructure::document_store::DocumentFields;
use crate::infrastructure::identity::Identity;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Unloaded,
    Loading,
    Ready(StudyData),
    Absent,
    Failed(StudyError),
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Absent => "absent",
            Self::Failed(_) => "failed",
        }
    }

    pub fn data(&self) -> Option<&StudyData> {
        match self {
            Self::Ready(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyState {
    pub identity: Option<Identity>,
    pub phase: SyncPhase,
    /// Bumped on every identity transition or reload.
    pub generation: u64,
}

/// Everything a mutation needs, captured under one lock.
#[derive(Debug, Clone)]
pub struct WriteTarget {
    pub identity: Identity,
    pub generation: u64,
    pub data: StudyData,
}

/// Session cell shared by the sync coordinator and the record store. The lock
/// is never held across an await.
#[derive(Debug, Clone, Default)]
pub struct SharedStudyState {
    inner: Arc<Mutex<StudyState>>,
}

impl SharedStudyState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StudyState>, StudyError> {
        self.inner
            .lock()
            .map_err(|error| StudyError::Internal(format!("study state lock poisoned: {error}")))
    }

    pub fn snapshot(&self) -> Result<StudyState, StudyError> {
        Ok(self.lock()?.clone())
    }

    pub fn phase(&self) -> Result<SyncPhase, StudyError> {
        Ok(self.lock()?.phase.clone())
    }

    pub fn identity(&self) -> Result<Option<Identity>, StudyError> {
        Ok(self.lock()?.identity.clone())
    }

    /// Starts a new generation for `identity`: `Loading` when present,
    /// `Absent` (data dropped) when not.
    pub fn begin(&self, identity: Option<Identity>) -> Result<u64, StudyError> {
        let mut state = self.lock()?;
        state.generation = state.generation.wrapping_add(1);
        state.phase = if identity.is_some() {
            SyncPhase::Loading
        } else {
            SyncPhase::Absent
        };
        state.identity = identity;
        Ok(state.generation)
    }

    /// Stores a load result. Returns `false` if a newer generation started
    /// meanwhile; the result is dropped in that case.
    pub fn finish_load(
        &self,
        generation: u64,
        result: Result<StudyData, StudyError>,
    ) -> Result<bool, StudyError> {
        let mut state = self.lock()?;
        if state.generation != generation {
            return Ok(false);
        }
        state.phase = match result {
            Ok(data) => SyncPhase::Ready(data),
            Err(error) => SyncPhase::Failed(error),
        };
        Ok(true)
    }

    pub fn write_target(&self) -> Result<Result<WriteTarget, SkipReason>, StudyError> {
        let state = self.lock()?;
        let Some(identity) = state.identity.clone() else {
            return Ok(Err(SkipReason::NotAuthenticated));
        };
        let Some(data) = state.phase.data() else {
            return Ok(Err(SkipReason::NotReady));
        };
        Ok(Ok(WriteTarget {
            identity,
            generation: state.generation,
            data: data.clone(),
        }))
    }

    /// Mirrors committed fields into the loaded data. Returns `false` when the
    /// identity changed or data was unloaded after the write was issued.
    pub fn apply_fields(&self, generation: u64, fields: &DocumentFields) -> Result<bool, StudyError> {
        let mut state = self.lock()?;
        if state.generation != generation {
            return Ok(false);
        }
        let SyncPhase::Ready(data) = &mut state.phase else {
            return Ok(false);
        };
        if let Some(subjects) = &fields.subjects {
            data.subjects = subjects.clone();
        }
        if let Some(study_records) = &fields.study_records {
            data.daily_ledger = study_records.clone();
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Subject, SubjectColor, SubjectDraft};

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    #[test]
    fn stale_load_is_discarded() {
        let state = SharedStudyState::new();
        let first = state.begin(Some(identity("a"))).expect("begin");
        let second = state.begin(None).expect("begin");
        assert_ne!(first, second);

        let applied = state
            .finish_load(first, Ok(StudyData::empty()))
            .expect("finish");
        assert!(!applied);
        assert_eq!(state.phase().expect("phase"), SyncPhase::Absent);
    }

    #[test]
    fn write_target_requires_identity_and_data() {
        let state = SharedStudyState::new();
        assert_eq!(
            state.write_target().expect("target").err(),
            Some(SkipReason::NotAuthenticated)
        );

        let generation = state.begin(Some(identity("a"))).expect("begin");
        assert_eq!(
            state.write_target().expect("target").err(),
            Some(SkipReason::NotReady)
        );

        state
            .finish_load(generation, Ok(StudyData::empty()))
            .expect("finish");
        let target = state.write_target().expect("target").expect("ready");
        assert_eq!(target.identity.id, "a");
        assert_eq!(target.generation, generation);
    }

    #[test]
    fn fields_apply_only_to_current_generation() {
        let state = SharedStudyState::new();
        let generation = state.begin(Some(identity("a"))).expect("begin");
        state
            .finish_load(generation, Ok(StudyData::empty()))
            .expect("finish");

        let subject = Subject::from_draft("s1", &SubjectDraft::new("Math", SubjectColor::Red));
        let fields = DocumentFields::subjects(vec![subject]);
        assert!(!state.apply_fields(generation + 1, &fields).expect("apply"));
        assert!(state.apply_fields(generation, &fields).expect("apply"));

        let phase = state.phase().expect("phase");
        assert_eq!(phase.data().map(|data| data.subjects.len()), Some(1));
    }
}
