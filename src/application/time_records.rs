use crate::application::error::{MutationOutcome, StudyError};
use crate::application::session_state::{SharedStudyState, WriteTarget};
use crate::domain::calendar::StudyClock;
use crate::domain::models::{Subject, SubjectDraft};
use crate::infrastructure::document_store::{DocumentFields, StudyDocumentStore};
use std::sync::Arc;
use uuid::Uuid;

/// Mutations over the loaded study data. Each one writes the remote document
/// first and mirrors the same fields locally only after the write succeeds.
pub struct TimeRecordStore<D: ?Sized = dyn StudyDocumentStore> {
    store: Arc<D>,
    state: SharedStudyState,
    clock: StudyClock,
}

impl<D: ?Sized> Clone for TimeRecordStore<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            state: self.state.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<D> TimeRecordStore<D>
where
    D: StudyDocumentStore + ?Sized,
{
    pub fn new(store: Arc<D>, state: SharedStudyState, clock: StudyClock) -> Self {
        Self { store, state, clock }
    }

    pub fn clock(&self) -> &StudyClock {
        &self.clock
    }

    /// Adds `minutes` to today's ledger entry and to the subject's total in a
    /// single document write.
    pub async fn record_minutes(
        &self,
        subject_id: &str,
        minutes: u32,
    ) -> Result<MutationOutcome, StudyError> {
        if minutes == 0 {
            return Err(StudyError::InvalidInput("minutes must be > 0".to_string()));
        }
        let target = match self.state.write_target()? {
            Ok(target) => target,
            Err(reason) => {
                tracing::debug!(subject_id, minutes, reason = reason.as_str(), "record skipped");
                return Ok(MutationOutcome::Skipped(reason));
            }
        };
        ensure_subject(&target, subject_id)?;

        let today = self.clock.today_key();
        let mut ledger = target.data.daily_ledger.clone();
        let day_total = ledger.add_minutes(&today, subject_id, minutes);
        let subjects = target.data.subjects_with(subject_id, |subject| {
            subject.total_minutes = subject.total_minutes.saturating_add(minutes);
        });
        let fields = DocumentFields::subjects(subjects).with_study_records(ledger);

        self.commit("record_minutes", &target, &fields).await?;
        tracing::info!(subject_id, minutes, date = %today, day_total, "minutes recorded");
        Ok(MutationOutcome::Applied)
    }

    pub async fn set_goal(&self, subject_id: &str, goal_minutes: u32) -> Result<MutationOutcome, StudyError> {
        if goal_minutes == 0 {
            return Err(StudyError::InvalidInput("goal must be > 0".to_string()));
        }
        let target = match self.state.write_target()? {
            Ok(target) => target,
            Err(reason) => {
                tracing::debug!(subject_id, goal_minutes, reason = reason.as_str(), "goal update skipped");
                return Ok(MutationOutcome::Skipped(reason));
            }
        };
        ensure_subject(&target, subject_id)?;

        let subjects = target
            .data
            .subjects_with(subject_id, |subject| subject.goal_minutes = goal_minutes);
        self.commit("set_goal", &target, &DocumentFields::subjects(subjects))
            .await?;
        tracing::info!(subject_id, goal_minutes, "goal updated");
        Ok(MutationOutcome::Applied)
    }

    /// Replaces the subject's notes with `notes` as given.
    pub async fn set_notes(&self, subject_id: &str, notes: Vec<String>) -> Result<MutationOutcome, StudyError> {
        let target = match self.state.write_target()? {
            Ok(target) => target,
            Err(reason) => {
                tracing::debug!(subject_id, reason = reason.as_str(), "notes update skipped");
                return Ok(MutationOutcome::Skipped(reason));
            }
        };
        ensure_subject(&target, subject_id)?;

        let count = notes.len();
        let subjects = target
            .data
            .subjects_with(subject_id, |subject| subject.notes = notes);
        self.commit("set_notes", &target, &DocumentFields::subjects(subjects))
            .await?;
        tracing::info!(subject_id, notes = count, "notes updated");
        Ok(MutationOutcome::Applied)
    }

    /// Appends a new subject and returns the full committed collection. Unlike
    /// the other mutations, a missing identity or unloaded data is an error.
    pub async fn add_subject(&self, draft: &SubjectDraft) -> Result<Vec<Subject>, StudyError> {
        draft.validate().map_err(StudyError::InvalidInput)?;
        let target = match self.state.write_target()? {
            Ok(target) => target,
            Err(reason) => {
                tracing::error!(reason = reason.as_str(), "cannot add subject");
                return Err(reason.into());
            }
        };

        let subject = Subject::from_draft(Uuid::new_v4().to_string(), draft);
        let subject_id = subject.id.clone();
        let mut subjects = target.data.subjects.clone();
        subjects.push(subject);
        let fields = DocumentFields::subjects(subjects.clone());

        self.commit("add_subject", &target, &fields).await?;
        tracing::info!(subject_id = %subject_id, subjects = subjects.len(), "subject added");
        Ok(subjects)
    }

    async fn commit(
        &self,
        operation: &'static str,
        target: &WriteTarget,
        fields: &DocumentFields,
    ) -> Result<(), StudyError> {
        if let Err(error) = self.store.merge_fields(&target.identity.id, fields).await {
            tracing::error!(
                operation,
                identity = %target.identity.id,
                fields = ?fields.field_names(),
                error = %error,
                "remote write failed"
            );
            return Err(StudyError::remote_write(&error));
        }
        if !self.state.apply_fields(target.generation, fields)? {
            tracing::debug!(
                operation,
                generation = target.generation,
                "session changed during write; local mirror left as is"
            );
        }
        Ok(())
    }
}

fn ensure_subject(target: &WriteTarget, subject_id: &str) -> Result<(), StudyError> {
    if target.data.contains_subject(subject_id) {
        Ok(())
    } else {
        Err(StudyError::SubjectNotFound(subject_id.to_string()))
    }
}
