use crate::application::error::{MutationOutcome, StudyError};
use crate::application::focus_timer::{FocusTimer, TimerEvent};
use crate::application::session_state::{SharedStudyState, SyncPhase};
use crate::application::sync::SyncCoordinator;
use crate::application::time_records::TimeRecordStore;
use crate::domain::calendar::StudyClock;
use crate::domain::goal::{GoalDraft, GoalProgress};
use crate::domain::models::{DailyLedger, StudyData, Subject, SubjectDraft};
use crate::domain::notes::{append_note, remove_note, replace_note};
use crate::domain::summary::StudySummary;
use crate::domain::weekly::{weekly_minutes, DayMinutes};
use crate::infrastructure::document_store::StudyDocumentStore;
use crate::infrastructure::identity::{Identity, IdentityProvider};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub subjects: Vec<Subject>,
    pub daily_ledger: DailyLedger,
    pub loading: bool,
    pub error: Option<String>,
}

/// One user session: the shared study state plus the services that read and
/// write it.
pub struct StudySession<D: ?Sized = dyn StudyDocumentStore> {
    state: SharedStudyState,
    records: TimeRecordStore<D>,
    sync: SyncCoordinator<D>,
}

impl<D> StudySession<D>
where
    D: StudyDocumentStore + ?Sized + 'static,
{
    pub fn new(store: Arc<D>, clock: StudyClock) -> Self {
        let state = SharedStudyState::new();
        Self {
            records: TimeRecordStore::new(Arc::clone(&store), state.clone(), clock),
            sync: SyncCoordinator::new(store, state.clone()),
            state,
        }
    }

    pub fn state(&self) -> &SharedStudyState {
        &self.state
    }

    pub fn clock(&self) -> &StudyClock {
        self.records.clock()
    }

    pub fn phase(&self) -> Result<SyncPhase, StudyError> {
        self.state.phase()
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, StudyError> {
        let snapshot = match self.state.phase()? {
            SyncPhase::Ready(data) => SessionSnapshot {
                subjects: data.subjects,
                daily_ledger: data.daily_ledger,
                ..SessionSnapshot::default()
            },
            SyncPhase::Unloaded | SyncPhase::Loading => SessionSnapshot {
                loading: true,
                ..SessionSnapshot::default()
            },
            SyncPhase::Failed(error) => SessionSnapshot {
                error: Some(error.to_string()),
                ..SessionSnapshot::default()
            },
            SyncPhase::Absent => SessionSnapshot::default(),
        };
        Ok(snapshot)
    }

    pub async fn on_identity_changed(&self, identity: Option<Identity>) -> Result<SyncPhase, StudyError> {
        self.sync.on_identity_changed(identity).await
    }

    /// Follows `provider` so study data loads on sign-in and clears on
    /// sign-out. Replaces any earlier attachment.
    pub fn attach_identity<P>(&self, provider: &P) -> Result<(), StudyError>
    where
        P: IdentityProvider + ?Sized,
    {
        self.sync.watch_identity(provider)
    }

    pub fn detach_identity(&self) -> Result<(), StudyError> {
        self.sync.stop_watching()
    }

    pub async fn record_minutes(&self, subject_id: &str, minutes: u32) -> Result<MutationOutcome, StudyError> {
        self.records.record_minutes(subject_id, minutes).await
    }

    pub async fn set_goal(&self, subject_id: &str, goal_minutes: u32) -> Result<MutationOutcome, StudyError> {
        self.records.set_goal(subject_id, goal_minutes).await
    }

    pub async fn set_notes(&self, subject_id: &str, notes: Vec<String>) -> Result<MutationOutcome, StudyError> {
        self.records.set_notes(subject_id, notes).await
    }

    pub async fn add_note(&self, subject_id: &str, text: &str) -> Result<MutationOutcome, StudyError> {
        let notes = append_note(&self.current_notes(subject_id)?, text).map_err(StudyError::InvalidInput)?;
        self.set_notes(subject_id, notes).await
    }

    pub async fn edit_note(&self, subject_id: &str, index: usize, text: &str) -> Result<MutationOutcome, StudyError> {
        let notes =
            replace_note(&self.current_notes(subject_id)?, index, text).map_err(StudyError::InvalidInput)?;
        self.set_notes(subject_id, notes).await
    }

    pub async fn delete_note(&self, subject_id: &str, index: usize) -> Result<MutationOutcome, StudyError> {
        let notes = remove_note(&self.current_notes(subject_id)?, index).map_err(StudyError::InvalidInput)?;
        self.set_notes(subject_id, notes).await
    }

    fn current_notes(&self, subject_id: &str) -> Result<Vec<String>, StudyError> {
        let data = self.loaded()?;
        Ok(find_subject(&data, subject_id)?.notes.clone())
    }

    pub async fn add_subject(&self, draft: &SubjectDraft) -> Result<Vec<Subject>, StudyError> {
        self.records.add_subject(draft).await
    }

    pub async fn refetch(&self) -> Result<MutationOutcome, StudyError> {
        self.sync.refetch().await
    }

    /// Saves the draft's pending goal. The draft is marked committed only when
    /// the write is applied.
    pub async fn confirm_goal(&self, subject_id: &str, draft: &mut GoalDraft) -> Result<MutationOutcome, StudyError> {
        if !draft.is_dirty() {
            return Ok(MutationOutcome::Unchanged);
        }
        let outcome = self.records.set_goal(subject_id, draft.pending()).await?;
        if outcome.is_applied() {
            draft.mark_committed();
        }
        Ok(outcome)
    }

    pub fn goal_draft(&self, subject_id: &str) -> Result<GoalDraft, StudyError> {
        let data = self.loaded()?;
        let subject = find_subject(&data, subject_id)?;
        Ok(GoalDraft::new(subject.goal_minutes))
    }

    pub fn goal_progress(&self, subject_id: &str) -> Result<GoalProgress, StudyError> {
        let data = self.loaded()?;
        let subject = find_subject(&data, subject_id)?;
        Ok(GoalProgress::new(subject.total_minutes, subject.goal_minutes))
    }

    /// Sun..Sat minutes for the week containing `anchor`, today by default.
    pub fn weekly_minutes(&self, subject_id: &str, anchor: Option<NaiveDate>) -> Result<Vec<DayMinutes>, StudyError> {
        let data = self.loaded()?;
        find_subject(&data, subject_id)?;
        let anchor = anchor.unwrap_or_else(|| self.clock().today());
        Ok(weekly_minutes(&data.daily_ledger, subject_id, anchor))
    }

    pub fn summary(&self) -> Result<StudySummary, StudyError> {
        let subjects = self
            .state
            .phase()?
            .data()
            .map(|data| data.subjects.clone())
            .unwrap_or_default();
        Ok(StudySummary::from_subjects(&subjects))
    }

    pub fn focus_timer(
        &self,
        subject_id: &str,
    ) -> Result<(FocusTimer<D>, mpsc::UnboundedReceiver<TimerEvent>), StudyError> {
        let data = self.loaded()?;
        find_subject(&data, subject_id)?;
        Ok(FocusTimer::new(subject_id, self.records.clone()))
    }

    fn loaded(&self) -> Result<StudyData, StudyError> {
        self.state
            .phase()?
            .data()
            .cloned()
            .ok_or(StudyError::NotReady)
    }
}

fn find_subject<'a>(data: &'a StudyData, subject_id: &str) -> Result<&'a Subject, StudyError> {
    data.subject(subject_id)
        .ok_or_else(|| StudyError::SubjectNotFound(subject_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SubjectColor;
    use crate::infrastructure::document_store::InMemoryDocumentStore;

    fn identity() -> Identity {
        Identity {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    async fn signed_in() -> StudySession<InMemoryDocumentStore> {
        let session = StudySession::new(Arc::new(InMemoryDocumentStore::default()), StudyClock::default());
        session
            .on_identity_changed(Some(identity()))
            .await
            .expect("sign in");
        session
    }

    #[tokio::test]
    async fn snapshot_reflects_phase() {
        let session = StudySession::new(Arc::new(InMemoryDocumentStore::default()), StudyClock::default());
        let initial = session.snapshot().expect("snapshot");
        assert!(initial.loading);
        assert!(initial.subjects.is_empty());

        session.on_identity_changed(Some(identity())).await.expect("sign in");
        let snapshot = session.snapshot().expect("snapshot");
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());

        session.on_identity_changed(None).await.expect("sign out");
        assert_eq!(session.snapshot().expect("snapshot"), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn confirm_goal_commits_pending_value() {
        let session = signed_in().await;
        let subjects = session
            .add_subject(&SubjectDraft::new("Math", SubjectColor::Blue))
            .await
            .expect("add");
        let id = subjects[0].id.clone();

        let mut draft = session.goal_draft(&id).expect("draft");
        assert_eq!(
            session.confirm_goal(&id, &mut draft).await,
            Ok(MutationOutcome::Unchanged)
        );

        draft.increase();
        assert!(draft.is_dirty());
        assert_eq!(
            session.confirm_goal(&id, &mut draft).await,
            Ok(MutationOutcome::Applied)
        );
        assert!(!draft.is_dirty());
        assert_eq!(session.goal_progress(&id).expect("progress").goal_minutes, 90);
    }

    #[tokio::test]
    async fn derived_views_use_current_data() {
        let session = signed_in().await;
        let subjects = session
            .add_subject(&SubjectDraft::new("Math", SubjectColor::Blue))
            .await
            .expect("add");
        let id = subjects[0].id.clone();
        session.record_minutes(&id, 30).await.expect("record");

        let progress = session.goal_progress(&id).expect("progress");
        assert_eq!(progress.percent, 50.0);

        let today = session.clock().today();
        let week = session.weekly_minutes(&id, None).expect("week");
        assert_eq!(week.len(), 7);
        let entry = week.iter().find(|day| day.date == today).expect("today in week");
        assert_eq!(entry.minutes, 30);

        let summary = session.summary().expect("summary");
        assert_eq!((summary.subject_count, summary.total_minutes), (1, 30));

        assert_eq!(
            session.goal_progress("ghost"),
            Err(StudyError::SubjectNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn note_edits_commit_the_full_list() {
        let session = signed_in().await;
        let subjects = session
            .add_subject(&SubjectDraft::new("Math", SubjectColor::Blue))
            .await
            .expect("add");
        let id = subjects[0].id.clone();

        session.add_note(&id, " chapter 1 ").await.expect("add note");
        session.add_note(&id, "chapter 2").await.expect("add note");
        session.edit_note(&id, 1, "chapter 2 review").await.expect("edit note");
        session.delete_note(&id, 0).await.expect("delete note");
        assert!(matches!(
            session.add_note(&id, "   ").await,
            Err(StudyError::InvalidInput(_))
        ));
        assert!(matches!(
            session.delete_note(&id, 5).await,
            Err(StudyError::InvalidInput(_))
        ));

        let snapshot = session.snapshot().expect("snapshot");
        assert_eq!(snapshot.subjects[0].notes, vec!["chapter 2 review"]);
    }

    #[tokio::test]
    async fn views_require_loaded_data() {
        let session = StudySession::new(Arc::new(InMemoryDocumentStore::default()), StudyClock::default());
        assert_eq!(session.goal_progress("s1"), Err(StudyError::NotReady));
        assert!(matches!(session.focus_timer("s1"), Err(StudyError::NotReady)));
        assert_eq!(session.summary().expect("summary").subject_count, 0);
    }
}
