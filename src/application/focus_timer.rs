use crate::application::error::{MutationOutcome, StudyError};
use crate::application::time_records::TimeRecordStore;
use crate::domain::pomodoro::{PomodoroEngine, SessionComplete, TimerError, TimerMode, TimerSnapshot};
use crate::infrastructure::document_store::StudyDocumentStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Emitted once per finished countdown. `recorded` is `None` for breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEvent {
    pub subject_id: String,
    pub completed: SessionComplete,
    pub recorded: Option<Result<MutationOutcome, StudyError>>,
}

/// Drives a [`PomodoroEngine`] for one subject on a one-second tokio tick and
/// records finished focus sessions. Dropping the timer stops the tick.
pub struct FocusTimer<D: ?Sized = dyn StudyDocumentStore> {
    subject_id: String,
    engine: Arc<Mutex<PomodoroEngine>>,
    records: TimeRecordStore<D>,
    snapshots: Arc<watch::Sender<TimerSnapshot>>,
    events: mpsc::UnboundedSender<TimerEvent>,
    ticker: Option<CancellationToken>,
}

fn lock_engine(engine: &Mutex<PomodoroEngine>) -> MutexGuard<'_, PomodoroEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<D> FocusTimer<D>
where
    D: StudyDocumentStore + ?Sized + 'static,
{
    pub fn new(
        subject_id: impl Into<String>,
        records: TimeRecordStore<D>,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let engine = PomodoroEngine::new();
        let (snapshots, _) = watch::channel(engine.snapshot());
        let (events, receiver) = mpsc::unbounded_channel();
        let timer = Self {
            subject_id: subject_id.into(),
            engine: Arc::new(Mutex::new(engine)),
            records,
            snapshots: Arc::new(snapshots),
            events,
            ticker: None,
        };
        (timer, receiver)
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        lock_engine(&self.engine).snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn start(&mut self) -> Result<TimerSnapshot, TimerError> {
        let snapshot = {
            let mut engine = lock_engine(&self.engine);
            engine.start()?;
            engine.snapshot()
        };
        self.cancel_ticker();

        let token = CancellationToken::new();
        self.ticker = Some(token.clone());
        tokio::spawn(run_ticker(
            Ticker {
                subject_id: self.subject_id.clone(),
                engine: Arc::clone(&self.engine),
                records: self.records.clone(),
                snapshots: Arc::clone(&self.snapshots),
                events: self.events.clone(),
            },
            token,
        ));
        tracing::debug!(subject_id = %self.subject_id, mode = snapshot.mode.as_str(), "timer started");
        Ok(self.publish(snapshot))
    }

    pub fn pause(&mut self) -> TimerSnapshot {
        let snapshot = {
            let mut engine = lock_engine(&self.engine);
            engine.pause();
            engine.snapshot()
        };
        self.cancel_ticker();
        self.publish(snapshot)
    }

    pub fn reset(&mut self) -> TimerSnapshot {
        let snapshot = {
            let mut engine = lock_engine(&self.engine);
            engine.reset();
            engine.snapshot()
        };
        self.cancel_ticker();
        self.publish(snapshot)
    }

    pub fn adjust_duration(&mut self, delta_minutes: i32) -> Result<TimerSnapshot, TimerError> {
        let snapshot = {
            let mut engine = lock_engine(&self.engine);
            engine.adjust_duration(delta_minutes)?;
            engine.snapshot()
        };
        Ok(self.publish(snapshot))
    }

    /// Halts the countdown for good, as when the subject view closes.
    pub fn stop(&mut self) -> TimerSnapshot {
        self.pause()
    }

    fn cancel_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }

    fn publish(&self, snapshot: TimerSnapshot) -> TimerSnapshot {
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}

impl<D: ?Sized> Drop for FocusTimer<D> {
    fn drop(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }
}

struct Ticker<D: ?Sized> {
    subject_id: String,
    engine: Arc<Mutex<PomodoroEngine>>,
    records: TimeRecordStore<D>,
    snapshots: Arc<watch::Sender<TimerSnapshot>>,
    events: mpsc::UnboundedSender<TimerEvent>,
}

async fn run_ticker<D>(ticker: Ticker<D>, token: CancellationToken)
where
    D: StudyDocumentStore + ?Sized + 'static,
{
    let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let (completed, snapshot) = {
            let mut engine = lock_engine(&ticker.engine);
            if token.is_cancelled() || !engine.is_running() {
                break;
            }
            let completed = engine.tick();
            (completed, engine.snapshot())
        };
        ticker.snapshots.send_replace(snapshot);

        let Some(completed) = completed else {
            continue;
        };
        let recorded = match completed.mode {
            TimerMode::Focus => Some(
                ticker
                    .records
                    .record_minutes(&ticker.subject_id, completed.duration_minutes)
                    .await,
            ),
            TimerMode::Break => None,
        };
        if let Some(Err(error)) = &recorded {
            tracing::error!(subject_id = %ticker.subject_id, error = %error, "failed to record focus session");
        }
        tracing::info!(
            subject_id = %ticker.subject_id,
            mode = completed.mode.as_str(),
            minutes = completed.duration_minutes,
            "timer session completed"
        );
        let _ = ticker.events.send(TimerEvent {
            subject_id: ticker.subject_id.clone(),
            completed,
            recorded,
        });
        break;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_state::SharedStudyState;
    use crate::domain::calendar::StudyClock;
    use crate::domain::models::{StudyData, Subject, SubjectColor, SubjectDraft};
    use crate::domain::pomodoro::{BREAK_MINUTES, DEFAULT_FOCUS_MINUTES};
    use crate::infrastructure::document_store::{InMemoryDocumentStore, StudyDocument};
    use crate::infrastructure::identity::Identity;
    use tokio::sync::mpsc::error::TryRecvError;

    fn timer() -> (
        FocusTimer<InMemoryDocumentStore>,
        mpsc::UnboundedReceiver<TimerEvent>,
        SharedStudyState,
    ) {
        let subject = Subject::from_draft("s1", &SubjectDraft::new("Math", SubjectColor::Blue));
        let data = StudyData {
            subjects: vec![subject],
            ..StudyData::empty()
        };
        let store = Arc::new(InMemoryDocumentStore::with_document(
            "user-1",
            StudyDocument::from(&data),
        ));
        let state = SharedStudyState::new();
        let generation = state
            .begin(Some(Identity {
                id: "user-1".to_string(),
                email: "user@example.com".to_string(),
            }))
            .expect("begin");
        state.finish_load(generation, Ok(data)).expect("finish");

        let records = TimeRecordStore::new(store, state.clone(), StudyClock::default());
        let (timer, events) = FocusTimer::new("s1", records);
        (timer, events, state)
    }

    fn total_minutes(state: &SharedStudyState) -> u32 {
        state
            .phase()
            .expect("phase")
            .data()
            .and_then(|data| data.subject("s1").map(|subject| subject.total_minutes))
            .expect("subject loaded")
    }

    #[tokio::test(start_paused = true)]
    async fn focus_completion_records_once_and_enters_break() {
        let (mut timer, mut events, state) = timer();
        timer.start().expect("start");

        let event = events.recv().await.expect("completion event");
        assert_eq!(event.completed.mode, TimerMode::Focus);
        assert_eq!(event.completed.duration_minutes, DEFAULT_FOCUS_MINUTES);
        assert_eq!(event.recorded, Some(Ok(MutationOutcome::Applied)));
        assert_eq!(total_minutes(&state), DEFAULT_FOCUS_MINUTES);

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.mode, TimerMode::Break);
        assert_eq!(snapshot.remaining_seconds, BREAK_MINUTES * 60);
        assert!(!snapshot.running);
    }

    #[tokio::test(start_paused = true)]
    async fn break_completion_records_nothing() {
        let (mut timer, mut events, state) = timer();
        timer.start().expect("start focus");
        events.recv().await.expect("focus event");

        timer.start().expect("start break");
        let event = events.recv().await.expect("break event");
        assert_eq!(event.completed.mode, TimerMode::Break);
        assert_eq!(event.recorded, None);
        assert_eq!(total_minutes(&state), DEFAULT_FOCUS_MINUTES);
        assert_eq!(timer.snapshot().mode, TimerMode::Focus);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_halts_the_countdown() {
        let (mut timer, _events, _state) = timer();
        timer.start().expect("start");
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let paused = timer.pause();
        assert_eq!(paused.remaining_seconds, 1_490);
        assert!(!paused.running);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(timer.snapshot().remaining_seconds, 1_490);
        assert!(timer.adjust_duration(5).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_stops_ticking() {
        let (mut timer, mut events, state) = timer();
        timer.start().expect("start");
        tokio::time::sleep(Duration::from_secs(3)).await;
        drop(timer);

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert!(matches!(events.try_recv(), Err(TryRecvError::Disconnected)));
        assert_eq!(total_minutes(&state), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn running_timer_rejects_adjustments_and_publishes_snapshots() {
        let (mut timer, _events, _state) = timer();
        let mut snapshots = timer.subscribe();
        timer.start().expect("start");
        assert_eq!(timer.adjust_duration(5), Err(TimerError::Running));
        assert_eq!(timer.start(), Err(TimerError::AlreadyRunning));

        snapshots.changed().await.expect("snapshot published");
        assert!(snapshots.borrow_and_update().running);
        timer.stop();
    }
}
