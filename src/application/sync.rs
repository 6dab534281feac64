use crate::application::error::{MutationOutcome, SkipReason, StudyError};
use crate::application::session_state::{SharedStudyState, SyncPhase};
use crate::domain::models::StudyData;
use crate::infrastructure::document_store::{StudyDocument, StudyDocumentStore};
use crate::infrastructure::identity::{Identity, IdentityProvider};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Running identity watch. Dropping it cancels the watch and any load it
/// started.
#[derive(Debug)]
pub struct WatchHandle {
    token: CancellationToken,
    _task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Keeps the shared study state in step with the signed-in identity.
pub struct SyncCoordinator<D: ?Sized = dyn StudyDocumentStore> {
    store: Arc<D>,
    state: SharedStudyState,
    active_watch: Arc<Mutex<Option<WatchHandle>>>,
}

impl<D: ?Sized> Clone for SyncCoordinator<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            state: self.state.clone(),
            active_watch: Arc::clone(&self.active_watch),
        }
    }
}

impl<D> SyncCoordinator<D>
where
    D: StudyDocumentStore + ?Sized + 'static,
{
    pub fn new(store: Arc<D>, state: SharedStudyState) -> Self {
        Self {
            store,
            state,
            active_watch: Arc::new(Mutex::new(None)),
        }
    }

    /// Handles one identity transition. Signing out drops the data at once;
    /// signing in loads the identity's document. A result that arrives after
    /// a newer transition is discarded.
    pub async fn on_identity_changed(&self, identity: Option<Identity>) -> Result<SyncPhase, StudyError> {
        let generation = self.state.begin(identity.clone())?;
        match identity {
            None => {
                tracing::info!(generation, "identity absent; study data cleared");
            }
            Some(identity) => self.load(generation, identity).await?,
        }
        self.state.phase()
    }

    /// Reloads the current identity's document, superseding any load in flight.
    pub async fn refetch(&self) -> Result<MutationOutcome, StudyError> {
        let Some(identity) = self.state.identity()? else {
            tracing::debug!("refetch skipped without identity");
            return Ok(MutationOutcome::Skipped(SkipReason::NotAuthenticated));
        };
        self.on_identity_changed(Some(identity)).await?;
        Ok(MutationOutcome::Applied)
    }

    async fn load(&self, generation: u64, identity: Identity) -> Result<(), StudyError> {
        tracing::debug!(identity = %identity.id, generation, "loading study data");
        let result = self.load_or_create(&identity.id).await;
        if let Err(error) = &result {
            tracing::error!(identity = %identity.id, generation, error = %error, "failed to load study data");
        }
        let subjects = result.as_ref().map(|data| data.subjects.len()).ok();
        if self.state.finish_load(generation, result)? {
            if let Some(subjects) = subjects {
                tracing::info!(identity = %identity.id, generation, subjects, "study data ready");
            }
        } else {
            tracing::debug!(identity = %identity.id, generation, "discarding stale load result");
        }
        Ok(())
    }

    /// Reads the identity's document, creating the empty default when none
    /// exists yet.
    pub async fn load_or_create(&self, key: &str) -> Result<StudyData, StudyError> {
        let existing = self
            .store
            .read_document(key)
            .await
            .map_err(|error| StudyError::remote_read(&error))?;
        if let Some(document) = existing {
            return Ok(document.into_study_data());
        }

        let initial = StudyDocument::initial();
        self.store
            .create_document(key, &initial)
            .await
            .map_err(|error| StudyError::remote_write(&error))?;
        tracing::info!(identity = key, "created default study document");
        Ok(initial.into_study_data())
    }

    /// Follows `provider`'s identity, replacing any previous watch.
    pub fn watch_identity<P>(&self, provider: &P) -> Result<(), StudyError>
    where
        P: IdentityProvider + ?Sized,
    {
        let mut active = self
            .active_watch
            .lock()
            .map_err(|error| StudyError::Internal(format!("watch lock poisoned: {error}")))?;
        if let Some(previous) = active.take() {
            previous.cancel();
            tracing::debug!("previous identity watch cancelled");
        }

        let receiver = provider.current_identity();
        let token = CancellationToken::new();
        let task = tokio::spawn(self.clone().run_watch(receiver, token.clone()));
        *active = Some(WatchHandle { token, _task: task });
        Ok(())
    }

    pub fn stop_watching(&self) -> Result<(), StudyError> {
        let mut active = self
            .active_watch
            .lock()
            .map_err(|error| StudyError::Internal(format!("watch lock poisoned: {error}")))?;
        if let Some(handle) = active.take() {
            handle.cancel();
        }
        Ok(())
    }

    async fn run_watch(self, mut receiver: watch::Receiver<Option<Identity>>, token: CancellationToken) {
        let mut in_flight: Option<CancellationToken> = None;
        let mut identity = receiver.borrow_and_update().clone();
        loop {
            if let Some(previous) = in_flight.take() {
                previous.cancel();
            }
            if token.is_cancelled() {
                break;
            }
            match self.state.begin(identity.clone()) {
                Ok(generation) => match identity {
                    Some(identity) => {
                        let load_token = token.child_token();
                        in_flight = Some(load_token.clone());
                        let coordinator = self.clone();
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = load_token.cancelled() => {}
                                result = coordinator.load(generation, identity) => {
                                    if let Err(error) = result {
                                        tracing::error!(error = %error, "identity load aborted");
                                    }
                                }
                            }
                        });
                    }
                    None => tracing::info!(generation, "identity absent; study data cleared"),
                },
                Err(error) => {
                    tracing::error!(error = %error, "identity transition failed");
                }
            }

            tokio::select! {
                _ = token.cancelled() => break,
                changed = receiver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    identity = receiver.borrow_and_update().clone();
                }
            }
        }
        tracing::debug!("identity watch stopped");
    }
}
