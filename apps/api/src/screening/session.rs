//! Session Orchestrator: drives upload → invoke → normalize for one resume
//! at a time and owns the session state and history.
//!
//! Every start (and every reset) bumps a generation counter. Each await point
//! re-checks the generation it started with; a reply that comes back for a
//! generation that is no longer current is discarded without touching state.
//! The state mutex is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::agent::{AgentInvoker, InvokeContext};
use crate::assets::{AssetUploader, UploadFailure, UploadOutcome};
use crate::models::file::ResumeFile;
use crate::screening::history::{HistoryEntry, HistoryLedger};
use crate::screening::normalizer::{normalize, EnvelopeView};
use crate::screening::result::ScreeningResult;

pub const NO_ASSET_IDS_MESSAGE: &str =
    "Upload succeeded but no asset IDs were returned. Please try again.";
pub const UPLOAD_FAILED_MESSAGE: &str = "File upload failed. Please try again.";
pub const INVOKE_FAILED_MESSAGE: &str =
    "Something went wrong while screening your resume. Please try again.";
pub const UNPROCESSABLE_MESSAGE: &str =
    "We could not process the screening result. Please try again.";
pub const INTERRUPTED_MESSAGE: &str =
    "The screening was interrupted before it finished. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Required credential missing. Not worth retrying until fixed.
    Configuration,
    Upload,
    Invocation,
    /// The agent answered but no result shape was recognisable.
    Normalization,
    /// The caller went away while the session was in flight.
    Interrupted,
}

/// Why a session ended in `Failed`. `message` is safe to show to the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SessionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_upload(outcome: &UploadOutcome) -> Self {
        match &outcome.error {
            Some(UploadFailure::NotConfigured) => {
                Self::new(FailureKind::Configuration, UploadFailure::NotConfigured.to_string())
            }
            Some(failure) => Self::new(FailureKind::Upload, failure.to_string()),
            None if outcome.asset_ids.is_empty() => {
                Self::new(FailureKind::Upload, NO_ASSET_IDS_MESSAGE)
            }
            None => Self::new(FailureKind::Upload, UPLOAD_FAILED_MESSAGE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Uploading,
    Screening,
    Succeeded(ScreeningResult),
    Failed(SessionFailure),
}

impl SessionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Uploading | Self::Screening)
    }
}

/// What observers see after every transition.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub state: SessionState,
    pub history_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreeningError {
    #[error("A screening is already in progress")]
    Busy,

    /// The session was reset or replaced while its network call was pending.
    #[error("Screening session {0} was superseded before it completed")]
    Superseded(u64),

    #[error(transparent)]
    Failed(#[from] SessionFailure),
}

#[derive(Debug, Default)]
struct SessionInner {
    generation: u64,
    state: SessionState,
    history: HistoryLedger,
    /// History entry currently replayed in the result view, if any.
    selected: Option<String>,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            state: self.state.clone(),
            history_len: self.history.count(),
        }
    }
}

pub struct ScreeningOrchestrator {
    uploader: Arc<dyn AssetUploader>,
    invoker: Arc<dyn AgentInvoker>,
    agent_id: String,
    instruction: String,
    inner: Mutex<SessionInner>,
    observers: watch::Sender<SessionSnapshot>,
}

impl ScreeningOrchestrator {
    pub fn new(
        uploader: Arc<dyn AssetUploader>,
        invoker: Arc<dyn AgentInvoker>,
        agent_id: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        let (observers, _) = watch::channel(SessionSnapshot::default());
        Self {
            uploader,
            invoker,
            agent_id: agent_id.into(),
            instruction: instruction.into(),
            inner: Mutex::new(SessionInner::default()),
            observers,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.observers.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Runs one screening session to completion.
    ///
    /// Ordering: the agent is only invoked after an upload with asset ids,
    /// and normalization only runs on a successful invocation.
    pub async fn start_screen(&self, file: ResumeFile) -> Result<ScreeningResult, ScreeningError> {
        let generation = self.begin()?;
        let _guard = InFlightGuard {
            orchestrator: self,
            generation,
        };
        info!(
            generation,
            "Uploading resume '{}' ({} bytes)",
            file.name,
            file.size()
        );

        let upload = self.uploader.upload(std::slice::from_ref(&file)).await;
        let Some(asset_ids) = upload.usable_asset_ids() else {
            return self.fail(generation, SessionFailure::from_upload(&upload));
        };
        let context = InvokeContext {
            assets: asset_ids.to_vec(),
        };
        self.transition(generation, SessionState::Screening)?;
        info!(generation, "Invoking agent with assets {:?}", context.assets);

        let reply = self
            .invoker
            .invoke(&self.instruction, &self.agent_id, &context)
            .await;
        if !reply.success {
            let message = reply
                .error
                .clone()
                .unwrap_or_else(|| INVOKE_FAILED_MESSAGE.to_string());
            return self.fail(generation, SessionFailure::new(FailureKind::Invocation, message));
        }

        match normalize(EnvelopeView::from(&reply)) {
            Some(result) => self.succeed(generation, result),
            None => {
                error!(
                    generation,
                    envelope = ?reply.response,
                    raw_response = ?reply.raw_response,
                    "Could not parse screening data from agent reply"
                );
                self.fail(
                    generation,
                    SessionFailure::new(FailureKind::Normalization, UNPROCESSABLE_MESSAGE),
                )
            }
        }
    }

    /// Returns to `Idle` from any state. A pending network call is not
    /// cancelled; its reply will be discarded as stale.
    pub fn reset(&self) -> SessionSnapshot {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = SessionState::Idle;
        inner.selected = None;
        info!(generation = inner.generation, "Session reset");
        self.publish(&inner)
    }

    /// Completed screenings, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.list()
    }

    /// Replays a history entry into the result view. Session state is left
    /// as it is and nothing goes over the network.
    pub fn select_history(&self, id: &str) -> Option<HistoryEntry> {
        let mut inner = self.lock();
        let entry = inner.history.get(id).cloned()?;
        inner.selected = Some(entry.id.clone());
        Some(entry)
    }

    /// The result to display: a replayed history entry if one is selected,
    /// otherwise the current session's result.
    pub fn current_result(&self) -> Option<ScreeningResult> {
        let inner = self.lock();
        if let Some(entry) = inner.selected.as_deref().and_then(|id| inner.history.get(id)) {
            return Some(entry.result.clone());
        }
        match &inner.state {
            SessionState::Succeeded(result) => Some(result.clone()),
            _ => None,
        }
    }

    fn begin(&self) -> Result<u64, ScreeningError> {
        let mut inner = self.lock();
        if inner.state.is_in_flight() {
            warn!(generation = inner.generation, "Rejected start: session in flight");
            return Err(ScreeningError::Busy);
        }
        inner.generation += 1;
        inner.state = SessionState::Uploading;
        inner.selected = None;
        self.publish(&inner);
        Ok(inner.generation)
    }

    /// Applies `next` if `generation` is still current.
    fn transition(&self, generation: u64, next: SessionState) -> Result<(), ScreeningError> {
        let mut inner = self.lock();
        if inner.generation != generation {
            info!(
                generation,
                current = inner.generation,
                "Discarding stale reply"
            );
            return Err(ScreeningError::Superseded(generation));
        }
        inner.state = next;
        self.publish(&inner);
        Ok(())
    }

    fn fail(
        &self,
        generation: u64,
        failure: SessionFailure,
    ) -> Result<ScreeningResult, ScreeningError> {
        warn!(generation, kind = ?failure.kind, "Screening failed: {}", failure.message);
        self.transition(generation, SessionState::Failed(failure.clone()))?;
        Err(ScreeningError::Failed(failure))
    }

    /// Records history before observers hear about `Succeeded`.
    fn succeed(
        &self,
        generation: u64,
        result: ScreeningResult,
    ) -> Result<ScreeningResult, ScreeningError> {
        let mut inner = self.lock();
        if inner.generation != generation {
            info!(
                generation,
                current = inner.generation,
                "Discarding stale result"
            );
            return Err(ScreeningError::Superseded(generation));
        }
        let entry_id = inner.history.record(result.clone(), Utc::now()).id.clone();
        inner.state = SessionState::Succeeded(result.clone());
        info!(generation, history_id = %entry_id, "Screening succeeded");
        self.publish(&inner);
        Ok(result)
    }

    fn publish(&self, inner: &SessionInner) -> SessionSnapshot {
        let snapshot = inner.snapshot();
        self.observers.send_replace(snapshot.clone());
        snapshot
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fails the session if `start_screen` is dropped mid-flight (client
/// disconnect, task abort). No-op once the generation has settled or moved on.
struct InFlightGuard<'a> {
    orchestrator: &'a ScreeningOrchestrator,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.orchestrator.lock();
        if inner.generation != self.generation || !inner.state.is_in_flight() {
            return;
        }
        warn!(generation = self.generation, "Screening dropped while in flight");
        inner.state = SessionState::Failed(SessionFailure::new(
            FailureKind::Interrupted,
            INTERRUPTED_MESSAGE,
        ));
        self.orchestrator.publish(&inner);
    }
}
