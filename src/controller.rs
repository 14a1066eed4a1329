//! Report download state machine.
//!
//! ```text
//! Idle ──trigger──▶ InFlight ──ok──▶ Succeeded ─┐
//!  ▲                   │                         │ trigger
//!  │ dismiss           └──err──▶ Failed ─────────┤
//!  └─────────────────────────────────┘           ▼
//!                                             InFlight
//! ```
//!
//! The InFlight guard is a compare-and-set on the state channel, so a second trigger
//! while an attempt is running is ignored rather than queued.

use crate::circuit_breaker::{create_report_circuit_breaker, ReportCircuitBreaker};
use crate::config::Config;
use crate::errors::ReportError;
use crate::models::{DownloadState, ReportRequest, SavedReport};
use crate::report_client::ReportServiceClient;
use crate::saver::ReportSaver;
use crate::store::AssessmentStore;
use chrono::Utc;
use failsafe::futures::CircuitBreaker;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Why a trigger did not start an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRejected {
    /// An attempt is already running.
    InFlight,
    /// The store holds no DoshaResult; nothing to report on.
    NoAssessment,
}

/// One started download attempt. Consumed by [`ReportController::run`].
///
/// Dropping an attempt that has not finished (never run, or its `run` future dropped
/// at any point) moves the controller to `Failed(Interrupted)`.
#[derive(Debug)]
pub struct ReportAttempt {
    pub id: Uuid,
    pub request: ReportRequest,
    state: Arc<watch::Sender<DownloadState>>,
    finished: bool,
}

impl ReportAttempt {
    /// Publishes the terminal state of this attempt.
    fn finish(mut self, next: DownloadState) {
        self.finished = true;
        self.state.send_replace(next);
    }
}

impl Drop for ReportAttempt {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let attempt_id = self.id;
        let interrupted = self.state.send_if_modified(|state| match state {
            DownloadState::InFlight { attempt_id: current, .. } if *current == attempt_id => {
                *state = DownloadState::Failed {
                    attempt_id,
                    reason: ReportError::Interrupted.to_string(),
                };
                true
            }
            _ => false,
        });
        if interrupted {
            tracing::warn!("Report attempt {} dropped before completion", attempt_id);
        }
    }
}

/// Orchestrates report generation for the current assessment.
pub struct ReportController {
    store: AssessmentStore,
    client: ReportServiceClient,
    saver: ReportSaver,
    breaker: ReportCircuitBreaker,
    state: Arc<watch::Sender<DownloadState>>,
}

impl ReportController {
    pub fn new(store: AssessmentStore, client: ReportServiceClient, saver: ReportSaver) -> Self {
        let (state, _) = watch::channel(DownloadState::Idle);
        Self {
            store,
            client,
            saver,
            breaker: create_report_circuit_breaker(),
            state: Arc::new(state),
        }
    }

    pub fn from_config(store: AssessmentStore, config: &Config) -> Result<Self, ReportError> {
        Ok(Self::new(
            store,
            ReportServiceClient::from_config(config)?,
            ReportSaver::new(config.download_dir.clone()),
        ))
    }

    pub fn state(&self) -> DownloadState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<DownloadState> {
        self.state.subscribe()
    }

    /// Starts an attempt: builds the request from the current snapshot and moves to
    /// `InFlight`. Valid from `Idle`, `Succeeded` or `Failed`.
    ///
    /// The returned attempt must be handed to [`run`](Self::run); until then the
    /// controller stays `InFlight`.
    pub fn begin(&self) -> Result<ReportAttempt, TriggerRejected> {
        let Some(request) = self.store.read().report_request() else {
            tracing::debug!("Report trigger ignored: no assessment result");
            return Err(TriggerRejected::NoAssessment);
        };

        let attempt_id = Uuid::new_v4();
        let started = self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                return false;
            }
            *state = DownloadState::InFlight {
                attempt_id,
                started_at: Utc::now(),
            };
            true
        });

        if !started {
            tracing::debug!("Report trigger ignored: attempt already in flight");
            return Err(TriggerRejected::InFlight);
        }

        tracing::info!("Report attempt {} started", attempt_id);
        Ok(ReportAttempt {
            id: attempt_id,
            request,
            state: self.state.clone(),
            finished: false,
        })
    }

    /// Drives a started attempt to `Succeeded` or `Failed` and returns that state.
    pub async fn run(&self, attempt: ReportAttempt) -> DownloadState {
        let next = match self.exchange(&attempt.request).await {
            Ok(report) => {
                tracing::info!("Report attempt {} succeeded: {}", attempt.id, report.file_name);
                DownloadState::Succeeded {
                    attempt_id: attempt.id,
                    report,
                }
            }
            Err(e) => {
                tracing::error!("Report attempt {} failed: {}", attempt.id, e);
                DownloadState::Failed {
                    attempt_id: attempt.id,
                    reason: e.to_string(),
                }
            }
        };

        attempt.finish(next.clone());
        next
    }

    /// `begin` followed by `run`.
    pub async fn trigger(&self) -> Result<DownloadState, TriggerRejected> {
        let attempt = self.begin()?;
        Ok(self.run(attempt).await)
    }

    /// Clears a `Failed` state back to `Idle`. Returns whether anything changed.
    pub fn dismiss(&self) -> bool {
        self.state.send_if_modified(|state| {
            if matches!(state, DownloadState::Failed { .. }) {
                *state = DownloadState::Idle;
                true
            } else {
                false
            }
        })
    }

    async fn exchange(&self, request: &ReportRequest) -> Result<SavedReport, ReportError> {
        let artifact = self
            .breaker
            .call(self.client.generate(request))
            .await
            .map_err(|e| match e {
                failsafe::Error::Inner(inner) => inner,
                failsafe::Error::Rejected => ReportError::Unavailable,
            })?;

        self.saver.save(&artifact).await
    }
}
