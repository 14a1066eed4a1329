use crate::errors::AppError;
use crate::models::{AssessmentSnapshot, ReportRequest, ReportUserData};
use crate::projection::ResultsPage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// One immutable, normalized view of the current assessment.
///
/// Readers hold an `Arc<Snapshot>`, so a reader always sees the whole of one write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// The producer's payload, exactly as accepted.
    pub assessment: AssessmentSnapshot,
    /// Profile with defaults applied.
    pub user_data: ReportUserData,
    /// Display shape, present only when a DoshaResult is.
    #[serde(skip)]
    pub results: Option<ResultsPage>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn normalize(assessment: AssessmentSnapshot, updated_at: Option<DateTime<Utc>>) -> Self {
        let user_data = ReportUserData::from(&assessment.user_profile);
        let results = ResultsPage::from_assessment(&assessment, &user_data.name);
        Self {
            assessment,
            user_data,
            results,
            updated_at,
        }
    }

    fn empty() -> Self {
        Self::normalize(AssessmentSnapshot::default(), None)
    }

    pub fn has_result(&self) -> bool {
        self.assessment.dosha_results.is_some()
    }

    /// Builds the report body for this snapshot, or `None` when there is no result
    /// to report on.
    pub fn report_request(&self) -> Option<ReportRequest> {
        Some(ReportRequest {
            user_data: self.user_data.clone(),
            dosha_results: self.assessment.dosha_results.clone()?,
            panchakarma_recs: self.assessment.panchakarma_recs.clone().unwrap_or_default(),
        })
    }
}

/// Single source of truth for the session's assessment.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct AssessmentStore {
    current: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl Default for AssessmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(Arc::new(Snapshot::empty()));
        Self {
            current: Arc::new(current),
        }
    }

    /// Current snapshot. Fields may be absent if the assessment is not finished.
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.borrow().clone()
    }

    /// Validates, normalizes and swaps in a new snapshot as one unit. Last write wins.
    ///
    /// An invalid snapshot is rejected and the current one stays in place.
    pub fn replace(&self, assessment: AssessmentSnapshot) -> Result<Arc<Snapshot>, AppError> {
        if let Some(dosha) = &assessment.dosha_results {
            dosha.validate().map_err(AppError::InvalidAssessment)?;
        }

        let snapshot = Arc::new(Snapshot::normalize(assessment, Some(Utc::now())));
        self.current.send_replace(snapshot.clone());

        tracing::info!(
            "Assessment snapshot replaced (result present: {}, therapies: {})",
            snapshot.has_result(),
            snapshot
                .assessment
                .panchakarma_recs
                .as_ref()
                .map_or(0, |r| r.therapy_details.len())
        );
        Ok(snapshot)
    }

    /// Receiver notified on every replacement.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.current.subscribe()
    }
}
