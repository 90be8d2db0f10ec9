use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    DesignJobId, DesignJobStatus, DesignRequirements, DesignResult, EquipmentSelections,
    LocationContext, PerformanceEstimates,
};

/// Why a job ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoCompatibleEquipment,
    Simulation,
    Calculation,
    Timeout,
    Cancelled,
}

impl FailureKind {
    pub const fn label(self) -> &'static str {
        match self {
            FailureKind::NoCompatibleEquipment => "no_compatible_equipment",
            FailureKind::Simulation => "simulation",
            FailureKind::Calculation => "calculation",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// Terminal outcome of a job. A job carries either a completed design or a
/// failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed {
        design_result: DesignResult,
        performance_estimates: PerformanceEstimates,
    },
    Failed {
        failure: FailureKind,
        message: String,
    },
}

/// Full persisted state of a design job.
///
/// Transitions only move forward: pending to processing to one of the two
/// terminal states. The mutation methods refuse to leave a terminal state so
/// late writers cannot resurrect a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignJobRecord {
    pub id: DesignJobId,
    pub status: DesignJobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub requirements: DesignRequirements,
    pub location_context: LocationContext,
    pub equipment_selections: Option<EquipmentSelections>,
    pub outcome: Option<JobOutcome>,
    pub confidence_score: Option<u8>,
    #[serde(default)]
    pub cancel_requested: bool,
}

impl DesignJobRecord {
    pub fn new(
        id: DesignJobId,
        requirements: DesignRequirements,
        location_context: LocationContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: DesignJobStatus::Pending,
            created_at: now,
            updated_at: now,
            requirements,
            location_context,
            equipment_selections: None,
            outcome: None,
            confidence_score: None,
            cancel_requested: false,
        }
    }

    pub fn begin_processing(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != DesignJobStatus::Pending {
            return false;
        }
        self.status = DesignJobStatus::Processing;
        self.updated_at = now;
        true
    }

    pub fn record_selection(&mut self, selections: EquipmentSelections, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.equipment_selections = Some(selections);
        self.updated_at = now;
        true
    }

    pub fn complete(
        &mut self,
        design_result: DesignResult,
        performance_estimates: PerformanceEstimates,
        confidence_score: u8,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = DesignJobStatus::Completed;
        self.outcome = Some(JobOutcome::Completed {
            design_result,
            performance_estimates,
        });
        self.confidence_score = Some(confidence_score);
        self.updated_at = now;
        true
    }

    pub fn fail(&mut self, failure: FailureKind, message: String, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = DesignJobStatus::Failed;
        self.outcome = Some(JobOutcome::Failed { failure, message });
        self.confidence_score = None;
        self.updated_at = now;
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("design job {0} not found")]
    NotFound(DesignJobId),
    #[error("conflicting update for design job {0}")]
    Conflict(DesignJobId),
    #[error("job store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for design jobs. The orchestrator is the only writer for
/// a given job after submission; readers see whole records, never partial
/// updates.
pub trait DesignJobStore: Send + Sync {
    fn insert(&self, record: DesignJobRecord) -> Result<(), StoreError>;

    /// Replaces the stored record. A cancellation flag already set on the
    /// stored record survives the write, so a cancel request landing between
    /// a writer's read and this call is never lost.
    fn update(&self, record: DesignJobRecord) -> Result<(), StoreError>;

    fn fetch(&self, id: &DesignJobId) -> Result<Option<DesignJobRecord>, StoreError>;

    /// Newest-first page of records plus the total count across all pages.
    fn list(&self, page: usize, limit: usize) -> Result<(Vec<DesignJobRecord>, usize), StoreError>;

    /// Marks the job for cancellation and returns the updated record. Fails
    /// with `Conflict` when the job already reached a terminal state.
    fn request_cancel(&self, id: &DesignJobId) -> Result<DesignJobRecord, StoreError>;
}
