use crate::dispatch::{dispatch, DispatchReport};
use crate::gateway::CallGateway;
use crate::model::{format_date, AttendanceRecord, Student, SubmissionOutcome};
use crate::reconcile::{absentees, reconcile, unknown_rolls};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

pub trait RosterStore {
    fn list_students(&self) -> anyhow::Result<Vec<Student>>;
}

pub trait AttendanceLedger {
    /// Writes all rows in one batch. A row whose (student_roll, date) already
    /// exists has its status and reason overwritten; its transcript is kept.
    fn upsert_records(&self, records: &[AttendanceRecord]) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("roster unavailable: {0}")]
    RosterUnavailable(String),

    #[error("attendance ledger write failed: {0}")]
    LedgerWriteFailure(String),
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::RosterUnavailable(_) => "roster_unavailable",
            SubmitError::LedgerWriteFailure(_) => "ledger_write_failed",
        }
    }
}

pub struct Submission<'a> {
    pub roster: &'a dyn RosterStore,
    pub ledger: &'a dyn AttendanceLedger,
    pub gateway: &'a dyn CallGateway,
    pub max_in_flight: usize,
}

impl Submission<'_> {
    /// Records the day's attendance, then asks the gateway to call every absentee.
    ///
    /// Nothing is dialled unless the ledger write succeeded. Dispatch failures
    /// do not fail the submission; they come back in
    /// `calls_failed_to_dispatch`, in roster order.
    pub fn submit(
        &self,
        present_rolls: &HashSet<String>,
        date: NaiveDate,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let roster = self
            .roster
            .list_students()
            .map_err(|e| SubmitError::RosterUnavailable(format!("{e:#}")))?;
        info!(
            date = %format_date(date),
            roster = roster.len(),
            present = present_rolls.len(),
            "reconciling attendance"
        );

        let ignored = unknown_rolls(&roster, present_rolls);
        if !ignored.is_empty() {
            warn!(rolls = ?ignored, "ignoring present rolls missing from roster");
        }

        let records = reconcile(&roster, present_rolls, date);
        self.ledger
            .upsert_records(&records)
            .map_err(|e| SubmitError::LedgerWriteFailure(format!("{e:#}")))?;
        info!(rows = records.len(), "attendance ledger updated");

        let absent = absentees(&roster, &records);
        let report = dispatch(self.gateway, &absent, self.max_in_flight);
        Ok(outcome(&absent, &report))
    }
}

fn outcome(absent: &[&Student], report: &DispatchReport) -> SubmissionOutcome {
    SubmissionOutcome {
        date_persisted: true,
        calls_attempted: report.attempted(),
        calls_failed_to_dispatch: absent
            .iter()
            .filter(|s| report.failed.contains(&s.roll))
            .map(|s| s.roll.clone())
            .collect(),
    }
}
