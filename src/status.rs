//! Patient activity status, derived once every visit has been seen.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::constants::ACTIVE_SINCE;
use crate::registry::NaturalRegistry;
use crate::schema::{Patient, PatientStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub active: usize,
    pub inactive: usize,
}

pub fn default_active_since() -> NaiveDateTime {
    let (year, month, day) = ACTIVE_SINCE;
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Active iff at least one parsed visit falls on or after `active_since`.
pub fn status_for(visits: &[NaiveDateTime], active_since: NaiveDateTime) -> PatientStatus {
    if visits.iter().any(|visited_at| *visited_at >= active_since) {
        PatientStatus::Active
    } else {
        PatientStatus::Inactive
    }
}

/// Sets the status of every registered patient. Patients without any parsed
/// visit timestamp are `Inactive`.
pub fn resolve_statuses(
    patients: &mut NaturalRegistry<Patient>,
    visit_history: &HashMap<String, Vec<NaiveDateTime>>,
    active_since: NaiveDateTime,
) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for patient in patients.iter_mut() {
        let status = visit_history
            .get(&patient.patient_id)
            .map_or(PatientStatus::Inactive, |visits| status_for(visits, active_since));
        patient.status = Some(status);
        match status {
            PatientStatus::Active => summary.active += 1,
            PatientStatus::Inactive => summary.inactive += 1,
        }
    }
    tracing::info!(
        active = summary.active,
        inactive = summary.inactive,
        "Updated patient statuses from visits on or after {}",
        active_since.date()
    );
    summary
}
