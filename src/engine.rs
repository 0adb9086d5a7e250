//! Row processing: one pass over the extract, fanning each row out to the
//! dimension registries and collecting one fact row per distinct visit.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::ingest::SourceRow;
use crate::normalize::{coerce_amount, coerce_duration_days, normalize_date, parse_visit_datetime};
use crate::registry::{KeyPresence, NaturalRegistry, SurrogateRegistry};
use crate::schema::{
    Billing, CodedEntry, Insurance, LabOrder, Location, Patient, Prescription, Provider, Table,
    TableRow, Visit,
};
use crate::status::{StatusSummary, resolve_statuses};

/// Counters collected while rows are processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub rows_seen: usize,
    pub batches: usize,
    pub duplicate_visits: usize,
    pub unparseable_visit_datetimes: usize,
}

/// Owns every registry for the lifetime of one transformation run.
pub struct TransformSession {
    active_since: NaiveDateTime,
    patients: NaturalRegistry<Patient>,
    insurances: NaturalRegistry<Insurance>,
    billings: NaturalRegistry<Billing>,
    providers: SurrogateRegistry<Provider>,
    locations: SurrogateRegistry<Location>,
    primary_diagnoses: SurrogateRegistry<CodedEntry>,
    secondary_diagnoses: SurrogateRegistry<CodedEntry>,
    treatments: SurrogateRegistry<CodedEntry>,
    prescriptions: NaturalRegistry<Prescription>,
    lab_orders: NaturalRegistry<LabOrder>,
    visits: Vec<Visit>,
    seen_visit_ids: HashSet<String>,
    visit_history: HashMap<String, Vec<NaiveDateTime>>,
    stats: SessionStats,
}

impl TransformSession {
    /// `active_since` is the cut-off the status pass compares visit timestamps to.
    pub fn new(active_since: NaiveDateTime) -> Self {
        Self {
            active_since,
            patients: NaturalRegistry::new(Table::DimPatient),
            insurances: NaturalRegistry::new(Table::DimInsurance),
            billings: NaturalRegistry::new(Table::DimBilling),
            providers: SurrogateRegistry::new(KeyPresence::All),
            locations: SurrogateRegistry::new(KeyPresence::All),
            primary_diagnoses: SurrogateRegistry::new(KeyPresence::Any),
            secondary_diagnoses: SurrogateRegistry::new(KeyPresence::Any),
            treatments: SurrogateRegistry::new(KeyPresence::Any),
            prescriptions: NaturalRegistry::new(Table::DimPrescription),
            lab_orders: NaturalRegistry::new(Table::DimLabOrder),
            visits: Vec::new(),
            seen_visit_ids: HashSet::new(),
            visit_history: HashMap::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    /// Processes rows in order. Batch boundaries carry no meaning.
    pub fn process_batch(&mut self, rows: &[SourceRow]) {
        self.stats.batches += 1;
        for row in rows {
            self.process_row(row);
        }
    }

    pub fn process_row(&mut self, row: &SourceRow) {
        self.stats.rows_seen += 1;

        if !self.seen_visit_ids.insert(row.visit_id.clone()) {
            self.stats.duplicate_visits += 1;
            return;
        }

        let patient_id = row.patient_id.as_str();
        // Known patients still go through upsert so a disagreeing row is counted.
        self.patients.upsert(patient_id, Some(patient_from_row(row)));

        match parse_visit_datetime(&row.visit_datetime) {
            Some(visited_at) => self
                .visit_history
                .entry(patient_id.to_string())
                .or_default()
                .push(visited_at),
            None => {
                self.stats.unparseable_visit_datetimes += 1;
                tracing::warn!(
                    visit_id = %row.visit_id,
                    patient_id,
                    "Could not parse visit date '{}'",
                    row.visit_datetime
                );
            }
        }

        let insurance_id = self.upsert_insurance(row);
        let billing_id = self.upsert_billing(row, insurance_id.as_deref());
        let provider_id = self.providers.resolve(
            &[&row.doctor_name, &row.doctor_title, &row.doctor_department],
            |provider_id| Provider {
                provider_id,
                name: row.doctor_name.clone(),
                title: row.doctor_title.clone(),
                department: row.doctor_department.clone(),
            },
        );
        let location_id = self.locations.resolve(
            &[&row.clinic_name, &row.room_number],
            |location_id| Location {
                location_id,
                clinic_name: row.clinic_name.clone(),
                room_number: row.room_number.clone(),
            },
        );
        let primary_diagnosis_id = resolve_coded(
            &mut self.primary_diagnoses,
            &row.primary_diagnosis_code,
            &row.primary_diagnosis_desc,
        );
        let secondary_diagnosis_id = resolve_coded(
            &mut self.secondary_diagnoses,
            &row.secondary_diagnosis_code,
            &row.secondary_diagnosis_desc,
        );
        let treatment_id =
            resolve_coded(&mut self.treatments, &row.treatment_code, &row.treatment_desc);
        let prescription_id = self.upsert_prescription(row);
        let lab_order_id = self.upsert_lab_order(row);

        self.visits.push(Visit {
            visit_id: row.visit_id.clone(),
            patient_id: row.patient_id.clone(),
            insurance_id,
            billing_id,
            provider_id,
            location_id,
            primary_diagnosis_id,
            secondary_diagnosis_id,
            treatment_id,
            prescription_id,
            lab_order_id,
            visit_datetime: row.visit_datetime.clone(),
            visit_type: row.visit_type.clone(),
        });
    }

    fn upsert_insurance(&mut self, row: &SourceRow) -> Option<String> {
        let insurance_id = non_empty(&row.insurance_id)?;
        let candidate = Insurance {
            insurance_id: insurance_id.to_string(),
            patient_id: row.patient_id.clone(),
            payer_name: row.insurance_payer_name.clone(),
            policy_number: row.insurance_policy_number.clone(),
            group_number: row.insurance_group_number.clone(),
            plan_type: row.insurance_plan_type.clone(),
        };
        self.insurances
            .upsert(insurance_id, Some(candidate))
            .then(|| insurance_id.to_string())
    }

    fn upsert_billing(&mut self, row: &SourceRow, insurance_id: Option<&str>) -> Option<String> {
        let billing_id = non_empty(&row.billing_id)?;
        let candidate = Billing {
            billing_id: billing_id.to_string(),
            insurance_id: insurance_id.map(str::to_string),
            amount_paid: coerce_amount(&row.billing_amount_paid),
            total_charge: coerce_amount(&row.billing_total_charge),
            billing_date: normalize_date(&row.billing_date),
            payment_status: row.billing_payment_status.clone(),
        };
        self.billings
            .upsert(billing_id, Some(candidate))
            .then(|| billing_id.to_string())
    }

    fn upsert_prescription(&mut self, row: &SourceRow) -> Option<String> {
        let prescription_id = non_empty(&row.prescription_id)?;
        let duration_days = coerce_duration_days(&row.prescription_duration_days);
        let has_payload = !row.prescription_drug_name.is_empty()
            || !row.prescription_dosage.is_empty()
            || !row.prescription_frequency.is_empty()
            || duration_days != 0;
        let candidate = has_payload.then(|| Prescription {
            prescription_id: prescription_id.to_string(),
            drug_name: row.prescription_drug_name.clone(),
            dosage: row.prescription_dosage.clone(),
            frequency: row.prescription_frequency.clone(),
            duration_days,
        });
        self.prescriptions
            .upsert(prescription_id, candidate)
            .then(|| prescription_id.to_string())
    }

    fn upsert_lab_order(&mut self, row: &SourceRow) -> Option<String> {
        let lab_order_id = non_empty(&row.lab_order_id)?;
        let has_payload = [
            &row.lab_test_code,
            &row.lab_name,
            &row.lab_result_value,
            &row.lab_result_units,
            &row.lab_result_date,
        ]
        .iter()
        .any(|field| !field.is_empty());
        let candidate = has_payload.then(|| LabOrder {
            lab_order_id: lab_order_id.to_string(),
            test_code: row.lab_test_code.clone(),
            lab_name: row.lab_name.clone(),
            result_value: row.lab_result_value.clone(),
            result_units: row.lab_result_units.clone(),
            result_date: normalize_date(&row.lab_result_date),
        });
        self.lab_orders
            .upsert(lab_order_id, candidate)
            .then(|| lab_order_id.to_string())
    }

    /// Resolves patient statuses and hands back the finished tables.
    pub fn finish(mut self) -> SnowflakeTables {
        let status = resolve_statuses(&mut self.patients, &self.visit_history, self.active_since);

        let conflicts = [
            (Table::DimPatient, self.patients.conflicts()),
            (Table::DimInsurance, self.insurances.conflicts()),
            (Table::DimBilling, self.billings.conflicts()),
            (Table::DimPrescription, self.prescriptions.conflicts()),
            (Table::DimLabOrder, self.lab_orders.conflicts()),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();

        SnowflakeTables {
            patients: self.patients.into_records(),
            insurances: self.insurances.into_records(),
            billings: self.billings.into_records(),
            providers: self.providers.into_records(),
            locations: self.locations.into_records(),
            primary_diagnoses: self.primary_diagnoses.into_records(),
            secondary_diagnoses: self.secondary_diagnoses.into_records(),
            treatments: self.treatments.into_records(),
            prescriptions: self.prescriptions.into_records(),
            lab_orders: self.lab_orders.into_records(),
            visits: self.visits,
            status,
            conflicts,
            stats: self.stats,
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn resolve_coded(
    registry: &mut SurrogateRegistry<CodedEntry>,
    code: &str,
    description: &str,
) -> Option<u64> {
    registry.resolve(&[code, description], |id| CodedEntry {
        id,
        code: code.to_string(),
        description: description.to_string(),
    })
}

fn patient_from_row(row: &SourceRow) -> Patient {
    Patient {
        patient_id: row.patient_id.clone(),
        first_name: row.patient_first_name.clone(),
        last_name: row.patient_last_name.clone(),
        date_of_birth: normalize_date(&row.patient_date_of_birth),
        gender: row.patient_gender.clone(),
        address_line1: row.patient_address_line1.clone(),
        address_line2: row.patient_address_line2.clone(),
        city: row.patient_city.clone(),
        state: row.patient_state.clone(),
        zip: row.patient_zip.clone(),
        phone: row.patient_phone.clone(),
        email: row.patient_email.clone(),
        status: None,
    }
}

/// Every output table, in first-seen order, after the status pass.
#[derive(Debug, Clone)]
pub struct SnowflakeTables {
    pub patients: Vec<Patient>,
    pub insurances: Vec<Insurance>,
    pub billings: Vec<Billing>,
    pub providers: Vec<Provider>,
    pub locations: Vec<Location>,
    pub primary_diagnoses: Vec<CodedEntry>,
    pub secondary_diagnoses: Vec<CodedEntry>,
    pub treatments: Vec<CodedEntry>,
    pub prescriptions: Vec<Prescription>,
    pub lab_orders: Vec<LabOrder>,
    pub visits: Vec<Visit>,
    pub status: StatusSummary,
    /// Natural-keyed tables where later rows disagreed with the first-seen record.
    pub conflicts: Vec<(Table, usize)>,
    pub stats: SessionStats,
}

impl SnowflakeTables {
    pub fn row_count(&self, table: Table) -> usize {
        match table {
            Table::DimPatient => self.patients.len(),
            Table::DimInsurance => self.insurances.len(),
            Table::DimBilling => self.billings.len(),
            Table::DimProvider => self.providers.len(),
            Table::DimLocation => self.locations.len(),
            Table::DimPrimaryDiagnosis => self.primary_diagnoses.len(),
            Table::DimSecondaryDiagnosis => self.secondary_diagnoses.len(),
            Table::DimTreatment => self.treatments.len(),
            Table::DimPrescription => self.prescriptions.len(),
            Table::DimLabOrder => self.lab_orders.len(),
            Table::FactVisit => self.visits.len(),
        }
    }

    /// Rendered rows for `table`, in its column order.
    pub fn render(&self, table: Table) -> Vec<Vec<String>> {
        match table {
            Table::DimPatient => render_all(&self.patients),
            Table::DimInsurance => render_all(&self.insurances),
            Table::DimBilling => render_all(&self.billings),
            Table::DimProvider => render_all(&self.providers),
            Table::DimLocation => render_all(&self.locations),
            Table::DimPrimaryDiagnosis => render_all(&self.primary_diagnoses),
            Table::DimSecondaryDiagnosis => render_all(&self.secondary_diagnoses),
            Table::DimTreatment => render_all(&self.treatments),
            Table::DimPrescription => render_all(&self.prescriptions),
            Table::DimLabOrder => render_all(&self.lab_orders),
            Table::FactVisit => render_all(&self.visits),
        }
    }
}

fn render_all<T: TableRow>(records: &[T]) -> Vec<Vec<String>> {
    records.iter().map(TableRow::to_record).collect()
}
