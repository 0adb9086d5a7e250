//! Typed reading of the denormalized visit extract.
//!
//! Column presence is checked once against the header, so a missing required
//! column stops the run before any row is processed.

use std::{fs::File, io, path::Path};

use anyhow::{Context, Result};
use csv::StringRecord;
use serde::Deserialize;
use thiserror::Error;

/// Columns every extract must carry.
pub const REQUIRED_COLUMNS: [&str; 30] = [
    "patient_id",
    "patient_first_name",
    "patient_last_name",
    "patient_date_of_birth",
    "patient_gender",
    "patient_address_line1",
    "patient_address_line2",
    "patient_city",
    "patient_state",
    "patient_zip",
    "patient_phone",
    "patient_email",
    "insurance_id",
    "insurance_payer_name",
    "insurance_policy_number",
    "insurance_group_number",
    "insurance_plan_type",
    "billing_id",
    "billing_amount_paid",
    "billing_total_charge",
    "billing_date",
    "billing_payment_status",
    "doctor_name",
    "doctor_title",
    "doctor_department",
    "clinic_name",
    "room_number",
    "visit_id",
    "visit_datetime",
    "visit_type",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("failed reading input header")]
    Header(#[source] csv::Error),
    #[error("failed reading input data row {row}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },
}

/// One row of the extract. Diagnosis, treatment, prescription and lab order
/// columns are optional and read as empty when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRow {
    pub patient_id: String,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_date_of_birth: String,
    pub patient_gender: String,
    pub patient_address_line1: String,
    pub patient_address_line2: String,
    pub patient_city: String,
    pub patient_state: String,
    pub patient_zip: String,
    pub patient_phone: String,
    pub patient_email: String,

    pub insurance_id: String,
    pub insurance_payer_name: String,
    pub insurance_policy_number: String,
    pub insurance_group_number: String,
    pub insurance_plan_type: String,

    pub billing_id: String,
    pub billing_amount_paid: String,
    pub billing_total_charge: String,
    pub billing_date: String,
    pub billing_payment_status: String,

    pub doctor_name: String,
    pub doctor_title: String,
    pub doctor_department: String,

    pub clinic_name: String,
    pub room_number: String,

    #[serde(default)]
    pub primary_diagnosis_code: String,
    #[serde(default)]
    pub primary_diagnosis_desc: String,
    #[serde(default)]
    pub secondary_diagnosis_code: String,
    #[serde(default)]
    pub secondary_diagnosis_desc: String,
    #[serde(default)]
    pub treatment_code: String,
    #[serde(default)]
    pub treatment_desc: String,

    #[serde(default)]
    pub prescription_id: String,
    #[serde(default)]
    pub prescription_drug_name: String,
    #[serde(default)]
    pub prescription_dosage: String,
    #[serde(default)]
    pub prescription_frequency: String,
    #[serde(default)]
    pub prescription_duration_days: String,

    #[serde(default)]
    pub lab_order_id: String,
    #[serde(default)]
    pub lab_test_code: String,
    #[serde(default)]
    pub lab_name: String,
    #[serde(default)]
    pub lab_result_value: String,
    #[serde(default)]
    pub lab_result_units: String,
    #[serde(default)]
    pub lab_result_date: String,

    pub visit_id: String,
    pub visit_datetime: String,
    pub visit_type: String,
}

/// Returns the required columns absent from `headers`, in declaration order.
pub fn missing_required_columns(headers: &StringRecord) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == **required))
        .map(|required| (*required).to_string())
        .collect()
}

/// Reads the extract in caller-sized batches, preserving input order.
///
/// Rows may stop short of the header; trailing optional fields then read as
/// empty, while a short row missing a required field is a row error.
pub struct SourceReader<R: io::Read> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    record: StringRecord,
    rows_read: usize,
}

impl SourceReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed opening input CSV {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed validating input CSV {}", path.display()))
    }
}

impl<R: io::Read> SourceReader<R> {
    pub fn from_reader(inner: R) -> Result<Self, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(inner);
        let headers = reader.headers().map_err(IngestError::Header)?.clone();

        let missing = missing_required_columns(&headers);
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            rows_read: 0,
        })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Reads up to `batch_size` rows. An empty batch means the input is exhausted.
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Vec<SourceRow>, IngestError> {
        let batch_size = batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            let row_number = self.rows_read + 1;
            let has_record = self
                .reader
                .read_record(&mut self.record)
                .map_err(|source| IngestError::Row {
                    row: row_number,
                    source,
                })?;
            if !has_record {
                break;
            }
            let row: SourceRow = self
                .record
                .deserialize(Some(&self.headers))
                .map_err(|source| IngestError::Row {
                    row: row_number,
                    source,
                })?;
            self.rows_read += 1;
            batch.push(row);
        }
        Ok(batch)
    }
}
