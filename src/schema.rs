//! Output tables: names, fixed column orders and the record types behind them.

use std::fmt;

use serde::Serialize;

use crate::normalize::format_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Table {
    DimPatient,
    DimInsurance,
    DimBilling,
    DimProvider,
    DimLocation,
    DimPrimaryDiagnosis,
    DimSecondaryDiagnosis,
    DimTreatment,
    DimPrescription,
    DimLabOrder,
    FactVisit,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::DimPatient,
        Table::DimInsurance,
        Table::DimBilling,
        Table::DimProvider,
        Table::DimLocation,
        Table::DimPrimaryDiagnosis,
        Table::DimSecondaryDiagnosis,
        Table::DimTreatment,
        Table::DimPrescription,
        Table::DimLabOrder,
        Table::FactVisit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::DimPatient => "DimPatient",
            Table::DimInsurance => "DimInsurance",
            Table::DimBilling => "DimBilling",
            Table::DimProvider => "DimProvider",
            Table::DimLocation => "DimLocation",
            Table::DimPrimaryDiagnosis => "DimPrimaryDiagnosis",
            Table::DimSecondaryDiagnosis => "DimSecondaryDiagnosis",
            Table::DimTreatment => "DimTreatment",
            Table::DimPrescription => "DimPrescription",
            Table::DimLabOrder => "DimLabOrder",
            Table::FactVisit => "FactVisit",
        }
    }

    /// Header row for the table. Order is part of the output contract.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::DimPatient => &[
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
                "patient_status",
            ],
            Table::DimInsurance => &[
                "insurance_id",
                "patient_id",
                "insurance_payer_name",
                "insurance_policy_number",
                "insurance_group_number",
                "insurance_plan_type",
            ],
            Table::DimBilling => &[
                "billing_id",
                "insurance_id",
                "billing_amount_paid",
                "billing_total_charge",
                "billing_date",
                "billing_payment_status",
            ],
            Table::DimProvider => &[
                "provider_id",
                "doctor_name",
                "doctor_title",
                "doctor_department",
            ],
            Table::DimLocation => &["location_id", "clinic_name", "room_number"],
            Table::DimPrimaryDiagnosis => &[
                "primary_diagnosis_id",
                "primary_diagnosis_code",
                "primary_diagnosis_desc",
            ],
            Table::DimSecondaryDiagnosis => &[
                "secondary_diagnosis_id",
                "secondary_diagnosis_code",
                "secondary_diagnosis_desc",
            ],
            Table::DimTreatment => &["treatment_id", "treatment_code", "treatment_desc"],
            Table::DimPrescription => &[
                "prescription_id",
                "prescription_drug_name",
                "prescription_dosage",
                "prescription_frequency",
                "prescription_duration_days",
            ],
            Table::DimLabOrder => &[
                "lab_order_id",
                "lab_test_code",
                "lab_name",
                "lab_result_value",
                "lab_result_units",
                "lab_result_date",
            ],
            Table::FactVisit => &[
                "visit_id",
                "patient_id",
                "insurance_id",
                "billing_id",
                "provider_id",
                "location_id",
                "primary_diagnosis_id",
                "secondary_diagnosis_id",
                "treatment_id",
                "prescription_id",
                "lab_order_id",
                "visit_datetime",
                "visit_type",
            ],
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record that renders to one output row, in its table's column order.
pub trait TableRow {
    fn to_record(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatientStatus {
    Active,
    Inactive,
}

impl PatientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Active => "Active",
            PatientStatus::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub email: String,
    /// `None` until the status pass has run.
    pub status: Option<PatientStatus>,
}

impl TableRow for Patient {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.patient_id.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.date_of_birth.clone(),
            self.gender.clone(),
            self.address_line1.clone(),
            self.address_line2.clone(),
            self.city.clone(),
            self.state.clone(),
            self.zip.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.status.map(PatientStatus::as_str).unwrap_or("").to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insurance {
    pub insurance_id: String,
    pub patient_id: String,
    pub payer_name: String,
    pub policy_number: String,
    pub group_number: String,
    pub plan_type: String,
}

impl TableRow for Insurance {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.insurance_id.clone(),
            self.patient_id.clone(),
            self.payer_name.clone(),
            self.policy_number.clone(),
            self.group_number.clone(),
            self.plan_type.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Billing {
    pub billing_id: String,
    pub insurance_id: Option<String>,
    pub amount_paid: f64,
    pub total_charge: f64,
    pub billing_date: String,
    pub payment_status: String,
}

impl TableRow for Billing {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.billing_id.clone(),
            self.insurance_id.clone().unwrap_or_default(),
            format_amount(self.amount_paid),
            format_amount(self.total_charge),
            self.billing_date.clone(),
            self.payment_status.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub provider_id: u64,
    pub name: String,
    pub title: String,
    pub department: String,
}

impl TableRow for Provider {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.provider_id.to_string(),
            self.name.clone(),
            self.title.clone(),
            self.department.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub location_id: u64,
    pub clinic_name: String,
    pub room_number: String,
}

impl TableRow for Location {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.location_id.to_string(),
            self.clinic_name.clone(),
            self.room_number.clone(),
        ]
    }
}

/// Shared shape of the primary diagnosis, secondary diagnosis and treatment tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CodedEntry {
    pub id: u64,
    pub code: String,
    pub description: String,
}

impl TableRow for CodedEntry {
    fn to_record(&self) -> Vec<String> {
        vec![self.id.to_string(), self.code.clone(), self.description.clone()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prescription {
    pub prescription_id: String,
    pub drug_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
}

impl TableRow for Prescription {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.prescription_id.clone(),
            self.drug_name.clone(),
            self.dosage.clone(),
            self.frequency.clone(),
            self.duration_days.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabOrder {
    pub lab_order_id: String,
    pub test_code: String,
    pub lab_name: String,
    pub result_value: String,
    pub result_units: String,
    pub result_date: String,
}

impl TableRow for LabOrder {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.lab_order_id.clone(),
            self.test_code.clone(),
            self.lab_name.clone(),
            self.result_value.clone(),
            self.result_units.clone(),
            self.result_date.clone(),
        ]
    }
}

/// One visit event. Unassigned references are `None` here and only turn into
/// the legacy `0` / empty sentinels when rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub visit_id: String,
    pub patient_id: String,
    pub insurance_id: Option<String>,
    pub billing_id: Option<String>,
    pub provider_id: Option<u64>,
    pub location_id: Option<u64>,
    pub primary_diagnosis_id: Option<u64>,
    pub secondary_diagnosis_id: Option<u64>,
    pub treatment_id: Option<u64>,
    pub prescription_id: Option<String>,
    pub lab_order_id: Option<String>,
    pub visit_datetime: String,
    pub visit_type: String,
}

/// Provider and location render unassigned as `0`.
fn zero_sentinel(id: Option<u64>) -> String {
    id.unwrap_or(0).to_string()
}

/// Diagnoses and treatment render unassigned as an empty cell.
fn blank_sentinel(id: Option<u64>) -> String {
    id.map(|value| value.to_string()).unwrap_or_default()
}

impl TableRow for Visit {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.visit_id.clone(),
            self.patient_id.clone(),
            self.insurance_id.clone().unwrap_or_default(),
            self.billing_id.clone().unwrap_or_default(),
            zero_sentinel(self.provider_id),
            zero_sentinel(self.location_id),
            blank_sentinel(self.primary_diagnosis_id),
            blank_sentinel(self.secondary_diagnosis_id),
            blank_sentinel(self.treatment_id),
            self.prescription_id.clone().unwrap_or_default(),
            self.lab_order_id.clone().unwrap_or_default(),
            self.visit_datetime.clone(),
            self.visit_type.clone(),
        ]
    }
}
