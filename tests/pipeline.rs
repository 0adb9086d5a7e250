use std::collections::{HashMap, HashSet};
use std::path::Path;

use healthcare_snowflake::args::Args;
use healthcare_snowflake::ingest::REQUIRED_COLUMNS;
use healthcare_snowflake::{Table, pipeline};

const OPTIONAL_COLUMNS: [&str; 17] = [
    "primary_diagnosis_code",
    "primary_diagnosis_desc",
    "secondary_diagnosis_code",
    "secondary_diagnosis_desc",
    "treatment_code",
    "treatment_desc",
    "prescription_id",
    "prescription_drug_name",
    "prescription_dosage",
    "prescription_frequency",
    "prescription_duration_days",
    "lab_order_id",
    "lab_test_code",
    "lab_name",
    "lab_result_value",
    "lab_result_units",
    "lab_result_date",
];

type Fields<'a> = &'a [(&'a str, &'a str)];

fn write_extract(path: &Path, rows: &[Fields<'_>]) {
    let columns: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .chain(OPTIONAL_COLUMNS.iter())
        .copied()
        .collect();
    let mut writer = csv::Writer::from_path(path).expect("create extract");
    writer.write_record(&columns).expect("write header");
    for fields in rows {
        let values: HashMap<&str, &str> = fields.iter().copied().collect();
        let record: Vec<&str> = columns
            .iter()
            .map(|column| values.get(column).copied().unwrap_or(""))
            .collect();
        writer.write_record(&record).expect("write row");
    }
    writer.flush().expect("flush extract");
}

struct Output {
    headers: Vec<String>,
    rows: Vec<HashMap<String, String>>,
}

fn read_table(output_dir: &Path, table: Table) -> Output {
    let mut reader =
        csv::Reader::from_path(output_dir.join(table.file_name())).expect("open output table");
    let headers: Vec<String> = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows: Vec<HashMap<String, String>> = reader
        .records()
        .map(|record| {
            let record = record.expect("record");
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect::<HashMap<_, _>>()
        })
        .collect();
    Output { headers, rows }
}

fn run(rows: &[Fields<'_>], batch_size: usize) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let input_path = dir.path().join("legacy_healthcare_data.csv");
    write_extract(&input_path, rows);
    let output_dir = dir.path().join("output");
    let args = Args {
        input_path,
        output_dir: output_dir.clone(),
        batch_size,
    };
    pipeline::run(&args).expect("pipeline run");
    (dir, output_dir)
}

fn visit<'a>(
    patient_id: &'a str,
    visit_id: &'a str,
    visit_datetime: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("patient_id", patient_id),
        ("patient_first_name", "Ada"),
        ("patient_last_name", "Lovelace"),
        ("patient_date_of_birth", "12/10/1985"),
        ("visit_id", visit_id),
        ("visit_datetime", visit_datetime),
        ("visit_type", "Outpatient"),
    ]
}

#[test]
fn duplicate_visit_keeps_first_version_and_patient_is_active() {
    let mut v1 = visit("P1", "V1", "2022-05-01");
    v1.extend([
        ("doctor_name", "Dr. Grey"),
        ("doctor_title", "MD"),
        ("doctor_department", "Cardiology"),
    ]);
    let mut v1_duplicate = visit("P1", "V1", "2018-03-03");
    v1_duplicate.extend([
        ("visit_type", "Emergency"),
        ("doctor_name", "Dr. House"),
        ("doctor_title", "MD"),
        ("doctor_department", "Diagnostics"),
    ]);
    let v2 = visit("P1", "V2", "2019-01-01");

    let (_dir, output_dir) = run(&[v1.as_slice(), v1_duplicate.as_slice(), v2.as_slice()], 5000);

    let facts = read_table(&output_dir, Table::FactVisit);
    let ids: Vec<&str> = facts.rows.iter().map(|r| r["visit_id"].as_str()).collect();
    assert_eq!(ids, vec!["V1", "V2"]);
    assert_eq!(facts.rows[0]["visit_datetime"], "2022-05-01");
    assert_eq!(facts.rows[0]["visit_type"], "Outpatient");
    assert_eq!(facts.rows[0]["provider_id"], "1");
    assert_eq!(facts.rows[1]["provider_id"], "0");

    let providers = read_table(&output_dir, Table::DimProvider);
    assert_eq!(providers.rows.len(), 1);
    assert_eq!(providers.rows[0]["doctor_name"], "Dr. Grey");

    let patients = read_table(&output_dir, Table::DimPatient);
    assert_eq!(patients.rows.len(), 1);
    assert_eq!(patients.rows[0]["patient_id"], "P1");
    assert_eq!(patients.rows[0]["patient_status"], "Active");
    assert_eq!(patients.rows[0]["patient_date_of_birth"], "1985-12-10");
}

#[test]
fn status_follows_visits_on_or_after_2022() {
    let rows = [
        visit("P1", "V1", "2021-06-01"),
        visit("P1", "V2", "2023-01-01T10:15:00"),
        visit("P2", "V3", "2020-01-01"),
        visit("P2", "V4", "12/31/2021"),
        visit("P3", "V5", "not recorded"),
    ];
    let refs: Vec<Fields<'_>> = rows.iter().map(Vec::as_slice).collect();
    let (_dir, output_dir) = run(&refs, 2);

    let patients = read_table(&output_dir, Table::DimPatient);
    let status: HashMap<&str, &str> = patients
        .rows
        .iter()
        .map(|r| (r["patient_id"].as_str(), r["patient_status"].as_str()))
        .collect();
    assert_eq!(status["P1"], "Active");
    assert_eq!(status["P2"], "Inactive");
    assert_eq!(status["P3"], "Inactive");

    let facts = read_table(&output_dir, Table::FactVisit);
    assert_eq!(facts.rows.len(), 5);
    assert_eq!(facts.rows[4]["visit_datetime"], "not recorded");

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output_dir.join("run_summary.json")).expect("read summary"),
    )
    .expect("parse summary");
    assert_eq!(summary["patient_status"]["active"], 1);
    assert_eq!(summary["patient_status"]["inactive"], 2);
    assert_eq!(summary["unparseable_visit_datetimes"], 1);
    assert_eq!(summary["batches"], 3);
}

#[test]
fn every_table_is_written_with_its_schema_header() {
    let row = visit("P1", "V1", "2022-05-01");
    let (_dir, output_dir) = run(&[row.as_slice()], 10);

    for table in Table::ALL {
        let output = read_table(&output_dir, table);
        assert_eq!(output.headers, table.columns(), "{table}");
    }
    assert!(read_table(&output_dir, Table::DimTreatment).rows.is_empty());
}

#[test]
fn surrogate_ids_are_dense_and_follow_first_appearance() {
    let locations = [
        ("North", "101"),
        ("South", "7"),
        ("North", "101"),
        ("East", "2"),
        ("South", "7"),
    ];
    let rows: Vec<Vec<(&str, &str)>> = locations
        .iter()
        .enumerate()
        .map(|(idx, (clinic, room))| {
            let visit_id = ["V1", "V2", "V3", "V4", "V5"][idx];
            let mut row = visit("P1", visit_id, "2022-02-02");
            row.extend([("clinic_name", *clinic), ("room_number", *room)]);
            row
        })
        .collect();
    let refs: Vec<Fields<'_>> = rows.iter().map(Vec::as_slice).collect();
    let (_dir, output_dir) = run(&refs, 1);

    let dim = read_table(&output_dir, Table::DimLocation);
    let dim_rows: Vec<(&str, &str, &str)> = dim
        .rows
        .iter()
        .map(|r| {
            (
                r["location_id"].as_str(),
                r["clinic_name"].as_str(),
                r["room_number"].as_str(),
            )
        })
        .collect();
    assert_eq!(
        dim_rows,
        vec![("1", "North", "101"), ("2", "South", "7"), ("3", "East", "2")]
    );

    let facts = read_table(&output_dir, Table::FactVisit);
    let refs: Vec<&str> = facts.rows.iter().map(|r| r["location_id"].as_str()).collect();
    assert_eq!(refs, vec!["1", "2", "1", "3", "2"]);
}

#[test]
fn fact_foreign_keys_resolve_in_their_dimensions() {
    let mut a = visit("P1", "V1", "2022-01-05");
    a.extend([
        ("insurance_id", "I1"),
        ("insurance_payer_name", "Acme Health"),
        ("billing_id", "B1"),
        ("billing_amount_paid", "80"),
        ("billing_total_charge", "120.50"),
        ("billing_date", "01/06/2022"),
        ("doctor_name", "Dr. Grey"),
        ("doctor_title", "MD"),
        ("doctor_department", "Cardiology"),
        ("clinic_name", "North"),
        ("room_number", "101"),
        ("primary_diagnosis_code", "I10"),
        ("primary_diagnosis_desc", "Hypertension"),
        ("secondary_diagnosis_desc", "Obesity"),
        ("treatment_code", "T1"),
        ("prescription_id", "RX1"),
        ("prescription_drug_name", "Lisinopril"),
        ("prescription_duration_days", "30"),
        ("lab_order_id", "L1"),
        ("lab_test_code", "A1C"),
        ("lab_result_date", "2022-01-07"),
    ]);
    let mut b = visit("P2", "V2", "2021-03-03");
    b.extend([
        ("insurance_id", "I2"),
        ("billing_id", "B2"),
        ("billing_amount_paid", "abc"),
        ("prescription_id", "RX9"),
        ("lab_order_id", "L1"),
    ]);
    let c = visit("P2", "V3", "2021-04-04");

    let (_dir, output_dir) = run(&[a.as_slice(), b.as_slice(), c.as_slice()], 2);

    let key_sets: HashMap<Table, HashSet<String>> = Table::ALL
        .iter()
        .filter(|table| **table != Table::FactVisit)
        .map(|&table| {
            let output = read_table(&output_dir, table);
            let key_column = table.columns()[0];
            let keys: HashSet<String> = output
                .rows
                .iter()
                .map(|r| r[key_column].clone())
                .collect();
            (table, keys)
        })
        .collect();

    let references = [
        ("patient_id", Table::DimPatient),
        ("insurance_id", Table::DimInsurance),
        ("billing_id", Table::DimBilling),
        ("provider_id", Table::DimProvider),
        ("location_id", Table::DimLocation),
        ("primary_diagnosis_id", Table::DimPrimaryDiagnosis),
        ("secondary_diagnosis_id", Table::DimSecondaryDiagnosis),
        ("treatment_id", Table::DimTreatment),
        ("prescription_id", Table::DimPrescription),
        ("lab_order_id", Table::DimLabOrder),
    ];

    let facts = read_table(&output_dir, Table::FactVisit);
    assert_eq!(facts.rows.len(), 3);
    for fact in &facts.rows {
        for (column, table) in references {
            let value = fact[column].as_str();
            if value.is_empty() || value == "0" {
                continue;
            }
            assert!(
                key_sets[&table].contains(value),
                "{column}={value} missing from {table}"
            );
        }
    }

    // RX9 carried no attributes, so V2 does not reference it; L1 already existed.
    assert_eq!(facts.rows[1]["prescription_id"], "");
    assert_eq!(facts.rows[1]["lab_order_id"], "L1");
    assert_eq!(facts.rows[2]["insurance_id"], "");
    assert_eq!(facts.rows[2]["primary_diagnosis_id"], "");

    let billing = read_table(&output_dir, Table::DimBilling);
    assert_eq!(billing.rows[0]["billing_amount_paid"], "80.0");
    assert_eq!(billing.rows[0]["billing_total_charge"], "120.5");
    assert_eq!(billing.rows[0]["billing_date"], "2022-01-06");
    assert_eq!(billing.rows[1]["billing_amount_paid"], "0.0");
    assert_eq!(billing.rows[1]["insurance_id"], "I2");

    let prescriptions = read_table(&output_dir, Table::DimPrescription);
    assert_eq!(prescriptions.rows.len(), 1);
    assert_eq!(prescriptions.rows[0]["prescription_duration_days"], "30");
}

#[test]
fn missing_required_column_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input_path = dir.path().join("broken.csv");
    std::fs::write(&input_path, "patient_id,visit_id\nP1,V1\n").expect("write input");
    let args = Args {
        input_path,
        output_dir: dir.path().join("output"),
        batch_size: 10,
    };
    let err = pipeline::run(&args).expect_err("missing columns must fail");
    let message = format!("{err:#}");
    assert!(message.contains("visit_datetime"), "{message}");
    assert!(!dir.path().join("output").exists());
}

#[test]
fn unreadable_input_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let args = Args {
        input_path: dir.path().join("does_not_exist.csv"),
        output_dir: dir.path().join("output"),
        batch_size: 10,
    };
    let err = pipeline::run(&args).expect_err("absent input must fail");
    assert!(format!("{err:#}").contains("Failed opening input CSV"));
}
