use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Numeric columns, standardized by the transform
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "umur",
    "jumlah_tanggungan",
    "jumlah_penghasilan",
    "jumlah_tabungan",
    "jumlah_pengajuan",
    "tenor",
];

/// Categorical columns, one-hot encoded by the transform
pub const CATEGORICAL_COLUMNS: [&str; 4] = [
    "status_pernikahan",
    "pekerjaan",
    "riwayat_kredit",
    "tujuan_kredit",
];

/// Raw outcome column of the training data
pub const OUTCOME_COLUMN: &str = "hasil_klasifikasi";

/// A single applicant, keyed by the raw training-data column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub umur: f64,
    pub jumlah_tanggungan: f64,
    pub jumlah_penghasilan: f64,
    pub jumlah_tabungan: f64,
    pub jumlah_pengajuan: f64,
    pub tenor: f64,
    pub status_pernikahan: String,
    pub pekerjaan: String,
    pub riwayat_kredit: String,
    pub tujuan_kredit: String,

    /// Additional numeric columns passed through the transform unchanged
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl ApplicantRecord {
    /// Numeric fields in `NUMERIC_COLUMNS` order
    pub fn numeric_values(&self) -> [f64; 6] {
        [
            self.umur,
            self.jumlah_tanggungan,
            self.jumlah_penghasilan,
            self.jumlah_tabungan,
            self.jumlah_pengajuan,
            self.tenor,
        ]
    }

    /// Categorical fields in `CATEGORICAL_COLUMNS` order
    pub fn categorical_values(&self) -> [&str; 4] {
        [
            &self.status_pernikahan,
            &self.pekerjaan,
            &self.riwayat_kredit,
            &self.tujuan_kredit,
        ]
    }

    /// Build a record from a single JSON object.
    ///
    /// The object must hold exactly the ten applicant fields plus the given
    /// passthrough columns. Numeric fields must be JSON numbers and categorical
    /// fields JSON strings; anything else is rejected before it reaches the
    /// transform.
    pub fn from_json(value: &Value, passthrough: &[String]) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            AppError::Validation(format!("expected a JSON object, got {}", json_kind(value)))
        })?;

        let unexpected: Vec<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|key| {
                !NUMERIC_COLUMNS.contains(key)
                    && !CATEGORICAL_COLUMNS.contains(key)
                    && !passthrough.iter().any(|p| p == key)
            })
            .collect();
        if !unexpected.is_empty() {
            return Err(AppError::Validation(format!(
                "unexpected fields: {}",
                unexpected.join(", ")
            )));
        }

        let mut extra = BTreeMap::new();
        for column in passthrough {
            extra.insert(column.clone(), number_field(object, column)?);
        }

        Ok(Self {
            umur: number_field(object, "umur")?,
            jumlah_tanggungan: number_field(object, "jumlah_tanggungan")?,
            jumlah_penghasilan: number_field(object, "jumlah_penghasilan")?,
            jumlah_tabungan: number_field(object, "jumlah_tabungan")?,
            jumlah_pengajuan: number_field(object, "jumlah_pengajuan")?,
            tenor: number_field(object, "tenor")?,
            status_pernikahan: string_field(object, "status_pernikahan")?,
            pekerjaan: string_field(object, "pekerjaan")?,
            riwayat_kredit: string_field(object, "riwayat_kredit")?,
            tujuan_kredit: string_field(object, "tujuan_kredit")?,
            extra,
        })
    }
}

fn number_field(object: &Map<String, Value>, name: &str) -> Result<f64> {
    match object.get(name) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| AppError::Validation(format!("field '{name}' is not representable as f64"))),
        Some(other) => Err(AppError::Validation(format!(
            "field '{name}' must be a number, got {}",
            json_kind(other)
        ))),
        None => Err(AppError::Validation(format!("missing field '{name}'"))),
    }
}

fn string_field(object: &Map<String, Value>, name: &str) -> Result<String> {
    match object.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AppError::Validation(format!(
            "field '{name}' must be a string, got {}",
            json_kind(other)
        ))),
        None => Err(AppError::Validation(format!("missing field '{name}'"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Three-way risk outcome recorded in the historical data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

impl RiskClass {
    /// Binary training target: Low and Medium risk are creditworthy (1), High is not (0)
    pub fn creditworthy_label(&self) -> u8 {
        match self {
            RiskClass::Low | RiskClass::Medium => 1,
            RiskClass::High => 0,
        }
    }
}
