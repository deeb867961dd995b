use crate::error::{AppError, Result};
use crate::models::{ApplicantRecord, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Zero-mean, unit-variance scaling with statistics frozen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    /// Fit on a (n_samples × n_columns) matrix. Population variance, as the
    /// scaler is applied to the same population it was fit on.
    pub fn fit(values: &Array2<f64>) -> Result<Self> {
        if values.nrows() == 0 {
            return Err(AppError::Processing(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        let n = values.nrows() as f64;
        let means = values.sum_axis(ndarray::Axis(0)) / n;
        let centered = values - &means;
        let variances = centered.mapv(|v| v * v).sum_axis(ndarray::Axis(0)) / n;

        // Constant columns keep their centered value instead of dividing by zero
        let scales = variances.mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });

        Ok(Self { means, scales })
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Array1<f64>> {
        if row.len() != self.means.len() {
            return Err(AppError::Processing(format!(
                "scaler expects {} values, got {}",
                self.means.len(),
                row.len()
            )));
        }
        Ok((Array1::from_vec(row.to_vec()) - &self.means) / &self.scales)
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }
}

/// Indicator encoding over the categories seen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted categories per column
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit<'a, I>(rows: I, n_columns: usize) -> Self
    where
        I: IntoIterator<Item = Vec<&'a str>>,
    {
        let mut seen: Vec<BTreeSet<String>> = vec![BTreeSet::new(); n_columns];
        for row in rows {
            for (set, value) in seen.iter_mut().zip(row) {
                set.insert(value.to_string());
            }
        }

        Self {
            categories: seen.into_iter().map(|s| s.into_iter().collect()).collect(),
        }
    }

    /// Total indicator width across all columns
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Encode one row into `out`. Unseen values leave their block all-zero.
    fn encode_into(&self, row: &[&str], out: &mut [f64]) {
        let mut offset = 0;
        for (categories, value) in self.categories.iter().zip(row) {
            if let Ok(idx) = categories.binary_search_by(|c| c.as_str().cmp(*value)) {
                out[offset + idx] = 1.0;
            }
            offset += categories.len();
        }
    }
}

/// Column-wise preprocessing of applicant records.
///
/// Output layout is fixed once fitted:
/// `[scaled numerics | one-hot blocks in column order | passthrough columns]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    scaler: Option<StandardScaler>,
    encoder: Option<OneHotEncoder>,

    /// Extra numeric columns passed through unchanged, sorted by name
    passthrough: Vec<String>,

    n_features: usize,
    is_fitted: bool,
}

impl Default for ColumnTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self {
            scaler: None,
            encoder: None,
            passthrough: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Fit scaler and encoder on the training records only
    pub fn fit(&mut self, records: &[ApplicantRecord]) -> Result<()> {
        let first = records.first().ok_or_else(|| {
            AppError::Processing("cannot fit transform on an empty record set".to_string())
        })?;

        let passthrough: Vec<String> = first.extra.keys().cloned().collect();

        let numeric: Vec<f64> = records
            .iter()
            .flat_map(|r| r.numeric_values())
            .collect();
        let numeric = Array2::from_shape_vec((records.len(), NUMERIC_COLUMNS.len()), numeric)?;

        let scaler = StandardScaler::fit(&numeric)?;
        let encoder = OneHotEncoder::fit(
            records.iter().map(|r| r.categorical_values().to_vec()),
            CATEGORICAL_COLUMNS.len(),
        );

        self.n_features = NUMERIC_COLUMNS.len() + encoder.width() + passthrough.len();
        self.scaler = Some(scaler);
        self.encoder = Some(encoder);
        self.passthrough = passthrough;
        self.is_fitted = true;

        // Every training record must carry the same passthrough columns
        for record in records {
            self.passthrough_values(record)?;
        }

        Ok(())
    }

    /// Transform a single record into a feature vector
    pub fn transform_one(&self, record: &ApplicantRecord) -> Result<Array1<f64>> {
        let (scaler, encoder) = self.fitted_parts()?;

        let mut features = Array1::zeros(self.n_features);
        let scaled = scaler.transform_row(&record.numeric_values())?;
        let n_numeric = scaled.len();
        features
            .slice_mut(ndarray::s![..n_numeric])
            .assign(&scaled);

        let onehot_end = n_numeric + encoder.width();
        if let Some(out) = features
            .slice_mut(ndarray::s![n_numeric..onehot_end])
            .as_slice_mut()
        {
            encoder.encode_into(&record.categorical_values(), out);
        }

        for (offset, value) in self.passthrough_values(record)?.into_iter().enumerate() {
            features[onehot_end + offset] = value;
        }

        Ok(features)
    }

    /// Transform a batch of records into a (n_records × n_features) matrix
    pub fn transform(&self, records: &[ApplicantRecord]) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((records.len(), self.n_features()));
        for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
            row.assign(&self.transform_one(record)?);
        }
        Ok(matrix)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, records: &[ApplicantRecord]) -> Result<Array2<f64>> {
        self.fit(records)?;
        self.transform(records)
    }

    /// Output column names, e.g. `umur` or `pekerjaan=PNS`
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        if let Some(encoder) = &self.encoder {
            for (column, categories) in CATEGORICAL_COLUMNS.iter().zip(encoder.categories()) {
                names.extend(categories.iter().map(|c| format!("{column}={c}")));
            }
        }
        names.extend(self.passthrough.iter().cloned());
        names
    }

    pub fn passthrough_columns(&self) -> &[String] {
        &self.passthrough
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn fitted_parts(&self) -> Result<(&StandardScaler, &OneHotEncoder)> {
        match (&self.scaler, &self.encoder) {
            (Some(scaler), Some(encoder)) if self.is_fitted => Ok((scaler, encoder)),
            _ => Err(AppError::Processing(
                "ColumnTransformer must be fitted before transform".to_string(),
            )),
        }
    }

    fn passthrough_values(&self, record: &ApplicantRecord) -> Result<Vec<f64>> {
        self.passthrough
            .iter()
            .map(|column| {
                record.extra.get(column).copied().ok_or_else(|| {
                    AppError::Processing(format!("missing passthrough column '{column}'"))
                })
            })
            .collect()
    }
}
