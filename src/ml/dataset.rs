use crate::error::{AppError, Result};
use crate::models::{
    ApplicantRecord, RiskClass, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS, OUTCOME_COLUMN,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Labelled applicant records, `labels[i]` belongs to `records[i]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingDataset {
    pub records: Vec<ApplicantRecord>,

    /// 1 = creditworthy, 0 = not creditworthy
    pub labels: Vec<u8>,
}

impl TrainingDataset {
    /// Read a delimited file with a header row
    pub fn load_csv(path: impl AsRef<Path>, delimiter: char) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Dataset(format!("failed to read {}: {e}", path.display()))
        })?;

        let dataset = Self::parse(&text, delimiter)?;
        let (negatives, positives) = dataset.class_counts();
        info!(
            path = %path.display(),
            rows = dataset.len(),
            positives,
            negatives,
            "Loaded training data"
        );
        Ok(dataset)
    }

    /// Parse delimited text. The first record is the header; the ten
    /// applicant columns and the outcome column are required, any other
    /// column is read as a numeric passthrough feature. Quoted fields, a
    /// leading UTF-8 BOM and blank lines are accepted.
    pub fn parse(text: &str, delimiter: char) -> Result<Self> {
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                AppError::Dataset(format!("delimiter must be a single ASCII character, got {delimiter:?}"))
            })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(text.as_bytes());

        let header = reader.headers()?.clone();
        if header.iter().all(str::is_empty) {
            return Err(AppError::Dataset("training data is empty".to_string()));
        }
        let columns = ColumnIndex::from_header(&header)?;

        let mut dataset = Self::default();
        for row in reader.records() {
            let row = row?;
            let line_no = row.position().map(|p| p.line()).unwrap_or_default();
            let fields: Vec<&str> = row.iter().collect();

            let (record, label) = columns.read_row(&fields, line_no)?;
            dataset.records.push(record);
            dataset.labels.push(label);
        }

        if dataset.is_empty() {
            return Err(AppError::Dataset(
                "training data has a header but no rows".to_string(),
            ));
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(negatives, positives)`
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        (self.labels.len() - positives, positives)
    }

    /// Split into `(train, test)` keeping the class ratio in both parts.
    ///
    /// Each class contributes `round(count * test_size)` rows to the test
    /// split, at least one and never all of them. Rows keep their original
    /// order within each split.
    pub fn stratified_split(&self, test_size: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Dataset(format!(
                "test size must be in (0, 1), got {test_size}"
            )));
        }

        let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in self.labels.iter().enumerate() {
            by_class.entry(label).or_default().push(idx);
        }
        if by_class.len() < 2 {
            return Err(AppError::Dataset(
                "stratified split needs both classes present".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut test_idx = Vec::new();
        let mut train_idx = Vec::new();

        for (label, mut indices) in by_class {
            if indices.len() < 2 {
                return Err(AppError::Dataset(format!(
                    "class {label} has only {} row(s), at least 2 are needed to split",
                    indices.len()
                )));
            }

            let n_test = ((indices.len() as f64 * test_size).round() as usize)
                .clamp(1, indices.len() - 1);

            indices.shuffle(&mut rng);
            test_idx.extend_from_slice(&indices[..n_test]);
            train_idx.extend_from_slice(&indices[n_test..]);
        }

        train_idx.sort_unstable();
        test_idx.sort_unstable();

        Ok((self.subset(&train_idx), self.subset(&test_idx)))
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Header positions of every column the loader reads
struct ColumnIndex {
    numeric: [usize; NUMERIC_COLUMNS.len()],
    categorical: [usize; CATEGORICAL_COLUMNS.len()],
    outcome: usize,
    passthrough: Vec<(String, usize)>,
}

impl ColumnIndex {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let names: Vec<&str> = header.iter().collect();

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (idx, &name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(AppError::Dataset(format!("header column {} is empty", idx + 1)));
            }
            if positions.insert(name, idx).is_some() {
                return Err(AppError::Dataset(format!("duplicate column '{name}'")));
            }
        }

        let find = |column: &str| {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| AppError::Dataset(format!("missing required column '{column}'")))
        };

        let mut numeric = [0; NUMERIC_COLUMNS.len()];
        for (slot, column) in numeric.iter_mut().zip(NUMERIC_COLUMNS) {
            *slot = find(column)?;
        }
        let mut categorical = [0; CATEGORICAL_COLUMNS.len()];
        for (slot, column) in categorical.iter_mut().zip(CATEGORICAL_COLUMNS) {
            *slot = find(column)?;
        }
        let outcome = find(OUTCOME_COLUMN)?;

        let passthrough = names
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, name)| {
                !NUMERIC_COLUMNS.contains(name)
                    && !CATEGORICAL_COLUMNS.contains(name)
                    && *name != OUTCOME_COLUMN
            })
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        Ok(Self {
            numeric,
            categorical,
            outcome,
            passthrough,
        })
    }

    fn read_row(&self, fields: &[&str], line_no: u64) -> Result<(ApplicantRecord, u8)> {
        let number = |column: &str, idx: usize| -> Result<f64> {
            fields[idx].parse::<f64>().map_err(|_| {
                AppError::Dataset(format!(
                    "line {line_no}: column '{column}' is not a number: '{}'",
                    fields[idx]
                ))
            })
        };

        let mut numeric = [0.0; NUMERIC_COLUMNS.len()];
        for ((value, column), &idx) in numeric.iter_mut().zip(NUMERIC_COLUMNS).zip(&self.numeric) {
            *value = number(column, idx)?;
        }
        let [status_pernikahan, pekerjaan, riwayat_kredit, tujuan_kredit] =
            self.categorical.map(|idx| fields[idx].to_string());

        let mut extra = BTreeMap::new();
        for (column, idx) in &self.passthrough {
            extra.insert(column.clone(), number(column, *idx)?);
        }

        let outcome = RiskClass::from_str(fields[self.outcome]).map_err(|_| {
            AppError::Dataset(format!(
                "line {line_no}: unknown outcome '{}' in column '{OUTCOME_COLUMN}'",
                fields[self.outcome]
            ))
        })?;

        let [umur, jumlah_tanggungan, jumlah_penghasilan, jumlah_tabungan, jumlah_pengajuan, tenor] =
            numeric;

        let record = ApplicantRecord {
            umur,
            jumlah_tanggungan,
            jumlah_penghasilan,
            jumlah_tabungan,
            jumlah_pengajuan,
            tenor,
            status_pernikahan,
            pekerjaan,
            riwayat_kredit,
            tujuan_kredit,
            extra,
        };
        Ok((record, outcome.creditworthy_label()))
    }
}
