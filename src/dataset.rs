//! In-memory numeric tables: loading, min-max normalization and exemplar
//! (one-hot target) encoding.
use crate::config::ExemplarOptions;
use crate::error::{Error, Result};
use crate::persistence::write_atomically;
use csv::{ReaderBuilder, Trim};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Original range of a normalized column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScale {
    pub min: f64,
    pub max: f64,
}

/// Ordered records of equal width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    rows: Vec<Vec<f64>>,
    columns: usize,
    scales: Vec<Option<ColumnScale>>,
}

impl Dataset {
    /// Load a delimited numeric table (comma, tab or space separated).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let delimiter = sniff_delimiter(&text);
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let row = record
                .iter()
                .filter(|field| !field.is_empty())
                .map(|field| match field.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    Ok(_) => Err(Error::format(format!(
                        "line {}: {:?} is not a finite number",
                        line, field
                    ))),
                    Err(_) => Err(Error::format(format!(
                        "line {}: cannot parse {:?} as a number",
                        line, field
                    ))),
                })
                .collect::<Result<Vec<f64>>>()?;
            if row.is_empty() {
                continue;
            }
            if let Some(first) = rows.first().map(Vec::len) {
                if row.len() != first {
                    return Err(Error::format(format!(
                        "line {}: expected {} fields, found {}",
                        line,
                        first,
                        row.len()
                    )));
                }
            }
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(Error::format(format!("{} contains no records", path.display())));
        }
        let dataset = Self::from_rows(rows)?;
        debug!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.columns(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from rows that must all have the same width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns) {
            return Err(Error::format(format!(
                "row {}: expected {} fields, found {}",
                i,
                columns,
                row.len()
            )));
        }
        Ok(Self {
            rows,
            columns,
            scales: vec![None; columns],
        })
    }

    /// Empty dataset with a fixed width, used for empty partitions.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            rows: Vec::new(),
            columns: self.columns,
            scales: self.scales.clone(),
        }
    }

    /// Dataset holding a copy of `rows`, sharing this dataset's width and scales.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows,
            columns: self.columns,
            scales: self.scales.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// Original min/max of a column normalized by [`Dataset::normalize`].
    pub fn column_scale(&self, column: usize) -> Option<ColumnScale> {
        self.scales.get(column).copied().flatten()
    }

    /// Min-max normalize the inclusive column range `[start, end]` to `[0, 1]`.
    ///
    /// A column whose values are all equal becomes all zeros.
    pub fn normalize(&mut self, start: usize, end: usize) -> Result<()> {
        if start > end || end >= self.columns {
            return Err(Error::range(format!(
                "column range [{}, {}] is invalid for {} columns",
                start, end, self.columns
            )));
        }
        if self.rows.is_empty() {
            return Ok(());
        }
        for col in start..=end {
            let (min, max) = self
                .rows
                .iter()
                .map(|r| r[col])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let span = max - min;
            for row in &mut self.rows {
                row[col] = if span > 0.0 { (row[col] - min) / span } else { 0.0 };
            }
            self.scales[col] = Some(ColumnScale { min, max });
        }
        debug!(start, end, "normalized columns");
        Ok(())
    }

    /// Replace the trailing `label_width` label column(s) with a
    /// `class_count`-wide one-hot target. Labels are class indices starting at 0.
    pub fn make_exemplar(
        &mut self,
        input_columns: usize,
        class_count: usize,
        label_width: usize,
    ) -> Result<()> {
        self.make_exemplar_with(&ExemplarOptions::new(input_columns, class_count, label_width))
    }

    /// Exemplar encoding with explicit options, including a label offset for
    /// files whose classes are numbered from a value other than 0.
    ///
    /// On error the dataset is left unchanged.
    pub fn make_exemplar_with(&mut self, options: &ExemplarOptions) -> Result<()> {
        let ExemplarOptions {
            input_columns,
            class_count,
            label_width,
            label_offset,
        } = *options;
        if class_count == 0 || label_width == 0 {
            return Err(Error::range("class_count and label_width must be positive"));
        }
        if input_columns + label_width != self.columns {
            return Err(Error::range(format!(
                "{} input columns + {} label columns does not match {} columns",
                input_columns, label_width, self.columns
            )));
        }
        if label_width > 1 && label_width != class_count {
            return Err(Error::range(format!(
                "a {}-column label block cannot encode {} classes",
                label_width, class_count
            )));
        }

        let mut encoded = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let labels = &row[input_columns..];
            let class = if label_width == 1 {
                class_index(labels[0], label_offset, class_count)
                    .map_err(|msg| Error::range(format!("row {}: {}", i, msg)))?
            } else {
                argmax(labels)
            };
            let mut out = Vec::with_capacity(input_columns + class_count);
            out.extend_from_slice(&row[..input_columns]);
            out.extend((0..class_count).map(|c| if c == class { 1.0 } else { 0.0 }));
            encoded.push(out);
        }

        self.rows = encoded;
        self.columns = input_columns + class_count;
        self.scales.truncate(input_columns);
        self.scales.resize(self.columns, None);
        Ok(())
    }

    /// Reorder records with a seeded Fisher-Yates shuffle.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.rows.shuffle(&mut rng);
    }

    /// Write the table space-delimited with `precision` decimals per value.
    /// The file is replaced atomically.
    pub fn save(&self, path: impl AsRef<Path>, precision: usize) -> Result<()> {
        let mut text = String::new();
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|v| format!("{:.*}", precision, v)).collect();
            text.push_str(&line.join(" "));
            text.push('\n');
        }
        write_atomically(path.as_ref(), text.as_bytes())
    }
}

fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains(',') {
        b','
    } else if first.contains('\t') {
        b'\t'
    } else {
        b' '
    }
}

fn class_index(label: f64, offset: i64, class_count: usize) -> std::result::Result<usize, String> {
    if !label.is_finite() || label.fract() != 0.0 {
        return Err(format!("label {} is not an integer", label));
    }
    let classes = i64::try_from(class_count).unwrap_or(i64::MAX);
    // Casting saturates, so huge labels must be rejected before subtracting.
    let index = (label >= i64::MIN as f64 && label < i64::MAX as f64)
        .then(|| (label as i64).checked_sub(offset))
        .flatten()
        .filter(|i| (0..classes).contains(i));
    match index {
        Some(i) => Ok(i as usize),
        None => Err(format!(
            "label {} is outside [{}, {})",
            label,
            offset,
            offset.saturating_add(classes)
        )),
    }
}

/// Index of the largest value; the lowest index wins ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0usize, |best, (i, &v)| if v > values[best] { i } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_space_delimited_with_blank_lines() {
        let file = write_temp("5.1 3.5  1.4 0.2 1\n\n4.9 3.0 1.4 0.2 2\n");
        let data = Dataset::load(file.path()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.columns(), 5);
        assert_eq!(data.row(1).unwrap(), &[4.9, 3.0, 1.4, 0.2, 2.0]);
    }

    #[test]
    fn test_load_comma_and_tab() {
        let comma = write_temp("1,2,3\n4, 5, 6\n");
        assert_eq!(Dataset::load(comma.path()).unwrap().columns(), 3);
        let tab = write_temp("1\t2\n3\t4\n");
        assert_eq!(Dataset::load(tab.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let file = write_temp("1 2 3\n4 5\n");
        let err = Dataset::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Format(ref m) if m.contains("line 2")));
    }

    #[test]
    fn test_load_rejects_text_fields() {
        let file = write_temp("1 2 setosa\n");
        assert!(matches!(Dataset::load(file.path()), Err(Error::Format(_))));
    }

    #[test]
    fn test_load_rejects_non_finite_fields() {
        for contents in ["1 inf 0\n2 3 1\n", "1 2 0\nNaN 4 0\n", "-inf,1\n"] {
            let file = write_temp(contents);
            let err = Dataset::load(file.path()).unwrap_err();
            assert!(matches!(err, Error::Format(ref m) if m.contains("line")));
        }
    }

    #[test]
    fn test_load_missing_file_is_io() {
        assert!(matches!(
            Dataset::load("/nonexistent/path/data.dat"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_load_empty_file_is_format() {
        let file = write_temp("\n\n");
        assert!(matches!(Dataset::load(file.path()), Err(Error::Format(_))));
    }

    #[test]
    fn test_normalize_range_and_constant_column() {
        let mut data = Dataset::from_rows(vec![
            vec![2.0, 7.0, 9.0],
            vec![4.0, 7.0, 1.0],
            vec![6.0, 7.0, 5.0],
        ])
        .unwrap();
        data.normalize(0, 1).unwrap();
        assert_eq!(data.rows()[0][0], 0.0);
        assert_eq!(data.rows()[1][0], 0.5);
        assert_eq!(data.rows()[2][0], 1.0);
        assert!(data.rows().iter().all(|r| r[1] == 0.0));
        // Outside the range: untouched.
        assert_eq!(data.rows()[0][2], 9.0);
        assert_eq!(data.column_scale(0), Some(ColumnScale { min: 2.0, max: 6.0 }));
        assert_eq!(data.column_scale(2), None);
    }

    #[test]
    fn test_normalize_bad_range() {
        let mut data = Dataset::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(data.normalize(1, 0), Err(Error::Range(_))));
        assert!(matches!(data.normalize(0, 2), Err(Error::Range(_))));
    }

    #[test]
    fn test_make_exemplar_single_label_column() {
        let mut data =
            Dataset::from_rows(vec![vec![0.1, 0.2, 0.0], vec![0.3, 0.4, 2.0]]).unwrap();
        data.make_exemplar(2, 3, 1).unwrap();
        assert_eq!(data.columns(), 5);
        assert_eq!(data.rows()[0], vec![0.1, 0.2, 1.0, 0.0, 0.0]);
        assert_eq!(data.rows()[1], vec![0.3, 0.4, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_make_exemplar_with_offset() {
        let mut data = Dataset::from_rows(vec![vec![0.5, 1.0], vec![0.5, 3.0]]).unwrap();
        data.make_exemplar_with(&ExemplarOptions::new(1, 3, 1).with_label_offset(1))
            .unwrap();
        assert_eq!(data.rows()[0], vec![0.5, 1.0, 0.0, 0.0]);
        assert_eq!(data.rows()[1], vec![0.5, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_make_exemplar_out_of_range_leaves_data() {
        let mut data = Dataset::from_rows(vec![vec![0.5, 1.0], vec![0.5, 3.0]]).unwrap();
        let before = data.clone();
        assert!(matches!(data.make_exemplar(1, 3, 1), Err(Error::Range(_))));
        assert_eq!(data, before);
        let mut fractional = Dataset::from_rows(vec![vec![0.5, 1.5]]).unwrap();
        assert!(matches!(fractional.make_exemplar(1, 3, 1), Err(Error::Range(_))));
    }

    #[test]
    fn test_make_exemplar_huge_label_is_range_error() {
        let mut data = Dataset::from_rows(vec![vec![0.5, -1.0e19]]).unwrap();
        let before = data.clone();
        let opts = ExemplarOptions::new(1, 3, 1).with_label_offset(1);
        assert!(matches!(data.make_exemplar_with(&opts), Err(Error::Range(_))));
        assert_eq!(data, before);

        let mut big = Dataset::from_rows(vec![vec![0.5, 1.0e19]]).unwrap();
        assert!(matches!(big.make_exemplar(1, 3, 1), Err(Error::Range(_))));
        let mut shifted = Dataset::from_rows(vec![vec![0.5, 0.0]]).unwrap();
        let opts = ExemplarOptions::new(1, 3, 1).with_label_offset(i64::MIN);
        assert!(matches!(shifted.make_exemplar_with(&opts), Err(Error::Range(_))));
    }

    #[test]
    fn test_make_exemplar_wide_label_block() {
        let mut data = Dataset::from_rows(vec![vec![0.7, 0.0, 0.9, 0.2]]).unwrap();
        data.make_exemplar(1, 3, 3).unwrap();
        assert_eq!(data.rows()[0], vec![0.7, 0.0, 1.0, 0.0]);
        let mut mismatched = Dataset::from_rows(vec![vec![0.7, 0.0, 0.9]]).unwrap();
        assert!(matches!(mismatched.make_exemplar(1, 3, 2), Err(Error::Range(_))));
    }

    #[test]
    fn test_make_exemplar_column_mismatch() {
        let mut data = Dataset::from_rows(vec![vec![0.1, 0.2, 0.0]]).unwrap();
        assert!(matches!(data.make_exemplar(1, 2, 1), Err(Error::Range(_))));
        assert!(matches!(data.make_exemplar(2, 0, 1), Err(Error::Range(_))));
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let mut a = Dataset::from_rows(rows.clone()).unwrap();
        let mut b = Dataset::from_rows(rows).unwrap();
        a.shuffle(11);
        b.shuffle(11);
        assert_eq!(a, b);
        let mut sorted: Vec<f64> = a.rows().iter().map(|r| r[0]).collect();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(sorted, (0..20).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/table.dat");
        let data = Dataset::from_rows(vec![vec![0.25, 1.0], vec![0.5, 0.0]]).unwrap();
        data.save(&path, 2).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0.25 1.00\n0.50 0.00\n");
        assert_eq!(Dataset::load(&path).unwrap().rows(), data.rows());
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.dat");
        std::fs::write(&path, "previous").unwrap();
        // A regular file where the parent directory should be.
        let blocked = dir.path().join("blocker");
        std::fs::write(&blocked, "x").unwrap();
        let data = Dataset::from_rows(vec![vec![1.0]]).unwrap();
        assert!(matches!(data.save(blocked.join("t.dat"), 2), Err(Error::Io(_))));
        data.save(&path, 1).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.0\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn test_argmax_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.2, 0.9, 0.9]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
    }
}
