//! Splitting a prepared dataset into disjoint subsets.
//!
//! Every split is deterministic and keeps source order: subset `k` holds a
//! contiguous run of records that follows subset `k - 1`. Subsets are owned
//! copies, so they stay valid after the source dataset is dropped. Callers
//! that want randomized membership call [`Dataset::shuffle`] first.
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use tracing::debug;

impl Dataset {
    /// Split into `n` subsets whose sizes differ by at most one.
    ///
    /// The first `len % n` subsets receive the extra records.
    pub fn split_evenly(&self, n: usize) -> Result<Vec<Dataset>> {
        if n == 0 {
            return Err(Error::range("cannot split into zero subsets"));
        }
        let base = self.len() / n;
        let remainder = self.len() % n;
        let sizes: Vec<usize> = (0..n).map(|i| base + usize::from(i < remainder)).collect();
        Ok(self.split_sizes(&sizes))
    }

    /// Split into consecutive subsets of exactly the given sizes. Records past
    /// the total are not assigned to any subset.
    pub fn split_by_amount(&self, sizes: &[usize]) -> Result<Vec<Dataset>> {
        if sizes.is_empty() {
            return Err(Error::range("cannot split into zero subsets"));
        }
        let total: usize = sizes.iter().sum();
        if total > self.len() {
            return Err(Error::range(format!(
                "requested {} records but only {} are available",
                total,
                self.len()
            )));
        }
        Ok(self.split_sizes(sizes))
    }

    /// Split into subsets holding the given percentages of the records, each
    /// rounded to the nearest whole record.
    pub fn split_by_percentage(&self, percentages: &[f64]) -> Result<Vec<Dataset>> {
        if percentages.is_empty() {
            return Err(Error::range("cannot split into zero subsets"));
        }
        if let Some(p) = percentages.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
            return Err(Error::range(format!("invalid percentage {}", p)));
        }
        let total: f64 = percentages.iter().sum();
        if total > 100.0 {
            return Err(Error::range(format!(
                "percentages sum to {}, more than 100",
                total
            )));
        }
        let rows = self.len() as f64;
        let mut sizes: Vec<usize> = percentages
            .iter()
            .map(|p| (rows * p / 100.0).round() as usize)
            .collect();
        // Rounding up several shares can overshoot by a record or two.
        let mut excess = sizes.iter().sum::<usize>().saturating_sub(self.len());
        for size in sizes.iter_mut().rev() {
            let cut = excess.min(*size);
            *size -= cut;
            excess -= cut;
        }
        Ok(self.split_sizes(&sizes))
    }

    /// Take the first `len` records as one subset and the rest as a remainder.
    pub fn extract_split(&self, len: usize) -> Result<(Dataset, Dataset)> {
        if len > self.len() {
            return Err(Error::range(format!(
                "cannot extract {} of {} records",
                len,
                self.len()
            )));
        }
        let (head, tail) = self.rows().split_at(len);
        Ok((self.with_rows(head.to_vec()), self.with_rows(tail.to_vec())))
    }

    fn split_sizes(&self, sizes: &[usize]) -> Vec<Dataset> {
        let mut offset = 0;
        let subsets: Vec<Dataset> = sizes
            .iter()
            .map(|&size| {
                let subset = if size == 0 {
                    self.empty_like()
                } else {
                    self.with_rows(self.rows()[offset..offset + size].to_vec())
                };
                offset += size;
                subset
            })
            .collect();
        debug!(?sizes, "split dataset");
        subsets
    }
}
