use crate::parallel::should_parallel;
use rayon::prelude::*;

/// Compressed sparse row matrix. Column indices are sorted within a row.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl Default for CsrMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CsrMatrix {
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            row_ptr: vec![0],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Appends one row. Entries may arrive in any order; duplicates are summed.
    pub fn add_row(&mut self, entries: &mut [(usize, f64)]) {
        entries.sort_unstable_by_key(|(col, _)| *col);
        let start = self.col_idx.len();
        for &(col, value) in entries.iter() {
            assert!(col < self.n_cols, "column {col} out of range");
            if self.col_idx.len() > start && self.col_idx.last() == Some(&col) {
                if let Some(last) = self.values.last_mut() {
                    *last += value;
                }
                continue;
            }
            self.col_idx.push(col);
            self.values.push(value);
        }
        self.row_ptr.push(self.col_idx.len());
    }

    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        (&self.col_idx[start..end], &self.values[start..end])
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (cols, values) = self.row(row);
        match cols.binary_search(&col) {
            Ok(k) => values[k],
            Err(_) => 0.0,
        }
    }

    pub fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        let (cols, values) = self.row(row);
        cols.iter().zip(values).map(|(&col, &value)| value * x[col]).sum()
    }

    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols, "input length does not match the column count");
        assert_eq!(y.len(), self.n_rows(), "output length does not match the row count");
        if should_parallel(self.nnz()) {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(row, out)| *out = self.row_dot(row, x));
        } else {
            for (row, out) in y.iter_mut().enumerate() {
                *out = self.row_dot(row, x);
            }
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows()).map(|row| self.get(row, row)).collect()
    }

    pub fn fill(&mut self, value: f64) {
        self.values.iter_mut().for_each(|slot| *slot = value);
    }

    pub fn clear(&mut self) {
        self.n_cols = 0;
        self.row_ptr.clear();
        self.row_ptr.push(0);
        self.col_idx.clear();
        self.values.clear();
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.n_rows() != self.n_cols {
            return false;
        }
        (0..self.n_rows()).all(|row| {
            let (cols, values) = self.row(row);
            cols.iter()
                .zip(values)
                .all(|(&col, &value)| (self.get(col, row) - value).abs() <= tol)
        })
    }
}
