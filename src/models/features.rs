//! Sparse feature rows

use std::collections::BTreeMap;

/// One vectorized document. Indices are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    pub fn from_entries(dim: usize, entries: BTreeMap<usize, f64>) -> Self {
        let (indices, values) = entries.into_iter().filter(|(i, _)| *i < dim).unzip();
        Self { dim, indices, values }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored (non-zero) entries
    #[cfg(test)]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product with a dense weight row of the same width
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.iter().map(|(i, v)| v * dense[i]).sum()
    }

    pub fn normalize_l2(&mut self) {
        let norm = self.values.iter().map(|v| v * v).sum::<f64>().sqrt();
        self.scale(norm);
    }

    pub fn normalize_l1(&mut self) {
        let norm = self.values.iter().map(|v| v.abs()).sum::<f64>();
        self.scale(norm);
    }

    fn scale(&mut self, norm: f64) {
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_dot() {
        let row = SparseVector::from_entries(4, BTreeMap::from([(1, 2.0), (3, 0.5)]));
        assert_eq!(row.get(0), 0.0);
        assert_eq!(row.get(1), 2.0);
        assert_eq!(row.dot(&[10.0, 1.0, 10.0, 4.0]), 4.0);
    }

    #[test]
    fn test_l1_norm_of_empty_row() {
        let mut row = SparseVector::from_entries(3, BTreeMap::new());
        row.normalize_l1();
        assert_eq!(row.nnz(), 0);
    }
}
