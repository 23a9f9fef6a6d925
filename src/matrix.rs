//! Square Boolean sparse matrices.
//!
//! Every matrix owned by a [`Graph`](crate::Graph) is a `BitMatrix`: the
//! adjacency matrix, the per-relation matrices and the per-label matrices.
//! Rows are destinations and columns are sources: `m[(d, s)]`, written
//! `contains(d, s)` here, is true iff there is an edge from `s` to `d`.
//!
//! A matrix has a *logical* dimension (`dim`) and an allocated capacity
//! (`capacity`). The graph keeps capacity at its node capacity and lets the
//! logical dimension trail the live node count, resizing on access.

use fixedbitset::FixedBitSet;
use indexmap::IndexSet;

/// A square Boolean sparse matrix.
///
/// Storage is one set of source columns per destination row. Only the first
/// `dim` rows (and columns `< dim`) are addressable; the remaining allocated
/// rows are kept empty so growing back into them is cheap.
#[derive(Clone, Debug, Default)]
pub struct BitMatrix {
    dim: usize,
    rows: Vec<IndexSet<usize>>,
}

impl BitMatrix {
    /// Create an empty matrix (dimension 0) with `cap` preallocated rows.
    pub fn with_capacity(cap: usize) -> Self {
        let mut rows = Vec::with_capacity(cap);
        rows.resize_with(cap, IndexSet::new);
        BitMatrix { dim: 0, rows }
    }

    /// The logical number of rows (equal to the number of columns).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The number of allocated rows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    /// Count the set entries.
    ///
    /// Computes in **O(dim)** time; this is also the materialisation hook
    /// used by [`Graph::synchronize`](crate::Graph::synchronize).
    pub fn nvals(&self) -> usize {
        self.rows[..self.dim].iter().map(|row| row.len()).sum()
    }

    /// Change the logical dimension to `dim × dim`.
    ///
    /// Shrinking clears the vacated rows and drops out-of-range columns from
    /// the surviving rows, so entries can never outlive their row or column
    /// and reappear after a later regrow. Growing past the allocated
    /// capacity appends empty rows.
    pub fn resize(&mut self, dim: usize) {
        if dim < self.dim {
            for row in &mut self.rows[dim..self.dim] {
                row.clear();
            }
            for row in &mut self.rows[..dim] {
                row.retain(|&col| col < dim);
            }
        } else if dim > self.rows.len() {
            self.rows.resize_with(dim, IndexSet::new);
        }
        self.dim = dim;
    }

    /// Return true if the entry at `(row, col)` is set.
    ///
    /// **Panics** if `row` or `col` is out of bounds.
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.bounds_check(row, col);
        self.rows[row].contains(&col)
    }

    /// Set the entry at `(row, col)`. Returns false if it was already set.
    ///
    /// **Panics** if `row` or `col` is out of bounds.
    #[inline]
    pub fn insert(&mut self, row: usize, col: usize) -> bool {
        self.bounds_check(row, col);
        self.rows[row].insert(col)
    }

    /// Clear the entry at `(row, col)`. Returns true if it was set.
    ///
    /// **Panics** if `row` or `col` is out of bounds.
    #[inline]
    pub fn remove(&mut self, row: usize, col: usize) -> bool {
        self.bounds_check(row, col);
        self.rows[row].swap_remove(&col)
    }

    /// Extract row `row` as a column mask of length `dim`.
    pub fn extract_row(&self, row: usize) -> FixedBitSet {
        assert!(row < self.dim, "row index out of bounds");
        let mut mask = FixedBitSet::with_capacity(self.dim);
        for &col in &self.rows[row] {
            mask.insert(col);
        }
        mask
    }

    /// Extract column `col` as a row mask of length `dim`.
    ///
    /// This is the `M · e_col` of the column-is-source encoding: for the
    /// adjacency matrix it yields the destinations reachable from `col`.
    pub fn extract_column(&self, col: usize) -> FixedBitSet {
        assert!(col < self.dim, "column index out of bounds");
        let mut mask = FixedBitSet::with_capacity(self.dim);
        for (row, cols) in self.rows[..self.dim].iter().enumerate() {
            if cols.contains(&col) {
                mask.insert(row);
            }
        }
        mask
    }

    /// Replace row `row` with the entries of `mask`.
    pub fn assign_row(&mut self, row: usize, mask: &FixedBitSet) {
        assert!(row < self.dim, "row index out of bounds");
        assert_eq!(mask.len(), self.dim, "mask length must equal dim");
        let cols = &mut self.rows[row];
        cols.clear();
        cols.extend(mask.ones());
    }

    /// Replace column `col` with the entries of `mask`.
    pub fn assign_column(&mut self, col: usize, mask: &FixedBitSet) {
        assert!(col < self.dim, "column index out of bounds");
        assert_eq!(mask.len(), self.dim, "mask length must equal dim");
        for (row, cols) in self.rows[..self.dim].iter_mut().enumerate() {
            if mask.contains(row) {
                cols.insert(col);
            } else {
                cols.swap_remove(&col);
            }
        }
    }

    /// Clear every entry in row `row`.
    pub fn clear_row(&mut self, row: usize) {
        assert!(row < self.dim, "row index out of bounds");
        self.rows[row].clear();
    }

    /// Clear every entry in column `col`.
    pub fn clear_column(&mut self, col: usize) {
        assert!(col < self.dim, "column index out of bounds");
        for cols in &mut self.rows[..self.dim] {
            cols.swap_remove(&col);
        }
    }

    #[inline]
    fn bounds_check(&self, row: usize, col: usize) {
        assert!(
            row < self.dim && col < self.dim,
            "matrix entry ({}, {}) out of bounds for dimension {}",
            row,
            col,
            self.dim
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_capacity() {
        let m = BitMatrix::with_capacity(8);
        assert_eq!(m.dim(), 0);
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.nvals(), 0);
    }

    #[test]
    fn test_insert_remove() {
        let mut m = BitMatrix::with_capacity(4);
        m.resize(4);
        assert!(m.insert(1, 0));
        assert!(!m.insert(1, 0));
        assert!(m.contains(1, 0));
        assert_eq!(m.nvals(), 1);
        assert!(m.remove(1, 0));
        assert!(!m.remove(1, 0));
        assert_eq!(m.nvals(), 0);
    }

    #[test]
    fn test_resize_beyond_capacity() {
        let mut m = BitMatrix::with_capacity(2);
        m.resize(5);
        assert_eq!(m.dim(), 5);
        assert!(m.capacity() >= 5);
        m.insert(4, 4);
        assert!(m.contains(4, 4));
    }

    #[test]
    fn test_shrink_clears_stale_entries() {
        let mut m = BitMatrix::with_capacity(5);
        m.resize(5);
        m.insert(4, 4);
        m.insert(1, 4);
        m.insert(1, 0);
        m.resize(3);
        assert_eq!(m.nvals(), 1);
        assert!(m.contains(1, 0));
        // Regrowing must not resurrect the cleared entries.
        m.resize(5);
        assert!(!m.contains(4, 4));
        assert!(!m.contains(1, 4));
    }

    #[test]
    fn test_extract_assign_row() {
        let mut m = BitMatrix::with_capacity(4);
        m.resize(4);
        m.insert(2, 0);
        m.insert(2, 3);
        let row = m.extract_row(2);
        assert_eq!(row.ones().collect::<Vec<_>>(), vec![0, 3]);
        m.assign_row(1, &row);
        assert!(m.contains(1, 0));
        assert!(m.contains(1, 3));
        let empty = FixedBitSet::with_capacity(4);
        m.assign_row(2, &empty);
        assert_eq!(m.extract_row(2).count_ones(..), 0);
    }

    #[test]
    fn test_extract_assign_column() {
        let mut m = BitMatrix::with_capacity(4);
        m.resize(4);
        m.insert(0, 2);
        m.insert(3, 2);
        let col = m.extract_column(2);
        assert_eq!(col.ones().collect::<Vec<_>>(), vec![0, 3]);
        m.assign_column(1, &col);
        assert!(m.contains(0, 1));
        assert!(m.contains(3, 1));
        m.clear_column(2);
        assert_eq!(m.extract_column(2).count_ones(..), 0);
        assert!(m.contains(0, 1));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_insert_out_of_bounds() {
        let mut m = BitMatrix::with_capacity(4);
        m.resize(2);
        m.insert(2, 0);
    }
}
