//! A brute-force reference reader over a single dense, symmetric, source-
//! order matrix. Used by the integration tests to check the facade's
//! dense-submatrix queries and reverse/move edits against the "obvious but
//! slow" ground truth, the way `dynamic_2core`'s `common::slow_bst`
//! checks its fast lists against a naive one.
//!
//! Models one resolution at bin granularity (`1 bin = 1 bp`), with every
//! edit applied directly to a `current bin -> source row` mapping. Splitting
//! a contig or (un)grouping a scaffold never changes matrix content, so
//! those edits aren't modeled here; only `reverse`/`move` are, since those
//! are the only ones the bin-to-source mapping actually needs to track.

pub struct ReferenceAssembly {
    source: Vec<Vec<f64>>,
    row_for_bin: Vec<usize>,
}

impl ReferenceAssembly {
    /// `source` must be square and symmetric; `source[i][j] == source[j][i]`.
    pub fn new(source: Vec<Vec<f64>>) -> Self {
        let n = source.len();
        assert!(source.iter().all(|row| row.len() == n));
        ReferenceAssembly {
            row_for_bin: (0..n).collect(),
            source,
        }
    }

    pub fn total_bins(&self) -> usize {
        self.row_for_bin.len()
    }

    pub fn reverse(&mut self, start_incl: usize, end_excl: usize) {
        self.row_for_bin[start_incl..end_excl].reverse();
    }

    pub fn move_range(&mut self, start_incl: usize, end_excl: usize, target_start: usize) {
        let removed: Vec<usize> = self.row_for_bin.drain(start_incl..end_excl).collect();
        let at = target_start.min(self.row_for_bin.len());
        self.row_for_bin.splice(at..at, removed);
    }

    /// Dense submatrix over `[row_start, row_end) x [col_start, col_end)` in
    /// *current* bin coordinates, clamped to the assembly's current extent.
    pub fn dense_submatrix(&self, row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Vec<Vec<f64>> {
        let n = self.total_bins();
        let row_end = row_end.min(n);
        let col_end = col_end.min(n);
        let mut out = vec![vec![0.0; col_end.saturating_sub(col_start)]; row_end.saturating_sub(row_start)];
        for i in row_start..row_end {
            let src_i = self.row_for_bin[i];
            for j in col_start..col_end {
                let src_j = self.row_for_bin[j];
                out[i - row_start][j - col_start] = self.source[src_i][src_j];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_then_query_matches_manual_reindexing() {
        let source = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![2.0, 5.0, 6.0, 7.0],
            vec![3.0, 6.0, 8.0, 9.0],
            vec![4.0, 7.0, 9.0, 10.0],
        ];
        let mut r = ReferenceAssembly::new(source);
        r.reverse(1, 3);
        let m = r.dense_submatrix(0, 4, 0, 4);
        // Bins became [0, 2, 1, 3]; row 1 should now read source row 2.
        assert_eq!(m[1][1], 8.0);
        assert_eq!(m[0][1], 3.0);
    }
}
