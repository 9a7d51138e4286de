//! The submatrix assembler (`spec.md` §4.4): fetches per-ATU intersections
//! from the block store, handles flips/transpose/diagonal symmetry, and
//! composes a dense submatrix plus row/column weight vectors.

use crate::block_store::{BlockData, BlockStore};
use crate::contig_tree::ContigTree;
use crate::matrix::DenseMatrix;
use crate::stripe::{Atu, StripeId};
use crate::units::{Direction, QueryUnit, Resolution};
use crate::{atu_resolver, HictError, Result};

/// `get_dense_submatrix`'s return shape.
pub struct Submatrix {
    pub matrix: DenseMatrix,
    pub row_weights: Vec<f64>,
    pub col_weights: Vec<f64>,
}

fn densify(store: &dyn BlockStore, resolution: Resolution, a: StripeId, b: StripeId, data: BlockData) -> DenseMatrix {
    let rows = store.stripe(resolution, a).length_bins as usize;
    let cols = store.stripe(resolution, b).length_bins as usize;
    match data {
        BlockData::Empty => DenseMatrix::zeros(rows, cols),
        BlockData::Dense(m) => {
            assert!(m.rows >= rows && m.cols >= cols, "dense block smaller than its stripes");
            if m.rows == rows && m.cols == cols {
                m
            } else {
                m.slice(0, rows, 0, cols)
            }
        }
        BlockData::Sparse(triples) => {
            let mut m = DenseMatrix::zeros(rows, cols);
            for (r, c, v) in triples {
                m.set(r as usize, c as usize, v);
            }
            m
        }
    }
}

/// Fetches the dense intersection of two ATUs, applying the diagonal
/// symmetry fix-up, transpose, slicing, and direction flips described in
/// `spec.md` §4.4.
fn atu_intersection(store: &dyn BlockStore, resolution: Resolution, row_atu: &Atu, col_atu: &Atu) -> (DenseMatrix, Vec<f64>, Vec<f64>) {
    let (mut a, mut b) = (row_atu.stripe_id, col_atu.stripe_id);
    let mut needs_transpose = false;
    if a.0 > b.0 {
        std::mem::swap(&mut a, &mut b);
        needs_transpose = true;
    }

    let block = store.block(resolution, a, b);
    let mut mx = densify(store, resolution, a, b, block);
    if a == b {
        mx.symmetrize_from_transpose();
    }
    if needs_transpose {
        mx = mx.transpose();
    }

    let mut slice = mx.slice(
        row_atu.start_incl as usize,
        row_atu.end_excl as usize,
        col_atu.start_incl as usize,
        col_atu.end_excl as usize,
    );
    if row_atu.direction == Direction::Reversed {
        slice.flip_rows();
    }
    if col_atu.direction == Direction::Reversed {
        slice.flip_cols();
    }

    let row_stripe = store.stripe(resolution, row_atu.stripe_id);
    let mut row_weights = row_stripe.bin_weights[row_atu.start_incl as usize..row_atu.end_excl as usize].to_vec();
    if row_atu.direction == Direction::Reversed {
        row_weights.reverse();
    }
    let col_stripe = store.stripe(resolution, col_atu.stripe_id);
    let mut col_weights = col_stripe.bin_weights[col_atu.start_incl as usize..col_atu.end_excl as usize].to_vec();
    if col_atu.direction == Direction::Reversed {
        col_weights.reverse();
    }

    (slice, row_weights, col_weights)
}

/// `get_dense_submatrix(R, x0, y0, x1, y1, unit, exclude_hidden)`. Clamps to
/// the matrix bounds; the returned shape always equals the clamped query
/// shape, zero-padded off the end of the assembly.
pub fn get_dense_submatrix(
    store: &dyn BlockStore,
    tree: &mut ContigTree,
    resolution: Resolution,
    row_start_incl: u64,
    col_start_incl: u64,
    row_end_excl: u64,
    col_end_excl: u64,
    exclude_hidden: bool,
) -> Result<Submatrix> {
    if !store.resolutions().contains(&resolution) {
        return Err(HictError::IncorrectResolution(resolution));
    }

    let row_atus = atu_resolver::resolve_atus(tree, resolution, row_start_incl, row_end_excl, exclude_hidden);
    let col_atus = atu_resolver::resolve_atus(tree, resolution, col_start_incl, col_end_excl, exclude_hidden);

    // Shape is measured against the *clamped* range (matching the resolver's
    // own clamping), so an out-of-range query is zero-padded to the clamped
    // shape rather than the raw requested one.
    let unit = if exclude_hidden { QueryUnit::Pixels } else { QueryUnit::Bins };
    let total = tree.total_size(unit, resolution);
    let row_start = row_start_incl.min(total);
    let row_end = row_end_excl.min(total);
    let col_start = col_start_incl.min(total);
    let col_end = col_end_excl.min(total);
    let query_rows = row_end.saturating_sub(row_start) as usize;
    let query_cols = col_end.saturating_sub(col_start) as usize;

    let mut row_blocks: Vec<DenseMatrix> = Vec::with_capacity(row_atus.len());
    let mut row_weights: Vec<f64> = Vec::new();
    let mut col_weights: Vec<f64> = Vec::new();

    for (i, row_atu) in row_atus.iter().enumerate() {
        let mut row_parts: Vec<DenseMatrix> = Vec::with_capacity(col_atus.len());
        for (j, col_atu) in col_atus.iter().enumerate() {
            let (part, rw, cw) = atu_intersection(store, resolution, row_atu, col_atu);
            if i == 0 {
                col_weights.extend(cw);
            }
            if j == 0 {
                row_weights.extend(rw);
            }
            row_parts.push(part);
        }
        if row_parts.is_empty() {
            row_blocks.push(DenseMatrix::zeros(row_atu.len() as usize, 0));
        } else {
            row_blocks.push(DenseMatrix::hstack(&row_parts));
        }
    }

    let matrix = if row_atus.is_empty() || col_atus.is_empty() {
        DenseMatrix::zeros(query_rows, query_cols)
    } else {
        DenseMatrix::vstack(&row_blocks)
    };

    if row_weights.is_empty() {
        row_weights = vec![1.0; query_rows];
    }
    if col_weights.is_empty() {
        col_weights = vec![1.0; query_cols];
    }

    assert_eq!(matrix.rows, query_rows, "submatrix row count doesn't match the query");
    assert_eq!(matrix.cols, query_cols, "submatrix column count doesn't match the query");
    assert_eq!(row_weights.len(), query_rows);
    assert_eq!(col_weights.len(), query_cols);

    Ok(Submatrix {
        matrix,
        row_weights,
        col_weights,
    })
}

/// Bin-weight normalization: `w_r[i] · M[i,j] · w_c[j]`, a separate step the
/// facade exposes so callers can choose whether to apply it.
pub fn normalize(m: &DenseMatrix, row_weights: &[f64], col_weights: &[f64]) -> DenseMatrix {
    assert_eq!(m.rows, row_weights.len());
    assert_eq!(m.cols, col_weights.len());
    let mut out = DenseMatrix::zeros(m.rows, m.cols);
    for i in 0..m.rows {
        for j in 0..m.cols {
            out.set(i, j, m.get(i, j) * row_weights[i] * col_weights[j]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::InMemoryBlockStore;
    use crate::contig::{ContigDescriptor, ContigId, Presence};
    use crate::stripe::Stripe;
    use std::sync::Arc;

    fn build_store() -> InMemoryBlockStore {
        let mut store = InMemoryBlockStore::new();
        store.resolutions = vec![1];
        store.mss.insert(1, 4);
        store.stripes.insert(1, vec![Stripe::uniform(StripeId(0), 4), Stripe::uniform(StripeId(1), 4)]);
        let mut blocks = std::collections::HashMap::new();
        // stripe (0,0): identity-ish, only upper triangle populated on disk.
        let m00 = DenseMatrix::from_row_major(4, 4, vec![1., 2., 3., 4., 0., 5., 6., 7., 0., 0., 8., 9., 0., 0., 0., 10.]);
        blocks.insert((0u64, 0u64), BlockData::Dense(m00));
        // stripe (0,1): fully populated, distinct values.
        let m01 = DenseMatrix::from_row_major(4, 4, (1..=16).map(|x| x as f64).collect());
        blocks.insert((0u64, 1u64), BlockData::Dense(m01));
        store.blocks.insert(1, blocks);
        store
    }

    fn build_tree() -> ContigTree {
        let mut tree = ContigTree::new();
        for cid in 0..2u64 {
            let mut d = ContigDescriptor::new(ContigId(cid), format!("c{cid}"), 4, format!("c{cid}"));
            d.length_at_resolution.insert(1, 4);
            d.presence_at_resolution.insert(1, Presence::ForcedShown);
            d.set_atus(
                1,
                vec![Atu {
                    stripe_id: StripeId(cid),
                    start_incl: 0,
                    end_excl: 4,
                    direction: Direction::Forward,
                }],
            );
            tree.push_back(Arc::new(d), Direction::Forward);
        }
        tree
    }

    #[test]
    fn diagonal_block_is_symmetrized() {
        let store = build_store();
        let mut tree = build_tree();
        let sub = get_dense_submatrix(&store, &mut tree, 1, 0, 0, 4, 4, false).unwrap();
        assert_eq!(sub.matrix.get(1, 0), 2.0);
        assert_eq!(sub.matrix.get(0, 1), 2.0);
    }

    #[test]
    fn symmetry_property_row_col_swap_transposes() {
        let store = build_store();
        let mut tree = build_tree();
        let a = get_dense_submatrix(&store, &mut tree, 1, 0, 4, 8, 8, false).unwrap();
        let b = get_dense_submatrix(&store, &mut tree, 1, 4, 0, 8, 8, false).unwrap();
        for i in 0..a.matrix.rows {
            for j in 0..a.matrix.cols {
                assert_eq!(a.matrix.get(i, j), b.matrix.get(j, i));
            }
        }
    }

    #[test]
    fn out_of_range_query_is_clamped_to_the_matrix() {
        let store = build_store();
        let mut tree = build_tree();
        // Total assembly size is 8 bins; the query's upper bound is clamped
        // to it before the result shape is measured.
        let sub = get_dense_submatrix(&store, &mut tree, 1, 6, 6, 20, 20, false).unwrap();
        assert_eq!(sub.matrix.rows, 2);
        assert_eq!(sub.matrix.cols, 2);
        assert_eq!(sub.row_weights.len(), 2);
        assert_eq!(sub.col_weights.len(), 2);

        // A query that falls entirely outside the matrix is all zero shape.
        let empty = get_dense_submatrix(&store, &mut tree, 1, 100, 100, 120, 120, false).unwrap();
        assert_eq!(empty.matrix.rows, 0);
        assert_eq!(empty.matrix.cols, 0);
    }

    #[test]
    fn unknown_resolution_is_rejected() {
        let store = build_store();
        let mut tree = build_tree();
        let err = get_dense_submatrix(&store, &mut tree, 5, 0, 0, 4, 4, false).unwrap_err();
        matches!(err, HictError::IncorrectResolution(5));
    }
}
