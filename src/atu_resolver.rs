//! The ATU resolver (`spec.md` §4.3): translates an assembly-coordinate
//! range into the minimal ordered list of on-disk ATU reads, honoring
//! current contig orientation and hidden-contig exclusion.

use crate::contig_tree::{ContigTree, ContigTreeItem};
use crate::stripe::Atu;
use crate::units::{Direction, QueryUnit, Resolution};

/// `get_atus_for_range`. Clamps `[start_incl, end_excl)` to the current
/// total size at `resolution` in the chosen unit, then returns ATUs whose
/// concatenation equals that (clamped) strip of the assembly.
pub fn resolve_atus(tree: &mut ContigTree, resolution: Resolution, start_incl: u64, end_excl: u64, exclude_hidden: bool) -> Vec<Atu> {
    let unit = if exclude_hidden { QueryUnit::Pixels } else { QueryUnit::Bins };
    let total = tree.total_size(unit, resolution);
    let start = start_incl.min(total);
    let end = end_excl.min(total);
    if start >= end {
        return Vec::new();
    }

    let (less, segment, greater) = tree.expose_segment(start, end, unit, resolution);
    let less_size = tree.size_of(less, unit, resolution);
    let segment_size = tree.size_of(segment, unit, resolution);

    let mut atus: Vec<Atu> = Vec::new();
    let mut first_item: Option<ContigTreeItem> = None;
    let mut last_item: Option<ContigTreeItem> = None;
    tree.traverse_nodes(segment, resolution, exclude_hidden, &mut |item| {
        if first_item.is_none() {
            first_item = Some(item.clone());
        }
        last_item = Some(item.clone());
        atus.extend(item.descriptor.effective_atus(resolution, item.direction));
    });

    debug_assert_eq!(
        atus.iter().map(Atu::len).sum::<u64>(),
        segment_size,
        "ATU total length doesn't match the exposed segment"
    );

    let first_item = first_item.expect("segment is non-trivial but traversal produced no contigs");
    let last_item = last_item.expect("segment is non-trivial but traversal produced no contigs");

    // Left trim: find the ATU containing the query's left boundary within
    // the leftmost contig, via its orientation-adjusted prefix sum, and
    // shrink it in place.
    let delta_l = start - less_size;
    let left_adj = first_item.descriptor.effective_prefix_sum(resolution, first_item.direction);
    let idx_l = left_adj.partition_point(|&x| x <= delta_l);
    assert!(idx_l < left_adj.len(), "query start doesn't fall into the exposed leftmost contig");
    let before_l = if idx_l > 0 { left_adj[idx_l - 1] } else { 0 };
    let residual_l = delta_l - before_l;
    if residual_l > 0 {
        let old = atus[idx_l];
        atus[idx_l] = match old.direction {
            Direction::Forward => Atu {
                start_incl: old.start_incl + residual_l,
                ..old
            },
            Direction::Reversed => Atu {
                end_excl: old.end_excl - residual_l,
                ..old
            },
        };
    }
    atus.drain(0..idx_l);

    // Right trim: symmetric, against the rightmost contig.
    let delta_r = end as i64 - (less_size + segment_size) as i64;
    debug_assert!(delta_r <= 0);
    let target = (-delta_r) as u64;
    let right_adj = last_item.descriptor.effective_prefix_sum(resolution, last_item.direction);
    let right_offset = right_adj.partition_point(|&x| x <= target);
    let deleted_length = if right_offset > 0 { right_adj[right_offset - 1] } else { 0 };
    if right_offset > 0 {
        let new_len = atus.len() - right_offset;
        atus.truncate(new_len);
    }
    let residual = deleted_length as i64 + delta_r;
    debug_assert!(residual <= 0);
    let old_last = *atus.last().expect("right trim left no ATUs");
    let new_last = match old_last.direction {
        Direction::Forward => Atu {
            end_excl: (old_last.end_excl as i64 + residual) as u64,
            ..old_last
        },
        Direction::Reversed => Atu {
            start_incl: (old_last.start_incl as i64 - residual) as u64,
            ..old_last
        },
    };
    *atus.last_mut().unwrap() = new_last;

    debug_assert!(atus.iter().all(|a| a.start_incl < a.end_excl));
    debug_assert_eq!(atus.iter().map(Atu::len).sum::<u64>(), end - start);

    tree.commit_exposed_segment(less, segment, greater);

    // Fuse contiguous same-stripe, same-direction ATUs into one.
    let mut fused: Vec<Atu> = Vec::with_capacity(atus.len());
    for a in atus {
        if let Some(last) = fused.last_mut() {
            if last.is_fusible_with(&a) {
                *last = last.fused_with(&a);
                continue;
            }
        }
        fused.push(a);
    }
    fused
}
