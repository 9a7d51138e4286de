//! The Contig Tree (`spec.md` §4.1): an implicit-key order-statistic tree
//! over the current assembly order, built on the generic engine in
//! [`crate::treap`]. Recoverable errors don't belong here — a contig tree
//! that can't satisfy its own size-vector invariant is corrupt, not
//! user-facing, so this module panics rather than returning `Result`.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::contig::{ContigDescriptor, Presence};
use crate::treap::{Aggregate, CountedAggregate, Idx, Treap, NIL};
use crate::units::{Direction, QueryUnit, Resolution};

/// Payload of one contig-tree node: a shared, immutable descriptor plus the
/// node's own orientation, which the generic engine flips in place whenever
/// a pending reversal above it is pushed down.
#[derive(Debug, Clone)]
pub struct ContigTreeItem {
    pub descriptor: Arc<ContigDescriptor>,
    pub direction: Direction,
}

/// The three cumulative-size vectors from `spec.md` §3, plus a subtree
/// node count needed for `split_by_count`. All four components are
/// order-invariant sums, so reversing a subtree never changes this value.
#[derive(Debug, Clone, Default)]
pub struct ContigAggregate {
    pub node_count: u64,
    pub size_bp: u64,
    pub size_bins_including_hidden: HashMap<Resolution, u64>,
    pub size_pixels_excluding_hidden: HashMap<Resolution, u64>,
}

fn merge_sum_maps(a: &HashMap<Resolution, u64>, b: &HashMap<Resolution, u64>) -> HashMap<Resolution, u64> {
    let mut out = a.clone();
    for (r, v) in b {
        *out.entry(*r).or_insert(0) += v;
    }
    out
}

impl Aggregate for ContigAggregate {
    type Item = ContigTreeItem;

    fn empty() -> Self {
        ContigAggregate::default()
    }

    fn single(item: &Self::Item) -> Self {
        let d = &item.descriptor;
        let mut bins = HashMap::with_capacity(d.length_at_resolution.len());
        let mut pixels = HashMap::with_capacity(d.length_at_resolution.len());
        for (&r, &len) in &d.length_at_resolution {
            bins.insert(r, len);
            let hidden = d.presence_at(r).is_hidden();
            pixels.insert(r, if hidden { 0 } else { len });
        }
        ContigAggregate {
            node_count: 1,
            size_bp: d.length_bp,
            size_bins_including_hidden: bins,
            size_pixels_excluding_hidden: pixels,
        }
    }

    fn merge(left: &Self, mid: &Self, right: &Self) -> Self {
        let bins = merge_sum_maps(&merge_sum_maps(&left.size_bins_including_hidden, &mid.size_bins_including_hidden), &right.size_bins_including_hidden);
        let pixels = merge_sum_maps(&merge_sum_maps(&left.size_pixels_excluding_hidden, &mid.size_pixels_excluding_hidden), &right.size_pixels_excluding_hidden);
        ContigAggregate {
            node_count: left.node_count + mid.node_count + right.node_count,
            size_bp: left.size_bp + mid.size_bp + right.size_bp,
            size_bins_including_hidden: bins,
            size_pixels_excluding_hidden: pixels,
        }
    }

    // Sums are order-invariant: the default identity `reverse_agg` is
    // correct, and we only need to flip the node's own orientation flag.
    fn reverse_item(item: &mut Self::Item) {
        item.direction.flip_in_place();
    }
}

impl CountedAggregate for ContigAggregate {
    fn count(agg: &Self) -> u64 {
        agg.node_count
    }
}

fn unit_weight(unit: QueryUnit, resolution: Resolution) -> impl Fn(&ContigAggregate) -> u64 {
    move |agg: &ContigAggregate| match unit {
        QueryUnit::Bp => agg.size_bp,
        QueryUnit::Bins => *agg.size_bins_including_hidden.get(&resolution).unwrap_or(&0),
        QueryUnit::Pixels => *agg.size_pixels_excluding_hidden.get(&resolution).unwrap_or(&0),
    }
}

pub struct ContigTree {
    engine: Treap<ContigAggregate>,
    root: Idx,
}

impl Default for ContigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContigTree {
    pub fn new() -> Self {
        ContigTree {
            engine: Treap::new(),
            root: NIL,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    /// `size_vectors()` from `spec.md` §4.1: O(1) from the cached root
    /// aggregate.
    pub fn size_vectors(&self) -> (u64, HashMap<Resolution, u64>, HashMap<Resolution, u64>) {
        let agg = self.engine.agg(self.root);
        (agg.size_bp, agg.size_bins_including_hidden, agg.size_pixels_excluding_hidden)
    }

    pub fn total_size(&self, unit: QueryUnit, resolution: Resolution) -> u64 {
        unit_weight(unit, resolution)(&self.engine.agg(self.root))
    }

    /// Size of an arbitrary exposed subtree in the chosen unit, e.g. the
    /// `less_size`/`segment_size` the ATU resolver (`spec.md` §4.3) and the
    /// unit converter (§4.5) both need from a just-exposed `(less, segment,
    /// greater)` triple.
    pub fn size_of(&self, node: Idx, unit: QueryUnit, resolution: Resolution) -> u64 {
        unit_weight(unit, resolution)(&self.engine.agg(node))
    }

    pub fn node_count(&self) -> u64 {
        self.engine.node_count(self.root)
    }

    /// Node count of an arbitrary exposed subtree, e.g. to assert that a
    /// just-exposed one-bin segment (`spec.md` §4.6) really is a single
    /// contig before splitting it.
    pub fn node_count_of(&self, node: Idx) -> u64 {
        self.engine.node_count(node)
    }

    /// Allocates a standalone leaf node attached nowhere, for callers
    /// (contig split) that replace an exposed node with a hand-built
    /// two-node subtree rather than going through `push_back`/`insert_at_position`.
    pub fn create_node(&mut self, descriptor: Arc<ContigDescriptor>, direction: Direction) -> Idx {
        self.engine.create(ContigTreeItem { descriptor, direction })
    }

    /// `insert_at_position`: split by count at `index`, merge with a fresh
    /// leaf node.
    pub fn insert_at_position(&mut self, index: u64, descriptor: Arc<ContigDescriptor>, direction: Direction) {
        let (l, r) = self.engine.split_by_count(self.root, index);
        let leaf = self.engine.create(ContigTreeItem { descriptor, direction });
        self.root = self.engine.concat(self.engine.concat(l, leaf), r);
    }

    pub fn push_back(&mut self, descriptor: Arc<ContigDescriptor>, direction: Direction) {
        let leaf = self.engine.create(ContigTreeItem { descriptor, direction });
        self.root = self.engine.concat(self.root, leaf);
    }

    /// `split_by_length(node, k, unit, resolution, include_equal_left)`.
    pub fn split_by_length(&mut self, node: Idx, k: u64, unit: QueryUnit, resolution: Resolution, include_equal_left: bool) -> (Idx, Idx) {
        let weight = unit_weight(unit, resolution);
        self.engine.split_by_weight(node, k, &weight, include_equal_left)
    }

    /// `expose_segment(start_incl, end_excl, unit, resolution)`: two splits
    /// of the current root into `(less, segment, greater)`. The tree's root
    /// is left empty (`NIL`) until [`ContigTree::commit_exposed_segment`]
    /// restores it, matching the "exclusive access while exposed" shape of
    /// `spec.md` §4.1.
    pub fn expose_segment(&mut self, start_incl: u64, end_excl: u64, unit: QueryUnit, resolution: Resolution) -> (Idx, Idx, Idx) {
        assert!(start_incl <= end_excl, "expose_segment: start must be <= end");
        let root = self.root;
        self.root = NIL;
        let (less, rest) = self.split_by_length(root, start_incl, unit, resolution, false);
        // A contig straddling `start_incl` is pushed into `rest` rather
        // than `less` (see `Treap::split_by_weight`'s straddle rule), so
        // `less`'s actual size can be smaller than `start_incl`. The second
        // cut must be measured from that actual size, not from
        // `start_incl` itself, or `segment` would miss whole contigs that
        // straddle the left boundary.
        let less_size = unit_weight(unit, resolution)(&self.engine.agg(less));
        let (segment, greater) = self.split_by_length(rest, end_excl - less_size, unit, resolution, true);
        trace!("expose_segment [{start_incl},{end_excl}) unit={unit:?} R={resolution}");
        (less, segment, greater)
    }

    /// `commit_exposed_segment(less, segment, greater)`: two merges,
    /// restoring the tree to a single root.
    pub fn commit_exposed_segment(&mut self, less: Idx, segment: Idx, greater: Idx) {
        let merged = self.engine.concat(self.engine.concat(less, segment), greater);
        self.root = merged;
    }

    pub fn reverse_subtree(&mut self, subtree: Idx) {
        self.engine.reverse(subtree);
    }

    pub fn concat(&mut self, l: Idx, r: Idx) -> Idx {
        self.engine.concat(l, r)
    }

    pub fn split_by_count(&mut self, node: Idx, k: u64) -> (Idx, Idx) {
        self.engine.split_by_count(node, k)
    }

    pub fn agg(&self, node: Idx) -> ContigAggregate {
        self.engine.agg(node)
    }

    pub fn item(&self, node: Idx) -> &ContigTreeItem {
        self.engine.item(node)
    }

    pub fn set_item(&mut self, node: Idx, item: ContigTreeItem) {
        self.engine.set_item(node, item);
    }

    /// `traverse_nodes(subtree, resolution, exclude_hidden, visitor)`:
    /// in-order visit, pushing lazy reversals, optionally skipping
    /// `AutoHidden`/`ForcedHidden` contigs at `resolution`.
    pub fn traverse_nodes(&mut self, subtree: Idx, resolution: Resolution, exclude_hidden: bool, visitor: &mut impl FnMut(&ContigTreeItem)) {
        self.engine.traverse(subtree, &mut |item: &ContigTreeItem| {
            if exclude_hidden && item.descriptor.presence_at(resolution).is_hidden() {
                return;
            }
            visitor(item);
        });
    }

    pub fn root(&self) -> Idx {
        self.root
    }

    /// Replaces the current root wholesale. Used by callers (contig split,
    /// move/reverse) that build a new root out of pieces they already hold.
    pub fn set_root(&mut self, root: Idx) {
        self.root = root;
    }

    /// `convert(position, R_from, U_from, R_to, U_to)` (`spec.md` §4.5).
    /// `resolution` is ignored by [`QueryUnit::Bp`] (callers conventionally
    /// pass the finest stored resolution, but any value gives the same
    /// result since bp quantities aren't resolution-indexed).
    pub fn convert_units(&mut self, position: u64, from_resolution: Resolution, from_unit: QueryUnit, to_resolution: Resolution, to_unit: QueryUnit) -> u64 {
        let (less, segment, greater) = self.expose_segment(position, position + 1, from_unit, from_resolution);
        let less_from = self.size_of(less, from_unit, from_resolution);
        let less_to = self.size_of(less, to_unit, to_resolution);
        self.commit_exposed_segment(less, segment, greater);

        let delta_from = position - less_from;
        let delta_bp = match from_unit {
            QueryUnit::Bp => delta_from,
            _ => delta_from * from_resolution as u64,
        };
        let delta_to = match to_unit {
            QueryUnit::Bp => delta_bp,
            _ => delta_bp / to_resolution as u64,
        };
        less_to + delta_to
    }
}

/// Whether a contig is hidden at `resolution`, independent of its current
/// tree-imposed direction (presence never depends on orientation).
pub fn is_hidden_at(descriptor: &ContigDescriptor, resolution: Resolution) -> bool {
    matches!(descriptor.presence_at(resolution), Presence::AutoHidden | Presence::ForcedHidden)
}
