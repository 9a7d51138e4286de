//! The Scaffold Tree (`spec.md` §4.2): an order-statistic tree over
//! base-pair intervals, built on the same generic engine as the contig
//! tree ([`crate::treap`]) but keyed by interval length instead of count,
//! and never reversed.
//!
//! Unlike contig-tree nodes (one atomic contig per node, never split),
//! scaffold-tree nodes are plain length markers: splitting one in the
//! middle is legitimate and is how `split_bp` implements `spec.md`'s
//! "that node is cloned and its length divided between the two halves".
//! This is why `split_bp` isn't built on [`crate::treap::Treap::split_by_weight`]
//! (which never divides a node) — it's its own small recursion.

use std::sync::Arc;

use log::debug;

use crate::scaffold::{ScaffoldDescriptor, ScaffoldId};
use crate::treap::{Aggregate, CountedAggregate, Idx, Treap, NIL};

#[derive(Debug, Clone, PartialEq)]
pub struct ScaffoldTreeItem {
    pub length_bp: u64,
    /// `None` marks an unscaffolded gap.
    pub descriptor: Option<Arc<ScaffoldDescriptor>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScaffoldAggregate {
    pub node_count: u64,
    pub total_len: u64,
}

impl Aggregate for ScaffoldAggregate {
    type Item = ScaffoldTreeItem;

    fn empty() -> Self {
        ScaffoldAggregate::default()
    }

    fn single(item: &Self::Item) -> Self {
        ScaffoldAggregate {
            node_count: 1,
            total_len: item.length_bp,
        }
    }

    fn merge(left: &Self, mid: &Self, right: &Self) -> Self {
        ScaffoldAggregate {
            node_count: left.node_count + mid.node_count + right.node_count,
            total_len: left.total_len + mid.total_len + right.total_len,
        }
    }

    // Scaffold-tree nodes carry no orientation; reversal never applies.
}

impl CountedAggregate for ScaffoldAggregate {
    fn count(agg: &Self) -> u64 {
        agg.node_count
    }
}

pub struct ScaffoldTree {
    engine: Treap<ScaffoldAggregate>,
    root: Idx,
    next_scaffold_id: u64,
}

impl ScaffoldTree {
    /// A fresh tree covering `[0, total_length_bp)` as a single unscaffolded
    /// gap, the state of a freshly loaded assembly before any AGP scaffold
    /// records are applied.
    pub fn new(total_length_bp: u64) -> Self {
        let mut engine = Treap::new();
        let root = if total_length_bp > 0 {
            engine.create(ScaffoldTreeItem {
                length_bp: total_length_bp,
                descriptor: None,
            })
        } else {
            NIL
        };
        ScaffoldTree {
            engine,
            root,
            next_scaffold_id: 0,
        }
    }

    pub fn total_length(&self) -> u64 {
        self.engine.agg(self.root).total_len
    }

    pub fn node_count(&self) -> u64 {
        self.engine.node_count(self.root)
    }

    /// In-order visit of every interval node, scaffolded or gap
    /// (`get_ordered_scaffolds`, `spec.md` §6.3).
    pub fn traverse(&mut self, visitor: &mut impl FnMut(&ScaffoldTreeItem)) {
        let root = self.root;
        self.engine.traverse(root, visitor);
    }

    /// Locates the node covering bp offset `p` within `root`'s subtree,
    /// returning its index and its own start offset (relative to `root`).
    /// Non-destructive: only pushes (no-op) lazy flags, never restructures.
    fn locate(&mut self, root: Idx, p: u64) -> (Idx, u64) {
        assert!(root != NIL, "locate: p={p} out of range of an empty tree");
        let [l, r] = self.engine.children(root);
        let wl = self.engine.agg(l).total_len;
        if p < wl {
            return self.locate(l, p);
        }
        let own = self.engine.item(root).length_bp;
        if p < wl + own {
            return (root, wl);
        }
        let (idx, start) = self.locate(r, p - wl - own);
        (idx, start + wl + own)
    }

    pub fn get_scaffold_at_bp(&mut self, p: u64) -> Option<Arc<ScaffoldDescriptor>> {
        if self.root == NIL || p >= self.total_length() {
            return None;
        }
        let (idx, _) = self.locate(self.root, p);
        self.engine.item(idx).descriptor.clone()
    }

    /// `split_bp(node, p)`: structural split at bp offset `p`. A node whose
    /// span straddles `p` is cloned into two halves with the same
    /// descriptor, each keeping a positive length — this is what lets
    /// every higher-level edit cut the tree at an arbitrary bp offset.
    fn split_bp(&mut self, u: Idx, p: u64) -> (Idx, Idx) {
        if u == NIL {
            assert_eq!(p, 0, "split_bp: p out of range of an empty subtree");
            return (NIL, NIL);
        }
        let [l, r] = self.engine.children(u);
        let wl = self.engine.agg(l).total_len;
        let own = self.engine.item(u).length_bp;
        if p <= wl {
            let (ll, lr) = self.split_bp(l, p);
            // `u` keeps its own item and `r`, losing its left child: it
            // becomes the subtree "own + r", prefixed by whatever `lr`
            // contributed from the left split.
            self.engine.set_children(u, NIL, r);
            let right_part = self.engine.concat(lr, u);
            (ll, right_part)
        } else if p < wl + own {
            let descriptor = self.engine.item(u).descriptor.clone();
            let left_leaf = self.engine.create(ScaffoldTreeItem {
                length_bp: p - wl,
                descriptor: descriptor.clone(),
            });
            let right_leaf = self.engine.create(ScaffoldTreeItem {
                length_bp: wl + own - p,
                descriptor,
            });
            (self.engine.concat(l, left_leaf), self.engine.concat(right_leaf, r))
        } else {
            let (rl, rr) = self.split_bp(r, p - wl - own);
            self.engine.set_children(u, l, NIL);
            let left_part = self.engine.concat(u, rl);
            (left_part, rr)
        }
    }

    /// Concatenates `l` and `r`, first merging their touching ends into one
    /// node if they carry the same descriptor — the "adjacent same-
    /// descriptor nodes are merged" invariant (`spec.md` §4.2 (i)).
    fn concat_coalescing(&mut self, l: Idx, r: Idx) -> Idx {
        if l == NIL {
            return r;
        }
        if r == NIL {
            return l;
        }
        let l_total = self.engine.agg(l).total_len;
        let (last_idx, _) = self.locate(l, l_total - 1);
        let (first_idx, _) = self.locate(r, 0);
        let last_item = self.engine.item(last_idx).clone();
        let first_item = self.engine.item(first_idx).clone();
        if last_item.descriptor == first_item.descriptor {
            let (l2, _) = self.engine.split_by_count(l, self.engine.node_count(l) - 1);
            let (_, r2) = self.engine.split_by_count(r, 1);
            let merged = self.engine.create(ScaffoldTreeItem {
                length_bp: last_item.length_bp + first_item.length_bp,
                descriptor: last_item.descriptor,
            });
            let left = self.engine.concat(l2, merged);
            self.engine.concat(left, r2)
        } else {
            self.engine.concat(l, r)
        }
    }

    /// `extend_borders_to_scaffolds(l, r)`: the smallest `[l', r') ⊇ [l, r)`
    /// whose endpoints don't strictly interior-intersect any scaffolded
    /// node.
    pub fn extend_borders_to_scaffolds(&mut self, l: u64, r: u64) -> (u64, u64) {
        let total = self.total_length();
        let l2 = if l < total {
            let (idx, start) = self.locate(self.root, l);
            let scaffolded = self.engine.item(idx).descriptor.is_some();
            if scaffolded && l != start {
                start
            } else {
                l
            }
        } else {
            l
        };
        let r2 = if r < total {
            let (idx, start) = self.locate(self.root, r);
            let own = self.engine.item(idx).length_bp;
            let scaffolded = self.engine.item(idx).descriptor.is_some();
            if scaffolded && r != start {
                start + own
            } else {
                r
            }
        } else {
            r
        };
        (l2, r2)
    }

    /// `add_scaffold(l, r, descriptor)`: replaces `[l, r)` with one node
    /// carrying `descriptor`, coalescing with same-descriptor neighbours.
    pub fn add_scaffold(&mut self, l: u64, r: u64, descriptor: Option<Arc<ScaffoldDescriptor>>) {
        assert!(l < r, "add_scaffold: l must be < r");
        let total = self.total_length();
        let mut l2 = l;
        if l2 > 0 {
            let (idx, start) = self.locate(self.root, l2 - 1);
            if self.engine.item(idx).descriptor == descriptor {
                l2 = start;
            }
        }
        let mut r2 = r;
        if r2 < total {
            let (idx, start) = self.locate(self.root, r2);
            let own = self.engine.item(idx).length_bp;
            if self.engine.item(idx).descriptor == descriptor {
                r2 = start + own;
            }
        }
        let root = self.root;
        self.root = NIL;
        let (before, rest) = self.split_bp(root, l2);
        let (_mid, after) = self.split_bp(rest, r2 - l2);
        let new_node = self.engine.create(ScaffoldTreeItem {
            length_bp: r2 - l2,
            descriptor,
        });
        let with_before = self.engine.concat(before, new_node);
        self.root = self.engine.concat(with_before, after);
    }

    /// `rescaffold(l, r, spacer)`: extends borders, then adds a new
    /// descriptor with a fresh id and (if `name` is absent) a generated
    /// name, analogous to the `unscaffolded_{contig_name}` naming AGP
    /// export uses for singleton scaffolds.
    pub fn rescaffold(&mut self, l: u64, r: u64, name: Option<String>, spacer: u64) -> ScaffoldId {
        let (l2, r2) = self.extend_borders_to_scaffolds(l, r);
        let id = ScaffoldId(self.next_scaffold_id);
        self.next_scaffold_id += 1;
        let name = name.unwrap_or_else(|| format!("scaffold_{}", id.0));
        debug!("rescaffold [{l2},{r2}) -> {name}");
        let descriptor = Arc::new(ScaffoldDescriptor {
            scaffold_id: id,
            name,
            spacer_length: spacer,
        });
        self.add_scaffold(l2, r2, Some(descriptor));
        id
    }

    pub fn unscaffold(&mut self, l: u64, r: u64) {
        let (l2, r2) = self.extend_borders_to_scaffolds(l, r);
        self.add_scaffold(l2, r2, None);
    }

    /// `remove_segment_from_assembly(l, r)`: shrinks the total length by
    /// `r - l`.
    pub fn remove_segment_from_assembly(&mut self, l: u64, r: u64) {
        assert!(l < r);
        let root = self.root;
        self.root = NIL;
        let (before, rest) = self.split_bp(root, l);
        let (_mid, after) = self.split_bp(rest, r - l);
        self.root = self.concat_coalescing(before, after);
    }

    /// `move_selection_range(l, r, target_start)`: removes `[l, r)`, then
    /// re-inserts it starting at `target_start` in the post-removal
    /// coordinate space.
    pub fn move_selection_range(&mut self, l: u64, r: u64, target_start: u64) {
        assert!(l < r);
        let root = self.root;
        self.root = NIL;
        let (before, rest) = self.split_bp(root, l);
        let (mid, after) = self.split_bp(rest, r - l);
        let remainder = self.concat_coalescing(before, after);
        let (left, right) = self.split_bp(remainder, target_start);
        let with_mid = self.concat_coalescing(left, mid);
        self.root = self.concat_coalescing(with_mid, right);
    }
}
