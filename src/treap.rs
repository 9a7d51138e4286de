//! A generic arena-based treap (Cartesian tree) keyed by implicit position,
//! with a lazily propagated "flip" bit for O(1) subtree reversal.
//!
//! This is the shared split/merge engine behind both the contig tree
//! ([`crate::contig_tree`]) and the scaffold tree ([`crate::scaffold_tree`]):
//! one generic implementation instantiated twice with different item and
//! aggregate types, the same way the teacher's `Treaps<Ag>` backs both an
//! Euler Tour Tree and a Link Cut Tree.
//!
//! Callers always operate through an explicit subtree root handle ([`Idx`])
//! they keep track of themselves; there are no parent pointers, since every
//! operation here is either a top-down descent from a known root or the
//! combination of two known roots.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Index of a node in the arena. [`NIL`] represents the absence of a node.
pub type Idx = usize;

/// Sentinel for "no node here". Mirrors the teacher's `Lists::EMPTY`.
pub const NIL: Idx = usize::MAX;

/// Data aggregated over a subtree, merged bottom-up from single items.
///
/// `empty()` is the identity element used when a node has no left or no
/// right child, so `merge` never needs to special-case a missing side.
///
/// Implementations used by this crate are all commutative sums (total bp,
/// per-resolution bin/pixel counts, node counts, interval lengths), so
/// [`Aggregate::reverse_agg`] is the identity for every concrete type here:
/// reversing a subtree's visitation order never changes a sum. The hook is
/// kept (rather than assumed away) so the engine stays correct if a future
/// aggregate ever needs genuine order-sensitivity.
pub trait Aggregate: Clone {
    type Item;
    fn empty() -> Self;
    fn single(item: &Self::Item) -> Self;
    fn merge(left: &Self, mid: &Self, right: &Self) -> Self;
    fn reverse_agg(self) -> Self {
        self
    }
    /// Applied to a node's own item when its subtree's flip bit is pushed
    /// down. For items with no orientation (e.g. scaffold-tree intervals),
    /// the default no-op is correct.
    fn reverse_item(_item: &mut Self::Item) {}
}

struct Node<A: Aggregate> {
    item: A::Item,
    agg: A,
    children: [Idx; 2],
    priority: u32,
    flip: bool,
}

/// An arena of treap nodes. A "tree" in this module is just a root [`Idx`]
/// into this arena; the same arena can (and does) hold many disjoint trees
/// at once, exactly as the teacher's `Treaps` holds many disjoint lists.
pub struct Treap<A: Aggregate> {
    nodes: Vec<Node<A>>,
    rng: StdRng,
}

impl<A: Aggregate> Default for Treap<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregate> Treap<A> {
    pub fn new() -> Self {
        Self::with_seed(0x4849_4354)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Allocates a new single-node subtree and returns its root.
    pub fn create(&mut self, item: A::Item) -> Idx {
        let idx = self.nodes.len();
        let agg = A::single(&item);
        let priority = self.rng.gen();
        self.nodes.push(Node {
            item,
            agg,
            children: [NIL, NIL],
            priority,
            flip: false,
        });
        idx
    }

    pub fn item(&self, u: Idx) -> &A::Item {
        &self.nodes[u].item
    }

    /// Aggregate of the subtree rooted at `u`, or [`Aggregate::empty`] for
    /// `NIL`. O(1), and correct even if an ancestor has pending unpushed
    /// flips above `u` — aggregates here are always order-invariant sums,
    /// per the [`Aggregate::reverse_agg`] default.
    pub fn agg(&self, u: Idx) -> A {
        if u == NIL {
            A::empty()
        } else {
            self.nodes[u].agg.clone()
        }
    }

    /// Pushes this node's flip bit onto its children and clears it, making
    /// `children()`/mutation below `u` observe materialized structure.
    fn push_down(&mut self, u: Idx) {
        if u == NIL {
            return;
        }
        if self.nodes[u].flip {
            self.nodes[u].flip = false;
            self.nodes[u].children.swap(0, 1);
            for c in self.nodes[u].children {
                if c != NIL {
                    self.nodes[c].flip ^= true;
                }
            }
            A::reverse_item(&mut self.nodes[u].item);
        }
    }

    /// Materialized children of `u`, after pushing any pending flip.
    pub fn children(&mut self, u: Idx) -> [Idx; 2] {
        if u == NIL {
            return [NIL, NIL];
        }
        self.push_down(u);
        self.nodes[u].children
    }

    /// Recomputes `u`'s cached aggregate from its current children and own
    /// item. Must be called after any change to `u`'s children.
    fn recalc(&mut self, u: Idx) {
        let [l, r] = self.nodes[u].children;
        let left = self.agg(l);
        let right = self.agg(r);
        let own = A::single(&self.nodes[u].item);
        self.nodes[u].agg = A::merge(&left, &own, &right);
    }

    /// Replaces `u`'s children wholesale and recomputes its aggregate.
    /// Exposed for callers (the scaffold tree's `split_bp`) that need to
    /// rebuild a node's structure directly rather than through
    /// `concat`/`split_by_weight`.
    pub fn set_children(&mut self, u: Idx, left: Idx, right: Idx) -> Idx {
        self.nodes[u].children = [left, right];
        self.recalc(u);
        u
    }

    /// Marks the whole subtree rooted at `u` for reversal. O(1).
    pub fn reverse(&mut self, u: Idx) {
        if u != NIL {
            self.nodes[u].flip ^= true;
        }
    }

    /// Concatenates two subtrees, assuming every item in `l` precedes every
    /// item in `r`. Standard priority-ordered treap merge.
    pub fn concat(&mut self, l: Idx, r: Idx) -> Idx {
        if l == NIL {
            return r;
        }
        if r == NIL {
            return l;
        }
        self.push_down(l);
        self.push_down(r);
        if self.nodes[l].priority > self.nodes[r].priority {
            let rl = self.nodes[l].children[1];
            let merged = self.concat(rl, r);
            self.nodes[l].children[1] = merged;
            self.recalc(l);
            l
        } else {
            let lr = self.nodes[r].children[0];
            let merged = self.concat(l, lr);
            self.nodes[r].children[0] = merged;
            self.recalc(r);
            r
        }
    }

    /// Splits `u` so that the first `k` units of `weight` (as measured by
    /// `weight`, a monotone projection of the aggregate such as node count,
    /// total bp, or bins/pixels at some resolution) go left. A node whose
    /// own span straddles the cut point (`wl < k < wl + own`) is never
    /// split: it goes whole to the left when `incl_equal_left` is true and
    /// whole to the right otherwise. A cut point that lands exactly on a
    /// node boundary (`k <= wl` or `k >= wl + own`) behaves identically
    /// regardless of the flag — only genuine straddling is flag-dependent.
    pub fn split_by_weight<F: Fn(&A) -> u64>(
        &mut self,
        u: Idx,
        k: u64,
        weight: &F,
        incl_equal_left: bool,
    ) -> (Idx, Idx) {
        if u == NIL {
            return (NIL, NIL);
        }
        self.push_down(u);
        let [l, r] = self.nodes[u].children;
        let wl = weight(&self.agg(l));
        let own = weight(&A::single(&self.nodes[u].item));
        if k <= wl {
            // The cut falls at or before this node's own span: this node
            // and its right child stay right; recurse into the left
            // subtree with the same budget.
            let (ll, lr) = self.split_by_weight(l, k, weight, incl_equal_left);
            self.nodes[u].children[0] = NIL;
            self.recalc(u);
            let right_part = self.concat(lr, u);
            (ll, right_part)
        } else if k < wl + own {
            // Straddle: the cut lands strictly inside this node's own
            // span. The node is never split; `incl_equal_left` decides
            // which side it goes to whole. `u` already has `l`/`r` as its
            // children, so clearing the *other* side and recalculating
            // turns `u` itself into the merged "own + kept side" subtree.
            if incl_equal_left {
                self.nodes[u].children[1] = NIL;
                self.recalc(u);
                (u, r)
            } else {
                self.nodes[u].children[0] = NIL;
                self.recalc(u);
                (l, u)
            }
        } else {
            // k >= wl + own: this node (and all of its left subtree) goes
            // left; recurse into the right subtree with the remaining
            // budget.
            let k2 = k - wl - own;
            let (rl, rr) = self.split_by_weight(r, k2, weight, incl_equal_left);
            self.nodes[u].children[1] = NIL;
            self.recalc(u);
            let left_part = self.concat(u, rl);
            (left_part, rr)
        }
    }

    /// Splits `u` so that exactly the first `k` nodes (by in-order count)
    /// go left.
    pub fn split_by_count(&mut self, u: Idx, k: u64) -> (Idx, Idx)
    where
        A: CountedAggregate,
    {
        self.split_by_weight(u, k, &A::count, true)
    }

    /// Visits every item in `u`'s subtree in order, pushing down lazy flips
    /// as it descends so each visited item reflects its true orientation.
    pub fn traverse(&mut self, u: Idx, visitor: &mut impl FnMut(&A::Item)) {
        if u == NIL {
            return;
        }
        let [l, r] = self.children(u);
        self.traverse(l, visitor);
        visitor(&self.nodes[u].item);
        self.traverse(r, visitor);
    }

    /// Number of nodes in `u`'s subtree, via a counted aggregate.
    pub fn node_count(&self, u: Idx) -> u64
    where
        A: CountedAggregate,
    {
        A::count(&self.agg(u))
    }

    pub fn is_empty_tree(&self, u: Idx) -> bool {
        u == NIL
    }

    /// Replaces a single node's item in place (no structural change) and
    /// recomputes its cached aggregate. Used by contig-split, which turns
    /// one tree node into a shorter contig without touching tree shape.
    pub fn set_item(&mut self, u: Idx, item: A::Item) {
        self.nodes[u].item = item;
        self.recalc(u);
    }
}

/// Aggregate types that track a subtree node count, required for
/// [`Treap::split_by_count`]/[`Treap::node_count`].
pub trait CountedAggregate: Aggregate {
    fn count(agg: &Self) -> u64;
}
