//! The on-disk block store's read-only interface (`spec.md` §6.1), and an
//! in-memory reference implementation used by tests and benchmarks.
//!
//! The real container is a chunked hierarchical file (HDF5 in
//! `original_source/hict/core/chunked_file.py`); `spec.md` §1 names it an
//! external collaborator and specifies only the interface it exposes. That
//! interface is this trait.

use std::collections::HashMap;

use crate::contig::{ContigId, Presence};
use crate::matrix::DenseMatrix;
use crate::scaffold::ScaffoldId;
use crate::stripe::{Atu, Stripe, StripeId};
use crate::units::{Direction, Resolution};

/// One `(r, c)` block of the on-disk sparse/dense block matrix,
/// `r = min(row_stripe, col_stripe)`, `c = max(...)` (`spec.md` §6.1).
#[derive(Debug, Clone)]
pub enum BlockData {
    Empty,
    Dense(DenseMatrix),
    /// `(row_idx, col_idx, value)` triples into a `row_len × col_len`
    /// matrix, densified by the caller.
    Sparse(Vec<(u32, u32, f64)>),
}

/// Everything the block store records about one contig in its original,
/// on-disk order (`/contig_info/*` plus the per-resolution `/contigs/*`
/// tables of `spec.md` §6.1).
#[derive(Debug, Clone)]
pub struct ContigRecord {
    pub contig_id: ContigId,
    pub name: String,
    pub length_bp: u64,
    /// Initial orientation from `/contig_info/contig_direction`.
    pub direction: Direction,
    /// Initial scaffold grouping from `/contig_info/contig_scaffold_id`,
    /// `None` for `< 0` (unscaffolded). Not applied automatically on open
    /// (`original_source`'s `open()` leaves scaffold restoration commented
    /// out and starts from a single gap) — callers that want it can use
    /// this to build scaffolds explicitly after opening.
    pub scaffold_id: Option<ScaffoldId>,
    pub length_at_resolution: HashMap<Resolution, u64>,
    /// Explicit `Forced*` entries only; resolutions absent here get the
    /// load-time `Auto*` default derived from `length_bp` vs. resolution.
    pub forced_presence_at_resolution: HashMap<Resolution, Presence>,
    pub atus_at_resolution: HashMap<Resolution, Vec<Atu>>,
    pub name_in_source_fasta: String,
    pub offset_inside_fasta_contig: u64,
}

/// The read-only interface the core consumes from the block store
/// (`spec.md` §6.1, §6.3). `Send + Sync` so an opened assembly (`spec.md`
/// §5's "parallel readers" model) can actually be shared across threads.
pub trait BlockStore: Send + Sync {
    fn resolutions(&self) -> &[Resolution];

    /// `MSS(R)`: the configured max stripe size at `resolution`.
    fn mss(&self, resolution: Resolution) -> u64;

    fn stripe_count(&self, resolution: Resolution) -> u64;

    fn stripe(&self, resolution: Resolution, id: StripeId) -> &Stripe;

    /// `index(r, c) = r·S + c`, `r ≤ c`. Callers pass already-ordered ids.
    fn block(&self, resolution: Resolution, row: StripeId, col: StripeId) -> BlockData;

    /// `/contig_info/ordered_contig_ids`: the contig load order.
    fn ordered_contig_ids(&self) -> &[ContigId];

    fn contig_record(&self, id: ContigId) -> &ContigRecord;
}

/// A fully in-memory [`BlockStore`], built directly from assembled records
/// rather than from a file. Used by tests and benchmarks in place of the
/// real HDF5-backed container.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlockStore {
    pub resolutions: Vec<Resolution>,
    pub mss: HashMap<Resolution, u64>,
    pub stripes: HashMap<Resolution, Vec<Stripe>>,
    /// Keyed by `(r, c)` stripe-id pairs with `r.0 <= c.0`.
    pub blocks: HashMap<Resolution, HashMap<(u64, u64), BlockData>>,
    pub ordered_contig_ids: Vec<ContigId>,
    pub contigs: HashMap<ContigId, ContigRecord>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }

    fn mss(&self, resolution: Resolution) -> u64 {
        *self.mss.get(&resolution).unwrap_or_else(|| panic!("no MSS configured for R={resolution}"))
    }

    fn stripe_count(&self, resolution: Resolution) -> u64 {
        self.stripes.get(&resolution).map(|v| v.len() as u64).unwrap_or(0)
    }

    fn stripe(&self, resolution: Resolution, id: StripeId) -> &Stripe {
        &self.stripes[&resolution][id.0 as usize]
    }

    fn block(&self, resolution: Resolution, row: StripeId, col: StripeId) -> BlockData {
        let (r, c) = if row.0 <= col.0 { (row.0, col.0) } else { (col.0, row.0) };
        self.blocks
            .get(&resolution)
            .and_then(|m| m.get(&(r, c)))
            .cloned()
            .unwrap_or(BlockData::Empty)
    }

    fn ordered_contig_ids(&self) -> &[ContigId] {
        &self.ordered_contig_ids
    }

    fn contig_record(&self, id: ContigId) -> &ContigRecord {
        &self.contigs[&id]
    }
}
