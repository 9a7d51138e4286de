//! Contig descriptors: the immutable (post-load) payload carried by each
//! contig-tree node. Grounded on `spec.md` §3 "Contig descriptor".

use std::collections::HashMap;

use crate::stripe::Atu;
use crate::units::{Direction, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContigId(pub u64);

/// Visibility of a contig at a given resolution. `Forced*` is set at load
/// time from the block store and inherited across splits; `Auto*` is
/// derived from the contig's bp length relative to the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    ForcedShown,
    ForcedHidden,
    AutoShown,
    AutoHidden,
}

impl Presence {
    pub fn is_hidden(self) -> bool {
        matches!(self, Presence::ForcedHidden | Presence::AutoHidden)
    }

    pub fn is_forced(self) -> bool {
        matches!(self, Presence::ForcedShown | Presence::ForcedHidden)
    }

    /// `AutoShown` iff `length_bp >= resolution`, else `AutoHidden`.
    pub fn auto_for_length(length_bp: u64, resolution: Resolution) -> Presence {
        if length_bp >= resolution as u64 {
            Presence::AutoShown
        } else {
            Presence::AutoHidden
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContigDescriptor {
    pub contig_id: ContigId,
    pub name: String,
    pub length_bp: u64,
    pub length_at_resolution: HashMap<Resolution, u64>,
    pub presence_at_resolution: HashMap<Resolution, Presence>,
    /// ATUs in source (forward) order, per resolution.
    pub source_atus: HashMap<Resolution, Vec<Atu>>,
    /// Inclusive cumulative ATU lengths in source order; the last entry
    /// equals `length_at_resolution[R]`.
    pub atu_prefix_sum_bins: HashMap<Resolution, Vec<u64>>,
    pub contig_name_in_source_fasta: String,
    pub offset_inside_fasta_contig: u64,
}

impl ContigDescriptor {
    pub fn new(
        contig_id: ContigId,
        name: String,
        length_bp: u64,
        contig_name_in_source_fasta: String,
    ) -> Self {
        ContigDescriptor {
            contig_id,
            name,
            length_bp,
            length_at_resolution: HashMap::new(),
            presence_at_resolution: HashMap::new(),
            source_atus: HashMap::new(),
            atu_prefix_sum_bins: HashMap::new(),
            contig_name_in_source_fasta,
            offset_inside_fasta_contig: 0,
        }
    }

    /// Installs the ATU list for `resolution`, deriving its prefix sum and
    /// checking the `sum(atu lengths) = length_at_resolution[R]` invariant.
    pub fn set_atus(&mut self, resolution: Resolution, atus: Vec<Atu>) {
        let mut acc = 0u64;
        let prefix: Vec<u64> = atus
            .iter()
            .map(|a| {
                acc += a.len();
                acc
            })
            .collect();
        if let Some(&declared) = self.length_at_resolution.get(&resolution) {
            assert_eq!(
                acc, declared,
                "contig {:?}: atu lengths at R={} sum to {}, declared length is {}",
                self.contig_id, resolution, acc, declared
            );
        } else {
            self.length_at_resolution.insert(resolution, acc);
        }
        self.atu_prefix_sum_bins.insert(resolution, prefix);
        self.source_atus.insert(resolution, atus);
    }

    pub fn length_at(&self, resolution: Resolution) -> u64 {
        *self
            .length_at_resolution
            .get(&resolution)
            .unwrap_or_else(|| panic!("contig {:?} has no length at R={}", self.contig_id, resolution))
    }

    pub fn presence_at(&self, resolution: Resolution) -> Presence {
        *self
            .presence_at_resolution
            .get(&resolution)
            .unwrap_or_else(|| panic!("contig {:?} has no presence at R={}", self.contig_id, resolution))
    }

    /// ATUs at `resolution`, reordered and direction-flipped to reflect
    /// `effective_direction`. Never mutates `source_atus`.
    pub fn effective_atus(&self, resolution: Resolution, effective_direction: Direction) -> Vec<Atu> {
        let source = &self.source_atus[&resolution];
        match effective_direction {
            Direction::Forward => source.clone(),
            Direction::Reversed => source
                .iter()
                .rev()
                .map(|a| Atu {
                    stripe_id: a.stripe_id,
                    start_incl: a.start_incl,
                    end_excl: a.end_excl,
                    direction: a.direction.flipped(),
                })
                .collect(),
        }
    }

    /// Cumulative ATU lengths in the order they are actually traversed
    /// under `effective_direction`, computed locally without touching the
    /// stored (always source-order) `atu_prefix_sum_bins`.
    pub fn effective_prefix_sum(&self, resolution: Resolution, effective_direction: Direction) -> Vec<u64> {
        let source = &self.atu_prefix_sum_bins[&resolution];
        match effective_direction {
            Direction::Forward => source.clone(),
            Direction::Reversed => {
                let total = *source.last().unwrap_or(&0);
                let n = source.len();
                (0..n)
                    .map(|k| {
                        if k + 1 == n {
                            total
                        } else {
                            total - source[n - 2 - k]
                        }
                    })
                    .collect()
            }
        }
    }
}
