//! The top-level assembly facade (`spec.md` §6.3): the `Open`/`Closed`
//! lifecycle plus the eleven operations a caller drives a Hi-C assembly
//! through, grounded on `original_source/hict/core/contact_tree.py`'s
//! `ContactMatrixFacet.open_file`/`close_file` state machine. Every mutating
//! operation acquires the contig tree and (when both are touched) the
//! scaffold tree in that fixed order, per `spec.md` §5.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::agp;
use crate::assembler;
use crate::block_store::BlockStore;
use crate::contig::{ContigDescriptor, ContigId, Presence};
use crate::contig_tree::{ContigTree, ContigTreeItem};
use crate::error::{HictError, Result};
use crate::matrix::DenseMatrix;
use crate::scaffold::{ScaffoldDescriptor, ScaffoldId};
use crate::scaffold_tree::ScaffoldTree;
use crate::stripe::Atu;
use crate::units::{BasePairInPixelPosition, Direction, QueryUnit, Resolution};

struct Opened {
    store: Box<dyn BlockStore>,
    contig_tree: RwLock<ContigTree>,
    scaffold_tree: RwLock<ScaffoldTree>,
    contigs_by_name: HashMap<String, Arc<ContigDescriptor>>,
    resolutions: Vec<Resolution>,
    r_min: Resolution,
    next_contig_id: AtomicU64,
}

impl Opened {
    fn next_contig_id(&self) -> u64 {
        self.next_contig_id.fetch_add(1, Ordering::Relaxed)
    }
}

enum State {
    Closed,
    Opened(Opened),
}

/// An open-or-closed Hi-C assembly: the contig tree, the scaffold tree, and
/// the read-only block store backing them, behind the `IncorrectFileState`
/// lifecycle check `spec.md` §7 requires of every operation below.
pub struct HictAssembly {
    state: RwLock<State>,
}

impl Default for HictAssembly {
    fn default() -> Self {
        Self::new()
    }
}

impl HictAssembly {
    pub fn new() -> Self {
        HictAssembly {
            state: RwLock::new(State::Closed),
        }
    }

    /// Builds the contig tree (in on-disk load order) and a fresh, entirely
    /// unscaffolded scaffold tree from `store`. Mirrors
    /// `original_source`'s `open()`, which likewise starts scaffolding from a
    /// single gap rather than restoring `contig_scaffold_id` automatically.
    pub fn open(&self, store: Box<dyn BlockStore>) -> Result<()> {
        let resolutions = store.resolutions().to_vec();
        let r_min = *resolutions.iter().min().expect("block store must declare at least one resolution");

        let mut contig_tree = ContigTree::new();
        let mut contigs_by_name = HashMap::new();
        let mut total_bp = 0u64;
        let mut max_id = 0u64;

        for &cid in store.ordered_contig_ids() {
            let rec = store.contig_record(cid);
            let mut descriptor = ContigDescriptor::new(rec.contig_id, rec.name.clone(), rec.length_bp, rec.name_in_source_fasta.clone());
            descriptor.offset_inside_fasta_contig = rec.offset_inside_fasta_contig;
            for &r in &resolutions {
                let len = *rec
                    .length_at_resolution
                    .get(&r)
                    .unwrap_or_else(|| panic!("contig {} has no length_at_resolution[{r}]", rec.name));
                descriptor.length_at_resolution.insert(r, len);
                let presence = rec.forced_presence_at_resolution.get(&r).copied().unwrap_or_else(|| {
                    if r == r_min {
                        Presence::ForcedShown
                    } else {
                        Presence::auto_for_length(rec.length_bp, r)
                    }
                });
                descriptor.presence_at_resolution.insert(r, presence);
                let atus = rec
                    .atus_at_resolution
                    .get(&r)
                    .unwrap_or_else(|| panic!("contig {} has no ATUs at R={r}", rec.name))
                    .clone();
                descriptor.set_atus(r, atus);
            }

            max_id = max_id.max(rec.contig_id.0);
            total_bp += rec.length_bp;
            let descriptor = Arc::new(descriptor);
            contigs_by_name.insert(rec.name.clone(), descriptor.clone());
            contig_tree.push_back(descriptor, rec.direction);
        }

        let opened = Opened {
            store,
            contig_tree: RwLock::new(contig_tree),
            scaffold_tree: RwLock::new(ScaffoldTree::new(total_bp)),
            contigs_by_name,
            resolutions,
            r_min,
            next_contig_id: AtomicU64::new(max_id + 1),
        };
        *self.state.write().unwrap() = State::Opened(opened);
        Ok(())
    }

    pub fn close(&self) {
        *self.state.write().unwrap() = State::Closed;
    }

    fn with_opened<T>(&self, f: impl FnOnce(&Opened) -> Result<T>) -> Result<T> {
        let state = self.state.read().unwrap();
        match &*state {
            State::Opened(o) => f(o),
            State::Closed => Err(HictError::IncorrectFileState),
        }
    }

    pub fn get_matrix_size_bins(&self, resolution: Resolution) -> Result<u64> {
        self.with_opened(|o| {
            if !o.resolutions.contains(&resolution) {
                return Err(HictError::IncorrectResolution(resolution));
            }
            Ok(o.contig_tree.read().unwrap().total_size(QueryUnit::Bins, resolution))
        })
    }

    pub fn get_matrix_size_pixels(&self, resolution: Resolution) -> Result<u64> {
        self.with_opened(|o| {
            if !o.resolutions.contains(&resolution) {
                return Err(HictError::IncorrectResolution(resolution));
            }
            Ok(o.contig_tree.read().unwrap().total_size(QueryUnit::Pixels, resolution))
        })
    }

    /// `(x0, y0)`/`(x1, y1)` are the row/column start and end bounds,
    /// expressed in `unit` at `resolution`; converted internally to the bin
    /// or pixel index space the resolver operates in (`spec.md` §4.3/§4.4).
    #[allow(clippy::too_many_arguments)]
    pub fn get_dense_submatrix(
        &self,
        resolution: Resolution,
        x0: u64,
        y0: u64,
        x1: u64,
        y1: u64,
        unit: QueryUnit,
        exclude_hidden: bool,
    ) -> Result<(DenseMatrix, Vec<f64>, Vec<f64>)> {
        self.with_opened(|o| {
            if !o.resolutions.contains(&resolution) {
                return Err(HictError::IncorrectResolution(resolution));
            }
            let target_unit = if exclude_hidden { QueryUnit::Pixels } else { QueryUnit::Bins };
            let mut ct = o.contig_tree.write().unwrap();
            let row_start = ct.convert_units(x0, resolution, unit, resolution, target_unit);
            let row_end = ct.convert_units(x1, resolution, unit, resolution, target_unit);
            let col_start = ct.convert_units(y0, resolution, unit, resolution, target_unit);
            let col_end = ct.convert_units(y1, resolution, unit, resolution, target_unit);
            let sub = assembler::get_dense_submatrix(o.store.as_ref(), &mut ct, resolution, row_start, col_start, row_end, col_end, exclude_hidden)?;
            Ok((sub.matrix, sub.row_weights, sub.col_weights))
        })
    }

    pub fn get_px_by_bp(&self, bp: u64, resolution: Resolution) -> Result<BasePairInPixelPosition> {
        self.with_opened(|o| {
            if !o.resolutions.contains(&resolution) {
                return Err(HictError::IncorrectResolution(resolution));
            }
            let mut ct = o.contig_tree.write().unwrap();
            let bins = ct.convert_units(bp, resolution, QueryUnit::Bp, resolution, QueryUnit::Bins);
            let pixels = ct.convert_units(bp, resolution, QueryUnit::Bp, resolution, QueryUnit::Pixels);
            Ok(BasePairInPixelPosition { bp, bins, pixels })
        })
    }

    pub fn convert_units(&self, position: u64, from_resolution: Resolution, from_unit: QueryUnit, to_resolution: Resolution, to_unit: QueryUnit) -> Result<u64> {
        self.with_opened(|o| {
            if from_unit != QueryUnit::Bp && !o.resolutions.contains(&from_resolution) {
                return Err(HictError::IncorrectResolution(from_resolution));
            }
            if to_unit != QueryUnit::Bp && !o.resolutions.contains(&to_resolution) {
                return Err(HictError::IncorrectResolution(to_resolution));
            }
            Ok(o.contig_tree.write().unwrap().convert_units(position, from_resolution, from_unit, to_resolution, to_unit))
        })
    }

    /// `spec.md` §4.7: extend borders via the scaffold tree, then reverse
    /// the exposed contig-tree segment in place.
    pub fn reverse_selection_range_bp(&self, l: u64, r: u64) -> Result<()> {
        self.with_opened(|o| {
            if l >= r {
                return Err(HictError::IncorrectRange { start: l, end: r });
            }
            let (l2, r2) = o.scaffold_tree.write().unwrap().extend_borders_to_scaffolds(l, r);
            let mut ct = o.contig_tree.write().unwrap();
            let (less, segment, greater) = ct.expose_segment(l2, r2, QueryUnit::Bp, o.r_min);
            ct.reverse_subtree(segment);
            ct.commit_exposed_segment(less, segment, greater);
            Ok(())
        })
    }

    /// `spec.md` §4.7: extend borders, expose, merge `less`/`greater` into a
    /// remainder, split that remainder at `target_start` (post-removal
    /// coordinates, per `spec.md` §9 Open Question (b)), and reinsert the
    /// segment there; then apply the same move to the scaffold tree.
    pub fn move_selection_range_bp(&self, l: u64, r: u64, target_start: u64) -> Result<()> {
        self.with_opened(|o| {
            if l >= r {
                return Err(HictError::IncorrectRange { start: l, end: r });
            }
            let (l2, r2) = o.scaffold_tree.write().unwrap().extend_borders_to_scaffolds(l, r);
            {
                let mut ct = o.contig_tree.write().unwrap();
                let (less, segment, greater) = ct.expose_segment(l2, r2, QueryUnit::Bp, o.r_min);
                let remainder = ct.concat(less, greater);
                let (nl, nr) = ct.split_by_length(remainder, target_start, QueryUnit::Bp, o.r_min, false);
                let with_segment = ct.concat(nl, segment);
                let new_root = ct.concat(with_segment, nr);
                ct.set_root(new_root);
            }
            o.scaffold_tree.write().unwrap().move_selection_range(l2, r2, target_start);
            Ok(())
        })
    }

    pub fn group_selection_range_into_scaffold(&self, l: u64, r: u64, name: Option<String>, spacer: u64) -> Result<ScaffoldId> {
        self.with_opened(|o| {
            if l >= r {
                return Err(HictError::IncorrectRange { start: l, end: r });
            }
            Ok(o.scaffold_tree.write().unwrap().rescaffold(l, r, name, spacer))
        })
    }

    pub fn ungroup_selection_range(&self, l: u64, r: u64) -> Result<()> {
        self.with_opened(|o| {
            if l >= r {
                return Err(HictError::IncorrectRange { start: l, end: r });
            }
            o.scaffold_tree.write().unwrap().unscaffold(l, r);
            Ok(())
        })
    }

    /// Rebuilds both trees from an AGP file: contig order and orientation
    /// from its `W` rows, scaffold grouping from its runs. Every contig the
    /// AGP file names must already be known to this assembly (by name); the
    /// AGP file must name every contig exactly once.
    pub fn load_assembly_from_agp(&self, path: &Path) -> Result<()> {
        self.with_opened(|o| {
            let text = std::fs::read_to_string(path).map_err(|e| HictError::MalformedAssemblyRecord {
                line: 0,
                reason: format!("reading {}: {e}", path.display()),
            })?;
            let (agp_contigs, agp_scaffolds) = agp::parse(&text)?;

            let mut new_tree = ContigTree::new();
            let mut bp_offsets: HashMap<&str, (u64, u64)> = HashMap::new();
            let mut pos = 0u64;
            for rec in &agp_contigs {
                let descriptor = o.contigs_by_name.get(rec.name.as_str()).cloned().ok_or_else(|| HictError::MalformedAssemblyRecord {
                    line: 0,
                    reason: format!("unknown contig {} in AGP file", rec.name),
                })?;
                let len = descriptor.length_bp;
                bp_offsets.insert(rec.name.as_str(), (pos, pos + len));
                pos += len;
                new_tree.push_back(descriptor, rec.direction);
            }
            if new_tree.node_count() as usize != o.contigs_by_name.len() {
                return Err(HictError::MalformedAssemblyRecord {
                    line: 0,
                    reason: "AGP file doesn't name every contig in the assembly exactly once".into(),
                });
            }

            let mut new_scaffolds = ScaffoldTree::new(pos);
            for rec in &agp_scaffolds {
                let (start_bp, _) = *bp_offsets.get(rec.start_ctg.as_str()).ok_or_else(|| HictError::MalformedAssemblyRecord {
                    line: 0,
                    reason: format!("unknown contig {} in AGP scaffold run", rec.start_ctg),
                })?;
                let (_, end_bp) = *bp_offsets.get(rec.end_ctg.as_str()).ok_or_else(|| HictError::MalformedAssemblyRecord {
                    line: 0,
                    reason: format!("unknown contig {} in AGP scaffold run", rec.end_ctg),
                })?;
                new_scaffolds.rescaffold(start_bp, end_bp, Some(rec.name.clone()), rec.spacer_length);
            }

            *o.contig_tree.write().unwrap() = new_tree;
            *o.scaffold_tree.write().unwrap() = new_scaffolds;
            Ok(())
        })
    }

    /// `spec.md` §4.6. Splits the contig covering `(position, resolution,
    /// unit)` into two fresh contigs at that bin boundary, consuming the one
    /// bin at the finest stored resolution that straddled the cut.
    pub fn split_contig_at_bin(&self, position: u64, resolution: Resolution, unit: QueryUnit) -> Result<()> {
        self.with_opened(|o| {
            if !o.resolutions.contains(&resolution) {
                return Err(HictError::IncorrectResolution(resolution));
            }
            let mut ct = o.contig_tree.write().unwrap();
            let position_bins = ct.convert_units(position, resolution, unit, o.r_min, QueryUnit::Bins);
            let global_position_bp = ct.convert_units(position, resolution, unit, o.r_min, QueryUnit::Bp);

            let (less, segment, greater) = ct.expose_segment(position_bins, position_bins + 1, QueryUnit::Bins, o.r_min);
            assert_eq!(ct.node_count_of(segment), 1, "split point doesn't fall inside exactly one contig at the finest resolution");
            let less_size = ct.size_of(less, QueryUnit::Bins, o.r_min);
            let delta = position_bins - less_size;

            let ContigTreeItem { descriptor: old, direction } = ct.item(segment).clone();
            let bp_offset_in_contig = delta * o.r_min as u64;
            let left_bp = bp_offset_in_contig;
            let right_bp = old.length_bp - bp_offset_in_contig - o.r_min as u64;

            let mut left = ContigDescriptor::new(ContigId(o.next_contig_id()), format!("{}_hictsplit_1", old.name), left_bp, old.contig_name_in_source_fasta.clone());
            let mut right = ContigDescriptor::new(ContigId(o.next_contig_id()), format!("{}_hictsplit_2", old.name), right_bp, old.contig_name_in_source_fasta.clone());

            let shift = (1 + delta) * (o.r_min as u64);
            match direction {
                Direction::Forward => {
                    left.offset_inside_fasta_contig = old.offset_inside_fasta_contig;
                    right.offset_inside_fasta_contig = old.offset_inside_fasta_contig + shift;
                }
                Direction::Reversed => {
                    left.offset_inside_fasta_contig = old.offset_inside_fasta_contig + shift;
                    right.offset_inside_fasta_contig = old.offset_inside_fasta_contig;
                }
            }

            for &r in &o.resolutions {
                let delta_r = bp_offset_in_contig / r as u64;
                let consume_one = r == o.r_min;
                let eff_atus = old.effective_atus(r, direction);
                let eff_prefix = old.effective_prefix_sum(r, direction);
                let (left_atus, right_atus) = split_effective_atus(&eff_atus, &eff_prefix, delta_r, consume_one);

                let old_presence = old.presence_at(r);
                let left_presence = if old_presence.is_forced() { old_presence } else { Presence::auto_for_length(left_bp, r) };
                let right_presence = if old_presence.is_forced() { old_presence } else { Presence::auto_for_length(right_bp, r) };

                left.length_at_resolution.insert(r, delta_r);
                right.length_at_resolution.insert(r, old.length_at(r) - delta_r - u64::from(consume_one));
                left.presence_at_resolution.insert(r, left_presence);
                right.presence_at_resolution.insert(r, right_presence);
                left.set_atus(r, left_atus);
                right.set_atus(r, right_atus);
            }

            let left_leaf = ct.create_node(Arc::new(left), Direction::Forward);
            let right_leaf = ct.create_node(Arc::new(right), Direction::Forward);
            let new_segment = ct.concat(left_leaf, right_leaf);
            ct.commit_exposed_segment(less, new_segment, greater);
            drop(ct);

            o.scaffold_tree.write().unwrap().remove_segment_from_assembly(global_position_bp, global_position_bp + o.r_min as u64);
            Ok(())
        })
    }

    pub fn get_ordered_contigs(&self) -> Result<Vec<(Arc<ContigDescriptor>, Direction)>> {
        self.with_opened(|o| {
            let mut ct = o.contig_tree.write().unwrap();
            let root = ct.root();
            let mut out = Vec::new();
            ct.traverse_nodes(root, o.r_min, false, &mut |item| out.push((item.descriptor.clone(), item.direction)));
            Ok(out)
        })
    }

    pub fn get_ordered_scaffolds(&self) -> Result<Vec<(Option<Arc<ScaffoldDescriptor>>, u64)>> {
        self.with_opened(|o| {
            let mut st = o.scaffold_tree.write().unwrap();
            let mut out = Vec::new();
            st.traverse(&mut |item| out.push((item.descriptor.clone(), item.length_bp)));
            Ok(out)
        })
    }
}

/// Splits an ATU list already reordered into *effective* (currently
/// displayed) order at offset `delta` of that same unit's length, as
/// `spec.md` §4.6 describes via the adjusted prefix sum. `consume_one`
/// drops the single R_min bin straddling the cut, taken off the front of
/// the right half (or the back of the left half, if the cut lands exactly
/// on the last unit). The two halves become the new contigs' own source
/// ATU lists, so both new contigs start life with `direction = Forward`.
fn split_effective_atus(atus: &[Atu], prefix: &[u64], delta: u64, consume_one: bool) -> (Vec<Atu>, Vec<Atu>) {
    let idx = prefix.partition_point(|&x| x <= delta);
    let before = if idx > 0 { prefix[idx - 1] } else { 0 };
    let residual = delta - before;

    let mut left: Vec<Atu> = atus[..idx].to_vec();
    let mut right: Vec<Atu> = atus[idx..].to_vec();

    if idx < atus.len() && residual > 0 {
        let boundary = atus[idx];
        let (mut l_part, mut r_part) = split_one_atu(boundary, residual);
        if consume_one {
            r_part = shrink_front(r_part, 1);
        }
        left.push(l_part);
        right[0] = r_part;
    } else if consume_one {
        if idx < atus.len() {
            right[0] = shrink_front(right[0], 1);
        } else if let Some(last) = left.pop() {
            left.push(shrink_back(last, 1));
        }
    }

    (left.into_iter().filter(|a| !a.is_empty()).collect(), right.into_iter().filter(|a| !a.is_empty()).collect())
}

fn split_one_atu(a: Atu, residual: u64) -> (Atu, Atu) {
    match a.direction {
        Direction::Forward => (Atu { end_excl: a.start_incl + residual, ..a }, Atu { start_incl: a.start_incl + residual, ..a }),
        Direction::Reversed => (Atu { start_incl: a.end_excl - residual, ..a }, Atu { end_excl: a.end_excl - residual, ..a }),
    }
}

fn shrink_front(a: Atu, n: u64) -> Atu {
    match a.direction {
        Direction::Forward => Atu { start_incl: a.start_incl + n, ..a },
        Direction::Reversed => Atu { end_excl: a.end_excl - n, ..a },
    }
}

fn shrink_back(a: Atu, n: u64) -> Atu {
    match a.direction {
        Direction::Forward => Atu { end_excl: a.end_excl - n, ..a },
        Direction::Reversed => Atu { start_incl: a.start_incl + n, ..a },
    }
}
