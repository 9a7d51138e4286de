use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use flexi_logger::{Logger, LoggerHandle};
use hict_core::block_store::{BlockData, ContigRecord, InMemoryBlockStore};
use hict_core::contig::ContigId;
use hict_core::matrix::DenseMatrix;
use hict_core::stripe::{Atu, Stripe, StripeId};
use hict_core::units::Direction;

pub mod reference;

use reference::ReferenceAssembly;

const R: u32 = 1;

/// Builds a single-resolution (`R=1`, so bp == bin == pixel), one-contig-
/// per-stripe `InMemoryBlockStore` from `contig_bins`, plus a matching
/// [`ReferenceAssembly`] over the same `source` matrix, so both start out
/// describing exactly the same assembly.
pub fn build_store_and_reference(contig_bins: &[u64], source: Vec<Vec<f64>>) -> (InMemoryBlockStore, ReferenceAssembly) {
    let n = contig_bins.len() as u64;
    let mut offsets = Vec::with_capacity(contig_bins.len() + 1);
    let mut acc = 0u64;
    for &b in contig_bins {
        offsets.push(acc);
        acc += b;
    }
    offsets.push(acc);

    let mut store = InMemoryBlockStore::new();
    store.resolutions = vec![R];
    store.mss.insert(R, contig_bins.iter().copied().max().unwrap_or(0));

    let mut stripes = Vec::new();
    let mut blocks = HashMap::new();
    for i in 0..contig_bins.len() {
        stripes.push(Stripe::uniform(StripeId(i as u64), contig_bins[i]));
    }
    for i in 0..contig_bins.len() {
        for j in i..contig_bins.len() {
            let (ri, rj) = (contig_bins[i] as usize, contig_bins[j] as usize);
            let mut data = Vec::with_capacity(ri * rj);
            for r in 0..ri {
                for c in 0..rj {
                    let src_r = offsets[i] as usize + r;
                    let src_c = offsets[j] as usize + c;
                    data.push(source[src_r][src_c]);
                }
            }
            blocks.insert((i as u64, j as u64), BlockData::Dense(DenseMatrix::from_row_major(ri, rj, data)));
        }
    }
    store.stripes.insert(R, stripes);
    store.blocks.insert(R, blocks);

    let mut ordered = Vec::with_capacity(contig_bins.len());
    for i in 0..contig_bins.len() {
        let cid = ContigId(i as u64);
        ordered.push(cid);
        let mut length_at_resolution = HashMap::new();
        length_at_resolution.insert(R, contig_bins[i]);
        let mut atus_at_resolution = HashMap::new();
        atus_at_resolution.insert(
            R,
            vec![Atu {
                stripe_id: StripeId(i as u64),
                start_incl: 0,
                end_excl: contig_bins[i],
                direction: Direction::Forward,
            }],
        );
        store.contigs.insert(
            cid,
            ContigRecord {
                contig_id: cid,
                name: format!("c{i}"),
                length_bp: contig_bins[i],
                direction: Direction::Forward,
                scaffold_id: None,
                length_at_resolution,
                forced_presence_at_resolution: HashMap::new(),
                atus_at_resolution,
                name_in_source_fasta: format!("c{i}"),
                offset_inside_fasta_contig: 0,
            },
        );
    }
    store.ordered_contig_ids = ordered;
    let _ = n;

    (store, ReferenceAssembly::new(source))
}

pub fn resolution() -> u32 {
    R
}

#[allow(dead_code)]
pub static LOGGER: LazyLock<Mutex<LoggerHandle>> = LazyLock::new(|| {
    Mutex::new(
        Logger::try_with_env_or_str("info")
            .unwrap()
            .write_mode(flexi_logger::WriteMode::SupportCapture)
            .log_to_stdout()
            .set_palette("196;208;3;7;8".to_owned())
            .format(|w, now, record| {
                let style = flexi_logger::style(record.level());
                write!(
                    w,
                    "{} {pref}[{}] {}{suf}",
                    now.format("%H:%M:%S"),
                    &record.level().as_str()[0..1],
                    record.args(),
                    pref = style.prefix(),
                    suf = style.suffix(),
                )
            })
            .start()
            .unwrap(),
    )
});

#[allow(dead_code)]
pub fn init_logger() {
    let _ = &*LOGGER;
}
