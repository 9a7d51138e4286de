use criterion::{black_box, criterion_group, criterion_main, Bencher, BenchmarkId, Criterion};
use flexi_logger::Logger;
use hict_core::contig::{ContigDescriptor, ContigId, Presence};
use hict_core::contig_tree::ContigTree;
use hict_core::stripe::{Atu, StripeId};
use hict_core::units::{Direction, QueryUnit};
use rand::{Rng, SeedableRng};
use std::{
    sync::{Arc, LazyLock, Mutex},
    time::Duration,
};

const R: u32 = 100;

fn contig(id: u64, bins: u64) -> Arc<ContigDescriptor> {
    let mut d = ContigDescriptor::new(ContigId(id), format!("c{id}"), bins * R as u64, format!("c{id}"));
    d.length_at_resolution.insert(R, bins);
    d.presence_at_resolution.insert(R, Presence::ForcedShown);
    d.set_atus(
        R,
        vec![Atu {
            stripe_id: StripeId(id),
            start_incl: 0,
            end_excl: bins,
            direction: Direction::Forward,
        }],
    );
    Arc::new(d)
}

#[derive(Clone, Copy, Debug)]
enum Operation {
    ExposeCommit,
    ReverseSegment,
    SplitByCount,
    ConvertUnits,
}

fn single_op(tree: &mut ContigTree, rng: &mut impl Rng) {
    let total_bins = tree.total_size(QueryUnit::Bins, R);
    if total_bins == 0 {
        return;
    }
    use Operation::*;
    match [ExposeCommit, ReverseSegment, SplitByCount, ConvertUnits][rng.gen_range(0..4)] {
        ExposeCommit => {
            let a = rng.gen_range(0..total_bins);
            let b = rng.gen_range(a..=total_bins);
            let (less, segment, greater) = tree.expose_segment(a, b, QueryUnit::Bins, R);
            black_box(tree.agg(segment));
            tree.commit_exposed_segment(less, segment, greater);
        }
        ReverseSegment => {
            let a = rng.gen_range(0..total_bins);
            let b = rng.gen_range(a..=total_bins);
            let (less, segment, greater) = tree.expose_segment(a, b, QueryUnit::Bins, R);
            tree.reverse_subtree(segment);
            tree.commit_exposed_segment(less, segment, greater);
        }
        SplitByCount => {
            let n = tree.node_count();
            if n == 0 {
                return;
            }
            let k = rng.gen_range(0..=n);
            let (l, r) = tree.split_by_count(tree.root(), k);
            tree.set_root(tree.concat(l, r));
        }
        ConvertUnits => {
            let p = rng.gen_range(0..total_bins);
            black_box(tree.convert_units(p, R, QueryUnit::Bins, R, QueryUnit::Bp));
        }
    }
}

fn build_tree(n: usize, rng: &mut impl Rng) -> ContigTree {
    let mut tree = ContigTree::new();
    for i in 0..n {
        let bins = rng.gen_range(1..20);
        tree.push_back(contig(i as u64, bins), Direction::Forward);
    }
    tree
}

fn mixed_edits(b: &mut Bencher, seed: u64, n: usize, q: usize) {
    b.iter(|| {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut tree = black_box(build_tree(n, &mut rng));
        for _ in 0..q {
            single_op(&mut tree, &mut rng);
        }
    });
}

fn contig_tree_edits(c: &mut Criterion) {
    let _ = &*LOGGER;
    let mut g = c.benchmark_group("Contig tree mixed edits");
    let mut rng = rand::rngs::StdRng::seed_from_u64(4815162342);
    for q in [25usize, 100, 400] {
        g.throughput(criterion::Throughput::Elements(q as u64));
        let seed = rng.gen();
        log::debug!("Using seed {seed}");
        g.bench_with_input(BenchmarkId::new("n=500", q), &q, |b, &q| mixed_edits(b, seed, 500, q));
    }
    g.finish();
}

fn push_back_growth(c: &mut Criterion) {
    let _ = &*LOGGER;
    let mut g = c.benchmark_group("Contig tree push_back");
    g.measurement_time(Duration::from_secs(10));
    g.bench_function("push_back 10k contigs", |b| {
        b.iter(|| {
            let mut tree = ContigTree::new();
            for i in 0..10_000u64 {
                tree.push_back(contig(i, 1), Direction::Forward);
            }
            black_box(tree.total_size(QueryUnit::Bins, R));
        });
    });
    g.finish();
}

criterion_group!(benches, contig_tree_edits, push_back_growth);
criterion_main!(benches);

pub static LOGGER: LazyLock<Mutex<flexi_logger::LoggerHandle>> = LazyLock::new(|| {
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
