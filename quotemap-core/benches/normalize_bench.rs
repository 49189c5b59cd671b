//! Criterion benchmarks for the mapping hot paths.
//!
//! Benchmarks:
//! 1. Single-ticker normalization across rule kinds
//! 2. Full mapping table build over a synthetic universe
//! 3. Mapping CSV serialization and fingerprint

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quotemap_core::mapping::MappingTable;
use quotemap_core::ticker::{normalize, AliasTable, OverrideStore, EXCHANGE_CODES};
use quotemap_core::universe::Universe;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_universe(n: usize) -> Universe {
    Universe::from_tickers((0..n).map(|i| {
        let code = EXCHANGE_CODES[i % EXCHANGE_CODES.len()];
        format!("T{i}/B {code}")
    }))
}

fn make_aliases(universe: &Universe) -> AliasTable {
    AliasTable::from_pairs(
        universe
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 3 == 0)
            .map(|(i, t)| (t.to_string(), format!("A{i}.X"))),
    )
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let aliases = AliasTable::from_pairs([("ERICB SS", "ERIC-B.ST"), ("2330 TT", "2330.TWO")]);
    let overrides = OverrideStore::from_pairs([("BRK-B.US", "BRKB.US")]);
    let mut group = c.benchmark_group("normalize");
    for ticker in ["VOD LN", "700 HK", "ERICB SS", "2330 TT", "BRK/B US", "FOO ZZ"] {
        group.bench_with_input(BenchmarkId::from_parameter(ticker), ticker, |b, t| {
            b.iter(|| normalize(black_box(t), &aliases, &overrides))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping_build");
    for n in [1_000usize, 10_000] {
        let universe = make_universe(n);
        let aliases = make_aliases(&universe);
        let overrides = OverrideStore::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| MappingTable::build(black_box(&universe), &aliases, &overrides))
        });
    }
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let universe = make_universe(10_000);
    let table = MappingTable::build(&universe, &make_aliases(&universe), &OverrideStore::new());
    c.bench_function("mapping_fingerprint_10k", |b| {
        b.iter(|| black_box(&table).fingerprint())
    });
}

criterion_group!(benches, bench_normalize, bench_build, bench_fingerprint);
criterion_main!(benches);
