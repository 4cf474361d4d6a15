//! Benchmarks for the multiply engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use saxpyr::{
    mxm, plus_times, reference_multiply, AlgorithmHint, EngineConfig, Mask, MultiplyOptions,
    SparseMatrix,
};

struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn random_sparse(n: usize, nnz_per_col: usize, seed: u64) -> SparseMatrix<f64> {
    let mut rng = XorShift(seed | 1);
    let mut entries = Vec::new();
    for j in 0..n {
        let mut rows: Vec<usize> = (0..nnz_per_col).map(|_| rng.next() as usize % n).collect();
        rows.sort_unstable();
        rows.dedup();
        for i in rows {
            entries.push((i, j, (rng.next() % 9 + 1) as f64));
        }
    }
    SparseMatrix::from_entries(n, n, entries)
}

fn bench_methods(c: &mut Criterion) {
    let n = 2000;
    let a = random_sparse(n, 16, 0xa5a5);
    let b = random_sparse(n, 16, 0x5a5a);
    let s = plus_times::<f64>();
    let config = EngineConfig::default();

    let mut group = c.benchmark_group("methods");
    for (name, hint) in [
        ("default", AlgorithmHint::Default),
        ("gustavson", AlgorithmHint::ForceGustavson),
        ("hash", AlgorithmHint::ForceHash),
    ] {
        let options = MultiplyOptions { hint, ..Default::default() };
        group.bench_function(BenchmarkId::new("mxm", name), |bench| {
            bench.iter(|| {
                let (c, _) = mxm(
                    black_box(&a),
                    black_box(&b),
                    None::<Mask<'_, bool>>,
                    &s,
                    &options,
                    &config,
                )
                .unwrap();
                black_box(c)
            })
        });
    }
    group.finish();
}

fn bench_against_reference(c: &mut Criterion) {
    let n = 500;
    let a = random_sparse(n, 8, 0x1234);
    let b = random_sparse(n, 8, 0x4321);
    let s = plus_times::<f64>();
    let config = EngineConfig::default();

    let mut group = c.benchmark_group("vs_reference");
    group.bench_function("mxm", |bench| {
        bench.iter(|| {
            let (c, _) = mxm(
                black_box(&a),
                black_box(&b),
                None::<Mask<'_, bool>>,
                &s,
                &MultiplyOptions::default(),
                &config,
            )
            .unwrap();
            black_box(c)
        })
    });
    group.bench_function("reference", |bench| {
        bench.iter(|| {
            black_box(reference_multiply(
                black_box(&a),
                black_box(&b),
                None::<Mask<'_, bool>>,
                &s,
                false,
            ))
        })
    });
    group.finish();
}

fn bench_masked(c: &mut Criterion) {
    let n = 1000;
    let a = random_sparse(n, 16, 0x77);
    let b = random_sparse(n, 16, 0x88);
    let mf = random_sparse(n, 32, 0x99);
    let m = SparseMatrix::from_entries(
        n,
        n,
        mf.to_triplets().into_iter().map(|(i, j, _)| (i, j, true)).collect(),
    );
    let s = plus_times::<f64>();
    let config = EngineConfig::default();

    c.bench_function("masked_mxm", |bench| {
        bench.iter(|| {
            let (c, _) = mxm(
                black_box(&a),
                black_box(&b),
                Some(Mask::new(&m).structural(true)),
                &s,
                &MultiplyOptions::default(),
                &config,
            )
            .unwrap();
            black_box(c)
        })
    });
}

criterion_group!(benches, bench_methods, bench_against_reference, bench_masked);
criterion_main!(benches);
