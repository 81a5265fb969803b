use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use scale_core::decoder::{BitOrdering, RawSample, classify};
use scale_core::diagnostics::rank_orderings;
use scale_core::sampler::statistics;

// Wire words around a fixed load with xorshift noise
fn synth_wires(n: usize, seed: u32) -> Vec<u32> {
    let mut state = seed.max(1);
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state % 81) as i32 - 40;
        v.push(((8_000 + noise) as u32) & 0x00FF_FFFF);
    }
    v
}

pub fn bench_decode(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p scale_core --bench decode
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let wires = synth_wires(10_000, 0xC0FFEE);

    for ordering in BitOrdering::ALL {
        g.bench_function(format!("from_wire_{ordering}").replace('/', "_"), |b| {
            b.iter(|| {
                let mut acc = 0i64;
                for &w in &wires {
                    let s = RawSample::from_wire(black_box(w), ordering);
                    acc += i64::from(s.value);
                    black_box(classify(s.magnitude));
                }
                black_box(acc);
            })
        });
    }

    g.bench_function("statistics_10k", |b| {
        b.iter_batched(
            || wires.iter().map(|&w| w as i32).collect::<Vec<_>>(),
            |v| black_box(statistics(black_box(&v))),
            BatchSize::SmallInput,
        )
    });

    g.bench_function("rank_orderings_64", |b| {
        b.iter(|| black_box(rank_orderings(black_box(&wires[..64]))))
    });
    g.finish();
}

criterion_group!(decode, bench_decode);
criterion_main!(decode);
