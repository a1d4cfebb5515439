use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tank_core::filter::{SmoothingFilter, median_of_three};
use tank_core::ranging::Reading;

// Synthetic surface trace: slow drain with white noise and periodic dropouts
fn synth_pings(n: usize, noise_amp: f32, seed: u32) -> Vec<Reading> {
    let mut state = seed.max(1);
    let mut next_f32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    };
    (0..n)
        .map(|i| {
            if i % 97 == 0 {
                return Reading::Invalid(tank_core::InvalidReason::NoEcho);
            }
            let base = 20.0 + (i as f32) * 0.001;
            Reading::Valid(base + (next_f32() * 2.0 - 1.0) * noise_amp)
        })
        .collect()
}

fn run_pipeline(pings: &[Reading], window: usize) -> Option<f32> {
    let mut f = SmoothingFilter::new(window);
    for chunk in pings.chunks_exact(3) {
        let median = median_of_three([chunk[0], chunk[1], chunk[2]]);
        if let Some(cm) = median.cm() {
            f.push(cm);
        }
    }
    f.estimate()
}

pub fn bench_smoothing(c: &mut Criterion) {
    let mut g = c.benchmark_group("median_then_mean");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p tank_core --bench smoothing
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

    let pings = synth_pings(30_000, 0.5, 0xC0FFEE);

    for &window in &[1usize, 5, 50] {
        g.bench_function(format!("window_{window}"), |b| {
            b.iter_batched(
                || pings.clone(),
                |p| {
                    let y = run_pipeline(black_box(&p), black_box(window));
                    black_box(y);
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(smoothing, bench_smoothing);
criterion_main!(smoothing);
