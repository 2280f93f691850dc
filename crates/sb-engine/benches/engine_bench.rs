use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sb_engine::{resample_nearest, synthesize_with_rng, Scheduler, SynthParams};
use sb_ir::{Grid, GridCoord, LaneMap, SymbolKind, Waveform};

fn bench_synth(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth");
    for waveform in Waveform::ALL {
        let params = SynthParams {
            waveform,
            frequency: 261.63,
            duration_secs: 0.5,
            sample_rate: 44_100,
            amplitude: 0.28,
        };
        group.bench_function(waveform.name(), |b| {
            let mut rng = fastrand::Rng::with_seed(1);
            b.iter(|| synthesize_with_rng(black_box(&params), &mut rng))
        });
    }
    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let input: Vec<i16> = (0..44_100).map(|i| (i % 2000) as i16).collect();
    c.bench_function("resample_ratio_1_5", |b| {
        b.iter(|| resample_nearest(black_box(&input), 1.5))
    });
}

fn bench_tick(c: &mut Criterion) {
    let mut grid = Grid::new();
    for lane in 0..8 {
        grid.place(GridCoord::new(0, 0, lane).unwrap(), SymbolKind::Combo).unwrap();
    }
    let lanes = LaneMap::default();
    c.bench_function("tick_full_slot", |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new();
            scheduler.play(0);
            black_box(scheduler.advance(0, &grid, &lanes, 120.0))
        })
    });
}

criterion_group!(benches, bench_synth, bench_resample, bench_tick);
criterion_main!(benches);
