//! Benchmarks for two-peak fits with and without a co-optimized baseline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use peakfit_rs::baseline::{BaselineMethod, BaselineOptions};
use peakfit_rs::fit::PeakFitter;
use peakfit_rs::models::{PeakComponent, PeakProfile};
use peakfit_rs::sample::Sample;
use peakfit_rs::simulate::{SimulatedBaseline, SpectrumSimulator};

fn spectrum() -> (Vec<Sample>, Vec<PeakComponent>) {
    let truth = vec![
        PeakComponent::new(1, PeakProfile::Gaussian, 30.0, 5.0, 6.0),
        PeakComponent::new(2, PeakProfile::Voigt, 60.0, 3.0, 8.0),
    ];
    let samples = SpectrumSimulator::new(0.0, 100.0, 1001)
        .with_components(&truth)
        .with_baseline(SimulatedBaseline::Linear {
            slope: 0.01,
            intercept: 1.0,
        })
        .with_noise(0.02)
        .with_seed(3)
        .generate()
        .unwrap_or_default();
    let guess = truth
        .iter()
        .map(|c| PeakComponent::new(c.id, c.profile, c.center + 1.0, c.amplitude * 0.8, c.width * 1.2))
        .collect();
    (samples, guess)
}

fn bench_sequential(c: &mut Criterion) {
    let (samples, guess) = spectrum();
    let fitter = PeakFitter::new().with_baseline_options(BaselineOptions::new(BaselineMethod::Asls));
    c.bench_function("two peaks, sequential AsLS", |b| {
        b.iter(|| fitter.fit(black_box(&samples), black_box(&guess), None))
    });
}

fn bench_simultaneous(c: &mut Criterion) {
    let (samples, guess) = spectrum();
    let options =
        BaselineOptions::new(BaselineMethod::Asls).with_simultaneous_optimization(true);
    let fitter = PeakFitter::new().with_baseline_options(options);
    let mut group = c.benchmark_group("simultaneous");
    group.sample_size(10);
    group.bench_function("two peaks, simultaneous AsLS", |b| {
        b.iter(|| fitter.fit(black_box(&samples), black_box(&guess), None))
    });
    group.finish();
}

criterion_group!(benches, bench_sequential, bench_simultaneous);
criterion_main!(benches);
