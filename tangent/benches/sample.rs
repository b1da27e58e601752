use criterion::{
    BenchmarkId, Criterion, black_box, criterion_group, criterion_main,
};
use std::num::NonZeroUsize;
use tangent::{
    backend::{Backend, NativeBackend},
    config::SampleConfig,
    eval::Evaluator,
    sample::{Domain, sample},
};

const EXPR: &str = "sin(3x) / x + sqrt(abs(x)) * exp(-x^2 / 10)";

pub fn run_bench<B: Backend>(
    c: &mut Criterion,
    backend: B,
    symbolic: bool,
    name: &'static str,
) {
    let eval = Evaluator::new(backend);
    let f = eval.parse(EXPR).unwrap();
    let df = symbolic.then(|| eval.backend().differentiate(&f).unwrap());
    let domain = Domain::new(-10.0, 10.0).unwrap();

    let mut group = c.benchmark_group("sample");
    for n in [100, 800, 5000] {
        let cfg = SampleConfig {
            resolution: NonZeroUsize::new(n).unwrap(),
            ceiling: Some(100.0),
        };
        group.bench_function(BenchmarkId::new(name, n), |b| {
            b.iter(|| {
                black_box(sample(&eval, &f, df.as_ref(), domain, &cfg));
            })
        });
    }
}

pub fn native(c: &mut Criterion) {
    run_bench(c, NativeBackend, true, "native-symbolic");
    run_bench(c, NativeBackend, false, "native-numeric");
}

#[cfg(feature = "rhai")]
pub fn rhai(c: &mut Criterion) {
    run_bench(c, tangent::backend::RhaiBackend::new(), false, "rhai");
}

#[cfg(not(feature = "rhai"))]
pub fn rhai(_c: &mut Criterion) {}

criterion_group!(benches, native, rhai);
criterion_main!(benches);
