use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{params, DecisionSet, SimConfig};
use sim_runtime::SimulationEngine;

fn bench_rounds(c: &mut Criterion) {
    let mut decisions = DecisionSet::new();
    decisions.insert("price_change".into(), params(&[("new_price", 105.0)]));
    decisions.insert("marketing_campaign".into(), params(&[("budget", 2500.0)]));
    c.bench_function("sim_round", |b| {
        b.iter(|| {
            let mut engine = SimulationEngine::new(SimConfig {
                max_rounds: 12,
                ..SimConfig::default()
            })
            .unwrap();
            engine.initialize().unwrap();
            while !engine.is_simulation_over() {
                let _ = engine.run_round(&decisions);
            }
        })
    });
}

criterion_group!(benches, bench_rounds);
criterion_main!(benches);
