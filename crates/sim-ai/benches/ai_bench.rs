use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_ai::CompetitorAi;
use sim_core::seeded_rng;

fn bench_reactions(c: &mut Criterion) {
    for n in [3usize, 30] {
        let ai0 = CompetitorAi::new(n, seeded_rng(42));
        c.bench_function(&format!("competitors {n} x 40 rounds"), |b| {
            b.iter(|| {
                let mut ai = ai0.clone();
                for round in 0..40 {
                    let price = 80.0 + (round % 8) as f64 * 7.5;
                    black_box(ai.update_competitor_actions(price, 0.2));
                }
            })
        });
    }
}

criterion_group!(benches, bench_reactions);
criterion_main!(benches);
