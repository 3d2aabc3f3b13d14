#![deny(warnings)]

//! Headless CLI: play a simulation to the end with a fixed decision plan.

use anyhow::{Context, Result};
use sim_core::{params, validate_config, DecisionSet, SimConfig};
use sim_runtime::{RoundOutput, Scenario, SimulationEngine};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    scenario: Option<String>,
    rounds: Option<u32>,
    seed: Option<u64>,
    price: Option<f64>,
    marketing: Option<f64>,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next(),
            "--scenario" => args.scenario = it.next(),
            "--rounds" => args.rounds = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--price" => args.price = it.next().and_then(|s| s.parse().ok()),
            "--marketing" => args.marketing = it.next().and_then(|s| s.parse().ok()),
            "--json" => args.json = true,
            _ => {}
        }
    }
    args
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => SimConfig::default(),
    };
    if let Some(rounds) = args.rounds {
        cfg.max_rounds = rounds;
    }
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    validate_config(&cfg)?;
    Ok(cfg)
}

fn load_scenario(path: Option<&str>) -> Result<Scenario> {
    let Some(path) = path else {
        return Ok(Scenario::named("default"));
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {path}"))
}

fn decision_plan(args: &Args) -> DecisionSet {
    let mut set = DecisionSet::new();
    if let Some(price) = args.price {
        set.insert("price_change".into(), params(&[("new_price", price)]));
    }
    if let Some(budget) = args.marketing {
        set.insert("marketing_campaign".into(), params(&[("budget", budget)]));
    }
    set
}

/// One console line per round; event counts are triggered and still-active events.
fn round_line(out: &RoundOutput) -> String {
    format!(
        "Round {:>3} | revenue: ${} | profit: ${} | share: {:.1}% | events: {} new, {} active | rec. price: {:.2}",
        out.round_number,
        out.round_results.revenue.round_dp(2),
        out.round_results.profit.round_dp(2),
        out.round_results.market_share * 100.0,
        out.triggered_events.len(),
        out.game_state.events.len(),
        out.recommended_price
    )
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(?args, "starting CLI");

    let cfg = load_config(&args)?;
    let scenario = load_scenario(args.scenario.as_deref())?;
    let plan = decision_plan(&args);

    let mut engine = SimulationEngine::new(cfg)?;
    engine.initialize_with(&scenario)?;
    while !engine.is_simulation_over() {
        let out = engine.run_round(&plan)?;
        println!("{}", round_line(&out));
    }

    let state = engine
        .current_state()
        .context("engine has no state after initialization")?;
    let k = &state.kpis;
    println!(
        "KPI | rounds: {} | revenue: ${:.0} | margin: {:.1}% | share: {:.1}% | ROI: {:.1}% | satisfaction: {:.1}% | utilization: {:.1}% | brand: {:.1}",
        state.round_number,
        k.revenue,
        k.profit_margin * 100.0,
        k.market_share * 100.0,
        k.roi * 100.0,
        k.customer_satisfaction * 100.0,
        k.capacity_utilization * 100.0,
        k.brand_value
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state.to_portable_form()?)?);
    }
    Ok(())
}
