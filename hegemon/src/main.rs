use anyhow::Result;
use clap::Parser;
use hegemon_ai::{JsonPlanStore, TurnAdvisor};
use hegemon_core::{run_turn, ActionStatus, TurnContext};
use std::path::PathBuf;

mod scenario;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of turns to run
    #[arg(short, long, default_value_t = 20)]
    turns: u32,

    /// World seed (combat and event reproducibility)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Game id (namespaces persisted plans)
    #[arg(long, default_value_t = 1)]
    game_id: u32,

    /// Directory for persisted advisory plans
    #[arg(long)]
    plan_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    log::info!("Starting hegemon...");

    let mut world = scenario::demo_world(args.game_id, args.seed);
    let ctx = TurnContext::default();

    let mut advisor = TurnAdvisor::from_env(ctx.sim.clone());
    if let Some(dir) = &args.plan_dir {
        advisor = advisor.with_store(Box::new(JsonPlanStore::new(dir)));
    }

    for _ in 0..args.turns {
        let report = run_turn(&mut world, &ctx, Some(&mut advisor));
        let executed = report
            .actions
            .iter()
            .filter(|a| a.status == ActionStatus::Executed)
            .count();
        let failed = report.actions.len() - executed;
        log::info!(
            "Turn {} | {} actions executed, {} failed | {} battles",
            report.turn,
            executed,
            failed,
            report.combats.len()
        );
        for combat in &report.combats {
            log::info!(
                "  {} vs {}: {} won (losses {}/{})",
                combat.attacker,
                combat.defender,
                if combat.attacker_won {
                    &combat.attacker
                } else {
                    &combat.defender
                },
                combat.attacker_losses,
                combat.defender_losses
            );
        }
    }

    // Final standings, strongest effective military first.
    let mut standings: Vec<_> = world.countries.iter().collect();
    standings.sort_by(|(a_id, a), (b_id, b)| {
        b.effective_strength()
            .partial_cmp(&a.effective_strength())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a_id.cmp(b_id))
    });

    println!("Standings after {} turns:", world.turn);
    for (rank, (id, country)) in standings.iter().enumerate() {
        println!(
            "{:>2}. {:<10} tech {} | infra {} | strength {:>6} ({:>8.0} effective) | budget {:>8}",
            rank + 1,
            id,
            country.technology_level,
            country.infrastructure_level,
            country.military_strength,
            country.effective_strength(),
            country.budget,
        );
    }
    println!("Final checksum: {:016x}", world.checksum());

    Ok(())
}
