use gritwave::cli;
use gritwave::headless::{run_headless, RunConfig};

fn main() {
    let args = cli::parse_args();

    let config = match &args.config {
        Some(path) => match RunConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        },
        None => RunConfig {
            mode: args.mode.clone(),
            difficulty: args.difficulty.clone(),
            max_waves: args.max_waves,
            random_seed: args.seed,
            max_duration_secs: args.max_duration,
            output_path: args.output.as_ref().map(|p| p.display().to_string()),
            ..RunConfig::default()
        },
    };

    println!("Starting headless run...");
    println!("  Mode: {}", config.mode);
    println!("  Difficulty: {}", config.difficulty);
    if let Some(seed) = config.random_seed {
        println!("  Seed: {}", seed);
    }
    println!("  Max duration: {:.0}s", config.max_duration_secs);

    match run_headless(config) {
        Ok(summary) => {
            println!();
            println!("Outcome: {:?}", summary.outcome);
            println!("  Waves cleared: {}", summary.waves_cleared);
            println!("  Kills: {}", summary.kills);
            println!("  Score: {}", summary.score);
            println!("  Gold: {}", summary.gold);
            println!("  Survival time: {:.1}s", summary.survival_time);
            println!("  Player health: {}", summary.final_health);
        }
        Err(e) => {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        }
    }
}
