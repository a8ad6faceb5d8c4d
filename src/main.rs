//! Reaction-diffusion CLI - Run scenarios from JSON configuration.

use std::path::PathBuf;
use std::time::Instant;

use reaction_diffusion::{
    compute::{Simulation, SimulationStats},
    schema::ScenarioConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [steps]", args[0]);
        eprintln!();
        eprintln!("Run a reaction-diffusion scenario from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to scenario configuration file");
        eprintln!("  steps        Number of simulation steps (default: 100)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let steps: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);

    let config = ScenarioConfig::from_path(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    println!("Reaction-Diffusion Simulation");
    println!("=============================");
    for grid in &config.grids {
        println!(
            "Grid '{}': {:?} cells, spacing {} ({:?})",
            grid.name, grid.shape, grid.spacing, grid.boundary
        );
    }
    println!("Species: {}", config.species.len());
    println!("Reactions: {} ({:?})", config.reactions.len(), config.update_mode);
    println!("dt: {}", config.dt);
    println!("Steps: {}", steps);
    println!();

    let mut simulation = Simulation::from_config(&config).unwrap_or_else(|e| {
        eprintln!("Error building simulation: {}", e);
        std::process::exit(1);
    });
    let initial_stats = simulation.stats();

    println!("Initial state:");
    print_stats(&initial_stats);
    println!();

    println!("Running simulation...");
    let start = Instant::now();

    for i in 0..steps {
        if let Err(e) = simulation.step() {
            eprintln!("Step {} failed: {}", i + 1, e);
            std::process::exit(1);
        }

        // Print progress every 10%
        if (i + 1) % (steps / 10).max(1) == 0 {
            let stats = simulation.stats();
            let elapsed = start.elapsed().as_secs_f64();
            let steps_per_sec = (i + 1) as f64 / elapsed;
            println!(
                "  Step {}/{}: t={:.3}, amount={:.6}, {:.1} steps/s",
                i + 1,
                steps,
                stats.time,
                stats.total_amount,
                steps_per_sec
            );
        }
    }

    let elapsed = start.elapsed();
    let final_stats = simulation.stats();

    println!();
    println!("Final state:");
    print_stats(&final_stats);
    println!();
    if initial_stats.total_amount > 0.0 {
        // Reactions that change molecule counts move this away from 100%
        println!(
            "Amount conservation: {:.4}%",
            (1.0 - (final_stats.total_amount - initial_stats.total_amount).abs()
                / initial_stats.total_amount)
                * 100.0
        );
    }
    println!(
        "Time: {:.2}s ({:.1} steps/s)",
        elapsed.as_secs_f64(),
        steps as f64 / elapsed.as_secs_f64()
    );
}

fn print_stats(stats: &SimulationStats) {
    println!("  Total amount: {:.6}", stats.total_amount);
    for species in &stats.species {
        println!(
            "  {:>8}: amount={:.6}, range=[{:.6}, {:.6}]",
            species.name, species.amount, species.min, species.max
        );
    }
}

fn print_example_config() {
    let config = ScenarioConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
