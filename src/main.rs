//! Light Maze level checker
//!
//! Usage: `light-maze [--config FILE] [--rays] [--seed N] LEVEL.json...`
//!
//! Lints and validates each level file, printing the verdict, witness
//! solution and a hint picked with the given seed. Exits non-zero if any level fails to load or validate.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use light_maze::sim::RayCaster;
use light_maze::{EngineConfig, LevelDefinition, LevelValidator};

struct Args {
    config: Option<PathBuf>,
    rays: bool,
    seed: u64,
    levels: Vec<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        rays: false,
        seed: 0,
        levels: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a file")?;
                args.config = Some(PathBuf::from(path));
            }
            "--rays" => args.rays = true,
            "--seed" => {
                let seed = iter.next().ok_or("--seed needs a number")?;
                args.seed = seed.parse().map_err(|e| format!("Bad seed {seed}: {e}"))?;
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option {flag}")),
            _ => args.levels.push(PathBuf::from(&arg)),
        }
    }
    if args.levels.is_empty() {
        return Err("No level files given".to_string());
    }
    Ok(args)
}

/// Check one level file; true if it loaded and has a solution
fn check_level(path: &Path, config: &EngineConfig, args: &Args) -> bool {
    let level = match LevelDefinition::load(path) {
        Ok(level) => level,
        Err(e) => {
            log::error!("{e}");
            println!("✗ {}: {e}", path.display());
            return false;
        }
    };

    let name = level.display_name();
    for issue in level.lint() {
        println!("  ! {name}: {issue}");
    }

    let validator = LevelValidator::from_config(config);
    let validation = validator.validate_level(&level);
    match &validation.solution {
        Some(solution) => {
            println!("✓ {name}: solvable in {} move(s)", solution.move_count);
            for placement in &solution.mirror_placements {
                println!(
                    "    mirror {} -> ({}, {}) at {:.0}°",
                    placement.mirror,
                    placement.cell.x,
                    placement.cell.y,
                    placement.angle.to_degrees()
                );
            }
        }
        None => {
            for issue in &validation.issues {
                println!("✗ {name}: {issue}");
            }
        }
    }

    println!("    hint: {}", validator.hint_for_seed(&level, args.seed));

    if args.rays {
        let mut index = level.fixed_index();
        let rays = RayCaster::from_config(config).cast_level(&mut index);
        match serde_json::to_string_pretty(&rays) {
            Ok(json) => println!("{json}"),
            Err(e) => log::warn!("Could not serialize rays: {e}"),
        }
    }

    log::info!("{name}: valid={}", validation.is_valid);
    validation.is_valid
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Usage: light-maze [--config FILE] [--rays] [--seed N] LEVEL.json...");
            return ExitCode::from(2);
        }
    };

    let config = EngineConfig::load_or_default(args.config.as_deref());
    log::info!("Checking {} level(s)", args.levels.len());

    let mut failures = 0;
    for path in &args.levels {
        if !check_level(path, &config, &args) {
            failures += 1;
        }
    }

    if failures > 0 {
        println!("\n{failures} of {} level(s) failed", args.levels.len());
        ExitCode::FAILURE
    } else {
        println!("\nAll {} level(s) valid", args.levels.len());
        ExitCode::SUCCESS
    }
}
