use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anstream::println;
use clap::Parser;
use hrsw::Stopwatch;
use human_duration::human_duration;
use owo_colors::OwoColorize;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use thousands::Separable;
use tqdm::tqdm;

use gridpath::EngineKind;
use gridpath::Outcome;
use gridpath::SearchConfig;
use gridpath::cost::Heuristic;
use gridpath::grid::Capability;
use gridpath::grid::Connectivity;
use gridpath::problem::Problem;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Finds paths on grid maps
///
/// Maps are PNG images or text files (`.` open, `#` wall, `~` water, `S`
/// start, `G` goal).
#[derive(Parser, Debug)]
#[clap(long_version = gridpath::build::CLAP_LONG_VERSION)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(required = true)]
    pub maps: Vec<PathBuf>,

    /// Engines to run, in order
    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "astar")]
    pub engine: Vec<EngineKind>,
    /// Runs every engine
    #[arg(long, conflicts_with = "engine")]
    pub all_engines: bool,

    #[arg(long, value_enum, default_value = "octile")]
    pub heuristic: Heuristic,
    #[arg(long, value_enum, default_value = "eight")]
    pub connectivity: Connectivity,
    #[arg(long, value_enum, default_value = "ground")]
    pub capability: Capability,
    /// Heuristic inflation for weighted A*
    #[arg(long, default_value_t = 1.5)]
    pub weight: f64,
    #[arg(long, default_value_t = 8)]
    pub cluster_size: usize,
    #[arg(long, env = "GRIDPATH_MAX_ITERATIONS", default_value_t = 10_000_000)]
    pub max_iterations: usize,
    /// Wall-clock budget per run, in milliseconds
    #[arg(long)]
    pub time_budget_ms: Option<u64>,
    #[arg(long, default_value_t = 0u64)]
    pub seed: u64,

    /// Also solves this many random start/goal pairs per map
    #[arg(long, default_value_t = 0u64)]
    pub instances: u64,

    /// Skips drawing maps
    #[arg(short, long)]
    pub quiet: bool,

    /// Org file collecting every run
    #[arg(short, long, env = "GRIDPATH_LOG")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    color: colorchoice_clap::Color,
}

impl Args {
    fn config(&self) -> SearchConfig {
        SearchConfig {
            heuristic: self.heuristic,
            weight: self.weight,
            connectivity: self.connectivity,
            capability: self.capability,
            cluster_size: self.cluster_size,
            max_iterations: self.max_iterations,
            time_budget: self.time_budget_ms.map(Duration::from_millis),
            seed: self.seed,
            ..Default::default()
        }
    }

    fn engines(&self) -> Vec<EngineKind> {
        if self.all_engines {
            EngineKind::ALL.to_vec()
        } else {
            self.engine.clone()
        }
    }
}

fn report(problem: &Problem, engine: EngineKind, outcome: &Outcome, elapsed: &Duration, quiet: bool) {
    match outcome {
        Outcome::Found {
            path,
            cost,
            nodes_visited,
            nodes_expanded,
        } => {
            println!(
                "{:>16}: cost {} in {} steps, {} expanded, {} visited ({})",
                engine.green(),
                format!("{cost:.3}").bold(),
                path.len().saturating_sub(1),
                nodes_expanded.separate_with_commas(),
                nodes_visited.separate_with_commas(),
                human_duration(elapsed),
            );
            if !quiet {
                println!("{}", problem.overlay(Some(path)));
            }
        }
        Outcome::NotFound { reason } => {
            println!(
                "{:>16}: {} ({})",
                engine.red(),
                reason.yellow(),
                human_duration(elapsed)
            );
        }
    }
}

fn solve<W: Write>(
    out: &mut Option<BufWriter<W>>,
    problem: &Problem,
    engines: &[EngineKind],
    config: &SearchConfig,
    quiet: bool,
) -> std::io::Result<()> {
    if let Some(out) = out {
        writeln!(out, "*** Problem\n#+begin_quote\n{problem}\n#+end_quote")?;
    }

    for &engine in engines {
        let mut stopwatch = Stopwatch::new_started();
        let outcome = gridpath::run(&problem.grid, problem.start, problem.goal, engine, config);
        stopwatch.stop();
        let elapsed = stopwatch.elapsed();

        match outcome {
            Ok(outcome) => {
                report(problem, engine, &outcome, &elapsed, quiet);
                if let Some(out) = out {
                    writeln!(out, "**** {engine}\n- Took {}\n- {outcome}", human_duration(&elapsed))?;
                    if let Some(path) = outcome.path() {
                        writeln!(out, "#+begin_quote\n{}#+end_quote", problem.overlay(Some(path)))?;
                    }
                }
            }
            Err(e) => {
                println!("{:>16}: {}", engine.red(), e.red());
                if let Some(out) = out {
                    writeln!(out, "**** {engine}\n- Rejected: {e}")?;
                }
            }
        }
    }
    Ok(())
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    args.color.write_global();

    let config = args.config();
    if let Err(e) = config.validate() {
        println!("{}", e.red());
        std::process::exit(2);
    }
    let engines = args.engines();

    let mut out = match &args.output {
        Some(p) => {
            println!("Logging to {:?}", p.yellow());
            Some(BufWriter::new(File::create(p)?))
        }
        None => None,
    };
    if let Some(out) = &mut out {
        writeln!(out, "#+title: gridpath runs")?;
        writeln!(out, "* Runs")?;
    }

    for map in &args.maps {
        let problem = match Problem::load(map) {
            Ok(p) => p,
            Err(e) => {
                println!("{} {}", "Skipping".red(), e);
                continue;
            }
        };
        let (w, h) = problem.grid.dimensions();
        println!("{} {:?} ({w}x{h})", "Map".bold(), map);
        if let Some(out) = &mut out {
            writeln!(out, "** Map {map:?} ({w}x{h})")?;
        }
        solve(&mut out, &problem, &engines, &config, args.quiet)?;

        if args.instances == 0 {
            continue;
        }
        let mut skipped = 0u64;
        for instance in tqdm(0..args.instances) {
            let mut rng = ChaCha8Rng::seed_from_u64(instance);
            match problem.randomize(&mut rng) {
                Some(random) => solve(&mut out, &random, &engines, &config, true)?,
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            println!(
                "{} {skipped} instances without open cells",
                "Skipped".yellow()
            );
        }
    }

    if let Some(out) = &mut out {
        out.flush()?;
    }
    Ok(())
}
