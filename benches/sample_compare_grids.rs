use std::time::Duration;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use glob::glob;
use hrsw::Stopwatch;
use human_duration::human_duration;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;

use gridpath::EngineKind;
use gridpath::SearchConfig;
use gridpath::grid::Cell;
use gridpath::grid::Coord;
use gridpath::grid::Grid;
use gridpath::problem::Problem;
use gridpath::problem::random_open_cell;

/// Maximum time willing to wait for a single benchmark instance.
const MAX_INSTANCE_TIME: Duration = Duration::from_secs(1);
const OBSTACLE_DENSITY: f64 = 0.25;

const ENGINES: [EngineKind; 8] = [
    EngineKind::Dijkstra,
    EngineKind::AStar,
    EngineKind::Jps,
    EngineKind::ThetaStar,
    EngineKind::DStarLite,
    EngineKind::AnytimeAStar,
    EngineKind::HpaStar,
    EngineKind::PraStar,
];

fn random_problem(size: usize, seed: u64) -> Option<Problem> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut grid = Grid::new(size, size);
    for y in 0..size as Coord {
        for x in 0..size as Coord {
            grid.set_obstacle(Cell::new(x, y), rng.random_bool(OBSTACLE_DENSITY));
        }
    }
    let start = random_open_cell(&grid, &mut rng)?;
    let goal = random_open_cell(&grid, &mut rng)?;
    Some(Problem::new(grid, start, goal))
}

fn problems() -> Vec<(String, Problem)> {
    let mut problems = Vec::new();
    for size in [32, 64, 128] {
        for seed in 0..3 {
            if let Some(p) = random_problem(size, seed) {
                problems.push((format!("random[{size}x{size}]:{seed}"), p));
            }
        }
    }

    for path in glob("data/maps/*.png")
        .unwrap()
        .chain(glob("data/maps/*.map").unwrap())
        .filter_map(std::result::Result::ok)
    {
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        let base = Problem::load(&path).unwrap();
        let (x, y) = base.grid.dimensions();
        for i in 0..3 {
            let mut rng = ChaCha8Rng::seed_from_u64(i);
            if let Some(p) = base.randomize(&mut rng) {
                problems.push((format!("{name}[{x}x{y}]:{i}"), p));
            }
        }
    }
    problems
}

fn compare_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("Grid Search");
    let config = SearchConfig::default();

    for (instance_name, problem) in problems() {
        for engine in ENGINES {
            let mut stopwatch = Stopwatch::new_started();
            let outcome = gridpath::run(&problem.grid, problem.start, problem.goal, engine, &config);
            stopwatch.stop();
            let elapsed = stopwatch.elapsed();
            if elapsed > MAX_INSTANCE_TIME {
                log::warn!(
                    "Skipping {instance_name} as it takes too long with {engine} ({})",
                    human_duration(&elapsed)
                );
                continue;
            }
            if let Ok(outcome) = outcome {
                println!("{engine} on {instance_name}: {outcome}");
            }

            group.bench_with_input(
                BenchmarkId::new(engine.to_string(), &instance_name),
                &problem,
                |b, p| b.iter(|| gridpath::run(&p.grid, p.start, p.goal, engine, &config)),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, compare_engines);
criterion_main!(benches);
