use crate::algorithms::best_first::BestFirst;
use crate::algorithms::incremental::Replanner;
use crate::algorithms::incremental::ReplannerKind;
use crate::config::SearchConfig;
use crate::grid::Cell;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::space::Path;
use crate::trace::Context;

/// Which search runs each round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Round {
    /// Weighted A*.
    AStar,
    /// Weighted D* Lite, searching from the goal.
    DStar,
}

/// Repeats a search with a shrinking heuristic inflation, keeping the best
/// path found so far.
///
/// Each round is bounded by `epsilon` times the optimal cost, and the last
/// one (at `epsilon = 1`) is optimal.
#[derive(Clone, Debug, PartialEq)]
pub struct Anytime {
    pub round: Round,
    pub config: SearchConfig,
}

impl Anytime {
    pub fn new(round: Round, config: &SearchConfig) -> Self {
        Self {
            round,
            config: config.clone(),
        }
    }

    /// Inflations used, in order.
    pub fn schedule(&self) -> Vec<f64> {
        let mut epsilons = Vec::with_capacity(self.config.max_rounds);
        let mut epsilon = self.config.epsilon_start.max(1.0);
        while epsilons.len() < self.config.max_rounds {
            epsilons.push(epsilon);
            if epsilon <= 1.0 {
                break;
            }
            epsilon = (epsilon * self.config.epsilon_decay).max(1.0);
        }
        epsilons
    }

    /// Runs every round, returning the best path.
    ///
    /// A round interrupted by a limit ends the run with the best path found so
    /// far, if any.
    pub fn search(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        let mut best: Option<(Path, f64)> = None;

        for epsilon in self.schedule() {
            log::trace!("Anytime round at epsilon = {epsilon:.3}");
            let round = match self.round {
                Round::AStar => {
                    let h = self.config.heuristic.for_grid(view.connectivity());
                    BestFirst::weighted_astar(h, epsilon).search(view, start, goal, ctx)
                }
                Round::DStar => self.dstar_round(view, start, goal, epsilon, ctx),
            };

            match round {
                Ok(Some(path)) => {
                    let cost = path.cost_on(view);
                    if best.as_ref().is_none_or(|(_, b)| cost < *b) {
                        ctx.path_updated(&path);
                        best = Some((path, cost));
                    }
                }
                // Unreachable at any inflation
                Ok(None) => return Ok(None),
                Err(reason) => {
                    return match best {
                        Some((path, _)) => {
                            log::debug!("Anytime search interrupted ({reason}), keeping {path}");
                            Ok(Some(path))
                        }
                        None => Err(reason),
                    };
                }
            }
        }

        Ok(best.map(|(path, _)| path))
    }

    fn dstar_round(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        epsilon: f64,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        let config = SearchConfig {
            weight: epsilon,
            capability: view.capability(),
            connectivity: view.connectivity(),
            ..self.config.clone()
        };
        let mut replanner = Replanner::new(
            ReplannerKind::DStarLite,
            view.grid().clone(),
            start,
            goal,
            &config,
        )
        .map_err(|e| {
            log::error!("Anytime D* could not start a round: {e}");
            NotFoundReason::Exhausted
        })?;
        replanner.replan_with(ctx)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::cost::Heuristic;
    use crate::grid::Connectivity;
    use crate::problem::Problem;
    use crate::trace::NullSink;
    use crate::trace::TraceEvent;

    fn problem() -> Problem {
        Problem::try_from(indoc! {"
            S.........
            .######...
            ......#...
            .####.#.#.
            ....#...#G
        "})
        .unwrap()
    }

    #[test]
    fn schedule_ends_at_one() {
        let config = SearchConfig {
            epsilon_start: 3.0,
            epsilon_decay: 0.5,
            ..Default::default()
        };
        let anytime = Anytime::new(Round::AStar, &config);
        assert_eq!(anytime.schedule(), vec![3.0, 1.5, 1.0]);

        let capped = Anytime::new(
            Round::AStar,
            &SearchConfig {
                max_rounds: 2,
                ..config
            },
        );
        assert_eq!(capped.schedule(), vec![3.0, 1.5]);
    }

    #[test]
    fn final_round_is_optimal() {
        let problem = problem();
        let view = problem.grid.view(Connectivity::Eight);
        let config = SearchConfig::default();

        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        let optimal = BestFirst::astar(Heuristic::Octile)
            .search(&view, problem.start, problem.goal, &mut ctx)
            .unwrap()
            .unwrap()
            .length();

        for round in [Round::AStar, Round::DStar] {
            let mut events = Vec::new();
            let mut ctx = Context::new(&config, &mut events, None);
            let path = Anytime::new(round, &config)
                .search(&view, problem.start, problem.goal, &mut ctx)
                .unwrap()
                .unwrap();
            assert!((path.length() - optimal).abs() < 1e-9, "{round:?}: {path}");
            assert!(path.is_valid_on(&view, false));

            // Improvements only
            let updates: Vec<f64> = events
                .iter()
                .filter_map(|e| match e {
                    TraceEvent::PathUpdated(p) => Some(p.length()),
                    _ => None,
                })
                .collect();
            assert!(!updates.is_empty());
            assert!(updates.windows(2).all(|w| w[1] < w[0]));
        }
    }

    #[test]
    fn interrupted_runs_keep_the_best_path() {
        let problem = problem();
        let view = problem.grid.view(Connectivity::Eight);
        let config = SearchConfig {
            epsilon_start: 5.0,
            ..Default::default()
        };

        // Enough for the greedy first round only
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        let first = BestFirst::weighted_astar(config.heuristic, 5.0)
            .search(&view, problem.start, problem.goal, &mut ctx)
            .unwrap();
        assert!(first.is_some());
        let budget = ctx.stats().iterations + 1;

        let limited = SearchConfig {
            max_iterations: budget,
            ..config.clone()
        };
        let mut sink = NullSink;
        let mut ctx = Context::new(&limited, &mut sink, None);
        let path = Anytime::new(Round::AStar, &limited)
            .search(&view, problem.start, problem.goal, &mut ctx)
            .unwrap();
        assert!(path.is_some());
    }
}
