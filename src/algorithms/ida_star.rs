use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::cost::Heuristic;
use crate::grid::Cell;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::space::Path;
use crate::trace::Context;

/// Slack when comparing f against the threshold.
const EPS: f64 = 1e-9;

/// Iterative deepening A*.
///
/// Memory is linear in the depth of the current branch: there's no closed
/// set, only the cells on the branch itself, which keeps it simple.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IdaStar {
    pub heuristic: Heuristic,
    /// Deepest branch explored, in moves.
    pub max_depth: usize,
}

/// A cell on the current branch with its sorted successors.
struct Frame {
    cell: Cell,
    successors: SmallVec<[(f64, Cell, f64); 8]>,
    next: usize,
}

/// Result of one depth-first dive.
enum Dive {
    Found(Vec<Cell>),
    Exceeded {
        /// Smallest f that went over the threshold.
        next: f64,
        /// Whether a branch was cut at `max_depth`.
        truncated: bool,
    },
}

impl IdaStar {
    pub fn new(heuristic: Heuristic, max_depth: usize) -> Self {
        Self {
            heuristic,
            max_depth,
        }
    }

    pub fn search(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        if !view.passable(start) || !view.passable(goal) {
            return Ok(None);
        }

        let mut threshold = self.heuristic.h(start, goal);
        loop {
            log::trace!("IDA* diving up to f = {threshold:.3}");
            match self.dive(view, start, goal, threshold, ctx)? {
                Dive::Found(cells) => return Ok(Some(Path::from_cells(cells))),
                Dive::Exceeded { next, truncated } if next.is_infinite() => {
                    return if truncated {
                        Err(NotFoundReason::RecursionDepthExceeded)
                    } else {
                        Ok(None)
                    };
                }
                Dive::Exceeded { next, .. } => threshold = next,
            }
        }
    }

    fn frame(&self, view: &GridView, cell: Cell, g: f64, goal: Cell) -> Frame {
        let mut successors: SmallVec<[(f64, Cell, f64); 8]> = view
            .neighbours(cell)
            .into_iter()
            .map(|n| {
                let g = g + view.move_cost(cell, n);
                (g + self.heuristic.h(n, goal), n, g)
            })
            .collect();
        successors.sort_by(|a, b| a.0.total_cmp(&b.0));
        Frame {
            cell,
            successors,
            next: 0,
        }
    }

    /// Depth-first search below `threshold`, using an explicit stack.
    fn dive(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        threshold: f64,
        ctx: &mut Context,
    ) -> Result<Dive, NotFoundReason> {
        ctx.tick()?;
        ctx.visited(start);
        if start == goal {
            return Ok(Dive::Found(vec![start]));
        }

        let mut stack = vec![self.frame(view, start, 0.0, goal)];
        let mut on_branch = FxHashSet::default();
        on_branch.insert(start);
        let mut next = f64::INFINITY;
        let mut truncated = false;

        while let Some(top) = stack.last_mut() {
            let Some(&(f, n, g)) = top.successors.get(top.next) else {
                on_branch.remove(&top.cell);
                stack.pop();
                continue;
            };
            top.next += 1;
            ctx.examined();

            if on_branch.contains(&n) {
                continue;
            }
            if f > threshold + EPS {
                next = next.min(f);
                continue;
            }
            if stack.len() > self.max_depth {
                truncated = true;
                continue;
            }

            ctx.tick()?;
            ctx.visited(n);
            if n == goal {
                let mut cells: Vec<Cell> = stack.iter().map(|f| f.cell).collect();
                cells.push(n);
                return Ok(Dive::Found(cells));
            }
            ctx.opened(n);
            stack.push(self.frame(view, n, g, goal));
            on_branch.insert(n);
        }

        Ok(Dive::Exceeded { next, truncated })
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::algorithms::best_first::BestFirst;
    use crate::config::SearchConfig;
    use crate::grid::Connectivity;
    use crate::problem::Problem;
    use crate::trace::NullSink;

    fn solve(
        engine: IdaStar,
        problem: &Problem,
        config: &SearchConfig,
    ) -> Result<Option<Path>, NotFoundReason> {
        let mut sink = NullSink;
        let mut ctx = Context::new(config, &mut sink, None);
        let view = problem.grid.view(Connectivity::Eight);
        engine.search(&view, problem.start, problem.goal, &mut ctx)
    }

    #[test]
    fn matches_astar() {
        let problem = Problem::try_from(indoc! {"
            S.#..
            ..#..
            ..#..
            ..#..
            ....G
        "})
        .unwrap();
        let config = SearchConfig::default();
        let path = solve(
            IdaStar::new(Heuristic::Octile, problem.grid.len()),
            &problem,
            &config,
        )
        .unwrap()
        .unwrap();

        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        let view = problem.grid.view(Connectivity::Eight);
        let astar = BestFirst::astar(Heuristic::Octile)
            .search(&view, problem.start, problem.goal, &mut ctx)
            .unwrap()
            .unwrap();

        assert!((path.length() - astar.length()).abs() < 1e-9, "{path}");
        assert!(path.is_valid_on(&view, false));
    }

    #[test]
    fn unreachable_goal_is_exhausted() {
        let problem = Problem::try_from(indoc! {"
            S.#.
            ..#.
            ###G
        "})
        .unwrap();
        let config = SearchConfig::default();
        let found = solve(
            IdaStar::new(Heuristic::Octile, problem.grid.len()),
            &problem,
            &config,
        );
        assert_eq!(found, Ok(None));
    }

    #[test]
    fn shallow_depth_limit() {
        let problem = Problem::try_from(indoc! {"
            S......G
        "})
        .unwrap();
        let config = SearchConfig::default();
        let found = solve(IdaStar::new(Heuristic::Octile, 3), &problem, &config);
        assert_eq!(found, Err(NotFoundReason::RecursionDepthExceeded));
    }

    #[test]
    fn iteration_limit() {
        let problem = Problem::try_from(indoc! {"
            S.#......
            ..#.####.
            ..#.#..#.
            ....#G.#.
            ....####.
            .........
        "})
        .unwrap();
        let config = SearchConfig {
            max_iterations: 10,
            ..Default::default()
        };
        let found = solve(
            IdaStar::new(Heuristic::Octile, problem.grid.len()),
            &problem,
            &config,
        );
        assert_eq!(found, Err(NotFoundReason::IterationLimitExceeded));
    }
}
