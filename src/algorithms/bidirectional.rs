//! Bidirectional A*.
//!
//! One A* grows from the start towards the goal and another from the goal
//! towards the start, always expanding the side with the smaller frontier.
//! Every time a relaxed cell is already known to the other side, the path
//! through it becomes a candidate. The search stops once either frontier's
//! best `f` can't beat the cheapest candidate, which with a consistent
//! heuristic makes it optimal.

use crate::cost::Heuristic;
use crate::data_structures::frontier::Frontier;
use crate::data_structures::frontier::Rank;
use crate::grid::Cell;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::search::SearchTree;
use crate::search::Status;
use crate::space::Path;
use crate::trace::Context;

/// One direction of the search.
struct Side {
    tree: SearchTree,
    open: Frontier<Rank>,
    /// Where this side is heading.
    target: Cell,
}

impl Side {
    fn new(view: &GridView, root: Cell, target: Cell, heuristic: Heuristic, sequence: &mut i64) -> Self {
        let mut tree = SearchTree::new(view.bounds());
        let mut open = Frontier::with_capacity(tree.len());
        let h = heuristic.h(root, target);
        tree[root].g = 0.0;
        tree[root].h = h;
        tree[root].status = Status::Open;
        *sequence += 1;
        open.push_or_update(tree.slot(root), Rank::new(h, 0.0, *sequence));
        Self { tree, open, target }
    }

    /// Smallest `f` left in the frontier.
    fn min_f(&self) -> Option<f64> {
        self.open.peek().map(|(_, rank)| rank.primary.get())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bidirectional {
    pub heuristic: Heuristic,
}

impl Bidirectional {
    pub fn new(heuristic: Heuristic) -> Self {
        Self { heuristic }
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
        if start == goal {
            return Ok(Some(Path::new_from_start(start)));
        }

        let mut sequence = 0i64;
        let mut sides = [
            Side::new(view, start, goal, self.heuristic, &mut sequence),
            Side::new(view, goal, start, self.heuristic, &mut sequence),
        ];
        ctx.opened(start);
        ctx.opened(goal);

        // Cheapest known path, as its cost and the cell both sides met on
        let mut best: Option<(f64, Cell)> = None;
        while let (Some(forward), Some(backward)) = (sides[0].min_f(), sides[1].min_f()) {
            if best.is_some_and(|(mu, _)| forward.max(backward) >= mu) {
                break;
            }
            ctx.tick()?;

            let [a, b] = &mut sides;
            let (this, other) = if a.open.len() <= b.open.len() { (a, b) } else { (b, a) };
            let Some((i, _)) = this.open.pop() else {
                break;
            };
            let cell = this.tree.cell(i);
            this.tree[cell].status = Status::Closed;
            ctx.visited(cell);

            for n in view.neighbours(cell) {
                ctx.examined();
                let node = this.tree[n];
                if node.status == Status::Closed {
                    continue;
                }
                let g = this.tree[cell].g + view.move_cost(cell, n);
                if g >= node.g {
                    continue;
                }

                let h = match node.status {
                    Status::Unseen => self.heuristic.h(n, this.target),
                    _ => node.h,
                };
                this.tree[n].g = g;
                this.tree[n].h = h;
                this.tree[n].status = Status::Open;
                this.tree.set_parent(n, Some(cell));
                sequence += 1;
                this.open.push_or_update(this.tree.slot(n), Rank::new(g + h, g, sequence));
                ctx.opened(n);

                let through = g + other.tree[n].g;
                if best.is_none_or(|(mu, _)| through < mu) {
                    best = Some((through, n));
                }
            }
        }

        let Some((mu, meet)) = best else {
            return Ok(None);
        };
        log::debug!("Bidirectional A* met at {meet} for {mu:.3}");
        let [forward, backward] = &sides;
        let Some(mut path) = forward.tree.path(meet) else {
            return Ok(None);
        };
        let Some(mut rest) = backward.tree.path(meet) else {
            return Ok(None);
        };
        rest.reverse();
        path.extend(&rest);
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::SQRT_2;

    use indoc::indoc;

    use super::*;
    use crate::algorithms::best_first::BestFirst;
    use crate::config::SearchConfig;
    use crate::grid::Connectivity;
    use crate::problem::Problem;
    use crate::trace::NullSink;

    fn solve<F>(problem: &Problem, connectivity: Connectivity, f: F) -> Option<Path>
    where
        F: FnOnce(&GridView, &mut Context) -> Result<Option<Path>, NotFoundReason>,
    {
        let config = SearchConfig::default();
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        let view = problem.grid.view(connectivity);
        f(&view, &mut ctx).unwrap()
    }

    fn maze() -> Problem {
        Problem::try_from(indoc! {"
            S...#.......
            .##.#.####..
            .#..#....#..
            .#.####..#.#
            .#......##..
            .######.#..G
        "})
        .unwrap()
    }

    #[test]
    fn meets_in_the_middle_optimally() {
        let p = maze();
        for connectivity in [Connectivity::Eight, Connectivity::Four] {
            let astar = solve(&p, connectivity, |v, ctx| {
                BestFirst::astar(Heuristic::Octile).search(v, p.start, p.goal, ctx)
            })
            .unwrap();
            let both = solve(&p, connectivity, |v, ctx| {
                Bidirectional::new(Heuristic::Octile).search(v, p.start, p.goal, ctx)
            })
            .unwrap();
            let view = p.grid.view(connectivity);
            assert!(both.is_valid_on(&view, false), "{both}");
            assert_eq!(both.start(), Some(p.start));
            assert_eq!(both.goal(), Some(p.goal));
            assert!((both.length() - astar.length()).abs() < 1e-9, "{both} vs {astar}");
        }
    }

    #[test]
    fn open_grids_take_the_diagonal() {
        let p = Problem::try_from(indoc! {"
            S....
            .....
            .....
            ....G
        "})
        .unwrap();
        let path = solve(&p, Connectivity::Eight, |v, ctx| {
            Bidirectional::new(Heuristic::Euclidean).search(v, p.start, p.goal, ctx)
        })
        .unwrap();
        assert!((path.length() - (3.0 * SQRT_2 + 1.0)).abs() < 1e-9, "{path}");
    }

    #[test]
    fn separated_endpoints_have_no_path() {
        let p = Problem::try_from(indoc! {"
            S..#...
            ...#...
            ...#..G
        "})
        .unwrap();
        let path = solve(&p, Connectivity::Eight, |v, ctx| {
            Bidirectional::new(Heuristic::Octile).search(v, p.start, p.goal, ctx)
        });
        assert_eq!(path, None);
    }

    #[test]
    fn terrain_costs_are_avoided() {
        let mut p = Problem::try_from(indoc! {"
            S...G
            .....
        "})
        .unwrap();
        for x in 1..4 {
            p.grid.set_terrain_cost(Cell::new(x, 0), 5.0).unwrap();
        }
        let path = solve(&p, Connectivity::Eight, |v, ctx| {
            Bidirectional::new(Heuristic::Octile).search(v, p.start, p.goal, ctx)
        })
        .unwrap();
        let view = p.grid.view(Connectivity::Eight);
        // Down, along the bottom row and back up
        assert!(path.cells().iter().all(|c| c.y == 1 || c.x == 0 || c.x == 4), "{path}");
        assert!((path.cost_on(&view) - (2.0 * SQRT_2 + 2.0)).abs() < 1e-9, "{path}");
    }
}
