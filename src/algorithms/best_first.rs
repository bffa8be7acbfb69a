use smallvec::SmallVec;

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

/// How the frontier orders cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Order {
    /// Breadth-first: discovery order.
    Fifo,
    /// Depth-first: most recent discovery first.
    Lifo,
    /// Best-first on `g + weight * h`.
    Cost,
}

/// How a successor gets its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Relaxation {
    /// Through the expanded cell.
    Grid,
    /// Through the expanded cell's parent when it can see the successor.
    Theta,
    /// Through the expanded cell's parent, checking line of sight only once
    /// the successor is expanded.
    LazyTheta,
}

/// Where successors come from.
pub trait Expansion {
    fn successors(
        &self,
        view: &GridView,
        cell: Cell,
        parent: Option<Cell>,
        goal: Cell,
    ) -> SmallVec<[Cell; 8]>;
}

/// Plain grid moves.
#[derive(Copy, Clone, Debug, Default)]
pub struct Adjacent;

impl Expansion for Adjacent {
    #[inline(always)]
    fn successors(
        &self,
        view: &GridView,
        cell: Cell,
        _parent: Option<Cell>,
        _goal: Cell,
    ) -> SmallVec<[Cell; 8]> {
        view.neighbours(cell)
    }
}

/// The best-first search loop behind BFS, DFS, Dijkstra, (weighted) A*,
/// Theta* and Lazy Theta*.
///
/// They only differ on frontier order, the heuristic and its weight, and how
/// successors pick their parent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BestFirst {
    pub order: Order,
    pub relaxation: Relaxation,
    pub heuristic: Heuristic,
    pub weight: f64,
}

impl BestFirst {
    pub fn breadth_first() -> Self {
        Self {
            order: Order::Fifo,
            relaxation: Relaxation::Grid,
            heuristic: Heuristic::Zero,
            weight: 1.0,
        }
    }
    pub fn depth_first() -> Self {
        Self {
            order: Order::Lifo,
            ..Self::breadth_first()
        }
    }
    pub fn dijkstra() -> Self {
        Self::astar(Heuristic::Zero)
    }
    pub fn astar(heuristic: Heuristic) -> Self {
        Self::weighted_astar(heuristic, 1.0)
    }
    pub fn weighted_astar(heuristic: Heuristic, weight: f64) -> Self {
        debug_assert!(weight >= 1.0);
        Self {
            order: Order::Cost,
            relaxation: Relaxation::Grid,
            heuristic,
            weight,
        }
    }
    pub fn theta_star(heuristic: Heuristic) -> Self {
        Self {
            relaxation: Relaxation::Theta,
            ..Self::astar(heuristic)
        }
    }
    pub fn lazy_theta_star(heuristic: Heuristic) -> Self {
        Self {
            relaxation: Relaxation::LazyTheta,
            ..Self::astar(heuristic)
        }
    }

    #[inline(always)]
    fn h(&self, c: Cell, goal: Cell) -> f64 {
        match self.order {
            Order::Cost => self.heuristic.h(c, goal),
            Order::Fifo | Order::Lifo => 0.0,
        }
    }

    #[inline(always)]
    fn rank(&self, g: f64, h: f64, sequence: &mut i64) -> Rank {
        *sequence += 1;
        match self.order {
            Order::Fifo => Rank::new(0.0, 0.0, *sequence),
            Order::Lifo => Rank::new(0.0, 0.0, -*sequence),
            Order::Cost => Rank::new(g + self.weight * h, g, *sequence),
        }
    }

    /// Searches over plain grid moves.
    pub fn search(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        self.search_with(&Adjacent, view, start, goal, ctx)
    }

    /// Searches from `start` to `goal`, staying within the view.
    ///
    /// `Ok(None)` means the frontier ran dry, so there is no path.
    pub fn search_with<X: Expansion>(
        &self,
        expansion: &X,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        if !view.passable(start) || !view.passable(goal) {
            return Ok(None);
        }

        let mut tree = SearchTree::<()>::new(view.bounds());
        let mut open = Frontier::<Rank>::with_capacity(tree.len());
        let mut sequence = 0i64;

        let h = self.h(start, goal);
        tree[start].g = 0.0;
        tree[start].h = h;
        tree[start].status = Status::Open;
        open.push_or_update(tree.slot(start), self.rank(0.0, h, &mut sequence));
        ctx.opened(start);

        while let Some((i, _rank)) = open.pop() {
            ctx.tick()?;
            let cell = tree.cell(i);
            if self.relaxation == Relaxation::LazyTheta {
                settle_lazy_parent(view, &mut tree, cell);
            }
            tree[cell].status = Status::Closed;
            ctx.visited(cell);

            if cell == goal {
                return Ok(tree.path(goal));
            }

            let parent = tree.parent(cell);
            for n in expansion.successors(view, cell, parent, goal) {
                ctx.examined();
                let node = tree[n];
                if node.status == Status::Closed {
                    continue;
                }

                let (g, via) = match self.order {
                    Order::Fifo | Order::Lifo => {
                        if node.status != Status::Unseen {
                            continue;
                        }
                        (tree[cell].g + view.move_cost(cell, n), cell)
                    }
                    Order::Cost => self.relax(view, &tree, cell, n),
                };
                if g >= node.g {
                    continue;
                }

                let h = match node.status {
                    Status::Unseen => self.h(n, goal),
                    _ => node.h,
                };
                tree[n].g = g;
                tree[n].h = h;
                tree[n].status = Status::Open;
                tree.set_parent(n, Some(via));
                open.push_or_update(tree.slot(n), self.rank(g, h, &mut sequence));
                ctx.opened(n);
            }
        }

        Ok(None)
    }

    /// Tentative `g` of `n` when reached from `cell`, and the parent it'd get.
    #[inline(always)]
    fn relax(&self, view: &GridView, tree: &SearchTree, cell: Cell, n: Cell) -> (f64, Cell) {
        let through_cell = (tree[cell].g + view.move_cost(cell, n), cell);
        let grandparent = tree.parent(cell);

        match (self.relaxation, grandparent) {
            (Relaxation::Grid, _) | (_, None) => through_cell,
            (Relaxation::Theta, Some(p)) => {
                if !view.line_of_sight(p, n) {
                    return through_cell;
                }
                let through_parent = (tree[p].g + view.move_cost(p, n), p);
                if through_parent.0 < through_cell.0 {
                    through_parent
                } else {
                    through_cell
                }
            }
            (Relaxation::LazyTheta, Some(p)) => (tree[p].g + view.move_cost(p, n), p),
        }
    }
}

/// Checks the optimistic parent Lazy Theta* picked for `cell`.
///
/// Without line of sight the cell falls back to its best expanded neighbour,
/// which always exists since one of them generated it.
fn settle_lazy_parent(view: &GridView, tree: &mut SearchTree, cell: Cell) {
    let Some(p) = tree.parent(cell) else {
        return;
    };
    if view.line_of_sight(p, cell) {
        return;
    }

    let best = view
        .neighbours(cell)
        .into_iter()
        .filter(|n| tree[*n].status == Status::Closed)
        .map(|n| (tree[n].g + view.move_cost(n, cell), n))
        .min_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((g, n)) = best {
        tree[cell].g = g;
        tree.set_parent(cell, Some(n));
    }
}
