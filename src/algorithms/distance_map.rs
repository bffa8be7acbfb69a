//! Distances from one cell to everything it can reach.
//!
//! Dijkstra without a goal: the frontier runs until it's empty or every cell
//! left in it is further than the cost limit. The result answers distance and
//! path queries for any reached cell, which is handy when the same source is
//! asked about many goals.

use crate::data_structures::frontier::Frontier;
use crate::data_structures::frontier::Rank;
use crate::grid::Cell;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::search::SearchTree;
use crate::search::Status;
use crate::space::Path;
use crate::trace::Context;

#[derive(Clone, Debug)]
pub struct DistanceMap {
    source: Cell,
    tree: SearchTree,
    reached: usize,
}

impl DistanceMap {
    /// Settles every cell within `max_cost` of `source`.
    ///
    /// Pass `f64::INFINITY` to cover the whole connected region. An impassable
    /// source reaches nothing.
    pub fn build(
        view: &GridView,
        source: Cell,
        max_cost: f64,
        ctx: &mut Context,
    ) -> Result<Self, NotFoundReason> {
        let mut tree = SearchTree::new(view.bounds());
        let mut reached = 0;
        if !view.passable(source) {
            return Ok(Self { source, tree, reached });
        }

        let mut open = Frontier::<Rank>::with_capacity(tree.len());
        let mut sequence = 0i64;
        tree[source].g = 0.0;
        tree[source].status = Status::Open;
        open.push_or_update(tree.slot(source), Rank::f(0.0, 0.0, sequence));
        ctx.opened(source);

        while let Some((i, _)) = open.pop() {
            ctx.tick()?;
            let cell = tree.cell(i);
            tree[cell].status = Status::Closed;
            reached += 1;
            ctx.visited(cell);

            for n in view.neighbours(cell) {
                ctx.examined();
                let node = tree[n];
                if node.status == Status::Closed {
                    continue;
                }
                let g = tree[cell].g + view.move_cost(cell, n);
                if g > max_cost || g >= node.g {
                    continue;
                }
                tree[n].g = g;
                tree[n].status = Status::Open;
                tree.set_parent(n, Some(cell));
                sequence += 1;
                open.push_or_update(tree.slot(n), Rank::f(g, 0.0, sequence));
                ctx.opened(n);
            }
        }

        log::debug!("Distance map from {source} settled {reached} cells");
        Ok(Self { source, tree, reached })
    }

    pub fn source(&self) -> Cell {
        self.source
    }

    /// How many cells were settled.
    pub fn len(&self) -> usize {
        self.reached
    }
    pub fn is_empty(&self) -> bool {
        self.reached == 0
    }

    fn settled(&self, c: Cell) -> bool {
        self.tree.contains(c) && self.tree[c].status == Status::Closed
    }

    /// Cost of the cheapest path from the source, if `c` was reached.
    pub fn distance(&self, c: Cell) -> Option<f64> {
        self.settled(c).then(|| self.tree[c].g)
    }

    /// The previous cell on the cheapest path to `c`.
    pub fn parent(&self, c: Cell) -> Option<Cell> {
        if !self.settled(c) {
            return None;
        }
        self.tree.parent(c)
    }

    pub fn path_to(&self, c: Cell) -> Option<Path> {
        if !self.settled(c) {
            return None;
        }
        self.tree.path(c)
    }

    /// Every settled cell with its distance, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, f64)> + '_ {
        (0..self.tree.len())
            .map(|i| self.tree.cell(i))
            .filter(|&c| self.settled(c))
            .map(|c| (c, self.tree[c].g))
    }
}
