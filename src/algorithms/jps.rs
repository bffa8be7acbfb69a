//! Jump Point Search.
//!
//! A* over jump points: successors are found by scanning straight and
//! diagonal lines from the expanded cell, skipping every cell whose optimal
//! paths can be reached without going through it. Diagonal moves may cut
//! corners, so the pruning rules are the ones Harabor and Grastien published in 2011.

use smallvec::SmallVec;

use crate::algorithms::best_first::BestFirst;
use crate::algorithms::best_first::Expansion;
use crate::cost::Heuristic;
use crate::grid::Cell;
use crate::grid::Coord;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::space::Path;
use crate::trace::Context;

const ALL_DIRECTIONS: [(Coord, Coord); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// Successors by jumping.
#[derive(Copy, Clone, Debug, Default)]
pub struct JumpPoints;

impl Expansion for JumpPoints {
    fn successors(
        &self,
        view: &GridView,
        cell: Cell,
        parent: Option<Cell>,
        goal: Cell,
    ) -> SmallVec<[Cell; 8]> {
        let max_steps = view.bounds().width().max(view.bounds().height());
        pruned_directions(view, cell, parent)
            .into_iter()
            .filter_map(|(dx, dy)| jump(view, cell, dx, dy, goal, max_steps))
            .collect()
    }
}

/// Directions worth scanning from `cell` when arriving from `parent`.
fn pruned_directions(
    view: &GridView,
    cell: Cell,
    parent: Option<Cell>,
) -> SmallVec<[(Coord, Coord); 8]> {
    let Some(p) = parent else {
        return ALL_DIRECTIONS.into_iter().collect();
    };
    let (ddx, ddy) = (cell.x - p.x, cell.y - p.y);
    // Parents off the eight compass lines only show up after any-angle
    // shortcuts, and nothing can be pruned for them.
    if ddx != 0 && ddy != 0 && ddx.abs() != ddy.abs() {
        return ALL_DIRECTIONS.into_iter().collect();
    }
    let (dx, dy) = (ddx.signum(), ddy.signum());
    let blocked = |x, y| !view.passable(cell.offset(x, y));

    let mut dirs = SmallVec::new();
    match (dx, dy) {
        (0, 0) => dirs.extend(ALL_DIRECTIONS),
        (dx, 0) => {
            dirs.push((dx, 0));
            for side in [1, -1] {
                if blocked(0, side) {
                    dirs.push((dx, side));
                }
            }
        }
        (0, dy) => {
            dirs.push((0, dy));
            for side in [1, -1] {
                if blocked(side, 0) {
                    dirs.push((side, dy));
                }
            }
        }
        (dx, dy) => {
            dirs.push((dx, 0));
            dirs.push((0, dy));
            dirs.push((dx, dy));
            if blocked(-dx, 0) {
                dirs.push((-dx, dy));
            }
            if blocked(0, -dy) {
                dirs.push((dx, -dy));
            }
        }
    }
    dirs
}

/// Whether `c`, reached moving along `(dx, dy)`, has a forced neighbour.
fn has_forced(view: &GridView, c: Cell, dx: Coord, dy: Coord) -> bool {
    let forced = |bx, by, tx, ty| !view.passable(c.offset(bx, by)) && view.passable(c.offset(tx, ty));
    match (dx, dy) {
        (dx, 0) => forced(0, 1, dx, 1) || forced(0, -1, dx, -1),
        (0, dy) => forced(1, 0, 1, dy) || forced(-1, 0, -1, dy),
        (dx, dy) => forced(-dx, 0, -dx, dy) || forced(0, -dy, dx, -dy),
    }
}

/// Scans from `from` along `(dx, dy)` for the next jump point.
///
/// Gives up after `max_steps` cells, or when the scan leaves the passable
/// region.
fn jump(
    view: &GridView,
    from: Cell,
    dx: Coord,
    dy: Coord,
    goal: Cell,
    max_steps: usize,
) -> Option<Cell> {
    let diagonal = dx != 0 && dy != 0;
    let mut c = from;
    for _ in 0..max_steps {
        c = c.offset(dx, dy);
        if !view.passable(c) {
            return None;
        }
        if c == goal || has_forced(view, c, dx, dy) {
            return Some(c);
        }
        if diagonal
            && (jump(view, c, dx, 0, goal, max_steps).is_some()
                || jump(view, c, 0, dy, goal, max_steps).is_some())
        {
            return Some(c);
        }
    }
    None
}

/// Jump Point Search on 8-connected grids.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Jps {
    pub heuristic: Heuristic,
    /// Whether to shortcut between jump points with line of sight.
    pub any_angle: bool,
}

impl Jps {
    pub fn new(heuristic: Heuristic) -> Self {
        Self {
            heuristic,
            any_angle: false,
        }
    }

    pub fn theta(heuristic: Heuristic) -> Self {
        Self {
            heuristic,
            any_angle: true,
        }
    }

    /// Plain JPS returns adjacent grid steps; the any-angle variant returns
    /// its waypoints.
    pub fn search(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        if self.any_angle {
            BestFirst::theta_star(self.heuristic).search_with(&JumpPoints, view, start, goal, ctx)
        } else {
            let found = BestFirst::astar(self.heuristic)
                .search_with(&JumpPoints, view, start, goal, ctx)?;
            Ok(found.map(|p| p.densify()))
        }
    }
}
