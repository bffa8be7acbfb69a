//! Incremental replanning on changing grids.
//!
//! Every engine here keeps two estimates per cell: `g`, the settled cost
//! from the root, and `rhs`, the one-step lookahead computed from the
//! neighbours' `g`. Cells where they differ are inconsistent and wait in the
//! frontier. After terrain edits, or the start or goal moving, only the cells
//! whose lookahead changed become inconsistent, and the next replan repairs
//! just those.
//!
//! Forward engines root the search at the start, backward ones at the goal so
//! the start can move without invalidating what's known.

use derive_more::Display;
use smallvec::SmallVec;

use crate::config::InvalidRequest;
use crate::config::SearchConfig;
use crate::cost::Heuristic;
use crate::data_structures::frontier::Frontier;
use crate::data_structures::frontier::Rank;
use crate::float_cost::COST_EPSILON;
use crate::float_cost::FloatCost;
use crate::grid::Cell;
use crate::grid::Grid;
use crate::grid::GridView;
use crate::grid::Terrain;
use crate::grid::TerrainCostError;
use crate::outcome::NotFoundReason;
use crate::outcome::Outcome;
use crate::search::SearchTree;
use crate::search::Status;
use crate::space::Path;
use crate::trace::CancelToken;
use crate::trace::Context;
use crate::trace::NullSink;
use crate::trace::TraceSink;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum ReplannerKind {
    /// Lifelong Planning A*: fixed start and goal, changing terrain.
    #[display("LPA*")]
    LpaStar,
    /// D* Lite: searches from the goal so the start can move.
    #[display("D*-Lite")]
    DStarLite,
    /// Moving Target D* Lite: searches from the start, keeping the part of
    /// the tree that survives start moves, and the goal can move too.
    #[display("MTD*-Lite")]
    MtdStarLite,
    /// Generalized Adaptive A*: learns a better heuristic after every search.
    #[display("GAA*")]
    GaaStar,
    /// Any-angle D* Lite.
    #[display("Field D*")]
    FieldDStar,
    /// Any-angle LPA*.
    #[display("Incremental Phi*")]
    IncrementalPhiStar,
}

impl ReplannerKind {
    pub fn searches_backward(self) -> bool {
        matches!(self, ReplannerKind::DStarLite | ReplannerKind::FieldDStar)
    }

    pub fn is_any_angle(self) -> bool {
        matches!(
            self,
            ReplannerKind::FieldDStar | ReplannerKind::IncrementalPhiStar
        )
    }

    pub fn learns(self) -> bool {
        self == ReplannerKind::GaaStar
    }
}

/// The one-step lookahead kept next to `g`.
#[derive(Copy, Clone, Debug)]
pub struct Lookahead {
    pub rhs: f64,
}

impl Default for Lookahead {
    fn default() -> Self {
        Self { rhs: f64::INFINITY }
    }
}

type Key = (FloatCost, FloatCost);

/// Which end the search grows from, and how it estimates the rest.
#[derive(Copy, Clone, Debug)]
struct Roles {
    root: Cell,
    target: Cell,
    backward: bool,
    any_angle: bool,
    heuristic: Heuristic,
    weight: f64,
}

/// Search state that survives between replans.
#[derive(Clone, Debug)]
struct State {
    tree: SearchTree<Lookahead>,
    open: Frontier<Rank>,
    km: f64,
    sequence: i64,
    /// Learned heuristic values (unweighted), zero when nothing was learned.
    learned: Vec<f64>,
    /// Cells whose parent is each cell. Only tracked for any-angle engines,
    /// where parents aren't always neighbours.
    children: Vec<SmallVec<[usize; 4]>>,
}

fn heuristic_of(learned: &[f64], tree: &SearchTree<Lookahead>, r: &Roles, s: Cell) -> f64 {
    let base = r.heuristic.h(s, r.target);
    r.weight * base.max(learned[tree.slot(s)])
}

fn key_of(learned: &[f64], tree: &SearchTree<Lookahead>, km: f64, r: &Roles, s: Cell) -> Key {
    let node = tree[s];
    let m = node.g.min(node.ext.rhs);
    (
        FloatCost::new(m + heuristic_of(learned, tree, r, s) + km),
        FloatCost::new(m),
    )
}

/// Lexicographic `a < b`, with primaries within rounding error counted as
/// equal.
///
/// Keys along a shortest path tie on the primary, and summing `1`s and `√2`s
/// in different orders can order those ties either way.
fn key_below(a: Key, b: Key) -> bool {
    let (a1, b1) = (a.0.get(), b.0.get());
    if !a1.is_finite() || !b1.is_finite() {
        return a < b;
    }
    let tolerance = COST_EPSILON * b1.abs().max(1.0);
    if a1 < b1 - tolerance {
        true
    } else if a1 > b1 + tolerance {
        false
    } else {
        a.1 < b.1
    }
}

/// Line of sight along the direction the path will be followed.
fn sight(view: &GridView, r: &Roles, parent: Cell, child: Cell) -> bool {
    if r.backward {
        view.line_of_sight(child, parent)
    } else {
        view.line_of_sight(parent, child)
    }
}

impl State {
    fn new(grid: &Grid) -> Self {
        let tree = SearchTree::new(grid.bounds());
        let n = tree.len();
        Self {
            open: Frontier::with_capacity(n),
            tree,
            km: 0.0,
            sequence: 0,
            learned: vec![0.0; n],
            children: vec![SmallVec::new(); n],
        }
    }

    /// Forgets everything but learned heuristics.
    fn init(&mut self, r: &Roles) {
        self.tree.reset();
        self.open.clear();
        self.km = 0.0;
        self.children.iter_mut().for_each(SmallVec::clear);

        self.tree[r.root].ext.rhs = 0.0;
        let key = self.key(r, r.root);
        let rank = self.rank(key);
        self.open.push_or_update(self.tree.slot(r.root), rank);
        self.tree[r.root].status = Status::Open;
    }

    fn key(&self, r: &Roles, s: Cell) -> Key {
        key_of(&self.learned, &self.tree, self.km, r, s)
    }

    fn rank(&mut self, key: Key) -> Rank {
        self.sequence += 1;
        Rank {
            primary: key.0,
            secondary: key.1,
            sequence: self.sequence,
        }
    }

    /// Recomputes every queued key, after the heuristic changed.
    fn rekey(&mut self, r: &Roles) {
        let (tree, learned, km) = (&self.tree, &self.learned, self.km);
        self.open.rekey_all(|id, old| {
            let (primary, secondary) = key_of(learned, tree, km, r, tree.cell(id));
            Rank {
                primary,
                secondary,
                sequence: old.sequence,
            }
        });
    }

    fn set_parent(&mut self, r: &Roles, s: Cell, parent: Option<Cell>) {
        let old = self.tree.parent(s);
        if old == parent {
            return;
        }
        if r.any_angle {
            let i = self.tree.slot(s);
            if let Some(o) = old {
                let o = self.tree.slot(o);
                self.children[o].retain(|c| *c != i);
            }
            if let Some(p) = parent {
                let p = self.tree.slot(p);
                self.children[p].push(i);
            }
        }
        self.tree.set_parent(s, parent);
    }

    /// Best lookahead for `s` and the parent it comes through.
    fn lookahead(&self, view: &GridView, r: &Roles, s: Cell) -> (f64, Option<Cell>) {
        let mut best = (f64::INFINITY, None);
        if !view.passable(s) {
            return best;
        }
        for n in view.neighbours(s) {
            let through = self.tree[n].g + view.move_cost(n, s);
            if through < best.0 {
                best = (through, Some(n));
            }
            if !r.any_angle {
                continue;
            }
            let Some(p) = self.tree.parent(n) else {
                continue;
            };
            let through = self.tree[p].g + view.move_cost(p, s);
            if p != s && through < best.0 && sight(view, r, p, s) {
                best = (through, Some(p));
            }
        }
        best
    }

    /// Refreshes the lookahead of `s` and its place in the frontier.
    ///
    /// Returns whether `s` is queued.
    fn update_vertex(&mut self, view: &GridView, r: &Roles, s: Cell) -> bool {
        if s != r.root {
            let (rhs, parent) = self.lookahead(view, r, s);
            self.tree[s].ext.rhs = rhs;
            self.set_parent(r, s, parent);
        }

        let node = self.tree[s];
        let i = self.tree.slot(s);
        if node.g != node.ext.rhs {
            let key = self.key(r, s);
            let rank = self.rank(key);
            self.open.push_or_update(i, rank);
            self.tree[s].status = Status::Open;
            true
        } else {
            self.open.remove(i);
            false
        }
    }

    /// Cells whose lookahead may depend on `u`.
    fn affected(&self, view: &GridView, r: &Roles, u: Cell) -> SmallVec<[Cell; 12]> {
        let mut cells: SmallVec<[Cell; 12]> = view.neighbours(u).into_iter().collect();
        if r.any_angle {
            let children = &self.children[self.tree.slot(u)];
            cells.extend(children.iter().map(|c| self.tree.cell(*c)));
        }
        cells
    }

    fn compute(&mut self, view: &GridView, r: &Roles, ctx: &mut Context) -> Result<(), NotFoundReason> {
        while let Some((i, top)) = self.open.peek() {
            let target = self.tree[r.target];
            let top_key = (top.primary, top.secondary);
            if !key_below(top_key, self.key(r, r.target)) && target.g == target.ext.rhs {
                break;
            }
            ctx.tick()?;

            let u = self.tree.cell(i);
            let fresh = self.key(r, u);
            if top_key < fresh {
                let rank = self.rank(fresh);
                self.open.push_or_update(i, rank);
                continue;
            }
            self.open.pop();
            ctx.visited(u);

            let node = self.tree[u];
            if node.g > node.ext.rhs {
                self.tree[u].g = node.ext.rhs;
                self.tree[u].status = Status::Closed;
            } else {
                self.tree[u].g = f64::INFINITY;
                if self.update_vertex(view, r, u) {
                    ctx.opened(u);
                }
            }
            for s in self.affected(view, r, u) {
                ctx.examined();
                if self.update_vertex(view, r, s) {
                    ctx.opened(s);
                }
            }
        }
        Ok(())
    }

    fn path(&self, r: &Roles) -> Option<Path> {
        if !self.tree[r.target].g.is_finite() {
            return None;
        }
        let mut path = self.tree.path(r.target)?;
        if path.start() != Some(r.root) {
            log::error!("Parents from {} lead to {:?}, not {}", r.target, path.start(), r.root);
            return None;
        }
        if r.backward {
            path.reverse();
        }
        Some(path)
    }

    /// GAA* heuristic update after a successful search.
    fn learn(&mut self, r: &Roles) {
        let goal_g = self.tree[r.target].g;
        let mut updated = 0usize;
        for i in 0..self.tree.len() {
            let s = self.tree.cell(i);
            let node = self.tree[s];
            if !node.g.is_finite() || node.g != node.ext.rhs {
                continue;
            }
            let h = r.heuristic.h(s, r.target).max(self.learned[i]);
            if node.g + h <= goal_g && goal_g - node.g > self.learned[i] {
                self.learned[i] = goal_g - node.g;
                updated += 1;
            }
        }
        log::trace!("Learned {updated} heuristic values");
        self.rekey(r);
    }

    /// Keeps only the subtree below the new root, and requeues the rest.
    fn reroot(&mut self, view: &GridView, r: &Roles) {
        let n = self.tree.len();
        let mut children: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
        for i in 0..n {
            if let Some(p) = self.tree.parent(self.tree.cell(i)) {
                children[self.tree.slot(p)].push(i);
            }
        }

        let root = self.tree.slot(r.root);
        let mut keep = vec![false; n];
        keep[root] = true;
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            for &c in &children[i] {
                if !keep[c] {
                    keep[c] = true;
                    stack.push(c);
                }
            }
        }

        self.set_parent(r, r.root, None);
        self.tree[r.root].ext.rhs = 0.0;

        let mut deleted = Vec::new();
        for (i, kept) in keep.into_iter().enumerate() {
            if kept {
                continue;
            }
            let c = self.tree.cell(i);
            self.set_parent(r, c, None);
            let node = &mut self.tree[c];
            node.g = f64::INFINITY;
            node.ext.rhs = f64::INFINITY;
            node.status = Status::Unseen;
            self.open.remove(i);
            deleted.push(c);
        }
        log::trace!("Rerooting at {} dropped {} cells", r.root, deleted.len());

        for c in deleted {
            if view.passable(c) {
                self.update_vertex(view, r, c);
            }
        }
        self.update_vertex(view, r, r.root);
    }
}

/// An incremental planner owning its grid.
///
/// Build one, `replan`, edit the terrain or move the endpoints through its
/// API, and `replan` again.
#[derive(Clone, Debug)]
pub struct Replanner {
    kind: ReplannerKind,
    grid: Grid,
    config: SearchConfig,
    heuristic: Heuristic,
    start: Cell,
    goal: Cell,
    /// Start position when `km` was last bumped.
    last_start: Cell,
    state: State,
}

impl Replanner {
    pub fn new(
        kind: ReplannerKind,
        grid: Grid,
        start: Cell,
        goal: Cell,
        config: &SearchConfig,
    ) -> Result<Self, InvalidRequest> {
        config.validate()?;
        if !grid.in_bounds(start) {
            return Err(InvalidRequest::StartOutOfBounds(start));
        }
        if !grid.in_bounds(goal) {
            return Err(InvalidRequest::GoalOutOfBounds(goal));
        }

        let heuristic = if kind.is_any_angle() {
            config.heuristic.for_any_angle()
        } else {
            config.heuristic.for_grid(config.connectivity)
        };
        let state = State::new(&grid);
        let mut replanner = Self {
            kind,
            grid,
            config: config.clone(),
            heuristic,
            start,
            goal,
            last_start: start,
            state,
        };
        let r = replanner.roles();
        replanner.state.init(&r);
        Ok(replanner)
    }

    pub fn kind(&self) -> ReplannerKind {
        self.kind
    }
    pub fn grid(&self) -> &Grid {
        &self.grid
    }
    pub fn start(&self) -> Cell {
        self.start
    }
    pub fn goal(&self) -> Cell {
        self.goal
    }

    /// Settled cost from the root, infinite when unknown.
    pub fn g(&self, c: Cell) -> f64 {
        if self.grid.in_bounds(c) {
            self.state.tree[c].g
        } else {
            f64::INFINITY
        }
    }

    /// One-step lookahead cost from the root, infinite when unknown.
    pub fn rhs(&self, c: Cell) -> f64 {
        if self.grid.in_bounds(c) {
            self.state.tree[c].ext.rhs
        } else {
            f64::INFINITY
        }
    }

    pub fn is_consistent(&self, c: Cell) -> bool {
        self.g(c) == self.rhs(c)
    }

    fn roles(&self) -> Roles {
        let backward = self.kind.searches_backward();
        let (root, target) = if backward {
            (self.goal, self.start)
        } else {
            (self.start, self.goal)
        };
        Roles {
            root,
            target,
            backward,
            any_angle: self.kind.is_any_angle(),
            heuristic: self.heuristic,
            weight: self.config.weight,
        }
    }

    fn view(&self) -> GridView<'_> {
        GridView::new(&self.grid, self.config.capability, self.config.connectivity)
    }

    fn unsupported(&self, operation: &'static str) -> InvalidRequest {
        InvalidRequest::UnsupportedOperation {
            engine: self.kind.to_string(),
            operation,
        }
    }

    /// Changes the terrain of a cell, returning what was there.
    ///
    /// Only the cell and the cells around it (or, for any-angle engines,
    /// those that could see through it) are requeued.
    pub fn set_terrain(&mut self, c: Cell, t: Terrain) -> Result<Terrain, InvalidRequest> {
        let capability = self.config.capability;
        let Some(before) = self.grid.terrain(c) else {
            return Err(InvalidRequest::CellOutOfBounds(c));
        };
        self.grid.set_terrain(c, t);
        let was_passable = capability.can_enter(before);
        let is_passable = capability.can_enter(t);
        if was_passable == is_passable {
            return Ok(before);
        }
        log::trace!("{}: {c} changed from {before} to {t}", self.kind);

        let r = self.roles();
        let view = GridView::new(&self.grid, capability, self.config.connectivity);
        if self.kind.learns() && is_passable {
            // Distances may shrink, learned values could overestimate now
            self.state.learned.fill(0.0);
            self.state.rekey(&r);
        }

        self.state.update_vertex(&view, &r, c);
        for n in view.neighbours(c) {
            self.state.update_vertex(&view, &r, n);
        }

        if r.any_angle && !is_passable {
            for i in 0..self.state.tree.len() {
                let s = self.state.tree.cell(i);
                if let Some(p) = self.state.tree.parent(s)
                    && !sight(&view, &r, p, s)
                {
                    self.state.update_vertex(&view, &r, s);
                }
            }
        }
        Ok(before)
    }

    pub fn set_obstacle(&mut self, c: Cell, blocked: bool) -> Result<Terrain, InvalidRequest> {
        let t = if blocked { Terrain::Wall } else { Terrain::Open };
        self.set_terrain(c, t)
    }

    /// Changes the terrain cost of a cell, returning the previous one.
    ///
    /// Only moves into and out of `c` change, so grid engines requeue the
    /// cell and its neighbours. Any-angle segments from afar may cross it,
    /// so any-angle engines start over.
    pub fn set_terrain_cost(&mut self, c: Cell, cost: f64) -> Result<f64, InvalidRequest> {
        let before = self.grid.set_terrain_cost(c, cost).map_err(|e| match e {
            TerrainCostError::OutOfBounds(c) => InvalidRequest::CellOutOfBounds(c),
            TerrainCostError::InvalidCost { cell, cost } => {
                InvalidRequest::InvalidTerrainCost { cell, cost }
            }
        })?;
        if before == cost {
            return Ok(before);
        }
        log::trace!("{}: {c} now costs {cost} (was {before})", self.kind);

        let r = self.roles();
        if r.any_angle {
            self.last_start = self.start;
            self.state.init(&r);
            return Ok(before);
        }
        if self.kind.learns() && cost < before {
            self.state.learned.fill(0.0);
            self.state.rekey(&r);
        }
        let view = GridView::new(&self.grid, self.config.capability, self.config.connectivity);
        self.state.update_vertex(&view, &r, c);
        for n in view.neighbours(c) {
            self.state.update_vertex(&view, &r, n);
        }
        Ok(before)
    }

    /// Moves the start, typically as the agent follows the last path.
    pub fn move_start(&mut self, c: Cell) -> Result<(), InvalidRequest> {
        if !self.grid.in_bounds(c) {
            return Err(InvalidRequest::StartOutOfBounds(c));
        }
        match self.kind {
            ReplannerKind::LpaStar => return Err(self.unsupported("moving the start")),
            ReplannerKind::DStarLite | ReplannerKind::FieldDStar => {
                self.state.km += self.config.weight * self.heuristic.h(self.last_start, c);
                self.last_start = c;
                self.start = c;
            }
            ReplannerKind::MtdStarLite => {
                self.start = c;
                let r = self.roles();
                let view = GridView::new(&self.grid, self.config.capability, self.config.connectivity);
                self.state.reroot(&view, &r);
            }
            ReplannerKind::GaaStar | ReplannerKind::IncrementalPhiStar => {
                self.start = c;
                let r = self.roles();
                self.state.init(&r);
            }
        }
        Ok(())
    }

    /// Moves the goal, typically following a moving target.
    pub fn move_goal(&mut self, c: Cell) -> Result<(), InvalidRequest> {
        if !self.grid.in_bounds(c) {
            return Err(InvalidRequest::GoalOutOfBounds(c));
        }
        let old = self.goal;
        match self.kind {
            ReplannerKind::LpaStar => return Err(self.unsupported("moving the goal")),
            ReplannerKind::DStarLite | ReplannerKind::FieldDStar => {
                self.goal = c;
                self.last_start = self.start;
                let r = self.roles();
                self.state.init(&r);
            }
            ReplannerKind::GaaStar => {
                let effective =
                    |learned: &[f64], i: usize, s: Cell| self.heuristic.h(s, old).max(learned[i]);
                let tree = &self.state.tree;
                let offset = effective(&self.state.learned, tree.slot(c), c);
                let corrected: Vec<f64> = (0..tree.len())
                    .map(|i| (effective(&self.state.learned, i, tree.cell(i)) - offset).max(0.0))
                    .collect();
                self.state.learned = corrected;
                self.goal = c;
                let r = self.roles();
                self.state.rekey(&r);
            }
            ReplannerKind::MtdStarLite | ReplannerKind::IncrementalPhiStar => {
                self.goal = c;
                let r = self.roles();
                self.state.rekey(&r);
            }
        }
        Ok(())
    }

    pub fn replan(&mut self) -> Outcome {
        self.replan_traced(&mut NullSink, None)
    }

    pub fn replan_traced(
        &mut self,
        sink: &mut dyn TraceSink,
        cancel: Option<&CancelToken>,
    ) -> Outcome {
        let mut ctx = Context::new(&self.config, sink, cancel);
        let result = self.replan_with(&mut ctx);
        ctx.finish(&self.view(), result)
    }

    /// Repairs the search state and extracts the path, accounting on `ctx`.
    pub fn replan_with(&mut self, ctx: &mut Context) -> Result<Option<Path>, NotFoundReason> {
        let r = self.roles();
        let view = GridView::new(&self.grid, self.config.capability, self.config.connectivity);
        if !view.passable(self.start) || !view.passable(self.goal) {
            return Ok(None);
        }
        if self.start == self.goal {
            return Ok(Some(Path::new_from_start(self.start)));
        }

        log::trace!("{} replanning {} -> {}", self.kind, self.start, self.goal);
        self.state.compute(&view, &r, ctx)?;
        let path = self.state.path(&r);
        if self.kind.learns() && path.is_some() {
            self.state.learn(&r);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::algorithms::best_first::BestFirst;
    use crate::grid::Connectivity;
    use crate::problem::Problem;

    const GRID_KINDS: [ReplannerKind; 4] = [
        ReplannerKind::LpaStar,
        ReplannerKind::DStarLite,
        ReplannerKind::MtdStarLite,
        ReplannerKind::GaaStar,
    ];

    fn astar(grid: &Grid, start: Cell, goal: Cell) -> Option<f64> {
        let config = SearchConfig::default();
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        let view = grid.view(Connectivity::Eight);
        BestFirst::astar(Heuristic::Octile)
            .search(&view, start, goal, &mut ctx)
            .unwrap()
            .map(|p| p.cost_on(&view))
    }

    fn replanner(kind: ReplannerKind, problem: &Problem) -> Replanner {
        Replanner::new(
            kind,
            problem.grid.clone(),
            problem.start,
            problem.goal,
            &SearchConfig::default(),
        )
        .unwrap()
    }

    fn maze() -> Problem {
        Problem::try_from(indoc! {"
            S.........
            .######...
            ......#...
            .####.#.#.
            ....#...#G
        "})
        .unwrap()
    }

    fn open_field() -> Problem {
        let mut rows = vec![".".repeat(24); 24];
        rows[0].replace_range(0..1, "S");
        rows[23].replace_range(23..24, "G");
        Problem::try_from(rows.join("\n").as_str()).unwrap()
    }

    fn assert_optimal(r: &Replanner, outcome: &Outcome) {
        let expected = astar(r.grid(), r.start(), r.goal());
        assert_eq!(outcome.cost().is_some(), expected.is_some(), "{outcome}");
        if let (Some(cost), Some(expected)) = (outcome.cost(), expected) {
            assert!((cost - expected).abs() < 1e-9, "{}: {cost} != {expected}", r.kind());
            let path = outcome.path().unwrap();
            assert!(path.is_valid_on(&r.grid().view(Connectivity::Eight), false));
            assert_eq!(path.start(), Some(r.start()));
            assert_eq!(path.goal(), Some(r.goal()));
        }
    }

    #[test]
    fn first_plan_is_optimal() {
        let problem = maze();
        for kind in GRID_KINDS {
            let mut r = replanner(kind, &problem);
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
            assert!(r.is_consistent(r.goal()));
            assert!(r.is_consistent(r.start()));
        }
    }

    #[test]
    fn root_lookahead_is_zero() {
        let problem = maze();
        let lpa = replanner(ReplannerKind::LpaStar, &problem);
        assert_eq!(lpa.rhs(problem.start), 0.0);
        let dstar = replanner(ReplannerKind::DStarLite, &problem);
        assert_eq!(dstar.rhs(problem.goal), 0.0);
    }

    #[test]
    fn blocking_the_path_reroutes() {
        let problem = maze();
        for kind in GRID_KINDS {
            let mut r = replanner(kind, &problem);
            let first = r.replan();
            let blocked = first.path().unwrap().cells()[3];
            r.set_obstacle(blocked, true).unwrap();
            let second = r.replan();
            assert_optimal(&r, &second);
            assert!(!second.path().unwrap().cells().contains(&blocked));
        }
    }

    #[test]
    fn opening_a_wall_shortens_the_path() {
        let problem = maze();
        for kind in GRID_KINDS {
            let mut r = replanner(kind, &problem);
            let first = r.replan().cost().unwrap();
            r.set_obstacle(Cell::new(6, 3), false).unwrap();
            r.set_obstacle(Cell::new(6, 2), false).unwrap();
            let second = r.replan();
            assert_optimal(&r, &second);
            assert!(second.cost().unwrap() <= first);
        }
    }

    #[test]
    fn repairs_are_local() {
        let problem = open_field();
        for kind in GRID_KINDS {
            let mut r = replanner(kind, &problem);
            let Outcome::Found { nodes_expanded, .. } = r.replan() else {
                panic!("{kind} found no path");
            };
            // Far away from anything that matters
            r.set_obstacle(Cell::new(23, 0), true).unwrap();
            let Outcome::Found {
                nodes_expanded: repair,
                ..
            } = r.replan()
            else {
                panic!("{kind} lost its path");
            };
            assert!(repair < nodes_expanded, "{kind}: {repair} >= {nodes_expanded}");
        }
    }

    #[test]
    fn moving_the_start() {
        let problem = maze();
        for kind in [
            ReplannerKind::DStarLite,
            ReplannerKind::MtdStarLite,
            ReplannerKind::GaaStar,
        ] {
            let mut r = replanner(kind, &problem);
            let first = r.replan();
            let cells = first.path().unwrap().cells().to_vec();
            for &c in &cells[1..4] {
                r.move_start(c).unwrap();
                let outcome = r.replan();
                assert_optimal(&r, &outcome);
            }
            r.set_obstacle(cells[5], true).unwrap();
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
        }
    }

    #[test]
    fn keys_within_rounding_are_ties() {
        let key = |a: f64, b: f64| (FloatCost::new(a), FloatCost::new(b));
        let summed = 1.0 + std::f64::consts::SQRT_2 * 3.0 + 2.0;
        let other = std::f64::consts::SQRT_2 * 3.0 + 3.0;
        assert!(key_below(key(summed, 1.0), key(other, 2.0)));
        assert!(key_below(key(other, 1.0), key(summed, 2.0)));
        assert!(!key_below(key(summed, 2.0), key(other, 2.0)));
        assert!(key_below(key(7.0, 9.0), key(8.0, 0.0)));
        assert!(!key_below(key(8.0, 0.0), key(7.0, 9.0)));
        assert!(key_below(key(8.0, 0.0), key(f64::INFINITY, f64::INFINITY)));
        assert!(!key_below(key(f64::INFINITY, 0.0), key(f64::INFINITY, 0.0)));
    }

    #[test]
    fn edits_after_the_start_moved() {
        let problem = Problem::try_from(indoc! {"
            ....#..G#..#
            #..#..#.#...
            #.##.....#.#
            #...#......S
            ......#.#...
            .##.#....#..
            #.#.#.......
            #...........
            ...#........
        "})
        .unwrap();
        let edits = [
            (Cell::new(1, 0), true),
            (Cell::new(2, 4), true),
            (Cell::new(3, 1), false),
            (Cell::new(0, 7), false),
            (Cell::new(2, 3), true),
        ];
        for kind in [
            ReplannerKind::DStarLite,
            ReplannerKind::MtdStarLite,
            ReplannerKind::GaaStar,
        ] {
            let mut r = replanner(kind, &problem);
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
            r.move_start(Cell::new(1, 3)).unwrap();
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
            for (c, blocked) in edits {
                r.set_obstacle(c, blocked).unwrap();
                let outcome = r.replan();
                assert_optimal(&r, &outcome);
            }
            assert!((r.replan().cost().unwrap() - (5.0 + 2.0 * std::f64::consts::SQRT_2)).abs() < 1e-9);
        }
    }

    #[test]
    fn moving_the_goal() {
        let problem = maze();
        for kind in [
            ReplannerKind::DStarLite,
            ReplannerKind::MtdStarLite,
            ReplannerKind::GaaStar,
        ] {
            let mut r = replanner(kind, &problem);
            r.replan();
            for goal in [Cell::new(9, 3), Cell::new(7, 4), Cell::new(5, 2)] {
                r.move_goal(goal).unwrap();
                let outcome = r.replan();
                assert_optimal(&r, &outcome);
            }
        }
    }

    #[test]
    fn terrain_cost_edits() {
        let problem = maze();
        for kind in GRID_KINDS {
            let mut r = replanner(kind, &problem);
            let first = r.replan();
            let cells = first.path().unwrap().cells().to_vec();
            for &c in &cells[2..5] {
                assert_eq!(r.set_terrain_cost(c, 6.0), Ok(1.0));
            }
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
            assert!(outcome.cost().unwrap() > first.cost().unwrap(), "{kind}");

            // Cheaper again
            assert_eq!(r.set_terrain_cost(cells[3], 1.0), Ok(6.0));
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
            for &c in &cells[2..5] {
                r.set_terrain_cost(c, 1.0).unwrap();
            }
            let outcome = r.replan();
            assert_optimal(&r, &outcome);
            assert!((outcome.cost().unwrap() - first.cost().unwrap()).abs() < 1e-9, "{kind}");
        }
    }

    #[test]
    fn bad_terrain_costs_are_rejected() {
        let problem = maze();
        let mut r = replanner(ReplannerKind::DStarLite, &problem);
        assert_eq!(
            r.set_terrain_cost(Cell::new(10, 0), 2.0),
            Err(InvalidRequest::CellOutOfBounds(Cell::new(10, 0)))
        );
        assert!(matches!(
            r.set_terrain_cost(Cell::new(1, 0), 0.5),
            Err(InvalidRequest::InvalidTerrainCost { .. })
        ));
        assert!(!r.grid().has_terrain_costs());
    }

    #[test]
    fn lpa_star_endpoints_are_fixed() {
        let problem = maze();
        let mut r = replanner(ReplannerKind::LpaStar, &problem);
        assert!(matches!(
            r.move_start(Cell::new(1, 0)),
            Err(InvalidRequest::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            r.move_goal(Cell::new(1, 0)),
            Err(InvalidRequest::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn edits_out_of_bounds() {
        let problem = maze();
        let mut r = replanner(ReplannerKind::DStarLite, &problem);
        assert_eq!(
            r.set_obstacle(Cell::new(10, 0), true),
            Err(InvalidRequest::CellOutOfBounds(Cell::new(10, 0)))
        );
        assert_eq!(
            r.move_start(Cell::new(-1, 0)),
            Err(InvalidRequest::StartOutOfBounds(Cell::new(-1, 0)))
        );
    }

    #[test]
    fn walling_off_the_goal() {
        let problem = maze();
        for kind in GRID_KINDS {
            let mut r = replanner(kind, &problem);
            r.replan();
            for c in [Cell::new(8, 3), Cell::new(9, 3)] {
                r.set_obstacle(c, true).unwrap();
            }
            let outcome = r.replan();
            assert_eq!(
                outcome,
                Outcome::not_found(NotFoundReason::Exhausted),
                "{kind}"
            );
        }
    }

    #[test]
    fn any_angle_replanning() {
        let problem = maze();
        for kind in [
            ReplannerKind::FieldDStar,
            ReplannerKind::IncrementalPhiStar,
        ] {
            let mut r = replanner(kind, &problem);
            let view_valid = |r: &Replanner, outcome: &Outcome| {
                let path = outcome.path().unwrap();
                assert!(
                    path.is_valid_on(&r.grid().view(Connectivity::Eight), true),
                    "{kind}: {path}"
                );
                assert_eq!(path.start(), Some(r.start()));
                assert_eq!(path.goal(), Some(r.goal()));
                let grid_cost = astar(r.grid(), r.start(), r.goal()).unwrap();
                assert!(path.length() <= grid_cost + 1e-6, "{kind}: {path}");
            };

            let first = r.replan();
            view_valid(&r, &first);

            let blocked = first.path().unwrap().densify().cells()[2];
            r.set_obstacle(blocked, true).unwrap();
            let second = r.replan();
            view_valid(&r, &second);

            let costly = second.path().unwrap().densify().cells()[2];
            r.set_terrain_cost(costly, 3.0).unwrap();
            let third = r.replan();
            let path = third.path().unwrap();
            assert!(path.is_valid_on(&r.grid().view(Connectivity::Eight), true), "{kind}: {path}");
            assert_eq!(path.goal(), Some(r.goal()));
        }
    }
}
