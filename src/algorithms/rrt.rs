//! Rapidly-exploring random trees.
//!
//! The tree lives on cell centres: samples are cells, steering rounds to the
//! nearest cell, and an edge is only added with line of sight, so every path
//! found is a valid any-angle path.
//!
//! [`Rrt`] grows one tree from the start. [`RrtConnect`] grows one from each
//! end and greedily joins them.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use rustc_hash::FxHashMap;

use crate::config::SearchConfig;
use crate::grid::Cell;
use crate::grid::Coord;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::space::Path;
use crate::trace::Context;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub cell: Cell,
    pub parent: Option<usize>,
    /// Length of the branch from the root.
    pub cost: f64,
}

/// A tree rooted at the start, stored as a flat list of nodes.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    children: Vec<Vec<usize>>,
    by_cell: FxHashMap<Cell, usize>,
}

impl Tree {
    fn new(root: Cell) -> Self {
        let mut tree = Self::default();
        tree.push(root, None, 0.0);
        tree
    }

    fn push(&mut self, cell: Cell, parent: Option<usize>, cost: f64) -> usize {
        let i = self.nodes.len();
        self.nodes.push(TreeNode { cell, parent, cost });
        self.children.push(Vec::new());
        if let Some(p) = parent {
            self.children[p].push(i);
        }
        self.by_cell.insert(cell, i);
        i
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn nearest(&self, c: Cell) -> usize {
        let mut best = (f64::INFINITY, 0);
        for (i, n) in self.nodes.iter().enumerate() {
            let d = n.cell.distance(c);
            if d < best.0 {
                best = (d, i);
            }
        }
        best.1
    }

    fn within(&self, c: Cell, radius: f64) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].cell.distance(c) <= radius)
            .collect()
    }

    /// Hangs `i` under `parent`, updating the costs of its whole branch.
    fn reparent(&mut self, i: usize, parent: usize) {
        if let Some(old) = self.nodes[i].parent {
            self.children[old].retain(|c| *c != i);
        }
        self.children[parent].push(i);
        self.nodes[i].parent = Some(parent);

        let mut stack = vec![i];
        while let Some(n) = stack.pop() {
            if let Some(p) = self.nodes[n].parent {
                self.nodes[n].cost = self.nodes[p].cost + self.nodes[p].cell.distance(self.nodes[n].cell);
            }
            stack.extend(self.children[n].iter().copied());
        }
    }

    /// The branch from the root down to `i`.
    pub fn branch(&self, i: usize) -> Path {
        let mut cells = vec![self.nodes[i].cell];
        let mut n = i;
        while let Some(p) = self.nodes[n].parent {
            if cells.len() > self.nodes.len() {
                debug_assert!(false, "Tree cycle found walking back from {}", self.nodes[i].cell);
                log::error!("Tree cycle found walking back from {}", self.nodes[i].cell);
                break;
            }
            cells.push(self.nodes[p].cell);
            n = p;
        }
        cells.reverse();
        Path::from_cells(cells)
    }
}

/// A uniformly random cell of the view.
fn sample<R: Rng>(view: &GridView, rng: &mut R) -> Cell {
    let b = view.bounds();
    Cell::new(rng.random_range(b.x0..b.x1), rng.random_range(b.y0..b.y1))
}

/// Moves at most `step_size` from `from` towards `to`, rounding to a cell.
fn steer(view: &GridView, from: Cell, to: Cell, step_size: f64) -> Cell {
    let d = from.distance(to);
    if d <= step_size {
        return to;
    }
    let t = step_size / d;
    let x = f64::from(from.x) + f64::from(to.x - from.x) * t;
    let y = f64::from(from.y) + f64::from(to.y - from.y) * t;
    let b = view.bounds();
    Cell::new(
        (x.round() as Coord).clamp(b.x0, b.x1 - 1),
        (y.round() as Coord).clamp(b.y0, b.y1 - 1),
    )
}

/// RRT, and RRT* when a rewire radius is given.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rrt {
    pub step_size: f64,
    pub goal_bias: f64,
    pub rewire_radius: Option<f64>,
    pub seed: u64,
}

impl Rrt {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            step_size: config.step_size,
            goal_bias: config.goal_bias,
            rewire_radius: None,
            seed: config.seed,
        }
    }

    pub fn star(config: &SearchConfig) -> Self {
        Self {
            rewire_radius: Some(config.rewire_radius.max(config.step_size)),
            ..Self::new(config)
        }
    }

    /// Grows a tree with a generator seeded from `seed`.
    pub fn search(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.search_with_rng(view, start, goal, &mut rng, ctx)
    }

    pub fn search_with_rng<R: Rng>(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        rng: &mut R,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        let (tree, reached) = self.grow(view, start, goal, rng, ctx)?;
        Ok(reached.map(|i| tree.branch(i)))
    }

    fn sample<R: Rng>(&self, view: &GridView, goal: Cell, rng: &mut R) -> Cell {
        if rng.random_bool(self.goal_bias) {
            return goal;
        }
        sample(view, rng)
    }

    /// Grows the tree until it reaches the goal. Returns the tree and the
    /// goal's node, if reached.
    pub fn grow<R: Rng>(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        rng: &mut R,
        ctx: &mut Context,
    ) -> Result<(Tree, Option<usize>), NotFoundReason> {
        let mut tree = Tree::new(start);
        if !view.passable(start) || !view.passable(goal) || view.bounds().area() == 0 {
            return Ok((tree, None));
        }
        if start == goal {
            return Ok((tree, Some(0)));
        }
        ctx.opened(start);
        if start.distance(goal) <= self.step_size && view.line_of_sight(start, goal) {
            let g = tree.push(goal, Some(0), start.distance(goal));
            ctx.visited(goal);
            return Ok((tree, Some(g)));
        }

        loop {
            ctx.tick()?;
            let sample = self.sample(view, goal, rng);
            let nearest = tree.nearest(sample);
            let from = tree.nodes[nearest].cell;
            let new = steer(view, from, sample, self.step_size);
            ctx.examined();

            if new == from
                || tree.by_cell.contains_key(&new)
                || !view.passable(new)
                || !view.line_of_sight(from, new)
            {
                continue;
            }

            let i = match self.rewire_radius {
                None => tree.push(new, Some(nearest), tree.nodes[nearest].cost + from.distance(new)),
                Some(radius) => self.insert_rewiring(view, &mut tree, nearest, new, radius),
            };
            ctx.visited(new);

            if new == goal {
                return Ok((tree, Some(i)));
            }
            if new.distance(goal) <= self.step_size && view.line_of_sight(new, goal) {
                let cost = tree.nodes[i].cost + new.distance(goal);
                let g = tree.push(goal, Some(i), cost);
                ctx.visited(goal);
                return Ok((tree, Some(g)));
            }
        }
    }

    /// RRT* insertion: cheapest visible parent nearby, then rewire the
    /// neighbourhood through the new node.
    fn insert_rewiring(
        &self,
        view: &GridView,
        tree: &mut Tree,
        nearest: usize,
        new: Cell,
        radius: f64,
    ) -> usize {
        let near = tree.within(new, radius);
        let via = |tree: &Tree, p: usize| tree.nodes[p].cost + tree.nodes[p].cell.distance(new);

        let mut parent = (via(tree, nearest), nearest);
        for &n in &near {
            let cost = via(tree, n);
            if cost < parent.0 && view.line_of_sight(tree.nodes[n].cell, new) {
                parent = (cost, n);
            }
        }
        let i = tree.push(new, Some(parent.1), parent.0);

        for n in near {
            if tree.nodes[n].parent.is_none() {
                continue;
            }
            let cost = tree.nodes[i].cost + new.distance(tree.nodes[n].cell);
            if cost < tree.nodes[n].cost && view.line_of_sight(new, tree.nodes[n].cell) {
                tree.reparent(n, i);
            }
        }
        i
    }
}

/// What a single extension of a tree did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Extension {
    /// Blocked, or no new cell within a step.
    Trapped,
    /// Added a node short of the target.
    Advanced(usize),
    /// The node at the target.
    Reached(usize),
}

/// RRT-Connect: a tree from each end.
///
/// Every iteration one tree takes a step towards a random cell, and the other
/// one steps towards that new node for as long as it can. The trees swap
/// roles after each iteration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RrtConnect {
    pub step_size: f64,
    pub seed: u64,
}

impl RrtConnect {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            step_size: config.step_size,
            seed: config.seed,
        }
    }

    pub fn search(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.search_with_rng(view, start, goal, &mut rng, ctx)
    }

    pub fn search_with_rng<R: Rng>(
        &self,
        view: &GridView,
        start: Cell,
        goal: Cell,
        rng: &mut R,
        ctx: &mut Context,
    ) -> Result<Option<Path>, NotFoundReason> {
        if !view.passable(start) || !view.passable(goal) || view.bounds().area() == 0 {
            return Ok(None);
        }
        if start == goal {
            return Ok(Some(Path::new_from_start(start)));
        }
        if start.distance(goal) <= self.step_size && view.line_of_sight(start, goal) {
            ctx.visited(goal);
            return Ok(Some(Path::from_cells(vec![start, goal])));
        }
        ctx.opened(start);
        ctx.opened(goal);

        // The first tree is the one extended towards samples
        let mut trees = [Tree::new(start), Tree::new(goal)];
        let mut swapped = false;
        loop {
            ctx.tick()?;
            let target = sample(view, rng);
            let [a, b] = &mut trees;
            let grown = match self.extend(view, a, target, ctx) {
                Extension::Trapped => None,
                Extension::Advanced(i) | Extension::Reached(i) => Some(i),
            };

            if let Some(i) = grown {
                let joint = a.nodes[i].cell;
                loop {
                    ctx.tick()?;
                    match self.extend(view, b, joint, ctx) {
                        Extension::Advanced(_) => continue,
                        Extension::Trapped => break,
                        Extension::Reached(j) => {
                            let (from_start, from_goal) = if swapped {
                                (b.branch(j), a.branch(i))
                            } else {
                                (a.branch(i), b.branch(j))
                            };
                            log::debug!(
                                "RRT-Connect joined trees of {} and {} nodes at {joint}",
                                a.len(),
                                b.len()
                            );
                            return Ok(Some(join(from_start, from_goal)));
                        }
                    }
                }
            }

            trees.swap(0, 1);
            swapped = !swapped;
        }
    }

    /// One step of `tree` towards `target`.
    fn extend(&self, view: &GridView, tree: &mut Tree, target: Cell, ctx: &mut Context) -> Extension {
        let nearest = tree.nearest(target);
        let from = tree.nodes[nearest].cell;
        let new = steer(view, from, target, self.step_size);
        ctx.examined();

        if let Some(&known) = tree.by_cell.get(&new) {
            return if new == target {
                Extension::Reached(known)
            } else {
                Extension::Trapped
            };
        }
        if !view.passable(new) || !view.line_of_sight(from, new) {
            return Extension::Trapped;
        }

        let i = tree.push(new, Some(nearest), tree.nodes[nearest].cost + from.distance(new));
        ctx.visited(new);
        if new == target {
            Extension::Reached(i)
        } else {
            Extension::Advanced(i)
        }
    }
}

/// Joins a branch from the start with one from the goal ending on the same
/// cell.
fn join(mut from_start: Path, mut from_goal: Path) -> Path {
    from_goal.reverse();
    from_start.extend(&from_goal);
    from_start
}
