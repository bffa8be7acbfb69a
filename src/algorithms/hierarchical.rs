//! Hierarchical path-finding over square clusters.
//!
//! The grid is cut into `cluster_size` squares. Wherever two neighbouring
//! clusters touch through passable cells there is an entrance, and a few cells
//! on each side of it become transitions. Searching over transitions (HPA*,
//! HAA*) or over whole clusters (PRA*) first, and only then on the grid near
//! the abstract path, keeps the grid searches small.
//!
//! Every real path crosses cluster borders through some entrance, so an
//! abstract search failing means there is no path at all.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use crate::algorithms::best_first::BestFirst;
use crate::cost::Heuristic;
use crate::data_structures::frontier::Frontier;
use crate::data_structures::frontier::Rank;
use crate::grid::Capability;
use crate::grid::Cell;
use crate::grid::Connectivity;
use crate::grid::Coord;
use crate::grid::Corridor;
use crate::grid::GridView;
use crate::grid::Rect;
use crate::outcome::NotFoundReason;
use crate::space::Path;
use crate::trace::Context;

/// Entrances at least this wide get a transition at each end instead of one
/// in the middle.
pub const ENTRANCE_BREAKPOINT: usize = 6;

#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub rect: Rect,
    /// Whether the agent can stand anywhere in it.
    pub traversable: bool,
    /// Share of cells the agent can't enter.
    pub obstacle_ratio: f64,
    /// Transition cells on this side of its entrances.
    pub entrances: Vec<Cell>,
}

/// A square partition of the grid.
#[derive(Clone, Debug)]
pub struct Clustering {
    size: Coord,
    origin: Cell,
    cols: usize,
    clusters: Vec<Cluster>,
}

impl Clustering {
    /// Partitions the view's bounds; edge clusters may be smaller.
    pub fn new(view: &GridView, size: usize) -> Self {
        let size = size.max(2) as Coord;
        let b = view.bounds();
        let cols = b.width().div_ceil(size as usize);
        let rows = b.height().div_ceil(size as usize);

        let mut clusters = Vec::with_capacity(cols * rows);
        for cy in 0..rows as Coord {
            for cx in 0..cols as Coord {
                let rect = Rect::new(
                    b.x0 + cx * size,
                    b.y0 + cy * size,
                    (b.x0 + (cx + 1) * size).min(b.x1),
                    (b.y0 + (cy + 1) * size).min(b.y1),
                );
                let passable = rect.cells().filter(|c| view.passable(*c)).count();
                clusters.push(Cluster {
                    rect,
                    traversable: passable > 0,
                    obstacle_ratio: 1.0 - passable as f64 / rect.area().max(1) as f64,
                    entrances: Vec::new(),
                });
            }
        }
        Self {
            size,
            origin: Cell::new(b.x0, b.y0),
            cols,
            clusters,
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Column and row of the cluster holding `c`.
    pub fn block_of(&self, c: Cell) -> (Coord, Coord) {
        (
            (c.x - self.origin.x).div_euclid(self.size),
            (c.y - self.origin.y).div_euclid(self.size),
        )
    }

    /// An empty corridor whose blocks are this partition's clusters.
    pub fn corridor(&self) -> Corridor {
        Corridor::new(self.origin, self.size as usize)
    }

    pub fn id_of(&self, c: Cell) -> usize {
        let (cx, cy) = self.block_of(c);
        cy as usize * self.cols + cx as usize
    }

    fn record_entrances(&mut self, transitions: &[Transition]) {
        for t in transitions {
            for c in [t.a, t.b] {
                let id = self.id_of(c);
                if !self.clusters[id].entrances.contains(&c) {
                    self.clusters[id].entrances.push(c);
                }
            }
        }
    }
}

/// A pair of adjacent cells in different clusters, usable by `capability`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub a: Cell,
    pub b: Cell,
    pub capability: Capability,
}

/// Finds every transition between neighbouring clusters for the view's
/// capability.
pub fn find_transitions(view: &GridView, clustering: &Clustering) -> Vec<Transition> {
    let b = view.bounds();
    let size = clustering.size;
    let capability = view.capability();
    let mut out = Vec::new();
    let mut pair = |a: Cell, b: Cell| {
        out.push(Transition {
            a,
            b,
            capability,
        })
    };
    let open = |c: Cell| view.passable(c);

    // Borders between columns, then between rows. `across` maps a position
    // along the border to the pair of cells facing each other.
    let vertical = ((b.x0 + size)..b.x1).step_by(size as usize);
    let horizontal = ((b.y0 + size)..b.y1).step_by(size as usize);
    let borders = vertical
        .map(|x| (true, x))
        .chain(horizontal.map(|y| (false, y)));

    for (is_vertical, line) in borders {
        let across = |t: Coord| {
            if is_vertical {
                (Cell::new(line - 1, t), Cell::new(line, t))
            } else {
                (Cell::new(t, line - 1), Cell::new(t, line))
            }
        };
        let (t0, t1) = if is_vertical { (b.y0, b.y1) } else { (b.x0, b.x1) };

        let mut segment_start = t0;
        while segment_start < t1 {
            let segment_end = (segment_start + size).min(t1);

            // Straight entrances
            let mut t = segment_start;
            while t < segment_end {
                let (l, r) = across(t);
                if !(open(l) && open(r)) {
                    t += 1;
                    continue;
                }
                let run_start = t;
                while t < segment_end && {
                    let (l, r) = across(t);
                    open(l) && open(r)
                } {
                    t += 1;
                }
                let run_end = t - 1;
                let len = (run_end - run_start + 1) as usize;
                if len >= ENTRANCE_BREAKPOINT {
                    let (l, r) = across(run_start);
                    pair(l, r);
                    let (l, r) = across(run_end);
                    pair(l, r);
                } else {
                    let (l, r) = across(run_start + (run_end - run_start) / 2);
                    pair(l, r);
                }
            }

            // Diagonal crossings with no straight alternative
            if view.connectivity() == Connectivity::Eight {
                for t in segment_start..segment_end - 1 {
                    let (l0, r0) = across(t);
                    let (l1, r1) = across(t + 1);
                    let straight = (open(l0) && open(r0)) || (open(l1) && open(r1));
                    if straight {
                        continue;
                    }
                    if open(l0) && open(r1) {
                        pair(l0, r1);
                    }
                    if open(l1) && open(r0) {
                        pair(l1, r0);
                    }
                }
            }
            segment_start = segment_end;
        }
    }

    // Corners where four clusters meet, crossed diagonally
    if view.connectivity() == Connectivity::Eight {
        for x in ((b.x0 + size)..b.x1).step_by(size as usize) {
            for y in ((b.y0 + size)..b.y1).step_by(size as usize) {
                let tl = Cell::new(x - 1, y - 1);
                let tr = Cell::new(x, y - 1);
                let bl = Cell::new(x - 1, y);
                let br = Cell::new(x, y);
                if open(tl) && open(br) && !open(tr) && !open(bl) {
                    pair(tl, br);
                }
                if open(tr) && open(bl) && !open(tl) && !open(br) {
                    pair(tr, bl);
                }
            }
        }
    }

    out
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Edge {
    to: usize,
    cost: f64,
    capability: Capability,
}

/// Transitions (plus start and goal) and the known costs between them.
#[derive(Clone, Debug, Default)]
pub struct AbstractGraph {
    cells: Vec<Cell>,
    cluster_of: Vec<usize>,
    edges: Vec<Vec<Edge>>,
    by_cell: FxHashMap<Cell, usize>,
    members: FxHashMap<usize, Vec<usize>>,
}

impl AbstractGraph {
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn cell(&self, id: usize) -> Cell {
        self.cells[id]
    }

    fn node(&mut self, c: Cell, cluster: usize) -> usize {
        if let Some(&id) = self.by_cell.get(&c) {
            return id;
        }
        let id = self.cells.len();
        self.cells.push(c);
        self.cluster_of.push(cluster);
        self.edges.push(Vec::new());
        self.by_cell.insert(c, id);
        self.members.entry(cluster).or_default().push(id);
        id
    }

    fn link(&mut self, a: usize, b: usize, cost: f64, capability: Capability) {
        self.edges[a].push(Edge {
            to: b,
            cost,
            capability,
        });
        self.edges[b].push(Edge {
            to: a,
            cost,
            capability,
        });
    }

    /// Neighbours reachable with `agent`, and their cost.
    pub fn neighbours(&self, id: usize, agent: Capability) -> Vec<(usize, f64)> {
        self.edges[id]
            .iter()
            .filter(|e| agent.includes(e.capability))
            .map(|e| (e.to, e.cost))
            .collect()
    }

    /// Links `id` to the other nodes of its cluster with bounded searches.
    fn connect_within_cluster(
        &mut self,
        view: &GridView,
        rect: Rect,
        id: usize,
        heuristic: Heuristic,
        ctx: &mut Context,
    ) -> Result<(), NotFoundReason> {
        let cluster = self.cluster_of[id];
        let from = self.cells[id];
        if !view.passable(from) {
            return Ok(());
        }
        let local = view.with_bounds(rect);
        let others: Vec<usize> = self.members.get(&cluster).cloned().unwrap_or_default();
        for other in others {
            let to = self.cells[other];
            if other == id || !view.passable(to) {
                continue;
            }
            if let Some(p) = BestFirst::astar(heuristic).search(&local, from, to, ctx)? {
                self.link(id, other, p.cost_on(view), view.capability());
            }
        }
        Ok(())
    }
}

/// HPA* and HAA*.
///
/// HPA* builds the abstract graph for the agent only. HAA* builds it for
/// every capability, tagging each edge with the capability it was found
/// with, and lets the agent use the edges its capability includes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hierarchical {
    pub cluster_size: usize,
    pub heuristic: Heuristic,
    pub annotated: bool,
}

impl Hierarchical {
    pub fn hpa(cluster_size: usize, heuristic: Heuristic) -> Self {
        Self {
            cluster_size,
            heuristic,
            annotated: false,
        }
    }

    pub fn haa(cluster_size: usize, heuristic: Heuristic) -> Self {
        Self {
            annotated: true,
            ..Self::hpa(cluster_size, heuristic)
        }
    }

    fn capabilities(&self, agent: Capability) -> Vec<Capability> {
        if self.annotated {
            Capability::ALL.to_vec()
        } else {
            vec![agent]
        }
    }

    /// Builds the abstract graph, without start and goal.
    pub fn build(
        &self,
        view: &GridView,
        ctx: &mut Context,
    ) -> Result<(Clustering, AbstractGraph), NotFoundReason> {
        let mut clustering = Clustering::new(view, self.cluster_size);
        let mut graph = AbstractGraph::default();

        let capabilities = self.capabilities(view.capability());
        for &capability in &capabilities {
            let v = view.with_capability(capability);
            let transitions = find_transitions(&v, &clustering);
            for t in &transitions {
                let a = graph.node(t.a, clustering.id_of(t.a));
                let b = graph.node(t.b, clustering.id_of(t.b));
                graph.link(a, b, v.move_cost(t.a, t.b), t.capability);
            }
            if capability == view.capability() {
                clustering.record_entrances(&transitions);
            }
        }

        for &capability in &capabilities {
            let v = view.with_capability(capability);
            for (k, cluster) in clustering.clusters.iter().enumerate() {
                let members = graph.members.get(&k).cloned().unwrap_or_default();
                let local = v.with_bounds(cluster.rect);
                for (n, &i) in members.iter().enumerate() {
                    for &j in &members[n + 1..] {
                        let (from, to) = (graph.cells[i], graph.cells[j]);
                        if !v.passable(from) || !v.passable(to) {
                            continue;
                        }
                        if let Some(p) = BestFirst::astar(self.heuristic).search(&local, from, to, ctx)? {
                            graph.link(i, j, p.cost_on(&v), capability);
                        }
                    }
                }
            }
        }

        log::debug!(
            "Abstract graph with {} nodes over {} clusters",
            graph.len(),
            clustering.clusters.len()
        );
        Ok((clustering, graph))
    }

    /// Adds `c` to the graph, linked to the rest of its cluster.
    fn attach(
        &self,
        view: &GridView,
        clustering: &Clustering,
        graph: &mut AbstractGraph,
        c: Cell,
        ctx: &mut Context,
    ) -> Result<usize, NotFoundReason> {
        let agent = view.capability();
        if let Some(&id) = graph.by_cell.get(&c)
            && graph.edges[id].iter().any(|e| e.capability == agent)
        {
            return Ok(id);
        }
        let k = clustering.id_of(c);
        let id = graph.node(c, k);
        graph.connect_within_cluster(view, clustering.clusters[k].rect, id, self.heuristic, ctx)?;
        Ok(id)
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
        let (clustering, mut graph) = self.build(view, ctx)?;

        let s = self.attach(view, &clustering, &mut graph, start, ctx)?;
        let g = self.attach(view, &clustering, &mut graph, goal, ctx)?;

        let agent = view.capability();
        let heuristic = self.heuristic;
        let Some(ids) = abstract_astar(
            &graph.cells,
            s,
            g,
            |u| graph.neighbours(u, agent),
            |u| heuristic.h(graph.cells[u], goal),
            ctx,
        )?
        else {
            return Ok(None);
        };

        let mut path = Path::new_from_start(start);
        for w in ids.windows(2) {
            let (u, v) = (graph.cells[w[0]], graph.cells[w[1]]);
            if u.is_adjacent(v) && graph.cluster_of[w[0]] != graph.cluster_of[w[1]] {
                path.append(v);
                continue;
            }
            let rect = clustering.clusters[graph.cluster_of[w[0]]].rect;
            match BestFirst::astar(self.heuristic).search(&view.with_bounds(rect), u, v, ctx)? {
                Some(segment) => path.extend(&segment),
                None => {
                    log::error!("Could not refine abstract edge {u} -> {v} within {rect}");
                    return Ok(None);
                }
            }
        }
        Ok(Some(path))
    }
}

/// A* over abstract nodes, reporting each node's cell to the trace.
///
/// Returns the node ids from `from` to `to`.
fn abstract_astar<N, H>(
    cells: &[Cell],
    from: usize,
    to: usize,
    neighbours: N,
    h: H,
    ctx: &mut Context,
) -> Result<Option<Vec<usize>>, NotFoundReason>
where
    N: Fn(usize) -> Vec<(usize, f64)>,
    H: Fn(usize) -> f64,
{
    let n = cells.len();
    let mut g = vec![f64::INFINITY; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut open = Frontier::<Rank>::with_capacity(n);
    let mut sequence = 0i64;

    g[from] = 0.0;
    open.push_or_update(from, Rank::f(0.0, h(from), sequence));

    while let Some((u, _)) = open.pop() {
        ctx.tick()?;
        closed[u] = true;
        ctx.visited(cells[u]);

        if u == to {
            let mut ids = vec![u];
            let mut c = u;
            while let Some(p) = parent[c] {
                if ids.len() > n {
                    log::error!("Abstract parent cycle found walking back from {}", cells[u]);
                    return Ok(None);
                }
                ids.push(p);
                c = p;
            }
            ids.reverse();
            return Ok(Some(ids));
        }

        for (v, cost) in neighbours(u) {
            ctx.examined();
            if closed[v] {
                continue;
            }
            let tentative = g[u] + cost;
            if tentative < g[v] {
                g[v] = tentative;
                parent[v] = Some(u);
                sequence += 1;
                open.push_or_update(v, Rank::f(tentative, h(v), sequence));
                ctx.opened(cells[v]);
            }
        }
    }
    Ok(None)
}

/// Partial-refinement A*: plans over whole clusters, then searches the grid
/// only inside the clusters of the abstract path.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PraStar {
    pub cluster_size: usize,
    pub heuristic: Heuristic,
}

impl PraStar {
    pub fn new(cluster_size: usize, heuristic: Heuristic) -> Self {
        Self {
            cluster_size,
            heuristic,
        }
    }

    /// Passable cell closest to the middle of each cluster.
    fn centres(view: &GridView, clustering: &Clustering) -> Vec<Option<Cell>> {
        clustering
            .clusters
            .iter()
            .map(|k| {
                let mx = f64::from(k.rect.x0 + k.rect.x1 - 1) / 2.0;
                let my = f64::from(k.rect.y0 + k.rect.y1 - 1) / 2.0;
                k.rect
                    .cells()
                    .filter(|c| view.passable(*c))
                    .min_by(|a, b| {
                        let da = (f64::from(a.x) - mx).hypot(f64::from(a.y) - my);
                        let db = (f64::from(b.x) - mx).hypot(f64::from(b.y) - my);
                        da.total_cmp(&db)
                    })
            })
            .collect()
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
        let mut clustering = Clustering::new(view, self.cluster_size);
        let transitions = find_transitions(view, &clustering);
        clustering.record_entrances(&transitions);

        let centres = Self::centres(view, &clustering);
        let mut links: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); clustering.clusters.len()];
        for t in &transitions {
            let (a, b) = (clustering.id_of(t.a), clustering.id_of(t.b));
            links[a].insert(b);
            links[b].insert(a);
        }

        // Cells standing for each cluster, for distances and the trace
        let cells: Vec<Cell> = clustering
            .clusters
            .iter()
            .zip(&centres)
            .map(|(k, c)| c.unwrap_or(Cell::new(k.rect.x0, k.rect.y0)))
            .collect();

        let (from, to) = (clustering.id_of(start), clustering.id_of(goal));
        let clusters = &clustering.clusters;
        let weight = |a: usize, b: usize| {
            let ratio = (clusters[a].obstacle_ratio + clusters[b].obstacle_ratio) / 2.0;
            cells[a].distance(cells[b]) * (1.0 + ratio)
        };
        let mut sorted: Vec<Vec<usize>> = links.iter().map(|l| l.iter().copied().collect()).collect();
        sorted.iter_mut().for_each(|l| l.sort_unstable());

        let Some(route) = abstract_astar(
            &cells,
            from,
            to,
            |u| sorted[u].iter().map(|&v| (v, weight(u, v))).collect(),
            |u| cells[u].distance(cells[to]),
            ctx,
        )?
        else {
            return Ok(None);
        };

        let mut corridor = clustering.corridor();
        for &k in &route {
            corridor.insert(clustering.block_of(cells[k]));
        }
        log::trace!("PRA* corridor through {} clusters", corridor.len());

        let astar = BestFirst::astar(self.heuristic);
        if let Some(p) = astar.search(&view.with_corridor(&corridor), start, goal, ctx)? {
            return Ok(Some(p));
        }

        // The corridor may be connected only through its neighbours
        let mut wider = corridor.clone();
        for &k in &route {
            let (cx, cy) = clustering.block_of(cells[k]);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    wider.insert((cx + dx, cy + dy));
                }
            }
        }
        log::debug!("PRA* widening its corridor to {} clusters", wider.len());
        if let Some(p) = astar.search(&view.with_corridor(&wider), start, goal, ctx)? {
            return Ok(Some(p));
        }

        log::debug!("PRA* falling back to the whole grid");
        astar.search(view, start, goal, ctx)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::config::SearchConfig;
    use crate::grid::Grid;
    use crate::problem::Problem;
    use crate::trace::NullSink;

    fn problem() -> Problem {
        Problem::try_from(indoc! {"
            S.......#.......
            ........#.......
            ..####..#..###..
            ..#.....#....#..
            ..#..#####...#..
            ..#..........#..
            ......#######...
            .......#........
            .......#.....##.
            ..###..#.....#..
            ....#........#.G
        "})
        .unwrap()
    }

    fn astar_cost(view: &GridView, start: Cell, goal: Cell) -> Option<f64> {
        let config = SearchConfig::default();
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        BestFirst::astar(Heuristic::Octile)
            .search(view, start, goal, &mut ctx)
            .unwrap()
            .map(|p| p.length())
    }

    fn run<F>(view: &GridView, start: Cell, goal: Cell, f: F) -> Option<Path>
    where
        F: FnOnce(&GridView, Cell, Cell, &mut Context) -> Result<Option<Path>, NotFoundReason>,
    {
        let config = SearchConfig::default();
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        f(view, start, goal, &mut ctx).unwrap()
    }

    #[test]
    fn clusters_cover_the_grid() {
        let grid = Grid::new(10, 7);
        let view = grid.view(Connectivity::Eight);
        let clustering = Clustering::new(&view, 4);
        assert_eq!(clustering.clusters().len(), 6);
        let area: usize = clustering.clusters().iter().map(|k| k.rect.area()).sum();
        assert_eq!(area, 70);
        assert_eq!(clustering.clusters()[5].rect, Rect::new(8, 4, 10, 7));
        assert_eq!(clustering.id_of(Cell::new(9, 6)), 5);
        assert_eq!(clustering.id_of(Cell::new(3, 3)), 0);
    }

    #[test]
    fn wide_entrances_get_two_transitions() {
        // Two 8x8 clusters side by side, fully open
        let grid = Grid::new(16, 8);
        let view = grid.view(Connectivity::Eight);
        let clustering = Clustering::new(&view, 8);
        let transitions = find_transitions(&view, &clustering);
        assert_eq!(
            transitions,
            vec![
                Transition {
                    a: Cell::new(7, 0),
                    b: Cell::new(8, 0),
                    capability: Capability::Ground
                },
                Transition {
                    a: Cell::new(7, 7),
                    b: Cell::new(8, 7),
                    capability: Capability::Ground
                },
            ]
        );
    }

    #[test]
    fn narrow_entrances_get_one_transition() {
        let p = Problem::try_from(indoc! {"
            S..#....
            ...#....
            ........
            ...#...G
        "})
        .unwrap();
        let view = p.grid.view(Connectivity::Eight);
        let clustering = Clustering::new(&view, 4);
        let transitions = find_transitions(&view, &clustering);
        // The border is between x=3 and x=4, open only at y=2
        assert_eq!(
            transitions,
            vec![Transition {
                a: Cell::new(3, 2),
                b: Cell::new(4, 2),
                capability: Capability::Ground
            }]
        );
    }

    #[test]
    fn diagonal_corners_are_transitions() {
        let p = Problem::try_from(indoc! {"
            S...
            ..#.
            .#..
            ...G
        "})
        .unwrap();
        let view = p.grid.view(Connectivity::Eight);
        let clustering = Clustering::new(&view, 2);
        let transitions = find_transitions(&view, &clustering);
        assert!(transitions.contains(&Transition {
            a: Cell::new(1, 1),
            b: Cell::new(2, 2),
            capability: Capability::Ground
        }));

        let four = p.grid.view(Connectivity::Four);
        let transitions = find_transitions(&four, &clustering);
        assert!(transitions.iter().all(|t| t.a.x == t.b.x || t.a.y == t.b.y));
    }

    #[test]
    fn hierarchical_paths_are_valid_and_complete() {
        let p = problem();
        let view = p.grid.view(Connectivity::Eight);
        let optimal = astar_cost(&view, p.start, p.goal).unwrap();

        for size in [3, 4, 5, 8] {
            let hpa = run(&view, p.start, p.goal, |v, s, g, ctx| {
                Hierarchical::hpa(size, Heuristic::Octile).search(v, s, g, ctx)
            });
            let haa = run(&view, p.start, p.goal, |v, s, g, ctx| {
                Hierarchical::haa(size, Heuristic::Octile).search(v, s, g, ctx)
            });
            let pra = run(&view, p.start, p.goal, |v, s, g, ctx| {
                PraStar::new(size, Heuristic::Octile).search(v, s, g, ctx)
            });

            for (name, path) in [("HPA*", hpa), ("HAA*", haa), ("PRA*", pra)] {
                let path = path.unwrap_or_else(|| panic!("{name} ({size}) found nothing"));
                assert!(path.is_valid_on(&view, false), "{name} ({size}): {path}");
                assert_eq!(path.start(), Some(p.start));
                assert_eq!(path.goal(), Some(p.goal));
                assert!(path.length() >= optimal - 1e-9);
            }
        }
    }

    #[test]
    fn corridors_line_up_with_offset_clusters() {
        let p = problem();
        let view = p.grid.view(Connectivity::Eight).with_bounds(Rect::new(3, 1, 16, 11));
        let clustering = Clustering::new(&view, 4);
        for (id, cluster) in clustering.clusters().iter().enumerate() {
            let corner = Cell::new(cluster.rect.x0, cluster.rect.y0);
            let mut corridor = clustering.corridor();
            corridor.insert(clustering.block_of(corner));
            for c in view.bounds().cells() {
                assert_eq!(corridor.contains(c), cluster.rect.contains(c), "cluster {id} at {c}");
            }
        }

        let (start, goal) = (Cell::new(3, 1), p.goal);
        let optimal = astar_cost(&view, start, goal).unwrap();
        let path = run(&view, start, goal, |v, s, g, ctx| {
            PraStar::new(4, Heuristic::Octile).search(v, s, g, ctx)
        })
        .unwrap();
        assert!(path.is_valid_on(&view, false), "{path}");
        assert!(path.length() >= optimal - 1e-9);
    }

    #[test]
    fn no_path_no_abstract_path() {
        let p = Problem::try_from(indoc! {"
            S...#...
            ....#...
            ....#...
            ....#..G
        "})
        .unwrap();
        let view = p.grid.view(Connectivity::Eight);
        assert!(
            run(&view, p.start, p.goal, |v, s, g, ctx| {
                Hierarchical::hpa(3, Heuristic::Octile).search(v, s, g, ctx)
            })
            .is_none()
        );
        assert!(
            run(&view, p.start, p.goal, |v, s, g, ctx| {
                PraStar::new(3, Heuristic::Octile).search(v, s, g, ctx)
            })
            .is_none()
        );
    }

    #[test]
    fn capabilities_decide_the_route() {
        let p = Problem::try_from(indoc! {"
            S...~...
            ....~...
            ....~...
            ....~..G
        "})
        .unwrap();
        let ground = p.grid.view(Connectivity::Eight);
        let haa = Hierarchical::haa(4, Heuristic::Octile);
        assert!(run(&ground, p.start, p.goal, |v, s, g, ctx| haa.search(v, s, g, ctx)).is_none());

        for agent in [Capability::Amphibious, Capability::Flying] {
            let view = ground.with_capability(agent);
            let path = run(&view, p.start, p.goal, |v, s, g, ctx| haa.search(v, s, g, ctx)).unwrap();
            assert!(path.is_valid_on(&view, false));
            assert!(!path.is_valid_on(&ground, false));
        }
    }

    #[test]
    fn clusters_record_obstacles_and_entrances() {
        let p = Problem::try_from(indoc! {"
            S.##
            ..##
            ...G
            ....
        "})
        .unwrap();
        let view = p.grid.view(Connectivity::Eight);
        let config = SearchConfig::default();
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        let (clustering, graph) = Hierarchical::hpa(2, Heuristic::Octile)
            .build(&view, &mut ctx)
            .unwrap();

        let walled = &clustering.clusters()[1];
        assert!(!walled.traversable);
        assert_eq!(walled.obstacle_ratio, 1.0);
        assert!(walled.entrances.is_empty());

        let open = &clustering.clusters()[0];
        assert!(open.traversable);
        assert_eq!(open.obstacle_ratio, 0.0);
        assert!(!open.entrances.is_empty());
        assert!(!graph.is_empty());
    }
}
