use derive_more::Display;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use thiserror::Error;

use crate::cost::edge_cost;
use crate::float_cost::FloatCost;

const MAX_ELEMENTS_DISPLAYED: usize = 20;

pub type Coord = i32;

/// A grid position.
///
/// Coordinates are signed so neighbour offsets and out-of-bounds lookups don't
/// need wrapping arithmetic.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("({x},{y})")]
pub struct Cell {
    pub x: Coord,
    pub y: Coord,
}

impl Cell {
    #[inline(always)]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    #[must_use]
    pub const fn offset(self, dx: Coord, dy: Coord) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Straight line distance to another cell.
    #[inline(always)]
    pub fn distance(self, other: Cell) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }

    /// Whether both cells touch, diagonals included.
    #[inline(always)]
    pub fn is_adjacent(self, other: Cell) -> bool {
        self != other && (self.x - other.x).abs() <= 1 && (self.y - other.y).abs() <= 1
    }
}

#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Terrain {
    #[default]
    #[display("░")]
    Open,
    #[display("█")]
    Wall,
    #[display("≈")]
    Water,
}

impl Terrain {
    /// Whether this is an obstacle for a ground agent.
    #[inline(always)]
    pub fn is_obstacle(self) -> bool {
        self != Terrain::Open
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerrainParseError {
    #[error("Invalid character '{0}' found.")]
    InvalidCharacter(char),
}

impl TryFrom<char> for Terrain {
    type Error = TerrainParseError;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        match ch {
            ' ' | '.' | '░' => Ok(Terrain::Open),
            '#' | '█' => Ok(Terrain::Wall),
            '~' | '≈' => Ok(Terrain::Water),
            ch => Err(TerrainParseError::InvalidCharacter(ch)),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TerrainCostError {
    #[error("{0} is out of bounds")]
    OutOfBounds(Cell),
    #[error("Terrain cost {cost} at {cell} must be finite and at least 1")]
    InvalidCost { cell: Cell, cost: f64 },
}

/// How many cells surround each cell.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Connectivity {
    #[display("4-connected")]
    #[value(alias = "4")]
    Four,
    #[default]
    #[display("8-connected")]
    #[value(alias = "8")]
    Eight,
}

#[rustfmt::skip]
const ORTHOGONAL_DIRECTIONS: [(Coord, Coord); 4] = [
    (1, 0), (0, 1), (-1, 0), (0, -1),
];
#[rustfmt::skip]
const ALL_DIRECTIONS: [(Coord, Coord); 8] = [
    (1, 0), (0, 1), (-1, 0), (0, -1),
    (1, 1), (-1, 1), (-1, -1), (1, -1),
];

impl Connectivity {
    /// Unit offsets to every neighbour, straight moves first.
    pub fn directions(self) -> &'static [(Coord, Coord)] {
        match self {
            Connectivity::Four => &ORTHOGONAL_DIRECTIONS,
            Connectivity::Eight => &ALL_DIRECTIONS,
        }
    }
}

/// What kind of terrain an agent can move through.
///
/// Capabilities are nested: anything a ground agent can enter, an amphibious
/// one can too, and flying agents go everywhere.
#[derive(
    Copy, Clone, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum,
)]
pub enum Capability {
    #[default]
    #[display("ground")]
    Ground,
    #[display("amphibious")]
    Amphibious,
    #[display("flying")]
    Flying,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Ground,
        Capability::Amphibious,
        Capability::Flying,
    ];

    #[inline(always)]
    pub fn can_enter(self, t: Terrain) -> bool {
        match self {
            Capability::Ground => t == Terrain::Open,
            Capability::Amphibious => t != Terrain::Wall,
            Capability::Flying => true,
        }
    }

    /// Whether every cell enterable by `other` is enterable by `self`.
    #[inline(always)]
    pub fn includes(self, other: Capability) -> bool {
        self >= other
    }
}

/// A half-open rectangle `[x0, x1) × [y0, y1)`.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("[{x0},{x1})×[{y0},{y1})")]
pub struct Rect {
    pub x0: Coord,
    pub y0: Coord,
    pub x1: Coord,
    pub y1: Coord,
}

impl Rect {
    pub const fn new(x0: Coord, y0: Coord, x1: Coord, y1: Coord) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[inline(always)]
    pub fn contains(&self, c: Cell) -> bool {
        self.x0 <= c.x && c.x < self.x1 && self.y0 <= c.y && c.y < self.y1
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        (self.x1 - self.x0).max(0) as usize
    }
    #[inline(always)]
    pub fn height(&self) -> usize {
        (self.y1 - self.y0).max(0) as usize
    }
    #[inline(always)]
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Grows the rectangle by `margin` cells on each side, clipped to `within`.
    #[must_use]
    pub fn expand(&self, margin: Coord, within: &Rect) -> Rect {
        Rect::new(
            (self.x0 - margin).max(within.x0),
            (self.y0 - margin).max(within.y0),
            (self.x1 + margin).min(within.x1),
            (self.y1 + margin).min(within.y1),
        )
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.y0..self.y1).flat_map(move |y| (self.x0..self.x1).map(move |x| Cell::new(x, y)))
    }
}

/// A set of square blocks a search is allowed to wander through.
///
/// Blocks are numbered from `origin`, so a corridor lines up with a partition
/// of any sub-rectangle of the grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Corridor {
    origin: Cell,
    block_size: Coord,
    blocks: FxHashSet<(Coord, Coord)>,
}

impl Corridor {
    pub fn new(origin: Cell, block_size: usize) -> Self {
        Self {
            origin,
            block_size: block_size.max(1) as Coord,
            blocks: FxHashSet::default(),
        }
    }

    pub fn insert(&mut self, block: (Coord, Coord)) {
        self.blocks.insert(block);
    }

    pub fn block_of(&self, c: Cell) -> (Coord, Coord) {
        (
            (c.x - self.origin.x).div_euclid(self.block_size),
            (c.y - self.origin.y).div_euclid(self.block_size),
        )
    }

    #[inline(always)]
    pub fn contains(&self, c: Cell) -> bool {
        self.blocks.contains(&self.block_of(c))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A rectangular obstacle grid.
///
/// Cells live in a single row-major `Vec`, so `y * width + x` indexes both the
/// terrain and any per-cell search state.
///
/// Cells may also carry a terrain cost, a multiplier of at least `1` on moves
/// through them. Grids start without one and every cell costs `1`.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Terrain>,
    costs: Option<Vec<FloatCost>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Terrain::Open)
    }

    pub fn filled(width: usize, height: usize, t: Terrain) -> Self {
        debug_assert!(width < Coord::MAX as usize && height < Coord::MAX as usize);
        Self {
            width,
            height,
            cells: vec![t; width * height],
            costs: None,
        }
    }

    /// Builds a grid from row-major terrain. Returns `None` on a size mismatch.
    pub fn from_terrain(width: usize, height: usize, cells: Vec<Terrain>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
            costs: None,
        })
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
    /// Number of cells
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as Coord, self.height as Coord)
    }

    #[inline(always)]
    pub fn in_bounds(&self, c: Cell) -> bool {
        0 <= c.x && (c.x as usize) < self.width && 0 <= c.y && (c.y as usize) < self.height
    }

    #[inline(always)]
    pub fn index(&self, c: Cell) -> Option<usize> {
        self.in_bounds(c)
            .then(|| (c.y as usize) * self.width + (c.x as usize))
    }

    #[inline(always)]
    pub fn cell_at(&self, i: usize) -> Cell {
        debug_assert!(i < self.len());
        Cell::new((i % self.width) as Coord, (i / self.width) as Coord)
    }

    #[inline(always)]
    pub fn terrain(&self, c: Cell) -> Option<Terrain> {
        self.index(c).map(|i| self.cells[i])
    }

    /// Out of bounds cells are obstacles too.
    #[inline(always)]
    pub fn is_obstacle(&self, c: Cell) -> bool {
        self.terrain(c).is_none_or(Terrain::is_obstacle)
    }

    /// Sets the terrain of a cell, returning the previous one.
    ///
    /// Returns `None` (and changes nothing) when the cell is out of bounds.
    pub fn set_terrain(&mut self, c: Cell, t: Terrain) -> Option<Terrain> {
        let i = self.index(c)?;
        Some(std::mem::replace(&mut self.cells[i], t))
    }

    pub fn set_obstacle(&mut self, c: Cell, blocked: bool) -> Option<Terrain> {
        let t = if blocked { Terrain::Wall } else { Terrain::Open };
        self.set_terrain(c, t)
    }

    /// Whether any cell was ever given a terrain cost.
    #[inline(always)]
    pub fn has_terrain_costs(&self) -> bool {
        self.costs.is_some()
    }

    /// Multiplier on moves through `c`. Out of bounds cells cost infinity.
    #[inline(always)]
    pub fn terrain_cost(&self, c: Cell) -> f64 {
        match (self.index(c), &self.costs) {
            (None, _) => f64::INFINITY,
            (Some(_), None) => 1.0,
            (Some(i), Some(costs)) => costs[i].get(),
        }
    }

    /// Sets the terrain cost of a cell, returning the previous one.
    ///
    /// Costs below `1` would let paths get cheaper than their length, and
    /// every heuristic would overestimate them, so they are rejected.
    pub fn set_terrain_cost(&mut self, c: Cell, cost: f64) -> Result<f64, TerrainCostError> {
        let i = self.index(c).ok_or(TerrainCostError::OutOfBounds(c))?;
        if !(cost.is_finite() && cost >= 1.0) {
            return Err(TerrainCostError::InvalidCost { cell: c, cost });
        }
        let len = self.cells.len();
        let costs = self.costs.get_or_insert_with(|| vec![FloatCost::new(1.0); len]);
        Ok(std::mem::replace(&mut costs[i], FloatCost::new(cost)).get())
    }

    pub fn cells(&self) -> impl Iterator<Item = (Cell, Terrain)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, t)| (self.cell_at(i), *t))
    }

    /// A ground-level view using the given connectivity.
    pub fn view(&self, connectivity: Connectivity) -> GridView<'_> {
        GridView::new(self, Capability::Ground, connectivity)
    }

    /// Free neighbours for a ground agent.
    pub fn neighbours(&self, c: Cell, connectivity: Connectivity) -> SmallVec<[Cell; 8]> {
        self.view(connectivity).neighbours(c)
    }

    /// Line of sight for a ground agent.
    pub fn line_of_sight(&self, a: Cell, b: Cell) -> bool {
        self.view(Connectivity::Eight).line_of_sight(a, b)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Grid({}x{}):", self.width, self.height)?;
        for row in self.cells.chunks(self.width.max(1)).take(MAX_ELEMENTS_DISPLAYED) {
            for t in row.iter().take(MAX_ELEMENTS_DISPLAYED) {
                write!(f, "{t}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Grid{:?}", self.dimensions())
    }
}

/// What a single agent sees of a grid.
///
/// Couples the terrain with the agent's capability and an optional region the
/// search must stay in. Every engine enumerates neighbours and checks line of
/// sight through a view, so capability filtering is never ad hoc.
#[derive(Copy, Clone, Debug)]
pub struct GridView<'g> {
    grid: &'g Grid,
    capability: Capability,
    connectivity: Connectivity,
    bounds: Rect,
    corridor: Option<&'g Corridor>,
}

impl<'g> GridView<'g> {
    pub fn new(grid: &'g Grid, capability: Capability, connectivity: Connectivity) -> Self {
        Self {
            grid,
            capability,
            connectivity,
            bounds: grid.bounds(),
            corridor: None,
        }
    }

    /// Restricts the view to a rectangle (clipped to the grid).
    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Rect::new(
            bounds.x0.max(0),
            bounds.y0.max(0),
            bounds.x1.min(self.grid.width as Coord),
            bounds.y1.min(self.grid.height as Coord),
        );
        self
    }

    /// Restricts the view to a set of blocks.
    #[must_use]
    pub fn with_corridor(mut self, corridor: &'g Corridor) -> Self {
        self.corridor = Some(corridor);
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn grid(&self) -> &'g Grid {
        self.grid
    }
    pub fn capability(&self) -> Capability {
        self.capability
    }
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline(always)]
    pub fn in_region(&self, c: Cell) -> bool {
        self.bounds.contains(c) && self.corridor.is_none_or(|k| k.contains(c))
    }

    /// Whether the agent may stand on `c`.
    #[inline(always)]
    pub fn passable(&self, c: Cell) -> bool {
        self.in_region(c)
            && self
                .grid
                .terrain(c)
                .is_some_and(|t| self.capability.can_enter(t))
    }

    /// Passable neighbours of `c`.
    ///
    /// Diagonal moves only need the destination to be free, so corners can be
    /// cut. This matches what `line_of_sight` accepts.
    pub fn neighbours(&self, c: Cell) -> SmallVec<[Cell; 8]> {
        self.connectivity
            .directions()
            .iter()
            .map(|&(dx, dy)| c.offset(dx, dy))
            .filter(|n| self.passable(*n))
            .collect()
    }

    /// Bresenham line of sight.
    ///
    /// Every stepped cell, both ends included, must be passable.
    pub fn line_of_sight(&self, a: Cell, b: Cell) -> bool {
        segment(a, b).all(|c| self.passable(c))
    }

    /// Cost of moving in a straight line from `a` to `b`.
    ///
    /// The segment's length times the mean terrain cost of the cells it steps
    /// through, so a move between neighbours costs its length times the mean
    /// of both ends. Without terrain costs this is just the length.
    #[inline(always)]
    pub fn move_cost(&self, a: Cell, b: Cell) -> f64 {
        let length = edge_cost(a, b);
        if !self.grid.has_terrain_costs() {
            return length;
        }
        if a.is_adjacent(b) {
            return length * (self.grid.terrain_cost(a) + self.grid.terrain_cost(b)) / 2.0;
        }
        // Bresenham isn't symmetric, walk both directions the same way
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        let (sum, n) = segment(from, to).fold((0.0, 0usize), |(sum, n), c| {
            (sum + self.grid.terrain_cost(c), n + 1)
        });
        length * sum / n as f64
    }
}

/// Cells stepped by Bresenham's line from `a` to `b`, both ends included.
pub fn segment(a: Cell, b: Cell) -> impl Iterator<Item = Cell> {
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let (sx, sy) = ((b.x - a.x).signum(), (b.y - a.y).signum());
    let mut err = dx + dy;
    let mut next = Some(a);

    std::iter::from_fn(move || {
        let c = next?;
        next = if c == b {
            None
        } else {
            let mut n = c;
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                n.x += sx;
            }
            if e2 <= dx {
                err += dx;
                n.y += sy;
            }
            Some(n)
        };
        Some(c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walled() -> Grid {
        // ....
        // .##.
        // ....
        let mut g = Grid::new(4, 3);
        g.set_obstacle(Cell::new(1, 1), true);
        g.set_obstacle(Cell::new(2, 1), true);
        g
    }

    #[test]
    fn bounds_and_obstacles() {
        let g = walled();
        assert!(g.in_bounds(Cell::new(3, 2)));
        assert!(!g.in_bounds(Cell::new(4, 0)));
        assert!(!g.in_bounds(Cell::new(-1, 0)));
        assert!(g.is_obstacle(Cell::new(1, 1)));
        assert!(g.is_obstacle(Cell::new(-1, 0)));
        assert!(!g.is_obstacle(Cell::new(0, 0)));
        assert_eq!(g.index(Cell::new(1, 2)), Some(9));
        assert_eq!(g.cell_at(9), Cell::new(1, 2));
    }

    #[test]
    fn neighbours_filter_obstacles() {
        let g = walled();
        let n8 = g.neighbours(Cell::new(0, 0), Connectivity::Eight);
        assert_eq!(n8.as_slice(), &[Cell::new(1, 0), Cell::new(0, 1)]);

        // Corner cutting is allowed
        let n8 = g.neighbours(Cell::new(0, 1), Connectivity::Eight);
        assert!(n8.contains(&Cell::new(1, 0)));
        assert!(n8.contains(&Cell::new(1, 2)));

        let n4 = g.neighbours(Cell::new(3, 1), Connectivity::Four);
        assert_eq!(n4.len(), 2);
    }

    #[test]
    fn line_of_sight() {
        let g = walled();
        assert!(g.line_of_sight(Cell::new(0, 0), Cell::new(3, 0)));
        assert!(!g.line_of_sight(Cell::new(0, 1), Cell::new(3, 1)));
        assert!(!g.line_of_sight(Cell::new(0, 0), Cell::new(3, 2)));
        assert!(g.line_of_sight(Cell::new(0, 2), Cell::new(0, 0)));
        assert!(g.line_of_sight(Cell::new(2, 2), Cell::new(2, 2)));
        // Blocked end points
        assert!(!g.line_of_sight(Cell::new(1, 1), Cell::new(1, 1)));
        assert!(!g.line_of_sight(Cell::new(0, 0), Cell::new(4, 0)));
    }

    #[test]
    fn capabilities() {
        assert!(Capability::Ground.can_enter(Terrain::Open));
        assert!(!Capability::Ground.can_enter(Terrain::Water));
        assert!(Capability::Amphibious.can_enter(Terrain::Water));
        assert!(!Capability::Amphibious.can_enter(Terrain::Wall));
        assert!(Capability::Flying.can_enter(Terrain::Wall));
        assert!(Capability::Flying.includes(Capability::Ground));
        assert!(!Capability::Ground.includes(Capability::Amphibious));

        let mut g = Grid::new(3, 1);
        g.set_terrain(Cell::new(1, 0), Terrain::Water);
        let ground = g.view(Connectivity::Four);
        let boat = ground.with_capability(Capability::Amphibious);
        assert!(!ground.line_of_sight(Cell::new(0, 0), Cell::new(2, 0)));
        assert!(boat.line_of_sight(Cell::new(0, 0), Cell::new(2, 0)));
    }

    #[test]
    fn regions() {
        let g = Grid::new(8, 8);
        let view = g.view(Connectivity::Eight).with_bounds(Rect::new(2, 2, 4, 4));
        assert!(view.passable(Cell::new(3, 3)));
        assert!(!view.passable(Cell::new(4, 3)));
        assert_eq!(view.neighbours(Cell::new(2, 2)).len(), 3);

        let mut corridor = Corridor::new(Cell::new(0, 0), 4);
        corridor.insert((1, 1));
        let view = g.view(Connectivity::Eight).with_corridor(&corridor);
        assert!(view.passable(Cell::new(5, 6)));
        assert!(!view.passable(Cell::new(3, 6)));
    }

    #[test]
    fn corridors_count_blocks_from_their_origin() {
        let g = Grid::new(10, 10);
        let mut corridor = Corridor::new(Cell::new(3, 1), 4);
        assert_eq!(corridor.block_of(Cell::new(3, 1)), (0, 0));
        assert_eq!(corridor.block_of(Cell::new(6, 4)), (0, 0));
        assert_eq!(corridor.block_of(Cell::new(7, 5)), (1, 1));
        assert_eq!(corridor.block_of(Cell::new(2, 0)), (-1, -1));

        corridor.insert((1, 0));
        let view = g.view(Connectivity::Eight).with_corridor(&corridor);
        assert!(view.passable(Cell::new(7, 1)));
        assert!(view.passable(Cell::new(9, 4)));
        assert!(!view.passable(Cell::new(6, 1)));
        assert!(!view.passable(Cell::new(7, 5)));
    }

    #[test]
    fn rect_helpers() {
        let r = Rect::new(1, 1, 3, 4);
        assert_eq!(r.area(), 6);
        assert_eq!(r.cells().count(), 6);
        let within = Rect::new(0, 0, 4, 4);
        assert_eq!(r.expand(2, &within), within);
        assert_eq!(r.union(&Rect::new(0, 0, 1, 1)), Rect::new(0, 0, 3, 4));
    }

    #[test]
    fn segments_include_both_ends() {
        let cells: Vec<Cell> = segment(Cell::new(0, 0), Cell::new(3, 1)).collect();
        assert_eq!(cells.first(), Some(&Cell::new(0, 0)));
        assert_eq!(cells.last(), Some(&Cell::new(3, 1)));
        assert_eq!(cells.len(), 4);
        assert!(cells.windows(2).all(|w| w[0].is_adjacent(w[1])));
        assert_eq!(segment(Cell::new(2, 2), Cell::new(2, 2)).count(), 1);
    }

    #[test]
    fn terrain_costs_scale_moves() {
        let mut g = Grid::new(4, 4);
        let view = g.view(Connectivity::Eight);
        assert!(!g.has_terrain_costs());
        assert_eq!(view.move_cost(Cell::new(0, 0), Cell::new(1, 1)), std::f64::consts::SQRT_2);
        assert_eq!(view.move_cost(Cell::new(0, 0), Cell::new(3, 0)), 3.0);

        assert_eq!(g.set_terrain_cost(Cell::new(1, 0), 3.0), Ok(1.0));
        assert_eq!(g.set_terrain_cost(Cell::new(1, 0), 2.0), Ok(3.0));
        assert_eq!(g.terrain_cost(Cell::new(1, 0)), 2.0);
        assert_eq!(g.terrain_cost(Cell::new(0, 0)), 1.0);
        assert_eq!(g.terrain_cost(Cell::new(9, 0)), f64::INFINITY);

        let view = g.view(Connectivity::Eight);
        // (1 + 2) / 2
        assert_eq!(view.move_cost(Cell::new(0, 0), Cell::new(1, 0)), 1.5);
        assert_eq!(view.move_cost(Cell::new(1, 0), Cell::new(0, 0)), 1.5);
        // (1 + 2 + 1 + 1) / 4 over three cells of length
        assert_eq!(view.move_cost(Cell::new(0, 0), Cell::new(3, 0)), 3.75);
        assert_eq!(view.move_cost(Cell::new(3, 0), Cell::new(0, 0)), 3.75);
        assert_eq!(view.move_cost(Cell::new(0, 1), Cell::new(3, 1)), 3.0);
    }

    #[test]
    fn terrain_costs_below_one_are_rejected() {
        let mut g = Grid::new(2, 2);
        assert_eq!(
            g.set_terrain_cost(Cell::new(2, 0), 2.0),
            Err(TerrainCostError::OutOfBounds(Cell::new(2, 0)))
        );
        assert!(matches!(
            g.set_terrain_cost(Cell::new(0, 0), 0.5),
            Err(TerrainCostError::InvalidCost { .. })
        ));
        assert!(g.set_terrain_cost(Cell::new(0, 0), f64::NAN).is_err());
        assert!(g.set_terrain_cost(Cell::new(0, 0), f64::INFINITY).is_err());
        assert!(!g.has_terrain_costs());
    }
}
