use crate::cost::edge_cost;
use crate::grid::Cell;
use crate::grid::GridView;

const MAX_ELEMENTS_DISPLAYED: usize = 20;

/// An ordered list of waypoints, start and goal included.
///
/// Consecutive cells are either adjacent (grid engines) or connected by a
/// straight line of sight (any-angle engines). `length` is always the sum of
/// the Euclidean segment lengths, [`Path::cost_on`] adds terrain costs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    cells: Vec<Cell>,
    length: f64,
}

impl Path {
    #[inline(always)]
    pub fn new_from_start(start: Cell) -> Self {
        Self {
            cells: vec![start],
            length: 0.0,
        }
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let length = cells.windows(2).map(|w| edge_cost(w[0], w[1])).sum();
        Self { cells, length }
    }

    #[inline(always)]
    pub fn append(&mut self, c: Cell) {
        if let Some(&last) = self.cells.last() {
            self.length += edge_cost(last, c);
        }
        self.cells.push(c);
    }

    /// Appends another path that starts where this one ends.
    pub fn extend(&mut self, other: &Path) {
        let skip = match (self.cells.last(), other.cells.first()) {
            (Some(a), Some(b)) if a == b => 1,
            _ => 0,
        };
        for &c in &other.cells[skip..] {
            self.append(c);
        }
    }

    /// Reverses the path. Its length doesn't change.
    pub fn reverse(&mut self) {
        self.cells.reverse();
    }

    #[inline(always)]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
    #[inline(always)]
    pub fn length(&self) -> f64 {
        self.length
    }
    /// Number of waypoints
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn start(&self) -> Option<Cell> {
        self.cells.first().copied()
    }
    pub fn goal(&self) -> Option<Cell> {
        self.cells.last().copied()
    }

    /// What following the path costs on `view`, terrain included.
    pub fn cost_on(&self, view: &GridView) -> f64 {
        if !view.grid().has_terrain_costs() {
            return self.length;
        }
        self.cells.windows(2).map(|w| view.move_cost(w[0], w[1])).sum()
    }

    /// Expands every segment into adjacent grid steps.
    ///
    /// Straight and diagonal segments expand exactly, so the length is
    /// preserved for jump point paths.
    #[must_use]
    pub fn densify(&self) -> Path {
        let Some(&first) = self.cells.first() else {
            return Path::default();
        };
        let mut dense = Path::new_from_start(first);
        for w in self.cells.windows(2) {
            let (mut c, to) = (w[0], w[1]);
            while c != to {
                c = c.offset((to.x - c.x).signum(), (to.y - c.y).signum());
                dense.append(c);
            }
        }
        dense
    }

    /// Whether an agent with the given view can follow this path.
    ///
    /// Every waypoint must be passable, and each segment must be a legal move
    /// or, when `any_angle` is set, an unobstructed straight line.
    pub fn is_valid_on(&self, view: &GridView, any_angle: bool) -> bool {
        if !self.cells.iter().all(|c| view.passable(*c)) {
            return false;
        }
        self.cells.windows(2).all(|w| {
            let (a, b) = (w[0], w[1]);
            if any_angle {
                view.line_of_sight(a, b)
            } else {
                view.connectivity()
                    .directions()
                    .iter()
                    .any(|&(dx, dy)| a.offset(dx, dy) == b)
            }
        })
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Path({:.3}, [", self.length)?;
        for (i, c) in self.cells.iter().take(MAX_ELEMENTS_DISPLAYED).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{c}")?;
        }
        if self.cells.len() > MAX_ELEMENTS_DISPLAYED {
            write!(f, " …")?;
        }
        write!(f, "])")
    }
}
