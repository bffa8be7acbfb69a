use nonmax::NonMaxUsize;

use crate::grid::Cell;
use crate::grid::Rect;
use crate::space::Path;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Unseen,
    Open,
    Closed,
}

/// Per-cell search state.
///
/// `E` carries whatever else an engine family needs (nothing for classic
/// searches, the one-step lookahead for incremental ones).
#[derive(Copy, Clone, Debug)]
pub struct SearchNode<E> {
    pub g: f64,
    pub h: f64,
    pub(crate) parent: Option<NonMaxUsize>,
    pub status: Status,
    pub ext: E,
}

impl<E: Default> Default for SearchNode<E> {
    fn default() -> Self {
        Self {
            g: f64::INFINITY,
            h: 0.0,
            parent: None,
            status: Status::Unseen,
            ext: E::default(),
        }
    }
}

/// A flat arena of search nodes covering a rectangle of the grid.
///
/// Nodes are addressed by `(y - y0) * width + (x - x0)` and parents are stored
/// as indices, so the whole search tree is one allocation and never holds
/// references into itself.
#[derive(Clone)]
pub struct SearchTree<E = ()> {
    area: Rect,
    nodes: Vec<SearchNode<E>>,
}

impl<E> SearchTree<E>
where
    E: Copy + Default,
{
    #[must_use]
    pub fn new(area: Rect) -> Self {
        Self {
            area,
            nodes: vec![SearchNode::default(); area.area()],
        }
    }

    /// Forgets everything, keeping the allocation.
    pub fn reset(&mut self) {
        self.nodes.fill(SearchNode::default());
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn area(&self) -> Rect {
        self.area
    }

    #[inline(always)]
    pub fn contains(&self, c: Cell) -> bool {
        self.area.contains(c)
    }

    #[inline(always)]
    pub fn slot(&self, c: Cell) -> usize {
        debug_assert!(self.contains(c), "{c} is outside {}", self.area);
        ((c.y - self.area.y0) as usize) * self.area.width() + ((c.x - self.area.x0) as usize)
    }

    #[inline(always)]
    pub fn cell(&self, i: usize) -> Cell {
        let w = self.area.width();
        Cell::new(self.area.x0 + (i % w) as i32, self.area.y0 + (i / w) as i32)
    }

    #[inline(always)]
    pub fn parent(&self, c: Cell) -> Option<Cell> {
        self[c].parent.map(|p| self.cell(p.get()))
    }

    #[inline(always)]
    pub fn set_parent(&mut self, c: Cell, parent: Option<Cell>) {
        let p = parent.and_then(|p| NonMaxUsize::new(self.slot(p)));
        self[c].parent = p;
    }

    /// Walks parents back from `end` to the root of its branch.
    ///
    /// Returns `None` if the walk doesn't finish within as many steps as there
    /// are nodes, which would mean the parents form a cycle.
    #[must_use]
    pub fn path(&self, end: Cell) -> Option<Path> {
        let mut cells = vec![end];
        let mut c = end;
        while let Some(p) = self.parent(c) {
            if cells.len() > self.nodes.len() {
                debug_assert!(false, "Parent cycle found walking back from {end}");
                log::error!("Parent cycle found walking back from {end}");
                return None;
            }
            cells.push(p);
            c = p;
        }
        cells.reverse();
        Some(Path::from_cells(cells))
    }
}

impl<E> std::ops::Index<Cell> for SearchTree<E>
where
    E: Copy + Default,
{
    type Output = SearchNode<E>;

    #[inline(always)]
    fn index(&self, c: Cell) -> &Self::Output {
        &self.nodes[self.slot(c)]
    }
}

impl<E> std::ops::IndexMut<Cell> for SearchTree<E>
where
    E: Copy + Default,
{
    #[inline(always)]
    fn index_mut(&mut self, c: Cell) -> &mut Self::Output {
        let i = self.slot(c);
        &mut self.nodes[i]
    }
}

impl<E> std::fmt::Debug for SearchTree<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SearchTree{{{} ({} nodes)}}", self.area, self.nodes.len())
    }
}
