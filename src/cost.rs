use std::f64::consts::SQRT_2;

use derive_more::Display;

use crate::grid::Cell;
use crate::grid::Connectivity;

pub const ORTHOGONAL_COST: f64 = 1.0;
pub const DIAGONAL_COST: f64 = SQRT_2;

/// Cost of moving between two cells.
///
/// Adjacent cells cost `1` or `√2`, and any-angle segments cost their length,
/// which agrees with the former on adjacent cells.
#[inline(always)]
pub fn edge_cost(a: Cell, b: Cell) -> f64 {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    match (dx, dy) {
        (0, 0) => 0.0,
        (1, 0) | (0, 1) => ORTHOGONAL_COST,
        (1, 1) => DIAGONAL_COST,
        _ => a.distance(b),
    }
}

/// Distance estimates between cells.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Heuristic {
    /// Always zero. Turns A* into Dijkstra.
    #[display("zero")]
    Zero,
    /// The distance of following straight lines
    #[display("manhattan")]
    Manhattan,
    /// The straight-line distance
    #[display("euclidean")]
    Euclidean,
    /// The distance of maximising useful diagonals
    #[default]
    #[display("octile")]
    Octile,
    /// Diagonals as cheap as straight moves
    #[display("chebyshev")]
    Chebyshev,
}

impl Heuristic {
    #[inline(always)]
    pub fn h(self, a: Cell, b: Cell) -> f64 {
        let dx = f64::from((a.x - b.x).abs());
        let dy = f64::from((a.y - b.y).abs());
        let [delta_min, delta_max] = if dx < dy { [dx, dy] } else { [dy, dx] };

        match self {
            Heuristic::Zero => 0.0,
            Heuristic::Manhattan => (dx + dy) * ORTHOGONAL_COST,
            Heuristic::Euclidean => dx.hypot(dy),
            Heuristic::Octile => {
                delta_min * DIAGONAL_COST + (delta_max - delta_min) * ORTHOGONAL_COST
            }
            Heuristic::Chebyshev => delta_max * ORTHOGONAL_COST,
        }
    }

    /// Whether this never overestimates 8-connected grid distances.
    pub fn admissible_on_grid(self) -> bool {
        self != Heuristic::Manhattan
    }

    /// Whether this never overestimates any-angle distances.
    pub fn admissible_any_angle(self) -> bool {
        matches!(self, Heuristic::Zero | Heuristic::Euclidean | Heuristic::Chebyshev)
    }

    /// This heuristic, or octile when it could overestimate moves on
    /// `connectivity` grids.
    pub fn for_grid(self, connectivity: Connectivity) -> Heuristic {
        if connectivity == Connectivity::Eight && !self.admissible_on_grid() {
            log::debug!("{self} overestimates diagonal moves, using octile");
            Heuristic::Octile
        } else {
            self
        }
    }

    /// This heuristic, or Euclidean when it could overestimate straight
    /// segments.
    pub fn for_any_angle(self) -> Heuristic {
        if self.admissible_any_angle() {
            self
        } else {
            Heuristic::Euclidean
        }
    }
}
