use derive_more::Display;
use thousands::Separable;

use crate::space::Path;

/// Why a run ended without a path.
///
/// Only `Exhausted` means the goal is provably unreachable; every other
/// reason means the engine gave up.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum NotFoundReason {
    #[display("search space exhausted")]
    Exhausted,
    #[display("iteration limit exceeded")]
    IterationLimitExceeded,
    #[display("time budget exceeded")]
    TimeBudgetExceeded,
    #[display("cancelled")]
    Cancelled,
    #[display("recursion depth exceeded")]
    RecursionDepthExceeded,
}

impl NotFoundReason {
    /// Whether the goal is known to be unreachable.
    pub fn is_conclusive(self) -> bool {
        self == NotFoundReason::Exhausted
    }
}

/// Counters kept while searching.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Loop iterations, as counted against `max_iterations`.
    pub iterations: usize,
    /// Cells examined as successors.
    pub nodes_visited: usize,
    /// Cells taken off the frontier and expanded.
    pub nodes_expanded: usize,
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} iterations, {} visited, {} expanded",
            self.iterations.separate_with_commas(),
            self.nodes_visited.separate_with_commas(),
            self.nodes_expanded.separate_with_commas(),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Found {
        path: Path,
        cost: f64,
        nodes_visited: usize,
        nodes_expanded: usize,
    },
    NotFound {
        reason: NotFoundReason,
    },
}

impl Outcome {
    pub fn found(path: Path, cost: f64, stats: &Stats) -> Self {
        Outcome::Found {
            cost,
            path,
            nodes_visited: stats.nodes_visited,
            nodes_expanded: stats.nodes_expanded,
        }
    }

    pub fn not_found(reason: NotFoundReason) -> Self {
        Outcome::NotFound { reason }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Outcome::Found { path, .. } => Some(path),
            Outcome::NotFound { .. } => None,
        }
    }

    pub fn cost(&self) -> Option<f64> {
        match self {
            Outcome::Found { cost, .. } => Some(*cost),
            Outcome::NotFound { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<NotFoundReason> {
        match self {
            Outcome::Found { .. } => None,
            Outcome::NotFound { reason } => Some(*reason),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Outcome::Found {
                path,
                cost,
                nodes_visited,
                nodes_expanded,
            } => write!(
                f,
                "Found(cost={cost:.3}, visited={}, expanded={}, {path})",
                nodes_visited.separate_with_commas(),
                nodes_expanded.separate_with_commas(),
            ),
            Outcome::NotFound { reason } => write!(f, "NotFound({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    #[test]
    fn accessors() {
        let path = Path::from_cells(vec![Cell::new(0, 0), Cell::new(0, 1)]);
        let stats = Stats {
            iterations: 3,
            nodes_visited: 2,
            nodes_expanded: 1,
        };
        let found = Outcome::found(path.clone(), path.length(), &stats);
        assert!(found.is_found());
        assert_eq!(found.cost(), Some(1.0));
        assert_eq!(found.path(), Some(&path));
        assert_eq!(found.reason(), None);

        let lost = Outcome::not_found(NotFoundReason::Cancelled);
        assert!(!lost.is_found());
        assert_eq!(lost.reason(), Some(NotFoundReason::Cancelled));
        assert!(!NotFoundReason::Cancelled.is_conclusive());
        assert!(NotFoundReason::Exhausted.is_conclusive());
    }

    #[test]
    fn display() {
        let stats = Stats {
            iterations: 12_345,
            nodes_visited: 2,
            nodes_expanded: 1,
        };
        assert_eq!(
            format!("{stats}"),
            "12,345 iterations, 2 visited, 1 expanded"
        );
        assert_eq!(
            format!("{}", Outcome::not_found(NotFoundReason::Exhausted)),
            "NotFound(search space exhausted)"
        );
    }
}
