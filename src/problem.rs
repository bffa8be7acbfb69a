use derive_more::Display;
use rand::Rng;
use thiserror::Error;

use crate::grid::Cell;
use crate::grid::Coord;
use crate::grid::Grid;
use crate::grid::Terrain;
use crate::grid::TerrainCostError;
use crate::grid::TerrainParseError;
use crate::space::Path;

const RANDOM_CELL_MAX_TRIES: usize = 10_000;

// Simple colours
const WHITE: [u8; 3] = [u8::MAX, u8::MAX, u8::MAX];
const BLACK: [u8; 3] = [u8::MIN, u8::MIN, u8::MIN];
const GREEN: [u8; 3] = [u8::MIN, u8::MAX, u8::MIN];
const BLUE: [u8; 3] = [u8::MIN, u8::MIN, u8::MAX];
const CYAN: [u8; 3] = [u8::MIN, u8::MAX, u8::MAX];

/// A grid together with a start and a goal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub grid: Grid,
    pub start: Cell,
    pub goal: Cell,
}

impl Problem {
    pub fn new(grid: Grid, start: Cell, goal: Cell) -> Self {
        Self { grid, start, goal }
    }

    /// Picks a new start and goal on open cells.
    ///
    /// Returns `None` if no open cells turn up after many tries.
    pub fn randomize<R: Rng>(&self, r: &mut R) -> Option<Problem> {
        let start = random_open_cell(&self.grid, r)?;
        let goal = random_open_cell(&self.grid, r)?;
        Some(Problem::new(self.grid.clone(), start, goal))
    }

    /// Reads a map from disk, as an image for `.png` files and as text
    /// otherwise.
    pub fn load(p: &std::path::Path) -> Result<Problem, ProblemParseError> {
        let is_png = p
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png {
            return Problem::try_from(p);
        }
        let text = std::fs::read_to_string(p).map_err(|e| ProblemParseError::IOError {
            p: p.to_path_buf(),
            e,
        })?;
        Problem::try_from(text.as_str())
    }

    /// Draws `path` over the grid.
    pub fn overlay<'p>(&'p self, path: Option<&'p Path>) -> ProblemOverlay<'p> {
        ProblemOverlay {
            problem: self,
            path,
        }
    }
}

pub fn random_open_cell<R: Rng>(grid: &Grid, r: &mut R) -> Option<Cell> {
    if grid.is_empty() {
        return None;
    }
    for _tries in 0..RANDOM_CELL_MAX_TRIES {
        let c = Cell::new(
            r.random_range(0..grid.width() as Coord),
            r.random_range(0..grid.height() as Coord),
        );
        if !grid.is_obstacle(c) {
            return Some(c);
        }
    }
    None
}

#[derive(Copy, Clone, Debug, Display, PartialEq)]
pub enum ProblemCell {
    Cell(Terrain),
    /// Open ground costing this many times a plain move.
    Weighted(u32),
    #[display("S")]
    Start,
    #[display("G")]
    Goal,
}

#[derive(Debug, Error)]
pub enum ProblemCellParseError {
    #[error("Invalid cell {e}")]
    InvalidCell { e: TerrainParseError },
}

impl TryFrom<char> for ProblemCell {
    type Error = ProblemCellParseError;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        match ch {
            'S' => Ok(ProblemCell::Start),
            'G' => Ok(ProblemCell::Goal),
            '1'..='9' => Ok(ProblemCell::Weighted(ch as u32 - '0' as u32)),
            ch => {
                let t = Terrain::try_from(ch)
                    .map_err(|e| ProblemCellParseError::InvalidCell { e })?;
                Ok(ProblemCell::Cell(t))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProblemParseError {
    #[error("Empty input")]
    EmptyInput,
    #[error("Invalid cell {e} found at ({x},{y})")]
    InvalidCell {
        e: ProblemCellParseError,
        x: usize,
        y: usize,
    },
    #[error("Row {y} has {found} cells, expected {expected}")]
    RaggedRow {
        y: usize,
        expected: usize,
        found: usize,
    },
    #[error("No start found")]
    MissingStart,
    #[error(transparent)]
    TerrainCost(#[from] TerrainCostError),
    #[error("No goal found")]
    MissingGoal,
    #[error("More than one start found, the second one at {0}")]
    DuplicateStart(Cell),
    #[error("More than one goal found, the second one at {0}")]
    DuplicateGoal(Cell),
    #[error("I/O error when loading '{p}': {e}")]
    IOError {
        p: std::path::PathBuf,
        e: std::io::Error,
    },
    #[error("Image error when loading '{p}': {e}")]
    ImageError {
        p: std::path::PathBuf,
        e: image::ImageError,
    },
}

/// Collects starts and goals while a grid is being read.
#[derive(Default)]
struct Endpoints {
    start: Option<Cell>,
    goal: Option<Cell>,
}

impl Endpoints {
    fn start(&mut self, c: Cell) -> Result<(), ProblemParseError> {
        match self.start.replace(c) {
            Some(_) => Err(ProblemParseError::DuplicateStart(c)),
            None => Ok(()),
        }
    }
    fn goal(&mut self, c: Cell) -> Result<(), ProblemParseError> {
        match self.goal.replace(c) {
            Some(_) => Err(ProblemParseError::DuplicateGoal(c)),
            None => Ok(()),
        }
    }
    fn into_problem(self, grid: Grid) -> Result<Problem, ProblemParseError> {
        let start = self.start.ok_or(ProblemParseError::MissingStart)?;
        let goal = self.goal.ok_or(ProblemParseError::MissingGoal)?;
        Ok(Problem::new(grid, start, goal))
    }
}

impl TryFrom<&str> for Problem {
    type Error = ProblemParseError;

    /// Reads a text map.
    ///
    /// `.` or ` ` is open, `#` a wall, `~` water, and `S`/`G` mark the (open)
    /// start and goal. A digit is open ground that costs that much to cross.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let lines: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
        let Some(first) = lines.first() else {
            return Err(ProblemParseError::EmptyInput);
        };

        let width = first.chars().count();
        let height = lines.len();
        let mut grid = Grid::new(width, height);
        let mut endpoints = Endpoints::default();

        for (y, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(ProblemParseError::RaggedRow {
                    y,
                    expected: width,
                    found,
                });
            }
            for (x, ch) in line.chars().enumerate() {
                let cell = ProblemCell::try_from(ch)
                    .map_err(|e| ProblemParseError::InvalidCell { e, x, y })?;
                let c = Cell::new(x as Coord, y as Coord);

                let t = match cell {
                    ProblemCell::Start => {
                        endpoints.start(c)?;
                        Terrain::Open
                    }
                    ProblemCell::Goal => {
                        endpoints.goal(c)?;
                        Terrain::Open
                    }
                    ProblemCell::Cell(t) => t,
                    ProblemCell::Weighted(cost) => {
                        if cost > 1 {
                            grid.set_terrain_cost(c, f64::from(cost))?;
                        }
                        Terrain::Open
                    }
                };
                grid.set_terrain(c, t);
            }
        }

        endpoints.into_problem(grid)
    }
}

impl TryFrom<&std::path::Path> for Problem {
    type Error = ProblemParseError;

    /// Reads a PNG map.
    ///
    /// Black is a wall, cyan is water, blue marks the start and green the
    /// goal. Everything else is open.
    fn try_from(p: &std::path::Path) -> Result<Self, Self::Error> {
        use image::ImageReader;
        use image::Rgb;

        let img = ImageReader::open(p)
            .map_err(|e| ProblemParseError::IOError {
                p: p.to_path_buf(),
                e,
            })?
            .decode()
            .map_err(|e| ProblemParseError::ImageError {
                p: p.to_path_buf(),
                e,
            })?
            .into_rgb8();

        let mut grid = Grid::new(img.width() as usize, img.height() as usize);
        let mut endpoints = Endpoints::default();

        for (x, y, px) in img.enumerate_pixels() {
            let px: &Rgb<u8> = px;
            let c = Cell::new(x as Coord, y as Coord);
            let t = match px.0 {
                BLACK => Terrain::Wall,
                CYAN => Terrain::Water,
                BLUE => {
                    endpoints.start(c)?;
                    Terrain::Open
                }
                GREEN => {
                    endpoints.goal(c)?;
                    Terrain::Open
                }
                WHITE => Terrain::Open,
                _ => Terrain::Open,
            };
            grid.set_terrain(c, t);
        }

        endpoints.into_problem(grid)
    }
}

/// A problem drawn with a path on top.
pub struct ProblemOverlay<'p> {
    problem: &'p Problem,
    path: Option<&'p Path>,
}

impl std::fmt::Display for ProblemOverlay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let grid = &self.problem.grid;
        let on_path: rustc_hash::FxHashSet<Cell> = self
            .path
            .map(|p| p.densify().cells().iter().copied().collect())
            .unwrap_or_default();

        for y in 0..grid.height() as Coord {
            for x in 0..grid.width() as Coord {
                let c = Cell::new(x, y);
                if c == self.problem.start {
                    write!(f, "S")?;
                } else if c == self.problem.goal {
                    write!(f, "G")?;
                } else if on_path.contains(&c) {
                    write!(f, "*")?;
                } else if let Some(t) = grid.terrain(c) {
                    write!(f, "{t}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "Problem({}x{}) (s:{}, g:{}):",
            self.grid.width(),
            self.grid.height(),
            self.start,
            self.goal
        )?;
        write!(f, "{}", self.overlay(None))
    }
}
