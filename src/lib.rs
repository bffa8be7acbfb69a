use shadow_rs::shadow;

shadow!(build);

// Internals
// ---------
pub mod data_structures;
pub mod heap_primitives;

// Grids and costs
// ---------------
pub mod cost;
pub mod float_cost;
pub mod grid;
pub mod problem;

// Search state and results
// ------------------------
pub mod config;
pub mod outcome;
pub mod search;
pub mod space;
pub mod trace;

// Algorithms
// ----------
pub mod algorithms;
pub mod engine;

pub use algorithms::distance_map::DistanceMap;
pub use config::InvalidRequest;
pub use config::SearchConfig;
pub use engine::EngineKind;
pub use engine::Trace;
pub use engine::run;
pub use engine::run_traced;
pub use engine::trace;
pub use grid::Cell;
pub use grid::Grid;
pub use outcome::NotFoundReason;
pub use outcome::Outcome;
pub use space::Path;
