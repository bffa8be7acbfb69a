//! Implementation of search algorithms.
//!
//! Every engine searches a [`GridView`](crate::grid::GridView) and reports
//! through a [`Context`](crate::trace::Context). The incremental ones also
//! keep their state between plans.

pub mod anytime;
pub mod best_first;
pub mod bidirectional;
pub mod distance_map;
pub mod hierarchical;
pub mod ida_star;
pub mod incremental;
pub mod jps;
pub mod rrt;
