//! Progress reporting and cooperative control.
//!
//! Engines run to completion on the caller's thread. Every loop iteration goes
//! through [`Context::tick`], which enforces the iteration cap, the time budget
//! and cancellation, and every `batch_size` iterations hands control to the
//! [`TraceSink`] so a driver can render progress or stop the run.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::config::SearchConfig;
use crate::grid::Cell;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::outcome::Outcome;
use crate::outcome::Stats;
use crate::space::Path;

#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// A cell was expanded.
    CellVisited(Cell),
    /// A cell joined the frontier, or got a better key in it.
    CellOpened(Cell),
    /// An anytime engine improved its best path.
    PathUpdated(Path),
    /// The run ended. Always the last event.
    Finished(Outcome),
}

pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);

    /// Called every `batch_size` iterations.
    ///
    /// Returning `Break` cancels the run.
    fn checkpoint(&mut self, _stats: &Stats) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    #[inline(always)]
    fn record(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn record(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// A shared "keep running" flag.
///
/// Clones share the flag, so a driver can keep one and cancel a run holding
/// another.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-run bookkeeping handed to engines.
pub struct Context<'a> {
    sink: &'a mut dyn TraceSink,
    cancel: Option<&'a CancelToken>,
    max_iterations: usize,
    deadline: Option<Instant>,
    batch_size: usize,
    stats: Stats,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &SearchConfig,
        sink: &'a mut dyn TraceSink,
        cancel: Option<&'a CancelToken>,
    ) -> Self {
        Self {
            sink,
            cancel,
            max_iterations: config.max_iterations,
            deadline: config.time_budget.map(|b| Instant::now() + b),
            batch_size: config.batch_size.max(1),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Accounts for one loop iteration.
    ///
    /// Fails when the run must stop. Engines propagate the reason with `?`,
    /// dropping their per-run state on the way out.
    #[inline(always)]
    pub fn tick(&mut self) -> Result<(), NotFoundReason> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(NotFoundReason::Cancelled);
        }
        if self.stats.iterations >= self.max_iterations {
            log::warn!("Giving up after {} iterations", self.stats.iterations);
            return Err(NotFoundReason::IterationLimitExceeded);
        }
        self.stats.iterations += 1;

        if self.stats.iterations % self.batch_size == 0 {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!("Out of time after {} iterations", self.stats.iterations);
                return Err(NotFoundReason::TimeBudgetExceeded);
            }
            if self.sink.checkpoint(&self.stats).is_break() {
                return Err(NotFoundReason::Cancelled);
            }
        }
        Ok(())
    }

    #[inline(always)]
    pub fn visited(&mut self, c: Cell) {
        self.stats.nodes_expanded += 1;
        self.sink.record(TraceEvent::CellVisited(c));
    }

    #[inline(always)]
    pub fn examined(&mut self) {
        self.stats.nodes_visited += 1;
    }

    #[inline(always)]
    pub fn opened(&mut self, c: Cell) {
        self.sink.record(TraceEvent::CellOpened(c));
    }

    pub fn path_updated(&mut self, path: &Path) {
        self.sink.record(TraceEvent::PathUpdated(path.clone()));
    }

    /// Wraps up a run, emitting the final event.
    ///
    /// Found paths are costed on `view`.
    pub fn finish(&mut self, view: &GridView, result: Result<Option<Path>, NotFoundReason>) -> Outcome {
        let outcome = match result {
            Ok(Some(path)) => {
                let cost = path.cost_on(view);
                Outcome::found(path, cost, &self.stats)
            }
            Ok(None) => Outcome::not_found(NotFoundReason::Exhausted),
            Err(reason) => Outcome::not_found(reason),
        };
        log::debug!("Finished with {outcome} ({})", self.stats);
        self.sink.record(TraceEvent::Finished(outcome.clone()));
        outcome
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Context{{{}}}", self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_limit() {
        let config = SearchConfig {
            max_iterations: 3,
            ..Default::default()
        };
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, None);
        assert_eq!(ctx.tick(), Ok(()));
        assert_eq!(ctx.tick(), Ok(()));
        assert_eq!(ctx.tick(), Ok(()));
        assert_eq!(ctx.tick(), Err(NotFoundReason::IterationLimitExceeded));
    }

    #[test]
    fn cancellation() {
        let config = SearchConfig::default();
        let token = CancelToken::new();
        let driver = token.clone();
        let mut sink = NullSink;
        let mut ctx = Context::new(&config, &mut sink, Some(&token));
        assert_eq!(ctx.tick(), Ok(()));
        driver.cancel();
        assert_eq!(ctx.tick(), Err(NotFoundReason::Cancelled));
    }

    struct StopAfter(usize);
    impl TraceSink for StopAfter {
        fn record(&mut self, _event: TraceEvent) {}
        fn checkpoint(&mut self, stats: &Stats) -> ControlFlow<()> {
            if stats.iterations >= self.0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    #[test]
    fn checkpoints_can_stop_runs() {
        let config = SearchConfig {
            batch_size: 2,
            ..Default::default()
        };
        let mut sink = StopAfter(4);
        let mut ctx = Context::new(&config, &mut sink, None);
        assert_eq!(ctx.tick(), Ok(()));
        assert_eq!(ctx.tick(), Ok(()));
        assert_eq!(ctx.tick(), Ok(()));
        assert_eq!(ctx.tick(), Err(NotFoundReason::Cancelled));
    }

    #[test]
    fn finish_records_outcome() {
        let config = SearchConfig::default();
        let grid = crate::grid::Grid::new(2, 2);
        let view = grid.view(crate::grid::Connectivity::Eight);
        let mut events = Vec::new();
        let mut ctx = Context::new(&config, &mut events, None);
        ctx.visited(Cell::new(0, 0));
        let outcome = ctx.finish(&view, Ok(None));
        assert_eq!(outcome, Outcome::not_found(NotFoundReason::Exhausted));
        assert_eq!(
            events,
            vec![
                TraceEvent::CellVisited(Cell::new(0, 0)),
                TraceEvent::Finished(outcome),
            ]
        );
    }
}
