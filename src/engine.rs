//! One entry point for every engine.
//!
//! [`run`] checks the request, picks the engine and wraps whatever it returns
//! into an [`Outcome`]. [`trace`] runs the engine on a worker thread, handing
//! out the events of the run as they happen.

use std::ops::ControlFlow;
use std::thread;

use derive_more::Display;

use crate::algorithms::anytime::Anytime;
use crate::algorithms::anytime::Round;
use crate::algorithms::best_first::BestFirst;
use crate::algorithms::bidirectional::Bidirectional;
use crate::algorithms::hierarchical::Hierarchical;
use crate::algorithms::hierarchical::PraStar;
use crate::algorithms::ida_star::IdaStar;
use crate::algorithms::incremental::Replanner;
use crate::algorithms::incremental::ReplannerKind;
use crate::algorithms::jps::Jps;
use crate::algorithms::rrt::Rrt;
use crate::algorithms::rrt::RrtConnect;
use crate::config::InvalidRequest;
use crate::config::SearchConfig;
use crate::cost::Heuristic;
use crate::grid::Cell;
use crate::grid::Connectivity;
use crate::grid::Grid;
use crate::grid::GridView;
use crate::outcome::NotFoundReason;
use crate::outcome::Outcome;
use crate::space::Path;
use crate::trace::CancelToken;
use crate::trace::Context;
use crate::trace::NullSink;
use crate::trace::TraceEvent;
use crate::trace::TraceSink;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum EngineKind {
    #[display("BFS")]
    Bfs,
    #[display("DFS")]
    Dfs,
    #[display("Dijkstra")]
    Dijkstra,
    #[display("A*")]
    #[value(name = "astar")]
    AStar,
    #[display("Bidirectional A*")]
    #[value(name = "bidirectional-astar")]
    BidirectionalAStar,
    #[display("Weighted A*")]
    #[value(name = "weighted-astar")]
    WeightedAStar,
    #[display("Theta*")]
    ThetaStar,
    #[display("Lazy Theta*")]
    LazyThetaStar,
    #[display("Field D*")]
    #[value(name = "field-dstar")]
    FieldDStar,
    #[display("Incremental Phi*")]
    IncrementalPhiStar,
    #[display("JPS")]
    Jps,
    #[display("JPS + Theta*")]
    JpsTheta,
    #[display("IDA*")]
    IdaStar,
    #[display("LPA*")]
    LpaStar,
    #[display("D*-Lite")]
    #[value(name = "dstar-lite")]
    DStarLite,
    #[display("MTD*-Lite")]
    #[value(name = "mtdstar-lite")]
    MtdStarLite,
    #[display("GAA*")]
    GaaStar,
    #[display("Anytime A*")]
    #[value(name = "anytime-astar")]
    AnytimeAStar,
    #[display("Anytime D*")]
    #[value(name = "anytime-dstar")]
    AnytimeDStar,
    #[display("RRT")]
    Rrt,
    #[display("RRT*")]
    RrtStar,
    #[display("RRT-Connect")]
    RrtConnect,
    #[display("HPA*")]
    HpaStar,
    #[display("PRA*")]
    PraStar,
    #[display("HAA*")]
    HaaStar,
}

impl EngineKind {
    pub const ALL: [EngineKind; 25] = [
        EngineKind::Bfs,
        EngineKind::Dfs,
        EngineKind::Dijkstra,
        EngineKind::AStar,
        EngineKind::BidirectionalAStar,
        EngineKind::WeightedAStar,
        EngineKind::ThetaStar,
        EngineKind::LazyThetaStar,
        EngineKind::FieldDStar,
        EngineKind::IncrementalPhiStar,
        EngineKind::Jps,
        EngineKind::JpsTheta,
        EngineKind::IdaStar,
        EngineKind::LpaStar,
        EngineKind::DStarLite,
        EngineKind::MtdStarLite,
        EngineKind::GaaStar,
        EngineKind::AnytimeAStar,
        EngineKind::AnytimeDStar,
        EngineKind::Rrt,
        EngineKind::RrtStar,
        EngineKind::RrtConnect,
        EngineKind::HpaStar,
        EngineKind::PraStar,
        EngineKind::HaaStar,
    ];

    /// Whether paths may join cells that aren't adjacent.
    pub fn is_any_angle(self) -> bool {
        matches!(
            self,
            EngineKind::ThetaStar
                | EngineKind::LazyThetaStar
                | EngineKind::FieldDStar
                | EngineKind::IncrementalPhiStar
                | EngineKind::JpsTheta
                | EngineKind::Rrt
                | EngineKind::RrtStar
                | EngineKind::RrtConnect
        )
    }

    /// Whether found paths are shortest among grid paths.
    ///
    /// Anytime engines qualify because their last round runs uninflated.
    pub fn is_optimal(self) -> bool {
        matches!(
            self,
            EngineKind::Dijkstra
                | EngineKind::AStar
                | EngineKind::BidirectionalAStar
                | EngineKind::Jps
                | EngineKind::IdaStar
                | EngineKind::LpaStar
                | EngineKind::DStarLite
                | EngineKind::MtdStarLite
                | EngineKind::GaaStar
                | EngineKind::AnytimeAStar
                | EngineKind::AnytimeDStar
        )
    }

    pub fn requires_eight_connectivity(self) -> bool {
        matches!(self, EngineKind::Jps | EngineKind::JpsTheta)
    }

    /// Whether the engine prunes moves assuming every cell costs the same.
    pub fn requires_uniform_costs(self) -> bool {
        matches!(self, EngineKind::Jps | EngineKind::JpsTheta)
    }

    /// The incremental engine behind this kind, if any.
    pub fn replanner(self) -> Option<ReplannerKind> {
        match self {
            EngineKind::LpaStar => Some(ReplannerKind::LpaStar),
            EngineKind::DStarLite => Some(ReplannerKind::DStarLite),
            EngineKind::MtdStarLite => Some(ReplannerKind::MtdStarLite),
            EngineKind::GaaStar => Some(ReplannerKind::GaaStar),
            EngineKind::FieldDStar => Some(ReplannerKind::FieldDStar),
            EngineKind::IncrementalPhiStar => Some(ReplannerKind::IncrementalPhiStar),
            _ => None,
        }
    }
}

/// Rejects requests no engine should start on.
pub fn validate(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: &SearchConfig,
) -> Result<(), InvalidRequest> {
    config.validate()?;
    if !grid.in_bounds(start) {
        return Err(InvalidRequest::StartOutOfBounds(start));
    }
    if !grid.in_bounds(goal) {
        return Err(InvalidRequest::GoalOutOfBounds(goal));
    }
    let view = GridView::new(grid, config.capability, config.connectivity);
    if !view.passable(start) {
        return Err(InvalidRequest::StartBlocked(start));
    }
    if !view.passable(goal) {
        return Err(InvalidRequest::GoalBlocked(goal));
    }
    if engine.requires_eight_connectivity() && config.connectivity != Connectivity::Eight {
        return Err(InvalidRequest::UnsupportedConnectivity {
            engine: engine.to_string(),
            connectivity: config.connectivity,
        });
    }
    if engine.requires_uniform_costs() && grid.has_terrain_costs() {
        return Err(InvalidRequest::UnsupportedTerrainCosts {
            engine: engine.to_string(),
        });
    }
    Ok(())
}

pub fn run(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: &SearchConfig,
) -> Result<Outcome, InvalidRequest> {
    run_traced(grid, start, goal, engine, config, &mut NullSink, None)
}

/// Runs `engine`, reporting progress to `sink`.
///
/// The last event recorded is always `Finished` with the returned outcome.
pub fn run_traced(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: &SearchConfig,
    sink: &mut dyn TraceSink,
    cancel: Option<&CancelToken>,
) -> Result<Outcome, InvalidRequest> {
    validate(grid, start, goal, engine, config)?;
    log::debug!("{engine} from {start} to {goal} on a {}x{} grid", grid.width(), grid.height());

    let mut ctx = Context::new(config, sink, cancel);
    let view = GridView::new(grid, config.capability, config.connectivity);
    let result = if start == goal {
        Ok(Some(Path::new_from_start(start)))
    } else {
        search(&view, start, goal, engine, config, &mut ctx)
    };
    Ok(ctx.finish(&view, result))
}

/// Heuristic handed to any-angle engines, which need one that never
/// overestimates straight lines.
fn any_angle_heuristic(config: &SearchConfig) -> Heuristic {
    config.heuristic.for_any_angle()
}

fn search(
    view: &GridView,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: &SearchConfig,
    ctx: &mut Context,
) -> Result<Option<Path>, NotFoundReason> {
    let h = config.heuristic.for_grid(config.connectivity);
    match engine {
        EngineKind::Bfs => BestFirst::breadth_first().search(view, start, goal, ctx),
        EngineKind::Dfs => BestFirst::depth_first().search(view, start, goal, ctx),
        EngineKind::Dijkstra => BestFirst::dijkstra().search(view, start, goal, ctx),
        EngineKind::AStar => BestFirst::astar(h).search(view, start, goal, ctx),
        EngineKind::BidirectionalAStar => Bidirectional::new(h).search(view, start, goal, ctx),
        EngineKind::WeightedAStar => {
            BestFirst::weighted_astar(h, config.weight).search(view, start, goal, ctx)
        }
        EngineKind::ThetaStar => {
            BestFirst::theta_star(any_angle_heuristic(config)).search(view, start, goal, ctx)
        }
        EngineKind::LazyThetaStar => {
            BestFirst::lazy_theta_star(any_angle_heuristic(config)).search(view, start, goal, ctx)
        }
        EngineKind::Jps => Jps::new(h).search(view, start, goal, ctx),
        EngineKind::JpsTheta => Jps::theta(any_angle_heuristic(config)).search(view, start, goal, ctx),
        EngineKind::IdaStar => {
            let max_depth = config.max_depth.unwrap_or(view.grid().len());
            IdaStar::new(h, max_depth).search(view, start, goal, ctx)
        }
        EngineKind::AnytimeAStar => Anytime::new(Round::AStar, config).search(view, start, goal, ctx),
        EngineKind::AnytimeDStar => Anytime::new(Round::DStar, config).search(view, start, goal, ctx),
        EngineKind::Rrt => Rrt::new(config).search(view, start, goal, ctx),
        EngineKind::RrtStar => Rrt::star(config).search(view, start, goal, ctx),
        EngineKind::RrtConnect => RrtConnect::new(config).search(view, start, goal, ctx),
        EngineKind::HpaStar => Hierarchical::hpa(config.cluster_size, h).search(view, start, goal, ctx),
        EngineKind::HaaStar => Hierarchical::haa(config.cluster_size, h).search(view, start, goal, ctx),
        EngineKind::PraStar => PraStar::new(config.cluster_size, h).search(view, start, goal, ctx),
        EngineKind::LpaStar
        | EngineKind::DStarLite
        | EngineKind::MtdStarLite
        | EngineKind::GaaStar
        | EngineKind::FieldDStar
        | EngineKind::IncrementalPhiStar => replan(view, start, goal, engine, config, ctx),
    }
}

/// A first plan from a fresh replanner over a copy of the grid.
fn replan(
    view: &GridView,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: &SearchConfig,
    ctx: &mut Context,
) -> Result<Option<Path>, NotFoundReason> {
    let Some(kind) = engine.replanner() else {
        log::error!("{engine} is not an incremental engine");
        return Ok(None);
    };
    // Requests reaching here were validated
    let mut replanner = Replanner::new(kind, view.grid().clone(), start, goal, config).map_err(|e| {
        log::error!("{engine} could not start: {e}");
        NotFoundReason::Exhausted
    })?;
    replanner.replan_with(ctx)
}

/// Events buffered between a traced run and its reader.
const TRACE_BUFFER: usize = 256;

/// The events of a run, handed out as the engine produces them.
///
/// The first poll starts the engine on a worker thread. It runs at most
/// [`TRACE_BUFFER`] events ahead of the reader and ends with `Finished`.
/// Dropping or restarting the trace cancels the run.
#[derive(Debug)]
pub struct Trace {
    grid: Grid,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: SearchConfig,
    stream: Option<Stream>,
}

/// A run in progress on its own thread.
#[derive(Debug)]
struct Stream {
    events: Option<crossbeam_channel::Receiver<TraceEvent>>,
    cancel: CancelToken,
    worker: Option<thread::JoinHandle<()>>,
}

impl Stream {
    fn next(&mut self) -> Option<TraceEvent> {
        self.events.as_ref()?.recv().ok()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.cancel.cancel();
        // A worker blocked on a full channel wakes up once the receiver is gone
        self.events = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("Trace worker panicked");
        }
    }
}

/// Forwards events to a [`Stream`], stopping the run once nobody listens.
struct ChannelSink {
    events: crossbeam_channel::Sender<TraceEvent>,
    disconnected: bool,
}

impl TraceSink for ChannelSink {
    fn record(&mut self, event: TraceEvent) {
        if !self.disconnected && self.events.send(event).is_err() {
            log::debug!("Trace reader went away");
            self.disconnected = true;
        }
    }

    fn checkpoint(&mut self, _stats: &crate::outcome::Stats) -> ControlFlow<()> {
        if self.disconnected {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

impl Trace {
    /// Cancels the run in progress; the next poll runs the engine again.
    pub fn restart(&mut self) {
        self.stream = None;
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    fn spawn(&self) -> Stream {
        let (tx, rx) = crossbeam_channel::bounded(TRACE_BUFFER);
        let cancel = CancelToken::new();
        let (grid, config, token) = (self.grid.clone(), self.config.clone(), cancel.clone());
        let (start, goal, engine) = (self.start, self.goal, self.engine);
        let worker = thread::Builder::new()
            .name(format!("trace-{engine}"))
            .spawn(move || {
                let mut sink = ChannelSink {
                    events: tx,
                    disconnected: false,
                };
                if let Err(e) = run_traced(&grid, start, goal, engine, &config, &mut sink, Some(&token)) {
                    // Checked when the trace was built
                    log::error!("{engine} rejected a validated request: {e}");
                }
            });
        match worker {
            Ok(worker) => Stream {
                events: Some(rx),
                cancel,
                worker: Some(worker),
            },
            Err(e) => {
                log::error!("Could not start a trace worker, running {engine} in place: {e}");
                let mut events = Vec::new();
                if let Err(e) = run_traced(
                    &self.grid,
                    self.start,
                    self.goal,
                    self.engine,
                    &self.config,
                    &mut events,
                    None,
                ) {
                    log::error!("{engine} rejected a validated request: {e}");
                }
                // The channel cannot hold the whole run, so replay through an unbounded one
                let (tx, rx) = crossbeam_channel::unbounded();
                for event in events {
                    let _ = tx.send(event);
                }
                Stream {
                    events: Some(rx),
                    cancel,
                    worker: None,
                }
            }
        }
    }
}

impl Iterator for Trace {
    type Item = TraceEvent;

    fn next(&mut self) -> Option<TraceEvent> {
        if self.stream.is_none() {
            self.stream = Some(self.spawn());
        }
        self.stream.as_mut()?.next()
    }
}

pub fn trace(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    engine: EngineKind,
    config: &SearchConfig,
) -> Result<Trace, InvalidRequest> {
    validate(grid, start, goal, engine, config)?;
    Ok(Trace {
        grid: grid.clone(),
        start,
        goal,
        engine,
        config: config.clone(),
        stream: None,
    })
}
