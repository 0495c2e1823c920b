//! Apple and chaser placement: random candidate search validated by reachability.
//!
//! Searches can run many A* queries, so the host dispatches them to a
//! blocking worker thread. A worker job only reads an immutable terrain
//! snapshot and the region corners; the result travels back over a channel
//! and the tick loop decides whether it still applies.

use std::sync::Arc;

use mc_snake_world::{GridCell, Region, RegionBounds, TerrainQuery};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::GameError;
use crate::pathfinding::{FootingPolicy, GridPathfinder, PathfinderConfig};
use crate::session::PlayerId;

/// Shared read-only terrain handed to worker threads.
pub type SharedTerrain = Arc<dyn TerrainQuery + Send + Sync>;

/// Shared read-only region table handed to worker threads.
pub type SharedRegions = Arc<dyn RegionBounds + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    /// Random candidates tried before giving up.
    pub attempts: u32,
    /// Minimum Manhattan distance between an apple and the snake's lead.
    pub apple_min_distance: u32,
    /// Minimum Manhattan distance between a chaser spawn and the snake's lead.
    pub chaser_min_distance: u32,
    pub footing: FootingPolicy,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            attempts: 200,
            apple_min_distance: 2,
            chaser_min_distance: 8,
            footing: FootingPolicy::Solid3x3,
        }
    }
}

impl SearchSettings {
    pub fn min_distance(&self, kind: SearchKind) -> u32 {
        match kind {
            SearchKind::Apple => self.apple_min_distance,
            SearchKind::Chaser => self.chaser_min_distance,
        }
    }
}

/// Pick a random reachable cell on the region's lowest layer.
///
/// A candidate must be air, supported according to `footing`, clear of solid
/// horizontal neighbours, at least `min_distance` from `origin`, not in
/// `occupied`, and reachable from `origin` with `pathfinder`.
#[allow(clippy::too_many_arguments)]
pub fn find_location<T: TerrainQuery + ?Sized>(
    terrain: &T,
    region: &Region,
    pathfinder: &GridPathfinder,
    origin: GridCell,
    occupied: &[GridCell],
    rng: &mut impl Rng,
    attempts: u32,
    footing: FootingPolicy,
    min_distance: u32,
) -> Option<GridCell> {
    for _ in 0..attempts {
        let candidate = region.random_cell(rng, region.min.y);
        if terrain.is_solid(candidate)
            || !footing.supports(terrain, candidate)
            || terrain.has_solid_neighbor(candidate)
            || candidate.manhattan_xz(origin) < min_distance
            || occupied.contains(&candidate)
        {
            continue;
        }
        if pathfinder.path_exists(terrain, origin, candidate) {
            return Some(candidate);
        }
    }
    debug!("No reachable location from {origin:?} after {attempts} attempts");
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Apple,
    Chaser,
}

/// A placement search queued by the tick loop.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub session_id: u64,
    pub player: PlayerId,
    pub kind: SearchKind,
    pub origin: GridCell,
    pub region: String,
    pub occupied: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub session_id: u64,
    pub player: PlayerId,
    pub kind: SearchKind,
    /// `None` when every attempt missed.
    pub location: Option<GridCell>,
}

/// Runs placement searches on tokio's blocking pool.
pub struct LocationWorker {
    terrain: SharedTerrain,
    regions: SharedRegions,
    pathfinder: GridPathfinder,
    settings: SearchSettings,
    results: mpsc::UnboundedSender<SearchResult>,
}

impl LocationWorker {
    /// Create a worker and the receiver its results arrive on.
    ///
    /// Reachability uses `settings.footing`, overriding the footing in
    /// `pathfinder`.
    pub fn new(
        terrain: SharedTerrain,
        regions: SharedRegions,
        pathfinder: PathfinderConfig,
        settings: SearchSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SearchResult>), GameError> {
        let pathfinder = GridPathfinder::new(PathfinderConfig {
            footing: settings.footing,
            ..pathfinder
        })?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                terrain,
                regions,
                pathfinder,
                settings,
                results: tx,
            },
            rx,
        ))
    }

    /// Start a search in the background. The region is resolved here, so an
    /// unknown region fails immediately instead of producing a result.
    pub fn dispatch(&self, request: SearchRequest) -> Result<JoinHandle<()>, GameError> {
        let job = self.prepare(request)?;
        let tx = self.results.clone();
        Ok(tokio::task::spawn_blocking(move || {
            let result = job.run();
            if tx.send(result).is_err() {
                debug!("Search result receiver dropped");
            }
        }))
    }

    /// Run a search on the calling thread.
    pub fn resolve_now(&self, request: SearchRequest) -> Result<SearchResult, GameError> {
        Ok(self.prepare(request)?.run())
    }

    fn prepare(&self, request: SearchRequest) -> Result<SearchJob, GameError> {
        let region = self
            .regions
            .region(&request.region)
            .ok_or_else(|| GameError::UnknownRegion(request.region.clone()))?;
        Ok(SearchJob {
            terrain: Arc::clone(&self.terrain),
            pathfinder: self.pathfinder.clone(),
            settings: self.settings,
            region,
            request,
        })
    }
}

/// Everything one background search needs, owned.
struct SearchJob {
    terrain: SharedTerrain,
    pathfinder: GridPathfinder,
    settings: SearchSettings,
    region: Region,
    request: SearchRequest,
}

impl SearchJob {
    fn run(self) -> SearchResult {
        let mut rng = rand::thread_rng();
        let location = find_location(
            &*self.terrain,
            &self.region,
            &self.pathfinder,
            self.request.origin,
            &self.request.occupied,
            &mut rng,
            self.settings.attempts,
            self.settings.footing,
            self.settings.min_distance(self.request.kind),
        );
        SearchResult {
            session_id: self.request.session_id,
            player: self.request.player,
            kind: self.request.kind,
            location,
        }
    }
}
