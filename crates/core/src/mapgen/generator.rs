//! Run orchestration: seed, grid, placement, then rooms and doors in the scene.

use std::fmt;
use std::path::Path;

use futures_util::future::{AbortRegistration, Abortable, Aborted};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use super::grid::{GridIndex, build_grid};
use super::instantiate::{
    AssetProvider, InstantiationError, SceneSink, instantiate_doors, instantiate_rooms,
};
use super::model::Placement;
use super::seed::{ResolvedSeed, SeedOrigin, generated_seed, resolve_seed};
use super::solver::{PlacementError, place_rooms};
use crate::catalog::{Catalog, CatalogError};
use crate::config::{ConfigError, GeneratorConfig};
use crate::types::{Pos, ZoneId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Setup,
    Seed,
    Grid,
    Placement,
    RoomInstantiation,
    DoorInstantiation,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Seed => "seed resolution",
            Self::Grid => "grid construction",
            Self::Placement => "room placement",
            Self::RoomInstantiation => "room instantiation",
            Self::DoorInstantiation => "door instantiation",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    SeedResolved,
    GridBuilt,
    RoomsPlaced,
    RoomsInstantiated,
    DoorsInstantiated,
    Complete,
    Failed { stage: GenerationStage },
}

impl GenerationState {
    /// The stage that runs next from this state.
    fn pending_stage(self) -> GenerationStage {
        match self {
            Self::Idle => GenerationStage::Seed,
            Self::SeedResolved => GenerationStage::Grid,
            Self::GridBuilt => GenerationStage::Placement,
            Self::RoomsPlaced => GenerationStage::RoomInstantiation,
            Self::RoomsInstantiated | Self::DoorsInstantiated | Self::Complete => {
                GenerationStage::DoorInstantiation
            }
            Self::Failed { stage } => stage,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("room instantiation failed")]
    Rooms(#[source] InstantiationError),
    #[error("door instantiation failed")]
    Doors(#[source] InstantiationError),
    #[error("generation cancelled during {stage}")]
    Cancelled { stage: GenerationStage },
    #[error("no layout has been placed yet")]
    NoLayout,
}

impl GenerationError {
    pub fn stage(&self) -> GenerationStage {
        match self {
            Self::Catalog(_) | Self::Config(_) => GenerationStage::Setup,
            Self::Placement(_) => GenerationStage::Placement,
            Self::Rooms(_) | Self::NoLayout => GenerationStage::RoomInstantiation,
            Self::Doors(_) => GenerationStage::DoorInstantiation,
            Self::Cancelled { stage } => *stage,
        }
    }

    pub fn zone(&self) -> Option<ZoneId> {
        match self {
            Self::Placement(error) => Some(error.zone()),
            _ => None,
        }
    }

    pub fn cell(&self) -> Option<Pos> {
        match self {
            Self::Placement(error) => error.cell(),
            Self::Rooms(error) | Self::Doors(error) => error.cell(),
            _ => None,
        }
    }
}

/// Summary handed to completion listeners and returned by a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub seed: String,
    pub seed_value: u64,
    pub seed_generated: bool,
    pub fingerprint: u64,
    pub rooms: usize,
    pub doors: usize,
    pub instantiated: bool,
}

impl GenerationReport {
    fn new(seed: &ResolvedSeed, placement: &Placement) -> Self {
        Self {
            seed: seed.text.clone(),
            seed_value: seed.value,
            seed_generated: seed.origin == SeedOrigin::Generated,
            fingerprint: placement.fingerprint(),
            rooms: placement.rooms().len(),
            doors: placement.doorways().count(),
            instantiated: false,
        }
    }
}

type CompletionListener = Box<dyn FnMut(&GenerationReport)>;

/// Drives one generation run at a time against a scene.
pub struct MapGenerator<P, S>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    catalog: Catalog,
    config: GeneratorConfig,
    provider: P,
    scene: S,
    state: GenerationState,
    seed: Option<ResolvedSeed>,
    grid: Option<GridIndex>,
    placement: Option<Placement>,
    report: Option<GenerationReport>,
    spawned: Vec<S::Handle>,
    listeners: Vec<CompletionListener>,
}

impl<P, S> MapGenerator<P, S>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    pub fn new(
        catalog: Catalog,
        config: GeneratorConfig,
        provider: P,
        scene: S,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(Self {
            catalog,
            config,
            provider,
            scene,
            state: GenerationState::Idle,
            seed: None,
            grid: None,
            placement: None,
            report: None,
            spawned: Vec::new(),
            listeners: Vec::new(),
        })
    }

    /// Reads a JSON catalog and an optional TOML config from disk.
    pub fn load(
        catalog_path: &Path,
        config_path: Option<&Path>,
        provider: P,
        scene: S,
    ) -> Result<Self, GenerationError> {
        let catalog = Catalog::load(catalog_path)?;
        let config = match config_path {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        Self::new(catalog, config, provider, scene)
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn seed(&self) -> Option<&ResolvedSeed> {
        self.seed.as_ref()
    }

    pub fn grid(&self) -> Option<&GridIndex> {
        self.grid.as_ref()
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Handles of everything the current run has spawned, rooms first.
    pub fn spawned(&self) -> &[S::Handle] {
        &self.spawned
    }

    /// Registers a callback fired once per successful run.
    pub fn on_complete(&mut self, listener: impl FnMut(&GenerationReport) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Places rooms without spawning any content.
    pub fn generate_layout(
        &mut self,
        seed: Option<&str>,
    ) -> Result<GenerationReport, GenerationError> {
        self.begin();
        let report = self.layout_stages(seed)?;
        Ok(self.complete(report))
    }

    /// Runs the whole pipeline; spawning is skipped when `auto_instantiate` is off.
    ///
    /// Dropping the returned future mid-run despawns whatever the run spawned and leaves
    /// the generator `Failed` at the stage that was pending.
    pub async fn generate_map(
        &mut self,
        seed: Option<&str>,
    ) -> Result<GenerationReport, GenerationError> {
        self.begin();
        let mut guard = RunGuard::new(self);
        let result = guard.generator.run(seed).await;
        guard.finished = true;
        result
    }

    /// Like [`MapGenerator::generate_map`], abandoned when `registration`'s handle aborts.
    ///
    /// A cancelled run despawns everything it spawned and ends in `Failed`.
    pub async fn generate_map_with_cancel(
        &mut self,
        seed: Option<&str>,
        registration: AbortRegistration,
    ) -> Result<GenerationReport, GenerationError> {
        self.begin();
        let mut guard = RunGuard::new(self);
        let outcome = Abortable::new(guard.generator.run(seed), registration).await;
        guard.finished = true;
        match outcome {
            Ok(result) => result,
            Err(Aborted) => {
                let stage = guard.generator.abandon();
                warn!(%stage, "generation_cancelled");
                Err(GenerationError::Cancelled { stage })
            }
        }
    }

    /// Spawns rooms and doors for the current layout, replacing any earlier spawns.
    pub async fn instantiate(&mut self) -> Result<GenerationReport, GenerationError> {
        let Some(report) = self.report.clone() else {
            return Err(GenerationError::NoLayout);
        };
        self.rollback();
        self.state = GenerationState::RoomsPlaced;
        let mut guard = RunGuard::new(self);
        let result = guard.generator.respawn(report).await;
        guard.finished = true;
        result
    }

    async fn respawn(
        &mut self,
        mut report: GenerationReport,
    ) -> Result<GenerationReport, GenerationError> {
        if let Err(error) = self.instantiate_stages().await {
            return Err(self.fail(error));
        }
        report.instantiated = true;
        self.state = GenerationState::Complete;
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Despawns the previous run and forgets its results.
    fn begin(&mut self) {
        self.rollback();
        self.seed = None;
        self.grid = None;
        self.placement = None;
        self.report = None;
        self.state = GenerationState::Idle;
    }

    async fn run(&mut self, seed: Option<&str>) -> Result<GenerationReport, GenerationError> {
        let mut report = self.layout_stages(seed)?;
        if self.config.auto_instantiate {
            if let Err(error) = self.instantiate_stages().await {
                return Err(self.fail(error));
            }
            report.instantiated = true;
        }
        Ok(self.complete(report))
    }

    fn layout_stages(
        &mut self,
        explicit: Option<&str>,
    ) -> Result<GenerationReport, GenerationError> {
        let seed = match resolve_seed(explicit) {
            Ok(seed) => seed,
            Err(error) => {
                warn!(%error, "seed_rejected");
                generated_seed()
            }
        };
        info!(seed = %seed.text, value = seed.value, origin = ?seed.origin, "seed_resolved");
        self.state = GenerationState::SeedResolved;

        let mut grid = build_grid(self.catalog.zones());
        info!(cells = grid.len(), zones = grid.bands().len(), "grid_built");
        self.state = GenerationState::GridBuilt;

        let mut rng = seed.rng();
        let placement = match place_rooms(&grid, &self.catalog, &self.config, &mut rng) {
            Ok(placement) => placement,
            Err(error) => {
                self.seed = Some(seed);
                self.grid = Some(grid);
                return Err(self.fail(error.into()));
            }
        };
        grid.mark_occupied(placement.occupied_cells().map(|(pos, _)| pos));
        info!(
            rooms = placement.rooms().len(),
            doorways = placement.doorways().count(),
            fingerprint = placement.fingerprint(),
            "rooms_placed"
        );

        let report = GenerationReport::new(&seed, &placement);
        self.seed = Some(seed);
        self.grid = Some(grid);
        self.placement = Some(placement);
        self.report = Some(report.clone());
        self.state = GenerationState::RoomsPlaced;
        Ok(report)
    }

    async fn instantiate_stages(&mut self) -> Result<(), GenerationError> {
        let Some(placement) = self.placement.as_ref() else {
            return Err(GenerationError::NoLayout);
        };

        let rooms = instantiate_rooms(placement, &self.config, &self.provider, &mut self.scene)
            .await
            .map_err(GenerationError::Rooms)?;
        info!(rooms = rooms.len(), "rooms_instantiated");
        self.spawned.extend(rooms);
        self.state = GenerationState::RoomsInstantiated;

        let doors = instantiate_doors(placement, &self.config, &self.provider, &mut self.scene)
            .await
            .map_err(GenerationError::Doors)?;
        info!(doors = doors.len(), "doors_instantiated");
        self.spawned.extend(doors);
        self.state = GenerationState::DoorsInstantiated;
        Ok(())
    }

    fn complete(&mut self, report: GenerationReport) -> GenerationReport {
        self.state = GenerationState::Complete;
        self.report = Some(report.clone());
        info!(seed = %report.seed, instantiated = report.instantiated, "generation_complete");
        for listener in &mut self.listeners {
            listener(&report);
        }
        report
    }

    fn fail(&mut self, failure: GenerationError) -> GenerationError {
        let stage = failure.stage();
        self.rollback();
        self.state = GenerationState::Failed { stage };
        error!(
            %stage,
            zone = ?failure.zone(),
            cell = ?failure.cell(),
            error = %failure,
            "generation_failed"
        );
        failure
    }

    /// Despawns an unfinished run and fails it at the stage it was waiting on.
    fn abandon(&mut self) -> GenerationStage {
        let stage = self.state.pending_stage();
        self.rollback();
        self.state = GenerationState::Failed { stage };
        stage
    }

    fn rollback(&mut self) {
        for handle in self.spawned.drain(..).rev() {
            self.scene.despawn(handle);
        }
    }
}

/// Dropping the generator despawns a run that never completed.
impl<P, S> Drop for MapGenerator<P, S>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    fn drop(&mut self) {
        if self.state != GenerationState::Complete {
            self.rollback();
        }
    }
}

/// Abandons the run it guards if dropped before `finished` is set.
struct RunGuard<'g, P, S>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    generator: &'g mut MapGenerator<P, S>,
    finished: bool,
}

impl<'g, P, S> RunGuard<'g, P, S>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    fn new(generator: &'g mut MapGenerator<P, S>) -> Self {
        Self { generator, finished: false }
    }
}

impl<P, S> Drop for RunGuard<'_, P, S>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    fn drop(&mut self) {
        if !self.finished {
            let stage = self.generator.abandon();
            warn!(%stage, "generation_abandoned");
        }
    }
}
