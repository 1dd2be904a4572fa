//! Turns a placement into scene content: every room first, then every doorway's door.
//!
//! Each pass loads all of its assets concurrently and waits for every load to settle
//! before spawning anything, so a pass either spawns all of its items or none of them.

use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::mem;

use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::model::{ConnectorBridge, PlacedRoom, Placement};
use crate::config::GeneratorConfig;
use crate::types::{AssetId, Pos};

/// World placement of a spawned item. The grid's `y` axis maps onto world `z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub yaw_degrees: f32,
}

impl Transform {
    pub fn at_cell(pos: Pos, cell_size: f32, yaw_degrees: f32) -> Self {
        Self { position: [pos.x as f32 * cell_size, 0.0, pos.y as f32 * cell_size], yaw_degrees }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("could not load `{asset}`: {reason}")]
pub struct AssetLoadError {
    pub asset: AssetId,
    pub reason: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("scene refused `{asset}`: {reason}")]
pub struct SpawnError {
    pub asset: AssetId,
    pub reason: String,
}

/// One failed load of an aggregated [`InstantiationError::LoadFailed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    pub cell: Pos,
    pub error: AssetLoadError,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InstantiationError {
    #[error("{} asset load(s) failed", .failures.len())]
    LoadFailed { failures: Vec<LoadFailure> },
    #[error("spawn at {cell} failed")]
    SpawnFailed {
        cell: Pos,
        #[source]
        source: SpawnError,
    },
}

impl InstantiationError {
    pub fn cell(&self) -> Option<Pos> {
        match self {
            Self::LoadFailed { failures } => failures.first().map(|failure| failure.cell),
            Self::SpawnFailed { cell, .. } => Some(*cell),
        }
    }
}

/// Asynchronous source of room and door content. Dropping a returned future cancels it.
pub trait AssetProvider {
    type Content;

    fn load(&self, asset: &AssetId) -> impl Future<Output = Result<Self::Content, AssetLoadError>>;
}

/// Receiver of spawned content.
pub trait SceneSink<C> {
    type Handle: Copy + Debug + Eq;

    fn spawn_room(
        &mut self,
        room: &PlacedRoom,
        content: C,
        transform: Transform,
    ) -> Result<Self::Handle, SpawnError>;

    /// Spawns `door`, the asset the doorway at `bridge` resolved to.
    fn spawn_door(
        &mut self,
        bridge: &ConnectorBridge,
        door: &AssetId,
        content: C,
        transform: Transform,
    ) -> Result<Self::Handle, SpawnError>;

    fn despawn(&mut self, handle: Self::Handle);
}

impl<C, S: SceneSink<C> + ?Sized> SceneSink<C> for &mut S {
    type Handle = S::Handle;

    fn spawn_room(
        &mut self,
        room: &PlacedRoom,
        content: C,
        transform: Transform,
    ) -> Result<Self::Handle, SpawnError> {
        (**self).spawn_room(room, content, transform)
    }

    fn spawn_door(
        &mut self,
        bridge: &ConnectorBridge,
        door: &AssetId,
        content: C,
        transform: Transform,
    ) -> Result<Self::Handle, SpawnError> {
        (**self).spawn_door(bridge, door, content, transform)
    }

    fn despawn(&mut self, handle: Self::Handle) {
        (**self).despawn(handle);
    }
}

/// Despawns everything it recorded unless committed.
struct RollbackGuard<'s, C, S: SceneSink<C>> {
    scene: &'s mut S,
    spawned: Vec<S::Handle>,
    committed: bool,
    content: PhantomData<fn(C)>,
}

impl<'s, C, S: SceneSink<C>> RollbackGuard<'s, C, S> {
    fn new(scene: &'s mut S) -> Self {
        Self { scene, spawned: Vec::new(), committed: false, content: PhantomData }
    }

    fn commit(mut self) -> Vec<S::Handle> {
        self.committed = true;
        mem::take(&mut self.spawned)
    }
}

impl<C, S: SceneSink<C>> Drop for RollbackGuard<'_, C, S> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for handle in self.spawned.drain(..).rev() {
            self.scene.despawn(handle);
        }
    }
}

/// Loads every item's asset concurrently, waiting for all of them to settle.
async fn load_all<P, T>(
    provider: &P,
    items: &[(Pos, &AssetId, T)],
) -> Result<Vec<P::Content>, InstantiationError>
where
    P: AssetProvider,
{
    let results = join_all(items.iter().map(|(_, asset, _)| provider.load(asset))).await;

    let mut contents = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for ((cell, _, _), result) in items.iter().zip(results) {
        match result {
            Ok(content) => contents.push(content),
            Err(error) => failures.push(LoadFailure { cell: *cell, error }),
        }
    }
    if failures.is_empty() {
        Ok(contents)
    } else {
        warn!(failed = failures.len(), total = items.len(), "asset_loads_failed");
        Err(InstantiationError::LoadFailed { failures })
    }
}

/// Spawns every placed room in placement order at its base cell.
pub async fn instantiate_rooms<P, S>(
    placement: &Placement,
    config: &GeneratorConfig,
    provider: &P,
    scene: &mut S,
) -> Result<Vec<S::Handle>, InstantiationError>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    let items: Vec<(Pos, &AssetId, &PlacedRoom)> =
        placement.rooms().iter().map(|room| (room.base, &room.room, room)).collect();
    let contents = load_all(provider, &items).await?;

    let mut guard = RollbackGuard::new(scene);
    for ((cell, _, room), content) in items.iter().zip(contents) {
        let transform = Transform::at_cell(*cell, config.cell_size, room.rotation.degrees());
        let handle = guard
            .scene
            .spawn_room(room, content, transform)
            .map_err(|source| InstantiationError::SpawnFailed { cell: *cell, source })?;
        guard.spawned.push(handle);
    }
    let spawned = guard.commit();
    debug!(rooms = spawned.len(), "rooms_spawned");
    Ok(spawned)
}

/// Spawns the door of every doorway connector cell, aligned with the connector row.
pub async fn instantiate_doors<P, S>(
    placement: &Placement,
    config: &GeneratorConfig,
    provider: &P,
    scene: &mut S,
) -> Result<Vec<S::Handle>, InstantiationError>
where
    P: AssetProvider,
    S: SceneSink<P::Content>,
{
    let items: Vec<(Pos, &AssetId, &ConnectorBridge)> = placement
        .doorways()
        .filter_map(|bridge| bridge.door.as_ref().map(|door| (bridge.pos, door, bridge)))
        .collect();
    let contents = load_all(provider, &items).await?;

    let mut guard = RollbackGuard::new(scene);
    for ((cell, door, bridge), content) in items.iter().zip(contents) {
        let transform = Transform::at_cell(*cell, config.cell_size, 0.0);
        let handle = guard
            .scene
            .spawn_door(bridge, door, content, transform)
            .map_err(|source| InstantiationError::SpawnFailed { cell: *cell, source })?;
        guard.spawned.push(handle);
    }
    let spawned = guard.commit();
    debug!(doors = spawned.len(), "doors_spawned");
    Ok(spawned)
}
