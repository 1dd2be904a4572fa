//! In-memory asset provider and scene, for tooling and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::future::{self, Future};

use slotmap::{SlotMap, new_key_type};

use crate::mapgen::{
    AssetLoadError, AssetProvider, ConnectorBridge, PlacedRoom, SceneSink, SpawnError, Transform,
};
use crate::types::{AssetId, Pos};

new_key_type! {
    pub struct SpawnKey;
}

/// Serves content from a fixed table; ids marked failing, or missing, fail to load.
#[derive(Clone, Debug)]
pub struct StaticAssetProvider<C> {
    contents: BTreeMap<AssetId, C>,
    failing: BTreeSet<AssetId>,
}

impl<C: Clone> Default for StaticAssetProvider<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone> StaticAssetProvider<C> {
    pub fn new() -> Self {
        Self { contents: BTreeMap::new(), failing: BTreeSet::new() }
    }

    pub fn with(mut self, asset: impl Into<String>, content: C) -> Self {
        self.insert(AssetId::new(asset), content);
        self
    }

    pub fn insert(&mut self, asset: AssetId, content: C) {
        self.contents.insert(asset, content);
    }

    pub fn fail(&mut self, asset: AssetId) {
        self.failing.insert(asset);
    }
}

impl<C: Clone> AssetProvider for StaticAssetProvider<C> {
    type Content = C;

    fn load(&self, asset: &AssetId) -> impl Future<Output = Result<C, AssetLoadError>> {
        let result = if self.failing.contains(asset) {
            Err(AssetLoadError { asset: asset.clone(), reason: "marked as failing".into() })
        } else {
            self.contents.get(asset).cloned().ok_or_else(|| AssetLoadError {
                asset: asset.clone(),
                reason: "not in the asset table".into(),
            })
        };
        future::ready(result)
    }
}

/// Loads any id successfully, handing the id back as content.
#[derive(Clone, Debug, Default)]
pub struct EchoAssetProvider {
    failing: BTreeSet<AssetId>,
}

impl EchoAssetProvider {
    pub fn fail(&mut self, asset: AssetId) {
        self.failing.insert(asset);
    }
}

impl AssetProvider for EchoAssetProvider {
    type Content = AssetId;

    fn load(&self, asset: &AssetId) -> impl Future<Output = Result<AssetId, AssetLoadError>> {
        future::ready(if self.failing.contains(asset) {
            Err(AssetLoadError { asset: asset.clone(), reason: "marked as failing".into() })
        } else {
            Ok(asset.clone())
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnKind {
    Room,
    Door,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject<C> {
    pub kind: SpawnKind,
    pub asset: AssetId,
    pub cell: Pos,
    pub content: C,
    pub transform: Transform,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneEvent {
    Spawned { kind: SpawnKind, asset: AssetId, cell: Pos },
    Despawned { asset: AssetId, cell: Pos },
}

/// Scene kept in a slot map, with a log of every spawn and despawn.
#[derive(Clone, Debug)]
pub struct MemoryScene<C> {
    objects: SlotMap<SpawnKey, SceneObject<C>>,
    rejected: BTreeSet<AssetId>,
    events: Vec<SceneEvent>,
}

impl<C> Default for MemoryScene<C> {
    fn default() -> Self {
        Self { objects: SlotMap::with_key(), rejected: BTreeSet::new(), events: Vec::new() }
    }
}

impl<C> MemoryScene<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns of `asset` fail with a [`SpawnError`].
    pub fn reject(&mut self, asset: AssetId) {
        self.rejected.insert(asset);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, key: SpawnKey) -> Option<&SceneObject<C>> {
        self.objects.get(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject<C>> {
        self.objects.values()
    }

    pub fn count(&self, kind: SpawnKind) -> usize {
        self.objects.values().filter(|object| object.kind == kind).count()
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    fn spawn(
        &mut self,
        kind: SpawnKind,
        asset: &AssetId,
        cell: Pos,
        content: C,
        transform: Transform,
    ) -> Result<SpawnKey, SpawnError> {
        if self.rejected.contains(asset) {
            return Err(SpawnError { asset: asset.clone(), reason: "rejected by scene".into() });
        }
        self.events.push(SceneEvent::Spawned { kind, asset: asset.clone(), cell });
        let object = SceneObject { kind, asset: asset.clone(), cell, content, transform };
        Ok(self.objects.insert(object))
    }
}

impl<C> SceneSink<C> for MemoryScene<C> {
    type Handle = SpawnKey;

    fn spawn_room(
        &mut self,
        room: &PlacedRoom,
        content: C,
        transform: Transform,
    ) -> Result<SpawnKey, SpawnError> {
        self.spawn(SpawnKind::Room, &room.room, room.base, content, transform)
    }

    fn spawn_door(
        &mut self,
        bridge: &ConnectorBridge,
        door: &AssetId,
        content: C,
        transform: Transform,
    ) -> Result<SpawnKey, SpawnError> {
        self.spawn(SpawnKind::Door, door, bridge.pos, content, transform)
    }

    fn despawn(&mut self, handle: SpawnKey) {
        if let Some(object) = self.objects.remove(handle) {
            self.events.push(SceneEvent::Despawned { asset: object.asset, cell: object.cell });
        }
    }
}
