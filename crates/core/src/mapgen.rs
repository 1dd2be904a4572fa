//! Procedural level generation split into coherent submodules.

pub mod audit;
pub mod generator;
pub mod grid;
pub mod instantiate;
pub mod model;
pub mod seed;
pub mod solver;

pub use audit::{Violation, audit_placement};
pub use generator::{
    GenerationError, GenerationReport, GenerationStage, GenerationState, MapGenerator,
};
pub use grid::{Cell, GridIndex, ZoneBand, build_grid};
pub use instantiate::{
    AssetLoadError, AssetProvider, InstantiationError, LoadFailure, SceneSink, SpawnError,
    Transform, instantiate_doors, instantiate_rooms,
};
pub use model::{BridgeTarget, CellOccupant, ConnectorBridge, PlacedRoom, Placement};
pub use seed::{
    MAX_SEED_LEN, ResolvedSeed, SeedDerivationError, SeedOrigin, generate_seed_text,
    resolve_seed, seed_value,
};
pub use solver::{PlacementError, place_rooms};

use crate::catalog::Catalog;
use crate::config::GeneratorConfig;

/// Builds the grid for `catalog` and places rooms with the RNG derived from `seed`.
///
/// Returns the grid with every placed cell marked occupied.
pub fn generate_placement(
    catalog: &Catalog,
    config: &GeneratorConfig,
    seed: &ResolvedSeed,
) -> Result<(GridIndex, Placement), PlacementError> {
    let mut grid = build_grid(catalog.zones());
    let mut rng = seed.rng();
    let placement = place_rooms(&grid, catalog, config, &mut rng)?;
    grid.mark_occupied(placement.occupied_cells().map(|(pos, _)| pos));
    Ok((grid, placement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RoomDef, RoomKind, RoomShape, ZoneDef, default_entrances};
    use crate::scene::{EchoAssetProvider, MemoryScene};
    use crate::types::{AssetId, Entrances, ZoneId};

    fn catalog() -> Catalog {
        let rooms: Vec<RoomDef> = [
            ("end", RoomShape::EndRoom),
            ("corner", RoomShape::Corner),
            ("hall", RoomShape::TwoWay),
            ("tee", RoomShape::ThreeWay),
        ]
        .into_iter()
        .map(|(id, shape)| RoomDef {
            id: AssetId::new(id),
            shape,
            kind: RoomKind::Normal,
            entrances: default_entrances(shape),
            large: false,
            extensions: Entrances::NONE,
            valid_for_starting_room: false,
            chance: 1.0,
            anchor: None,
        })
        .collect();
        let zone = ZoneDef {
            id: ZoneId(0),
            name: "yard".into(),
            width: 5,
            height: 4,
            normal_rooms: rooms.iter().map(|room| room.id.clone()).collect(),
            required_rooms: Vec::new(),
            starting_room: None,
            connection: None,
            surface_exits: Vec::new(),
        };
        Catalog::new(rooms, vec![zone]).expect("fixture catalog is valid")
    }

    #[test]
    fn generate_placement_matches_map_generator_output() {
        let catalog = catalog();
        let config = GeneratorConfig { auto_instantiate: false, ..GeneratorConfig::default() };
        let seed = resolve_seed(Some("amber-falcon-0042")).expect("seed is valid");

        let (grid, from_helper) =
            generate_placement(&catalog, &config, &seed).expect("layout is solvable");
        assert!(grid.cells().all(|cell| cell.occupied));

        let mut generator = MapGenerator::new(
            catalog,
            config,
            EchoAssetProvider::default(),
            MemoryScene::<AssetId>::new(),
        )
        .expect("config is valid");
        generator.generate_layout(Some("amber-falcon-0042")).expect("layout is solvable");

        assert_eq!(generator.placement(), Some(&from_helper));
    }
}
