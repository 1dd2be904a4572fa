mod common;

use common::{fixture_catalog, layout_config};
use levelgen_core::mapgen::{audit_placement, generate_placement, resolve_seed};
use levelgen_core::{Catalog, ConnectorPolicy, GeneratorConfig};
use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};

fn check_seed(catalog: &Catalog, config: &GeneratorConfig, seed: u64) -> Result<(), String> {
    let text = format!("prop-{seed:016x}");
    let seed = resolve_seed(Some(&text)).map_err(|error| error.to_string())?;
    let (grid, placement) =
        generate_placement(catalog, config, &seed).map_err(|error| format!("{text}: {error}"))?;

    let violations = audit_placement(catalog, &grid, &placement);
    if !violations.is_empty() {
        return Err(format!("{text}: {violations:?}\n{}", placement.render_ascii(&grid)));
    }

    for room in placement.rooms() {
        let def = catalog.room(&room.room).ok_or("placed room missing from catalog")?;
        if room.footprint.len() != 1 + def.extensions.count() {
            return Err(format!("{text}: {} has footprint {:?}", room.room, room.footprint));
        }
        let zone = grid.cell(room.base).and_then(|cell| cell.zone);
        if room.footprint.iter().any(|pos| grid.cell(*pos).and_then(|cell| cell.zone) != zone) {
            return Err(format!("{text}: {} straddles zones", room.room));
        }
    }
    Ok(())
}

#[test]
fn random_seeds_yield_sound_layouts() {
    let catalog = fixture_catalog();
    let config = layout_config();
    let mut runner = TestRunner::new(ProptestConfig::with_cases(48));

    runner
        .run(&any::<u64>(), |seed| {
            check_seed(&catalog, &config, seed).map_err(TestCaseError::fail)?;
            Ok(())
        })
        .expect("every seed should produce a connected, consistent layout");
}

#[test]
fn sealed_connectors_still_yield_sound_layouts() {
    let catalog = fixture_catalog();
    let config = GeneratorConfig { connector_policy: ConnectorPolicy::Sealed, ..layout_config() };
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));

    runner
        .run(&any::<u64>(), |seed| {
            check_seed(&catalog, &config, seed).map_err(TestCaseError::fail)?;
            Ok(())
        })
        .expect("sealed connector rows should not break placement");
}

/// Two separate columns above that only meet in the zone below.
const SPLIT_CATALOG_JSON: &str = r#"{
    "rooms": [
        { "id": "end", "shape": "end_room", "entrances": { "south": true } },
        { "id": "hall", "shape": "two_way", "entrances": { "north": true, "south": true } },
        { "id": "corner", "shape": "corner", "entrances": { "north": true, "east": true } }
    ],
    "zones": [
        {
            "id": 0,
            "width": 2,
            "height": 2,
            "normal_rooms": ["end", "hall"],
            "connection": { "next_zone": 1, "door_count": 2, "door": "hatch" }
        },
        { "id": 1, "width": 2, "height": 1, "normal_rooms": ["corner"] }
    ]
}"#;

#[test]
fn zones_split_above_are_joined_below() {
    let catalog = Catalog::from_json_str(SPLIT_CATALOG_JSON).expect("split catalog is valid");
    let mut runner = TestRunner::new(ProptestConfig::with_cases(32));

    runner
        .run(&any::<(u64, bool)>(), |(seed, sealed)| {
            let connector_policy =
                if sealed { ConnectorPolicy::Sealed } else { ConnectorPolicy::Permissive };
            let config = GeneratorConfig { connector_policy, ..layout_config() };
            check_seed(&catalog, &config, seed).map_err(TestCaseError::fail)?;
            Ok(())
        })
        .expect("the lower zone should join both columns");
}

#[test]
fn sealed_connectors_only_open_onto_doorways() {
    let catalog = fixture_catalog();
    let config = GeneratorConfig { connector_policy: ConnectorPolicy::Sealed, ..layout_config() };
    let seed = resolve_seed(Some("sunken-vault-0310")).expect("seed is valid");
    let (grid, placement) = generate_placement(&catalog, &config, &seed).expect("solvable");

    for (pos, occupant) in placement.occupied_cells() {
        for side in occupant.entrances.directions() {
            let neighbor = pos.step(side);
            if grid.cell(neighbor).is_some_and(|cell| cell.is_connector) {
                let bridge = placement.connector(neighbor).expect("connector has a bridge");
                assert!(bridge.is_doorway(), "{pos} opens onto the wall at {neighbor}");
            }
        }
    }
}
