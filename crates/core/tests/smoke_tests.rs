mod common;

use common::{fixture_catalog, layout_config, layout_for};
use std::path::Path;

use levelgen_core::mapgen::{
    BridgeTarget, GenerationStage, GenerationState, MapGenerator, PlacementError, audit_placement,
    build_grid,
};
use levelgen_core::scene::{EchoAssetProvider, MemoryScene};
use levelgen_core::{AssetId, Catalog, GenerationError, GeneratorConfig, Pos, ZoneId};

const TWO_BY_TEN: &str = r#"{
  "rooms": [
    { "id": "hall", "shape": "two_way", "entrances": { "north": true, "south": true } },
    { "id": "corner", "shape": "corner", "entrances": { "north": true, "east": true } },
    { "id": "tee", "shape": "three_way", "entrances": { "north": true, "east": true, "south": true } },
    { "id": "end", "shape": "end_room", "entrances": { "south": true } }
  ],
  "zones": [
    {
      "id": 0, "width": 10, "height": 10,
      "normal_rooms": ["hall", "corner", "tee", "end"],
      "connection": { "next_zone": 1, "door": "door" }
    },
    { "id": 1, "width": 10, "height": 10, "normal_rooms": ["hall", "corner", "tee", "end"] }
  ]
}"#;

const CROSS_ONLY: &str = r#"{
  "rooms": [
    { "id": "cross", "shape": "four_way", "entrances": { "north": true, "east": true, "south": true, "west": true } }
  ],
  "zones": [
    { "id": 7, "name": "crossroads", "width": 3, "height": 3, "normal_rooms": ["cross"] }
  ]
}"#;

type LayoutGenerator = MapGenerator<EchoAssetProvider, MemoryScene<AssetId>>;

fn generator(catalog: Catalog, config: GeneratorConfig) -> LayoutGenerator {
    MapGenerator::new(catalog, config, EchoAssetProvider::default(), MemoryScene::new())
        .expect("config is valid")
}

#[test]
fn two_ten_by_ten_zones_share_one_connector_row() {
    let catalog = Catalog::from_json_str(TWO_BY_TEN).expect("catalog is valid");
    let grid = build_grid(catalog.zones());

    assert_eq!(grid.len(), 210);
    assert!((0..10).all(|x| grid.cell(Pos::new(x, 10)).is_some_and(|cell| cell.is_connector)));
    assert_eq!(grid.cell(Pos::new(0, 11)).and_then(|cell| cell.zone), Some(ZoneId(1)));
    assert_eq!(grid.cell(Pos::new(9, 20)).and_then(|cell| cell.zone), Some(ZoneId(1)));
    assert!(grid.cell(Pos::new(0, 21)).is_none());
}

#[test]
fn two_zone_layout_fills_and_marks_every_zone_cell() {
    let catalog = Catalog::from_json_str(TWO_BY_TEN).expect("catalog is valid");
    let (grid, placement) = layout_for(&catalog, "two-by-ten");

    assert_eq!(placement.occupied_cells().count(), 200);
    assert!(grid.cells().all(|cell| cell.occupied != cell.is_connector));
    assert_eq!(placement.connectors().len(), 10);
    assert_eq!(placement.doorways().count(), 1);
    let bridged = BridgeTarget::Zone(ZoneId(1));
    assert!(
        placement
            .connectors()
            .iter()
            .all(|bridge| bridge.upper == ZoneId(0) && bridge.lower == bridged)
    );
}

#[test]
fn surface_exits_become_doorways_below_the_last_zone() {
    let catalog = fixture_catalog();
    let (_, placement) = layout_for(&catalog, "deep-seam");

    let exits: Vec<&str> = placement
        .doorways()
        .filter(|bridge| bridge.lower == BridgeTarget::Surface)
        .filter_map(|bridge| bridge.door.as_ref().map(AssetId::as_str))
        .collect();
    assert_eq!(exits, ["lift", "ladder"]);
}

#[test]
fn anchored_rooms_sit_beside_their_doorways() {
    let catalog = fixture_catalog();
    for seed in ["anchor-1", "anchor-2", "anchor-3"] {
        let (_, placement) = layout_for(&catalog, seed);
        let shaft = placement
            .rooms()
            .iter()
            .find(|room| room.room.as_str() == "shaft")
            .expect("shaft is required");
        let below = placement.connector(Pos { y: shaft.base.y + 1, x: shaft.base.x });
        assert!(below.is_some_and(|bridge| bridge.is_doorway()), "{seed}: shaft at {}", shaft.base);

        let gate = placement
            .rooms()
            .iter()
            .find(|room| room.room.as_str() == "gate")
            .expect("gate is required");
        let above = placement.connector(Pos { y: gate.base.y - 1, x: gate.base.x });
        assert!(above.is_some_and(|bridge| bridge.is_doorway()), "{seed}: gate at {}", gate.base);
    }
}

#[test]
fn unfillable_zone_fails_with_its_zone_id() {
    let catalog = Catalog::from_json_str(CROSS_ONLY).expect("catalog is valid");
    let config = GeneratorConfig { backtrack_budget_per_cell: 4, ..layout_config() };
    let mut generator = generator(catalog, config);

    let error = generator.generate_layout(Some("crossroads")).expect_err("corners cannot fit");
    assert_eq!(error.zone(), Some(ZoneId(7)));
    assert_eq!(error.stage(), GenerationStage::Placement);
    assert!(matches!(
        error,
        GenerationError::Placement(PlacementError::BudgetExhausted { .. })
    ));
    assert_eq!(generator.state(), GenerationState::Failed { stage: GenerationStage::Placement });
    assert!(generator.placement().is_none());
}

#[test]
fn malformed_seed_falls_back_to_a_generated_one() {
    let mut generator = generator(fixture_catalog(), layout_config());
    let report = generator.generate_layout(Some("bad\u{0}seed")).expect("fallback seed works");

    assert!(report.seed_generated);
    assert_ne!(report.seed, "bad\u{0}seed");
}

#[test]
fn ascii_render_has_one_line_per_row() {
    let catalog = fixture_catalog();
    let (grid, placement) = layout_for(&catalog, "render");
    let ascii = placement.render_ascii(&grid);

    assert_eq!(ascii.lines().count(), grid.height() as usize);
    assert_eq!(ascii.matches('D').count(), placement.doorways().count());
}

#[test]
fn bundled_tool_data_loads_and_generates() {
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tools/data");
    let mut generator = LayoutGenerator::load(
        &data.join("catalog.json"),
        Some(&data.join("generator.toml")),
        EchoAssetProvider::default(),
        MemoryScene::new(),
    )
    .expect("bundled data is valid");
    assert_eq!(generator.config().cell_size, 12.0);

    generator.generate_layout(Some("old-workings")).expect("bundled catalog is solvable");
    let (grid, placement) =
        (generator.grid().expect("grid kept"), generator.placement().expect("layout kept"));
    assert!(audit_placement(generator.catalog(), grid, placement).is_empty());
}
