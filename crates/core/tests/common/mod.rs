#![allow(dead_code)]

use levelgen_core::mapgen::{GridIndex, Placement, generate_placement, resolve_seed};
use levelgen_core::{Catalog, GeneratorConfig};

pub const CATALOG_JSON: &str = include_str!("../fixtures/catalog.json");

pub fn fixture_catalog() -> Catalog {
    Catalog::from_json_str(CATALOG_JSON).expect("fixture catalog should validate")
}

pub fn layout_config() -> GeneratorConfig {
    GeneratorConfig { auto_instantiate: false, ..GeneratorConfig::default() }
}

pub fn layout_for(catalog: &Catalog, seed: &str) -> (GridIndex, Placement) {
    let seed = resolve_seed(Some(seed)).expect("test seeds are well formed");
    generate_placement(catalog, &layout_config(), &seed).expect("fixture catalog is solvable")
}
